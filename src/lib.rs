//! fleet-rsm - Replicated fleet inventory for 3D printers, filament spools and print jobs
//!
//! This crate provides:
//! - A deterministic command applier enforcing filament capacity and job lifecycle rules
//! - In-memory fleet state replicated via muster (Raft-like clustering)
//! - A MessagePack snapshot codec for compaction and follower catch-up
//! - REST API translating requests into replicated commands

pub mod api;
pub mod applier;
pub mod command;
pub mod config;
pub mod snapshot;
pub mod state_machine;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use config::Config;
use state_machine::{FleetStateMachine, NodeHealth, OutcomeLog};
use storage::StateStore;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub health: Arc<NodeHealth>,
    pub node: Arc<muster::RedbNode<FleetStateMachine>>,
    pub outcomes: Arc<OutcomeLog>,
    pub store: Arc<StateStore>,
}
