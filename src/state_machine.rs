//! fleet-rsm's state machine for muster cluster replication.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use crate::applier::{ApplyError, CommandApplier, CommandOutput};
use crate::command::CommandEnvelope;
use crate::snapshot::{self, SnapshotError};
use crate::storage::StateStore;

pub type Outcome = Result<CommandOutput, ApplyError>;

#[derive(Debug, Error)]
pub enum StateMachineError {
    #[error("Node halted: {0}")]
    Halted(String),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Full state snapshot for syncing lagging followers (snapshot codec bytes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetSnapshot {
    pub data: Vec<u8>,
}

/// Recent apply outcomes keyed by request id, so the node that submitted a
/// command can report its result. Node-local and bounded; entries are never
/// read in place, so eviction drops the oldest first.
#[derive(Debug)]
pub struct OutcomeLog {
    entries: Mutex<LruCache<String, Outcome>>,
}

impl OutcomeLog {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn record(&self, request_id: &str, outcome: Outcome) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(request_id.to_string(), outcome);
    }

    /// Remove and return the outcome recorded for `request_id`.
    pub fn take(&self, request_id: &str) -> Option<Outcome> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop(request_id)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tracks whether this node may keep serving. A node halts when it cannot
/// restore a valid snapshot and stays halted until restarted.
#[derive(Debug)]
pub struct NodeHealth {
    halted: watch::Sender<Option<String>>,
}

impl Default for NodeHealth {
    fn default() -> Self {
        let (halted, _) = watch::channel(None);
        Self { halted }
    }
}

impl NodeHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn halt(&self, reason: impl Into<String>) {
        self.halted.send_replace(Some(reason.into()));
    }

    pub fn halt_reason(&self) -> Option<String> {
        self.halted.borrow().clone()
    }

    pub fn is_halted(&self) -> bool {
        self.halted.borrow().is_some()
    }

    /// Resolves once the node halts, yielding the reason.
    pub async fn halted(&self) -> String {
        let mut rx = self.halted.subscribe();
        let reason = match rx.wait_for(Option::is_some).await {
            Ok(reason) => reason.clone(),
            Err(_) => None,
        };
        reason.unwrap_or_default()
    }
}

/// The fleet state machine, replicated by muster.
pub struct FleetStateMachine {
    applier: CommandApplier,
    health: Arc<NodeHealth>,
    outcomes: Arc<OutcomeLog>,
}

impl FleetStateMachine {
    pub fn new(
        store: Arc<StateStore>,
        outcomes: Arc<OutcomeLog>,
        health: Arc<NodeHealth>,
    ) -> Self {
        Self {
            applier: CommandApplier::new(store),
            health,
            outcomes,
        }
    }

    fn ensure_running(&self) -> Result<(), StateMachineError> {
        match self.health.halt_reason() {
            Some(reason) => Err(StateMachineError::Halted(reason)),
            None => Ok(()),
        }
    }
}

impl muster::StateMachine for FleetStateMachine {
    type WriteOp = CommandEnvelope;
    type Snapshot = FleetSnapshot;

    /// Rejected commands are ordinary outcomes: they are recorded for the
    /// submitter and the entry still counts as applied.
    fn apply(
        &self,
        op: &CommandEnvelope,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.ensure_running()?;
        let outcome = self.applier.apply(op);
        self.outcomes.record(&op.request_id, outcome);
        Ok(())
    }

    fn snapshot(&self) -> Result<FleetSnapshot, Box<dyn std::error::Error + Send + Sync>> {
        self.ensure_running()?;
        let data = snapshot::export(self.applier.store())?;
        Ok(FleetSnapshot { data })
    }

    fn restore(
        &self,
        snapshot: FleetSnapshot,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Err(e) = snapshot::import(self.applier.store(), &snapshot.data) {
            tracing::error!(error = %e, "Snapshot restore failed, halting node");
            self.health.halt(format!("snapshot restore failed: {e}"));
            return Err(Box::new(StateMachineError::from(e)));
        }

        let counts = self.applier.store().counts();
        tracing::info!(
            printers = counts.printers,
            filaments = counts.filaments,
            print_jobs = counts.print_jobs,
            "Restored state from snapshot"
        );
        Ok(())
    }
}
