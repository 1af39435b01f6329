//! Snapshot codec: the whole fleet state as one MessagePack document.
//!
//! Documents are written with named fields so they decode without any
//! out-of-band schema. A document is fully decoded and checked before the
//! store is touched; a bad document never replaces good state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::models::{Filament, PrintJob, Printer};
use crate::storage::{Entity, FleetState, StateStore};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("Snapshot encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("Inconsistent snapshot: {0}")]
    Inconsistent(String),
    #[error(
        "Unsupported snapshot version {0} (expected {expected})",
        expected = FORMAT_VERSION
    )]
    UnsupportedVersion(u32),
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u32,
    state: &'a FleetState,
}

#[derive(Deserialize)]
struct Document {
    version: u32,
    state: FleetState,
}

pub fn encode(state: &FleetState) -> Result<Vec<u8>, SnapshotError> {
    let document = DocumentRef {
        version: FORMAT_VERSION,
        state,
    };
    Ok(rmp_serde::to_vec_named(&document)?)
}

pub fn decode(bytes: &[u8]) -> Result<FleetState, SnapshotError> {
    let document: Document = rmp_serde::from_slice(bytes)?;
    if document.version != FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(document.version));
    }
    validate(&document.state)?;
    Ok(document.state)
}

/// Serialize the store's current contents.
pub fn export(store: &StateStore) -> Result<Vec<u8>, SnapshotError> {
    encode(&store.export_all())
}

/// Replace the store's contents with a snapshot. On error the store is unchanged.
pub fn import(store: &StateStore, bytes: &[u8]) -> Result<(), SnapshotError> {
    let state = decode(bytes)?;
    store.import_all(state);
    Ok(())
}

fn check_keys<T: Entity>(state: &FleetState) -> Result<(), SnapshotError> {
    for (key, entity) in T::table(state) {
        if key != entity.id() {
            return Err(SnapshotError::Inconsistent(format!(
                "{} stored under '{key}' has id '{}'",
                T::KIND,
                entity.id()
            )));
        }
    }
    Ok(())
}

fn validate(state: &FleetState) -> Result<(), SnapshotError> {
    check_keys::<Printer>(state)?;
    check_keys::<Filament>(state)?;
    check_keys::<PrintJob>(state)?;

    for filament in state.filaments.values() {
        if filament.total_weight_grams < 0
            || !(0..=filament.total_weight_grams).contains(&filament.remaining_weight_grams)
        {
            return Err(SnapshotError::Inconsistent(format!(
                "filament '{}' has {}g remaining of {}g",
                filament.id, filament.remaining_weight_grams, filament.total_weight_grams
            )));
        }
    }

    for job in state.print_jobs.values() {
        if !state.contains::<Printer>(&job.printer_id) {
            return Err(SnapshotError::Inconsistent(format!(
                "print job '{}' references unknown printer '{}'",
                job.id, job.printer_id
            )));
        }
        if !state.contains::<Filament>(&job.filament_id) {
            return Err(SnapshotError::Inconsistent(format!(
                "print job '{}' references unknown filament '{}'",
                job.id, job.filament_id
            )));
        }
    }
    Ok(())
}
