use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::models::{EntityKind, Filament, PrintJob, Printer};

/// An entity kind kept in its own table of [`FleetState`].
pub trait Entity: Clone {
    const KIND: EntityKind;

    fn id(&self) -> &str;
    fn table(state: &FleetState) -> &BTreeMap<String, Self>;
    fn table_mut(state: &mut FleetState) -> &mut BTreeMap<String, Self>;
}

impl Entity for Printer {
    const KIND: EntityKind = EntityKind::Printer;

    fn id(&self) -> &str {
        &self.id
    }

    fn table(state: &FleetState) -> &BTreeMap<String, Self> {
        &state.printers
    }

    fn table_mut(state: &mut FleetState) -> &mut BTreeMap<String, Self> {
        &mut state.printers
    }
}

impl Entity for Filament {
    const KIND: EntityKind = EntityKind::Filament;

    fn id(&self) -> &str {
        &self.id
    }

    fn table(state: &FleetState) -> &BTreeMap<String, Self> {
        &state.filaments
    }

    fn table_mut(state: &mut FleetState) -> &mut BTreeMap<String, Self> {
        &mut state.filaments
    }
}

impl Entity for PrintJob {
    const KIND: EntityKind = EntityKind::PrintJob;

    fn id(&self) -> &str {
        &self.id
    }

    fn table(state: &FleetState) -> &BTreeMap<String, Self> {
        &state.print_jobs
    }

    fn table_mut(state: &mut FleetState) -> &mut BTreeMap<String, Self> {
        &mut state.print_jobs
    }
}

/// All fleet tables. Ordered maps keep exports byte-stable across replicas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetState {
    pub printers: BTreeMap<String, Printer>,
    pub filaments: BTreeMap<String, Filament>,
    pub print_jobs: BTreeMap<String, PrintJob>,
}

impl FleetState {
    pub fn get<T: Entity>(&self, id: &str) -> Option<&T> {
        T::table(self).get(id)
    }

    pub fn get_mut<T: Entity>(&mut self, id: &str) -> Option<&mut T> {
        T::table_mut(self).get_mut(id)
    }

    pub fn contains<T: Entity>(&self, id: &str) -> bool {
        T::table(self).contains_key(id)
    }

    /// Insert or replace an entity under its own id.
    pub fn insert<T: Entity>(&mut self, entity: T) {
        T::table_mut(self).insert(entity.id().to_string(), entity);
    }

    /// Grams reserved on a filament by its queued and running jobs.
    pub fn pending_weight(&self, filament_id: &str) -> i64 {
        self.print_jobs
            .values()
            .filter(|job| job.filament_id == filament_id && job.status.is_pending())
            .map(|job| job.print_weight_grams)
            .sum()
    }

    pub fn counts(&self) -> EntityCounts {
        EntityCounts {
            filaments: self.filaments.len(),
            print_jobs: self.print_jobs.len(),
            printers: self.printers.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub filaments: usize,
    pub print_jobs: usize,
    pub printers: usize,
}

/// In-memory fleet state behind a single lock.
///
/// Every read, command application and snapshot import/export goes through
/// the same mutex so checks spanning several tables see one consistent view.
/// Callers only ever receive clones.
#[derive(Debug, Default)]
pub struct StateStore {
    state: Mutex<FleetState>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FleetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get<T: Entity>(&self, id: &str) -> Option<T> {
        self.lock().get::<T>(id).cloned()
    }

    pub fn put<T: Entity>(&self, entity: T) {
        self.lock().insert(entity);
    }

    pub fn list_all<T: Entity>(&self) -> Vec<T> {
        T::table(&self.lock()).values().cloned().collect()
    }

    /// Deep copy of every table.
    pub fn export_all(&self) -> FleetState {
        self.lock().clone()
    }

    /// Replace every table at once.
    pub fn import_all(&self, state: FleetState) {
        *self.lock() = state;
    }

    pub fn counts(&self) -> EntityCounts {
        self.lock().counts()
    }

    /// Run `f` with exclusive access to the tables.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut FleetState) -> R) -> R {
        f(&mut self.lock())
    }
}
