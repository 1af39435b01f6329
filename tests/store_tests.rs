use std::sync::Arc;
use std::thread;

use fleet_rsm::storage::models::{Filament, FilamentType, JobStatus, PrintJob, Printer};
use fleet_rsm::storage::{Database, FleetState, StateStore};

fn sample_printer(id: &str) -> Printer {
    Printer {
        id: id.to_string(),
        company: "Creality".to_string(),
        model: "K1".to_string(),
    }
}

fn sample_filament(id: &str, total: i64, remaining: i64) -> Filament {
    Filament {
        id: id.to_string(),
        filament_type: FilamentType::Petg,
        color: "blue".to_string(),
        total_weight_grams: total,
        remaining_weight_grams: remaining,
    }
}

fn sample_job(id: &str, filament_id: &str, grams: i64, status: JobStatus) -> PrintJob {
    PrintJob {
        id: id.to_string(),
        printer_id: "p1".to_string(),
        filament_id: filament_id.to_string(),
        file_path: format!("{id}.gcode"),
        print_weight_grams: grams,
        status,
    }
}

#[test]
fn test_put_and_get() {
    let store = StateStore::new();
    store.put(sample_printer("p1"));
    store.put(sample_filament("f1", 1000, 800));

    assert_eq!(store.get::<Printer>("p1"), Some(sample_printer("p1")));
    assert_eq!(
        store.get::<Filament>("f1"),
        Some(sample_filament("f1", 1000, 800))
    );
}

#[test]
fn test_get_missing() {
    let store = StateStore::new();
    assert!(store.get::<Printer>("nope").is_none());
    assert!(store.get::<Filament>("nope").is_none());
    assert!(store.get::<PrintJob>("nope").is_none());
}

#[test]
fn test_kinds_are_separate_namespaces() {
    let store = StateStore::new();
    store.put(sample_printer("shared"));
    assert!(store.get::<Filament>("shared").is_none());
    assert!(store.get::<PrintJob>("shared").is_none());
}

#[test]
fn test_get_returns_a_copy() {
    let store = StateStore::new();
    store.put(sample_filament("f1", 1000, 1000));

    let mut copy = store.get::<Filament>("f1").unwrap();
    copy.remaining_weight_grams = 0;

    assert_eq!(
        store.get::<Filament>("f1").unwrap().remaining_weight_grams,
        1000
    );
}

#[test]
fn test_list_all() {
    let store = StateStore::new();
    store.put(sample_printer("b"));
    store.put(sample_printer("a"));
    store.put(sample_printer("c"));

    let mut ids: Vec<String> = store
        .list_all::<Printer>()
        .into_iter()
        .map(|p| p.id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert!(store.list_all::<PrintJob>().is_empty());
}

#[test]
fn test_export_import_replaces_everything() {
    let store = StateStore::new();
    store.put(sample_printer("old"));

    let mut replacement = FleetState::default();
    replacement.insert(sample_printer("p1"));
    replacement.insert(sample_filament("f1", 500, 500));
    replacement.insert(sample_job("j1", "f1", 20, JobStatus::Queued));

    store.import_all(replacement.clone());

    assert!(store.get::<Printer>("old").is_none());
    assert_eq!(store.export_all(), replacement);
    let counts = store.counts();
    assert_eq!(counts.printers, 1);
    assert_eq!(counts.filaments, 1);
    assert_eq!(counts.print_jobs, 1);
}

#[test]
fn test_pending_weight_counts_queued_and_running() {
    let mut state = FleetState::default();
    state.insert(sample_job("q", "f1", 10, JobStatus::Queued));
    state.insert(sample_job("r", "f1", 20, JobStatus::Running));
    state.insert(sample_job("d", "f1", 40, JobStatus::Done));
    state.insert(sample_job("c", "f1", 80, JobStatus::Cancelled));
    state.insert(sample_job("other", "f2", 160, JobStatus::Queued));

    assert_eq!(state.pending_weight("f1"), 30);
    assert_eq!(state.pending_weight("f2"), 160);
    assert_eq!(state.pending_weight("f3"), 0);
}

#[test]
fn test_concurrent_puts() {
    let store = Arc::new(StateStore::new());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..50 {
                    store.put(sample_printer(&format!("p-{t}-{i}")));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.list_all::<Printer>().len(), 400);
}

#[test]
fn test_database_open_creates_dir() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("raft-data").join("node1");

    let db = Database::open(&data_dir).unwrap();
    assert!(data_dir.join("fleet-rsm.redb").exists());

    let shared = db.clone();
    assert!(std::sync::Arc::ptr_eq(&db.inner(), &shared.inner()));
}
