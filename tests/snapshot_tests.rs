use fleet_rsm::snapshot::{self, SnapshotError, FORMAT_VERSION};
use fleet_rsm::storage::models::{Filament, FilamentType, JobStatus, PrintJob, Printer};
use fleet_rsm::storage::{FleetState, StateStore};
use serde::Serialize;

fn sample_state() -> FleetState {
    let mut state = FleetState::default();
    state.insert(Printer {
        id: "p1".to_string(),
        company: "Prusa".to_string(),
        model: "XL".to_string(),
    });
    state.insert(Filament {
        id: "f1".to_string(),
        filament_type: FilamentType::Abs,
        color: "grey".to_string(),
        total_weight_grams: 1000,
        remaining_weight_grams: 640,
    });
    state.insert(PrintJob {
        id: "j1".to_string(),
        printer_id: "p1".to_string(),
        filament_id: "f1".to_string(),
        file_path: "/prints/bracket.gcode".to_string(),
        print_weight_grams: 120,
        status: JobStatus::Running,
    });
    state.insert(PrintJob {
        id: "j2".to_string(),
        printer_id: "p1".to_string(),
        filament_id: "f1".to_string(),
        file_path: String::new(),
        print_weight_grams: 240,
        status: JobStatus::Done,
    });
    state
}

fn sample_store() -> StateStore {
    let store = StateStore::new();
    store.import_all(sample_state());
    store
}

/// Encode a document by hand, bypassing the codec's own checks.
fn raw_document(version: u32, state: &FleetState) -> Vec<u8> {
    #[derive(Serialize)]
    struct Raw<'a> {
        version: u32,
        state: &'a FleetState,
    }
    rmp_serde::to_vec_named(&Raw { version, state }).unwrap()
}

#[test]
fn test_export_import_round_trip() {
    let store = sample_store();
    let before = store.export_all();

    let bytes = snapshot::export(&store).unwrap();
    snapshot::import(&store, &bytes).unwrap();

    assert_eq!(store.export_all(), before);
}

#[test]
fn test_import_into_fresh_store() {
    let bytes = snapshot::export(&sample_store()).unwrap();

    let follower = StateStore::new();
    snapshot::import(&follower, &bytes).unwrap();

    assert_eq!(follower.export_all(), sample_state());
    assert_eq!(
        follower.get::<PrintJob>("j1").unwrap().status,
        JobStatus::Running
    );
}

#[test]
fn test_export_is_deterministic() {
    let a = snapshot::export(&sample_store()).unwrap();
    let b = snapshot::export(&sample_store()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_empty_state_round_trip() {
    let bytes = snapshot::encode(&FleetState::default()).unwrap();
    assert_eq!(snapshot::decode(&bytes).unwrap(), FleetState::default());
}

#[test]
fn test_corrupt_bytes_keep_prior_state() {
    let store = sample_store();
    let before = store.export_all();

    let mut bytes = snapshot::export(&store).unwrap();
    bytes.truncate(bytes.len() / 2);

    let err = snapshot::import(&store, &bytes).unwrap_err();
    assert!(matches!(err, SnapshotError::Decode(_)));
    assert_eq!(store.export_all(), before);

    assert!(snapshot::import(&store, b"definitely not msgpack").is_err());
    assert!(snapshot::import(&store, &[]).is_err());
    assert_eq!(store.export_all(), before);
}

#[test]
fn test_unsupported_version_rejected() {
    let store = sample_store();
    let before = store.export_all();

    let bytes = raw_document(FORMAT_VERSION + 1, &FleetState::default());
    let err = snapshot::import(&store, &bytes).unwrap_err();

    assert!(matches!(err, SnapshotError::UnsupportedVersion(v) if v == FORMAT_VERSION + 1));
    assert_eq!(store.export_all(), before);
}

#[test]
fn test_dangling_job_reference_rejected() {
    let mut state = sample_state();
    state.printers.clear();

    let err = snapshot::decode(&raw_document(FORMAT_VERSION, &state)).unwrap_err();
    assert!(matches!(err, SnapshotError::Inconsistent(_)));
}

#[test]
fn test_filament_weight_out_of_range_rejected() {
    let mut state = sample_state();
    if let Some(filament) = state.filaments.get_mut("f1") {
        filament.remaining_weight_grams = 1001;
    }

    let err = snapshot::decode(&raw_document(FORMAT_VERSION, &state)).unwrap_err();
    assert!(matches!(err, SnapshotError::Inconsistent(_)));
}

#[test]
fn test_mismatched_key_rejected() {
    let mut state = sample_state();
    if let Some(printer) = state.printers.remove("p1") {
        state.printers.insert("p2".to_string(), printer);
    }

    let err = snapshot::decode(&raw_document(FORMAT_VERSION, &state)).unwrap_err();
    assert!(matches!(err, SnapshotError::Inconsistent(_)));
}
