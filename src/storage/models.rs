use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three entity collections held by the state store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Filament,
    PrintJob,
    Printer,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Filament => "filament",
            EntityKind::PrintJob => "print job",
            EntityKind::Printer => "printer",
        };
        f.write_str(name)
    }
}

/// A 3D printer. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Printer {
    pub id: String,
    pub company: String,
    pub model: String,
}

/// Filament material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilamentType {
    #[serde(rename = "ABS")]
    Abs,
    #[serde(rename = "PETG")]
    Petg,
    #[serde(rename = "PLA")]
    Pla,
    #[serde(rename = "TPU")]
    Tpu,
}

impl fmt::Display for FilamentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilamentType::Abs => "ABS",
            FilamentType::Petg => "PETG",
            FilamentType::Pla => "PLA",
            FilamentType::Tpu => "TPU",
        };
        f.write_str(name)
    }
}

/// A filament spool. Only `remaining_weight_grams` changes after creation,
/// and it always stays within `0..=total_weight_grams`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filament {
    pub id: String,
    #[serde(rename = "type")]
    pub filament_type: FilamentType,
    pub color: String,
    pub total_weight_grams: i64,
    pub remaining_weight_grams: i64,
}

/// A print job. Created `Queued`; only `status` changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub id: String,
    pub printer_id: String,
    pub filament_id: String,
    pub file_path: String,
    pub print_weight_grams: i64,
    pub status: JobStatus,
}

/// Print job lifecycle.
///
/// ```text
/// Queued  -> Running | Cancelled
/// Running -> Done | Cancelled
/// Done, Cancelled -> (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Cancelled,
}

impl JobStatus {
    /// Statuses reachable in one step from `self`.
    pub fn next_states(self) -> &'static [JobStatus] {
        match self {
            JobStatus::Queued => &[JobStatus::Running, JobStatus::Cancelled],
            JobStatus::Running => &[JobStatus::Done, JobStatus::Cancelled],
            JobStatus::Done | JobStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        self.next_states().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.next_states().is_empty()
    }

    /// Queued and running jobs hold a reservation on their filament.
    pub fn is_pending(self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "Queued",
            JobStatus::Running => "Running",
            JobStatus::Done => "Done",
            JobStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Queued" => Ok(JobStatus::Queued),
            "Running" => Ok(JobStatus::Running),
            "Done" => Ok(JobStatus::Done),
            "Cancelled" => Ok(JobStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [JobStatus; 4] = [
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Done,
        JobStatus::Cancelled,
    ];

    #[test]
    fn test_transition_table() {
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Cancelled));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Done));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Done));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Cancelled));
        assert!(!JobStatus::Running.can_transition_to(JobStatus::Queued));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for status in [JobStatus::Done, JobStatus::Cancelled] {
            assert!(status.is_terminal());
            for next in ALL {
                assert!(!status.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_no_self_transitions() {
        for status in ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_pending_statuses() {
        assert!(JobStatus::Queued.is_pending());
        assert!(JobStatus::Running.is_pending());
        assert!(!JobStatus::Done.is_pending());
        assert!(!JobStatus::Cancelled.is_pending());
    }

    #[test]
    fn test_status_parse() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<JobStatus>(), Ok(status));
        }
        assert!("queued".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_filament_wire_names() {
        let filament = Filament {
            id: "f1".to_string(),
            filament_type: FilamentType::Petg,
            color: "red".to_string(),
            total_weight_grams: 1000,
            remaining_weight_grams: 750,
        };
        let json = serde_json::to_value(&filament).unwrap();
        assert_eq!(json["type"], "PETG");
        assert_eq!(json["totalWeightGrams"], 1000);
        assert_eq!(json["remainingWeightGrams"], 750);
    }

    #[test]
    fn test_entity_kind_display() {
        assert_eq!(EntityKind::PrintJob.to_string(), "print job");
        assert_eq!(EntityKind::Printer.to_string(), "printer");
    }
}
