//! Command envelope protocol.
//!
//! A [`CommandEnvelope`] is what the replication layer carries through the log:
//! a type tag plus an opaque JSON payload. It is decoded exactly once, at
//! apply time, into the typed [`Command`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::applier::ApplyError;
use crate::storage::models::{FilamentType, JobStatus};

/// Wire form of a state-changing request (replicated via muster).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Correlation id chosen by the submitting node. Never affects the outcome.
    pub request_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    AddFilament,
    AddPrintJob,
    AddPrinter,
    UpdateJobStatus,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::AddFilament => "add_filament",
            CommandKind::AddPrintJob => "add_print_job",
            CommandKind::AddPrinter => "add_printer",
            CommandKind::UpdateJobStatus => "update_job_status",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "add_filament" => Some(CommandKind::AddFilament),
            "add_print_job" => Some(CommandKind::AddPrintJob),
            "add_printer" => Some(CommandKind::AddPrinter),
            "update_job_status" => Some(CommandKind::UpdateJobStatus),
            _ => None,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPrinter {
    pub id: String,
    pub company: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFilament {
    pub id: String,
    #[serde(rename = "type")]
    pub filament_type: FilamentType,
    pub color: String,
    #[serde(alias = "totalWeightInGrams")]
    pub total_weight_grams: i64,
    /// Defaults to `total_weight_grams` (a fresh spool).
    #[serde(
        default,
        alias = "remainingWeightInGrams",
        skip_serializing_if = "Option::is_none"
    )]
    pub remaining_weight_grams: Option<i64>,
}

/// Any `status` sent alongside is ignored; new jobs always start queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPrintJob {
    pub id: String,
    #[serde(alias = "printerID")]
    pub printer_id: String,
    #[serde(alias = "filamentID")]
    pub filament_id: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(alias = "printWeightInGrams")]
    pub print_weight_grams: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobStatus {
    pub id: String,
    #[serde(alias = "status")]
    pub new_status: JobStatus,
}

/// A decoded command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddFilament(AddFilament),
    AddPrintJob(AddPrintJob),
    AddPrinter(AddPrinter),
    UpdateJobStatus(UpdateJobStatus),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::AddFilament(_) => CommandKind::AddFilament,
            Command::AddPrintJob(_) => CommandKind::AddPrintJob,
            Command::AddPrinter(_) => CommandKind::AddPrinter,
            Command::UpdateJobStatus(_) => CommandKind::UpdateJobStatus,
        }
    }

    /// Decode an envelope's tag and payload.
    pub fn decode(envelope: &CommandEnvelope) -> Result<Self, ApplyError> {
        let kind = CommandKind::from_tag(&envelope.kind)
            .ok_or_else(|| ApplyError::UnknownCommand(envelope.kind.clone()))?;

        let payload = envelope.payload.as_slice();
        let malformed = |e: serde_json::Error| ApplyError::MalformedPayload {
            command: kind,
            reason: e.to_string(),
        };

        let command = match kind {
            CommandKind::AddFilament => {
                Command::AddFilament(serde_json::from_slice(payload).map_err(malformed)?)
            }
            CommandKind::AddPrintJob => {
                Command::AddPrintJob(serde_json::from_slice(payload).map_err(malformed)?)
            }
            CommandKind::AddPrinter => {
                Command::AddPrinter(serde_json::from_slice(payload).map_err(malformed)?)
            }
            CommandKind::UpdateJobStatus => {
                Command::UpdateJobStatus(serde_json::from_slice(payload).map_err(malformed)?)
            }
        };
        Ok(command)
    }

    /// Wrap this command for submission to the log.
    pub fn into_envelope(
        self,
        request_id: impl Into<String>,
    ) -> Result<CommandEnvelope, serde_json::Error> {
        let kind = self.kind();
        let payload = match &self {
            Command::AddFilament(p) => serde_json::to_vec(p)?,
            Command::AddPrintJob(p) => serde_json::to_vec(p)?,
            Command::AddPrinter(p) => serde_json::to_vec(p)?,
            Command::UpdateJobStatus(p) => serde_json::to_vec(p)?,
        };
        Ok(CommandEnvelope {
            request_id: request_id.into(),
            kind: kind.as_str().to_string(),
            payload,
        })
    }
}
