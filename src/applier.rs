//! Deterministic command application.
//!
//! Outcomes depend only on the command and the current store contents. Every
//! check runs before the first write, so a rejected command leaves the store
//! exactly as it was.

use std::sync::Arc;

use thiserror::Error;

use crate::command::{
    AddFilament, AddPrintJob, AddPrinter, Command, CommandEnvelope, CommandKind, UpdateJobStatus,
};
use crate::storage::models::{EntityKind, Filament, JobStatus, PrintJob, Printer};
use crate::storage::{Entity, FleetState, StateStore};

/// Result of an accepted command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    FilamentAdded(Filament),
    JobStatusUpdated {
        id: String,
        previous: JobStatus,
        status: JobStatus,
    },
    PrintJobAdded(PrintJob),
    PrinterAdded(Printer),
}

/// Coarse grouping of rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The envelope or payload could not be decoded or failed field checks.
    Malformed,
    /// A referenced or targeted entity does not exist.
    Reference,
    /// Accepting the command would break a business rule.
    Invariant,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("unknown command type '{0}'")]
    UnknownCommand(String),
    #[error("malformed {command} payload: {reason}")]
    MalformedPayload { command: CommandKind, reason: String },
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("{kind} '{id}' already exists")]
    AlreadyExists { kind: EntityKind, id: String },
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },
    #[error("referenced {kind} '{id}' does not exist")]
    MissingReference { kind: EntityKind, id: String },
    #[error(
        "not enough filament remaining on '{filament_id}': \
         {remaining}g remaining, {pending}g reserved, {requested}g requested"
    )]
    InsufficientFilament {
        filament_id: String,
        remaining: i64,
        pending: i64,
        requested: i64,
    },
    #[error("invalid status transition for job '{id}' from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl ApplyError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ApplyError::UnknownCommand(_)
            | ApplyError::MalformedPayload { .. }
            | ApplyError::InvalidField { .. } => ErrorClass::Malformed,
            ApplyError::NotFound { .. } | ApplyError::MissingReference { .. } => {
                ErrorClass::Reference
            }
            ApplyError::AlreadyExists { .. }
            | ApplyError::InsufficientFilament { .. }
            | ApplyError::InvalidTransition { .. }
            | ApplyError::InvariantViolation(_) => ErrorClass::Invariant,
        }
    }
}

/// Applies committed commands to a single [`StateStore`].
#[derive(Debug, Clone)]
pub struct CommandApplier {
    store: Arc<StateStore>,
}

impl CommandApplier {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Decode and apply one committed log entry.
    pub fn apply(&self, envelope: &CommandEnvelope) -> Result<CommandOutput, ApplyError> {
        let result = Command::decode(envelope).and_then(|command| self.execute(command));

        match &result {
            Ok(_) => tracing::debug!(
                request_id = %envelope.request_id,
                command = %envelope.kind,
                "Applied command"
            ),
            Err(e) => tracing::debug!(
                request_id = %envelope.request_id,
                command = %envelope.kind,
                error = %e,
                "Rejected command"
            ),
        }
        result
    }

    /// Apply an already decoded command under the store lock.
    pub fn execute(&self, command: Command) -> Result<CommandOutput, ApplyError> {
        self.store.with_state(|state| match command {
            Command::AddFilament(cmd) => add_filament(state, cmd),
            Command::AddPrintJob(cmd) => add_print_job(state, cmd),
            Command::AddPrinter(cmd) => add_printer(state, cmd),
            Command::UpdateJobStatus(cmd) => update_job_status(state, cmd),
        })
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ApplyError> {
    if value.is_empty() {
        return Err(ApplyError::InvalidField {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

fn ensure_absent<T: Entity>(state: &FleetState, id: &str) -> Result<(), ApplyError> {
    if state.contains::<T>(id) {
        return Err(ApplyError::AlreadyExists {
            kind: T::KIND,
            id: id.to_string(),
        });
    }
    Ok(())
}

fn ensure_referenced<T: Entity>(state: &FleetState, id: &str) -> Result<(), ApplyError> {
    if !state.contains::<T>(id) {
        return Err(ApplyError::MissingReference {
            kind: T::KIND,
            id: id.to_string(),
        });
    }
    Ok(())
}

fn add_printer(state: &mut FleetState, cmd: AddPrinter) -> Result<CommandOutput, ApplyError> {
    require_non_empty("id", &cmd.id)?;
    require_non_empty("company", &cmd.company)?;
    require_non_empty("model", &cmd.model)?;
    ensure_absent::<Printer>(state, &cmd.id)?;

    let printer = Printer {
        id: cmd.id,
        company: cmd.company,
        model: cmd.model,
    };
    state.insert(printer.clone());
    Ok(CommandOutput::PrinterAdded(printer))
}

fn add_filament(state: &mut FleetState, cmd: AddFilament) -> Result<CommandOutput, ApplyError> {
    require_non_empty("id", &cmd.id)?;
    require_non_empty("color", &cmd.color)?;
    if cmd.total_weight_grams < 0 {
        return Err(ApplyError::InvalidField {
            field: "totalWeightGrams",
            reason: format!("must not be negative, got {}", cmd.total_weight_grams),
        });
    }
    let remaining = cmd.remaining_weight_grams.unwrap_or(cmd.total_weight_grams);
    if !(0..=cmd.total_weight_grams).contains(&remaining) {
        return Err(ApplyError::InvalidField {
            field: "remainingWeightGrams",
            reason: format!(
                "must be between 0 and {}, got {remaining}",
                cmd.total_weight_grams
            ),
        });
    }
    ensure_absent::<Filament>(state, &cmd.id)?;

    let filament = Filament {
        id: cmd.id,
        filament_type: cmd.filament_type,
        color: cmd.color,
        total_weight_grams: cmd.total_weight_grams,
        remaining_weight_grams: remaining,
    };
    state.insert(filament.clone());
    Ok(CommandOutput::FilamentAdded(filament))
}

fn add_print_job(state: &mut FleetState, cmd: AddPrintJob) -> Result<CommandOutput, ApplyError> {
    require_non_empty("id", &cmd.id)?;
    require_non_empty("printerId", &cmd.printer_id)?;
    require_non_empty("filamentId", &cmd.filament_id)?;
    if cmd.print_weight_grams < 0 {
        return Err(ApplyError::InvalidField {
            field: "printWeightGrams",
            reason: format!("must not be negative, got {}", cmd.print_weight_grams),
        });
    }
    ensure_absent::<PrintJob>(state, &cmd.id)?;
    ensure_referenced::<Printer>(state, &cmd.printer_id)?;

    let remaining = state
        .get::<Filament>(&cmd.filament_id)
        .map(|f| f.remaining_weight_grams)
        .ok_or_else(|| ApplyError::MissingReference {
            kind: EntityKind::Filament,
            id: cmd.filament_id.clone(),
        })?;

    // Admission check only; reservations are not revisited later.
    let pending = state.pending_weight(&cmd.filament_id);
    if remaining < pending.saturating_add(cmd.print_weight_grams) {
        return Err(ApplyError::InsufficientFilament {
            filament_id: cmd.filament_id,
            remaining,
            pending,
            requested: cmd.print_weight_grams,
        });
    }

    let job = PrintJob {
        id: cmd.id,
        printer_id: cmd.printer_id,
        filament_id: cmd.filament_id,
        file_path: cmd.file_path,
        print_weight_grams: cmd.print_weight_grams,
        status: JobStatus::Queued,
    };
    state.insert(job.clone());
    Ok(CommandOutput::PrintJobAdded(job))
}

fn update_job_status(
    state: &mut FleetState,
    cmd: UpdateJobStatus,
) -> Result<CommandOutput, ApplyError> {
    let job = state
        .get::<PrintJob>(&cmd.id)
        .ok_or_else(|| ApplyError::NotFound {
            kind: EntityKind::PrintJob,
            id: cmd.id.clone(),
        })?;

    let previous = job.status;
    if !previous.can_transition_to(cmd.new_status) {
        return Err(ApplyError::InvalidTransition {
            id: cmd.id,
            from: previous,
            to: cmd.new_status,
        });
    }

    // Work out the filament deduction before touching anything.
    let deduction = if cmd.new_status == JobStatus::Done {
        let filament = state
            .get::<Filament>(&job.filament_id)
            .ok_or_else(|| {
                ApplyError::InvariantViolation(format!(
                    "filament '{}' of job '{}' no longer exists",
                    job.filament_id, job.id
                ))
            })?;
        let left = filament.remaining_weight_grams - job.print_weight_grams;
        if !(0..=filament.total_weight_grams).contains(&left) {
            return Err(ApplyError::InvariantViolation(format!(
                "completing job '{}' would leave filament '{}' at {left}g",
                job.id, filament.id
            )));
        }
        Some((filament.id.clone(), left))
    } else {
        None
    };

    if let Some((filament_id, left)) = deduction {
        if let Some(filament) = state.get_mut::<Filament>(&filament_id) {
            filament.remaining_weight_grams = left;
        }
    }
    if let Some(job) = state.get_mut::<PrintJob>(&cmd.id) {
        job.status = cmd.new_status;
    }

    Ok(CommandOutput::JobStatusUpdated {
        id: cmd.id,
        previous,
        status: cmd.new_status,
    })
}
