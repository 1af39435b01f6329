mod admin;
mod filaments;
mod print_jobs;
mod printers;

use serde::Deserialize;

use crate::api::response::{default_limit, ApiError};
use crate::applier::CommandOutput;
use crate::command::Command;
use crate::AppState;

pub use admin::{cluster_leader, cluster_status, export_snapshot, health};
pub use filaments::{create_filament, get_filament, list_filaments};
pub use print_jobs::{create_print_job, get_print_job, list_print_jobs, update_print_job_status};
pub use printers::{create_printer, get_printer, list_printers};

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

/// Map a MusterError to an ApiError
fn replication_error(e: muster::MusterError) -> ApiError {
    match e {
        muster::MusterError::NotLeader { .. } => {
            ApiError::unavailable("No leader available, retry shortly")
        }
        muster::MusterError::NoQuorum => {
            ApiError::unavailable("Failed to reach quorum for replication")
        }
        _ => ApiError::internal(e.to_string()),
    }
}

fn unexpected_output(output: CommandOutput) -> ApiError {
    ApiError::internal(format!("Unexpected command output: {output:?}"))
}

/// The write may still commit after we stop waiting.
fn outcome_unknown() -> ApiError {
    ApiError::gateway_timeout(
        "Timed out waiting for the command to commit; outcome unknown, re-read to confirm",
    )
}

/// Refuse to serve from a node that could not restore valid state.
fn ensure_serving(state: &AppState) -> Result<(), ApiError> {
    match state.health.halt_reason() {
        Some(reason) => Err(ApiError::unavailable(format!("Node halted: {reason}"))),
        None => Ok(()),
    }
}

/// Replicate a command and wait for this node to apply it.
///
/// A timeout leaves the outcome unknown: the command may still commit later.
async fn submit(state: &AppState, command: Command) -> Result<CommandOutput, ApiError> {
    ensure_serving(state)?;

    let kind = command.kind();
    let request_id = uuid::Uuid::new_v4().to_string();
    let envelope = command
        .into_envelope(request_id.as_str())
        .map_err(|e| ApiError::internal(format!("Failed to encode command: {e}")))?;

    let replicate = state.node.replicate(envelope);
    match tokio::time::timeout(state.config.write_timeout(), replicate).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => return Err(replication_error(e)),
        Err(_) => {
            tracing::warn!(
                request_id = %request_id,
                command = %kind,
                "Timed out waiting for commit"
            );
            return Err(outcome_unknown());
        }
    }

    match state.outcomes.take(&request_id) {
        Some(Ok(output)) => Ok(output),
        Some(Err(e)) => Err(e.into()),
        None => Err(ApiError::internal(
            "Command committed but its outcome is not available on this node",
        )),
    }
}
