use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ensure_serving, submit, unexpected_output};
use crate::api::response::{default_limit, ApiError, AppJson, AppQuery, JSend, JSendPaginated};
use crate::applier::CommandOutput;
use crate::command::{AddPrintJob, Command, UpdateJobStatus};
use crate::storage::models::{JobStatus, PrintJob};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListPrintJobsParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub printer_id: Option<String>,
    #[serde(default)]
    pub filament_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusParams {
    pub status: JobStatus,
}

/// Acknowledgement of a committed status change. Fetch the job for its
/// current state.
#[derive(Debug, Serialize)]
pub struct StatusUpdateResponse {
    pub id: String,
    pub message: String,
    pub previous_status: JobStatus,
    pub status: JobStatus,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_print_job(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<AddPrintJob>,
) -> Result<(StatusCode, Json<JSend<PrintJob>>), ApiError> {
    if req.id.is_empty() || req.printer_id.is_empty() || req.filament_id.is_empty() {
        return Err(ApiError::bad_request("id, printerId and filamentId are required"));
    }

    match submit(&state, Command::AddPrintJob(req)).await? {
        CommandOutput::PrintJobAdded(job) => {
            tracing::debug!(
                job_id = %job.id,
                printer_id = %job.printer_id,
                filament_id = %job.filament_id,
                grams = job.print_weight_grams,
                "Queued print job"
            );
            Ok(JSend::created(job))
        }
        other => Err(unexpected_output(other)),
    }
}

pub async fn update_print_job_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppQuery(params): AppQuery<UpdateStatusParams>,
) -> Result<Json<JSend<StatusUpdateResponse>>, ApiError> {
    let command = Command::UpdateJobStatus(UpdateJobStatus {
        id,
        new_status: params.status,
    });

    match submit(&state, command).await? {
        CommandOutput::JobStatusUpdated {
            id,
            previous,
            status,
        } => {
            tracing::debug!(job_id = %id, from = %previous, to = %status, "Updated job status");
            Ok(JSend::success(StatusUpdateResponse {
                id,
                message: "update committed".to_string(),
                previous_status: previous,
                status,
            }))
        }
        other => Err(unexpected_output(other)),
    }
}

pub async fn get_print_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<PrintJob>>, ApiError> {
    ensure_serving(&state)?;
    let job = state
        .store
        .get::<PrintJob>(&id)
        .ok_or_else(|| ApiError::not_found("Print job not found"))?;
    Ok(JSend::success(job))
}

pub async fn list_print_jobs(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListPrintJobsParams>,
) -> Result<Json<JSendPaginated<PrintJob>>, ApiError> {
    ensure_serving(&state)?;

    let jobs: Vec<PrintJob> = state
        .store
        .list_all::<PrintJob>()
        .into_iter()
        .filter(|job| params.status.is_none_or(|s| job.status == s))
        .filter(|job| {
            params
                .printer_id
                .as_deref()
                .is_none_or(|p| job.printer_id == p)
        })
        .filter(|job| {
            params
                .filament_id
                .as_deref()
                .is_none_or(|f| job.filament_id == f)
        })
        .collect();

    JSendPaginated::page(jobs, params.limit, params.offset)
}
