use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use super::{ensure_serving, submit, unexpected_output, PageParams};
use crate::api::response::{ApiError, AppJson, AppQuery, JSend, JSendPaginated};
use crate::applier::CommandOutput;
use crate::command::{AddPrinter, Command};
use crate::storage::models::Printer;
use crate::AppState;

pub async fn create_printer(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<AddPrinter>,
) -> Result<(StatusCode, Json<JSend<Printer>>), ApiError> {
    if req.id.is_empty() || req.company.is_empty() || req.model.is_empty() {
        return Err(ApiError::bad_request("id, company and model are required"));
    }

    match submit(&state, Command::AddPrinter(req)).await? {
        CommandOutput::PrinterAdded(printer) => {
            tracing::debug!(printer_id = %printer.id, "Created printer");
            Ok(JSend::created(printer))
        }
        other => Err(unexpected_output(other)),
    }
}

pub async fn get_printer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<Printer>>, ApiError> {
    ensure_serving(&state)?;
    let printer = state
        .store
        .get::<Printer>(&id)
        .ok_or_else(|| ApiError::not_found("Printer not found"))?;
    Ok(JSend::success(printer))
}

pub async fn list_printers(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<JSendPaginated<Printer>>, ApiError> {
    ensure_serving(&state)?;
    JSendPaginated::page(state.store.list_all::<Printer>(), params.limit, params.offset)
}
