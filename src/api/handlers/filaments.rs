use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use super::{ensure_serving, submit, unexpected_output, PageParams};
use crate::api::response::{ApiError, AppJson, AppQuery, JSend, JSendPaginated};
use crate::applier::CommandOutput;
use crate::command::{AddFilament, Command};
use crate::storage::models::Filament;
use crate::AppState;

pub async fn create_filament(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<AddFilament>,
) -> Result<(StatusCode, Json<JSend<Filament>>), ApiError> {
    if req.id.is_empty() || req.color.is_empty() {
        return Err(ApiError::bad_request("id, type and color are required"));
    }

    match submit(&state, Command::AddFilament(req)).await? {
        CommandOutput::FilamentAdded(filament) => {
            tracing::debug!(
                filament_id = %filament.id,
                filament_type = %filament.filament_type,
                grams = filament.remaining_weight_grams,
                "Created filament"
            );
            Ok(JSend::created(filament))
        }
        other => Err(unexpected_output(other)),
    }
}

pub async fn get_filament(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<Filament>>, ApiError> {
    ensure_serving(&state)?;
    let filament = state
        .store
        .get::<Filament>(&id)
        .ok_or_else(|| ApiError::not_found("Filament not found"))?;
    Ok(JSend::success(filament))
}

pub async fn list_filaments(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<JSendPaginated<Filament>>, ApiError> {
    ensure_serving(&state)?;
    JSendPaginated::page(
        state.store.list_all::<Filament>(),
        params.limit,
        params.offset,
    )
}
