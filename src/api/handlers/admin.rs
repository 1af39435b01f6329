use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use super::ensure_serving;
use crate::api::response::{ApiError, JSend};
use crate::snapshot;
use crate::storage::EntityCounts;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub node_id: String,
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ClusterStatusResponse {
    pub cluster_info: serde_json::Value,
    pub entities: EntityCounts,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<HealthResponse>>, ApiError> {
    ensure_serving(&state)?;
    Ok(JSend::success(HealthResponse {
        node_id: state.config.node.id.clone(),
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

pub async fn cluster_status(
    State(state): State<Arc<AppState>>,
) -> Json<JSend<ClusterStatusResponse>> {
    let info = state.node.cluster_info().await;
    let peers: Vec<serde_json::Value> = info
        .peers
        .iter()
        .map(|p| {
            serde_json::json!({
                "id": p.id,
                "address": p.address,
                "status": format!("{:?}", p.status),
                "sequence": p.sequence,
            })
        })
        .collect();

    JSend::success(ClusterStatusResponse {
        cluster_info: serde_json::json!({
            "node_id": info.node_id,
            "role": format!("{:?}", info.role),
            "term": info.term,
            "leader_id": info.leader_id,
            "peers": peers,
            "sequence": info.sequence,
            "halted": state.health.halt_reason(),
        }),
        entities: state.store.counts(),
    })
}

pub async fn cluster_leader(
    State(state): State<Arc<AppState>>,
) -> Json<JSend<serde_json::Value>> {
    let info = state.node.cluster_info().await;
    JSend::success(serde_json::json!({
        "leader": info.leader_id,
        "role": format!("{:?}", info.role),
    }))
}

/// Download the node's current state in snapshot codec format.
pub async fn export_snapshot(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    ensure_serving(&state)?;
    let data = snapshot::export(&state.store)?;

    tracing::info!(bytes = data.len(), "Exported snapshot");
    Ok(([(header::CONTENT_TYPE, "application/msgpack")], data).into_response())
}
