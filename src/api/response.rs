use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::applier::ApplyError;
use crate::snapshot::SnapshotError;

// ============================================================================
// JSend status enum
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JSendStatus {
    Error,
    Fail,
    Success,
}

// ============================================================================
// JSend success envelope
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JSend<T: Serialize> {
    pub data: T,
    pub status: JSendStatus,
}

impl<T: Serialize> JSend<T> {
    pub fn success(data: T) -> Json<JSend<T>> {
        Json(JSend {
            data,
            status: JSendStatus::Success,
        })
    }

    pub fn created(data: T) -> (StatusCode, Json<JSend<T>>) {
        (StatusCode::CREATED, Self::success(data))
    }
}

// ============================================================================
// JSend paginated envelope
// ============================================================================

#[derive(Debug, Serialize)]
pub struct JSendPaginated<T: Serialize> {
    pub data: PaginatedData<T>,
    pub status: JSendStatus,
}

#[derive(Debug, Serialize)]
pub struct PaginatedData<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
    pub total: u64,
}

impl<T: Serialize> JSendPaginated<T> {
    pub fn success(items: Vec<T>, pagination: Pagination) -> Json<JSendPaginated<T>> {
        Json(JSendPaginated {
            data: PaginatedData { items, pagination },
            status: JSendStatus::Success,
        })
    }

    /// Slice `items` to the requested page.
    pub fn page(
        items: Vec<T>,
        limit: u32,
        offset: u32,
    ) -> Result<Json<JSendPaginated<T>>, ApiError> {
        if limit == 0 {
            return Err(ApiError::bad_request("limit must be greater than 0"));
        }
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok(Self::success(
            items,
            Pagination {
                limit,
                offset,
                total,
            },
        ))
    }
}

pub fn default_limit() -> u32 {
    20
}

// ============================================================================
// JSend fail envelope (client errors, 4xx)
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JSendFail {
    pub data: FailData,
    pub status: JSendStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FailData {
    pub message: String,
}

impl JSendFail {
    pub fn response(
        status_code: StatusCode,
        message: impl Into<String>,
    ) -> (StatusCode, Json<JSendFail>) {
        (
            status_code,
            Json(JSendFail {
                data: FailData {
                    message: message.into(),
                },
                status: JSendStatus::Fail,
            }),
        )
    }
}

// ============================================================================
// JSend error envelope (server errors, 5xx)
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JSendError {
    pub message: String,
    pub status: JSendStatus,
}

impl JSendError {
    pub fn response(
        status_code: StatusCode,
        message: impl Into<String>,
    ) -> (StatusCode, Json<JSendError>) {
        (
            status_code,
            Json(JSendError {
                message: message.into(),
                status: JSendStatus::Error,
            }),
        )
    }
}

// ============================================================================
// Unified error type for handlers
// ============================================================================

/// A JSend-compatible error that can be either a fail (4xx) or error (5xx).
#[derive(Debug)]
pub enum ApiError {
    Fail(StatusCode, String),
    Error(StatusCode, String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Fail(code, msg) => {
                let (status, json) = JSendFail::response(code, msg);
                (status, json).into_response()
            }
            ApiError::Error(code, msg) => {
                let (status, json) = JSendError::response(code, msg);
                (status, json).into_response()
            }
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::BAD_REQUEST, message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::NOT_FOUND, message.into())
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::UNPROCESSABLE_ENTITY, message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::CONFLICT, message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::SERVICE_UNAVAILABLE, message.into())
    }

    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        ApiError::Error(StatusCode::GATEWAY_TIMEOUT, message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Error(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }
}

/// Rejected commands surface as client failures, except a broken invariant
/// which means the node's own state is suspect.
impl From<ApplyError> for ApiError {
    fn from(e: ApplyError) -> Self {
        match e {
            ApplyError::UnknownCommand(_)
            | ApplyError::MalformedPayload { .. }
            | ApplyError::InvalidField { .. } => ApiError::bad_request(e.to_string()),
            ApplyError::NotFound { .. } => ApiError::not_found(e.to_string()),
            ApplyError::MissingReference { .. } => ApiError::unprocessable(e.to_string()),
            ApplyError::AlreadyExists { .. }
            | ApplyError::InsufficientFilament { .. }
            | ApplyError::InvalidTransition { .. } => ApiError::conflict(e.to_string()),
            ApplyError::InvariantViolation(_) => ApiError::internal(e.to_string()),
        }
    }
}

impl From<SnapshotError> for ApiError {
    fn from(e: SnapshotError) -> Self {
        ApiError::internal(format!("Snapshot failed: {e}"))
    }
}

// ============================================================================
// Custom extractors (reject with JSend-formatted ApiError)
// ============================================================================

/// Drop-in replacement for `axum::Json` that rejects with JSend errors.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = match rejection {
                    JsonRejection::JsonDataError(err) => {
                        format!("Invalid request body: {}", err.body_text())
                    }
                    JsonRejection::JsonSyntaxError(_) => "Malformed JSON in request body".into(),
                    JsonRejection::MissingJsonContentType(_) => {
                        "Missing Content-Type: application/json header".into()
                    }
                    _ => "Failed to read request body".into(),
                };
                Err(ApiError::bad_request(message))
            }
        }
    }
}

/// Drop-in replacement for `axum::extract::Query` that rejects with JSend errors.
pub struct AppQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, ApiError> {
        let query = parts.uri.query().unwrap_or_default();
        serde_qs::from_str(query)
            .map(AppQuery)
            .map_err(|e| ApiError::bad_request(friendly_query_error(&e.to_string())))
    }
}

/// Translate serde/serde_qs error messages into human-friendly descriptions.
fn friendly_query_error(raw: &str) -> String {
    let cleaned = raw
        .replace("u32", "non-negative integer")
        .replace("u64", "non-negative integer")
        .replace("i32", "integer")
        .replace("i64", "integer");

    format!("Invalid query parameter: {cleaned}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandKind;
    use crate::storage::models::{EntityKind, JobStatus};
    use axum::response::IntoResponse;

    fn status_of(e: ApplyError) -> StatusCode {
        ApiError::from(e).into_response().status()
    }

    #[test]
    fn test_malformed_commands_are_bad_requests() {
        assert_eq!(
            status_of(ApplyError::UnknownCommand("add_spool".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApplyError::MalformedPayload {
                command: CommandKind::AddPrintJob,
                reason: "expected value".to_string(),
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApplyError::InvalidField {
                field: "id",
                reason: "must not be empty".to_string(),
            }),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_missing_entities() {
        assert_eq!(
            status_of(ApplyError::NotFound {
                kind: EntityKind::PrintJob,
                id: "j1".to_string(),
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApplyError::MissingReference {
                kind: EntityKind::Printer,
                id: "p1".to_string(),
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_conflicts() {
        assert_eq!(
            status_of(ApplyError::AlreadyExists {
                kind: EntityKind::Filament,
                id: "f1".to_string(),
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ApplyError::InsufficientFilament {
                filament_id: "f1".to_string(),
                remaining: 40,
                pending: 30,
                requested: 20,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ApplyError::InvalidTransition {
                id: "j1".to_string(),
                from: JobStatus::Done,
                to: JobStatus::Running,
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_invariant_violation_is_server_error() {
        assert_eq!(
            status_of(ApplyError::InvariantViolation("bad state".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_snapshot_errors_are_server_errors() {
        let err = ApiError::from(SnapshotError::UnsupportedVersion(9));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
