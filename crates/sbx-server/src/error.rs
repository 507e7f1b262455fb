//! HTTP error taxonomy (§7): maps the engine's domain errors onto the
//! status codes the batch API promises — 400 with `{message}` for
//! anything raised before or during a run, 500 for launch failures the
//! runtime itself rejected.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

/// Wraps any runner/coordinator error with the HTTP status §7 assigns it.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { message: self.message })).into_response()
    }
}

impl From<sbx_runners::RunnerError> for ApiError {
    fn from(e: sbx_runners::RunnerError) -> Self {
        use sbx_runners::RunnerError::*;
        let status = match &e {
            InvalidEncoding | UnsafeSource(_) => StatusCode::BAD_REQUEST,
            Container(_) | Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ArtifactRetrieval(_) => StatusCode::BAD_REQUEST,
        };
        Self { status, message: e.to_string() }
    }
}

impl From<sbx_io::IoError> for ApiError {
    fn from(e: sbx_io::IoError) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: e.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_encoding_maps_to_bad_request() {
        let err: ApiError = sbx_runners::RunnerError::InvalidEncoding.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn container_launch_failure_maps_to_internal_server_error() {
        let err: ApiError = sbx_runners::RunnerError::Container(sbx_container::ContainerError::LaunchFailure(
            "daemon unreachable".into(),
        ))
        .into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn io_error_maps_to_bad_request() {
        let err: ApiError = sbx_io::IoError::InvalidEncoding.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
