//! The `/execute/*` HTTP routes (§6) and `/ws-execute` WebSocket route.

pub mod cpp;
pub mod java;
pub mod python;
pub mod session;
pub mod ws;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/execute/python", post(python::run_code))
        .route("/execute/python-project", post(python::run_project))
        .route("/execute/python-assignment", post(python::run_assignment))
        .route("/execute/java", post(java::run_code))
        .route("/execute/java-project", post(java::run_project))
        .route("/execute/java-assignment", post(java::run_assignment))
        .route("/execute/cpp", post(cpp::run_code))
        .route("/execute/cpp-project", post(cpp::run_project))
        .route("/execute/cpp-assignment", post(cpp::run_assignment))
        .route("/execute/startPythonSession", post(session::start_python_session))
        .route("/execute/startJavaSession", post(session::start_java_session))
        .route("/ws-execute", get(ws::upgrade))
}

/// Decodes `input` if `is_input_base64` is set; otherwise returns it
/// unchanged. Shared by every project/assignment route that accepts stdin.
pub(crate) fn resolve_input(input: Option<String>, is_input_base64: bool) -> Result<Option<String>, crate::error::ApiError> {
    match input {
        None => Ok(None),
        Some(raw) if is_input_base64 => {
            let bytes = sbx_io::decode_base64(&raw)?;
            Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
        }
        Some(raw) => Ok(Some(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_input_passes_through_unchanged() {
        assert_eq!(resolve_input(Some("hello".to_string()), false).unwrap(), Some("hello".to_string()));
    }

    #[test]
    fn base64_input_is_decoded() {
        let encoded = sbx_io::encode_base64(b"hello");
        assert_eq!(resolve_input(Some(encoded), true).unwrap(), Some("hello".to_string()));
    }

    #[test]
    fn absent_input_stays_absent() {
        assert_eq!(resolve_input(None, true).unwrap(), None);
    }

    #[test]
    fn invalid_base64_input_is_an_error() {
        assert!(resolve_input(Some("not valid base64!!".to_string()), true).is_err());
    }
}
