//! `POST /execute/startPythonSession` / `startJavaSession` (§6): allocate
//! an interactive session and hand back its ID for a later `/ws-execute`
//! attach.

use axum::extract::State;
use axum::Json;
use sbx_interactive::Language;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Serialize)]
pub struct StartSessionResponse {
    #[serde(rename = "sessionId")]
    session_id: uuid::Uuid,
}

async fn start(state: SharedState, language: Language) -> Result<Json<StartSessionResponse>, ApiError> {
    let session_id = state
        .session_registry
        .create_session(language)
        .await
        .map_err(|e| ApiError::new(axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(StartSessionResponse { session_id }))
}

pub async fn start_python_session(State(state): State<SharedState>) -> Result<Json<StartSessionResponse>, ApiError> {
    start(state, Language::Python).await
}

pub async fn start_java_session(State(state): State<SharedState>) -> Result<Json<StartSessionResponse>, ApiError> {
    start(state, Language::Java).await
}
