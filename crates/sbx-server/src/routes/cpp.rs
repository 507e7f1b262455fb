//! `/execute/cpp*` (§6): the C++ runner triad.

use axum::extract::State;
use axum::Json;
use sbx_runners::{AssignmentRequest, AssignmentResult, CodeRequest, ExecutionResult, ProjectRequest};

use super::resolve_input;
use crate::error::ApiError;
use crate::state::SharedState;

pub async fn run_code(State(state): State<SharedState>, Json(req): Json<CodeRequest>) -> Result<Json<ExecutionResult>, ApiError> {
    let result = sbx_runners::cpp::run_code(
        state.container_registry.clone(),
        &state.workspace_root,
        &state.images,
        &state.limits,
        &req.code,
    )
    .await?;
    Ok(Json(result))
}

pub async fn run_project(State(state): State<SharedState>, Json(req): Json<ProjectRequest>) -> Result<Json<ExecutionResult>, ApiError> {
    let input = resolve_input(req.input, req.is_input_base64)?;
    let result = sbx_runners::cpp::run_project(
        state.container_registry.clone(),
        &state.workspace_root,
        &state.images,
        &state.limits,
        &req.main_file,
        req.additional_files,
        input.as_deref(),
        req.should_output_base64,
    )
    .await?;
    Ok(Json(result))
}

pub async fn run_assignment(
    State(state): State<SharedState>,
    Json(req): Json<AssignmentRequest>,
) -> Result<Json<AssignmentResult>, ApiError> {
    let result = sbx_runners::cpp::run_assignment(
        state.container_registry.clone(),
        &state.workspace_root,
        &state.images,
        &state.limits,
        &req.main_file,
        req.additional_files,
        req.test_files,
    )
    .await?;
    Ok(Json(result))
}
