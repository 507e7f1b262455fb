//! `/execute/java*` (§6): the Java runner triad. Project and assignment
//! bodies carry `mainClassName`; its absence is a 400, mirroring the
//! interactive coordinator's `BadCommand` for the same omission (§4.4).

use axum::extract::State;
use axum::Json;
use sbx_runners::{AssignmentRequest, AssignmentResult, CodeRequest, ExecutionResult, ProjectRequest};

use super::resolve_input;
use crate::error::ApiError;
use crate::state::SharedState;

fn require_main_class(name: Option<&str>) -> Result<&str, ApiError> {
    name.filter(|n| !n.is_empty()).ok_or_else(|| ApiError::bad_request("mainClassName is required for Java"))
}

pub async fn run_code(State(state): State<SharedState>, Json(req): Json<CodeRequest>) -> Result<Json<ExecutionResult>, ApiError> {
    let result = sbx_runners::java::run_code(
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
    let main_class = require_main_class(req.main_class_name.as_deref())?;
    let input = resolve_input(req.input, req.is_input_base64)?;
    let result = sbx_runners::java::run_project(
        state.container_registry.clone(),
        &state.workspace_root,
        &state.images,
        &state.limits,
        &req.main_file,
        req.additional_files,
        main_class,
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
    let main_class = require_main_class(req.main_class_name.as_deref())?;
    let result = sbx_runners::java::run_assignment(
        state.container_registry.clone(),
        &state.workspace_root,
        &state.images,
        &state.limits,
        &req.main_file,
        req.additional_files,
        req.test_files,
        main_class,
    )
    .await?;
    Ok(Json(result))
}
