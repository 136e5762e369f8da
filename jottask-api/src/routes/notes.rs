/// Task note endpoints
///
/// - `GET /v1/tasks/:id/notes` - Notes, newest first
/// - `POST /v1/tasks/:id/notes` - Add a manual note

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use jottask_shared::{auth::principal::Principal, models::task_note::TaskNote, services::tasks};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNoteRequest {
    #[validate(length(min = 1, max = 10000, message = "Note must be 1-10000 characters"))]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ListNotesResponse {
    pub notes: Vec<TaskNote>,
}

pub async fn list_notes(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<ListNotesResponse>> {
    let notes = tasks::list_notes(state.store(), &principal, task_id).await?;
    Ok(Json(ListNotesResponse { notes }))
}

pub async fn create_note(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<CreateNoteRequest>,
) -> ApiResult<(StatusCode, Json<TaskNote>)> {
    req.validate()?;

    let note = tasks::add_note(state.store(), &principal, task_id, req.content).await?;
    Ok((StatusCode::CREATED, Json(note)))
}
