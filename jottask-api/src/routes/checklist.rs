/// Checklist endpoints
///
/// - `GET /v1/tasks/:id/checklist` - Items in display order
/// - `POST /v1/tasks/:id/checklist` - Append an item
/// - `PATCH /v1/tasks/:id/checklist/:item_id` - Tick or untick

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use jottask_shared::{
    auth::principal::Principal, models::checklist_item::TaskChecklistItem, services::tasks,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateChecklistItemRequest {
    #[validate(length(min = 1, max = 500, message = "Item must be 1-500 characters"))]
    pub item_text: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChecklistItemRequest {
    pub is_completed: bool,
}

#[derive(Debug, Serialize)]
pub struct ListChecklistResponse {
    pub items: Vec<TaskChecklistItem>,
}

pub async fn list_items(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<ListChecklistResponse>> {
    let items = tasks::list_checklist(state.store(), &principal, task_id).await?;
    Ok(Json(ListChecklistResponse { items }))
}

pub async fn create_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<CreateChecklistItemRequest>,
) -> ApiResult<(StatusCode, Json<TaskChecklistItem>)> {
    req.validate()?;

    let item = tasks::add_checklist_item(state.store(), &principal, task_id, &req.item_text).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((task_id, item_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateChecklistItemRequest>,
) -> ApiResult<Json<TaskChecklistItem>> {
    let item =
        tasks::set_checklist_item_completed(state.store(), &principal, task_id, item_id, req.is_completed)
            .await?;
    Ok(Json(item))
}
