/// Task endpoints
///
/// All endpoints require JWT authentication and act on the caller's tasks.
///
/// # Endpoints
///
/// - `GET /v1/tasks?status=pending&limit=50&offset=0` - List tasks
/// - `POST /v1/tasks` - Create a pending task (quota-checked)
/// - `GET /v1/tasks/:id` - Get task
/// - `PATCH /v1/tasks/:id` - Update task
/// - `DELETE /v1/tasks/:id` - Delete task and its notes, checklist and links
/// - `POST /v1/tasks/:id/complete` - Mark completed
/// - `POST /v1/tasks/:id/reopen` - Back to pending (quota-checked)
/// - `POST /v1/tasks/:id/reschedule` - Move to a picked due date and time

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use jottask_shared::{
    auth::principal::Principal,
    models::task::{CreateTask, Reschedule, Task, TaskFilter, TaskPriority, TaskStatus, UpdateTask},
    services::tasks,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Largest page a client may request
const MAX_PAGE_SIZE: i64 = 500;

/// List query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<TaskStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<ListTasksQuery> for TaskFilter {
    fn from(query: ListTasksQuery) -> Self {
        let defaults = TaskFilter::default();
        TaskFilter {
            status: query.status,
            limit: query.limit.unwrap_or(defaults.limit).clamp(1, MAX_PAGE_SIZE),
            offset: query.offset.unwrap_or(defaults.offset).max(0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListTasksResponse {
    pub tasks: Vec<Task>,
}

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 500, message = "Title must be 1-500 characters"))]
    pub title: String,

    #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
    pub description: Option<String>,

    #[serde(default)]
    pub priority: TaskPriority,

    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,

    #[validate(length(max = 200, message = "Client name must be at most 200 characters"))]
    pub client_name: Option<String>,

    #[validate(email(message = "Invalid client email"))]
    pub client_email: Option<String>,

    #[validate(length(max = 50, message = "Client phone must be at most 50 characters"))]
    pub client_phone: Option<String>,

    #[validate(length(max = 200, message = "Project name must be at most 200 characters"))]
    pub project_name: Option<String>,
}

impl CreateTaskRequest {
    fn into_create(self, user_id: Uuid) -> CreateTask {
        CreateTask {
            user_id,
            title: self.title,
            description: self.description,
            priority: self.priority,
            due_date: self.due_date,
            due_time: self.due_time,
            client_name: self.client_name,
            client_email: self.client_email,
            client_phone: self.client_phone,
            project_name: self.project_name,
        }
    }
}

/// Update task request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 500, message = "Title must be 1-500 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,

    #[validate(length(max = 200, message = "Client name must be at most 200 characters"))]
    pub client_name: Option<String>,

    #[validate(email(message = "Invalid client email"))]
    pub client_email: Option<String>,

    #[validate(length(max = 50, message = "Client phone must be at most 50 characters"))]
    pub client_phone: Option<String>,

    #[validate(length(max = 200, message = "Project name must be at most 200 characters"))]
    pub project_name: Option<String>,
}

impl From<UpdateTaskRequest> for UpdateTask {
    fn from(req: UpdateTaskRequest) -> Self {
        UpdateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            due_date: req.due_date,
            due_time: req.due_time,
            client_name: req.client_name,
            client_email: req.client_email,
            client_phone: req.client_phone,
            project_name: req.project_name,
        }
    }
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<ListTasksResponse>> {
    let tasks = tasks::list_tasks(state.store(), &principal, query.into()).await?;
    Ok(Json(ListTasksResponse { tasks }))
}

/// Create task
///
/// ```text
/// POST /v1/tasks
/// Authorization: Bearer <jwt_token>
///
/// { "title": "Quote for kitchen reno", "due_date": "2026-03-10", "due_time": "09:00:00" }
/// ```
///
/// # Errors
///
/// - `402 Payment Required`: Pending task limit of the plan reached
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let data = req.into_create(principal.user_id);
    let task = tasks::create_task(state.store(), &state.catalog, &principal, data).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = tasks::get_task(state.store(), &principal, id).await?;
    Ok(Json(task))
}

/// Update task
///
/// Setting `status` to `pending` on a completed or cancelled task is
/// quota-checked like a create.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    let task = tasks::update_task(state.store(), &state.catalog, &principal, id, req.into()).await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tasks::delete_task(state.store(), &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn complete_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = tasks::complete_task(state.store(), &state.catalog, &principal, id).await?;
    Ok(Json(task))
}

pub async fn reopen_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = tasks::reopen_task(state.store(), &state.catalog, &principal, id).await?;
    Ok(Json(task))
}

/// Reschedule request
///
/// ```json
/// { "due_date": "2026-03-12", "due_time": "14:00:00" }
/// ```
#[derive(Debug, Deserialize)]
pub struct RescheduleTaskRequest {
    pub due_date: NaiveDate,
    pub due_time: NaiveTime,
}

/// Leaves the status alone and appends a "Rescheduled to ..." note
pub async fn reschedule_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<RescheduleTaskRequest>,
) -> ApiResult<Json<Task>> {
    let to = Reschedule::To {
        date: req.due_date,
        time: req.due_time,
    };
    let task = tasks::reschedule_task(state.store(), &principal, id, to, Utc::now()).await?;
    Ok(Json(task))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_clamped() {
        let filter: TaskFilter = ListTasksQuery {
            status: Some(TaskStatus::Pending),
            limit: Some(10_000),
            offset: Some(-5),
        }
        .into();

        assert_eq!(filter.status, Some(TaskStatus::Pending));
        assert_eq!(filter.limit, MAX_PAGE_SIZE);
        assert_eq!(filter.offset, 0);
    }

    #[test]
    fn test_list_query_defaults() {
        let filter: TaskFilter = ListTasksQuery::default().into();
        assert_eq!(filter.limit, 100);
        assert_eq!(filter.offset, 0);
        assert!(filter.status.is_none());
    }

    #[test]
    fn test_create_request_validation() {
        let req = CreateTaskRequest {
            title: String::new(),
            description: None,
            priority: TaskPriority::High,
            due_date: None,
            due_time: None,
            client_name: None,
            client_email: Some("not-an-email".to_string()),
            client_phone: None,
            project_name: None,
        };

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("client_email"));
    }
}
