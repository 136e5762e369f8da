/// Service-to-service endpoints
///
/// Guarded by `X-Internal-Key`. Callers are the authentication provider's
/// signup hook and the reminder mailer.
///
/// - `POST /v1/internal/users` - Create the profile for a new auth user
/// - `POST /v1/internal/action-tokens` - Issue an email action link

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Json};
use chrono::{Duration, Utc};
use jottask_shared::{
    models::{
        action_token::ActionKind,
        user::{CreateUser, User},
    },
    services::{actions, profile},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Profile creation request; `id` is the auth provider's user id
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    pub id: Uuid,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(max = 200, message = "Name must be at most 200 characters"))]
    pub full_name: Option<String>,

    #[validate(length(min = 1, max = 64, message = "Timezone must be 1-64 characters"))]
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct IssueActionTokenRequest {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub action: ActionKind,

    /// Overrides `ACTION_TOKEN_TTL_HOURS`
    #[validate(range(min = 1, max = 8760, message = "TTL must be 1-8760 hours"))]
    pub ttl_hours: Option<i64>,
}

/// Create a profile
///
/// # Errors
///
/// - `409 Conflict`: id or email already registered
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    req.validate()?;

    let user = profile::create_profile(
        state.store(),
        CreateUser {
            id: req.id,
            email: req.email,
            full_name: req.full_name,
            timezone: req.timezone,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Issue an action link
///
/// The plaintext token is returned once; only its hash is stored.
///
/// ```json
/// { "token": "jt_...", "task_id": "...", "action": "delay_1day", "expires_at": "..." }
/// ```
pub async fn issue_action_token(
    State(state): State<AppState>,
    Json(req): Json<IssueActionTokenRequest>,
) -> ApiResult<(StatusCode, Json<actions::IssuedActionToken>)> {
    req.validate()?;

    let ttl = req
        .ttl_hours
        .map(Duration::hours)
        .unwrap_or_else(|| state.config.action_token_ttl());

    let issued =
        actions::issue_action_token(state.store(), req.task_id, req.user_id, req.action, ttl, Utc::now()).await?;

    Ok((StatusCode::CREATED, Json(issued)))
}
