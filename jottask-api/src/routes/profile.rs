/// The caller's profile and quota
///
/// # Endpoints
///
/// - `GET /v1/me` - Profile with trial status
/// - `PATCH /v1/me` - Update name, timezone or settings
/// - `GET /v1/me/quota` - Plan and current usage

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use chrono::Utc;
use jottask_shared::{
    auth::principal::Principal,
    models::{
        plan::SubscriptionPlan,
        user::{UpdateUser, User},
    },
    quota::QuotaUsage,
    services::profile,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Update profile request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub full_name: Option<String>,

    /// IANA zone name, e.g. `Australia/Sydney`
    #[validate(length(min = 1, max = 64, message = "Timezone must be 1-64 characters"))]
    pub timezone: Option<String>,

    pub settings: Option<serde_json::Value>,
}

impl From<UpdateProfileRequest> for UpdateUser {
    fn from(req: UpdateProfileRequest) -> Self {
        UpdateUser {
            full_name: req.full_name,
            timezone: req.timezone,
            settings: req.settings,
        }
    }
}

/// Profile with the subscription state worked out for display
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: User,
    pub has_active_access: bool,
    pub trial_days_remaining: Option<i64>,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        let now = Utc::now();
        ProfileResponse {
            has_active_access: user.has_active_access(now),
            trial_days_remaining: user.trial_days_remaining(now),
            user,
        }
    }
}

/// Quota response
#[derive(Debug, Serialize)]
pub struct QuotaResponse {
    pub plan: SubscriptionPlan,
    pub usage: QuotaUsage,
    pub can_create_task: bool,
}

pub async fn get_me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<ProfileResponse>> {
    let user = profile::get_profile(state.store(), &principal).await?;
    Ok(Json(user.into()))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    req.validate()?;

    let user = profile::update_profile(state.store(), &principal, req.into()).await?;
    Ok(Json(user.into()))
}

/// Plan limits and usage
///
/// ```json
/// {
///   "plan": { "id": "starter", "max_tasks": 50, ... },
///   "usage": {
///     "plan": "starter",
///     "pending_tasks": { "quota_type": "pending_tasks", "allowed": true, "current": 12, "limit": 50, "remaining": 38 },
///     "email_connections": { ... }
///   },
///   "can_create_task": true
/// }
/// ```
pub async fn get_quota(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<QuotaResponse>> {
    let (plan, usage) = profile::get_quota(state.store(), &state.catalog, &principal).await?;

    Ok(Json(QuotaResponse {
        plan,
        can_create_task: usage.pending_tasks.allowed,
        usage,
    }))
}
