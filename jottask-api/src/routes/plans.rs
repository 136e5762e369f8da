/// Public pricing catalog
///
/// ```text
/// GET /v1/plans
/// ```

use crate::app::AppState;
use axum::{extract::State, Json};
use jottask_shared::models::plan::SubscriptionPlan;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ListPlansResponse {
    pub plans: Vec<SubscriptionPlan>,
}

/// Lists every plan in tier order; no authentication
pub async fn list_plans(State(state): State<AppState>) -> Json<ListPlansResponse> {
    let plans = state.catalog.plans().into_iter().cloned().collect();
    Json(ListPlansResponse { plans })
}
