/// Email action links
///
/// ```text
/// GET /v1/actions/jt_3k9...
/// ```
///
/// The token in the path is the only credential. A link works once:
///
/// - `200 OK`: action applied, body is the updated task
/// - `404 Not Found`: unknown token, or its task was deleted
/// - `410 Gone`: link expired
/// - `409 Conflict`: link already used

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use jottask_shared::services::actions::{self, ActionOutcome};

pub async fn redeem_action(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<ActionOutcome>> {
    let outcome = actions::redeem_action_token(state.store(), &state.catalog, &token, Utc::now())
        .await
        .map_err(|e| {
            tracing::info!(error = %e, "Action link rejected");
            e
        })?;

    Ok(Json(outcome))
}
