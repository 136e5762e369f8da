/// Email action links
///
/// Reminder emails carry one link per action ("Done", "+1 hour", "+1 day").
/// Each link holds a single-use token. Following it consumes the token and
/// applies the action as the task's owner, with the same policy and quota
/// checks a logged-in request would get.
///
/// ```text
/// issue_action_token  → jt_… in the email, SHA-256 in email_action_tokens
/// redeem_action_token → consume (atomic) → apply action to the task
/// ```

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::action_token::{generate_action_token, hash_action_token, validate_action_token_format};
use crate::auth::principal::Principal;
use crate::error::{Error, Result};
use crate::models::action_token::{ActionKind, ConsumedToken, NewActionToken};
use crate::models::plan::PlanCatalog;
use crate::models::task::{Reschedule, Task};
use crate::services::tasks;
use crate::store::Store;

/// Lifetime of an action link unless configured otherwise
pub const DEFAULT_ACTION_TOKEN_TTL_HOURS: i64 = 7 * 24;

/// A freshly issued token; the plaintext is only ever returned here
#[derive(Debug, Clone, Serialize)]
pub struct IssuedActionToken {
    pub token: String,
    pub task_id: Uuid,
    pub action: ActionKind,
    pub expires_at: DateTime<Utc>,
}

/// Result of following an action link
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub action: ActionKind,
    pub task: Task,
}

/// Issues a token for `action` on a task owned by `user_id`
///
/// Service path only: callers are the reminder scheduler or internal API.
///
/// # Errors
///
/// - `NotFound` if the task does not exist
/// - `Unauthorized` if the task is not owned by `user_id`
pub async fn issue_action_token(
    store: &dyn Store,
    task_id: Uuid,
    user_id: Uuid,
    action: ActionKind,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<IssuedActionToken> {
    let task = store
        .get_task(task_id)
        .await?
        .ok_or_else(|| Error::not_found("Task", task_id))?;

    if task.user_id != user_id {
        tracing::warn!(%task_id, %user_id, "Refusing action token for task of another user");
        return Err(Error::Unauthorized);
    }

    let (token, token_hash) = generate_action_token();
    let stored = store
        .create_action_token(NewActionToken {
            task_id,
            user_id,
            token_hash,
            action,
            expires_at: now + ttl,
        })
        .await?;

    tracing::debug!(%task_id, action = action.as_str(), "Action token issued");

    Ok(IssuedActionToken {
        token,
        task_id,
        action,
        expires_at: stored.expires_at,
    })
}

/// Consumes a token without applying its action
///
/// Malformed tokens are reported as not found, without a store lookup.
pub async fn consume_token(store: &dyn Store, token: &str, now: DateTime<Utc>) -> Result<ConsumedToken> {
    if !validate_action_token_format(token) {
        return Err(Error::TokenNotFound);
    }

    let consumed = store.consume_action_token(&hash_action_token(token), now).await?;
    Ok(ConsumedToken::from(&consumed))
}

/// Consumes a token and applies its action to the task
///
/// The token is spent even if applying the action then fails (for example
/// reopening into a full plan); the link cannot be retried.
pub async fn redeem_action_token(
    store: &dyn Store,
    catalog: &PlanCatalog,
    token: &str,
    now: DateTime<Utc>,
) -> Result<ActionOutcome> {
    let consumed = consume_token(store, token, now).await?;
    let owner = Principal::new(consumed.user_id);

    let task = match consumed.action {
        ActionKind::Complete => tasks::complete_task(store, catalog, &owner, consumed.task_id).await?,
        ActionKind::Reopen => tasks::reopen_task(store, catalog, &owner, consumed.task_id).await?,
        ActionKind::Delay1Hour | ActionKind::Delay1Day => {
            let by = consumed.action.delay().unwrap_or_else(Duration::zero);
            tasks::reschedule_task(store, &owner, consumed.task_id, Reschedule::By(by), now).await?
        }
    };

    tracing::info!(
        user_id = %consumed.user_id,
        task_id = %consumed.task_id,
        action = consumed.action.as_str(),
        "Action link redeemed"
    );

    Ok(ActionOutcome {
        action: consumed.action,
        task,
    })
}
