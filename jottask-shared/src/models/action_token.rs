/// Single-use action tokens embedded in task reminder emails
///
/// Each token authorizes exactly one action on one task without a login.
/// Only the SHA-256 digest of the token is stored (see
/// [`crate::auth::action_token`]); the plaintext exists only in the email.
///
/// A token is usable while `used_at` is NULL and `expires_at >= now`.
/// Consumption is one conditional UPDATE, so two concurrent consumers cannot
/// both succeed.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE email_action_tokens (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     token_hash TEXT NOT NULL UNIQUE,
///     action TEXT NOT NULL
///         CHECK (action IN ('complete', 'delay_1hour', 'delay_1day', 'reopen')),
///     expires_at TIMESTAMPTZ NOT NULL,
///     used_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// What following the link does to the task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum ActionKind {
    #[sqlx(rename = "complete")]
    #[serde(rename = "complete")]
    Complete,

    #[sqlx(rename = "delay_1hour")]
    #[serde(rename = "delay_1hour")]
    Delay1Hour,

    #[sqlx(rename = "delay_1day")]
    #[serde(rename = "delay_1day")]
    Delay1Day,

    #[sqlx(rename = "reopen")]
    #[serde(rename = "reopen")]
    Reopen,
}

impl ActionKind {
    /// Converts action to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Complete => "complete",
            ActionKind::Delay1Hour => "delay_1hour",
            ActionKind::Delay1Day => "delay_1day",
            ActionKind::Reopen => "reopen",
        }
    }

    /// How far a delay action pushes the due date
    pub fn delay(&self) -> Option<Duration> {
        match self {
            ActionKind::Delay1Hour => Some(Duration::hours(1)),
            ActionKind::Delay1Day => Some(Duration::days(1)),
            ActionKind::Complete | ActionKind::Reopen => None,
        }
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "complete" => Ok(ActionKind::Complete),
            "delay_1hour" => Ok(ActionKind::Delay1Hour),
            "delay_1day" => Ok(ActionKind::Delay1Day),
            "reopen" => Ok(ActionKind::Reopen),
            other => Err(format!("unknown action: {}", other)),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmailActionToken {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,

    /// SHA-256 hex digest of the plaintext token
    #[serde(skip_serializing)]
    pub token_hash: String,

    pub action: ActionKind,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl EmailActionToken {
    /// Checks a token that could not be consumed, in rejection order
    ///
    /// Expiry is reported before prior use, so an expired token that was
    /// also used reads as expired.
    pub fn ensure_usable(&self, now: DateTime<Utc>) -> Result<()> {
        if now > self.expires_at {
            return Err(Error::TokenExpired);
        }
        if self.used_at.is_some() {
            return Err(Error::TokenAlreadyUsed);
        }
        Ok(())
    }
}

/// Input for issuing a token; the plaintext never reaches this struct
#[derive(Debug, Clone)]
pub struct NewActionToken {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub action: ActionKind,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of a consumed token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConsumedToken {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub action: ActionKind,
}

impl From<&EmailActionToken> for ConsumedToken {
    fn from(token: &EmailActionToken) -> Self {
        Self {
            task_id: token.task_id,
            user_id: token.user_id,
            action: token.action,
        }
    }
}

const TOKEN_COLUMNS: &str = "id, task_id, user_id, token_hash, action, expires_at, used_at, created_at";

impl EmailActionToken {
    /// Stores a newly issued token
    pub async fn create<'e, E: PgExecutor<'e>>(db: E, data: NewActionToken) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO email_action_tokens (task_id, user_id, token_hash, action, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TOKEN_COLUMNS}
            "#
        );

        sqlx::query_as::<_, EmailActionToken>(&query)
            .bind(data.task_id)
            .bind(data.user_id)
            .bind(data.token_hash)
            .bind(data.action)
            .bind(data.expires_at)
            .fetch_one(db)
            .await
    }

    /// Finds a token by digest
    pub async fn find_by_hash<'e, E: PgExecutor<'e>>(
        db: E,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TOKEN_COLUMNS} FROM email_action_tokens WHERE token_hash = $1");

        sqlx::query_as::<_, EmailActionToken>(&query)
            .bind(token_hash)
            .fetch_optional(db)
            .await
    }

    /// Marks a usable token used at `now`
    ///
    /// Returns `None` when no usable token matches; the caller then looks the
    /// row up to tell missing, expired and used apart.
    pub async fn consume<'e, E: PgExecutor<'e>>(
        db: E,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE email_action_tokens
            SET used_at = $2
            WHERE token_hash = $1 AND used_at IS NULL AND expires_at >= $2
            RETURNING {TOKEN_COLUMNS}
            "#
        );

        sqlx::query_as::<_, EmailActionToken>(&query)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_in: Duration, used: bool) -> EmailActionToken {
        let now = Utc::now();
        EmailActionToken {
            id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "0".repeat(64),
            action: ActionKind::Complete,
            expires_at: now + expires_in,
            used_at: used.then_some(now),
            created_at: now,
        }
    }

    #[test]
    fn test_action_strings() {
        for action in [
            ActionKind::Complete,
            ActionKind::Delay1Hour,
            ActionKind::Delay1Day,
            ActionKind::Reopen,
        ] {
            assert_eq!(action.as_str().parse::<ActionKind>(), Ok(action));
            assert_eq!(
                serde_json::to_value(action).unwrap(),
                serde_json::Value::String(action.as_str().to_string())
            );
        }
        assert!("delay_custom".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_delay_durations() {
        assert_eq!(ActionKind::Delay1Hour.delay(), Some(Duration::hours(1)));
        assert_eq!(ActionKind::Delay1Day.delay(), Some(Duration::days(1)));
        assert_eq!(ActionKind::Complete.delay(), None);
    }

    #[test]
    fn test_usable_token() {
        assert!(token(Duration::hours(1), false).ensure_usable(Utc::now()).is_ok());
    }

    #[test]
    fn test_expired_token_rejected_even_unused() {
        let result = token(Duration::hours(-1), false).ensure_usable(Utc::now());
        assert!(matches!(result, Err(Error::TokenExpired)));
    }

    #[test]
    fn test_used_token_rejected() {
        let result = token(Duration::hours(1), true).ensure_usable(Utc::now());
        assert!(matches!(result, Err(Error::TokenAlreadyUsed)));
    }

    #[test]
    fn test_expiry_reported_before_use() {
        let result = token(Duration::hours(-1), true).ensure_usable(Utc::now());
        assert!(matches!(result, Err(Error::TokenExpired)));
    }
}
