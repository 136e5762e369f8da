/// Domain error type shared by the store, policy, quota and token layers
///
/// Every variant is recoverable and carries enough information for the API
/// layer to pick a status code. Errors raised by Postgres are translated into
/// the nearest domain kind instead of being passed through raw.
///
/// # Example
///
/// ```
/// use jottask_shared::error::Error;
///
/// let err = Error::TokenExpired;
/// assert_eq!(err.to_string(), "Action token has expired");
/// ```

use uuid::Uuid;

use crate::quota::QuotaType;

/// Result alias used throughout the shared crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Domain error kinds
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The access policy denied the operation
    #[error("Not authorized to access this resource")]
    Unauthorized,

    /// A plan limit would be exceeded
    #[error("{} limit exceeded ({current}/{limit})", .quota_type.as_str())]
    QuotaExceeded {
        quota_type: QuotaType,
        limit: u32,
        current: u32,
    },

    /// No action token matches the presented value
    #[error("Action token not found")]
    TokenNotFound,

    /// The action token is past its expiry
    #[error("Action token has expired")]
    TokenExpired,

    /// The action token was consumed before
    #[error("Action token has already been used")]
    TokenAlreadyUsed,

    /// A uniqueness or check constraint rejected the write
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The referenced row does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// A foreign key points at a row that does not exist
    #[error("Referenced {0} not found")]
    MissingReference(String),

    /// Input rejected before reaching the store
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl Error {
    /// Shorthand for a missing row
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Error::NotFound { entity, id }
    }
}

/// Postgres SQLSTATE codes we translate
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();

            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) | Some(CHECK_VIOLATION) => {
                    return Error::ConstraintViolation(describe_constraint(&constraint));
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    return Error::MissingReference(referenced_entity(&constraint).to_string());
                }
                _ => {}
            }
        }

        Error::Database(err)
    }
}

/// Names the parent table of a foreign key from the migration
fn referenced_entity(constraint: &str) -> &'static str {
    match constraint {
        "tasks_user_id_fkey"
        | "email_connections_user_id_fkey"
        | "email_action_tokens_user_id_fkey" => "user",
        "task_notes_task_id_fkey"
        | "task_checklist_items_task_id_fkey"
        | "email_action_tokens_task_id_fkey" => "task",
        "users_subscription_tier_fkey" => "plan",
        _ => "row",
    }
}

/// Maps constraint names from the migration to readable messages
fn describe_constraint(constraint: &str) -> String {
    match constraint {
        "users_email_key" => "email already registered".to_string(),
        "email_connections_user_id_email_address_key" => {
            "email address already connected".to_string()
        }
        "email_action_tokens_token_hash_key" => "action token collision".to_string(),
        other => other.to_string(),
    }
}
