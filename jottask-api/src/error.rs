/// Error handling for the API server
///
/// Every handler returns `Result<T, ApiError>`; the error converts into a
/// JSON body with a matching status code:
///
/// ```json
/// { "error": "quota_exceeded", "message": "Pending tasks limit exceeded (50/50)" }
/// ```
///
/// # Example
///
/// ```
/// use jottask_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler() -> ApiResult<Json<serde_json::Value>> {
///     Err(ApiError::NotFound("Task not found".to_string()))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use jottask_shared::{auth::jwt::JwtError, quota::QuotaType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Missing or invalid credentials (401)
    Unauthorized(String),

    /// Denied by the access policy (403)
    Forbidden(String),

    /// Plan limit reached (402)
    QuotaExceeded {
        message: String,
        quota_type: QuotaType,
        limit: u32,
        current: u32,
    },

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), e.g. duplicate email or a spent action link
    Conflict(String),

    /// Gone (410), e.g. an expired action link
    Gone(String),

    /// Unprocessable entity (422)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Quota numbers attached to a 402
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaErrorDetail {
    pub quota_type: QuotaType,
    pub limit: u32,
    pub current: u32,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "not_found", "quota_exceeded")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Validation errors, for 422
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,

    /// Quota numbers, for 402
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaErrorDetail>,
}

impl ApiError {
    /// Single-field validation failure
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: field.to_string(),
            message: message.into(),
        }])
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::QuotaExceeded { message, .. } => write!(f, "Quota exceeded: {}", message),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Gone(msg) => write!(f, "Gone: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut quota = None;

        let (status, error_code, message, details) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::QuotaExceeded {
                message,
                quota_type,
                limit,
                current,
            } => {
                quota = Some(QuotaErrorDetail {
                    quota_type,
                    limit,
                    current,
                });
                (StatusCode::PAYMENT_REQUIRED, "quota_exceeded", message, None)
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::Gone(msg) => (StatusCode::GONE, "gone", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
            quota,
        });

        (status, body).into_response()
    }
}

/// Convert domain errors to API errors
impl From<jottask_shared::Error> for ApiError {
    fn from(err: jottask_shared::Error) -> Self {
        use jottask_shared::Error;

        let message = err.to_string();
        match err {
            Error::Unauthorized => ApiError::Forbidden(message),
            Error::QuotaExceeded {
                quota_type,
                limit,
                current,
            } => ApiError::QuotaExceeded {
                message,
                quota_type,
                limit,
                current,
            },
            Error::TokenNotFound | Error::NotFound { .. } | Error::MissingReference(_) => {
                ApiError::NotFound(message)
            }
            Error::TokenExpired => ApiError::Gone(message),
            Error::TokenAlreadyUsed | Error::ConstraintViolation(_) => ApiError::Conflict(message),
            Error::Validation(reason) => ApiError::invalid("body", reason),
            Error::Database(_) => ApiError::InternalError(message),
        }
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidAudience => ApiError::Unauthorized("Invalid token audience".to_string()),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

/// Convert `validator` failures to a 422 with one detail per field error
impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut errors: Vec<ValidationErrorDetail> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        errors.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn status_of(err: jottask_shared::Error) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Gone("Link expired".to_string());
        assert_eq!(err.to_string(), "Gone: Link expired");

        let err = ApiError::NotFound("Task not found".to_string());
        assert_eq!(err.to_string(), "Not found: Task not found");
    }

    #[test]
    fn test_domain_error_status_mapping() {
        use jottask_shared::Error;

        assert_eq!(status_of(Error::Unauthorized), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(Error::QuotaExceeded {
                quota_type: QuotaType::PendingTasks,
                limit: 50,
                current: 50,
            }),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(status_of(Error::TokenNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(Error::TokenExpired), StatusCode::GONE);
        assert_eq!(status_of(Error::TokenAlreadyUsed), StatusCode::CONFLICT);
        assert_eq!(
            status_of(Error::ConstraintViolation("email already registered".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(Error::not_found("Task", Uuid::nil())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(Error::MissingReference("task".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(Error::Validation("title is required".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(Error::Database(sqlx::Error::PoolTimedOut)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_jwt_errors_are_401() {
        assert_eq!(
            ApiError::from(JwtError::Expired).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(JwtError::InvalidAudience).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail {
                field: "email".to_string(),
                message: "Invalid email format".to_string(),
            },
            ValidationErrorDetail {
                field: "title".to_string(),
                message: "Title must be 1-500 characters".to_string(),
            },
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
    }
}
