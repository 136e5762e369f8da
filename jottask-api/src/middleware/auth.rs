/// Request authentication middleware
///
/// - [`jwt_auth_layer`]: validates the provider's bearer token and injects
///   the caller's [`Principal`] into request extensions
/// - [`internal_key_layer`]: guards service-to-service routes with the
///   shared `X-Internal-Key`

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jottask_shared::auth::{jwt, principal::Principal};
use sha2::{Digest, Sha256};

/// Header carrying the internal API key
pub const INTERNAL_KEY_HEADER: &str = "x-internal-key";

/// JWT authentication middleware layer
///
/// Extracts and validates the bearer token from the Authorization header,
/// then injects the [`Principal`] into request extensions.
pub async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))?;

    let claims = jwt::validate_access_token(token, state.jwt_secret()).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(claims.principal());

    Ok(next.run(req).await)
}

/// Internal API key middleware layer
pub async fn internal_key_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = req
        .headers()
        .get(INTERNAL_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing internal key".to_string()))?;

    if !keys_match(presented, &state.config.internal.api_key) {
        tracing::warn!(path = %req.uri().path(), "Invalid internal key");
        return Err(ApiError::Unauthorized("Invalid internal key".to_string()));
    }

    Ok(next.run(req).await)
}

/// Compares fixed-length digests so timing does not leak a matching prefix
fn keys_match(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_match() {
        assert!(keys_match("internal-test-key-0001", "internal-test-key-0001"));
        assert!(!keys_match("internal-test-key-0002", "internal-test-key-0001"));
        assert!(!keys_match("", "internal-test-key-0001"));
    }

    #[test]
    fn test_principal_from_claims() {
        let user_id = uuid::Uuid::new_v4();
        let claims = jwt::Claims::new(user_id, "rob@example.com");
        let principal: Principal = claims.principal();
        assert!(principal.is(user_id));
    }
}
