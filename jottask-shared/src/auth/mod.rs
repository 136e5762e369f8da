/// Authentication and authorization
///
/// # Modules
///
/// - [`principal`]: The authenticated caller passed into every operation
/// - [`jwt`]: Validation of access tokens issued by the auth provider
/// - [`policy`]: Row-level access policy (`authorize`)
/// - [`action_token`]: Generation and hashing of email action tokens
///
/// # Example
///
/// ```
/// use jottask_shared::auth::jwt::{create_token, validate_access_token, Claims};
/// use jottask_shared::auth::policy::{require, Operation, Resource};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "test-secret-key-at-least-32-bytes-long";
/// let token = create_token(&Claims::new(Uuid::new_v4(), "amy@example.com"), secret)?;
///
/// let principal = validate_access_token(&token, secret)?.principal();
/// require(&principal, Operation::Select, &Resource::User { id: principal.user_id })?;
/// # Ok(())
/// # }
/// ```

pub mod action_token;
pub mod jwt;
pub mod policy;
pub mod principal;
