/// Middleware modules for the API server
///
/// - Authentication (provider JWT, internal key)
/// - Security headers

pub mod auth;
pub mod security;
