/// API route handlers, one module per resource
///
/// - `health`: Health check
/// - `plans`: Public pricing catalog
/// - `actions`: Email action links
/// - `profile`: The caller's profile and quota
/// - `tasks`, `notes`, `checklist`: Tasks and their children
/// - `email_connections`: Connected mailboxes
/// - `internal`: Service-to-service endpoints

pub mod actions;
pub mod checklist;
pub mod email_connections;
pub mod health;
pub mod internal;
pub mod notes;
pub mod plans;
pub mod profile;
pub mod tasks;
