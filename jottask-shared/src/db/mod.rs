/// Database layer
///
/// - `pool`: PostgreSQL connection pool and health check
/// - `migrations`: Embedded schema migrations
///
/// Models are in the `models` module at crate root level; the store
/// backends in `store` compose them into transactional operations.

pub mod migrations;
pub mod pool;
