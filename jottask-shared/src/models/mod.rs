/// Database models for Jottask
///
/// Each model owns its row type, its input types and the SQL that reads and
/// writes it. Query methods are generic over [`sqlx::PgExecutor`] so the
/// store can run them on the pool or inside a transaction.
///
/// # Models
///
/// - `plan`: Subscription plans and the in-memory plan catalog
/// - `user`: User profiles (one per authenticated principal)
/// - `task`: Tasks, scoped to one user
/// - `task_note`: Append-only notes on a task
/// - `checklist_item`: Ordered checklist items on a task
/// - `email_connection`: Connected mailboxes
/// - `action_token`: Single-use tokens behind email action links
///
/// # Example
///
/// ```no_run
/// use jottask_shared::models::task::{CreateTask, Task};
/// use jottask_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::insert(&pool, CreateTask::new(Uuid::new_v4(), "Quote for Smith job")).await?;
/// # Ok(())
/// # }
/// ```

pub mod action_token;
pub mod checklist_item;
pub mod email_connection;
pub mod plan;
pub mod task;
pub mod task_note;
pub mod user;
