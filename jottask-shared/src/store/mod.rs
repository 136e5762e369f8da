/// Storage backends
///
/// The [`Store`] trait is the seam between the service layer and
/// persistence. It exposes plain reads plus the few writes that must be
/// atomic with a check:
///
/// ```text
/// create_task            lock user → count pending → insert
/// update_task            lock user → (count pending if re-entering) → update (+ completion note)
/// reschedule_task        lock task → compute new due → update + system note
/// create_email_connection lock user → count connections → insert
/// consume_action_token   conditional update (used_at IS NULL AND not expired)
/// ```
///
/// The store does not evaluate the access policy; callers authorize first
/// and pass already-authorized identifiers.
///
/// # Backends
///
/// - [`postgres::PgStore`]: sqlx on PostgreSQL, the system of record
/// - [`memory::MemoryStore`]: in-process maps behind one async mutex, used
///   by tests and local development
///
/// # Example
///
/// ```no_run
/// use jottask_shared::store::{memory::MemoryStore, Store};
/// use jottask_shared::models::plan::PlanCatalog;
/// use jottask_shared::models::task::CreateTask;
/// use jottask_shared::models::user::CreateUser;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let catalog = PlanCatalog::builtin();
///
/// let user = store
///     .create_user(CreateUser {
///         id: Uuid::new_v4(),
///         email: "amy@example.com".to_string(),
///         full_name: None,
///         timezone: None,
///     })
///     .await?;
///
/// let task = store.create_task(CreateTask::new(user.id, "Measure up kitchen"), &catalog).await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::action_token::{EmailActionToken, NewActionToken};
use crate::models::checklist_item::TaskChecklistItem;
use crate::models::email_connection::{
    CreateEmailConnection, EmailConnection, UpdateEmailConnection,
};
use crate::models::plan::PlanCatalog;
use crate::models::task::{CreateTask, Reschedule, Task, TaskFilter, TaskStatus, UpdateTask};
use crate::models::task_note::{CreateTaskNote, TaskNote};
use crate::models::user::{CreateUser, UpdateUser, User};

pub mod memory;
pub mod postgres;

/// Persistence operations used by the service layer
#[async_trait]
pub trait Store: Send + Sync {
    /// Verifies the backend is reachable
    async fn health_check(&self) -> Result<()>;

    // Users

    async fn create_user(&self, data: CreateUser) -> Result<User>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn update_user(&self, id: Uuid, data: UpdateUser) -> Result<Option<User>>;

    /// Deletes a user and everything they own
    async fn delete_user(&self, id: Uuid) -> Result<bool>;

    // Tasks

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>>;
    async fn list_tasks(&self, user_id: Uuid, filter: TaskFilter) -> Result<Vec<Task>>;
    async fn count_tasks(&self, user_id: Uuid, status: TaskStatus) -> Result<u32>;

    /// Inserts a pending task if the owner's plan has room
    ///
    /// # Errors
    ///
    /// - `NotFound` if the owner does not exist
    /// - `QuotaExceeded` if the owner is at the pending task limit
    async fn create_task(&self, data: CreateTask, catalog: &PlanCatalog) -> Result<Task>;

    /// Applies an update; moving a task back into pending is quota-checked
    ///
    /// Completing a task appends a system note in the same write.
    async fn update_task(
        &self,
        id: Uuid,
        data: UpdateTask,
        catalog: &PlanCatalog,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>>;

    /// Moves a task's due date and appends a system note, atomically
    ///
    /// The new due date is computed from the locked row, so concurrent
    /// delays stack instead of overwriting each other.
    ///
    /// # Errors
    ///
    /// - `Validation` if the new due date is out of range
    async fn reschedule_task(&self, id: Uuid, to: Reschedule, now: DateTime<Utc>) -> Result<Option<Task>>;

    /// Deletes a task with its notes, checklist items and action tokens
    async fn delete_task(&self, id: Uuid) -> Result<bool>;

    // Notes

    async fn create_note(&self, data: CreateTaskNote) -> Result<TaskNote>;
    async fn list_notes(&self, task_id: Uuid) -> Result<Vec<TaskNote>>;

    // Checklist

    async fn create_checklist_item(&self, task_id: Uuid, item_text: &str) -> Result<TaskChecklistItem>;
    async fn get_checklist_item(&self, id: Uuid) -> Result<Option<TaskChecklistItem>>;
    async fn list_checklist_items(&self, task_id: Uuid) -> Result<Vec<TaskChecklistItem>>;
    async fn set_checklist_item_completed(
        &self,
        id: Uuid,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<TaskChecklistItem>>;

    // Email connections

    async fn get_email_connection(&self, id: Uuid) -> Result<Option<EmailConnection>>;
    async fn list_email_connections(&self, user_id: Uuid) -> Result<Vec<EmailConnection>>;
    async fn count_email_connections(&self, user_id: Uuid) -> Result<u32>;

    /// Inserts a connection if the owner's plan has room
    async fn create_email_connection(
        &self,
        data: CreateEmailConnection,
        catalog: &PlanCatalog,
    ) -> Result<EmailConnection>;

    async fn update_email_connection(
        &self,
        id: Uuid,
        data: UpdateEmailConnection,
        now: DateTime<Utc>,
    ) -> Result<Option<EmailConnection>>;

    async fn delete_email_connection(&self, id: Uuid) -> Result<bool>;

    // Action tokens

    async fn create_action_token(&self, data: NewActionToken) -> Result<EmailActionToken>;

    /// Marks the token with this digest used, at most once
    ///
    /// # Errors
    ///
    /// - `TokenNotFound` if no token has this digest
    /// - `TokenExpired` if `now > expires_at`
    /// - `TokenAlreadyUsed` if the token was consumed before
    async fn consume_action_token(&self, token_hash: &str, now: DateTime<Utc>) -> Result<EmailActionToken>;
}

/// Converts a database count to the quota domain
pub(crate) fn count_to_u32(count: i64) -> u32 {
    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}
