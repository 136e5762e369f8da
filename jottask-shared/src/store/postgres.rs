/// PostgreSQL store
///
/// Quota-checked writes run in one transaction that starts by locking the
/// owning user row with `SELECT … FOR UPDATE`. Concurrent creates for the
/// same user therefore queue on the lock and each sees the previous insert
/// in its count; creates for different users never contend.
///
/// Rescheduling locks the task row instead, and reads the current due date
/// under that lock.
///
/// Token consumption needs no transaction: the conditional UPDATE is atomic
/// on its own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{count_to_u32, Store};
use crate::db::pool;
use crate::error::{Error, Result};
use crate::models::action_token::{EmailActionToken, NewActionToken};
use crate::models::checklist_item::TaskChecklistItem;
use crate::models::email_connection::{
    CreateEmailConnection, EmailConnection, UpdateEmailConnection,
};
use crate::models::plan::PlanCatalog;
use crate::models::task::{CreateTask, Reschedule, Task, TaskFilter, TaskStatus, UpdateTask};
use crate::models::task_note::{CreateTaskNote, TaskNote};
use crate::models::user::{CreateUser, UpdateUser, User};
use crate::quota::{ensure_within_limit, QuotaLimits, QuotaType};

/// [`Store`] backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Asks the database-side `can_create_task` helper
    ///
    /// Reads the plan from `subscription_plans` rather than the in-memory
    /// catalog; useful to verify both agree.
    pub async fn can_create_task_in_db(&self, user_id: Uuid) -> Result<bool> {
        let allowed: bool = sqlx::query_scalar("SELECT can_create_task($1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(allowed)
    }

    /// Asks the database-side `get_pending_task_count` helper
    pub async fn pending_task_count_in_db(&self, user_id: Uuid) -> Result<u32> {
        let count: i64 = sqlx::query_scalar("SELECT get_pending_task_count($1)::BIGINT")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count_to_u32(count))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<()> {
        pool::health_check(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> Result<User> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> Result<Option<User>> {
        Ok(User::update(&self.pool, id, data).await?)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        Ok(User::delete(&self.pool, id).await?)
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn list_tasks(&self, user_id: Uuid, filter: TaskFilter) -> Result<Vec<Task>> {
        Ok(Task::list_by_user(&self.pool, user_id, filter).await?)
    }

    async fn count_tasks(&self, user_id: Uuid, status: TaskStatus) -> Result<u32> {
        let count = Task::count_by_status(&self.pool, user_id, status).await?;
        Ok(count_to_u32(count))
    }

    async fn create_task(&self, data: CreateTask, catalog: &PlanCatalog) -> Result<Task> {
        let mut tx = self.pool.begin().await?;

        let owner = User::lock_for_update(&mut *tx, data.user_id)
            .await?
            .ok_or_else(|| Error::not_found("User", data.user_id))?;

        let limit = QuotaLimits::for_plan(catalog.get(owner.subscription_tier)).pending_tasks;
        if limit.is_some() {
            let pending = Task::count_by_status(&mut *tx, owner.id, TaskStatus::Pending).await?;
            ensure_within_limit(QuotaType::PendingTasks, limit, count_to_u32(pending))?;
        }

        let task = Task::insert(&mut *tx, data).await?;
        tx.commit().await?;

        tracing::debug!(user_id = %task.user_id, task_id = %task.id, "Task created");
        Ok(task)
    }

    async fn update_task(
        &self,
        id: Uuid,
        data: UpdateTask,
        catalog: &PlanCatalog,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>> {
        let mut tx = self.pool.begin().await?;

        let Some(mut task) = Task::lock_for_update(&mut *tx, id).await? else {
            return Ok(None);
        };

        if data.enters_pending(&task) {
            let owner = User::lock_for_update(&mut *tx, task.user_id)
                .await?
                .ok_or_else(|| Error::not_found("User", task.user_id))?;

            let limit = QuotaLimits::for_plan(catalog.get(owner.subscription_tier)).pending_tasks;
            if limit.is_some() {
                let pending = Task::count_by_status(&mut *tx, owner.id, TaskStatus::Pending).await?;
                ensure_within_limit(QuotaType::PendingTasks, limit, count_to_u32(pending))?;
            }
        }

        let note = data.completion_note(&task);
        data.apply(&mut task, now);
        let saved = Task::save(&mut *tx, &task).await?;
        if let Some(note) = note {
            TaskNote::create(&mut *tx, note).await?;
        }
        tx.commit().await?;

        Ok(saved)
    }

    async fn reschedule_task(&self, id: Uuid, to: Reschedule, now: DateTime<Utc>) -> Result<Option<Task>> {
        let mut tx = self.pool.begin().await?;

        let Some(mut task) = Task::lock_for_update(&mut *tx, id).await? else {
            return Ok(None);
        };

        let note = to.apply(&mut task, now)?;
        let saved = Task::save(&mut *tx, &task).await?;
        TaskNote::create(&mut *tx, note).await?;
        tx.commit().await?;

        Ok(saved)
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn create_note(&self, data: CreateTaskNote) -> Result<TaskNote> {
        Ok(TaskNote::create(&self.pool, data).await?)
    }

    async fn list_notes(&self, task_id: Uuid) -> Result<Vec<TaskNote>> {
        Ok(TaskNote::list_by_task(&self.pool, task_id).await?)
    }

    async fn create_checklist_item(&self, task_id: Uuid, item_text: &str) -> Result<TaskChecklistItem> {
        Ok(TaskChecklistItem::create(&self.pool, task_id, item_text).await?)
    }

    async fn get_checklist_item(&self, id: Uuid) -> Result<Option<TaskChecklistItem>> {
        Ok(TaskChecklistItem::find_by_id(&self.pool, id).await?)
    }

    async fn list_checklist_items(&self, task_id: Uuid) -> Result<Vec<TaskChecklistItem>> {
        Ok(TaskChecklistItem::list_by_task(&self.pool, task_id).await?)
    }

    async fn set_checklist_item_completed(
        &self,
        id: Uuid,
        completed: bool,
        _now: DateTime<Utc>,
    ) -> Result<Option<TaskChecklistItem>> {
        Ok(TaskChecklistItem::update_completed(&self.pool, id, completed).await?)
    }

    async fn get_email_connection(&self, id: Uuid) -> Result<Option<EmailConnection>> {
        Ok(EmailConnection::find_by_id(&self.pool, id).await?)
    }

    async fn list_email_connections(&self, user_id: Uuid) -> Result<Vec<EmailConnection>> {
        Ok(EmailConnection::list_by_user(&self.pool, user_id).await?)
    }

    async fn count_email_connections(&self, user_id: Uuid) -> Result<u32> {
        let count = EmailConnection::count_by_user(&self.pool, user_id).await?;
        Ok(count_to_u32(count))
    }

    async fn create_email_connection(
        &self,
        data: CreateEmailConnection,
        catalog: &PlanCatalog,
    ) -> Result<EmailConnection> {
        let mut tx = self.pool.begin().await?;

        let owner = User::lock_for_update(&mut *tx, data.user_id)
            .await?
            .ok_or_else(|| Error::not_found("User", data.user_id))?;

        let limit = QuotaLimits::for_plan(catalog.get(owner.subscription_tier)).email_connections;
        let existing = EmailConnection::count_by_user(&mut *tx, owner.id).await?;
        ensure_within_limit(QuotaType::EmailConnections, limit, count_to_u32(existing))?;

        let connection = EmailConnection::create(&mut *tx, data).await?;
        tx.commit().await?;

        tracing::debug!(
            user_id = %connection.user_id,
            connection_id = %connection.id,
            provider = connection.provider.as_str(),
            "Email connection created"
        );
        Ok(connection)
    }

    async fn update_email_connection(
        &self,
        id: Uuid,
        data: UpdateEmailConnection,
        _now: DateTime<Utc>,
    ) -> Result<Option<EmailConnection>> {
        Ok(EmailConnection::update(&self.pool, id, data).await?)
    }

    async fn delete_email_connection(&self, id: Uuid) -> Result<bool> {
        Ok(EmailConnection::delete(&self.pool, id).await?)
    }

    async fn create_action_token(&self, data: NewActionToken) -> Result<EmailActionToken> {
        Ok(EmailActionToken::create(&self.pool, data).await?)
    }

    async fn consume_action_token(&self, token_hash: &str, now: DateTime<Utc>) -> Result<EmailActionToken> {
        if let Some(token) = EmailActionToken::consume(&self.pool, token_hash, now).await? {
            return Ok(token);
        }

        // Nothing consumed: explain why
        let token = EmailActionToken::find_by_hash(&self.pool, token_hash)
            .await?
            .ok_or(Error::TokenNotFound)?;
        token.ensure_usable(now)?;

        // The row changed between the two statements
        Err(Error::TokenAlreadyUsed)
    }
}
