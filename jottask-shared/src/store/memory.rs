/// In-memory store
///
/// Mirrors the PostgreSQL backend closely enough for tests: unique
/// constraints, cascading deletes, `updated_at` maintenance and the atomic
/// check-then-write operations. Every operation takes one async mutex, so
/// check and write can never interleave.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{count_to_u32, Store};
use crate::error::{Error, Result};
use crate::models::action_token::{EmailActionToken, NewActionToken};
use crate::models::checklist_item::TaskChecklistItem;
use crate::models::email_connection::{
    CreateEmailConnection, EmailConnection, UpdateEmailConnection,
};
use crate::models::plan::{PlanCatalog, SubscriptionTier};
use crate::models::task::{CreateTask, Reschedule, Task, TaskFilter, TaskStatus, UpdateTask};
use crate::models::task_note::{CreateTaskNote, TaskNote};
use crate::models::user::{CreateUser, SubscriptionStatus, UpdateUser, User};
use crate::quota::{ensure_within_limit, QuotaLimits, QuotaType};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    tasks: HashMap<Uuid, Task>,
    notes: HashMap<Uuid, TaskNote>,
    checklist_items: HashMap<Uuid, TaskChecklistItem>,
    email_connections: HashMap<Uuid, EmailConnection>,
    action_tokens: HashMap<Uuid, EmailActionToken>,
}

impl Tables {
    fn pending_count(&self, user_id: Uuid) -> u32 {
        let count = self
            .tasks
            .values()
            .filter(|t| t.user_id == user_id && t.status == TaskStatus::Pending)
            .count();
        count_to_u32(count as i64)
    }

    fn connection_count(&self, user_id: Uuid) -> u32 {
        let count = self
            .email_connections
            .values()
            .filter(|c| c.user_id == user_id)
            .count();
        count_to_u32(count as i64)
    }

    fn owner(&self, user_id: Uuid) -> Result<&User> {
        self.users
            .get(&user_id)
            .ok_or_else(|| Error::not_found("User", user_id))
    }

    fn require_task(&self, task_id: Uuid) -> Result<()> {
        if self.tasks.contains_key(&task_id) {
            Ok(())
        } else {
            Err(Error::not_found("Task", task_id))
        }
    }

    fn insert_note(&mut self, data: CreateTaskNote, now: DateTime<Utc>) -> TaskNote {
        let note = TaskNote {
            id: Uuid::new_v4(),
            task_id: data.task_id,
            content: data.content,
            source: data.source,
            created_by: data.created_by,
            created_at: now,
        };

        self.notes.insert(note.id, note.clone());
        note
    }

    /// Removes a task and its dependents
    fn cascade_task(&mut self, task_id: Uuid) -> bool {
        let removed = self.tasks.remove(&task_id).is_some();
        self.notes.retain(|_, n| n.task_id != task_id);
        self.checklist_items.retain(|_, i| i.task_id != task_id);
        self.action_tokens.retain(|_, t| t.task_id != task_id);
        removed
    }
}

/// [`Store`] holding everything in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Changes a user's plan, as the billing webhook would
    pub async fn set_subscription(
        &self,
        user_id: Uuid,
        tier: SubscriptionTier,
        status: SubscriptionStatus,
    ) -> Result<User> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| Error::not_found("User", user_id))?;

        user.subscription_tier = tier;
        user.subscription_status = status;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    /// Moves a token's expiry, for tests of expired links
    pub async fn set_action_token_expiry(&self, token_hash: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let token = tables
            .action_tokens
            .values_mut()
            .find(|t| t.token_hash == token_hash)
            .ok_or(Error::TokenNotFound)?;

        token.expires_at = expires_at;
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> Result<User> {
        let mut tables = self.tables.lock().await;
        let email = data.normalized_email();

        if tables.users.contains_key(&data.id) {
            return Err(Error::ConstraintViolation("users_pkey".to_string()));
        }
        if tables.users.values().any(|u| u.email == email) {
            return Err(Error::ConstraintViolation("email already registered".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: data.id,
            full_name: Some(data.resolved_full_name()),
            timezone: data.resolved_timezone(),
            email,
            subscription_tier: SubscriptionTier::Starter,
            subscription_status: SubscriptionStatus::Trial,
            trial_ends_at: Some(CreateUser::trial_ends_at(now)),
            stripe_customer_id: None,
            stripe_subscription_id: None,
            settings: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        };

        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> Result<Option<User>> {
        let mut tables = self.tables.lock().await;
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(full_name) = data.full_name {
            user.full_name = Some(full_name);
        }
        if let Some(timezone) = data.timezone {
            user.timezone = timezone;
        }
        if let Some(settings) = data.settings {
            user.settings = settings;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }

        let owned: Vec<Uuid> = tables
            .tasks
            .values()
            .filter(|t| t.user_id == id)
            .map(|t| t.id)
            .collect();
        for task_id in owned {
            tables.cascade_task(task_id);
        }
        tables.email_connections.retain(|_, c| c.user_id != id);
        tables.action_tokens.retain(|_, t| t.user_id != id);

        Ok(true)
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.tables.lock().await.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, user_id: Uuid, filter: TaskFilter) -> Result<Vec<Task>> {
        let tables = self.tables.lock().await;
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| t.user_id == user_id)
            .filter(|t| filter.status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();

        // Soonest due first, undated last, newest first among equals
        tasks.sort_by(|a, b| {
            let due = |t: &Task| (t.due_date.is_none(), t.due_date, t.due_time.is_none(), t.due_time);
            due(a).cmp(&due(b)).then(b.created_at.cmp(&a.created_at))
        });

        Ok(tasks
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn count_tasks(&self, user_id: Uuid, status: TaskStatus) -> Result<u32> {
        let tables = self.tables.lock().await;
        let count = tables
            .tasks
            .values()
            .filter(|t| t.user_id == user_id && t.status == status)
            .count();
        Ok(count_to_u32(count as i64))
    }

    async fn create_task(&self, data: CreateTask, catalog: &PlanCatalog) -> Result<Task> {
        let mut tables = self.tables.lock().await;

        let owner = tables.owner(data.user_id)?;
        let limit = QuotaLimits::for_plan(catalog.get(owner.subscription_tier)).pending_tasks;
        ensure_within_limit(QuotaType::PendingTasks, limit, tables.pending_count(data.user_id))?;

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            title: data.title,
            description: data.description,
            status: TaskStatus::Pending,
            priority: data.priority,
            due_date: data.due_date,
            due_time: data.due_time,
            client_name: data.client_name,
            client_email: data.client_email,
            client_phone: data.client_phone,
            project_name: data.project_name,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };

        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update_task(
        &self,
        id: Uuid,
        data: UpdateTask,
        catalog: &PlanCatalog,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>> {
        let mut tables = self.tables.lock().await;
        let Some(current) = tables.tasks.get(&id).cloned() else {
            return Ok(None);
        };

        if data.enters_pending(&current) {
            let owner = tables.owner(current.user_id)?;
            let limit = QuotaLimits::for_plan(catalog.get(owner.subscription_tier)).pending_tasks;
            ensure_within_limit(QuotaType::PendingTasks, limit, tables.pending_count(current.user_id))?;
        }

        let note = data.completion_note(&current);
        let mut task = current;
        data.apply(&mut task, now);
        tables.tasks.insert(task.id, task.clone());
        if let Some(note) = note {
            tables.insert_note(note, now);
        }
        Ok(Some(task))
    }

    async fn reschedule_task(&self, id: Uuid, to: Reschedule, now: DateTime<Utc>) -> Result<Option<Task>> {
        let mut tables = self.tables.lock().await;
        let Some(mut task) = tables.tasks.get(&id).cloned() else {
            return Ok(None);
        };

        let note = to.apply(&mut task, now)?;
        tables.tasks.insert(task.id, task.clone());
        tables.insert_note(note, now);
        Ok(Some(task))
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool> {
        Ok(self.tables.lock().await.cascade_task(id))
    }

    async fn create_note(&self, data: CreateTaskNote) -> Result<TaskNote> {
        let mut tables = self.tables.lock().await;
        tables.require_task(data.task_id)?;
        Ok(tables.insert_note(data, Utc::now()))
    }

    async fn list_notes(&self, task_id: Uuid) -> Result<Vec<TaskNote>> {
        let tables = self.tables.lock().await;
        let mut notes: Vec<TaskNote> = tables
            .notes
            .values()
            .filter(|n| n.task_id == task_id)
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }

    async fn create_checklist_item(&self, task_id: Uuid, item_text: &str) -> Result<TaskChecklistItem> {
        let mut tables = self.tables.lock().await;
        tables.require_task(task_id)?;

        let display_order = tables
            .checklist_items
            .values()
            .filter(|i| i.task_id == task_id)
            .map(|i| i.display_order)
            .max()
            .unwrap_or(0)
            + 1;

        let item = TaskChecklistItem {
            id: Uuid::new_v4(),
            task_id,
            item_text: item_text.to_string(),
            is_completed: false,
            completed_at: None,
            display_order,
            created_at: Utc::now(),
        };

        tables.checklist_items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get_checklist_item(&self, id: Uuid) -> Result<Option<TaskChecklistItem>> {
        Ok(self.tables.lock().await.checklist_items.get(&id).cloned())
    }

    async fn list_checklist_items(&self, task_id: Uuid) -> Result<Vec<TaskChecklistItem>> {
        let tables = self.tables.lock().await;
        let mut items: Vec<TaskChecklistItem> = tables
            .checklist_items
            .values()
            .filter(|i| i.task_id == task_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.display_order);
        Ok(items)
    }

    async fn set_checklist_item_completed(
        &self,
        id: Uuid,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<TaskChecklistItem>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.checklist_items.get_mut(&id).map(|item| {
            item.set_completed(completed, now);
            item.clone()
        }))
    }

    async fn get_email_connection(&self, id: Uuid) -> Result<Option<EmailConnection>> {
        Ok(self.tables.lock().await.email_connections.get(&id).cloned())
    }

    async fn list_email_connections(&self, user_id: Uuid) -> Result<Vec<EmailConnection>> {
        let tables = self.tables.lock().await;
        let mut connections: Vec<EmailConnection> = tables
            .email_connections
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        connections.sort_by_key(|c| c.created_at);
        Ok(connections)
    }

    async fn count_email_connections(&self, user_id: Uuid) -> Result<u32> {
        Ok(self.tables.lock().await.connection_count(user_id))
    }

    async fn create_email_connection(
        &self,
        data: CreateEmailConnection,
        catalog: &PlanCatalog,
    ) -> Result<EmailConnection> {
        let mut tables = self.tables.lock().await;

        let owner = tables.owner(data.user_id)?;
        let limit = QuotaLimits::for_plan(catalog.get(owner.subscription_tier)).email_connections;
        ensure_within_limit(QuotaType::EmailConnections, limit, tables.connection_count(data.user_id))?;

        let address = data.normalized_address();
        let duplicate = tables
            .email_connections
            .values()
            .any(|c| c.user_id == data.user_id && c.email_address == address);
        if duplicate {
            return Err(Error::ConstraintViolation("email address already connected".to_string()));
        }

        let now = Utc::now();
        let connection = EmailConnection {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            provider: data.provider,
            imap_server: data.resolved_imap_server(),
            email_address: address,
            imap_password: data.imap_password,
            is_active: true,
            last_checked_at: None,
            created_at: now,
            updated_at: now,
        };

        tables.email_connections.insert(connection.id, connection.clone());
        Ok(connection)
    }

    async fn update_email_connection(
        &self,
        id: Uuid,
        data: UpdateEmailConnection,
        now: DateTime<Utc>,
    ) -> Result<Option<EmailConnection>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.email_connections.get_mut(&id).map(|connection| {
            data.apply(connection, now);
            connection.clone()
        }))
    }

    async fn delete_email_connection(&self, id: Uuid) -> Result<bool> {
        Ok(self.tables.lock().await.email_connections.remove(&id).is_some())
    }

    async fn create_action_token(&self, data: NewActionToken) -> Result<EmailActionToken> {
        let mut tables = self.tables.lock().await;
        tables.require_task(data.task_id)?;
        tables.owner(data.user_id)?;

        if tables.action_tokens.values().any(|t| t.token_hash == data.token_hash) {
            return Err(Error::ConstraintViolation("action token collision".to_string()));
        }

        let token = EmailActionToken {
            id: Uuid::new_v4(),
            task_id: data.task_id,
            user_id: data.user_id,
            token_hash: data.token_hash,
            action: data.action,
            expires_at: data.expires_at,
            used_at: None,
            created_at: Utc::now(),
        };

        tables.action_tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn consume_action_token(&self, token_hash: &str, now: DateTime<Utc>) -> Result<EmailActionToken> {
        let mut tables = self.tables.lock().await;
        let token = tables
            .action_tokens
            .values_mut()
            .find(|t| t.token_hash == token_hash)
            .ok_or(Error::TokenNotFound)?;

        token.ensure_usable(now)?;
        token.used_at = Some(now);
        Ok(token.clone())
    }
}
