/// Task model and database operations
///
/// Tasks are the core entity: each belongs to exactly one user, and every
/// note, checklist item and action token hangs off a task. Only `pending`
/// tasks count toward the plan's task limit.
///
/// # Status
///
/// ```text
/// pending ⇄ completed
/// pending ⇄ cancelled
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title TEXT NOT NULL,
///     description TEXT,
///     status TEXT NOT NULL DEFAULT 'pending'
///         CHECK (status IN ('pending', 'completed', 'cancelled')),
///     priority TEXT NOT NULL DEFAULT 'medium'
///         CHECK (priority IN ('low', 'medium', 'high', 'urgent')),
///     due_date DATE,
///     due_time TIME,
///     client_name TEXT,
///     client_email TEXT,
///     client_phone TEXT,
///     project_name TEXT,
///     completed_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::task_note::CreateTaskNote;

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Open work; counts toward the plan limit
    Pending,

    /// Done
    Completed,

    /// Dropped without completion
    Cancelled,
}

impl TaskStatus {
    /// Converts status to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Whether tasks in this status consume plan quota
    pub fn counts_toward_quota(&self) -> bool {
        matches!(self, TaskStatus::Pending)
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Task row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    /// Owning user; every ownership check goes through this column
    pub user_id: Uuid,

    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub project_name: Option<String>,

    /// Set when the task moves to completed, cleared when it leaves
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Due date and time pushed back by `by`
    ///
    /// Tasks without a due date are rescheduled relative to `now`; a missing
    /// time defaults to 08:00.
    ///
    /// # Errors
    ///
    /// `Validation` if the result falls outside the representable dates.
    pub fn shifted_due(&self, by: Duration, now: DateTime<Utc>) -> Result<(NaiveDate, NaiveTime)> {
        let base = match self.due_date {
            Some(date) => date.and_time(self.due_time.unwrap_or(default_due_time())),
            None => now.naive_utc(),
        };
        let shifted = base
            .checked_add_signed(by)
            .ok_or_else(|| Error::Validation("due date out of range".to_string()))?;
        Ok((shifted.date(), shifted.time()))
    }
}

/// 08:00, the time assumed for tasks due on a date without a time
pub fn default_due_time() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// How a task's due date moves
///
/// Rescheduling never touches the status, so it never needs quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reschedule {
    /// Push back from the current due date ("+1 hour", "+1 day")
    By(Duration),

    /// Move to a date and time the user picked
    To { date: NaiveDate, time: NaiveTime },
}

impl Reschedule {
    /// New due date and time for `task`
    pub fn resolve(&self, task: &Task, now: DateTime<Utc>) -> Result<(NaiveDate, NaiveTime)> {
        match *self {
            Reschedule::By(by) => task.shifted_due(by, now),
            Reschedule::To { date, time } => Ok((date, time)),
        }
    }

    /// System note recording the move
    pub fn note(&self, task_id: Uuid, date: NaiveDate, time: NaiveTime) -> CreateTaskNote {
        match *self {
            Reschedule::By(by) => CreateTaskNote::delayed(task_id, by, date, time),
            Reschedule::To { .. } => CreateTaskNote::rescheduled(task_id, date, time),
        }
    }

    /// Applies the move to an in-memory copy, returning the note to append
    pub fn apply(&self, task: &mut Task, now: DateTime<Utc>) -> Result<CreateTaskNote> {
        let (date, time) = self.resolve(task, now)?;
        task.due_date = Some(date);
        task.due_time = Some(time);
        task.updated_at = now;
        Ok(self.note(task.id, date, time))
    }
}

/// Input for creating a task; new tasks always start pending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub project_name: Option<String>,
}

impl CreateTask {
    /// Minimal input with only the required fields
    pub fn new(user_id: Uuid, title: impl Into<String>) -> Self {
        Self {
            user_id,
            title: title.into(),
            description: None,
            priority: TaskPriority::default(),
            due_date: None,
            due_time: None,
            client_name: None,
            client_email: None,
            client_phone: None,
            project_name: None,
        }
    }
}

/// Input for updating a task
///
/// Only non-None fields change. Setting `status` also maintains
/// `completed_at`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub project_name: Option<String>,
}

impl UpdateTask {
    /// Update that only changes the status
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Whether applying this update to `task` moves it into pending
    pub fn enters_pending(&self, task: &Task) -> bool {
        matches!(self.status, Some(TaskStatus::Pending)) && task.status != TaskStatus::Pending
    }

    /// System note to append when this update completes `task`
    pub fn completion_note(&self, task: &Task) -> Option<CreateTaskNote> {
        match self.status {
            Some(TaskStatus::Completed) if task.status != TaskStatus::Completed => {
                Some(CreateTaskNote::completed(task.id))
            }
            _ => None,
        }
    }

    /// `completed_at` after applying this update at `now`
    pub fn completed_at(&self, task: &Task, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.status {
            Some(TaskStatus::Completed) if task.status == TaskStatus::Completed => task.completed_at,
            Some(TaskStatus::Completed) => Some(now),
            Some(_) => None,
            None => task.completed_at,
        }
    }

    /// Applies the update to an in-memory copy
    pub fn apply(self, task: &mut Task, now: DateTime<Utc>) {
        task.completed_at = self.completed_at(task, now);
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = Some(description);
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(due_time) = self.due_time {
            task.due_time = Some(due_time);
        }
        if let Some(client_name) = self.client_name {
            task.client_name = Some(client_name);
        }
        if let Some(client_email) = self.client_email {
            task.client_email = Some(client_email);
        }
        if let Some(client_phone) = self.client_phone {
            task.client_phone = Some(client_phone);
        }
        if let Some(project_name) = self.project_name {
            task.project_name = Some(project_name);
        }
        task.updated_at = now;
    }
}

/// Listing filter with pagination
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: 100,
            offset: 0,
        }
    }
}

const TASK_COLUMNS: &str = "id, user_id, title, description, status, priority, due_date, \
    due_time, client_name, client_email, client_phone, project_name, completed_at, \
    created_at, updated_at";

impl Task {
    /// Inserts a pending task
    ///
    /// Does not check the plan limit; callers go through the store, which
    /// wraps this in a quota-checked transaction.
    pub async fn insert<'e, E: PgExecutor<'e>>(db: E, data: CreateTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO tasks (user_id, title, description, priority, due_date, due_time,
                               client_name, client_email, client_phone, project_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(data.user_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.priority)
            .bind(data.due_date)
            .bind(data.due_time)
            .bind(data.client_name)
            .bind(data.client_email)
            .bind(data.client_phone)
            .bind(data.project_name)
            .fetch_one(db)
            .await
    }

    /// Finds a task by ID
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(db: E, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Finds a task by ID and locks the row until the transaction ends
    pub async fn lock_for_update<'e, E: PgExecutor<'e>>(db: E, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 FOR UPDATE");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Lists a user's tasks, soonest due first
    pub async fn list_by_user<'e, E: PgExecutor<'e>>(
        db: E,
        user_id: Uuid,
        filter: TaskFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY due_date ASC NULLS LAST, due_time ASC NULLS LAST, created_at DESC
            LIMIT $3 OFFSET $4
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(user_id)
            .bind(filter.status)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(db)
            .await
    }

    /// Counts a user's tasks in one status
    pub async fn count_by_status<'e, E: PgExecutor<'e>>(
        db: E,
        user_id: Uuid,
        status: TaskStatus,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE user_id = $1 AND status = $2")
                .bind(user_id)
                .bind(status)
                .fetch_one(db)
                .await?;

        Ok(count)
    }

    /// Writes every mutable column of an already-updated copy
    pub async fn save<'e, E: PgExecutor<'e>>(db: E, task: &Task) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, status = $4, priority = $5,
                due_date = $6, due_time = $7, client_name = $8, client_email = $9,
                client_phone = $10, project_name = $11, completed_at = $12
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(task.id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.status)
            .bind(task.priority)
            .bind(task.due_date)
            .bind(task.due_time)
            .bind(&task.client_name)
            .bind(&task.client_email)
            .bind(&task.client_phone)
            .bind(&task.project_name)
            .bind(task.completed_at)
            .fetch_optional(db)
            .await
    }

    /// Deletes a task
    ///
    /// Notes, checklist items and action tokens go with it (CASCADE).
    pub async fn delete<'e, E: PgExecutor<'e>>(db: E, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(status: TaskStatus) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Call Dave re quote".to_string(),
            description: None,
            status,
            priority: TaskPriority::Medium,
            due_date: NaiveDate::from_ymd_opt(2026, 3, 10),
            due_time: NaiveTime::from_hms_opt(14, 30, 0),
            client_name: None,
            client_email: None,
            client_phone: None,
            project_name: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_task_status_as_str() {
        assert_eq!(TaskStatus::Pending.as_str(), "pending");
        assert_eq!(TaskStatus::Completed.as_str(), "completed");
        assert_eq!(TaskStatus::Cancelled.as_str(), "cancelled");
    }

    #[test]
    fn test_only_pending_counts_toward_quota() {
        assert!(TaskStatus::Pending.counts_toward_quota());
        assert!(!TaskStatus::Completed.counts_toward_quota());
        assert!(!TaskStatus::Cancelled.counts_toward_quota());
    }

    #[test]
    fn test_enters_pending() {
        let reopen = UpdateTask::status(TaskStatus::Pending);
        assert!(reopen.enters_pending(&task(TaskStatus::Completed)));
        assert!(!reopen.enters_pending(&task(TaskStatus::Pending)));
        assert!(!UpdateTask::default().enters_pending(&task(TaskStatus::Completed)));
    }

    #[test]
    fn test_apply_maintains_completed_at() {
        let now = Utc::now();
        let mut t = task(TaskStatus::Pending);

        UpdateTask::status(TaskStatus::Completed).apply(&mut t, now);
        assert_eq!(t.status, TaskStatus::Completed);
        assert_eq!(t.completed_at, Some(now));

        // Completing again keeps the original timestamp
        let later = now + Duration::minutes(5);
        UpdateTask::status(TaskStatus::Completed).apply(&mut t, later);
        assert_eq!(t.completed_at, Some(now));

        UpdateTask::status(TaskStatus::Pending).apply(&mut t, later);
        assert_eq!(t.completed_at, None);
        assert_eq!(t.updated_at, later);
    }

    #[test]
    fn test_shifted_due_with_date() {
        let t = task(TaskStatus::Pending);
        let (date, time) = t.shifted_due(Duration::hours(10), Utc::now()).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 3, 11).unwrap());
        assert_eq!(time, NaiveTime::from_hms_opt(0, 30, 0).unwrap());
    }

    #[test]
    fn test_shifted_due_without_date_uses_now() {
        let mut t = task(TaskStatus::Pending);
        t.due_date = None;
        let now = Utc::now();
        let (date, _) = t.shifted_due(Duration::days(1), now).unwrap();
        assert_eq!(date, (now + Duration::days(1)).date_naive());
    }

    #[test]
    fn test_shifted_due_defaults_time() {
        let mut t = task(TaskStatus::Pending);
        t.due_time = None;
        let (_, time) = t.shifted_due(Duration::hours(1), Utc::now()).unwrap();
        assert_eq!(time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }

    #[test]
    fn test_shifted_due_out_of_range_is_validation_error() {
        let mut t = task(TaskStatus::Pending);
        t.due_date = Some(NaiveDate::MAX);
        let result = t.shifted_due(Duration::days(1), Utc::now());
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_reschedule_keeps_status() {
        let now = Utc::now();
        let mut t = task(TaskStatus::Completed);
        let note = Reschedule::By(Duration::days(1)).apply(&mut t, now).unwrap();

        assert_eq!(t.status, TaskStatus::Completed);
        assert_eq!(t.due_date, NaiveDate::from_ymd_opt(2026, 3, 11));
        assert_eq!(t.due_time, NaiveTime::from_hms_opt(14, 30, 0));
        assert_eq!(note.content, "Task delayed by 1 day(s). New due: 02:30 PM 11/03/2026");
    }

    #[test]
    fn test_reschedule_to_picked_date() {
        let mut t = task(TaskStatus::Pending);
        let date = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let time = NaiveTime::from_hms_opt(7, 15, 0).unwrap();
        let note = Reschedule::To { date, time }.apply(&mut t, Utc::now()).unwrap();

        assert_eq!(t.due_date, Some(date));
        assert_eq!(t.due_time, Some(time));
        assert_eq!(note.content, "Rescheduled to 2026-04-01 07:15");
    }

    #[test]
    fn test_completion_note_only_on_transition() {
        let complete = UpdateTask::status(TaskStatus::Completed);
        let note = complete.completion_note(&task(TaskStatus::Pending)).unwrap();
        assert_eq!(note.content, "Task marked as completed");
        assert!(complete.completion_note(&task(TaskStatus::Completed)).is_none());
        assert!(UpdateTask::status(TaskStatus::Pending)
            .completion_note(&task(TaskStatus::Completed))
            .is_none());
    }
}
