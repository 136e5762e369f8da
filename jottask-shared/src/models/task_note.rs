/// Notes attached to a task
///
/// Notes are append-only. Manual notes come from the user, email notes from
/// inbound mail processing, and system notes are written when the service
/// itself changes a task (for example when an action link reschedules it).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE task_notes (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     content TEXT NOT NULL,
///     source TEXT NOT NULL DEFAULT 'manual'
///         CHECK (source IN ('manual', 'email', 'system')),
///     created_by TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Where a note came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NoteSource {
    #[default]
    Manual,
    Email,
    System,
}

/// Note row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskNote {
    pub id: Uuid,
    pub task_id: Uuid,
    pub content: String,
    pub source: NoteSource,

    /// Free-form author label (email address or "system")
    pub created_by: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Input for appending a note
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskNote {
    pub task_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub source: NoteSource,
    pub created_by: Option<String>,
}

impl CreateTaskNote {
    fn system(task_id: Uuid, content: String) -> Self {
        Self {
            task_id,
            content,
            source: NoteSource::System,
            created_by: Some("system".to_string()),
        }
    }

    /// Note recording that a task was moved to a picked due date
    pub fn rescheduled(task_id: Uuid, date: NaiveDate, time: NaiveTime) -> Self {
        Self::system(
            task_id,
            format!("Rescheduled to {} {}", date.format("%Y-%m-%d"), time.format("%H:%M")),
        )
    }

    /// Note recording that a task was pushed back by `by`
    pub fn delayed(task_id: Uuid, by: Duration, date: NaiveDate, time: NaiveTime) -> Self {
        let amount = if by.num_hours() % 24 == 0 && by.num_days() > 0 {
            format!("{} day(s)", by.num_days())
        } else {
            format!("{} hour(s)", by.num_hours())
        };

        Self::system(
            task_id,
            format!(
                "Task delayed by {}. New due: {}",
                amount,
                date.and_time(time).format("%I:%M %p %d/%m/%Y")
            ),
        )
    }

    /// Note recording that a task was completed
    pub fn completed(task_id: Uuid) -> Self {
        Self::system(task_id, "Task marked as completed".to_string())
    }
}

impl TaskNote {
    /// Appends a note
    pub async fn create<'e, E: PgExecutor<'e>>(db: E, data: CreateTaskNote) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, TaskNote>(
            r#"
            INSERT INTO task_notes (task_id, content, source, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, task_id, content, source, created_by, created_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.content)
        .bind(data.source)
        .bind(data.created_by)
        .fetch_one(db)
        .await
    }

    /// Lists a task's notes, newest first
    pub async fn list_by_task<'e, E: PgExecutor<'e>>(db: E, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskNote>(
            r#"
            SELECT id, task_id, content, source, created_by, created_at
            FROM task_notes
            WHERE task_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(task_id)
        .fetch_all(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rescheduled_note() {
        let task_id = Uuid::new_v4();
        let note = CreateTaskNote::rescheduled(
            task_id,
            NaiveDate::from_ymd_opt(2026, 3, 11).unwrap(),
            NaiveTime::from_hms_opt(9, 5, 0).unwrap(),
        );

        assert_eq!(note.task_id, task_id);
        assert_eq!(note.content, "Rescheduled to 2026-03-11 09:05");
        assert_eq!(note.source, NoteSource::System);
    }

    #[test]
    fn test_delayed_note() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

        let hour = CreateTaskNote::delayed(Uuid::nil(), Duration::hours(1), date, time);
        assert_eq!(hour.content, "Task delayed by 1 hour(s). New due: 09:00 AM 10/03/2026");

        let day = CreateTaskNote::delayed(Uuid::nil(), Duration::days(1), date, time);
        assert_eq!(day.content, "Task delayed by 1 day(s). New due: 09:00 AM 10/03/2026");
        assert_eq!(day.created_by.as_deref(), Some("system"));
    }

    #[test]
    fn test_source_defaults_to_manual() {
        let note: CreateTaskNote = serde_json::from_value(serde_json::json!({
            "task_id": Uuid::nil(),
            "content": "Left a voicemail",
            "created_by": null
        }))
        .unwrap();
        assert_eq!(note.source, NoteSource::Manual);
    }
}
