/// Checklist items of a task
///
/// Items keep their insertion order through `display_order`, which is
/// assigned as one more than the task's current maximum.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE task_checklist_items (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     item_text TEXT NOT NULL,
///     is_completed BOOLEAN NOT NULL DEFAULT FALSE,
///     completed_at TIMESTAMPTZ,
///     display_order INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Checklist item row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskChecklistItem {
    pub id: Uuid,
    pub task_id: Uuid,
    pub item_text: String,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

impl TaskChecklistItem {
    /// Marks the item done or not done at `now`
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        if completed && !self.is_completed {
            self.completed_at = Some(now);
        } else if !completed {
            self.completed_at = None;
        }
        self.is_completed = completed;
    }

    /// Appends an item at the end of the task's list
    pub async fn create<'e, E: PgExecutor<'e>>(
        db: E,
        task_id: Uuid,
        item_text: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, TaskChecklistItem>(
            r#"
            INSERT INTO task_checklist_items (task_id, item_text, display_order)
            VALUES (
                $1, $2,
                (SELECT COALESCE(MAX(display_order), 0) + 1
                 FROM task_checklist_items WHERE task_id = $1)
            )
            RETURNING id, task_id, item_text, is_completed, completed_at,
                      display_order, created_at
            "#,
        )
        .bind(task_id)
        .bind(item_text)
        .fetch_one(db)
        .await
    }

    /// Finds an item by ID
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(db: E, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskChecklistItem>(
            r#"
            SELECT id, task_id, item_text, is_completed, completed_at,
                   display_order, created_at
            FROM task_checklist_items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Lists a task's items in display order
    pub async fn list_by_task<'e, E: PgExecutor<'e>>(db: E, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskChecklistItem>(
            r#"
            SELECT id, task_id, item_text, is_completed, completed_at,
                   display_order, created_at
            FROM task_checklist_items
            WHERE task_id = $1
            ORDER BY display_order ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(db)
        .await
    }

    /// Toggles completion
    pub async fn update_completed<'e, E: PgExecutor<'e>>(
        db: E,
        id: Uuid,
        completed: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskChecklistItem>(
            r#"
            UPDATE task_checklist_items
            SET is_completed = $2,
                completed_at = CASE
                    WHEN $2 AND is_completed THEN completed_at
                    WHEN $2 THEN NOW()
                    ELSE NULL
                END
            WHERE id = $1
            RETURNING id, task_id, item_text, is_completed, completed_at,
                      display_order, created_at
            "#,
        )
        .bind(id)
        .bind(completed)
        .fetch_optional(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item() -> TaskChecklistItem {
        TaskChecklistItem {
            id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            item_text: "Send invoice".to_string(),
            is_completed: false,
            completed_at: None,
            display_order: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_set_completed() {
        let now = Utc::now();
        let mut item = item();

        item.set_completed(true, now);
        assert!(item.is_completed);
        assert_eq!(item.completed_at, Some(now));

        // Already completed keeps the first timestamp
        item.set_completed(true, now + Duration::hours(1));
        assert_eq!(item.completed_at, Some(now));

        item.set_completed(false, now);
        assert!(!item.is_completed);
        assert_eq!(item.completed_at, None);
    }
}
