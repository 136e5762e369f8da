/// Tasks, notes and checklist items
///
/// Notes and checklist items carry no owner column; their owner is the
/// owner of the parent task, so every operation on them loads the task
/// first.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::policy::{require, Operation, Resource};
use crate::auth::principal::Principal;
use crate::error::{Error, Result};
use crate::models::checklist_item::TaskChecklistItem;
use crate::models::plan::PlanCatalog;
use crate::models::task::{CreateTask, Reschedule, Task, TaskFilter, TaskStatus, UpdateTask};
use crate::models::task_note::{CreateTaskNote, NoteSource, TaskNote};
use crate::store::Store;

/// Loads a task and checks the caller may perform `operation` on it
async fn load_task(store: &dyn Store, principal: &Principal, operation: Operation, id: Uuid) -> Result<Task> {
    let task = store
        .get_task(id)
        .await?
        .ok_or_else(|| Error::not_found("Task", id))?;

    require(principal, operation, &Resource::Task { user_id: task.user_id })?;
    Ok(task)
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::Validation("title must not be empty".to_string()));
    }
    Ok(())
}

/// Lists the caller's tasks
pub async fn list_tasks(store: &dyn Store, principal: &Principal, filter: TaskFilter) -> Result<Vec<Task>> {
    require(principal, Operation::Select, &Resource::Task { user_id: principal.user_id })?;
    store.list_tasks(principal.user_id, filter).await
}

/// Reads one task
pub async fn get_task(store: &dyn Store, principal: &Principal, id: Uuid) -> Result<Task> {
    load_task(store, principal, Operation::Select, id).await
}

/// Creates a pending task
///
/// # Errors
///
/// - `Unauthorized` if `data.user_id` is not the caller
/// - `QuotaExceeded` if the caller's plan is full
pub async fn create_task(
    store: &dyn Store,
    catalog: &PlanCatalog,
    principal: &Principal,
    data: CreateTask,
) -> Result<Task> {
    require(principal, Operation::Insert, &Resource::Task { user_id: data.user_id })?;
    validate_title(&data.title)?;

    store.create_task(data, catalog).await
}

/// Updates a task; moving it back to pending needs a free quota slot
pub async fn update_task(
    store: &dyn Store,
    catalog: &PlanCatalog,
    principal: &Principal,
    id: Uuid,
    data: UpdateTask,
) -> Result<Task> {
    load_task(store, principal, Operation::Update, id).await?;
    if let Some(title) = &data.title {
        validate_title(title)?;
    }

    let task = store
        .update_task(id, data, catalog, Utc::now())
        .await?
        .ok_or_else(|| Error::not_found("Task", id))?;

    tracing::debug!(user_id = %principal.user_id, task_id = %id, status = task.status.as_str(), "Task updated");
    Ok(task)
}

/// Marks a task completed, freeing its quota slot
///
/// The store appends a "Task marked as completed" system note.
pub async fn complete_task(
    store: &dyn Store,
    catalog: &PlanCatalog,
    principal: &Principal,
    id: Uuid,
) -> Result<Task> {
    update_task(store, catalog, principal, id, UpdateTask::status(TaskStatus::Completed)).await
}

/// Moves a completed or cancelled task back to pending
pub async fn reopen_task(
    store: &dyn Store,
    catalog: &PlanCatalog,
    principal: &Principal,
    id: Uuid,
) -> Result<Task> {
    update_task(store, catalog, principal, id, UpdateTask::status(TaskStatus::Pending)).await
}

/// Moves a task's due date and records a system note
///
/// The status is left alone, so no quota is involved: a completed task can
/// be rescheduled on a full plan.
pub async fn reschedule_task(
    store: &dyn Store,
    principal: &Principal,
    id: Uuid,
    to: Reschedule,
    now: DateTime<Utc>,
) -> Result<Task> {
    load_task(store, principal, Operation::Update, id).await?;

    let task = store
        .reschedule_task(id, to, now)
        .await?
        .ok_or_else(|| Error::not_found("Task", id))?;

    tracing::debug!(
        user_id = %principal.user_id,
        task_id = %id,
        due_date = ?task.due_date,
        due_time = ?task.due_time,
        "Task rescheduled"
    );
    Ok(task)
}

/// Deletes a task with its notes, checklist and action tokens
pub async fn delete_task(store: &dyn Store, principal: &Principal, id: Uuid) -> Result<()> {
    load_task(store, principal, Operation::Delete, id).await?;

    if !store.delete_task(id).await? {
        return Err(Error::not_found("Task", id));
    }

    tracing::debug!(user_id = %principal.user_id, task_id = %id, "Task deleted");
    Ok(())
}

/// Appends a manual note
pub async fn add_note(store: &dyn Store, principal: &Principal, task_id: Uuid, content: String) -> Result<TaskNote> {
    let task = store
        .get_task(task_id)
        .await?
        .ok_or_else(|| Error::not_found("Task", task_id))?;
    require(principal, Operation::Insert, &Resource::TaskNote { task_user_id: task.user_id })?;

    if content.trim().is_empty() {
        return Err(Error::Validation("note must not be empty".to_string()));
    }

    store
        .create_note(CreateTaskNote {
            task_id,
            content,
            source: NoteSource::Manual,
            created_by: principal.email.clone(),
        })
        .await
}

/// Lists a task's notes, newest first
pub async fn list_notes(store: &dyn Store, principal: &Principal, task_id: Uuid) -> Result<Vec<TaskNote>> {
    let task = store
        .get_task(task_id)
        .await?
        .ok_or_else(|| Error::not_found("Task", task_id))?;
    require(principal, Operation::Select, &Resource::TaskNote { task_user_id: task.user_id })?;

    store.list_notes(task_id).await
}

/// Appends a checklist item
pub async fn add_checklist_item(
    store: &dyn Store,
    principal: &Principal,
    task_id: Uuid,
    item_text: &str,
) -> Result<TaskChecklistItem> {
    let task = store
        .get_task(task_id)
        .await?
        .ok_or_else(|| Error::not_found("Task", task_id))?;
    require(
        principal,
        Operation::Insert,
        &Resource::TaskChecklistItem { task_user_id: task.user_id },
    )?;

    if item_text.trim().is_empty() {
        return Err(Error::Validation("checklist item must not be empty".to_string()));
    }

    store.create_checklist_item(task_id, item_text.trim()).await
}

/// Lists a task's checklist in display order
pub async fn list_checklist(store: &dyn Store, principal: &Principal, task_id: Uuid) -> Result<Vec<TaskChecklistItem>> {
    let task = store
        .get_task(task_id)
        .await?
        .ok_or_else(|| Error::not_found("Task", task_id))?;
    require(
        principal,
        Operation::Select,
        &Resource::TaskChecklistItem { task_user_id: task.user_id },
    )?;

    store.list_checklist_items(task_id).await
}

/// Ticks or unticks a checklist item of a task
pub async fn set_checklist_item_completed(
    store: &dyn Store,
    principal: &Principal,
    task_id: Uuid,
    item_id: Uuid,
    completed: bool,
) -> Result<TaskChecklistItem> {
    let item = store
        .get_checklist_item(item_id)
        .await?
        .filter(|item| item.task_id == task_id)
        .ok_or_else(|| Error::not_found("Checklist item", item_id))?;

    let task = store
        .get_task(item.task_id)
        .await?
        .ok_or_else(|| Error::not_found("Task", item.task_id))?;
    require(
        principal,
        Operation::Update,
        &Resource::TaskChecklistItem { task_user_id: task.user_id },
    )?;

    store
        .set_checklist_item_completed(item_id, completed, Utc::now())
        .await?
        .ok_or_else(|| Error::not_found("Checklist item", item_id))
}
