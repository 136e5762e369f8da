/// Operations on behalf of a principal
///
/// Each function takes the store, the principal and the request, resolves
/// the ownership facts of the target row, asks the access policy and only
/// then touches the store. Quota checks happen inside the store's atomic
/// writes.
///
/// - `profile`: the caller's own user row and quota usage
/// - `tasks`: tasks, notes and checklist items
/// - `email_connections`: connected mailboxes
/// - `actions`: issuing and redeeming email action tokens
///
/// # Example
///
/// ```no_run
/// use jottask_shared::auth::principal::Principal;
/// use jottask_shared::models::plan::PlanCatalog;
/// use jottask_shared::models::task::CreateTask;
/// use jottask_shared::services::tasks;
/// use jottask_shared::store::memory::MemoryStore;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let catalog = PlanCatalog::builtin();
/// let me = Principal::new(Uuid::new_v4());
///
/// let task = tasks::create_task(&store, &catalog, &me, CreateTask::new(me.user_id, "Ring supplier")).await?;
/// tasks::complete_task(&store, &catalog, &me, task.id).await?;
/// # Ok(())
/// # }
/// ```

pub mod actions;
pub mod email_connections;
pub mod profile;
pub mod tasks;
