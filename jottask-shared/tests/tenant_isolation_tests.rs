/// No row is visible or mutable across users

use jottask_shared::auth::principal::Principal;
use jottask_shared::error::Error;
use jottask_shared::models::email_connection::{CreateEmailConnection, EmailProvider, UpdateEmailConnection};
use jottask_shared::models::plan::PlanCatalog;
use jottask_shared::models::task::{CreateTask, TaskFilter, UpdateTask};
use jottask_shared::models::user::CreateUser;
use jottask_shared::services::{email_connections, profile, tasks};
use jottask_shared::store::memory::MemoryStore;
use uuid::Uuid;

struct Fixture {
    store: MemoryStore,
    catalog: PlanCatalog,
    alice: Principal,
    bob: Principal,
    alice_task: Uuid,
}

async fn fixture() -> Fixture {
    let store = MemoryStore::new();
    let catalog = PlanCatalog::builtin();

    let mut principals = Vec::new();
    for email in ["alice@example.com", "bob@example.com"] {
        let user = profile::create_profile(
            &store,
            CreateUser {
                id: Uuid::new_v4(),
                email: email.to_string(),
                full_name: None,
                timezone: None,
            },
        )
        .await
        .unwrap();
        principals.push(Principal::new(user.id));
    }
    let bob = principals.pop().unwrap();
    let alice = principals.pop().unwrap();

    let task = tasks::create_task(&store, &catalog, &alice, CreateTask::new(alice.user_id, "Alice's quote"))
        .await
        .unwrap();

    Fixture {
        store,
        catalog,
        alice,
        bob,
        alice_task: task.id,
    }
}

fn assert_unauthorized<T: std::fmt::Debug>(result: Result<T, Error>) {
    assert!(matches!(result, Err(Error::Unauthorized)), "expected Unauthorized, got {result:?}");
}

#[tokio::test]
async fn test_foreign_task_operations_denied() {
    let f = fixture().await;

    assert_unauthorized(tasks::get_task(&f.store, &f.bob, f.alice_task).await);
    assert_unauthorized(
        tasks::update_task(
            &f.store,
            &f.catalog,
            &f.bob,
            f.alice_task,
            UpdateTask {
                title: Some("hijacked".to_string()),
                ..Default::default()
            },
        )
        .await,
    );
    assert_unauthorized(tasks::complete_task(&f.store, &f.catalog, &f.bob, f.alice_task).await);
    assert_unauthorized(tasks::delete_task(&f.store, &f.bob, f.alice_task).await);

    // Alice's task is untouched
    let task = tasks::get_task(&f.store, &f.alice, f.alice_task).await.unwrap();
    assert_eq!(task.title, "Alice's quote");
}

#[tokio::test]
async fn test_create_task_for_another_user_denied() {
    let f = fixture().await;
    let forged = CreateTask::new(f.alice.user_id, "planted");
    assert_unauthorized(tasks::create_task(&f.store, &f.catalog, &f.bob, forged).await);
}

#[tokio::test]
async fn test_foreign_notes_and_checklist_denied() {
    let f = fixture().await;

    assert_unauthorized(tasks::add_note(&f.store, &f.bob, f.alice_task, "peek".to_string()).await);
    assert_unauthorized(tasks::list_notes(&f.store, &f.bob, f.alice_task).await);
    assert_unauthorized(tasks::add_checklist_item(&f.store, &f.bob, f.alice_task, "peek").await);
    assert_unauthorized(tasks::list_checklist(&f.store, &f.bob, f.alice_task).await);

    let item = tasks::add_checklist_item(&f.store, &f.alice, f.alice_task, "Measure")
        .await
        .unwrap();
    assert_unauthorized(
        tasks::set_checklist_item_completed(&f.store, &f.bob, f.alice_task, item.id, true).await,
    );
}

#[tokio::test]
async fn test_listing_only_shows_own_rows() {
    let f = fixture().await;
    let listed = tasks::list_tasks(&f.store, &f.bob, TaskFilter::default()).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_foreign_email_connection_denied() {
    let f = fixture().await;
    let connection = email_connections::create_connection(
        &f.store,
        &f.catalog,
        &f.alice,
        CreateEmailConnection {
            user_id: f.alice.user_id,
            provider: EmailProvider::Outlook,
            email_address: "alice@work.example.com".to_string(),
            imap_server: None,
            imap_password: None,
        },
    )
    .await
    .unwrap();

    assert_unauthorized(
        email_connections::update_connection(
            &f.store,
            &f.bob,
            connection.id,
            UpdateEmailConnection {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await,
    );
    assert_unauthorized(email_connections::delete_connection(&f.store, &f.bob, connection.id).await);
    assert!(email_connections::list_connections(&f.store, &f.bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_checklist_item_must_belong_to_task() {
    let f = fixture().await;
    let other_task = tasks::create_task(&f.store, &f.catalog, &f.alice, CreateTask::new(f.alice.user_id, "Other"))
        .await
        .unwrap();
    let item = tasks::add_checklist_item(&f.store, &f.alice, f.alice_task, "Measure")
        .await
        .unwrap();

    let result = tasks::set_checklist_item_completed(&f.store, &f.alice, other_task.id, item.id, true).await;
    assert!(matches!(result, Err(Error::NotFound { .. })));
}

#[tokio::test]
async fn test_profile_is_own_row() {
    let f = fixture().await;
    let me = profile::get_profile(&f.store, &f.bob).await.unwrap();
    assert_eq!(me.id, f.bob.user_id);
    assert_eq!(me.email, "bob@example.com");
}
