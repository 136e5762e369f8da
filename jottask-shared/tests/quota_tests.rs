/// Quota behaviour through the service layer on the in-memory store

use jottask_shared::auth::principal::Principal;
use jottask_shared::error::Error;
use jottask_shared::models::email_connection::{CreateEmailConnection, EmailProvider};
use jottask_shared::models::plan::{PlanCatalog, SubscriptionTier};
use jottask_shared::models::task::{CreateTask, TaskStatus};
use jottask_shared::models::user::{CreateUser, SubscriptionStatus};
use jottask_shared::quota::QuotaType;
use jottask_shared::services::{email_connections, profile, tasks};
use jottask_shared::store::memory::MemoryStore;
use jottask_shared::store::Store;
use std::sync::Arc;
use uuid::Uuid;

async fn signup(store: &MemoryStore, email: &str) -> Principal {
    let user = profile::create_profile(
        store,
        CreateUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            full_name: None,
            timezone: None,
        },
    )
    .await
    .expect("signup");
    Principal::new(user.id)
}

async fn fill_pending(store: &MemoryStore, catalog: &PlanCatalog, me: &Principal, n: usize) -> Vec<Uuid> {
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let task = tasks::create_task(store, catalog, me, CreateTask::new(me.user_id, format!("Task {i}")))
            .await
            .expect("create within quota");
        ids.push(task.id);
    }
    ids
}

#[tokio::test]
async fn test_starter_limit_frees_slot_on_completion() {
    let store = MemoryStore::new();
    let catalog = PlanCatalog::builtin();
    let me = signup(&store, "starter@example.com").await;

    let ids = fill_pending(&store, &catalog, &me, 50).await;
    assert!(!profile::can_create_task(&store, &catalog, &me).await.unwrap());

    tasks::complete_task(&store, &catalog, &me, ids[0]).await.unwrap();
    assert!(profile::can_create_task(&store, &catalog, &me).await.unwrap());
}

#[tokio::test]
async fn test_create_beyond_limit_rejected() {
    let store = MemoryStore::new();
    let catalog = PlanCatalog::builtin();
    let me = signup(&store, "full@example.com").await;
    fill_pending(&store, &catalog, &me, 50).await;

    let result = tasks::create_task(&store, &catalog, &me, CreateTask::new(me.user_id, "one too many")).await;
    match result {
        Err(Error::QuotaExceeded { quota_type, limit, current }) => {
            assert_eq!(quota_type, QuotaType::PendingTasks);
            assert_eq!(limit, 50);
            assert_eq!(current, 50);
        }
        other => panic!("expected QuotaExceeded, got {other:?}"),
    }
}

#[tokio::test]
async fn test_small_limit_exactly_n_succeed() {
    let store = MemoryStore::new();
    let mut starter = PlanCatalog::builtin().get(SubscriptionTier::Starter).clone();
    starter.max_tasks = 3;
    let catalog = PlanCatalog::from_plans(vec![starter]);
    let me = signup(&store, "three@example.com").await;

    let ids = fill_pending(&store, &catalog, &me, 3).await;
    assert!(tasks::create_task(&store, &catalog, &me, CreateTask::new(me.user_id, "4th")).await.is_err());

    // One slot freed, exactly one create succeeds
    tasks::complete_task(&store, &catalog, &me, ids[1]).await.unwrap();
    assert!(tasks::create_task(&store, &catalog, &me, CreateTask::new(me.user_id, "4th")).await.is_ok());
    assert!(tasks::create_task(&store, &catalog, &me, CreateTask::new(me.user_id, "5th")).await.is_err());
}

#[tokio::test]
async fn test_unlimited_plan_always_allowed() {
    let store = MemoryStore::new();
    let catalog = PlanCatalog::builtin();
    let me = signup(&store, "business@example.com").await;
    store
        .set_subscription(me.user_id, SubscriptionTier::Business, SubscriptionStatus::Active)
        .await
        .unwrap();

    fill_pending(&store, &catalog, &me, 120).await;
    assert!(profile::can_create_task(&store, &catalog, &me).await.unwrap());
    assert_eq!(store.count_tasks(me.user_id, TaskStatus::Pending).await.unwrap(), 120);
}

#[tokio::test]
async fn test_reopen_needs_free_slot() {
    let store = MemoryStore::new();
    let mut starter = PlanCatalog::builtin().get(SubscriptionTier::Starter).clone();
    starter.max_tasks = 2;
    let catalog = PlanCatalog::from_plans(vec![starter]);
    let me = signup(&store, "reopen@example.com").await;

    let ids = fill_pending(&store, &catalog, &me, 2).await;
    tasks::complete_task(&store, &catalog, &me, ids[0]).await.unwrap();
    fill_pending(&store, &catalog, &me, 1).await;

    let result = tasks::reopen_task(&store, &catalog, &me, ids[0]).await;
    assert!(matches!(result, Err(Error::QuotaExceeded { .. })));

    let task = tasks::get_task(&store, &me, ids[0]).await.unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_concurrent_creates_never_exceed_limit() {
    let store = Arc::new(MemoryStore::new());
    let mut starter = PlanCatalog::builtin().get(SubscriptionTier::Starter).clone();
    starter.max_tasks = 5;
    let catalog = Arc::new(PlanCatalog::from_plans(vec![starter]));
    let me = signup(&store, "race@example.com").await;

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let store = Arc::clone(&store);
            let catalog = Arc::clone(&catalog);
            let me = me.clone();
            tokio::spawn(async move {
                tasks::create_task(store.as_ref(), &catalog, &me, CreateTask::new(me.user_id, format!("t{i}"))).await
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            created += 1;
        }
    }

    assert_eq!(created, 5);
    assert_eq!(store.count_tasks(me.user_id, TaskStatus::Pending).await.unwrap(), 5);
}

#[tokio::test]
async fn test_email_connection_limit() {
    let store = MemoryStore::new();
    let catalog = PlanCatalog::builtin();
    let me = signup(&store, "mail@example.com").await;

    let connect = |address: &str| CreateEmailConnection {
        user_id: me.user_id,
        provider: EmailProvider::Gmail,
        email_address: address.to_string(),
        imap_server: None,
        imap_password: Some("app-password".to_string()),
    };

    email_connections::create_connection(&store, &catalog, &me, connect("first@example.com"))
        .await
        .unwrap();

    let result = email_connections::create_connection(&store, &catalog, &me, connect("second@example.com")).await;
    assert!(matches!(
        result,
        Err(Error::QuotaExceeded { quota_type: QuotaType::EmailConnections, .. })
    ));
}

#[tokio::test]
async fn test_quota_usage_reports_both_quotas() {
    let store = MemoryStore::new();
    let catalog = PlanCatalog::builtin();
    let me = signup(&store, "usage@example.com").await;
    fill_pending(&store, &catalog, &me, 4).await;

    let (plan, usage) = profile::get_quota(&store, &catalog, &me).await.unwrap();
    assert_eq!(plan.id, SubscriptionTier::Starter);
    assert_eq!(usage.pending_tasks.current, 4);
    assert_eq!(usage.pending_tasks.remaining, Some(46));
    assert_eq!(usage.email_connections.current, 0);
}
