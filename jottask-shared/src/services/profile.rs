/// The caller's own profile

use crate::auth::policy::{require, Operation, Resource};
use crate::auth::principal::Principal;
use crate::error::{Error, Result};
use crate::models::plan::{PlanCatalog, SubscriptionPlan};
use crate::models::user::{CreateUser, UpdateUser, User};
use crate::quota::{QuotaEnforcer, QuotaUsage};
use crate::store::Store;

/// Creates the profile for a newly signed-up identity
///
/// Runs on the service path (signup hook), never for a principal.
pub async fn create_profile(store: &dyn Store, data: CreateUser) -> Result<User> {
    if data.normalized_email().is_empty() {
        return Err(Error::Validation("email is required".to_string()));
    }

    let user = store.create_user(data).await?;
    tracing::info!(user_id = %user.id, "User profile created");
    Ok(user)
}

/// Reads the caller's profile
pub async fn get_profile(store: &dyn Store, principal: &Principal) -> Result<User> {
    require(principal, Operation::Select, &Resource::User { id: principal.user_id })?;

    store
        .get_user(principal.user_id)
        .await?
        .ok_or_else(|| Error::not_found("User", principal.user_id))
}

/// Updates the caller's profile
pub async fn update_profile(store: &dyn Store, principal: &Principal, data: UpdateUser) -> Result<User> {
    require(principal, Operation::Update, &Resource::User { id: principal.user_id })?;

    if data.is_empty() {
        return get_profile(store, principal).await;
    }

    store
        .update_user(principal.user_id, data)
        .await?
        .ok_or_else(|| Error::not_found("User", principal.user_id))
}

/// The caller's plan and how much of it is used
pub async fn get_quota(
    store: &dyn Store,
    catalog: &PlanCatalog,
    principal: &Principal,
) -> Result<(SubscriptionPlan, QuotaUsage)> {
    let user = get_profile(store, principal).await?;
    let usage = QuotaEnforcer::new(store, catalog).usage(&user).await?;
    Ok((catalog.get(user.subscription_tier).clone(), usage))
}

/// Whether the caller may create one more task
pub async fn can_create_task(store: &dyn Store, catalog: &PlanCatalog, principal: &Principal) -> Result<bool> {
    let user = get_profile(store, principal).await?;
    QuotaEnforcer::new(store, catalog).can_create_task(&user).await
}
