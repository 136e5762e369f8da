/// Plan-based quota enforcement
///
/// Quotas come from the user's subscription plan in the [`PlanCatalog`].
/// Two quotas are enforced:
/// - Pending tasks (`max_tasks`; completed and cancelled tasks are free)
/// - Email connections (`max_email_connections`; all connections count)
///
/// A limit of `-1` in the catalog means unlimited and is represented here as
/// `None`.
///
/// The [`QuotaEnforcer`] answers "may this user create another one?" for
/// display and pre-flight checks. The authoritative check runs again inside
/// the store's create transaction via [`ensure_within_limit`], so two
/// concurrent creates cannot both take the last slot.
///
/// # Example
///
/// ```no_run
/// use jottask_shared::quota::QuotaEnforcer;
/// use jottask_shared::models::plan::PlanCatalog;
/// use jottask_shared::models::user::User;
/// use jottask_shared::store::Store;
///
/// # async fn example(store: &dyn Store, user: &User) -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = PlanCatalog::builtin();
/// let enforcer = QuotaEnforcer::new(store, &catalog);
///
/// if !enforcer.can_create_task(user).await? {
///     println!("Upgrade to add more tasks");
/// }
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::plan::{PlanCatalog, SubscriptionPlan};
use crate::models::task::TaskStatus;
use crate::models::user::User;
use crate::store::Store;

/// Type of quota to check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaType {
    /// Tasks in `pending` status
    PendingTasks,

    /// Connected mailboxes
    EmailConnections,
}

impl QuotaType {
    /// Human-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaType::PendingTasks => "Pending tasks",
            QuotaType::EmailConnections => "Email connections",
        }
    }
}

/// Limits of one plan; `None` is unlimited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaLimits {
    pub pending_tasks: Option<u32>,
    pub email_connections: Option<u32>,
}

impl QuotaLimits {
    /// Gets quota limits for a plan
    pub fn for_plan(plan: &SubscriptionPlan) -> Self {
        QuotaLimits {
            pending_tasks: plan.task_limit(),
            email_connections: plan.email_connection_limit(),
        }
    }

    /// Gets limit for a specific quota type
    pub fn get(&self, quota_type: QuotaType) -> Option<u32> {
        match quota_type {
            QuotaType::PendingTasks => self.pending_tasks,
            QuotaType::EmailConnections => self.email_connections,
        }
    }
}

/// Result of quota check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaCheckResult {
    pub quota_type: QuotaType,

    /// Whether one more item fits
    pub allowed: bool,

    /// Current usage
    pub current: u32,

    /// Maximum allowed, `None` for unlimited
    pub limit: Option<u32>,

    /// Remaining slots, `None` for unlimited
    pub remaining: Option<u32>,
}

impl QuotaCheckResult {
    /// Evaluates usage against a limit
    pub fn evaluate(quota_type: QuotaType, limit: Option<u32>, current: u32) -> Self {
        match limit {
            None => QuotaCheckResult {
                quota_type,
                allowed: true,
                current,
                limit: None,
                remaining: None,
            },
            Some(limit) => QuotaCheckResult {
                quota_type,
                allowed: current < limit,
                current,
                limit: Some(limit),
                remaining: Some(limit.saturating_sub(current)),
            },
        }
    }

    /// Converts a failed check into [`Error::QuotaExceeded`]
    pub fn into_result(self) -> Result<Self> {
        match (self.allowed, self.limit) {
            (false, Some(limit)) => Err(Error::QuotaExceeded {
                quota_type: self.quota_type,
                limit,
                current: self.current,
            }),
            _ => Ok(self),
        }
    }
}

/// Errors with [`Error::QuotaExceeded`] unless one more item fits
///
/// Store backends call this between counting and inserting, while holding
/// the user's lock.
pub fn ensure_within_limit(quota_type: QuotaType, limit: Option<u32>, current: u32) -> Result<()> {
    QuotaCheckResult::evaluate(quota_type, limit, current)
        .into_result()
        .map(|_| ())
}

/// Usage summary across all quotas
#[derive(Debug, Clone, Serialize)]
pub struct QuotaUsage {
    pub plan: String,
    pub pending_tasks: QuotaCheckResult,
    pub email_connections: QuotaCheckResult,
}

/// Quota enforcement service
///
/// Checks resource usage against plan-based limits.
pub struct QuotaEnforcer<'a> {
    store: &'a dyn Store,
    catalog: &'a PlanCatalog,
}

impl<'a> QuotaEnforcer<'a> {
    /// Creates a new quota enforcer
    pub fn new(store: &'a dyn Store, catalog: &'a PlanCatalog) -> Self {
        QuotaEnforcer { store, catalog }
    }

    /// Limits of the user's current plan
    pub fn limits(&self, user: &User) -> QuotaLimits {
        QuotaLimits::for_plan(self.catalog.get(user.subscription_tier))
    }

    /// Whether the user may create one more pending task
    ///
    /// Unlimited plans answer `true` without counting.
    pub async fn can_create_task(&self, user: &User) -> Result<bool> {
        if self.limits(user).pending_tasks.is_none() {
            return Ok(true);
        }
        Ok(self.check(user, QuotaType::PendingTasks).await?.allowed)
    }

    /// Checks if the user is within quota for a resource
    pub async fn check(&self, user: &User, quota_type: QuotaType) -> Result<QuotaCheckResult> {
        let limit = self.limits(user).get(quota_type);

        let current = match quota_type {
            QuotaType::PendingTasks => {
                self.store
                    .count_tasks(user.id, TaskStatus::Pending)
                    .await?
            }
            QuotaType::EmailConnections => self.store.count_email_connections(user.id).await?,
        };

        Ok(QuotaCheckResult::evaluate(quota_type, limit, current))
    }

    /// Usage of every quota, for display
    pub async fn usage(&self, user: &User) -> Result<QuotaUsage> {
        Ok(QuotaUsage {
            plan: user.subscription_tier.as_str().to_string(),
            pending_tasks: self.check(user, QuotaType::PendingTasks).await?,
            email_connections: self.check(user, QuotaType::EmailConnections).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::plan::SubscriptionTier;

    #[test]
    fn test_quota_limits_starter() {
        let catalog = PlanCatalog::builtin();
        let limits = QuotaLimits::for_plan(catalog.get(SubscriptionTier::Starter));
        assert_eq!(limits.pending_tasks, Some(50));
        assert_eq!(limits.email_connections, Some(1));
    }

    #[test]
    fn test_quota_limits_business_unlimited_tasks() {
        let catalog = PlanCatalog::builtin();
        let limits = QuotaLimits::for_plan(catalog.get(SubscriptionTier::Business));
        assert_eq!(limits.get(QuotaType::PendingTasks), None);
        assert_eq!(limits.get(QuotaType::EmailConnections), Some(10));
    }

    #[test]
    fn test_evaluate_within_limit() {
        let result = QuotaCheckResult::evaluate(QuotaType::PendingTasks, Some(50), 49);
        assert!(result.allowed);
        assert_eq!(result.remaining, Some(1));
    }

    #[test]
    fn test_evaluate_at_limit() {
        let result = QuotaCheckResult::evaluate(QuotaType::PendingTasks, Some(50), 50);
        assert!(!result.allowed);
        assert_eq!(result.remaining, Some(0));
    }

    #[test]
    fn test_evaluate_unlimited() {
        let result = QuotaCheckResult::evaluate(QuotaType::PendingTasks, None, 1_000_000);
        assert!(result.allowed);
        assert_eq!(result.limit, None);
        assert_eq!(result.remaining, None);
    }

    #[test]
    fn test_ensure_within_limit_errors_at_limit() {
        let err = ensure_within_limit(QuotaType::EmailConnections, Some(1), 1).unwrap_err();
        match err {
            Error::QuotaExceeded {
                quota_type,
                limit,
                current,
            } => {
                assert_eq!(quota_type, QuotaType::EmailConnections);
                assert_eq!(limit, 1);
                assert_eq!(current, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(ensure_within_limit(QuotaType::EmailConnections, Some(1), 0).is_ok());
        assert!(ensure_within_limit(QuotaType::PendingTasks, None, u32::MAX).is_ok());
    }

    #[test]
    fn test_quota_type_as_str() {
        assert_eq!(QuotaType::PendingTasks.as_str(), "Pending tasks");
        assert_eq!(QuotaType::EmailConnections.as_str(), "Email connections");
    }
}
