/// Subscription plans and the plan catalog
///
/// Plans are static reference data: one row per subscription tier, holding
/// numeric limits and feature flags. The catalog is seeded by the initial
/// migration and mirrored in code by [`PlanCatalog::builtin`] so the quota
/// evaluator can run without a database.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE subscription_plans (
///     id TEXT PRIMARY KEY CHECK (id IN ('starter', 'pro', 'business')),
///     name TEXT NOT NULL,
///     price_monthly INTEGER NOT NULL DEFAULT 0,
///     price_yearly INTEGER NOT NULL DEFAULT 0,
///     max_tasks INTEGER NOT NULL,                -- -1 = unlimited
///     max_email_connections INTEGER NOT NULL,
///     max_team_members INTEGER NOT NULL DEFAULT 1,
///     ai_summaries BOOLEAN NOT NULL DEFAULT FALSE,
///     custom_statuses BOOLEAN NOT NULL DEFAULT FALSE,
///     api_access BOOLEAN NOT NULL DEFAULT FALSE,
///     advanced_analytics BOOLEAN NOT NULL DEFAULT FALSE,
///     priority_support BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Sentinel used by `max_tasks` for "no limit"
pub const UNLIMITED: i32 = -1;

/// Subscription tier of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    /// Free tier
    Starter,

    /// Paid individual tier
    Pro,

    /// Paid team tier
    Business,
}

impl SubscriptionTier {
    /// All tiers in display order
    pub const ALL: [SubscriptionTier; 3] = [
        SubscriptionTier::Starter,
        SubscriptionTier::Pro,
        SubscriptionTier::Business,
    ];

    /// Converts tier to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Starter => "starter",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Business => "business",
        }
    }
}

impl FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "starter" => Ok(SubscriptionTier::Starter),
            "pro" => Ok(SubscriptionTier::Pro),
            "business" => Ok(SubscriptionTier::Business),
            other => Err(format!("unknown subscription tier: {}", other)),
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the plan catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubscriptionPlan {
    /// Tier name, doubles as primary key
    pub id: SubscriptionTier,

    /// Display name
    pub name: String,

    /// Monthly price in whole dollars
    pub price_monthly: i32,

    /// Yearly price in whole dollars
    pub price_yearly: i32,

    /// Maximum pending tasks, `-1` for unlimited
    pub max_tasks: i32,

    /// Maximum connected mailboxes
    pub max_email_connections: i32,

    /// Maximum seats
    pub max_team_members: i32,

    pub ai_summaries: bool,
    pub custom_statuses: bool,
    pub api_access: bool,
    pub advanced_analytics: bool,
    pub priority_support: bool,
}

impl SubscriptionPlan {
    /// Task limit, or `None` when the plan is unlimited
    pub fn task_limit(&self) -> Option<u32> {
        limit_from_column(self.max_tasks)
    }

    /// Email connection limit, or `None` when unlimited
    pub fn email_connection_limit(&self) -> Option<u32> {
        limit_from_column(self.max_email_connections)
    }

    /// Loads every plan row, cheapest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            SELECT id, name, price_monthly, price_yearly, max_tasks,
                   max_email_connections, max_team_members, ai_summaries,
                   custom_statuses, api_access, advanced_analytics, priority_support
            FROM subscription_plans
            ORDER BY price_monthly ASC
            "#,
        )
        .fetch_all(pool)
        .await
    }
}

fn limit_from_column(value: i32) -> Option<u32> {
    if value < 0 {
        None
    } else {
        Some(value as u32)
    }
}

/// Tier → plan lookup table
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: HashMap<SubscriptionTier, SubscriptionPlan>,
}

impl PlanCatalog {
    /// The catalog shipped with the initial migration
    pub fn builtin() -> Self {
        Self::from_plans(vec![
            SubscriptionPlan {
                id: SubscriptionTier::Starter,
                name: "Starter".to_string(),
                price_monthly: 0,
                price_yearly: 0,
                max_tasks: 50,
                max_email_connections: 1,
                max_team_members: 1,
                ai_summaries: false,
                custom_statuses: false,
                api_access: false,
                advanced_analytics: false,
                priority_support: false,
            },
            SubscriptionPlan {
                id: SubscriptionTier::Pro,
                name: "Pro".to_string(),
                price_monthly: 19,
                price_yearly: 190,
                max_tasks: 500,
                max_email_connections: 3,
                max_team_members: 1,
                ai_summaries: true,
                custom_statuses: true,
                api_access: false,
                advanced_analytics: false,
                priority_support: true,
            },
            SubscriptionPlan {
                id: SubscriptionTier::Business,
                name: "Business".to_string(),
                price_monthly: 49,
                price_yearly: 490,
                max_tasks: UNLIMITED,
                max_email_connections: 10,
                max_team_members: 10,
                ai_summaries: true,
                custom_statuses: true,
                api_access: true,
                advanced_analytics: true,
                priority_support: true,
            },
        ])
    }

    /// Builds a catalog from plan rows; later rows win on duplicate tiers
    pub fn from_plans(plans: Vec<SubscriptionPlan>) -> Self {
        Self {
            plans: plans.into_iter().map(|plan| (plan.id, plan)).collect(),
        }
    }

    /// Loads the catalog from `subscription_plans`
    ///
    /// Tiers missing from the table fall back to the builtin definition.
    pub async fn load(pool: &PgPool) -> Result<Self, sqlx::Error> {
        let mut catalog = Self::builtin();
        for plan in SubscriptionPlan::list(pool).await? {
            catalog.plans.insert(plan.id, plan);
        }
        Ok(catalog)
    }

    /// Plan for a tier
    pub fn get(&self, tier: SubscriptionTier) -> &SubscriptionPlan {
        // builtin() covers every tier and load() starts from it
        self.plans
            .get(&tier)
            .or_else(|| self.plans.get(&SubscriptionTier::Starter))
            .unwrap_or(&FALLBACK_PLAN)
    }

    /// All plans in tier order
    pub fn plans(&self) -> Vec<&SubscriptionPlan> {
        SubscriptionTier::ALL
            .iter()
            .filter_map(|tier| self.plans.get(tier))
            .collect()
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Most restrictive plan, used only if a hand-built catalog lacks a tier
static FALLBACK_PLAN: SubscriptionPlan = SubscriptionPlan {
    id: SubscriptionTier::Starter,
    name: String::new(),
    price_monthly: 0,
    price_yearly: 0,
    max_tasks: 0,
    max_email_connections: 0,
    max_team_members: 1,
    ai_summaries: false,
    custom_statuses: false,
    api_access: false,
    advanced_analytics: false,
    priority_support: false,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_round_trip_strings() {
        for tier in SubscriptionTier::ALL {
            assert_eq!(tier.as_str().parse::<SubscriptionTier>(), Ok(tier));
        }
        assert!("enterprise".parse::<SubscriptionTier>().is_err());
    }

    #[test]
    fn test_builtin_limits() {
        let catalog = PlanCatalog::builtin();
        assert_eq!(catalog.get(SubscriptionTier::Starter).task_limit(), Some(50));
        assert_eq!(catalog.get(SubscriptionTier::Pro).task_limit(), Some(500));
        assert_eq!(catalog.get(SubscriptionTier::Business).task_limit(), None);
        assert_eq!(
            catalog.get(SubscriptionTier::Business).email_connection_limit(),
            Some(10)
        );
    }

    #[test]
    fn test_plans_in_tier_order() {
        let catalog = PlanCatalog::builtin();
        let ids: Vec<_> = catalog.plans().iter().map(|p| p.id).collect();
        assert_eq!(ids, SubscriptionTier::ALL.to_vec());
    }

    #[test]
    fn test_from_plans_overrides() {
        let mut starter = PlanCatalog::builtin().get(SubscriptionTier::Starter).clone();
        starter.max_tasks = 3;
        let catalog = PlanCatalog::from_plans(vec![starter]);

        assert_eq!(catalog.get(SubscriptionTier::Starter).task_limit(), Some(3));
        // Missing tier falls back to starter
        assert_eq!(catalog.get(SubscriptionTier::Pro).task_limit(), Some(3));
    }

    #[test]
    fn test_negative_limit_is_unlimited() {
        assert_eq!(limit_from_column(UNLIMITED), None);
        assert_eq!(limit_from_column(0), Some(0));
    }
}
