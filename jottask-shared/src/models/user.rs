/// User profile model and database operations
///
/// A user row mirrors an identity issued by the external authentication
/// provider: `id` is the provider's subject. The row carries the profile and
/// the subscription state the quota evaluator reads.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     email TEXT NOT NULL UNIQUE,
///     full_name TEXT,
///     timezone TEXT NOT NULL DEFAULT 'Australia/Brisbane',
///     subscription_tier TEXT NOT NULL DEFAULT 'starter'
///         REFERENCES subscription_plans(id),
///     subscription_status TEXT NOT NULL DEFAULT 'trial',
///     trial_ends_at TIMESTAMPTZ DEFAULT (NOW() + INTERVAL '14 days'),
///     stripe_customer_id TEXT,
///     stripe_subscription_id TEXT,
///     settings JSONB NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use jottask_shared::models::user::{User, CreateUser};
/// use jottask_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     id: Uuid::new_v4(),
///     email: "Rob@Example.com".to_string(),
///     full_name: None,
///     timezone: None,
/// }).await?;
/// assert_eq!(user.email, "rob@example.com");
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgExecutor;
use uuid::Uuid;

use super::plan::SubscriptionTier;

/// Length of the trial granted at signup
pub const DEFAULT_TRIAL_DAYS: i64 = 14;

/// Timezone assigned when signup does not provide one
pub const DEFAULT_TIMEZONE: &str = "Australia/Brisbane";

/// Billing state of a user, kept in sync by the billing webhook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    /// Converts status to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

/// User profile row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Subject id from the authentication provider
    pub id: Uuid,

    /// Lowercased email address, unique across users
    pub email: String,

    /// Display name
    pub full_name: Option<String>,

    /// IANA timezone name used for due dates and reminders
    pub timezone: String,

    /// Plan the user is on
    pub subscription_tier: SubscriptionTier,

    /// Billing state
    pub subscription_status: SubscriptionStatus,

    /// End of the trial period (None once converted)
    pub trial_ends_at: Option<DateTime<Utc>>,

    /// Billing provider customer id
    #[serde(skip_serializing)]
    pub stripe_customer_id: Option<String>,

    /// Billing provider subscription id
    #[serde(skip_serializing)]
    pub stripe_subscription_id: Option<String>,

    /// Free-form user preferences
    pub settings: JsonValue,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the subscription currently grants access
    ///
    /// Trials grant access until `trial_ends_at`; cancelled and expired
    /// subscriptions do not.
    pub fn has_active_access(&self, now: DateTime<Utc>) -> bool {
        match self.subscription_status {
            SubscriptionStatus::Active => true,
            SubscriptionStatus::Trial => self.trial_ends_at.map_or(true, |ends| now < ends),
            SubscriptionStatus::Cancelled | SubscriptionStatus::Expired => false,
        }
    }

    /// Whole days left in the trial, if the user is on one
    pub fn trial_days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        if self.subscription_status != SubscriptionStatus::Trial {
            return None;
        }
        self.trial_ends_at
            .map(|ends| (ends - now).num_days().max(0))
    }
}

/// Input for creating a profile at signup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Subject id issued by the authentication provider
    pub id: Uuid,

    /// Email address (lowercased before storage)
    pub email: String,

    /// Display name, defaults to the local part of the email
    pub full_name: Option<String>,

    /// Timezone, defaults to [`DEFAULT_TIMEZONE`]
    pub timezone: Option<String>,
}

impl CreateUser {
    /// Email in the form it is stored
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }

    /// Display name in the form it is stored
    pub fn resolved_full_name(&self) -> String {
        match &self.full_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => self
                .normalized_email()
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Timezone in the form it is stored
    pub fn resolved_timezone(&self) -> String {
        self.timezone
            .clone()
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string())
    }

    /// Trial end for a signup happening at `now`
    pub fn trial_ends_at(now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(DEFAULT_TRIAL_DAYS)
    }
}

/// Profile fields a user may change
///
/// Subscription fields are deliberately absent: the billing webhook owns them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub full_name: Option<String>,
    pub timezone: Option<String>,
    pub settings: Option<JsonValue>,
}

impl UpdateUser {
    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.timezone.is_none() && self.settings.is_none()
    }
}

const USER_COLUMNS: &str = "id, email, full_name, timezone, subscription_tier, \
    subscription_status, trial_ends_at, stripe_customer_id, stripe_subscription_id, \
    settings, created_at, updated_at";

impl User {
    /// Creates a profile in trial state on the starter tier
    ///
    /// # Errors
    ///
    /// Returns a unique violation on `users_email_key` or `users_pkey` if the
    /// email or id is already registered.
    pub async fn create<'e, E: PgExecutor<'e>>(db: E, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (id, email, full_name, timezone, trial_ends_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.id)
            .bind(data.normalized_email())
            .bind(data.resolved_full_name())
            .bind(data.resolved_timezone())
            .bind(CreateUser::trial_ends_at(Utc::now()))
            .fetch_one(db)
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(db: E, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Finds a user by ID and locks the row until the transaction ends
    ///
    /// Serialises quota-checked writes of one user.
    pub async fn lock_for_update<'e, E: PgExecutor<'e>>(db: E, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Updates profile fields; `updated_at` is maintained by trigger
    pub async fn update<'e, E: PgExecutor<'e>>(
        db: E,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET full_name = COALESCE($2, full_name),
                timezone = COALESCE($3, timezone),
                settings = COALESCE($4, settings)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(data.full_name)
            .bind(data.timezone)
            .bind(data.settings)
            .fetch_optional(db)
            .await
    }

    /// Deletes a user and, by cascade, everything they own
    pub async fn delete<'e, E: PgExecutor<'e>>(db: E, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(status: SubscriptionStatus, trial_ends_at: Option<DateTime<Utc>>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "rob@example.com".to_string(),
            full_name: None,
            timezone: DEFAULT_TIMEZONE.to_string(),
            subscription_tier: SubscriptionTier::Starter,
            subscription_status: status,
            trial_ends_at,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            settings: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_create_user_defaults() {
        let data = CreateUser {
            id: Uuid::new_v4(),
            email: "  Rob.Smith@Example.COM ".to_string(),
            full_name: None,
            timezone: None,
        };

        assert_eq!(data.normalized_email(), "rob.smith@example.com");
        assert_eq!(data.resolved_full_name(), "rob.smith");
        assert_eq!(data.resolved_timezone(), DEFAULT_TIMEZONE);
    }

    #[test]
    fn test_trial_ends_after_fourteen_days() {
        let now = Utc::now();
        assert_eq!(CreateUser::trial_ends_at(now) - now, Duration::days(14));
    }

    #[test]
    fn test_has_active_access() {
        let now = Utc::now();

        assert!(user(SubscriptionStatus::Active, None).has_active_access(now));
        assert!(user(SubscriptionStatus::Trial, Some(now + Duration::days(1))).has_active_access(now));
        assert!(!user(SubscriptionStatus::Trial, Some(now - Duration::days(1))).has_active_access(now));
        assert!(!user(SubscriptionStatus::Cancelled, None).has_active_access(now));
        assert!(!user(SubscriptionStatus::Expired, None).has_active_access(now));
    }

    #[test]
    fn test_trial_days_remaining() {
        let now = Utc::now();
        let trial = user(SubscriptionStatus::Trial, Some(now + Duration::days(3) + Duration::hours(1)));
        assert_eq!(trial.trial_days_remaining(now), Some(3));

        let lapsed = user(SubscriptionStatus::Trial, Some(now - Duration::days(2)));
        assert_eq!(lapsed.trial_days_remaining(now), Some(0));

        assert_eq!(user(SubscriptionStatus::Active, None).trial_days_remaining(now), None);
    }

    #[test]
    fn test_stripe_ids_not_serialized() {
        let mut u = user(SubscriptionStatus::Active, None);
        u.stripe_customer_id = Some("cus_123".to_string());
        let json = serde_json::to_string(&u).unwrap();
        assert!(!json.contains("cus_123"));
    }

    #[test]
    fn test_update_user_is_empty() {
        assert!(UpdateUser::default().is_empty());
        let update = UpdateUser {
            timezone: Some("UTC".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
