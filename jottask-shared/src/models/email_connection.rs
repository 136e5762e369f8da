/// Mailboxes connected for inbound task capture
///
/// A user may connect several mailboxes, bounded by the plan's
/// `max_email_connections`. The IMAP credential never leaves the service:
/// it is skipped when a connection is serialized.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE email_connections (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     provider TEXT NOT NULL DEFAULT 'gmail'
///         CHECK (provider IN ('gmail', 'outlook', 'imap')),
///     email_address TEXT NOT NULL,
///     imap_server TEXT,
///     imap_password TEXT,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     last_checked_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (user_id, email_address)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Mail provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    #[default]
    Gmail,
    Outlook,
    Imap,
}

impl EmailProvider {
    /// Converts provider to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailProvider::Gmail => "gmail",
            EmailProvider::Outlook => "outlook",
            EmailProvider::Imap => "imap",
        }
    }

    /// Well-known IMAP host, `None` for generic IMAP
    pub fn default_imap_server(&self) -> Option<&'static str> {
        match self {
            EmailProvider::Gmail => Some("imap.gmail.com"),
            EmailProvider::Outlook => Some("outlook.office365.com"),
            EmailProvider::Imap => None,
        }
    }
}

/// Email connection row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmailConnection {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: EmailProvider,
    pub email_address: String,
    pub imap_server: Option<String>,

    /// App password; never serialized
    #[serde(skip_serializing, default)]
    pub imap_password: Option<String>,

    pub is_active: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for connecting a mailbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEmailConnection {
    pub user_id: Uuid,
    #[serde(default)]
    pub provider: EmailProvider,
    pub email_address: String,
    pub imap_server: Option<String>,
    pub imap_password: Option<String>,
}

impl CreateEmailConnection {
    /// Address in the form it is stored
    pub fn normalized_address(&self) -> String {
        self.email_address.trim().to_lowercase()
    }

    /// Explicit server, else the provider's well-known host
    pub fn resolved_imap_server(&self) -> Option<String> {
        self.imap_server
            .clone()
            .or_else(|| self.provider.default_imap_server().map(str::to_string))
    }
}

/// Mutable connection fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEmailConnection {
    pub imap_server: Option<String>,
    pub imap_password: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateEmailConnection {
    /// Applies the update to an in-memory copy
    pub fn apply(self, connection: &mut EmailConnection, now: DateTime<Utc>) {
        if let Some(server) = self.imap_server {
            connection.imap_server = Some(server);
        }
        if let Some(password) = self.imap_password {
            connection.imap_password = Some(password);
        }
        if let Some(active) = self.is_active {
            connection.is_active = active;
        }
        connection.updated_at = now;
    }
}

const CONNECTION_COLUMNS: &str = "id, user_id, provider, email_address, imap_server, \
    imap_password, is_active, last_checked_at, created_at, updated_at";

impl EmailConnection {
    /// Inserts a connection
    ///
    /// # Errors
    ///
    /// Unique violation on `email_connections_user_id_email_address_key` when
    /// the user already connected this address.
    pub async fn create<'e, E: PgExecutor<'e>>(
        db: E,
        data: CreateEmailConnection,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO email_connections (user_id, provider, email_address, imap_server, imap_password)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CONNECTION_COLUMNS}
            "#
        );

        sqlx::query_as::<_, EmailConnection>(&query)
            .bind(data.user_id)
            .bind(data.provider)
            .bind(data.normalized_address())
            .bind(data.resolved_imap_server())
            .bind(data.imap_password)
            .fetch_one(db)
            .await
    }

    /// Finds a connection by ID
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(db: E, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {CONNECTION_COLUMNS} FROM email_connections WHERE id = $1");

        sqlx::query_as::<_, EmailConnection>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Lists a user's connections, oldest first
    pub async fn list_by_user<'e, E: PgExecutor<'e>>(db: E, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {CONNECTION_COLUMNS} FROM email_connections WHERE user_id = $1 ORDER BY created_at ASC"
        );

        sqlx::query_as::<_, EmailConnection>(&query)
            .bind(user_id)
            .fetch_all(db)
            .await
    }

    /// Counts a user's connections, active or not
    pub async fn count_by_user<'e, E: PgExecutor<'e>>(db: E, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM email_connections WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(db)
            .await?;

        Ok(count)
    }

    /// Updates mutable fields; `updated_at` is maintained by trigger
    pub async fn update<'e, E: PgExecutor<'e>>(
        db: E,
        id: Uuid,
        data: UpdateEmailConnection,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE email_connections
            SET imap_server = COALESCE($2, imap_server),
                imap_password = COALESCE($3, imap_password),
                is_active = COALESCE($4, is_active)
            WHERE id = $1
            RETURNING {CONNECTION_COLUMNS}
            "#
        );

        sqlx::query_as::<_, EmailConnection>(&query)
            .bind(id)
            .bind(data.imap_server)
            .bind(data.imap_password)
            .bind(data.is_active)
            .fetch_optional(db)
            .await
    }

    /// Deletes a connection
    pub async fn delete<'e, E: PgExecutor<'e>>(db: E, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM email_connections WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_imap_servers() {
        assert_eq!(EmailProvider::Gmail.default_imap_server(), Some("imap.gmail.com"));
        assert_eq!(EmailProvider::Imap.default_imap_server(), None);
    }

    #[test]
    fn test_create_resolves_server_and_address() {
        let data = CreateEmailConnection {
            user_id: Uuid::new_v4(),
            provider: EmailProvider::Gmail,
            email_address: " Rob@Example.com ".to_string(),
            imap_server: None,
            imap_password: Some("app-password".to_string()),
        };

        assert_eq!(data.normalized_address(), "rob@example.com");
        assert_eq!(data.resolved_imap_server().as_deref(), Some("imap.gmail.com"));
    }

    #[test]
    fn test_password_not_serialized() {
        let now = Utc::now();
        let connection = EmailConnection {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            provider: EmailProvider::Imap,
            email_address: "rob@example.com".to_string(),
            imap_server: Some("mail.example.com".to_string()),
            imap_password: Some("secret".to_string()),
            is_active: true,
            last_checked_at: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&connection).unwrap();
        assert!(json.get("imap_password").is_none());
        assert_eq!(json["provider"], "imap");
    }
}
