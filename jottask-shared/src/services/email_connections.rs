/// Connected mailboxes

use chrono::Utc;
use uuid::Uuid;

use crate::auth::policy::{require, Operation, Resource};
use crate::auth::principal::Principal;
use crate::error::{Error, Result};
use crate::models::email_connection::{
    CreateEmailConnection, EmailConnection, EmailProvider, UpdateEmailConnection,
};
use crate::models::plan::PlanCatalog;
use crate::store::Store;

async fn load_connection(
    store: &dyn Store,
    principal: &Principal,
    operation: Operation,
    id: Uuid,
) -> Result<EmailConnection> {
    let connection = store
        .get_email_connection(id)
        .await?
        .ok_or_else(|| Error::not_found("Email connection", id))?;

    require(
        principal,
        operation,
        &Resource::EmailConnection { user_id: connection.user_id },
    )?;
    Ok(connection)
}

/// Lists the caller's connections
pub async fn list_connections(store: &dyn Store, principal: &Principal) -> Result<Vec<EmailConnection>> {
    require(
        principal,
        Operation::Select,
        &Resource::EmailConnection { user_id: principal.user_id },
    )?;
    store.list_email_connections(principal.user_id).await
}

/// Connects a mailbox, within the plan's connection limit
pub async fn create_connection(
    store: &dyn Store,
    catalog: &PlanCatalog,
    principal: &Principal,
    data: CreateEmailConnection,
) -> Result<EmailConnection> {
    require(
        principal,
        Operation::Insert,
        &Resource::EmailConnection { user_id: data.user_id },
    )?;

    if !data.normalized_address().contains('@') {
        return Err(Error::Validation("email_address is not an email address".to_string()));
    }
    if data.provider == EmailProvider::Imap && data.imap_server.is_none() {
        return Err(Error::Validation("imap_server is required for generic IMAP".to_string()));
    }

    store.create_email_connection(data, catalog).await
}

/// Updates credentials or toggles a connection
pub async fn update_connection(
    store: &dyn Store,
    principal: &Principal,
    id: Uuid,
    data: UpdateEmailConnection,
) -> Result<EmailConnection> {
    load_connection(store, principal, Operation::Update, id).await?;

    store
        .update_email_connection(id, data, Utc::now())
        .await?
        .ok_or_else(|| Error::not_found("Email connection", id))
}

/// Disconnects a mailbox
pub async fn delete_connection(store: &dyn Store, principal: &Principal, id: Uuid) -> Result<()> {
    load_connection(store, principal, Operation::Delete, id).await?;

    if !store.delete_email_connection(id).await? {
        return Err(Error::not_found("Email connection", id));
    }
    Ok(())
}
