/// Email connection endpoints
///
/// - `GET /v1/email-connections` - List the caller's mailboxes
/// - `POST /v1/email-connections` - Connect a mailbox (quota-checked)
/// - `PATCH /v1/email-connections/:id` - Change server, password or active flag
/// - `DELETE /v1/email-connections/:id` - Disconnect
///
/// IMAP passwords are write-only: they are accepted here but never
/// serialized back.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use jottask_shared::{
    auth::principal::Principal,
    models::email_connection::{
        CreateEmailConnection, EmailConnection, EmailProvider, UpdateEmailConnection,
    },
    services::email_connections,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateConnectionRequest {
    #[serde(default)]
    pub provider: EmailProvider,

    #[validate(email(message = "Invalid email address"))]
    pub email_address: String,

    #[validate(length(min = 1, max = 255, message = "IMAP server must be 1-255 characters"))]
    pub imap_server: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Password must be 1-255 characters"))]
    pub imap_password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateConnectionRequest {
    #[validate(length(min = 1, max = 255, message = "IMAP server must be 1-255 characters"))]
    pub imap_server: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Password must be 1-255 characters"))]
    pub imap_password: Option<String>,

    pub is_active: Option<bool>,
}

impl From<UpdateConnectionRequest> for UpdateEmailConnection {
    fn from(req: UpdateConnectionRequest) -> Self {
        UpdateEmailConnection {
            imap_server: req.imap_server,
            imap_password: req.imap_password,
            is_active: req.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListConnectionsResponse {
    pub connections: Vec<EmailConnection>,
}

pub async fn list_connections(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<ListConnectionsResponse>> {
    let connections = email_connections::list_connections(state.store(), &principal).await?;
    Ok(Json(ListConnectionsResponse { connections }))
}

/// Connect a mailbox
///
/// # Errors
///
/// - `402 Payment Required`: Email connection limit of the plan reached
/// - `409 Conflict`: Address already connected
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_connection(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateConnectionRequest>,
) -> ApiResult<(StatusCode, Json<EmailConnection>)> {
    req.validate()?;

    let data = CreateEmailConnection {
        user_id: principal.user_id,
        provider: req.provider,
        email_address: req.email_address,
        imap_server: req.imap_server,
        imap_password: req.imap_password,
    };
    let connection =
        email_connections::create_connection(state.store(), &state.catalog, &principal, data).await?;
    Ok((StatusCode::CREATED, Json(connection)))
}

pub async fn update_connection(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateConnectionRequest>,
) -> ApiResult<Json<EmailConnection>> {
    req.validate()?;

    let connection = email_connections::update_connection(state.store(), &principal, id, req.into()).await?;
    Ok(Json(connection))
}

pub async fn delete_connection(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    email_connections::delete_connection(state.store(), &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
