/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use jottask_api::{app::{build_router, AppState}, config::Config};
/// use jottask_shared::models::plan::PlanCatalog;
/// use jottask_shared::store::memory::MemoryStore;
/// use std::sync::Arc;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), PlanCatalog::builtin(), config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{
        auth::{internal_key_layer, jwt_auth_layer},
        security::SecurityHeadersLayer,
    },
};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use jottask_shared::{models::plan::PlanCatalog, store::Store};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend
    pub store: Arc<dyn Store>,

    /// Subscription plans, loaded once at startup
    pub catalog: Arc<PlanCatalog>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, catalog: PlanCatalog, config: Config) -> Self {
        Self {
            store,
            catalog: Arc::new(catalog),
            config: Arc::new(config),
        }
    }

    /// Secret for validating provider JWTs
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Storage backend as a trait object
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health                              public
/// └── /v1/
///     ├── GET  /plans                          public
///     ├── GET  /actions/:token                 public, bearer of the link
///     ├── /me                                  JWT
///     │   ├── GET|PATCH /
///     │   └── GET /quota
///     ├── /tasks                               JWT
///     │   ├── GET|POST /
///     │   ├── GET|PATCH|DELETE /:id
///     │   ├── POST /:id/complete, /:id/reopen, /:id/reschedule
///     │   ├── GET|POST /:id/notes
///     │   ├── GET|POST /:id/checklist
///     │   └── PATCH /:id/checklist/:item_id
///     ├── /email-connections                   JWT
///     │   ├── GET|POST /
///     │   └── PATCH|DELETE /:id
///     └── /internal                            X-Internal-Key
///         ├── POST /users
///         └── POST /action-tokens
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_routes = Router::new()
        .route("/plans", get(routes::plans::list_plans))
        .route("/actions/:token", get(routes::actions::redeem_action));

    let user_routes = Router::new()
        .route(
            "/me",
            get(routes::profile::get_me).patch(routes::profile::update_me),
        )
        .route("/me/quota", get(routes::profile::get_quota))
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/tasks/:id/complete", post(routes::tasks::complete_task))
        .route("/tasks/:id/reopen", post(routes::tasks::reopen_task))
        .route("/tasks/:id/reschedule", post(routes::tasks::reschedule_task))
        .route(
            "/tasks/:id/notes",
            get(routes::notes::list_notes).post(routes::notes::create_note),
        )
        .route(
            "/tasks/:id/checklist",
            get(routes::checklist::list_items).post(routes::checklist::create_item),
        )
        .route(
            "/tasks/:id/checklist/:item_id",
            patch(routes::checklist::update_item),
        )
        .route(
            "/email-connections",
            get(routes::email_connections::list_connections)
                .post(routes::email_connections::create_connection),
        )
        .route(
            "/email-connections/:id",
            patch(routes::email_connections::update_connection)
                .delete(routes::email_connections::delete_connection),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let internal_routes = Router::new()
        .route("/users", post(routes::internal::create_user))
        .route("/action-tokens", post(routes::internal::issue_action_token))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            internal_key_layer,
        ));

    let v1_routes = Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .nest("/internal", internal_routes);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Permissive CORS when `*` is configured, an allow-list otherwise
fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(crate::middleware::auth::INTERNAL_KEY_HEADER),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
