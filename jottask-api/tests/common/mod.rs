/// Common test utilities for integration tests
///
/// Builds the real router on top of the in-memory store, with a signed-up
/// user and a provider-style JWT for them.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use jottask_api::{
    app::{build_router, AppState},
    config::{ActionsConfig, ApiConfig, Config, DatabaseConfig, InternalConfig, JwtConfig},
};
use jottask_shared::{
    auth::jwt::{create_token, Claims},
    models::{
        plan::PlanCatalog,
        user::{CreateUser, User},
    },
    store::{memory::MemoryStore, Store},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";
pub const INTERNAL_KEY: &str = "internal-test-key-0001";

/// Test context containing the app and its backing store
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub user: User,
    pub jwt_token: String,
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: "postgresql://unused".to_string(),
            max_connections: 1,
            run_migrations: false,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        internal: InternalConfig {
            api_key: INTERNAL_KEY.to_string(),
        },
        actions: ActionsConfig { token_ttl_hours: 168 },
    }
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_catalog(PlanCatalog::builtin()).await
    }

    pub async fn with_catalog(catalog: PlanCatalog) -> Self {
        let store = Arc::new(MemoryStore::new());
        let app = build_router(AppState::new(store.clone(), catalog, test_config()));

        let user = store
            .create_user(CreateUser {
                id: Uuid::new_v4(),
                email: format!("test-{}@example.com", Uuid::new_v4().simple()),
                full_name: Some("Test User".to_string()),
                timezone: None,
            })
            .await
            .expect("create test user");
        let jwt_token = token_for(&user);

        Self {
            app,
            store,
            user,
            jwt_token,
        }
    }

    /// Creates another user sharing this app
    pub async fn other_user(&self) -> (User, String) {
        let user = self
            .store
            .create_user(CreateUser {
                id: Uuid::new_v4(),
                email: format!("other-{}@example.com", Uuid::new_v4().simple()),
                full_name: None,
                timezone: None,
            })
            .await
            .expect("create other user");
        let token = token_for(&user);
        (user, token)
    }

    /// Sends a request as the test user
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let bearer = format!("Bearer {}", self.jwt_token);
        self.send_with(method, uri, body, &[(header::AUTHORIZATION.as_str(), bearer.as_str())])
            .await
    }

    /// Sends a request with explicit headers
    pub async fn send_with(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }
}

pub fn token_for(user: &User) -> String {
    create_token(&Claims::new(user.id, user.email.clone()), JWT_SECRET).expect("sign test token")
}
