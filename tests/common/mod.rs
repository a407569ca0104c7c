use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use refurb_ops::{
    app_router,
    config::AppConfig,
    db,
    entities::{user, UserRole},
    events::{self, EventSender},
    services::users::CreateUserInput,
    AppState,
};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const TEST_SECRET: &str =
    "kq3Zt9xW1pLmN4vB7cR2yH5sJ8dF0gA6eU-kq3Zt9xW1pLmN4vB7cR2yH5sJ8dF0gA6eU";
pub const TEST_PASSWORD: &str = "bench-password-1";

/// Application over a fresh in-memory database with uploads in a temp dir.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _uploads: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let uploads = TempDir::new().expect("temp uploads dir");
        let mut cfg = AppConfig::new("sqlite::memory:", TEST_SECRET, "test");
        cfg.uploads_dir = uploads.path().to_path_buf();
        cfg.max_upload_bytes = 64 * 1024;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let state = AppState::new(Arc::new(pool), cfg, Arc::new(EventSender::new(event_tx)));

        Self {
            router: app_router(state.clone()),
            state,
            _uploads: uploads,
            _event_task: event_task,
        }
    }

    /// Creates an active user with the role and returns it with a bearer token.
    pub async fn user_with_role(&self, role: UserRole) -> (user::Model, String) {
        let email = format!(
            "{}-{}@refurb.test",
            role.as_str().to_ascii_lowercase(),
            uuid::Uuid::new_v4().simple()
        );
        let created = self
            .state
            .services
            .users
            .create_user(CreateUserInput {
                email,
                name: format!("{} bench", role),
                password: TEST_PASSWORD.to_string(),
                role,
            })
            .await
            .expect("create test user");
        let token = self
            .state
            .auth
            .generate_token(&created)
            .expect("issue test token");
        (created, token.access_token)
    }

    pub async fn token_for(&self, role: UserRole) -> String {
        self.user_with_role(role).await.1
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

pub async fn response_bytes(response: Response) -> Vec<u8> {
    body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes")
        .to_vec()
}

pub async fn response_json(response: Response) -> Value {
    let bytes = response_bytes(response).await;
    serde_json::from_slice(&bytes).expect("json response")
}

/// `data` out of the standard success envelope.
pub async fn data(response: Response) -> Value {
    let mut json = response_json(response).await;
    assert_eq!(json["success"], true, "unexpected envelope: {json}");
    json["data"].take()
}
