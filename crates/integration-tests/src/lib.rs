//! Integration tests for Warranty Tracker.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p warranty-integration-tests
//! ```
//!
//! No external services are needed: [`StubBackend`] serves the backend
//! endpoints from fixtures on an ephemeral local port.
//!
//! # Test Categories
//!
//! - `identity_persistence` - Account keys across store reopen and concurrency
//! - `backend_client` - HTTP client against the stub backend
//! - `status_scenarios` - Status classification over whole listings

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;
use warranty_app::config::ApiConfig;

/// Canned responses served by [`StubBackend`].
#[derive(Debug, Clone)]
pub struct Fixtures {
    /// Items returned under `warranties` by `GET /get_warranties`.
    pub warranties: Value,
    /// Whole body of `GET /get_recommendation`.
    pub recommendations: Value,
    /// Make `GET /get_warranties` answer 500.
    pub fail_warranties: bool,
}

impl Default for Fixtures {
    fn default() -> Self {
        Self {
            warranties: json!([]),
            recommendations: json!({ "message": "No user history found" }),
            fail_warranties: false,
        }
    }
}

#[derive(Debug, Default)]
struct Recorded {
    user_ids: Vec<String>,
    submissions: Vec<Value>,
}

#[derive(Debug)]
struct StubState {
    fixtures: Fixtures,
    recorded: Mutex<Recorded>,
}

impl StubState {
    fn record(&self, f: impl FnOnce(&mut Recorded)) {
        f(&mut self.recorded.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

/// In-process stand-in for the warranty backend.
///
/// The server runs until the stub is dropped.
#[derive(Debug)]
pub struct StubBackend {
    addr: SocketAddr,
    state: Arc<StubState>,
    task: JoinHandle<()>,
}

impl StubBackend {
    /// Bind to an ephemeral port on 127.0.0.1 and start serving `fixtures`.
    ///
    /// # Errors
    ///
    /// Returns error if the listener cannot be bound.
    pub async fn spawn(fixtures: Fixtures) -> std::io::Result<Self> {
        let state = Arc::new(StubState {
            fixtures,
            recorded: Mutex::new(Recorded::default()),
        });

        let router = Router::new()
            .route("/get_warranties", get(get_warranties))
            .route("/get_recommendation", get(get_recommendation))
            .route("/warranties", post(post_warranty))
            .route("/health", get(health))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self { addr, state, task })
    }

    /// Base URL of the running stub.
    ///
    /// # Errors
    ///
    /// Never fails for a bound socket address.
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("http://{}", self.addr))
    }

    /// Client configuration pointing at the stub.
    ///
    /// # Errors
    ///
    /// See [`Self::base_url`].
    pub fn api_config(&self) -> Result<ApiConfig, url::ParseError> {
        Ok(ApiConfig {
            base_url: self.base_url()?,
            timeout: Duration::from_secs(5),
        })
    }

    /// `user_id` query values seen so far, in arrival order.
    #[must_use]
    pub fn user_ids(&self) -> Vec<String> {
        self.state
            .recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .user_ids
            .clone()
    }

    /// Bodies posted to `/warranties` so far.
    #[must_use]
    pub fn submissions(&self) -> Vec<Value> {
        self.state
            .recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .submissions
            .clone()
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn user_id_required() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "user_id is required" })),
    )
        .into_response()
}

async fn get_warranties(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(user_id) = params.get("user_id") else {
        return user_id_required();
    };
    state.record(|r| r.user_ids.push(user_id.clone()));

    if state.fixtures.fail_warranties {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "dataset unavailable" })),
        )
            .into_response();
    }
    Json(json!({ "warranties": state.fixtures.warranties })).into_response()
}

async fn get_recommendation(
    State(state): State<Arc<StubState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(user_id) = params.get("user_id") else {
        return user_id_required();
    };
    state.record(|r| r.user_ids.push(user_id.clone()));
    Json(state.fixtures.recommendations.clone()).into_response()
}

async fn post_warranty(State(state): State<Arc<StubState>>, Json(body): Json<Value>) -> Response {
    state.record(|r| r.submissions.push(body));
    Json(json!({ "message": "Warranty saved successfully!" })).into_response()
}

async fn health() -> &'static str {
    "Backend is running!"
}
