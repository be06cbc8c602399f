#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};

use cozylms_client::storage::MemorySnapshotStorage;
use cozylms_client::{App, ClientConfig};

/// One request as the mock backend saw it, with the path stripped of the
/// `/api` prefix so assertions read like the client calls.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Value,
    pub cookie: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Default)]
pub struct MockState {
    requests: Mutex<Vec<RecordedRequest>>,
    routes: Mutex<HashMap<String, Value>>,
}

/// In-process stand-in for the CozyLMS backend. Every route is canned: tests
/// stub the responses they need and unstubbed paths answer 404 with the usual
/// failure envelope.
pub struct MockApi {
    pub addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockApi {
    pub async fn spawn() -> Self {
        // Initialize tracing for tests
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();

        let state = Arc::new(MockState::default());
        let app = Router::new().fallback(handle_any).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock listener");
        let addr = listener.local_addr().expect("Failed to read mock address");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock API server stopped");
        });

        MockApi { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Cans a 200 response for `METHOD path`, where `path` is relative to the
    /// `/api` prefix. Stubbing the same route again replaces the body.
    pub fn stub(&self, method: &str, path: &str, body: Value) {
        self.state
            .routes
            .lock()
            .unwrap()
            .insert(format!("{} {}", method, path), body);
    }

    /// Cans a response with an explicit status code.
    pub fn stub_status(&self, method: &str, path: &str, status: u16, body: Value) {
        self.stub(method, path, json!({ "__status": status, "__body": body }));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn clear_requests(&self) {
        self.state.requests.lock().unwrap().clear();
    }
}

async fn handle_any(State(state): State<Arc<MockState>>, req: Request) -> Response {
    let method = req.method().to_string();
    let raw_path = req.uri().path().to_string();
    let path = raw_path
        .strip_prefix("/api")
        .unwrap_or(&raw_path)
        .to_string();
    let cookie = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let bytes = to_bytes(req.into_body(), usize::MAX).await.unwrap_or_default();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        body,
        cookie,
        content_type,
    });

    let key = format!("{} {}", method, path);
    let canned = state.routes.lock().unwrap().get(&key).cloned();
    let Some(canned) = canned else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "Not found" })),
        )
            .into_response();
    };

    let (status, body) = match (canned.get("__status"), canned.get("__body")) {
        (Some(status), Some(body)) => (
            StatusCode::from_u16(status.as_u64().unwrap_or(200) as u16)
                .unwrap_or(StatusCode::OK),
            body.clone(),
        ),
        _ => (StatusCode::OK, canned),
    };

    let mut response = (status, Json(body)).into_response();
    // Sign-in routes hand out the session cookie the way the real backend does.
    if key == "POST /auth/login" || key == "POST /auth/register" {
        response.headers_mut().insert(
            header::SET_COOKIE,
            HeaderValue::from_static("token=mock-session; Path=/; HttpOnly"),
        );
    }
    response
}

pub fn sample_user(id: &str, verified: bool) -> Value {
    json!({
        "_id": id,
        "name": "Test User",
        "email": format!("{}@example.com", id),
        "role": "STUDENT",
        "IsAccVerified": verified,
        "xp": 100,
        "league": "BRONZE",
        "streak": 1,
        "premium": false
    })
}

pub fn admin_user(id: &str) -> Value {
    json!({
        "_id": id,
        "name": "Admin User",
        "email": format!("{}@example.com", id),
        "role": "ADMIN",
        "IsAccVerified": true,
        "xp": 5000,
        "league": "DIAMOND",
        "streak": 40,
        "premium": true
    })
}

/// Builds an app against the mock with in-memory snapshot storage. The
/// storage handle is returned so tests can inspect what got cached.
pub fn test_app(mock: &MockApi) -> (App, Arc<MemorySnapshotStorage>) {
    let storage = Arc::new(MemorySnapshotStorage::new());
    let config = ClientConfig::new(mock.base_url(), std::env::temp_dir());
    let app = App::with_storage(config, storage.clone()).expect("Failed to build app");
    (app, storage)
}

pub async fn sign_in(app: &App, mock: &MockApi, user: Value) {
    mock.stub("POST", "/auth/login", json!({ "success": true, "user": user }));
    app.auth
        .login("test@example.com", "Password123!")
        .await
        .expect("Login against the mock failed");
}

/// An address nothing listens on, for exercising offline behavior. Binding
/// and dropping a listener reserves a port the OS will refuse connections to.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind throwaway listener");
    let addr = listener.local_addr().expect("Failed to read throwaway address");
    drop(listener);
    format!("http://{}/api", addr)
}
