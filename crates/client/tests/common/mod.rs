//! In-process mock of the overlay backend.
//!
//! Serves the same JSON contract as the real API from an axum router bound
//! to an ephemeral port. Switches on [`MockState`] simulate backend
//! failures and expired tokens; counters record what the client sent.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use overlay_client::session::SessionContext;
use overlay_client::{ApiClient, ClientConfig};

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "correct-horse";
pub const TOKEN: &str = "token-alice";

type MockResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

#[derive(Debug, Default)]
pub struct Inner {
    pub overlays: Vec<Value>,
    pub next_id: i64,
    pub settings: Option<Value>,
    pub running: Vec<i64>,
    /// Require `Authorization: Bearer TOKEN` on every non-auth route.
    pub require_auth: bool,
    /// Answer 500 to overlay writes (POST/PUT/DELETE).
    pub fail_writes: bool,
    /// Answer 500 to every GET.
    pub fail_reads: bool,
    pub list_calls: usize,
    pub create_calls: usize,
    pub update_calls: usize,
    pub delete_calls: usize,
    pub last_update_body: Option<Value>,
    /// Hold the response to any PUT whose `content` equals the string.
    pub slow_update: Option<(String, Duration)>,
    /// Hold `GET /stream/settings` responses. The row is read before waiting.
    pub slow_settings_read: Option<Duration>,
    pub request_ids: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub inner: Mutex<Inner>,
}

impl MockState {
    pub fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        f(&mut self.inner.lock().unwrap())
    }
}

pub struct MockBackend {
    pub api_base: String,
    pub state: Arc<MockState>,
}

impl MockBackend {
    /// Bind to `127.0.0.1:0` and serve until the test runtime shuts down.
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        state.with(|inner| inner.next_id = 1);

        let app = Router::new()
            .nest("/api", api_routes())
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            api_base: format!("http://{addr}/api"),
            state,
        }
    }

    /// Seed an overlay directly into backend storage and return it.
    pub fn seed_overlay(&self, kind: &str, content: &str) -> Value {
        self.state.with(|inner| {
            let overlay = json!({
                "id": inner.next_id,
                "overlay_type": kind,
                "content": content,
                "position_x": 0.0,
                "position_y": 0.0,
                "width": 100.0,
                "height": 50.0,
                "created_at": "2024-05-01T12:00:00.000000",
                "updated_at": "2024-05-01T12:00:00.000000",
            });
            inner.next_id += 1;
            inner.overlays.push(overlay.clone());
            overlay
        })
    }

    pub fn seed_settings(&self, id: i64, rtsp_url: &str) {
        self.state.with(|inner| {
            inner.settings = Some(json!({
                "id": id,
                "rtsp_url": rtsp_url,
                "created_at": "2024-05-01T12:00:00",
                "updated_at": "2024-05-01T12:00:00",
            }));
        });
    }

    /// A client with an in-memory session pointed at this backend.
    pub fn client(&self) -> Arc<ApiClient> {
        self.client_with_session(Arc::new(SessionContext::in_memory()))
    }

    pub fn client_with_session(&self, session: Arc<SessionContext>) -> Arc<ApiClient> {
        let config = ClientConfig {
            api_base_url: self.api_base.clone(),
            request_timeout_secs: 5,
            ..ClientConfig::default()
        };
        Arc::new(ApiClient::new(&config, session).unwrap())
    }
}

fn api_routes() -> Router<Arc<MockState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/stream/settings", get(get_settings).post(set_settings))
        .route("/stream/status/{id}", get(stream_status))
        .route("/stream/stop/{id}", post(stop_stream))
        .route("/overlays", get(list_overlays).post(create_overlay))
        .route(
            "/overlays/{id}",
            get(get_overlay).put(update_overlay).delete(delete_overlay),
        )
}

fn error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}

fn check(state: &MockState, headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    state.with(|inner| {
        if let Some(id) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
            inner.request_ids.push(id.to_string());
        }
        if !inner.require_auth {
            return Ok(());
        }
        let expected = format!("Bearer {TOKEN}");
        match headers.get("authorization").and_then(|v| v.to_str().ok()) {
            Some(value) if value == expected => Ok(()),
            _ => Err(error(StatusCode::UNAUTHORIZED, "Token expired")),
        }
    })
}

fn user() -> Value {
    json!({ "id": 1, "username": USERNAME, "email": "alice@example.com" })
}

async fn login(Json(body): Json<Value>) -> MockResult {
    if body["username"] == USERNAME && body["password"] == PASSWORD {
        Ok(Json(json!({ "token": TOKEN, "user": user() })))
    } else {
        Err(error(StatusCode::UNAUTHORIZED, "Invalid credentials"))
    }
}

async fn register(Json(body): Json<Value>) -> MockResult {
    if body["username"] == USERNAME {
        return Err(error(StatusCode::CONFLICT, "Username already taken"));
    }
    Ok(Json(json!({
        "token": format!("token-{}", body["username"].as_str().unwrap_or_default()),
        "user": { "id": 2, "username": body["username"], "email": body["email"] },
    })))
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> MockResult {
    check(&state, &headers)?;
    Ok(Json(user()))
}

async fn get_settings(State(state): State<Arc<MockState>>, headers: HeaderMap) -> MockResult {
    check(&state, &headers)?;
    let (result, delay) = state.with(|inner| {
        let result = if inner.fail_reads {
            Err(error(StatusCode::INTERNAL_SERVER_ERROR, "read failed"))
        } else {
            Ok(Json(
                inner
                    .settings
                    .clone()
                    .unwrap_or_else(|| json!({ "rtsp_url": "" })),
            ))
        };
        (result, inner.slow_settings_read)
    });
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    result
}

async fn set_settings(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> MockResult {
    check(&state, &headers)?;
    state.with(|inner| {
        let id = inner
            .settings
            .as_ref()
            .and_then(|s| s["id"].as_i64())
            .unwrap_or(1);
        let settings = json!({
            "id": id,
            "rtsp_url": body["rtsp_url"],
            "created_at": "2024-05-01T12:00:00",
            "updated_at": "2024-05-02T08:00:00",
        });
        inner.settings = Some(settings.clone());
        Ok(Json(settings))
    })
}

async fn stream_status(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> MockResult {
    check(&state, &headers)?;
    state.with(|inner| {
        if inner.running.contains(&id) {
            Ok(Json(json!({ "running": true, "started_at": 1714564800.5 })))
        } else {
            Ok(Json(json!({ "running": false })))
        }
    })
}

async fn stop_stream(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> MockResult {
    check(&state, &headers)?;
    state.with(|inner| inner.running.retain(|r| *r != id));
    Ok(Json(json!({ "message": "Stream stopped" })))
}

async fn list_overlays(State(state): State<Arc<MockState>>, headers: HeaderMap) -> MockResult {
    check(&state, &headers)?;
    state.with(|inner| {
        inner.list_calls += 1;
        if inner.fail_reads {
            return Err(error(StatusCode::INTERNAL_SERVER_ERROR, "read failed"));
        }
        Ok(Json(Value::Array(inner.overlays.clone())))
    })
}

async fn get_overlay(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> MockResult {
    check(&state, &headers)?;
    state.with(|inner| {
        inner
            .overlays
            .iter()
            .find(|o| o["id"] == id)
            .cloned()
            .map(Json)
            .ok_or_else(|| error(StatusCode::NOT_FOUND, "Overlay not found"))
    })
}

async fn create_overlay(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    check(&state, &headers)?;
    state.with(|inner| {
        inner.create_calls += 1;
        if inner.fail_writes {
            return Err(error(StatusCode::INTERNAL_SERVER_ERROR, "write failed"));
        }
        let overlay = json!({
            "id": inner.next_id,
            "overlay_type": body["overlay_type"],
            "content": body["content"],
            "position_x": body["position_x"],
            "position_y": body["position_y"],
            "width": body["width"],
            "height": body["height"],
            "created_at": "2024-05-01T12:00:00.000000",
            "updated_at": "2024-05-01T12:00:00.000000",
        });
        inner.next_id += 1;
        inner.overlays.push(overlay.clone());
        Ok((StatusCode::CREATED, Json(overlay)))
    })
}

async fn update_overlay(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> MockResult {
    check(&state, &headers)?;
    let (result, delay) = state.with(|inner| {
        inner.update_calls += 1;
        inner.last_update_body = Some(body.clone());
        let delay = inner
            .slow_update
            .as_ref()
            .filter(|(content, _)| body["content"] == content.as_str())
            .map(|(_, delay)| *delay);
        (apply_update(inner, id, &body), delay)
    });
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    result
}

fn apply_update(inner: &mut Inner, id: i64, body: &Value) -> MockResult {
    if inner.fail_writes {
        return Err(error(StatusCode::INTERNAL_SERVER_ERROR, "write failed"));
    }
    let overlay = inner
        .overlays
        .iter_mut()
        .find(|o| o["id"] == id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "Overlay not found"))?;
    for field in ["overlay_type", "content", "position_x", "position_y", "width", "height"] {
        if !body[field].is_null() {
            overlay[field] = body[field].clone();
        }
    }
    overlay["updated_at"] = json!("2024-05-02T09:30:00.000000");
    Ok(Json(overlay.clone()))
}

async fn delete_overlay(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> MockResult {
    check(&state, &headers)?;
    state.with(|inner| {
        inner.delete_calls += 1;
        if inner.fail_writes {
            return Err(error(StatusCode::INTERNAL_SERVER_ERROR, "write failed"));
        }
        let before = inner.overlays.len();
        inner.overlays.retain(|o| o["id"] != id);
        if inner.overlays.len() == before {
            return Err(error(StatusCode::NOT_FOUND, "Overlay not found"));
        }
        Ok(Json(json!({ "message": "Overlay deleted successfully" })))
    })
}
