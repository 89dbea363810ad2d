#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};
use tb_telemetry_export::console::LineConsole;
use tokio::net::TcpListener;

pub const USERNAME: &str = "tenant@thingsboard.org";
pub const PASSWORD: &str = "tenant";
pub const TOKEN: &str = "test-token";

#[derive(Debug, Clone, PartialEq)]
pub struct TimeseriesRequest {
    pub entity_type: String,
    pub entity_id: String,
    pub keys: String,
    pub start_ts: i64,
    pub end_ts: i64,
    pub limit: u64,
}

/// Canned platform data plus a record of every call the client made.
#[derive(Debug, Default)]
pub struct MockState {
    pub devices: Vec<Value>,
    pub keys: Vec<String>,
    pub timeseries_bodies: VecDeque<(StatusCode, String)>,
    pub logins: Vec<String>,
    pub logouts: usize,
    pub device_page_requests: Vec<(u32, u32)>,
    pub key_requests: Vec<(String, String)>,
    pub timeseries_requests: Vec<TimeseriesRequest>,
}

impl MockState {
    pub fn with_devices(mut self, devices: &[(&str, &str)]) -> Self {
        self.devices = devices.iter().map(|(name, id)| device_json(name, id)).collect();
        self
    }

    pub fn with_keys(mut self, keys: &[&str]) -> Self {
        self.keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_timeseries(mut self, body: &str) -> Self {
        self.timeseries_bodies.push_back((StatusCode::OK, body.to_string()));
        self
    }

    pub fn with_timeseries_failure(mut self, status: StatusCode, body: &str) -> Self {
        self.timeseries_bodies.push_back((status, body.to_string()));
        self
    }
}

pub fn device_json(name: &str, id: &str) -> Value {
    json!({
        "id": {"id": id, "entityType": "DEVICE"},
        "createdTime": 1_700_000_000_000_i64,
        "name": name,
        "type": "default",
        "label": null,
        "active": true
    })
}

type Shared = Arc<Mutex<MockState>>;

pub struct MockPlatform {
    pub base_url: String,
    state: Shared,
}

impl MockPlatform {
    pub async fn start(state: MockState) -> Self {
        let state = Arc::new(Mutex::new(state));

        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/logout", post(logout))
            .route("/api/tenant/deviceInfos", get(device_infos))
            .route("/api/plugins/telemetry/:entity_type/:entity_id/keys/timeseries", get(timeseries_keys))
            .route("/api/plugins/telemetry/:entity_type/:entity_id/values/timeseries", get(timeseries_values))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

/// Console fed from a fixed script of answers, capturing everything printed.
pub fn scripted_console(answers: &[&str]) -> LineConsole<Cursor<Vec<u8>>, Vec<u8>> {
    let mut input = answers.join("\n");
    input.push('\n');
    LineConsole::new(Cursor::new(input.into_bytes()), Vec::new())
}

fn authorized(headers: &HeaderMap) -> bool {
    let expected = format!("Bearer {}", TOKEN);
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(expected.as_str())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"status": 401, "message": "Authentication failed", "errorCode": 10})),
    )
        .into_response()
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

async fn login(State(state): State<Shared>, Json(body): Json<LoginBody>) -> Response {
    state.lock().unwrap().logins.push(body.username.clone());
    if body.username == USERNAME && body.password == PASSWORD {
        Json(json!({"token": TOKEN, "refreshToken": "refresh-token"})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status": 401, "message": "Invalid username or password", "errorCode": 10})),
        )
            .into_response()
    }
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    state.lock().unwrap().logouts += 1;
    StatusCode::OK.into_response()
}

#[derive(Deserialize)]
struct PageQuery {
    #[serde(rename = "pageSize")]
    page_size: u32,
    page: u32,
}

async fn device_infos(State(state): State<Shared>, headers: HeaderMap, Query(query): Query<PageQuery>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let mut state = state.lock().unwrap();
    state.device_page_requests.push((query.page_size, query.page));

    let page_size = query.page_size.max(1) as usize;
    let start = query.page as usize * page_size;
    let data: Vec<Value> = state.devices.iter().skip(start).take(page_size).cloned().collect();
    let total = state.devices.len();

    Json(json!({
        "data": data,
        "totalPages": total.div_ceil(page_size),
        "totalElements": total,
        "hasNext": start + data.len() < total
    }))
    .into_response()
}

async fn timeseries_keys(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let mut state = state.lock().unwrap();
    state.key_requests.push((entity_type, entity_id));
    Json(state.keys.clone()).into_response()
}

#[derive(Deserialize)]
struct TimeseriesQuery {
    keys: String,
    #[serde(rename = "startTs")]
    start_ts: i64,
    #[serde(rename = "endTs")]
    end_ts: i64,
    limit: u64,
}

async fn timeseries_values(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((entity_type, entity_id)): Path<(String, String)>,
    Query(query): Query<TimeseriesQuery>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let mut state = state.lock().unwrap();
    state.timeseries_requests.push(TimeseriesRequest {
        entity_type,
        entity_id,
        keys: query.keys,
        start_ts: query.start_ts,
        end_ts: query.end_ts,
        limit: query.limit,
    });

    let (status, body) = state
        .timeseries_bodies
        .pop_front()
        .unwrap_or((StatusCode::OK, "{}".to_string()));
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}
