use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::{OriginalUri, Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// The single account the server knows about.
pub const USER_EMAIL: &str = "dev@example.com";
pub const USER_PASSWORD: &str = "correct-horse";
pub const USER_UID: &str = "blt0000user";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub user: LoginUser,
}

#[derive(Deserialize)]
pub struct LoginUser {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub tfa_token: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionUser {
    pub uid: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authtoken: Option<String>,
}

#[derive(Deserialize)]
pub struct ContentTypeEnvelope {
    pub content_type: Value,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    pub include_count: Option<bool>,
}

#[derive(Deserialize)]
pub struct SlowQuery {
    #[serde(default)]
    pub ms: u64,
}

#[derive(Deserialize)]
pub struct FlakyQuery {
    #[serde(default)]
    pub failures: u32,
}

#[derive(Default)]
pub struct AppState {
    sessions: RwLock<HashMap<String, String>>,
    content_types: RwLock<HashMap<(String, String), Value>>,
    attempts: Mutex<HashMap<String, u32>>,
}

pub type Db = Arc<AppState>;

pub fn app() -> Router {
    let db: Db = Arc::new(AppState::default());
    let api = Router::new()
        .route("/user-session", post(login).delete(logout))
        .route("/user", get(current_user))
        .route("/content_types", get(list_content_types).post(create_content_type))
        .route(
            "/content_types/{uid}",
            get(get_content_type).put(update_content_type).delete(delete_content_type),
        )
        .route("/bulk/publish", post(bulk_publish))
        .route("/flaky/{key}", get(flaky))
        .route("/not-modified", get(not_modified))
        .route("/redirect", get(redirect))
        .route("/slow", get(slow))
        .route("/echo", any(echo));
    Router::new().nest("/v3", api).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Error body in the management API's shape.
pub fn api_error(status: StatusCode, code: i64, message: impl Into<String>, errors: Option<Value>) -> Response {
    let mut body = json!({ "error_message": message.into(), "error_code": code });
    if let Some(errors) = errors {
        body["errors"] = errors;
    }
    (status, Json(body)).into_response()
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn not_logged_in() -> Response {
    api_error(
        StatusCode::UNAUTHORIZED,
        105,
        "You're not allowed in here unless you're logged in.",
        None,
    )
}

async fn session_email(db: &Db, headers: &HeaderMap) -> Option<String> {
    let token = header(headers, "authtoken")?;
    db.sessions.read().await.get(token).cloned()
}

/// Stack calls need an `api_key` and either a live session or a management token.
async fn stack_key(db: &Db, headers: &HeaderMap) -> Result<String, Response> {
    let Some(api_key) = header(headers, "api_key").filter(|key| !key.is_empty()) else {
        return Err(api_error(
            StatusCode::PRECONDITION_FAILED,
            109,
            "The api_key header is required.",
            Some(json!({ "api_key": ["is required."] })),
        ));
    };
    let has_token = header(headers, "authorization").is_some_and(|token| !token.is_empty());
    if !has_token && session_email(db, headers).await.is_none() {
        return Err(not_logged_in());
    }
    Ok(api_key.to_string())
}

async fn login(State(db): State<Db>, Json(input): Json<LoginRequest>) -> Response {
    if input.user.email != USER_EMAIL || input.user.password != USER_PASSWORD {
        return api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            104,
            "Looks like your email or password is invalid. Please try again or reset your password.",
            Some(json!({ "error": ["Looks like your email or password is invalid."] })),
        );
    }
    if input.user.tfa_token.as_deref() == Some("") {
        return api_error(StatusCode::UNPROCESSABLE_ENTITY, 294, "Invalid two-factor token.", None);
    }

    let token = Uuid::new_v4().to_string();
    db.sessions.write().await.insert(token.clone(), input.user.email.clone());
    tracing::info!(email = %input.user.email, "session opened");
    let user = SessionUser {
        uid: USER_UID.to_string(),
        email: input.user.email,
        authtoken: Some(token),
    };
    Json(json!({ "notice": "Login Successful.", "user": user })).into_response()
}

async fn logout(State(db): State<Db>, headers: HeaderMap) -> Response {
    let Some(token) = header(&headers, "authtoken") else {
        return not_logged_in();
    };
    if db.sessions.write().await.remove(token).is_none() {
        return not_logged_in();
    }
    tracing::info!("session closed");
    Json(json!({ "notice": "You've logged out successfully." })).into_response()
}

async fn current_user(State(db): State<Db>, headers: HeaderMap) -> Response {
    match session_email(&db, &headers).await {
        Some(email) => {
            let user = SessionUser {
                uid: USER_UID.to_string(),
                email,
                authtoken: None,
            };
            Json(json!({ "user": user })).into_response()
        }
        None => not_logged_in(),
    }
}

fn content_type_not_found(uid: &str) -> Response {
    api_error(
        StatusCode::NOT_FOUND,
        118,
        format!("The Content Type '{uid}' was not found. Please try again."),
        None,
    )
}

async fn list_content_types(State(db): State<Db>, headers: HeaderMap, Query(query): Query<ListQuery>) -> Response {
    let api_key = match stack_key(&db, &headers).await {
        Ok(key) => key,
        Err(response) => return response,
    };
    let store = db.content_types.read().await;
    let mut all: Vec<&Value> = store
        .iter()
        .filter(|((key, _), _)| *key == api_key)
        .map(|(_, value)| value)
        .collect();
    all.sort_by_key(|value| value["uid"].as_str().unwrap_or_default().to_string());

    let page: Vec<&Value> = all
        .iter()
        .skip(query.skip.unwrap_or(0))
        .take(query.limit.unwrap_or(100))
        .copied()
        .collect();
    let mut body = json!({ "content_types": page });
    if query.include_count.unwrap_or(false) {
        body["count"] = json!(all.len());
    }
    Json(body).into_response()
}

async fn create_content_type(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<ContentTypeEnvelope>,
) -> Response {
    let api_key = match stack_key(&db, &headers).await {
        Ok(key) => key,
        Err(response) => return response,
    };
    let Some(uid) = input.content_type["uid"].as_str().filter(|uid| !uid.is_empty()) else {
        return api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            115,
            "Content Type creation failed. Please try again.",
            Some(json!({ "uid": ["is required."] })),
        );
    };

    let mut store = db.content_types.write().await;
    let key = (api_key, uid.to_string());
    if store.contains_key(&key) {
        return api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            115,
            "Content Type creation failed. Please try again.",
            Some(json!({ "uid": ["is not unique."] })),
        );
    }
    store.insert(key, input.content_type.clone());
    (
        StatusCode::CREATED,
        Json(json!({
            "notice": "Content Type created successfully.",
            "content_type": input.content_type,
        })),
    )
        .into_response()
}

async fn get_content_type(State(db): State<Db>, headers: HeaderMap, Path(uid): Path<String>) -> Response {
    let api_key = match stack_key(&db, &headers).await {
        Ok(key) => key,
        Err(response) => return response,
    };
    match db.content_types.read().await.get(&(api_key, uid.clone())) {
        Some(content_type) => Json(json!({ "content_type": content_type })).into_response(),
        None => content_type_not_found(&uid),
    }
}

async fn update_content_type(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(uid): Path<String>,
    Json(input): Json<ContentTypeEnvelope>,
) -> Response {
    let api_key = match stack_key(&db, &headers).await {
        Ok(key) => key,
        Err(response) => return response,
    };
    let mut store = db.content_types.write().await;
    let Some(existing) = store.get_mut(&(api_key, uid.clone())) else {
        return content_type_not_found(&uid);
    };
    if let (Some(target), Some(changes)) = (existing.as_object_mut(), input.content_type.as_object()) {
        for (field, value) in changes {
            if field != "uid" {
                target.insert(field.clone(), value.clone());
            }
        }
    }
    Json(json!({
        "notice": "Content Type updated successfully.",
        "content_type": existing.clone(),
    }))
    .into_response()
}

async fn delete_content_type(State(db): State<Db>, headers: HeaderMap, Path(uid): Path<String>) -> Response {
    let api_key = match stack_key(&db, &headers).await {
        Ok(key) => key,
        Err(response) => return response,
    };
    match db.content_types.write().await.remove(&(api_key, uid.clone())) {
        Some(_) => Json(json!({ "notice": "Content Type deleted successfully." })).into_response(),
        None => content_type_not_found(&uid),
    }
}

async fn bulk_publish(State(db): State<Db>, headers: HeaderMap, Json(details): Json<Value>) -> Response {
    if let Err(response) = stack_key(&db, &headers).await {
        return response;
    }
    let missing = |field: &str| details[field].as_array().map_or(true, |list| list.is_empty());
    if missing("environments") || missing("locales") {
        return api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            141,
            "Bulk publish failed. Environments and locales are required.",
            None,
        );
    }
    Json(json!({
        "notice": "Your bulk publish request is in progress. Please check publish queue for more details.",
        "job_id": Uuid::new_v4().to_string(),
        "api_version": header(&headers, "api_version"),
    }))
    .into_response()
}

/// Fails with 503 for the first `failures` calls per key, then succeeds.
async fn flaky(State(db): State<Db>, Path(key): Path<String>, Query(query): Query<FlakyQuery>) -> Response {
    let attempt = {
        let Ok(mut attempts) = db.attempts.lock() else {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };
        let counter = attempts.entry(key).or_insert(0);
        *counter += 1;
        *counter
    };
    if attempt <= query.failures {
        return api_error(StatusCode::SERVICE_UNAVAILABLE, 503, "Service temporarily unavailable.", None);
    }
    Json(json!({ "attempts": attempt })).into_response()
}

async fn not_modified() -> StatusCode {
    StatusCode::NOT_MODIFIED
}

async fn redirect() -> Response {
    (StatusCode::FOUND, [(axum::http::header::LOCATION, "/v3/echo")]).into_response()
}

/// Answers after `ms` milliseconds.
async fn slow(Query(query): Query<SlowQuery>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(query.ms)).await;
    Json(json!({ "slept_ms": query.ms }))
}

/// Reflects the request back so clients can inspect exactly what they sent.
async fn echo(method: Method, OriginalUri(uri): OriginalUri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let headers: serde_json::Map<String, Value> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                Value::String(value.to_str().unwrap_or_default().to_string()),
            )
        })
        .collect();
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "headers": headers,
        "body": body,
    }))
}
