//! REST API Server for the trading coach
//!
//! Exposes chat sessions over HTTP. Each session owns its conversation and
//! is locked for the duration of a turn, so turns on one session never
//! interleave while separate sessions proceed independently.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::conversational::{ChatSession, TradingMate};
use crate::error::TradingMateError;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            hint: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            hint: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn from_error(err: &TradingMateError) -> Self {
        let mut response = Self::error(err.to_string());
        response.hint = err.user_hint().map(str::to_string);
        response
    }
}

fn status_for(err: &TradingMateError) -> StatusCode {
    match err {
        TradingMateError::CascadeExhausted { .. } => StatusCode::BAD_GATEWAY,
        TradingMateError::EmptyInput | TradingMateError::InvalidMessage(_) => {
            StatusCode::BAD_REQUEST
        }
        TradingMateError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// =============================
/// API State
/// =============================

type SessionMap = HashMap<Uuid, Arc<Mutex<ChatSession>>>;

#[derive(Clone)]
pub struct ApiState {
    pub mate: Arc<TradingMate>,
    sessions: Arc<RwLock<SessionMap>>,
}

impl ApiState {
    pub fn new(mate: Arc<TradingMate>) -> Self {
        Self {
            mate,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn get_or_create(&self, session_id: Uuid) -> Arc<Mutex<ChatSession>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(&session_id) {
                return session.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(self.mate.start_session_with_id(session_id))))
            .clone()
    }

    async fn get(&self, session_id: Uuid) -> Option<Arc<Mutex<ChatSession>>> {
        self.sessions.read().await.get(&session_id).cloned()
    }
}

/// =============================
/// Helpers — Session Ids
/// =============================

fn stable_uuid_from_string(input: &str) -> Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

fn parse_or_stable_uuid(value: &str) -> Uuid {
    Uuid::parse_str(value).unwrap_or_else(|_| stable_uuid_from_string(value))
}

/// =============================
/// Handlers
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn create_session(State(state): State<ApiState>) -> (StatusCode, Json<ApiResponse>) {
    let session_id = Uuid::new_v4();
    state.get_or_create(session_id).await;
    info!(%session_id, "Session created");

    (
        StatusCode::CREATED,
        Json(ApiResponse::success(serde_json::json!({ "session_id": session_id }))),
    )
}

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    // Rejected before a session is allocated for it
    if req.message.trim().is_empty() {
        let err = TradingMateError::EmptyInput;
        return (status_for(&err), Json(ApiResponse::from_error(&err)));
    }

    let session_id = match req.session_id.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => parse_or_stable_uuid(value),
        _ => Uuid::new_v4(),
    };

    let session = state.get_or_create(session_id).await;
    let mut session = session.lock().await;

    match state.mate.handle_turn(&mut session, &req.message).await {
        Ok(reply) => {
            let mut data = serde_json::to_value(&reply).unwrap_or_default();
            data["session_id"] = serde_json::json!(session_id);
            (StatusCode::OK, Json(ApiResponse::success(data)))
        }
        Err(e) => {
            warn!(%session_id, "Chat turn failed: {}", e);
            let mut response = ApiResponse::from_error(&e);
            response.data = Some(serde_json::json!({ "session_id": session_id }));
            (status_for(&e), Json(response))
        }
    }
}

async fn session_messages(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let session_id = parse_or_stable_uuid(&session_id);

    match state.get(session_id).await {
        Some(session) => {
            let history = session.lock().await.history();
            (
                StatusCode::OK,
                Json(ApiResponse::success(serde_json::json!({
                    "session_id": session_id,
                    "messages": history,
                }))),
            )
        }
        None => {
            let err = TradingMateError::SessionNotFound(session_id);
            (status_for(&err), Json(ApiResponse::from_error(&err)))
        }
    }
}

async fn end_session(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let session_id = parse_or_stable_uuid(&session_id);

    match state.sessions.write().await.remove(&session_id) {
        Some(_) => {
            info!(%session_id, "Session ended");
            (
                StatusCode::OK,
                Json(ApiResponse::success(serde_json::json!({ "session_id": session_id }))),
            )
        }
        None => {
            let err = TradingMateError::SessionNotFound(session_id);
            (status_for(&err), Json(ApiResponse::from_error(&err)))
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(mate: Arc<TradingMate>) -> Router {
    routes(ApiState::new(mate))
}

fn routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", delete(end_session))
        .route("/api/sessions/:id/messages", get(session_messages))
        .route("/api/chat", post(chat_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    mate: Arc<TradingMate>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(mate);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
