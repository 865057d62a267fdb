//! HTTP surface for Colloquy
//!
//! Exposes the streaming exchange endpoint and the thread mutation actions.
//! Identity is an opaque user id carried in the `x-user-id` header; requests
//! without one receive the uniform `Unauthorized user` rejection. Action
//! responses use a `{ success, message, data }` envelope; the streaming
//! endpoint responds with `text/event-stream` of exchange events.

use crate::codec::CanonicalMessage;
use crate::error::Result;
use crate::exchange::{collect_exchange, ExchangeOrchestrator, ExchangeRequest};
use crate::store::{MessageRole, StoredMessage, ThreadStore};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Shared state for all handlers
pub struct AppState {
    pub store: Arc<ThreadStore>,
    pub orchestrator: Arc<ExchangeOrchestrator>,
    pub default_model: String,
}

/// Envelope returned by every mutation action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ActionResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Body of `POST /api/threads`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateThreadBody {
    pub content: String,
    #[serde(default)]
    pub model: Option<String>,
}

/// Body of `POST /api/threads/{id}/messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageBody {
    pub content: String,
    #[serde(default)]
    pub model: Option<String>,
}

/// Data returned by the append-message action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendMessageData {
    pub user_message: StoredMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_message: Option<StoredMessage>,
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatBody {
    pub thread_id: String,
    pub new_messages: Vec<CanonicalMessage>,
    pub model: String,
    #[serde(default)]
    pub skip_user_message: bool,
}

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/threads", get(list_threads).post(create_thread))
        .route("/api/threads/:id", get(get_thread).delete(delete_thread))
        .route("/api/threads/:id/messages", post(create_message))
        .with_state(state)
}

/// Extract the opaque user identity from request headers
fn identity(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ActionResponse::<()>::failure("Unauthorized user")),
    )
        .into_response()
}

async fn list_threads(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(user_id) = identity(&headers) else {
        return unauthorized();
    };

    match state.store.list_threads(&user_id) {
        Ok(threads) => Json(ActionResponse::ok("Threads fetched successfully", threads))
            .into_response(),
        Err(e) => {
            tracing::error!("Error fetching threads: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ActionResponse::<()>::failure("Failed to fetch threads")),
            )
                .into_response()
        }
    }
}

async fn get_thread(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(thread_id): Path<String>,
) -> Response {
    let Some(user_id) = identity(&headers) else {
        return unauthorized();
    };

    match state.store.get_thread(&thread_id, &user_id) {
        Ok(Some(thread)) => {
            Json(ActionResponse::ok("Thread fetched successfully", thread)).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ActionResponse::<()>::failure("Thread not found")),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error fetching thread: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ActionResponse::<()>::failure("Failed to fetch thread")),
            )
                .into_response()
        }
    }
}

async fn create_thread(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: std::result::Result<Json<CreateThreadBody>, JsonRejection>,
) -> Response {
    let Some(user_id) = identity(&headers) else {
        return unauthorized();
    };

    let Ok(Json(body)) = body else {
        return validation_failure("Message content is required");
    };

    if body.content.trim().is_empty() {
        return validation_failure("Message content is required");
    }

    match state
        .store
        .create_thread(&user_id, &body.content, body.model.as_deref())
    {
        Ok(thread) => {
            Json(ActionResponse::ok("Thread created successfully", thread)).into_response()
        }
        Err(e) => {
            tracing::error!("Error creating thread: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ActionResponse::<()>::failure("Failed to create thread")),
            )
                .into_response()
        }
    }
}

async fn create_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(thread_id): Path<String>,
    body: std::result::Result<Json<CreateMessageBody>, JsonRejection>,
) -> Response {
    let Some(user_id) = identity(&headers) else {
        return unauthorized();
    };

    let Ok(Json(body)) = body else {
        return validation_failure("Message content is required");
    };

    if body.content.trim().is_empty() {
        return validation_failure("Message content is required");
    }

    // Ownership is checked here; the exchange trusts the thread id after
    // this point.
    match state.store.get_thread(&thread_id, &user_id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ActionResponse::<()>::failure("Thread not found")),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Error fetching thread: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ActionResponse::<()>::failure("Failed to create message")),
            )
                .into_response();
        }
    }

    let model = body
        .model
        .clone()
        .unwrap_or_else(|| state.default_model.clone());

    match run_append_exchange(&state, &thread_id, &body.content, &model).await {
        Ok(data) => {
            Json(ActionResponse::ok("Message created successfully", data)).into_response()
        }
        Err(e) => {
            tracing::error!("Error creating message: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ActionResponse::<()>::failure("Failed to create message")),
            )
                .into_response()
        }
    }
}

/// Persist the user turn, run a full exchange with user persistence
/// suppressed, and return both persisted records
async fn run_append_exchange(
    state: &Arc<AppState>,
    thread_id: &str,
    content: &str,
    model: &str,
) -> Result<AppendMessageData> {
    let user_message = StoredMessage::user(thread_id, content, Some(model.to_string()));
    state
        .store
        .append_messages(thread_id, std::slice::from_ref(&user_message))?;

    let canonical = crate::codec::decode(&user_message)
        .unwrap_or_else(|| CanonicalMessage::user_text(content));

    let stream = state
        .orchestrator
        .run(ExchangeRequest {
            thread_id: thread_id.to_string(),
            new_messages: vec![canonical],
            model: model.to_string(),
            skip_user_persist: true,
        })
        .await?;

    let outcome = collect_exchange(stream).await;
    if let Some(error) = outcome.error {
        // The user turn stays persisted; the caller's retry path decides
        // what to do with it.
        return Err(crate::error::ColloquyError::Provider(error).into());
    }

    // Messages come back in insertion order; a freshly persisted assistant
    // turn is always last. Anything else means this exchange produced none.
    let messages = state.store.list_messages(thread_id)?;
    let assistant_message = messages
        .last()
        .filter(|m| m.role == MessageRole::Assistant)
        .cloned();

    Ok(AppendMessageData {
        user_message,
        assistant_message,
    })
}

async fn delete_thread(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(thread_id): Path<String>,
) -> Response {
    let Some(user_id) = identity(&headers) else {
        return unauthorized();
    };

    match state.store.delete_thread(&thread_id, &user_id) {
        Ok(true) => {
            Json(ActionResponse::<()> {
                success: true,
                message: "Thread deleted successfully".to_string(),
                data: None,
            })
            .into_response()
        }
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ActionResponse::<()>::failure("Thread not found")),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Error deleting thread: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ActionResponse::<()>::failure("Failed to delete thread")),
            )
                .into_response()
        }
    }
}

async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: std::result::Result<Json<ChatBody>, JsonRejection>,
) -> Response {
    let Some(user_id) = identity(&headers) else {
        return error_body(StatusCode::UNAUTHORIZED, "Unauthorized user");
    };

    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            return error_body(StatusCode::BAD_REQUEST, &rejection.body_text());
        }
    };

    if body.thread_id.is_empty() {
        return error_body(StatusCode::BAD_REQUEST, "thread_id is required");
    }
    if body.new_messages.is_empty() {
        return error_body(StatusCode::BAD_REQUEST, "new_messages is required");
    }
    if body.model.is_empty() {
        return error_body(StatusCode::BAD_REQUEST, "model is required");
    }

    match state.store.get_thread(&body.thread_id, &user_id) {
        Ok(Some(_)) => {}
        Ok(None) => return error_body(StatusCode::NOT_FOUND, "Thread not found"),
        Err(e) => {
            tracing::error!("Error fetching thread: {}", e);
            return error_body(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch thread");
        }
    }

    let request = ExchangeRequest {
        thread_id: body.thread_id,
        new_messages: body.new_messages,
        model: body.model,
        skip_user_persist: body.skip_user_message,
    };

    match state.orchestrator.run(request).await {
        Ok(stream) => {
            let events = stream.map(|event| Event::default().json_data(&event));
            Sse::new(events).keep_alive(KeepAlive::default()).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to open exchange: {}", e);
            error_body(StatusCode::BAD_GATEWAY, &e.to_string())
        }
    }
}

fn validation_failure(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ActionResponse::<()>::failure(message)),
    )
        .into_response()
}

fn error_body(status: StatusCode, error: &str) -> Response {
    (status, Json(json!({ "error": error }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_present() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", "user-1".parse().unwrap());
        assert_eq!(identity(&headers), Some("user-1".to_string()));
    }

    #[test]
    fn test_identity_missing() {
        assert_eq!(identity(&HeaderMap::new()), None);
    }

    #[test]
    fn test_identity_empty_value_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", "".parse().unwrap());
        assert_eq!(identity(&headers), None);
    }

    #[test]
    fn test_action_response_ok_serialization() {
        let response = ActionResponse::ok("Thread fetched successfully", 42);
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(
            json,
            r#"{"success":true,"message":"Thread fetched successfully","data":42}"#
        );
    }

    #[test]
    fn test_action_response_failure_omits_data() {
        let response = ActionResponse::<()>::failure("Unauthorized user");
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"success":false,"message":"Unauthorized user"}"#);
    }

    #[test]
    fn test_chat_body_defaults_skip_user_message() {
        let body: ChatBody = serde_json::from_str(
            r#"{"thread_id":"t","new_messages":[],"model":"m"}"#,
        )
        .unwrap();
        assert!(!body.skip_user_message);
    }

    #[test]
    fn test_chat_body_missing_model_fails_to_parse() {
        let result = serde_json::from_str::<ChatBody>(r#"{"thread_id":"t","new_messages":[]}"#);
        assert!(result.is_err());
    }
}
