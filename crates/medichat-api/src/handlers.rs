//! Route handler functions for all API endpoints.
//!
//! The `/api/chat` and `/api/appointment` handlers forward straight to the RAG
//! backend. The `/api/conversations` handlers go through the orchestrator.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use medichat_chat::{
    restream, BookingReceipt, BookingSession, BookingTurn, ConversationTurn, Message, Segment,
};

use crate::error::ApiError;
use crate::state::AppState;

const INVALID_PROMPT: &str = "A valid prompt is required";
const MISSING_FIELDS: &str = "Missing required fields";

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentRequest {
    pub patient_name: Option<String>,
    pub doctor: Option<String>,
    pub appointment_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub content: Option<String>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_conversations: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationCreated {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub conversation_id: Uuid,
    pub messages: Vec<Message>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Unwrap a JSON body, reporting syntax errors in the API's error format.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    })
}

fn parse_conversation_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::BadRequest(format!("invalid conversation id: {}", raw)))
}

/// The prompt with surrounding whitespace removed, or 400 if there is none.
fn require_prompt(state: &AppState, prompt: Option<String>) -> Result<String, ApiError> {
    let prompt = prompt
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest(INVALID_PROMPT.to_string()))?;

    let max = state.config.chat.max_message_length;
    if prompt.chars().count() > max {
        return Err(ApiError::BadRequest(format!(
            "prompt exceeds maximum length of {} characters",
            max
        )));
    }
    Ok(prompt)
}

fn segment_event(segment: Segment) -> Event {
    let name = if segment.is_error() { "error" } else { "segment" };
    Event::default().event(name).data(segment.as_str())
}

// =============================================================================
// Health
// =============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_conversations: state.orchestrator.active_conversations(),
    })
}

// =============================================================================
// Forwarding endpoints
// =============================================================================

/// POST /api/chat - ask the RAG backend a single question.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let body = json_body(payload)?;
    let prompt = require_prompt(&state, body.prompt)?;

    let answer = state.chat.ask(&prompt).await?;
    Ok(Json(ChatResponse { answer }))
}

/// POST /api/chat/stream - ask a question and receive the answer as SSE.
///
/// Failures before the first byte are reported as a JSON error. After that,
/// a read failure becomes one `error` event. The stream always ends with a
/// `done` event.
pub async fn chat_stream(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + Send>, ApiError> {
    let body = json_body(payload)?;
    let prompt = require_prompt(&state, body.prompt)?;

    let upstream = state.chat.ask_stream(&prompt).await?;
    let events = restream(upstream)
        .map(|segment| Ok::<_, Infallible>(segment_event(segment)))
        .chain(tokio_stream::once(Ok(Event::default()
            .event("done")
            .data("[DONE]"))));

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

/// POST /api/appointment - forward a complete booking to the RAG backend.
pub async fn appointment(
    State(state): State<AppState>,
    payload: Result<Json<AppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingReceipt>), ApiError> {
    let body = json_body(payload)?;

    let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    let (Some(patient_name), Some(doctor), Some(appointment_time)) = (
        present(body.patient_name),
        present(body.doctor),
        present(body.appointment_time),
    ) else {
        return Err(ApiError::BadRequest(MISSING_FIELDS.to_string()));
    };

    let fields = BTreeMap::from([
        ("patient_name".to_string(), patient_name),
        ("doctor".to_string(), doctor),
        ("appointment_time".to_string(), appointment_time),
    ]);
    let receipt = state.booking.book(&fields).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

// =============================================================================
// Conversations
// =============================================================================

/// POST /api/conversations
pub async fn create_conversation(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ConversationCreated>), ApiError> {
    let id = state.orchestrator.create_conversation()?;
    Ok((StatusCode::CREATED, Json(ConversationCreated { id })))
}

/// GET /api/conversations/{id}/messages
pub async fn get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let conversation_id = parse_conversation_id(&id)?;
    let messages = state.orchestrator.history(conversation_id).await?;
    Ok(Json(HistoryResponse {
        conversation_id,
        messages,
    }))
}

/// POST /api/conversations/{id}/messages
pub async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<Json<ConversationTurn>, ApiError> {
    let conversation_id = parse_conversation_id(&id)?;
    let body = json_body(payload)?;
    let content = body.content.unwrap_or_default();

    let turn = state
        .orchestrator
        .handle_message(conversation_id, &content)
        .await?;
    Ok(Json(turn))
}

/// POST /api/conversations/{id}/booking - start (or restart) a booking.
pub async fn start_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<BookingTurn>), ApiError> {
    let conversation_id = parse_conversation_id(&id)?;
    let turn = state.orchestrator.start_booking(conversation_id).await?;
    Ok((StatusCode::CREATED, Json(turn)))
}

/// GET /api/conversations/{id}/booking
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookingSession>, ApiError> {
    let conversation_id = parse_conversation_id(&id)?;
    let session = state.orchestrator.active_booking(conversation_id).await?;
    Ok(Json(session))
}

/// DELETE /api/conversations/{id}/booking
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookingTurn>, ApiError> {
    let conversation_id = parse_conversation_id(&id)?;
    let turn = state.orchestrator.cancel_booking(conversation_id).await?;
    Ok(Json(turn))
}

/// DELETE /api/conversations/{id}
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let conversation_id = parse_conversation_id(&id)?;
    state.orchestrator.delete_conversation(conversation_id)?;
    Ok(StatusCode::NO_CONTENT)
}
