//! Capabilities consumed from the external RAG backend.
//!
//! The chat and booking capabilities are traits so the controller and the
//! orchestrator can run against the HTTP client in production and against
//! in-memory fakes in tests.

use std::collections::BTreeMap;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

/// Errors reported by the RAG backend or the transport in front of it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("upstream returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("upstream timed out after {0} seconds")]
    Timeout(u64),
    #[error("upstream unreachable: {0}")]
    Transport(String),
    #[error("malformed upstream response: {0}")]
    Malformed(String),
    #[error("stream read failed: {0}")]
    StreamRead(String),
}

/// Raw chunks of a streamed answer.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<Bytes, BackendError>> + Send>>;

/// Question answering over the health knowledge base.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Ask a question and wait for the complete answer.
    async fn ask(&self, prompt: &str) -> Result<String, BackendError>;

    /// Ask a question and receive the answer as it is generated.
    async fn ask_stream(&self, prompt: &str) -> Result<TextStream, BackendError>;
}

/// Appointment persistence.
#[async_trait]
pub trait BookingBackend: Send + Sync {
    /// Submit the collected booking fields.
    async fn book(&self, fields: &BTreeMap<String, String>)
        -> Result<BookingReceipt, BackendError>;
}

/// Successful booking reply.
///
/// Unknown keys are kept in `extra` so the forwarding route can echo the
/// upstream body unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingReceipt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BookingReceipt {
    /// The text shown to the patient: `message` if present, else `confirmation`.
    pub fn confirmation_text(&self) -> Option<&str> {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| self.confirmation.as_deref().filter(|c| !c.trim().is_empty()))
    }
}
