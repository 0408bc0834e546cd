//! reqwest client for the RAG backend.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;

use medichat_core::config::UpstreamConfig;

use crate::backend::{BackendError, BookingBackend, BookingReceipt, ChatBackend, TextStream};

/// Answer used when the backend replies 2xx without an answer.
pub const NO_ANSWER_FALLBACK: &str = "No answer returned from RAG API";

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    answer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    error: String,
}

/// HTTP client implementing both backend capabilities.
#[derive(Debug, Clone)]
pub struct RagClient {
    client: reqwest::Client,
    query_url: String,
    stream_url: String,
    booking_url: String,
    timeout: Duration,
}

impl RagClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("medichat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            query_url: config.query_url.clone(),
            stream_url: config.stream_url.clone(),
            booking_url: config.booking_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn map_send_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout.as_secs())
        } else if err.is_decode() {
            BackendError::Malformed(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }

    /// Turn a non-2xx response into `BackendError::Status`, preferring the
    /// `{ "error": ... }` body the backend sends.
    async fn status_error(response: reqwest::Response) -> BackendError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<UpstreamErrorBody>(&body) {
            Ok(parsed) => parsed.error,
            Err(_) if !body.trim().is_empty() => body.trim().chars().take(200).collect(),
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string(),
        };
        BackendError::Status {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl ChatBackend for RagClient {
    async fn ask(&self, prompt: &str) -> Result<String, BackendError> {
        let response = self
            .client
            .post(&self.query_url)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "question": prompt }))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let err = Self::status_error(response).await;
            tracing::warn!(error = %err, "RAG query failed");
            return Err(err);
        }

        let body: QueryResponse = response.json().await.map_err(|e| self.map_send_error(e))?;
        Ok(body
            .answer
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| NO_ANSWER_FALLBACK.to_string()))
    }

    async fn ask_stream(&self, prompt: &str) -> Result<TextStream, BackendError> {
        // Only the wait for response headers is bounded; the body may take as
        // long as the backend keeps producing.
        let send = self
            .client
            .post(&self.stream_url)
            .json(&serde_json::json!({ "question": prompt }))
            .send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| BackendError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let err = Self::status_error(response).await;
            tracing::warn!(error = %err, "RAG stream request failed");
            return Err(err);
        }

        let stream = response
            .bytes_stream()
            .map(|item| item.map_err(|e| BackendError::StreamRead(e.to_string())));
        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl BookingBackend for RagClient {
    async fn book(
        &self,
        fields: &BTreeMap<String, String>,
    ) -> Result<BookingReceipt, BackendError> {
        let response = self
            .client
            .post(&self.booking_url)
            .timeout(self.timeout)
            .json(fields)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let err = Self::status_error(response).await;
            tracing::warn!(error = %err, "Booking request failed");
            return Err(err);
        }

        let bytes = response.bytes().await.map_err(|e| self.map_send_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Malformed(e.to_string()))
    }
}
