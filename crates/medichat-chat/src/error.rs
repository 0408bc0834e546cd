//! Error types for the conversational core.

use medichat_core::error::MedichatError;
use uuid::Uuid;

use crate::backend::BackendError;
use crate::types::BookingStep;

/// Errors from the booking controller and the chat orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("conversation not found: {0}")]
    ConversationNotFound(Uuid),
    #[error("booking session not found: {0}")]
    BookingNotFound(Uuid),
    #[error("no booking in progress")]
    NoActiveBooking,
    #[error("invalid booking transition: {0} -> {1}")]
    InvalidTransition(BookingStep, BookingStep),
    #[error("field already set: {0}")]
    FieldAlreadySet(String),
    #[error("invalid booking form: {0}")]
    InvalidForm(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<MedichatError> for ChatError {
    fn from(err: MedichatError) -> Self {
        ChatError::Internal(err.to_string())
    }
}
