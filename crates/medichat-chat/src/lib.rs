//! Conversational core for MediChat.
//!
//! Provides the appointment-booking conversation controller, the chunk
//! restreamer used for progressive display of streamed answers, the HTTP
//! client for the RAG backend, and the orchestrator that owns conversations.

pub mod backend;
pub mod booking;
pub mod conversation;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod restream;
pub mod types;

pub use backend::{BackendError, BookingBackend, BookingReceipt, ChatBackend, TextStream};
pub use booking::BookingController;
pub use conversation::{Conversation, ConversationManager};
pub use error::ChatError;
pub use http::RagClient;
pub use orchestrator::ChatOrchestrator;
pub use restream::{restream, Restreamer, Segment};
pub use types::{
    BookingForm, BookingSession, BookingStep, BookingTurn, ConversationTurn, FieldSpec, Message,
    Role,
};
