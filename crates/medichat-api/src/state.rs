//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use medichat_chat::{BookingBackend, ChatBackend, ChatOrchestrator};
use medichat_core::MedichatConfig;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks. Conversation
/// state lives inside the orchestrator, which does its own locking.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<MedichatConfig>,
    pub orchestrator: Arc<ChatOrchestrator>,
    /// Used directly by the stateless `/api/chat` endpoints.
    pub chat: Arc<dyn ChatBackend>,
    /// Used directly by `/api/appointment`.
    pub booking: Arc<dyn BookingBackend>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: MedichatConfig,
        chat: Arc<dyn ChatBackend>,
        booking: Arc<dyn BookingBackend>,
    ) -> Self {
        let orchestrator = ChatOrchestrator::new(&config.chat, chat.clone(), booking.clone());
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            chat,
            booking,
            start_time: Instant::now(),
        }
    }
}
