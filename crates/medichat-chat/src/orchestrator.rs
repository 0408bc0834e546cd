//! Chat orchestrator: owns conversations and routes each user turn.
//!
//! A turn goes to the booking controller while a booking is in progress and to
//! the chat backend otherwise. Every failure on the conversation path ends up
//! as an assistant message, so callers only see errors for requests that
//! cannot be applied at all (unknown conversation, invalid input).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use medichat_core::config::ChatConfig;

use crate::backend::{BookingBackend, ChatBackend};
use crate::booking::BookingController;
use crate::conversation::{Conversation, ConversationManager};
use crate::error::ChatError;
use crate::types::{BookingSession, BookingTurn, ConversationTurn, Message};

type ConversationHandle = Arc<AsyncMutex<Conversation>>;

pub struct ChatOrchestrator {
    manager: ConversationManager,
    booking: Arc<BookingController>,
    chat: Arc<dyn ChatBackend>,
    /// Each conversation sits behind its own lock so turns on one
    /// conversation are serialized without blocking the others.
    conversations: Mutex<HashMap<Uuid, ConversationHandle>>,
    max_message_length: usize,
}

impl ChatOrchestrator {
    pub fn new(
        config: &ChatConfig,
        chat: Arc<dyn ChatBackend>,
        booking: Arc<dyn BookingBackend>,
    ) -> Self {
        Self {
            manager: ConversationManager::new(config.session_timeout_minutes),
            booking: Arc::new(BookingController::new(booking)),
            chat,
            conversations: Mutex::new(HashMap::new()),
            max_message_length: config.max_message_length,
        }
    }

    /// Create an empty conversation and return its id.
    ///
    /// Idle conversations are swept first.
    pub fn create_conversation(&self) -> Result<Uuid, ChatError> {
        let conversation = self.manager.create();
        let id = conversation.id();
        let mut map = self.map()?;
        self.sweep(&mut map);
        map.insert(id, Arc::new(AsyncMutex::new(conversation)));
        tracing::info!(conversation_id = %id, "Conversation created");
        Ok(id)
    }

    /// Handle a user message.
    ///
    /// Returns the messages this turn appended plus the booking state after it.
    pub async fn handle_message(
        &self,
        conversation_id: Uuid,
        content: &str,
    ) -> Result<ConversationTurn, ChatError> {
        self.validate(content)?;
        let mut conversation = self.lock(conversation_id).await?;

        let active = conversation.booking().map(|s| s.id);
        if let Some(session_id) = active {
            return self.booking_turn(conversation, session_id, content).await;
        }

        let before = conversation.messages().len();
        conversation.append(Message::user(content));
        let reply = match self.chat.ask(content).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(%conversation_id, error = %e, "Chat backend failed");
                format!("Error: {}", e)
            }
        };
        conversation.append(Message::assistant(reply));
        Ok(turn_since(&conversation, before))
    }

    /// Begin a booking in the conversation, abandoning any unfinished one.
    pub async fn start_booking(&self, conversation_id: Uuid) -> Result<BookingTurn, ChatError> {
        let mut conversation = self.lock(conversation_id).await?;
        Ok(self.booking.start(&mut conversation))
    }

    pub async fn cancel_booking(&self, conversation_id: Uuid) -> Result<BookingTurn, ChatError> {
        let mut conversation = self.lock(conversation_id).await?;
        self.booking.cancel(&mut conversation)
    }

    /// The booking in progress, if any.
    pub async fn active_booking(
        &self,
        conversation_id: Uuid,
    ) -> Result<BookingSession, ChatError> {
        let conversation = self.lock(conversation_id).await?;
        conversation
            .booking()
            .cloned()
            .ok_or(ChatError::NoActiveBooking)
    }

    /// Full message history.
    pub async fn history(&self, conversation_id: Uuid) -> Result<Vec<Message>, ChatError> {
        let conversation = self.lock(conversation_id).await?;
        Ok(conversation.messages().to_vec())
    }

    pub fn delete_conversation(&self, conversation_id: Uuid) -> Result<(), ChatError> {
        if self.map()?.remove(&conversation_id).is_some() {
            tracing::info!(%conversation_id, "Conversation deleted");
            Ok(())
        } else {
            Err(ChatError::ConversationNotFound(conversation_id))
        }
    }

    /// Number of conversations that have not gone idle.
    pub fn active_conversations(&self) -> usize {
        match self.map() {
            Ok(mut map) => {
                self.sweep(&mut map);
                map.len()
            }
            Err(_) => 0,
        }
    }

    // -- Private helpers --

    /// Apply a turn to the active booking on a detached task.
    ///
    /// The task owns the conversation lock, so a caller that stops waiting
    /// mid-confirmation cannot lose the session: the backend outcome is
    /// still appended once it arrives.
    async fn booking_turn(
        &self,
        mut conversation: OwnedMutexGuard<Conversation>,
        session_id: Uuid,
        content: &str,
    ) -> Result<ConversationTurn, ChatError> {
        let booking = Arc::clone(&self.booking);
        let content = content.to_string();
        tokio::spawn(async move {
            let before = conversation.messages().len();
            booking
                .submit_turn(&mut conversation, session_id, &content)
                .await?;
            Ok::<_, ChatError>(turn_since(&conversation, before))
        })
        .await
        .map_err(|e| ChatError::Internal(format!("booking turn task failed: {}", e)))?
    }

    /// Drop idle conversations. Conversations locked by a turn are kept.
    fn sweep(&self, map: &mut HashMap<Uuid, ConversationHandle>) {
        let before = map.len();
        map.retain(|_, handle| match handle.try_lock() {
            Ok(conversation) => !self.manager.is_expired(&conversation),
            Err(_) => true,
        });
        let removed = before - map.len();
        if removed > 0 {
            tracing::info!(removed, "Expired conversations swept");
        }
    }

    fn validate(&self, content: &str) -> Result<(), ChatError> {
        if content.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if content.chars().count() > self.max_message_length {
            return Err(ChatError::MessageTooLong(self.max_message_length));
        }
        Ok(())
    }

    fn map(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, ConversationHandle>>, ChatError> {
        self.conversations
            .lock()
            .map_err(|e| ChatError::Internal(format!("conversation map lock poisoned: {}", e)))
    }

    /// Lock a conversation for one turn. Expired conversations are removed and
    /// reported as not found.
    async fn lock(&self, id: Uuid) -> Result<OwnedMutexGuard<Conversation>, ChatError> {
        let handle = self
            .map()?
            .get(&id)
            .cloned()
            .ok_or(ChatError::ConversationNotFound(id))?;

        let guard = handle.lock_owned().await;
        if self.manager.is_expired(&guard) {
            drop(guard);
            self.map()?.remove(&id);
            tracing::info!(conversation_id = %id, "Conversation expired");
            return Err(ChatError::ConversationNotFound(id));
        }
        Ok(guard)
    }
}

fn turn_since(conversation: &Conversation, before: usize) -> ConversationTurn {
    ConversationTurn {
        conversation_id: conversation.id(),
        messages: conversation.messages()[before..].to_vec(),
        booking: conversation.booking().cloned(),
    }
}
