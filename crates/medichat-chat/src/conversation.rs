//! Conversation context.
//!
//! A [`Conversation`] is the explicit state object the booking controller and
//! the orchestrator operate on: the append-only message log plus at most one
//! active booking session.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::ChatError;
use crate::types::{BookingSession, Message};

// =============================================================================
// Conversation
// =============================================================================

#[derive(Debug, Clone)]
pub struct Conversation {
    id: Uuid,
    started_at: DateTime<Utc>,
    last_message_at: DateTime<Utc>,
    messages: Vec<Message>,
    booking: Option<BookingSession>,
}

impl Conversation {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            started_at: now,
            last_message_at: now,
            messages: Vec::new(),
            booking: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn last_message_at(&self) -> DateTime<Utc> {
        self.last_message_at
    }

    /// Messages in arrival order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn booking(&self) -> Option<&BookingSession> {
        self.booking.as_ref()
    }

    pub(crate) fn append(&mut self, message: Message) -> Message {
        self.last_message_at = message.created_at;
        self.messages.push(message.clone());
        message
    }

    /// Install a new booking session, returning the abandoned one if any.
    pub(crate) fn begin_booking(&mut self, session: BookingSession) -> Option<BookingSession> {
        self.booking.replace(session)
    }

    /// Remove the active booking session if its id matches.
    pub(crate) fn take_booking(&mut self, session_id: Uuid) -> Result<BookingSession, ChatError> {
        match self.booking.take() {
            Some(session) if session.id == session_id => Ok(session),
            other => {
                self.booking = other;
                Err(ChatError::BookingNotFound(session_id))
            }
        }
    }

    /// Put a session taken with [`take_booking`](Self::take_booking) back.
    pub(crate) fn resume_booking(&mut self, session: BookingSession) {
        self.booking = Some(session);
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConversationManager
// =============================================================================

/// Creates conversations and decides when they have gone idle.
pub struct ConversationManager {
    /// Session timeout in minutes.
    pub session_timeout_minutes: u32,
}

impl ConversationManager {
    pub fn new(session_timeout_minutes: u32) -> Self {
        Self {
            session_timeout_minutes,
        }
    }

    pub fn create(&self) -> Conversation {
        Conversation::new()
    }

    /// Check whether a conversation has been idle longer than the timeout.
    pub fn is_expired(&self, conversation: &Conversation) -> bool {
        let timeout = Duration::minutes(i64::from(self.session_timeout_minutes));
        Utc::now() - conversation.last_message_at > timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_conversation_is_empty() {
        let conv = Conversation::new();
        assert_ne!(conv.id(), Uuid::nil());
        assert!(conv.messages().is_empty());
        assert!(conv.booking().is_none());
        assert_eq!(conv.started_at(), conv.last_message_at());
    }

    #[test]
    fn test_append_preserves_order_and_touches_timestamp() {
        let mut conv = Conversation::new();
        let first = conv.append(Message::user("first"));
        let second = conv.append(Message::assistant("second"));
        let contents: Vec<&str> = conv.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert_eq!(conv.messages()[0].id, first.id);
        assert_eq!(conv.last_message_at(), second.created_at);
    }

    #[test]
    fn test_begin_booking_abandons_previous() {
        let mut conv = Conversation::new();
        let first = BookingSession::new();
        let first_id = first.id;
        assert!(conv.begin_booking(first).is_none());
        let abandoned = conv.begin_booking(BookingSession::new()).unwrap();
        assert_eq!(abandoned.id, first_id);
        assert_ne!(conv.booking().unwrap().id, first_id);
    }

    #[test]
    fn test_take_booking_with_wrong_id_keeps_session() {
        let mut conv = Conversation::new();
        let session = BookingSession::new();
        let id = session.id;
        conv.begin_booking(session);

        let err = conv.take_booking(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ChatError::BookingNotFound(_)));
        assert_eq!(conv.booking().unwrap().id, id);

        let taken = conv.take_booking(id).unwrap();
        assert_eq!(taken.id, id);
        assert!(conv.booking().is_none());

        conv.resume_booking(taken);
        assert_eq!(conv.booking().unwrap().id, id);
    }

    #[test]
    fn test_take_booking_when_none() {
        let mut conv = Conversation::new();
        assert!(conv.take_booking(Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_expiry() {
        let mgr = ConversationManager::new(30);
        let mut conv = mgr.create();
        assert!(!mgr.is_expired(&conv));

        conv.last_message_at = Utc::now() - Duration::minutes(31);
        assert!(mgr.is_expired(&conv));
    }

    #[test]
    fn test_zero_timeout_expires_immediately_after_activity() {
        let mgr = ConversationManager::new(0);
        let mut conv = mgr.create();
        conv.last_message_at = Utc::now() - Duration::seconds(1);
        assert!(mgr.is_expired(&conv));
    }
}
