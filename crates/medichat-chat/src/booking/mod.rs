//! Appointment booking dialogue.
//!
//! Collects the form's fields one user turn at a time, asks for an explicit
//! "yes", and only then calls the booking backend. Terminal outcomes always
//! remove the session from the conversation.

pub mod state_machine;

use std::sync::Arc;

use uuid::Uuid;

use crate::backend::{BackendError, BookingBackend};
use crate::booking::state_machine::{next_after_collecting, validate_transition};
use crate::conversation::Conversation;
use crate::error::ChatError;
use crate::types::{BookingForm, BookingSession, BookingStep, BookingTurn, Message};

/// Notice sent when the patient declines the summary.
pub const CANCELLED_NOTICE: &str =
    "Booking cancelled. Let me know if you would like to start a new appointment.";

/// The word that confirms a booking, compared case-insensitively.
const CONFIRM_WORD: &str = "yes";

pub struct BookingController {
    form: BookingForm,
    backend: Arc<dyn BookingBackend>,
}

impl BookingController {
    /// Controller for the default name/doctor/time form.
    pub fn new(backend: Arc<dyn BookingBackend>) -> Self {
        Self::with_form(BookingForm::default(), backend)
    }

    pub fn with_form(form: BookingForm, backend: Arc<dyn BookingBackend>) -> Self {
        Self { form, backend }
    }

    /// Start a fresh booking session and ask for the first field.
    ///
    /// Any session already in progress is abandoned.
    pub fn start(&self, conversation: &mut Conversation) -> BookingTurn {
        let session = BookingSession::new();
        let session_id = session.id;
        let step = session.step;

        if let Some(abandoned) = conversation.begin_booking(session) {
            tracing::debug!(
                conversation_id = %conversation.id(),
                session_id = %abandoned.id,
                step = %abandoned.step,
                "Abandoned unfinished booking"
            );
        }

        let prompt = self
            .form
            .field(0)
            .map(|f| f.prompt.clone())
            .unwrap_or_default();
        let reply = conversation.append(Message::assistant(prompt));

        tracing::info!(conversation_id = %conversation.id(), %session_id, "Booking started");
        BookingTurn {
            session_id,
            step,
            reply,
        }
    }

    /// Apply one user turn to the active booking session.
    ///
    /// Appends the user's text and exactly one assistant reply. Only the
    /// confirm step talks to the backend; its failures are reported in the
    /// reply as `"Error: <reason>"` rather than returned.
    pub async fn submit_turn(
        &self,
        conversation: &mut Conversation,
        session_id: Uuid,
        user_text: &str,
    ) -> Result<BookingTurn, ChatError> {
        if user_text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let mut session = conversation.take_booking(session_id)?;
        let from = session.step;

        let reply_text = match from {
            BookingStep::Collecting { field } => match self.collect(&mut session, field, user_text)
            {
                Ok(prompt) => prompt,
                Err(e) => {
                    conversation.resume_booking(session);
                    return Err(e);
                }
            },
            BookingStep::Confirm => self.confirm(&mut session, user_text).await,
            BookingStep::Done | BookingStep::Cancelled => {
                return Err(ChatError::BookingNotFound(session_id));
            }
        };

        tracing::debug!(
            conversation_id = %conversation.id(),
            %session_id,
            from = %from,
            to = %session.step,
            "Booking step advanced"
        );

        conversation.append(Message::user(user_text));
        let reply = conversation.append(Message::assistant(reply_text));
        let step = session.step;
        if !step.is_terminal() {
            conversation.resume_booking(session);
        }

        Ok(BookingTurn {
            session_id,
            step,
            reply,
        })
    }

    /// Abandon the active booking at the patient's request.
    pub fn cancel(&self, conversation: &mut Conversation) -> Result<BookingTurn, ChatError> {
        let session_id = conversation
            .booking()
            .map(|s| s.id)
            .ok_or(ChatError::NoActiveBooking)?;
        let session = conversation.take_booking(session_id)?;

        tracing::info!(
            conversation_id = %conversation.id(),
            %session_id,
            step = %session.step,
            "Booking cancelled"
        );
        let reply = conversation.append(Message::assistant(CANCELLED_NOTICE));
        Ok(BookingTurn {
            session_id,
            step: BookingStep::Cancelled,
            reply,
        })
    }

    /// Record one field and return the next prompt.
    fn collect(
        &self,
        session: &mut BookingSession,
        field: usize,
        user_text: &str,
    ) -> Result<String, ChatError> {
        let spec = self.form.field(field).ok_or(ChatError::InvalidTransition(
            session.step,
            BookingStep::Collecting { field: field + 1 },
        ))?;
        let next = next_after_collecting(self.form.len(), field);
        validate_transition(self.form.len(), session.step, next)?;

        session.record(&spec.key, user_text)?;
        session.step = next;

        Ok(match next {
            BookingStep::Collecting { field } => self
                .form
                .field(field)
                .map(|f| f.prompt.clone())
                .unwrap_or_default(),
            _ => self.summary(session),
        })
    }

    /// Resolve the confirm step. Always ends in `Done` or `Cancelled`.
    async fn confirm(&self, session: &mut BookingSession, user_text: &str) -> String {
        let (next, reply) = if user_text.trim().eq_ignore_ascii_case(CONFIRM_WORD) {
            match self.backend.book(session.fields()).await {
                Ok(receipt) => match receipt.confirmation_text() {
                    Some(text) => {
                        tracing::info!(session_id = %session.id, "Appointment booked");
                        (BookingStep::Done, text.to_string())
                    }
                    None => {
                        let err = BackendError::Malformed(
                            "booking reply carries no confirmation text".to_string(),
                        );
                        tracing::warn!(session_id = %session.id, error = %err, "Booking failed");
                        (BookingStep::Cancelled, format!("Error: {}", err))
                    }
                },
                Err(e) => {
                    tracing::warn!(session_id = %session.id, error = %e, "Booking failed");
                    (BookingStep::Cancelled, format!("Error: {}", e))
                }
            }
        } else {
            tracing::info!(session_id = %session.id, "Booking declined");
            (BookingStep::Cancelled, CANCELLED_NOTICE.to_string())
        };

        debug_assert!(validate_transition(self.form.len(), session.step, next).is_ok());
        session.step = next;
        reply
    }

    /// Confirmation prompt listing every collected value verbatim.
    fn summary(&self, session: &BookingSession) -> String {
        let mut text = String::from("Please confirm your appointment details:");
        for spec in self.form.fields() {
            let value = session.field(&spec.key).unwrap_or_default();
            text.push_str(&format!("\n{}: {}", spec.label, value));
        }
        text.push_str("\nReply \"yes\" to confirm, or anything else to cancel.");
        text
    }
}
