//! Shared types for conversations and booking sessions.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChatError;

// =============================================================================
// Messages
// =============================================================================

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// A single message in a conversation. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

// =============================================================================
// Booking form
// =============================================================================

/// One field collected by the booking dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Key sent to the booking backend (e.g. `patient_name`).
    pub key: String,
    /// Label used in the confirmation summary.
    pub label: String,
    /// Assistant prompt asking for this field.
    pub prompt: String,
}

impl FieldSpec {
    pub fn new(key: &str, label: &str, prompt: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            prompt: prompt.to_string(),
        }
    }
}

/// Ordered list of fields the booking dialogue collects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingForm {
    fields: Vec<FieldSpec>,
}

impl BookingForm {
    /// Build a form, rejecting empty field lists and duplicate keys.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, ChatError> {
        if fields.is_empty() {
            return Err(ChatError::InvalidForm(
                "a booking form needs at least one field".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for field in &fields {
            if field.key.trim().is_empty() {
                return Err(ChatError::InvalidForm("field key must not be empty".to_string()));
            }
            if !seen.insert(field.key.as_str()) {
                return Err(ChatError::InvalidForm(format!(
                    "duplicate field key: {}",
                    field.key
                )));
            }
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, index: usize) -> Option<&FieldSpec> {
        self.fields.get(index)
    }
}

impl Default for BookingForm {
    fn default() -> Self {
        Self {
            fields: vec![
                FieldSpec::new("patient_name", "Name", "Please provide your name."),
                FieldSpec::new(
                    "doctor",
                    "Doctor",
                    "Which doctor would you like to see? Please provide the doctor's name.",
                ),
                FieldSpec::new(
                    "appointment_time",
                    "Time",
                    "When would you like the appointment? Please provide a date and time.",
                ),
            ],
        }
    }
}

// =============================================================================
// Booking session
// =============================================================================

/// Position of a booking session in the field-collection sequence.
///
/// `Collecting { field }` indexes into the session's [`BookingForm`]; with the
/// default form 0, 1 and 2 are the name, doctor and time steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BookingStep {
    Collecting { field: usize },
    Confirm,
    Done,
    Cancelled,
}

impl BookingStep {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStep::Done | BookingStep::Cancelled)
    }
}

impl fmt::Display for BookingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStep::Collecting { field } => write!(f, "collecting[{}]", field),
            BookingStep::Confirm => write!(f, "confirm"),
            BookingStep::Done => write!(f, "done"),
            BookingStep::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Per-conversation booking state.
///
/// `fields` holds exactly the values for the steps already passed. Values are
/// written once and never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingSession {
    pub id: Uuid,
    pub step: BookingStep,
    fields: BTreeMap<String, String>,
}

impl BookingSession {
    pub(crate) fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            step: BookingStep::Collecting { field: 0 },
            fields: BTreeMap::new(),
        }
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub(crate) fn record(&mut self, key: &str, value: &str) -> Result<(), ChatError> {
        if self.fields.contains_key(key) {
            return Err(ChatError::FieldAlreadySet(key.to_string()));
        }
        self.fields.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// Turn results
// =============================================================================

/// Outcome of one booking transition.
#[derive(Debug, Clone, Serialize)]
pub struct BookingTurn {
    pub session_id: Uuid,
    /// Step after the transition.
    pub step: BookingStep,
    /// The assistant message appended by the transition.
    pub reply: Message,
}

/// Messages appended to a conversation by one user turn.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationTurn {
    pub conversation_id: Uuid,
    pub messages: Vec<Message>,
    /// Booking state after the turn; `None` when no booking is in progress.
    pub booking: Option<BookingSession>,
}
