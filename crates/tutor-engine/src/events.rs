//! Events emitted to the learner.
//!
//! Every turn produces an ordered list of events. They serialize as JSON
//! objects with `event` and `payload` fields:
//!
//! - `message` - tutor text, optionally with an illustration
//! - `exercise_complete` - the closing message of a finished exercise
//! - `error` - a rejected command; session state is unchanged

use serde::{Deserialize, Serialize};

// ============================================================================
// Event Payloads
// ============================================================================

/// Payload for the `message` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    /// Markdown text shown to the learner.
    pub text: String,
    /// Optional illustration reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Show the illustration in the side panel instead of inline.
    #[serde(default)]
    pub side_panel: bool,
}

/// Payload for the `exercise_complete` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseCompletePayload {
    /// The curriculum's closing message.
    pub message: String,
}

/// Payload for the `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable error message.
    pub message: String,
}

// ============================================================================
// Event Enum
// ============================================================================

/// Something the tutor shows the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum TutorEvent {
    /// Tutor text.
    Message(MessagePayload),
    /// The exercise is complete.
    ExerciseComplete(ExerciseCompletePayload),
    /// A command was rejected.
    Error(ErrorPayload),
}

impl TutorEvent {
    /// Creates a text-only `message` event.
    #[must_use]
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message(MessagePayload {
            text: text.into(),
            image: None,
            side_panel: false,
        })
    }

    /// Creates a `message` event carrying an illustration for the side panel.
    #[must_use]
    pub fn with_side_image(text: impl Into<String>, image: Option<&str>) -> Self {
        Self::Message(MessagePayload {
            text: text.into(),
            side_panel: image.is_some(),
            image: image.map(str::to_string),
        })
    }

    /// Creates an `exercise_complete` event.
    #[must_use]
    pub fn exercise_complete(message: impl Into<String>) -> Self {
        Self::ExerciseComplete(ExerciseCompletePayload {
            message: message.into(),
        })
    }

    /// Creates an `error` event.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
        })
    }

    /// The text shown to the learner.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Message(payload) => &payload.text,
            Self::ExerciseComplete(payload) => &payload.message,
            Self::Error(payload) => &payload.message,
        }
    }

    /// The illustration, if any.
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        match self {
            Self::Message(payload) => payload.image.as_deref(),
            Self::ExerciseComplete(_) | Self::Error(_) => None,
        }
    }

    /// Returns the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::ExerciseComplete(_) => "exercise_complete",
            Self::Error(_) => "error",
        }
    }
}
