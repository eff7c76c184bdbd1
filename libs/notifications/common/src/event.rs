use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Kind of user mutation that triggered the event
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Created,
    Deleted,
}

/// Event exchanged between the user service and the notification service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    /// Recipient address
    #[validate(custom(function = "not_blank", message = "Email must not be empty"))]
    #[schema(example = "jane@example.com")]
    pub email: String,
    pub event_type: EventType,
}

impl NotificationEvent {
    pub fn new(email: impl Into<String>, event_type: EventType) -> Self {
        Self {
            email: email.into(),
            event_type,
        }
    }

    pub fn created(email: impl Into<String>) -> Self {
        Self::new(email, EventType::Created)
    }

    pub fn deleted(email: impl Into<String>) -> Self {
        Self::new(email, EventType::Deleted)
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Why an inbound payload could not be turned into a [`NotificationEvent`]
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid event payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event email must not be empty")]
    BlankEmail,
}

/// Serialize an event to its JSON wire form.
pub fn encode(event: &NotificationEvent) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(event)
}

/// Parse and validate an event from its JSON wire form.
///
/// Unknown `eventType` values and missing fields surface as [`DecodeError::Json`].
pub fn decode(payload: &[u8]) -> Result<NotificationEvent, DecodeError> {
    let event: NotificationEvent = serde_json::from_slice(payload)?;
    if event.validate().is_err() {
        return Err(DecodeError::BlankEmail);
    }
    Ok(event)
}
