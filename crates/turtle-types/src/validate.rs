//! Message-shape validation at the transport boundary.
//!
//! Raw text frames are first decoded into a [`serde_json::Value`]; a
//! failure there is a [`Rejection::Decode`]. The value is then matched
//! against the message shapes accepted from the sender's role; anything
//! well-formed but unrecognized is a [`Rejection::Schema`]. Callers decide
//! what a rejection means (drop, or close during auth).

use serde_json::Value;
use validator::Validate;

use crate::messages::{AuthRequest, ObserverRequest, TurtleMessage};

/// Why an inbound frame was not accepted.
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    /// The frame is not JSON.
    #[error("frame is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    /// The frame is JSON but not a recognized message shape.
    #[error("unrecognized message shape: {0}")]
    Schema(#[source] serde_json::Error),

    /// The first frame of a connection was not an auth message.
    #[error("expected an auth message, got type {0:?}")]
    NotAuth(Option<String>),

    /// The message has the right shape but violates a field rule.
    #[error("message failed validation: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

impl Rejection {
    /// Whether the frame failed to decode as JSON at all.
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

/// Decode a text frame into a JSON value.
pub fn decode_frame(text: &str) -> Result<Value, Rejection> {
    serde_json::from_str(text).map_err(Rejection::Decode)
}

/// The `type` discriminator of a decoded frame, if it has one.
pub fn message_type(value: &Value) -> Option<&str> {
    value.get("type").and_then(Value::as_str)
}

/// Accept the first frame of a connection as an auth request.
pub fn auth_request(value: Value) -> Result<AuthRequest, Rejection> {
    match message_type(&value) {
        Some("auth") => {}
        other => return Err(Rejection::NotAuth(other.map(str::to_owned))),
    }
    let request: AuthRequest = serde_json::from_value(value).map_err(Rejection::Schema)?;
    request.validate()?;
    Ok(request)
}

/// Accept a frame from an authenticated turtle.
pub fn turtle_message(value: Value) -> Result<TurtleMessage, Rejection> {
    let message: TurtleMessage = serde_json::from_value(value).map_err(Rejection::Schema)?;
    if let TurtleMessage::Inventory(update) = &message {
        update.validate()?;
    }
    Ok(message)
}

/// Accept a frame from an authenticated dashboard.
pub fn observer_request(value: Value) -> Result<ObserverRequest, Rejection> {
    serde_json::from_value(value).map_err(Rejection::Schema)
}
