//! First-frame authentication.
//!
//! Every new connection must open with `{"type":"auth","key":...}`. The key
//! is compared against the two shared secrets: the turtle secret admits an
//! agent (which must also send its numeric `id`), the web secret admits a
//! dashboard. Anything else is a failure and the connection is closed.

use turtle_types::validate::{self, Rejection};
use turtle_types::{Role, TurtleId};

/// How an accepted connection will be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A turtle with the given id.
    Agent(TurtleId),
    /// A dashboard.
    Observer,
}

impl Admission {
    /// The role this admission grants.
    pub const fn role(self) -> Role {
        match self {
            Self::Agent(_) => Role::Agent,
            Self::Observer => Role::Observer,
        }
    }
}

/// Why a first frame did not authenticate.
#[derive(Debug, thiserror::Error)]
pub enum AuthFailure {
    /// The frame was not a well-formed auth message.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// The key matched neither secret.
    #[error("unknown key")]
    UnknownKey,

    /// The turtle secret was used without an `id`.
    #[error("turtle auth without an id")]
    MissingTurtleId,
}

/// Shared-secret check for first frames.
#[derive(Clone)]
pub struct AuthGate {
    agent_key: String,
    observer_key: String,
}

impl AuthGate {
    /// A gate admitting turtles with `agent_key` and dashboards with
    /// `observer_key`.
    pub fn new(agent_key: impl Into<String>, observer_key: impl Into<String>) -> Self {
        Self {
            agent_key: agent_key.into(),
            observer_key: observer_key.into(),
        }
    }

    /// Classify the first text frame of a connection.
    pub fn classify(&self, text: &str) -> Result<Admission, AuthFailure> {
        let value = validate::decode_frame(text)?;
        let request = validate::auth_request(value)?;

        if request.key == self.agent_key {
            request
                .id
                .map(Admission::Agent)
                .ok_or(AuthFailure::MissingTurtleId)
        } else if request.key == self.observer_key {
            Ok(Admission::Observer)
        } else {
            Err(AuthFailure::UnknownKey)
        }
    }
}

impl core::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthGate").finish_non_exhaustive()
    }
}
