//! Relay configuration.
//!
//! All configuration is loaded from environment variables. The relay needs
//! an address to listen on, the two shared secrets, and the delay before a
//! freshly connected dashboard receives its first digest list.

use std::net::SocketAddr;
use std::time::Duration;

use validator::{Validate, ValidationError};

/// Default delay before the first digest push, in milliseconds.
pub const DEFAULT_BASIC_STATES_DELAY_MS: u64 = 500;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5678;

/// Complete relay configuration.
#[derive(Clone, Validate)]
#[validate(schema(function = "validate_keys"))]
pub struct RelayConfig {
    /// Host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port to listen on.
    pub port: u16,
    /// Shared secret turtles authenticate with.
    #[validate(length(min = 1))]
    pub turtle_key: String,
    /// Shared secret dashboards authenticate with.
    #[validate(length(min = 1))]
    pub web_key: String,
    /// Delay between a dashboard's auth ack and its first digest list.
    pub basic_states_delay: Duration,
}

impl RelayConfig {
    /// A config with default address and delay.
    pub fn new(turtle_key: impl Into<String>, web_key: impl Into<String>) -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: DEFAULT_PORT,
            turtle_key: turtle_key.into(),
            web_key: web_key.into(),
            basic_states_delay: Duration::from_millis(DEFAULT_BASIC_STATES_DELAY_MS),
        }
    }

    /// Override the first-digest delay.
    #[must_use]
    pub const fn with_basic_states_delay(mut self, delay: Duration) -> Self {
        self.basic_states_delay = delay;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `TURTLE_TOKEN` -- secret turtles authenticate with
    /// - `WEB_TOKEN` -- secret dashboards authenticate with
    ///
    /// Optional variables:
    /// - `HOST` -- bind address (default `0.0.0.0`)
    /// - `PORT` -- listen port (default `5678`)
    /// - `BASIC_STATES_DELAY_MS` -- first digest delay (default `500`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing, a number
    /// does not parse, or the secrets are empty or identical.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`RelayConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let turtle_key = required("TURTLE_TOKEN")?;
        let web_key = required("WEB_TOKEN")?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned());

        let port: u16 = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Parse {
                name: "PORT",
                reason: format!("{e}"),
            })?,
            None => DEFAULT_PORT,
        };

        let delay_ms: u64 = match lookup("BASIC_STATES_DELAY_MS") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::Parse {
                name: "BASIC_STATES_DELAY_MS",
                reason: format!("{e}"),
            })?,
            None => DEFAULT_BASIC_STATES_DELAY_MS,
        };

        let config = Self {
            host,
            port,
            turtle_key,
            web_key,
            basic_states_delay: Duration::from_millis(delay_ms),
        };
        config.validate()?;
        Ok(config)
    }

    /// The address to bind.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Address`] if host and port do not form a
    /// socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Address(format!("{}:{}: {e}", self.host, self.port)))
    }
}

impl core::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("basic_states_delay", &self.basic_states_delay)
            .finish_non_exhaustive()
    }
}

/// A key that opened both roles would make every connection ambiguous.
fn validate_keys(config: &RelayConfig) -> Result<(), ValidationError> {
    if config.turtle_key == config.web_key {
        return Err(ValidationError::new("keys_must_differ"));
    }
    Ok(())
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required env var {0}")]
    Missing(&'static str),

    /// A variable is set but does not parse.
    #[error("invalid {name}: {reason}")]
    Parse {
        /// Variable name.
        name: &'static str,
        /// Parser message.
        reason: String,
    },

    /// Host and port do not form a socket address.
    #[error("invalid listen address {0}")]
    Address(String),

    /// A value breaks a validation rule.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}
