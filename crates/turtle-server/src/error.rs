//! Error types for the relay binary.

/// Top-level error for the relay binary.
///
/// Each variant wraps a library error so `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: turtle_relay::ConfigError,
    },

    /// The server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: turtle_relay::ServerError,
    },
}
