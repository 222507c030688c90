//! Relay entry point.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from environment variables
//! 3. Serve the relay until `Ctrl-C`

mod error;

use tracing::info;
use tracing_subscriber::EnvFilter;
use turtle_relay::RelayConfig;

use crate::error::AppError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the server fails.
#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_logging();

    info!("turtle-server starting");

    let config = RelayConfig::from_env()?;
    info!(
        host = config.host,
        port = config.port,
        basic_states_delay = ?config.basic_states_delay,
        "configuration loaded"
    );

    turtle_relay::start_server(&config).await?;

    info!("turtle-server shutdown complete");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` sets the filter (default
/// `info`); `LOG_FORMAT=json` switches to one JSON object per line.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
