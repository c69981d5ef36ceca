//! # Structured Logging
//!
//! Installs the global tracing subscriber: an `EnvFilter` (`RUST_LOG` wins
//! over the configured level) and either a human-readable or a JSON `fmt`
//! layer. Records emitted through the `log` facade are bridged in.

use std::sync::atomic::{AtomicBool, Ordering};

use config_rs::{LogFormat, LoggingSettings};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

// Flag to track if logging has been initialized
static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

pub fn init_logging(settings: &LoggingSettings) -> Result<(), TryInitError> {
    if LOGGING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx=warn,hyper=warn", settings.level)));

    let subscriber = Registry::default().with(filter);

    // stdout is reserved for emitted envelopes. The JSON and text layers have
    // distinct types, so each branch installs its own subscriber.
    match settings.format {
        LogFormat::Json => subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_target(true)
                    .with_span_list(true),
            )
            .try_init(),
        LogFormat::Text => subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init(),
    }
}
