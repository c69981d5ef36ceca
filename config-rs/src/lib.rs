//! config-rs/lib.rs
//! Shared configuration for the ingestion worker.
//! Every setting comes from the environment (optionally seeded from a `.env`
//! file) and falls back to a sane default.

use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_KAFKA_BROKER: &str = "kafka:29092";
pub const DEFAULT_ANALYSIS_TOPIC: &str = "repo.analysis.ai";
pub const DEFAULT_REQUEST_TOPIC: &str = "repo.analysis.request";

/// Errors raised while assembling a [`WorkerConfig`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Output format for the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Logging settings handed to the subscriber bootstrap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

/// Remote platform settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubSettings {
    pub api_url: String,
    pub http_timeout: Duration,
    pub log_timeout: Duration,
}

/// Token bucket sizing for the request gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSettings {
    pub refill_per_sec: u32,
    pub burst: u32,
}

/// Transport metadata. The worker never talks to the broker itself; these
/// values are passed through to the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    pub broker: String,
    pub analysis_topic: String,
    pub request_topic: String,
    pub sink_url: Option<String>,
}

/// Complete worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub github: GitHubSettings,
    pub gate: GateSettings,
    pub parallelism: usize,
    pub job_buffer: usize,
    pub payload_warn_bytes: usize,
    pub transport: TransportSettings,
    pub database_url: Option<String>,
    pub logging: LoggingSettings,
    /// Values that were rejected and replaced by their default. Collected
    /// here because configuration is read before logging is initialized.
    pub notices: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            github: GitHubSettings {
                api_url: DEFAULT_GITHUB_API_URL.to_string(),
                http_timeout: Duration::from_secs(20),
                log_timeout: Duration::from_secs(40),
            },
            gate: GateSettings {
                refill_per_sec: 2,
                burst: 4,
            },
            parallelism: 2,
            job_buffer: 100,
            payload_warn_bytes: 1_000_000,
            transport: TransportSettings {
                broker: DEFAULT_KAFKA_BROKER.to_string(),
                analysis_topic: DEFAULT_ANALYSIS_TOPIC.to_string(),
                request_topic: DEFAULT_REQUEST_TOPIC.to_string(),
                sink_url: None,
            },
            database_url: None,
            logging: LoggingSettings {
                level: "info".to_string(),
                format: LogFormat::Text,
            },
            notices: Vec::new(),
        }
    }
}

impl WorkerConfig {
    /// Load `.env` (if present) and read the configuration from the process
    /// environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let mut notices = Vec::new();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            github: GitHubSettings {
                api_url: non_empty("GITHUB_API_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.github.api_url),
                http_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    &mut notices,
                    "GITHUB_HTTP_TIMEOUT_SECS",
                    defaults.github.http_timeout.as_secs(),
                )),
                log_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    &mut notices,
                    "GITHUB_LOG_TIMEOUT_SECS",
                    defaults.github.log_timeout.as_secs(),
                )),
            },
            gate: GateSettings {
                refill_per_sec: parse_or(&lookup, &mut notices, "GATE_REFILL_PER_SEC", defaults.gate.refill_per_sec),
                burst: parse_or(&lookup, &mut notices, "GATE_BURST", defaults.gate.burst),
            },
            parallelism: parse_or(&lookup, &mut notices, "WORKER_PARALLELISM", defaults.parallelism),
            job_buffer: parse_or(&lookup, &mut notices, "WORKER_JOB_BUFFER", defaults.job_buffer),
            payload_warn_bytes: parse_or(&lookup, &mut notices, "PAYLOAD_WARN_BYTES", defaults.payload_warn_bytes),
            transport: TransportSettings {
                broker: non_empty("KAFKA_BROKER").unwrap_or(defaults.transport.broker),
                analysis_topic: non_empty("ANALYSIS_TOPIC").unwrap_or(defaults.transport.analysis_topic),
                request_topic: non_empty("REQUEST_TOPIC").unwrap_or(defaults.transport.request_topic),
                sink_url: non_empty("ENVELOPE_SINK_URL"),
            },
            database_url: non_empty("DATABASE_URL"),
            logging: LoggingSettings {
                level: non_empty("LOG_LEVEL").unwrap_or(defaults.logging.level),
                format: match non_empty("LOG_FORMAT") {
                    Some(raw) => LogFormat::parse(&raw).unwrap_or_else(|| {
                        notices.push(format!("Unknown LOG_FORMAT '{}', using text", raw));
                        LogFormat::Text
                    }),
                    None => defaults.logging.format,
                },
            },
            notices,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.parallelism == 0 {
            return Err(ConfigError::Zero("WORKER_PARALLELISM"));
        }
        if self.job_buffer == 0 {
            return Err(ConfigError::Zero("WORKER_JOB_BUFFER"));
        }
        if self.gate.refill_per_sec == 0 {
            return Err(ConfigError::Zero("GATE_REFILL_PER_SEC"));
        }
        if self.gate.burst == 0 {
            return Err(ConfigError::Zero("GATE_BURST"));
        }
        Ok(())
    }
}

/// Parse a numeric variable, warning and falling back to the default when the
/// value is malformed
fn parse_or<F, T>(lookup: &F, notices: &mut Vec<String>, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + fmt::Display + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            notices.push(format!("Invalid value '{}' in {}, using default {}", raw, key, default));
            default
        }),
        None => default,
    }
}
