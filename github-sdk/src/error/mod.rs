//! Error handling for the GitHub SDK
//!
//! This module provides the error system shared by every remote call:
//! - Categorizes errors by type (network, auth, rate limit, not found, etc.)
//! - Attaches context (endpoint, HTTP status) for debugging
//! - Maps GitHub error bodies to normalized variants
//! - Provides a convenient Result type alias

use std::fmt;
use std::collections::HashMap;
use thiserror::Error;

pub mod mapping;

/// Result type for GitHub SDK operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Main error type for the GitHub SDK
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Network or connection errors
    #[error("Network error: {0}")]
    Network(String),

    /// Bad or missing credentials
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Credential lacks access to the resource
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Upstream rate limit hit
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other upstream failures
    #[error("Service error: {0}")]
    Service(String),

    /// Invalid input supplied by the caller
    #[error("Validation error: {0}")]
    Validation(String),

    /// Response could not be decoded
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// Client misconfiguration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Request exceeded its deadline
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// A wait was abandoned because its owner was cancelled
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Errors with additional context
    #[error("{inner}")]
    WithContext {
        inner: Box<ServiceError>,
        context: ErrorContext,
    },
}

impl ServiceError {
    pub fn network(message: impl Into<String>) -> Self {
        ServiceError::Network(message.into())
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        ServiceError::Authentication(message.into())
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        ServiceError::Authorization(message.into())
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        ServiceError::RateLimit(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn service(message: impl Into<String>) -> Self {
        ServiceError::Service(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn parsing(message: impl Into<String>) -> Self {
        ServiceError::Parsing(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        ServiceError::Configuration(message.into())
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        ServiceError::Timeout(message.into())
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        ServiceError::Cancelled(message.into())
    }

    /// Add context to an existing error
    pub fn with_context(self, context: ErrorContext) -> Self {
        ServiceError::WithContext {
            inner: Box::new(self),
            context,
        }
    }

    /// The error with any context wrappers peeled off
    pub fn root(&self) -> &ServiceError {
        match self {
            ServiceError::WithContext { inner, .. } => inner.root(),
            other => other,
        }
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceError::WithContext { context, inner } => {
                context.status_code.or_else(|| inner.status_code())
            }
            _ => None,
        }
    }

    /// Get the endpoint that failed if available
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ServiceError::WithContext { context, .. } => context.endpoint.as_deref(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), ServiceError::NotFound(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), ServiceError::Cancelled(_))
    }
}

/// Error context information
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Service that generated the error
    pub service: String,

    /// HTTP status code if applicable
    pub status_code: Option<u16>,

    /// Endpoint that was called
    pub endpoint: Option<String>,

    /// Additional context data
    pub data: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            service: "github".to_string(),
            status_code: None,
            endpoint: None,
            data: HashMap::new(),
        }
    }
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new error context for a specific service
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Add a context value
    pub fn add<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: fmt::Display,
    {
        self.data.insert(key.into(), value.to_string());
    }
}

/// Convert reqwest errors to ServiceError
impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        let mut context = ErrorContext::for_service("http_client");
        if let Some(url) = err.url() {
            context = context.endpoint(url.path());
        }

        let service_error = if err.is_timeout() {
            ServiceError::timeout(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            ServiceError::network(format!("Connection error: {}", err))
        } else if err.is_redirect() {
            ServiceError::network(format!("Too many redirects: {}", err))
        } else if err.is_decode() {
            ServiceError::parsing(format!("Response decode error: {}", err))
        } else if err.is_request() {
            ServiceError::network(format!("Request failed: {}", err))
        } else {
            ServiceError::service(format!("HTTP client error: {}", err))
        };

        if let Some(status) = err.status() {
            service_error.with_context(context.status_code(status.as_u16()))
        } else {
            service_error.with_context(context)
        }
    }
}

/// Convert serde_json errors to ServiceError
impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::parsing(format!("JSON error: {}", err))
            .with_context(ErrorContext::for_service("json"))
    }
}
