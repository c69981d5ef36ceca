//! Client builder implementation
//!
//! Provides the builder used to create authenticated `GitHubClient`s. A
//! process typically builds one `reqwest::Client` and hands it to every
//! per-request builder so that connections are pooled across requests.

use std::time::Duration;

use reqwest::Client as ReqwestClient;

use super::GitHubClient;
use crate::error::{Result, ServiceError};
use crate::services::common::{build_http_client, UserAgent};

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Builder for `GitHubClient`
pub struct ClientBuilder {
    /// Base URL of the REST API
    base_url: String,

    /// Access token sent as a bearer credential
    token: Option<String>,

    /// Timeout for regular API calls
    timeout: Duration,

    /// Timeout for log downloads
    log_timeout: Duration,

    /// User agent
    user_agent: Option<UserAgent>,

    /// Preconfigured HTTP client to reuse
    http_client: Option<ReqwestClient>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(20),
            log_timeout: Duration::from_secs(40),
            user_agent: None,
            http_client: None,
        }
    }
}

impl ClientBuilder {
    /// Create a new client builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL for the API
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the access token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the per-call timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the timeout used for CI log downloads
    pub fn log_timeout(mut self, timeout: Duration) -> Self {
        self.log_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: UserAgent) -> Self {
        self.user_agent = Some(user_agent);
        self
    }

    /// Reuse an existing HTTP client. Its own timeout and user agent apply.
    pub fn http_client(mut self, client: ReqwestClient) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<GitHubClient> {
        let token = self
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ServiceError::validation("access token is required"))?;

        if self.base_url.is_empty() {
            return Err(ServiceError::configuration("base URL must not be empty"));
        }

        let http = match self.http_client {
            Some(client) => client,
            None => build_http_client(self.user_agent, Some(self.timeout))?,
        };

        Ok(GitHubClient {
            http,
            base_url: self.base_url,
            token,
            log_timeout: self.log_timeout,
        })
    }
}
