//! Core client for the GitHub SDK
//!
//! `GitHubClient` owns an authenticated HTTP client and executes raw GET
//! requests against the REST API. The typed endpoint groups in `services`
//! are implemented on top of the three executor methods here.

pub mod builder;
pub use builder::ClientBuilder;

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::mapping::classify_http_error;
use crate::error::{Result, ServiceError};
use crate::services::common::parse_error_response;

/// Media type for regular JSON responses
pub const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Media type for unified diffs
pub const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";

const API_VERSION: &str = "2022-11-28";

/// Authenticated GitHub REST client
#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
    base_url: String,
    token: String,
    log_timeout: Duration,
}

impl fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .field("log_timeout", &self.log_timeout)
            .finish()
    }
}

impl GitHubClient {
    /// Create a new builder for the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, path: &str, accept: &str) -> RequestBuilder {
        self.http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .header(ACCEPT, accept)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send(&self, path: &str, builder: RequestBuilder) -> Result<Response> {
        let start = Instant::now();
        let response = builder.send().await.map_err(ServiceError::from)?;
        let status = response.status();

        debug!(
            "GET {} -> {} in {:.1}ms",
            path,
            status.as_u16(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        if status.is_success() {
            Ok(response)
        } else {
            warn!("GitHub call {} failed with {} ({})", path, status, classify_http_error(status));
            Err(parse_error_response(path, response).await)
        }
    }

    /// Execute a GET request and decode the JSON body
    pub async fn get_json<R>(&self, path: &str, query: &[(&str, String)]) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let builder = self.request(path, JSON_MEDIA_TYPE).query(query);
        let response = self.send(path, builder).await?;
        let bytes = response.bytes().await.map_err(ServiceError::from)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ServiceError::parsing(format!("Failed to parse response from {}: {}", path, e))
        })
    }

    /// Execute a GET request for a non-JSON representation, e.g. a diff
    pub async fn get_text(&self, path: &str, accept: &str) -> Result<String> {
        let builder = self.request(path, accept);
        let response = self.send(path, builder).await?;
        response.text().await.map_err(ServiceError::from)
    }

    /// Download a binary payload with the longer log timeout. Redirects to
    /// blob storage are followed by the HTTP client.
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let builder = self.request(path, JSON_MEDIA_TYPE).timeout(self.log_timeout);
        let response = self.send(path, builder).await?;
        let bytes = response.bytes().await.map_err(ServiceError::from)?;
        Ok(bytes.to_vec())
    }
}
