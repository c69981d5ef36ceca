// ingestion-worker-rs/src/transport/sink.rs
//
// Envelope emission sinks. `deliver` returning Ok is the delivery
// confirmation the coordinator waits for before marking a repository QUEUED.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("delivery rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for SinkError {
    fn from(err: reqwest::Error) -> Self {
        SinkError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub destination: String,
    pub bytes: usize,
}

#[async_trait]
pub trait EnvelopeSink: Send + Sync {
    async fn deliver(&self, payload: &[u8]) -> Result<DeliveryReceipt, SinkError>;
}

/// POSTs each envelope to an HTTP endpoint; any 2xx confirms delivery
pub struct HttpEnvelopeSink {
    client: reqwest::Client,
    url: String,
    topic: String,
}

impl HttpEnvelopeSink {
    pub fn new(url: impl Into<String>, topic: impl Into<String>, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            topic: topic.into(),
        })
    }
}

#[async_trait]
impl EnvelopeSink for HttpEnvelopeSink {
    async fn deliver(&self, payload: &[u8]) -> Result<DeliveryReceipt, SinkError> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("X-Topic", &self.topic)
            .body(payload.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        debug!("envelope delivered to {} [{}]", self.url, self.topic);
        Ok(DeliveryReceipt {
            destination: self.topic.clone(),
            bytes: payload.len(),
        })
    }
}

/// Writes one JSON line per envelope to stdout
pub struct StdoutEnvelopeSink {
    topic: String,
    out: Mutex<tokio::io::Stdout>,
}

impl StdoutEnvelopeSink {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            out: Mutex::new(tokio::io::stdout()),
        }
    }
}

#[async_trait]
impl EnvelopeSink for StdoutEnvelopeSink {
    async fn deliver(&self, payload: &[u8]) -> Result<DeliveryReceipt, SinkError> {
        let mut out = self.out.lock().await;
        out.write_all(payload).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;

        Ok(DeliveryReceipt {
            destination: self.topic.clone(),
            bytes: payload.len(),
        })
    }
}

/// Keeps delivered envelopes in memory
#[derive(Default)]
pub struct MemoryEnvelopeSink {
    delivered: Mutex<Vec<Vec<u8>>>,
    reject: AtomicBool,
}

impl MemoryEnvelopeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that refuses every delivery
    pub fn rejecting() -> Self {
        let sink = Self::default();
        sink.reject.store(true, Ordering::SeqCst);
        sink
    }

    pub async fn delivered(&self) -> Vec<Vec<u8>> {
        self.delivered.lock().await.clone()
    }

    /// Delivered payloads decoded as JSON
    pub async fn envelopes(&self) -> Vec<serde_json::Value> {
        self.delivered
            .lock()
            .await
            .iter()
            .filter_map(|p| serde_json::from_slice(p).ok())
            .collect()
    }
}

#[async_trait]
impl EnvelopeSink for MemoryEnvelopeSink {
    async fn deliver(&self, payload: &[u8]) -> Result<DeliveryReceipt, SinkError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(SinkError::Transport("sink is rejecting deliveries".into()));
        }
        self.delivered.lock().await.push(payload.to_vec());
        Ok(DeliveryReceipt {
            destination: "memory".into(),
            bytes: payload.len(),
        })
    }
}
