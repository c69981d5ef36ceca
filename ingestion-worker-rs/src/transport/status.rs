// ingestion-worker-rs/src/transport/status.rs
//
// Repository status store
// Provides:
// - the StatusStore boundary used by the coordinator
// - a PostgreSQL backend writing the `repositories` table
// - an in-memory backend recording every transition

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::model::RepoStatus;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn update_status(&self, repo: &str, status: RepoStatus) -> Result<(), StatusError>;

    /// Set FAILED and record the failure message
    async fn mark_failed(&self, repo: &str, message: &str) -> Result<(), StatusError>;
}

/// PostgreSQL status store
pub struct PgStatusStore {
    pool: PgPool,
}

impl PgStatusStore {
    pub async fn connect(database_url: &str) -> Result<Self, StatusError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        info!("connected to status database");
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool, e.g. one shared with other stores
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusStore for PgStatusStore {
    async fn update_status(&self, repo: &str, status: RepoStatus) -> Result<(), StatusError> {
        sqlx::query(
            r#"
            UPDATE repositories
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(status.as_str())
        .bind(repo)
        .execute(&self.pool)
        .await?;

        debug!("status for {} set to {}", repo, status);
        Ok(())
    }

    async fn mark_failed(&self, repo: &str, message: &str) -> Result<(), StatusError> {
        sqlx::query(
            r#"
            UPDATE repositories
            SET status = $1, error = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(RepoStatus::Failed.as_str())
        .bind(message)
        .bind(repo)
        .execute(&self.pool)
        .await?;

        debug!("{} marked failed", repo);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub repo: String,
    pub status: RepoStatus,
    pub error: Option<String>,
}

/// In-memory status store keeping the full transition history
#[derive(Default)]
pub struct MemoryStatusStore {
    transitions: RwLock<Vec<StatusTransition>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn transitions(&self) -> Vec<StatusTransition> {
        self.transitions.read().await.clone()
    }

    /// Statuses recorded for one repository, oldest first
    pub async fn history(&self, repo: &str) -> Vec<RepoStatus> {
        self.transitions
            .read()
            .await
            .iter()
            .filter(|t| t.repo == repo)
            .map(|t| t.status)
            .collect()
    }

    pub async fn current(&self, repo: &str) -> Option<RepoStatus> {
        self.history(repo).await.last().copied()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn update_status(&self, repo: &str, status: RepoStatus) -> Result<(), StatusError> {
        self.transitions.write().await.push(StatusTransition {
            repo: repo.to_string(),
            status,
            error: None,
        });
        Ok(())
    }

    async fn mark_failed(&self, repo: &str, message: &str) -> Result<(), StatusError> {
        self.transitions.write().await.push(StatusTransition {
            repo: repo.to_string(),
            status: RepoStatus::Failed,
            error: Some(message.to_string()),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_history() {
        let store = MemoryStatusStore::new();
        store.update_status("octo/widgets", RepoStatus::Fetching).await.unwrap();
        store.mark_failed("octo/widgets", "boom").await.unwrap();
        store.update_status("octo/other", RepoStatus::Queued).await.unwrap();

        assert_eq!(
            store.history("octo/widgets").await,
            vec![RepoStatus::Fetching, RepoStatus::Failed]
        );
        assert_eq!(store.current("octo/other").await, Some(RepoStatus::Queued));
        assert_eq!(store.transitions().await[1].error.as_deref(), Some("boom"));
    }
}
