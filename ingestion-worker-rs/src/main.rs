// ingestion-worker-rs/src/main.rs
// Main entry point for the ingestion worker
// Reads newline-delimited requests from stdin and emits one envelope per
// processed repository

use std::sync::Arc;

use anyhow::Context;
use config_rs::WorkerConfig;
use github_sdk::RequestGate;
use ingestion_worker::logging::init_logging;
use ingestion_worker::transport::{
    EnvelopeSink, HttpEnvelopeSink, LineJobSource, MemoryStatusStore, PgStatusStore, StatusStore,
    StdoutEnvelopeSink,
};
use ingestion_worker::{Coordinator, CoordinatorSettings, WorkerPool};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env().context("invalid worker configuration")?;
    init_logging(&config.logging).context("failed to initialize logging")?;
    for notice in &config.notices {
        warn!("{}", notice);
    }

    info!(
        broker = %config.transport.broker,
        request_topic = %config.transport.request_topic,
        analysis_topic = %config.transport.analysis_topic,
        "ingestion worker starting"
    );

    let gate = Arc::new(RequestGate::new(config.gate.refill_per_sec, config.gate.burst)?);

    let status: Arc<dyn StatusStore> = match &config.database_url {
        Some(url) => Arc::new(PgStatusStore::connect(url).await.context("status database unavailable")?),
        None => {
            warn!("DATABASE_URL not set, repository status is kept in memory only");
            Arc::new(MemoryStatusStore::new())
        }
    };

    let sink: Arc<dyn EnvelopeSink> = match &config.transport.sink_url {
        Some(url) => Arc::new(HttpEnvelopeSink::new(
            url.as_str(),
            config.transport.analysis_topic.as_str(),
            config.github.http_timeout,
        )?),
        None => Arc::new(StdoutEnvelopeSink::new(config.transport.analysis_topic.as_str())),
    };

    let coordinator = Arc::new(Coordinator::new(CoordinatorSettings::from(&config), gate, sink, status)?);

    let cancel = CancellationToken::new();
    let source = LineJobSource::new(BufReader::new(tokio::io::stdin()));
    let pool = WorkerPool::spawn(source, coordinator, config.parallelism, config.job_buffer, cancel.clone());
    let mut pool_done = tokio::spawn(pool.join());

    tokio::select! {
        _ = shutdown_signal() => {
            info!("shutdown signal received");
            cancel.cancel();
            pool_done.await?;
        }
        joined = &mut pool_done => joined?,
    }

    info!("ingestion worker stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
