//! `chainstream run` — wire the pipeline together and serve until a signal.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use chainstream_core::config::{DurableLogConfig, LogBackend};
use chainstream_core::{ChainSource, ChainStreamConfig};
use chainstream_log::{DurableLog, MemoryLog, Retention};
use chainstream_poller::Poller;
use chainstream_rpc::{HttpTransport, RpcChainSource};
use chainstream_server::{AppState, FanoutBridge};

pub async fn run(config: ChainStreamConfig) -> Result<()> {
    let transport = HttpTransport::new(
        config.rpc.url.clone(),
        Duration::from_millis(config.rpc.request_timeout_ms),
    )?;
    let source: Arc<dyn ChainSource> = Arc::new(RpcChainSource::new(transport));

    // An unreachable upstream at startup is fatal.
    let chain_id = source
        .chain_id()
        .await
        .with_context(|| format!("upstream {} unreachable", config.rpc.url))?;
    tracing::info!(chain_id, url = %config.rpc.url, "upstream reachable");

    let log = open_log(&config.log).await?;
    tracing::info!(
        backend = log.backend(),
        max_age_secs = config.log.max_age_secs,
        max_messages = config.log.max_messages,
        "durable log ready"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let poller = Poller::spawn(
        &config.poller,
        Arc::clone(&source),
        Arc::clone(&log),
        shutdown.clone(),
    );

    let bridge = FanoutBridge::from_config(&config.server, log, shutdown.clone());
    let state = AppState::new(bridge, &config.server, Retention::from(&config.log));
    let served = chainstream_server::serve(&config.server, state, shutdown.clone()).await;

    // The server may have stopped on its own (bind failure); stop the jobs too.
    shutdown.cancel();
    for stats in poller.join(config.shutdown_grace()).await {
        tracing::info!(
            kind = stats.kind.tag(),
            ticks = stats.ticks,
            published = stats.published,
            skipped = stats.skipped,
            upstream_errors = stats.upstream_errors,
            publish_errors = stats.publish_errors,
            "poll job summary"
        );
    }

    served.context("HTTP server failed")?;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn open_log(config: &DurableLogConfig) -> Result<Arc<dyn DurableLog>> {
    let retention = Retention::from(config);
    match config.backend {
        LogBackend::Memory => Ok(Arc::new(MemoryLog::new(retention))),
        #[cfg(feature = "redis")]
        LogBackend::Redis => {
            let log = chainstream_log::RedisLog::connect(&config.redis_url, retention)
                .await
                .with_context(|| format!("log backend {} unreachable", config.redis_url))?;
            Ok(Arc::new(log))
        }
        #[cfg(not(feature = "redis"))]
        LogBackend::Redis => anyhow::bail!(
            "log backend `redis` requested but this binary was built without the `redis` feature"
        ),
    }
}

async fn cancel_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c; shutting down"),
        _ = terminate => tracing::info!("received SIGTERM; shutting down"),
        _ = shutdown.cancelled() => return,
    }
    shutdown.cancel();
}
