//! Bind and serve the HTTP surface.

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use chainstream_core::config::ServerConfig;

use crate::error::ServerError;
use crate::routes::router;
use crate::state::AppState;

/// Serve until `shutdown` is cancelled. Open SSE responses end when their
/// relays observe the same token.
pub async fn serve(
    config: &ServerConfig,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    tracing::info!(addr = %addr, "HTTP server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    tracing::info!("HTTP server stopped");
    Ok(())
}
