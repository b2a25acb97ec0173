//! Status server lifecycle.

use crate::config::StatusConfig;
use crate::routes::router;
use std::io;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Serves the status routes until `cancel` fires.
pub async fn serve(config: &StatusConfig, cancel: CancellationToken) -> io::Result<()> {
    let addr = config
        .addr()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let listener = TcpListener::bind(addr).await?;

    info!(addr = %addr, "Status server listening");

    axum::serve(listener, router())
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    info!("Status server stopped");
    Ok(())
}
