//! HTTP server - bind, serve, shut down on cancellation.

use crate::api::{build_router, AppState};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// HTTP server wrapping the app state.
#[derive(Debug)]
pub struct ApiServer {
    state: AppState,
    permissive_cors: bool,
    cancel: CancellationToken,
}

impl ApiServer {
    pub fn new(state: AppState, permissive_cors: bool) -> Self {
        Self {
            state,
            permissive_cors,
            cancel: CancellationToken::new(),
        }
    }

    /// Bind `addr` and serve until cancelled.
    pub async fn serve(&self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener (port 0 in tests).
    pub async fn serve_on(&self, listener: TcpListener) -> std::io::Result<()> {
        let local = listener.local_addr()?;
        tracing::info!(addr = %local, "HTTP API listening");

        let app = build_router(self.state.clone(), self.permissive_cors);
        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.clone().cancelled_owned())
            .await?;

        tracing::info!("HTTP API shut down");
        Ok(())
    }

    /// Token that stops the server when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
