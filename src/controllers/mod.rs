//! Локальный HTTP-приёмник, на который платёжный шлюз возвращает браузер.

pub mod payment;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::services::payment::GatewayReturn;
pub use payment::CallbackState;

pub fn routes(return_path: &str) -> Router<Arc<CallbackState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route(return_path, get(payment::gateway_return))
}

/// Запущенный приёмник. Остановка — [`CallbackServer::shutdown`] или drop.
pub struct CallbackServer {
    pub local_addr: SocketAddr,
    pub returns: mpsc::Receiver<GatewayReturn>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl CallbackServer {
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            error!("Callback server task failed: {}", e);
        }
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn serve_callback(addr: SocketAddr, return_path: &str) -> std::io::Result<CallbackServer> {
    let (tx, rx) = mpsc::channel(8);
    let state = Arc::new(CallbackState { returns: tx });

    let app = routes(return_path)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!("Payment return listener on http://{}{}", local_addr, return_path);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let server = axum::serve(listener, app.into_make_service()).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        if let Err(e) = server.await {
            error!("Callback server error: {}", e);
        }
    });

    Ok(CallbackServer {
        local_addr,
        returns: rx,
        shutdown_tx: Some(shutdown_tx),
        handle,
    })
}
