//! HTTP/1 accept loop.

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};

use crate::state::AppState;

use super::responder;

/// The proxy server: one spawned task per connection, shared `AppState`.
pub struct ProxyServer {
    listen_addr: SocketAddr,
    state: Arc<AppState>,
}

impl ProxyServer {
    pub fn new(listen_addr: SocketAddr, state: Arc<AppState>) -> Self {
        Self { listen_addr, state }
    }

    /// Bind and serve until the task is dropped.
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.listen_addr).await?;
        log::info!("cipherproxy listening on {}", self.listen_addr);

        loop {
            let (stream, addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    log::error!("failed to accept connection: {}", e);
                    continue;
                }
            };

            // Media streaming is latency-sensitive; disable Nagle.
            if let Err(e) = stream.set_nodelay(true) {
                log::warn!("failed to set TCP_NODELAY for {}: {}", addr, e);
            }

            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                Self::serve_connection(stream, addr, state).await;
            });
        }
    }

    async fn serve_connection(stream: TcpStream, addr: SocketAddr, state: Arc<AppState>) {
        let io = TokioIo::new(stream);
        let service = service_fn(move |req| {
            let state = Arc::clone(&state);
            async move { responder::handle_request(req, state).await }
        });

        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
            // A consumer abandoning a media stream mid-body is routine,
            // not an error worth alerting on.
            let msg = err.to_string();
            if err.is_canceled()
                || msg.contains("connection closed")
                || msg.contains("broken pipe")
                || msg.contains("reset by peer")
            {
                log::debug!("client disconnected from {}: {}", addr, err);
            } else {
                log::error!("error serving connection from {}: {}", addr, err);
            }
        }
    }
}
