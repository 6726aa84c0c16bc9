//! HTTP server and graceful shutdown.
//!
//! Each accepted socket gets its own task running a hyper connection (HTTP/1
//! or HTTP/2, auto-detected). Request bodies are collected in full before the
//! router sees them. Once SIGTERM or Ctrl-C arrives the listener is dropped
//! and [`Server::serve`] waits for the open connections to finish.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::router::Router;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use httpx::Server;
    ///
    /// assert!(Server::bind("0.0.0.0:3000").is_ok());
    /// assert!(Server::bind("not an address").is_err());
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        Ok(Self { addr: addr.parse()? })
    }

    /// Accepts connections and answers them through `router` until a
    /// shutdown signal arrives, then drains the open connections.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let router = Arc::new(router);
        let mut connections = JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        info!(addr = %self.addr, "httpx listening");

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => break,

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(serve_connection(Arc::clone(&router), stream, peer));
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                },

                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        drop(listener);
        info!(open = connections.len(), "shutting down, waiting for open connections");
        while connections.join_next().await.is_some() {}

        info!("httpx stopped");
        Ok(())
    }
}

/// Runs one connection to completion.
async fn serve_connection(router: Arc<Router>, stream: TcpStream, peer: SocketAddr) {
    let service = service_fn(move |req: hyper::Request<Incoming>| {
        let router = Arc::clone(&router);
        async move {
            let (parts, body) = req.into_parts();
            let response = match body.collect().await {
                Ok(body) => router.call(http::Request::from_parts(parts, body.to_bytes())).await,
                Err(e) => {
                    warn!(%peer, path = %parts.uri.path(), error = %e, "request body unreadable");
                    bad_request()
                }
            };
            Ok::<_, Infallible>(response)
        }
    });

    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(stream), service)
        .await
    {
        debug!(%peer, error = %e, "connection closed with error");
    }
}

fn bad_request() -> http::Response<Full<Bytes>> {
    let mut response = http::Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response
}

/// Completes on Ctrl-C or, on Unix, SIGTERM. A signal that cannot be
/// listened for is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Ctrl-C received"),
        () = terminate => info!("SIGTERM received"),
    }
}
