//! Ingestion server
//!
//! The IngestionServer owns the listening socket and the shared
//! classification pipeline:
//!
//! ```text
//!                ┌──────────────────┐
//!  TCP clients ─►│ IngestionServer  │  accept loop (single task)
//!                └──────────────────┘
//!                         │ tokio::spawn per connection
//!          ┌──────────────┼──────────────┐
//!          ▼              ▼              ▼
//!  ┌──────────────┐ ┌──────────────┐ ┌──────────────┐
//!  │ Connection   │ │ Connection   │ │ Connection   │
//!  │ Handler      │ │ Handler      │ │ Handler      │
//!  └──────────────┘ └──────────────┘ └──────────────┘
//!          │              │              │
//!          └──────────────┼──────────────┘
//!                         ▼
//!              Arc<LineClassifier> (read-only)
//!                         │
//!              ┌──────────┴──────────┐
//!              ▼                     ▼
//!    Arc<dyn MembershipStore>  Arc<dyn VerdictSink>
//! ```
//!
//! ## Startup
//!
//! 1. One health check against the store (fatal on failure)
//! 2. Bind the listen address (fatal on failure)
//!
//! After startup, store outages degrade to fallback verdicts and accept
//! errors are logged; neither stops the server.

pub mod connection;

pub use connection::{CloseReason, ConnectionHandler, ConnectionState, ConnectionSummary};

use crate::classifier::LineClassifier;
use crate::config::TriageConfig;
use crate::error::{Error, Result};
use crate::resolver::MembershipResolver;
use crate::traits::{MembershipStore, VerdictSink};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::TcpListenerStream;
use tracing::{error, info};

/// TCP server feeding log lines into the classification pipeline
///
/// ## Lifecycle
///
/// 1. Create with [`IngestionServer::bind()`]
/// 2. Start with [`IngestionServer::run()`]
/// 3. The accept loop runs until the process is terminated
pub struct IngestionServer {
    /// Bound listening socket
    listener: TcpListener,

    /// Address actually bound (resolves port 0)
    local_addr: SocketAddr,

    /// Pipeline shared by all handlers
    classifier: Arc<LineClassifier>,

    /// Per-connection line limit
    max_line_bytes: usize,
}

impl IngestionServer {
    /// Verify the store, bind the listener and build the pipeline
    ///
    /// # Returns
    ///
    /// - `Ok(IngestionServer)`: Ready to accept connections
    /// - `Err(Error::Config)`: Invalid configuration
    /// - `Err(Error::StoreUnavailable)`: Initial health check failed
    /// - `Err(Error::Bind)`: The listen address could not be bound
    pub async fn bind(
        config: &TriageConfig,
        store: Arc<dyn MembershipStore>,
        sink: Arc<dyn VerdictSink>,
    ) -> Result<Self> {
        config.validate()?;

        store.health_check().await.map_err(|e| {
            Error::store_unavailable(format!("{} store: {}", store.store_name(), e))
        })?;
        info!("Successfully connected to {} membership store", store.store_name());

        let listen_addr = &config.server.listen_addr;
        let listener = TcpListener::bind(listen_addr)
            .await
            .map_err(|e| Error::bind(listen_addr.as_str(), e))?;
        let local_addr = listener.local_addr()?;

        let resolver = MembershipResolver::new(store, config.store.set_key.as_str(), &config.resolver);
        info!(
            set_key = %config.store.set_key,
            policy = %resolver.failure_policy(),
            "Membership resolver configured"
        );

        Ok(Self {
            listener,
            local_addr,
            classifier: Arc::new(LineClassifier::new(resolver, sink)),
            max_line_bytes: config.server.max_line_bytes,
        })
    }

    /// The address the server is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Run the accept loop forever
    pub async fn run(self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the accept loop until `shutdown_rx` fires (or its sender is dropped)
    ///
    /// Handlers already running are left to finish on their own.
    pub async fn run_with_shutdown(
        self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        let Self {
            listener,
            local_addr,
            classifier,
            max_line_bytes,
        } = self;

        info!("Waiting for log data on {}", local_addr);

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(shutdown);

        let mut incoming = TcpListenerStream::new(listener);

        loop {
            tokio::select! {
                accepted = incoming.next() => match accepted {
                    Some(Ok(stream)) => spawn_handler(&classifier, stream, max_line_bytes),
                    Some(Err(e)) => {
                        // Continue accepting despite errors
                        error!("Failed to accept connection: {}", e);
                    }
                    None => break,
                },

                _ = &mut shutdown => {
                    info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        Ok(())
    }
}

fn spawn_handler(classifier: &Arc<LineClassifier>, stream: TcpStream, max_line_bytes: usize) {
    let peer = stream.peer_addr().ok();
    let handler = ConnectionHandler::new(Arc::clone(classifier), peer, max_line_bytes);

    tokio::spawn(async move {
        handler.run(stream).await;
    });
}

impl std::fmt::Debug for IngestionServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionServer")
            .field("local_addr", &self.local_addr)
            .field("classifier", &self.classifier)
            .field("max_line_bytes", &self.max_line_bytes)
            .finish()
    }
}
