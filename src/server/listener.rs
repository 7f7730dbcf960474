//! Signaling server listener
//!
//! Handles the TCP accept loop and spawns one driver task per WebSocket
//! connection. The listener also owns the shared directories and hands
//! them to the lifecycle manager at construction time.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::registry::{ConnectionId, ConnectionRegistry, IdentityDirectory, RoomDirectory};
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::server::sink::PeerSockets;
use crate::session::LifecycleManager;
use crate::stats::ServerStats;

/// WebSocket signaling relay server
pub struct SignalServer {
    config: ServerConfig,
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<RoomDirectory>,
    identities: Arc<IdentityDirectory>,
    sockets: Arc<PeerSockets>,
    lifecycle: Arc<LifecycleManager<PeerSockets>>,
    stats: Arc<ServerStats>,
    next_connection_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl SignalServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = Arc::new(RoomDirectory::new(Arc::clone(&registry)));
        let identities = Arc::new(IdentityDirectory::new());
        let sockets = Arc::new(PeerSockets::new());
        let stats = Arc::new(ServerStats::new());

        let lifecycle = Arc::new(LifecycleManager::new(
            Arc::clone(&registry),
            Arc::clone(&rooms),
            Arc::clone(&identities),
            Arc::clone(&sockets),
            Arc::clone(&stats),
        ));

        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            registry,
            rooms,
            identities,
            sockets,
            lifecycle,
            stats,
            next_connection_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Get a reference to the connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Get a reference to the room directory
    pub fn rooms(&self) -> &Arc<RoomDirectory> {
        &self.rooms
    }

    /// Get a reference to the identity directory
    pub fn identities(&self) -> &Arc<IdentityDirectory> {
        &self.identities
    }

    /// Get a reference to the server counters
    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Signaling server listening");

        self.accept_loop(&listener).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Signaling server listening");

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        }
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    async fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let id = ConnectionId(self.next_connection_id.fetch_add(1, Ordering::Relaxed));

        tracing::debug!(connection = %id, peer = %peer_addr, "New connection");

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }

        let config = self.config.clone();
        let lifecycle = Arc::clone(&self.lifecycle);
        let sockets = Arc::clone(&self.sockets);
        let stats = Arc::clone(&self.stats);

        stats.connection_opened();
        tokio::spawn(async move {
            // Held for the lifetime of the connection task
            let _permit = permit;

            let connection = Connection::new(id, peer_addr, config, lifecycle, sockets);
            if let Err(e) = connection.run(socket).await {
                tracing::debug!(connection = %id, error = %e, "Connection error");
            }

            stats.connection_closed();
            tracing::debug!(connection = %id, "Connection closed");
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
