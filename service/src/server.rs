//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Gateway server implementation
//!
//! The GatewayServer is the main entry point. It binds the listening
//! socket, accepts connections on a dedicated task, and hands each
//! accepted socket to the ConnectionManager. Acceptance and per-connection
//! I/O are decoupled: a busy connection can never starve the accept loop
//! and vice versa.

use crate::{
    ConnectionManager, ConnectionRegistry, GatewayError, Result, ServerConfig, ServerMetrics,
    ServerSnapshot, WorkerConfig,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::GatewayHandler;

/// Bind a TCP listener with explicit backlog and keep-alive options.
///
/// `tokio::net::TcpListener::bind` does not expose the listen backlog, so
/// the socket is built with socket2 and converted. Bind failure is fatal:
/// the server cannot start without its listening socket.
fn bind_listener(config: &ServerConfig) -> Result<TcpListener> {
    let addr = config.bind_address;
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    if config.keepalive {
        socket.set_keepalive(true)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(config.backlog as i32)?;

    Ok(TcpListener::from_std(socket.into())?)
}

/// Gateway server
///
/// Accepts connections and manages their lifecycle.
///
/// # Example
///
/// ```no_run
/// use wiregate_service::{AckHandler, GatewayServer, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ServerConfig::default();
///     let server = GatewayServer::new(config).await?;
///
///     server.start(std::sync::Arc::new(AckHandler)).await?;
///
///     // Server is now running, wait for shutdown signal
///     // tokio::signal::ctrl_c().await?;
///     server.shutdown().await?;
///
///     Ok(())
/// }
/// ```
pub struct GatewayServer {
    /// Server configuration
    config: ServerConfig,
    /// Connection manager
    manager: Arc<ConnectionManager>,
    /// Server metrics
    metrics: Arc<ServerMetrics>,
    /// TCP listener (taken by the accept loop on start)
    listener: tokio::sync::Mutex<Option<TcpListener>>,
    /// Actual bind address
    bind_address: SocketAddr,
    /// Server start time
    started_at: Instant,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Shutdown notification
    shutdown_notify: Arc<Notify>,
    /// Accept loop task handle
    accept_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl GatewayServer {
    /// Create a new server with the given configuration
    ///
    /// This binds to the configured address but does not start accepting
    /// connections. Call `start()` to begin accepting connections.
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let listener = bind_listener(&config)?;
        let actual_addr = listener.local_addr()?;

        let metrics = Arc::new(ServerMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new(config.registry_policy));

        let worker_config = WorkerConfig {
            idle: config.idle,
            control_buffer_size: config.control_buffer_size,
        };

        let manager = Arc::new(ConnectionManager::new(
            registry,
            metrics.clone(),
            config.framing,
            worker_config,
            config.max_connections,
        ));

        info!(
            addr = %actual_addr,
            scheme = %config.framing,
            "Gateway server bound"
        );

        Ok(Self {
            config,
            manager,
            metrics,
            listener: tokio::sync::Mutex::new(Some(listener)),
            bind_address: actual_addr,
            started_at: Instant::now(),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
            accept_handle: tokio::sync::Mutex::new(None),
        })
    }

    /// Start the server with the given handler
    ///
    /// This begins accepting connections on a dedicated task. The server
    /// will continue running until `shutdown()` is called.
    pub async fn start(&self, handler: Arc<dyn GatewayHandler>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(GatewayError::Other("Server already running".to_string()));
        }

        let listener = self
            .listener
            .lock()
            .await
            .take()
            .ok_or_else(|| GatewayError::Other("Listener already consumed".to_string()))?;

        info!(addr = %self.bind_address, "Starting gateway server");

        let handle = self.spawn_accept_loop(listener, handler);
        *self.accept_handle.lock().await = Some(handle);

        Ok(())
    }

    /// Spawn the accept loop task
    fn spawn_accept_loop(
        &self,
        listener: TcpListener,
        handler: Arc<dyn GatewayHandler>,
    ) -> JoinHandle<()> {
        let manager = self.manager.clone();
        let metrics = self.metrics.clone();
        let config = self.config.clone();
        let running = self.running.clone();
        let shutdown_notify = self.shutdown_notify.clone();

        tokio::spawn(async move {
            loop {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let accept_result = tokio::select! {
                    result = listener.accept() => result,
                    _ = shutdown_notify.notified() => break,
                };

                match accept_result {
                    Ok((socket, peer_addr)) => {
                        debug!(peer_addr = %peer_addr, "Accepted connection");

                        if config.nodelay {
                            if let Err(e) = socket.set_nodelay(true) {
                                warn!(peer_addr = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
                            }
                        }

                        // The manager enforces the connection limit;
                        // rejection drops the socket.
                        match manager.add_connection(socket, handler.clone()) {
                            Ok(id) => {
                                info!(
                                    connection_id = %id,
                                    peer_addr = %peer_addr,
                                    "Connection established"
                                );
                            }
                            Err(e) => {
                                warn!(peer_addr = %peer_addr, error = %e, "Connection rejected");
                                metrics.connection_error();
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                        metrics.connection_error();

                        // Back off on errors to avoid a tight loop
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    }
                }
            }

            info!("Accept loop terminated");
        })
    }

    /// Shutdown the server gracefully
    ///
    /// This stops accepting new connections and waits for existing
    /// connections to close.
    pub async fn shutdown(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(GatewayError::ServerNotRunning);
        }

        info!("Shutting down gateway server");

        self.shutdown_notify.notify_waiters();

        if let Some(handle) = self.accept_handle.lock().await.take() {
            let _ = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
        }

        self.manager.shutdown().await;

        info!("Gateway server shutdown complete");

        Ok(())
    }

    /// Check if the server is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the server's bind address
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Get the number of active connections
    pub fn connection_count(&self) -> usize {
        self.manager.connection_count()
    }

    /// Get a snapshot of the server state
    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            active_connections: self.manager.connection_count(),
            total_connections: self.metrics.total_connections(),
            bind_address: self.bind_address(),
            uptime: self.started_at.elapsed(),
            started_at: self.started_at,
        }
    }

    /// Get the server metrics
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }

    /// Get the connection manager
    pub fn manager(&self) -> Arc<ConnectionManager> {
        self.manager.clone()
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayServer")
            .field("bind_address", &self.bind_address())
            .field("running", &self.is_running())
            .field("connection_count", &self.connection_count())
            .field("uptime", &self.started_at.elapsed())
            .finish()
    }
}

// Ensure cleanup if the server is dropped while running
impl Drop for GatewayServer {
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            warn!("GatewayServer dropped while still running");
            self.running.store(false, Ordering::SeqCst);
            self.shutdown_notify.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AckHandler;

    #[tokio::test]
    async fn test_server_lifecycle() {
        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap());

        let server = GatewayServer::new(config).await.unwrap();
        assert!(!server.is_running());

        server.start(Arc::new(AckHandler)).await.unwrap();
        assert!(server.is_running());

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        server.shutdown().await.unwrap();
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn test_server_snapshot() {
        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap());

        let server = GatewayServer::new(config).await.unwrap();
        let snapshot = server.snapshot();

        assert_eq!(snapshot.active_connections, 0);
        assert_eq!(snapshot.total_connections, 0);
    }

    #[tokio::test]
    async fn test_server_double_start() {
        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap());

        let server = GatewayServer::new(config).await.unwrap();
        server.start(Arc::new(AckHandler)).await.unwrap();

        let result = server.start(Arc::new(AckHandler)).await;
        assert!(result.is_err());

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure_is_fatal() {
        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap());
        let first = GatewayServer::new(config).await.unwrap();

        // Second bind to the same concrete port must fail loudly.
        let taken = ServerConfig::new(first.bind_address());
        // SO_REUSEADDR permits rebinding in some configurations; only
        // assert the error path when the OS refuses the bind.
        if let Err(e) = GatewayServer::new(taken).await {
            assert!(matches!(e, GatewayError::Io(_)));
        }
    }
}
