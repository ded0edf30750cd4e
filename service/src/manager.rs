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

//! Connection manager implementation
//!
//! The ConnectionManager is responsible for:
//! - Wrapping accepted sockets and assigning connection IDs
//! - Spawning and tracking connection workers
//! - Owning the shared peer registry handle
//! - Server-initiated sends to specific connections
//! - Graceful shutdown coordination

use crate::{
    ConnectionId, ConnectionInfo, ConnectionRegistry, ConnectionState, ControlMessage,
    GatewayConnection, GatewayError, GatewayHandler, Result, ServerMetrics, WorkerConfig,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Instant;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use wiregate_codec::{FramingScheme, Reply};

/// Managed connection entry
struct ManagedConnection {
    /// Connection ID
    id: ConnectionId,
    /// The connection itself (non-owning handle)
    connection: GatewayConnection,
    /// Control channel sender
    control_tx: mpsc::Sender<ControlMessage>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
    /// Current state (shared with the worker)
    state: Arc<AtomicU8>,
    /// When the connection was created
    created_at: Instant,
}

impl ManagedConnection {
    fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            state: self.state(),
            peer_id: self.connection.peer_id().to_string(),
            peer_addr: self.connection.peer_addr(),
            created_at: self.created_at,
            bytes_sent: self.connection.bytes_sent(),
            bytes_received: self.connection.bytes_received(),
            messages_sent: self.connection.messages_sent(),
            messages_received: self.connection.messages_received(),
        }
    }
}

/// Connection manager
pub struct ConnectionManager {
    /// Live workers by connection ID (lock-free concurrent map)
    connections: Arc<DashMap<ConnectionId, ManagedConnection>>,
    /// Peer registry shared with every worker
    registry: Arc<ConnectionRegistry>,
    /// Next connection ID (monotonically increasing, never reused)
    next_id: AtomicU64,
    /// Server metrics
    metrics: Arc<ServerMetrics>,
    /// Framing scheme for accepted connections
    framing: FramingScheme,
    /// Worker configuration
    worker_config: WorkerConfig,
    /// Maximum number of simultaneous connections
    max_connections: usize,
}

impl ConnectionManager {
    /// Create a new connection manager
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        metrics: Arc<ServerMetrics>,
        framing: FramingScheme,
        worker_config: WorkerConfig,
        max_connections: usize,
    ) -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
            registry,
            next_id: AtomicU64::new(1),
            metrics,
            framing,
            worker_config,
            max_connections,
        }
    }

    /// The peer registry shared with every worker
    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        self.registry.clone()
    }

    fn next_connection_id(&self) -> ConnectionId {
        ConnectionId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Wrap an accepted socket and spawn its worker.
    ///
    /// Each connection gets exactly one owning worker task; the worker
    /// registers the connection, drives the codec, and tears everything
    /// down on exit. The cleanup closure removes the managed entry once
    /// the worker finishes, whatever the close reason was.
    pub fn add_connection(
        &self,
        socket: TcpStream,
        handler: Arc<dyn GatewayHandler>,
    ) -> Result<ConnectionId> {
        if self.connections.len() >= self.max_connections {
            return Err(GatewayError::MaxConnectionsReached(self.max_connections));
        }

        let id = self.next_connection_id();
        let connection = GatewayConnection::wrap(socket, id, self.framing)?;

        let state = Arc::new(AtomicU8::new(ConnectionState::Connecting.as_u8()));
        let (worker, control_tx) = crate::ConnectionWorker::new(
            id,
            connection.clone(),
            handler,
            self.registry.clone(),
            self.metrics.clone(),
            self.worker_config.clone(),
            state.clone(),
        );

        let connections = self.connections.clone();
        let metrics = self.metrics.clone();
        let worker_handle = tokio::spawn(async move {
            let start = Instant::now();
            worker.run().await;

            // Cleanup after worker finishes
            connections.remove(&id);
            metrics.connection_closed(start.elapsed());
        });

        let managed = ManagedConnection {
            id,
            connection,
            control_tx,
            worker_handle,
            state,
            created_at: Instant::now(),
        };

        self.connections.insert(id, managed);
        self.metrics.connection_opened();

        Ok(id)
    }

    /// Request a graceful close of a connection and wait for its worker.
    pub async fn close_connection(&self, id: ConnectionId) -> Result<()> {
        if let Some((_, managed)) = self.connections.remove(&id) {
            let _ = managed.control_tx.send(ControlMessage::Close).await;
            let _ = tokio::time::timeout(
                std::time::Duration::from_secs(5),
                managed.worker_handle,
            )
            .await;
            Ok(())
        } else {
            Err(GatewayError::ConnectionNotFound(id))
        }
    }

    /// Get a connection handle by ID
    pub fn get_connection(&self, id: ConnectionId) -> Option<GatewayConnection> {
        self.connections
            .get(&id)
            .map(|entry| entry.connection.clone())
    }

    /// Get connection info
    pub fn get_connection_info(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        self.connections.get(&id).map(|entry| entry.info())
    }

    /// Get all connection infos
    pub fn get_all_connection_infos(&self) -> Vec<ConnectionInfo> {
        self.connections
            .iter()
            .map(|entry| entry.value().info())
            .collect()
    }

    /// Get the number of active connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Push a server-initiated reply to a specific connection.
    ///
    /// The write happens on the connection's own worker, preserving
    /// per-connection ordering with protocol replies.
    pub async fn send_to(&self, id: ConnectionId, reply: Reply) -> Result<()> {
        if let Some(managed) = self.connections.get(&id) {
            managed
                .control_tx
                .send(ControlMessage::Send(reply))
                .await
                .map_err(|_| GatewayError::ConnectionClosed)?;
            Ok(())
        } else {
            Err(GatewayError::ConnectionNotFound(id))
        }
    }

    /// Shutdown all connections gracefully
    pub async fn shutdown(&self) {
        debug!(
            connections = self.connection_count(),
            "Shutting down all connections"
        );

        let handles: Vec<_> = self
            .connections
            .iter()
            .map(|entry| (entry.id, entry.control_tx.clone()))
            .collect();

        for (_, control_tx) in &handles {
            let _ = control_tx.send(ControlMessage::Close).await;
        }

        // Give workers time to run their cleanup before clearing
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;

        for entry in self.connections.iter() {
            entry.worker_handle.abort();
        }
        self.connections.clear();
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connection_count", &self.connection_count())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AckHandler, RegistryPolicy};
    use tokio::net::{TcpListener, TcpStream};

    async fn create_test_socket() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client_task = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });

        let (server, _) = listener.accept().await.unwrap();
        let client = client_task.await.unwrap();

        (server, client)
    }

    fn test_manager(max_connections: usize) -> ConnectionManager {
        let registry = Arc::new(ConnectionRegistry::new(RegistryPolicy::KeepFirst));
        let metrics = Arc::new(ServerMetrics::new());
        ConnectionManager::new(
            registry,
            metrics,
            FramingScheme::Binary,
            WorkerConfig::default(),
            max_connections,
        )
    }

    #[tokio::test]
    async fn test_manager_add_close() {
        let manager = test_manager(32);
        let (server, _client) = create_test_socket().await;

        let id = manager.add_connection(server, Arc::new(AckHandler)).unwrap();

        assert_eq!(manager.connection_count(), 1);
        assert!(manager.get_connection(id).is_some());

        // Worker should have registered the peer
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert_eq!(manager.registry().len(), 1);

        manager.close_connection(id).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(manager.registry().is_empty());
    }

    #[tokio::test]
    async fn test_manager_connection_ids_are_unique() {
        let manager = test_manager(32);
        let (s1, _c1) = create_test_socket().await;
        let (s2, _c2) = create_test_socket().await;

        let id1 = manager.add_connection(s1, Arc::new(AckHandler)).unwrap();
        let id2 = manager.add_connection(s2, Arc::new(AckHandler)).unwrap();

        assert_ne!(id1, id2);
        assert_eq!(manager.connection_count(), 2);

        manager.shutdown().await;
        assert_eq!(manager.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_manager_enforces_connection_limit() {
        let manager = test_manager(1);
        let (s1, _c1) = create_test_socket().await;
        let (s2, _c2) = create_test_socket().await;

        manager.add_connection(s1, Arc::new(AckHandler)).unwrap();
        let result = manager.add_connection(s2, Arc::new(AckHandler));
        assert!(matches!(
            result,
            Err(GatewayError::MaxConnectionsReached(1))
        ));

        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_manager_send_to_unknown_connection() {
        let manager = test_manager(32);
        let result = manager
            .send_to(ConnectionId::new(99), Reply::from(&b"x"[..]))
            .await;
        assert!(matches!(result, Err(GatewayError::ConnectionNotFound(_))));
    }
}
