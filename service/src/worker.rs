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

//! Connection worker implementation
//!
//! The ConnectionWorker owns the lifecycle of a single connection:
//! - Registration into the peer registry on activation
//! - The read/reply event loop, in strict receipt order
//! - Read-idle deadline management (per-connection sequencing: the
//!   deadline check and the activity update live on the same task, so a
//!   timeout can never fire concurrently with a read that resets it)
//! - Control message handling (server-initiated sends, graceful close)
//! - Exactly-once deregistration and resource cleanup
//!
//! Errors never escape the worker: I/O failures, decode failures, and idle
//! timeouts all close this connection and nothing else.

use crate::{
    ConnectionId, ConnectionRegistry, ConnectionState, GatewayConnection, GatewayError,
    GatewayHandler, IdleConfig, Result, ServerMetrics,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, info, trace, warn};
use wiregate_codec::Reply;

/// Control messages for the worker
#[derive(Debug)]
pub enum ControlMessage {
    /// Gracefully close the connection
    Close,
    /// Write a server-initiated reply to the connection
    Send(Reply),
}

/// Worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Idle thresholds for this connection
    pub idle: IdleConfig,
    /// Control channel buffer size
    pub control_buffer_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle: IdleConfig::default(),
            control_buffer_size: 100,
        }
    }
}

/// Connection worker that manages a single connection's lifecycle
pub struct ConnectionWorker {
    /// Connection ID
    id: ConnectionId,
    /// The connection being managed
    connection: GatewayConnection,
    /// Event handler
    handler: Arc<dyn GatewayHandler>,
    /// Peer registry shared across all connections
    registry: Arc<ConnectionRegistry>,
    /// Server metrics
    metrics: Arc<ServerMetrics>,
    /// Configuration
    config: WorkerConfig,
    /// Current state (atomic for lock-free access)
    state: Arc<AtomicU8>,
    /// Control message receiver
    control_rx: mpsc::Receiver<ControlMessage>,
    /// Last inbound activity
    last_read: Instant,
    /// Last outbound activity (tracked; no closure behavior attached)
    last_write: Instant,
}

impl ConnectionWorker {
    /// Create a new connection worker
    pub fn new(
        id: ConnectionId,
        connection: GatewayConnection,
        handler: Arc<dyn GatewayHandler>,
        registry: Arc<ConnectionRegistry>,
        metrics: Arc<ServerMetrics>,
        config: WorkerConfig,
        state: Arc<AtomicU8>,
    ) -> (Self, mpsc::Sender<ControlMessage>) {
        let (control_tx, control_rx) = mpsc::channel(config.control_buffer_size);

        let now = Instant::now();
        let worker = Self {
            id,
            connection,
            handler,
            registry,
            metrics,
            config,
            state,
            control_rx,
            last_read: now,
            last_write: now,
        };

        (worker, control_tx)
    }

    /// Get the current state
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Set the state
    fn set_state(&self, new_state: ConnectionState) {
        self.state.store(new_state.as_u8(), Ordering::Release);
    }

    /// Run the worker event loop
    ///
    /// This is the main entry point for the worker. It will run until the
    /// connection is closed or an error occurs; every exit path runs the
    /// same cleanup exactly once.
    pub async fn run(mut self) {
        // Transition to Active and register under the peer identifier
        self.set_state(ConnectionState::Active);
        if !self.registry.register(&self.connection) {
            debug!(
                connection_id = %self.id,
                peer_id = %self.connection.peer_id(),
                "Peer identifier already registered, keeping existing entry"
            );
        }

        self.handler.on_connect(self.id, &self.connection).await;

        let result = self.event_loop().await;

        match result {
            Ok(()) => {}
            Err(e) if e.is_operational() => {
                // Idle timeout: deliberate closure, already reported via
                // on_idle_timeout at the fire site.
                self.metrics.idle_timeout();
            }
            Err(e) => {
                warn!(connection_id = %self.id, error = %e, "Connection failed");
                self.metrics.connection_error();
                self.handler.on_error(self.id, &self.connection, e).await;
            }
        }

        self.cleanup().await;
    }

    /// Main event processing loop
    async fn event_loop(&mut self) -> Result<()> {
        loop {
            // Re-armed every iteration so any read pushes the deadline out.
            let read_deadline = self.config.idle.read_idle.map(|t| self.last_read + t);

            select! {
                // Inbound frames from the connection
                result = self.connection.next() => {
                    match result {
                        Ok(Some(frame)) => {
                            self.last_read = Instant::now();
                            self.metrics.message_received();

                            debug!(
                                connection_id = %self.id,
                                peer_id = %self.connection.peer_id(),
                                payload_hex = %frame.to_hex(),
                                "Message received"
                            );

                            let reply = match self
                                .handler
                                .on_message(self.id, &self.connection, frame)
                                .await
                            {
                                Some(payload) => Reply::new(payload),
                                None => self.connection.ack(),
                            };

                            self.connection.send(reply).await?;
                            self.last_write = Instant::now();
                            self.metrics.message_sent();
                            self.schedule_settle();
                        }
                        Ok(None) => {
                            // Connection closed by peer
                            debug!(connection_id = %self.id, "Peer closed connection");
                            return Ok(());
                        }
                        Err(e) => {
                            // Fire-and-close: no retries
                            return Err(e);
                        }
                    }
                }

                // Control messages from the manager
                msg = self.control_rx.recv() => {
                    match msg {
                        Some(ControlMessage::Close) => {
                            return Ok(());
                        }
                        Some(ControlMessage::Send(reply)) => {
                            self.connection.send(reply).await?;
                            self.last_write = Instant::now();
                            self.metrics.message_sent();
                        }
                        None => {
                            // Control channel closed, shutdown
                            return Ok(());
                        }
                    }
                }

                // Read-idle deadline; disabled thresholds never arm this arm
                _ = sleep_until(read_deadline.unwrap_or_else(Instant::now)),
                        if read_deadline.is_some() => {
                    info!(
                        connection_id = %self.id,
                        peer_id = %self.connection.peer_id(),
                        "Read-idle threshold elapsed, closing connection"
                    );
                    self.handler.on_idle_timeout(self.id, &self.connection).await;
                    // Forcibly close from our side
                    let _ = self.connection.close().await;
                    return Err(GatewayError::IdleTimeout);
                }
            }
        }
    }

    /// Schedule the post-reply settle delay as a deferred timer task.
    ///
    /// The exchange is only considered complete once the delay elapses; the
    /// timer runs detached so it never blocks this connection's reads or
    /// any other connection's callbacks.
    fn schedule_settle(&self) {
        let settle = self.connection.settle_delay();
        let id = self.id;
        tokio::spawn(async move {
            sleep(settle).await;
            trace!(connection_id = %id, "Reply exchange settled");
        });
    }

    /// Cleanup resources; runs exactly once per worker
    async fn cleanup(&mut self) {
        self.set_state(ConnectionState::Closing);

        // Identity-safe and idempotent: a racing timeout/peer-close pair
        // still deregisters only once, and never removes a newer
        // connection that reused the peer identifier.
        self.registry.remove_by_connection(&self.connection);

        self.handler.on_disconnect(self.id, &self.connection).await;

        // Drain any remaining control messages
        while self.control_rx.try_recv().is_ok() {}

        self.connection.record_closed();
        self.set_state(ConnectionState::Closed);
        debug!(connection_id = %self.id, "Connection torn down");
    }
}

impl std::fmt::Debug for ConnectionWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionWorker")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("last_read", &self.last_read)
            .finish()
    }
}
