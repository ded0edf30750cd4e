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

//! Gateway connection handle
//!
//! `GatewayConnection` wraps an accepted TCP socket in the gateway frame
//! codec and exposes the read/write surface the worker drives. The handle
//! is cheaply cloneable; the registry stores clones as non-owning
//! references while the worker retains ownership of the lifecycle.

use crate::{ConnectionId, Result};
use futures_util::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, instrument, trace};
use wiregate_codec::{Frame, FramingScheme, GatewayCodec, Reply};

/// A single accepted TCP peer, framed by the gateway codec.
///
/// The connection does not manage its own task; lifecycle is owned by the
/// `ConnectionWorker`. Identity is the `ConnectionId`, which is never
/// reused, unlike the peer identifier string.
#[derive(Clone)]
pub struct GatewayConnection {
    // Core I/O
    framed: Arc<Mutex<Framed<TcpStream, GatewayCodec>>>,

    // Metadata (lock-free access)
    id: ConnectionId,
    peer_addr: SocketAddr,
    peer_id: Arc<str>,
    scheme: FramingScheme,
    created_at: Instant,

    // Counters (lock-free)
    bytes_sent: Arc<AtomicU64>,
    bytes_received: Arc<AtomicU64>,
    messages_sent: Arc<AtomicU64>,
    messages_received: Arc<AtomicU64>,
}

impl GatewayConnection {
    /// Wrap a TCP stream into a `GatewayConnection`
    #[instrument(skip(socket), fields(connection_id = %id))]
    pub fn wrap(socket: TcpStream, id: ConnectionId, scheme: FramingScheme) -> Result<Self> {
        let peer_addr = socket.peer_addr()?;
        let peer_id: Arc<str> = peer_addr.to_string().into();

        info!(
            peer_addr = %peer_addr,
            scheme = %scheme,
            "Creating new gateway connection"
        );

        counter!("wiregate.connections.total").increment(1);
        gauge!("wiregate.connections.active").increment(1.0);

        Ok(Self {
            framed: Arc::new(Mutex::new(Framed::new(socket, GatewayCodec::new(scheme)))),
            id,
            peer_addr,
            peer_id,
            scheme,
            created_at: Instant::now(),
            bytes_sent: Arc::new(AtomicU64::new(0)),
            bytes_received: Arc::new(AtomicU64::new(0)),
            messages_sent: Arc::new(AtomicU64::new(0)),
            messages_received: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Get the connection ID
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the peer identifier (registry key)
    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    /// Get the peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get the framing scheme this connection speaks
    pub fn scheme(&self) -> FramingScheme {
        self.scheme
    }

    /// Get when the connection was created
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// The fixed acknowledgement for this connection's scheme
    pub fn ack(&self) -> Reply {
        self.scheme.ack()
    }

    /// The post-reply settle delay for this connection's scheme
    pub fn settle_delay(&self) -> Duration {
        self.scheme.settle_delay()
    }

    /// Get bytes sent
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Get bytes received
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    /// Get messages sent
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Get messages received
    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// Send a reply to the peer
    #[instrument(skip(self, reply), fields(connection_id = %self.id))]
    pub async fn send(&self, reply: Reply) -> Result<()> {
        trace!(length = reply.len(), "Sending reply");
        let start = Instant::now();
        let length = reply.len() as u64;

        match self.framed.lock().await.send(reply).await {
            Ok(()) => {
                self.messages_sent.fetch_add(1, Ordering::Relaxed);
                self.bytes_sent.fetch_add(length, Ordering::Relaxed);

                counter!("wiregate.messages.sent").increment(1);
                histogram!("wiregate.message.send_duration").record(start.elapsed().as_secs_f64());

                trace!("Reply sent");
                Ok(())
            }
            Err(e) => {
                counter!("wiregate.errors.send").increment(1);
                error!("Failed to send reply");
                Err(e.into())
            }
        }
    }

    /// Receive the next inbound frame.
    ///
    /// `Ok(None)` means the peer closed its side of the connection.
    #[instrument(skip(self), fields(connection_id = %self.id))]
    pub async fn next(&self) -> Result<Option<Frame>> {
        match self.framed.lock().await.next().await {
            Some(Ok(frame)) => {
                self.messages_received.fetch_add(1, Ordering::Relaxed);
                self.bytes_received
                    .fetch_add(frame.len() as u64, Ordering::Relaxed);

                counter!("wiregate.messages.received").increment(1);

                trace!(length = frame.len(), "Frame received");
                Ok(Some(frame))
            }
            Some(Err(e)) => {
                counter!("wiregate.errors.receive").increment(1);
                error!("Error receiving frame");
                Err(e.into())
            }
            None => {
                debug!("Connection stream ended");
                Ok(None)
            }
        }
    }

    /// Shut down the write side of the underlying socket.
    ///
    /// Used by the worker to force closure on idle timeout; any in-flight
    /// read on the peer's side will observe end-of-stream.
    pub async fn close(&self) -> Result<()> {
        let mut framed = self.framed.lock().await;
        framed.close().await?;
        Ok(())
    }

    /// Record this connection's final closure in the active-connections
    /// gauge.
    ///
    /// Called exactly once by the owning worker during teardown, whatever
    /// the close reason was. `close()` itself must not touch the gauge:
    /// the idle path closes and then tears down, which would count twice.
    pub(crate) fn record_closed(&self) {
        gauge!("wiregate.connections.active").decrement(1.0);
    }

    /// Clone this handle under a different identity.
    ///
    /// Only used by tests to model a reconnecting peer reusing a peer id.
    #[cfg(test)]
    pub(crate) fn with_id(&self, id: ConnectionId) -> Self {
        let mut clone = self.clone();
        clone.id = id;
        clone
    }
}

impl std::fmt::Debug for GatewayConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConnection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("scheme", &self.scheme)
            .field("created_at", &self.created_at)
            .finish()
    }
}
