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

//! Handler traits and implementations for the gateway server

use crate::{ConnectionId, GatewayConnection, GatewayError};
use async_trait::async_trait;
use bytes::Bytes;
use wiregate_codec::Frame;

/// Gateway event handler trait
///
/// Implement this trait to observe connection lifecycle events and to
/// supply replies. All methods are async and have default implementations.
///
/// `on_message` is the business-logic seam: returning `Some(bytes)`
/// replaces the framing scheme's fixed acknowledgement with a computed
/// reply, without touching the framing or lifecycle core. Returning `None`
/// keeps the scheme's fixed acknowledgement.
///
/// # Example
///
/// ```no_run
/// use wiregate_service::{GatewayHandler, ConnectionId, GatewayConnection};
/// use wiregate_codec::Frame;
/// use async_trait::async_trait;
/// use bytes::Bytes;
///
/// struct EchoHandler;
///
/// #[async_trait]
/// impl GatewayHandler for EchoHandler {
///     async fn on_message(
///         &self,
///         _id: ConnectionId,
///         _conn: &GatewayConnection,
///         frame: Frame,
///     ) -> Option<Bytes> {
///         Some(frame.payload().clone())
///     }
/// }
/// ```
#[async_trait]
pub trait GatewayHandler: Send + Sync + 'static {
    /// Called when a new connection is established and registered
    async fn on_connect(&self, _id: ConnectionId, _conn: &GatewayConnection) {}

    /// Called for every decoded inbound frame
    ///
    /// Return `Some(bytes)` to supply the reply payload; `None` to fall
    /// back to the scheme's fixed acknowledgement.
    async fn on_message(
        &self,
        _id: ConnectionId,
        _conn: &GatewayConnection,
        _frame: Frame,
    ) -> Option<Bytes> {
        None
    }

    /// Called when an error occurs on a connection
    ///
    /// The connection is closed after this method returns; errors are
    /// never retried.
    async fn on_error(&self, _id: ConnectionId, _conn: &GatewayConnection, _error: GatewayError) {}

    /// Called when the read-idle threshold elapses
    ///
    /// An operational event, not a failure. The connection is forcibly
    /// closed after this method returns.
    async fn on_idle_timeout(&self, _id: ConnectionId, _conn: &GatewayConnection) {}

    /// Called when a connection is torn down
    ///
    /// Fires exactly once per connection, whether closure came from idle
    /// timeout, I/O error, peer close, or server shutdown.
    async fn on_disconnect(&self, _id: ConnectionId, _conn: &GatewayConnection) {}
}

/// The default gateway behavior: every frame is answered with the framing
/// scheme's fixed acknowledgement and lifecycle events are only logged by
/// the core.
pub struct AckHandler;

#[async_trait]
impl GatewayHandler for AckHandler {}

/// Callback-based handler implementation
///
/// A flexible way to observe gateway events using closures instead of
/// implementing the `GatewayHandler` trait.
///
/// # Example
///
/// ```no_run
/// use wiregate_service::CallbackHandler;
/// use std::sync::Arc;
///
/// let handler = Arc::new(CallbackHandler {
///     on_connect: Some(Box::new(|id, _conn| {
///         println!("Connection {} established", id);
///     })),
///     on_message: Some(Box::new(|id, _conn, frame| {
///         println!("Connection {} sent {}", id, frame.to_hex());
///         None
///     })),
///     ..Default::default()
/// });
/// ```
#[derive(Default)]
pub struct CallbackHandler {
    /// Called on connection establishment
    pub on_connect: Option<Box<dyn Fn(ConnectionId, &GatewayConnection) + Send + Sync + 'static>>,
    /// Called per frame; may supply a reply payload
    pub on_message: Option<
        Box<dyn Fn(ConnectionId, &GatewayConnection, &Frame) -> Option<Bytes> + Send + Sync + 'static>,
    >,
    /// Called on error
    pub on_error: Option<
        Box<dyn Fn(ConnectionId, &GatewayConnection, &GatewayError) + Send + Sync + 'static>,
    >,
    /// Called on idle timeout
    pub on_idle_timeout:
        Option<Box<dyn Fn(ConnectionId, &GatewayConnection) + Send + Sync + 'static>>,
    /// Called on disconnection
    pub on_disconnect:
        Option<Box<dyn Fn(ConnectionId, &GatewayConnection) + Send + Sync + 'static>>,
}

#[async_trait]
impl GatewayHandler for CallbackHandler {
    async fn on_connect(&self, id: ConnectionId, conn: &GatewayConnection) {
        if let Some(ref f) = self.on_connect {
            f(id, conn);
        }
    }

    async fn on_message(
        &self,
        id: ConnectionId,
        conn: &GatewayConnection,
        frame: Frame,
    ) -> Option<Bytes> {
        match self.on_message {
            Some(ref f) => f(id, conn, &frame),
            None => None,
        }
    }

    async fn on_error(&self, id: ConnectionId, conn: &GatewayConnection, error: GatewayError) {
        if let Some(ref f) = self.on_error {
            f(id, conn, &error);
        }
    }

    async fn on_idle_timeout(&self, id: ConnectionId, conn: &GatewayConnection) {
        if let Some(ref f) = self.on_idle_timeout {
            f(id, conn);
        }
    }

    async fn on_disconnect(&self, id: ConnectionId, conn: &GatewayConnection) {
        if let Some(ref f) = self.on_disconnect {
            f(id, conn);
        }
    }
}
