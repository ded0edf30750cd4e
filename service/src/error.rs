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

//! Error types for the gateway server

use crate::types::ConnectionId;
use thiserror::Error;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Gateway server error types
///
/// Per-connection errors (`Io`, `Frame`, `IdleTimeout`, `ConnectionClosed`)
/// never propagate past the connection boundary: the owning worker logs
/// them and tears the connection down. Only bind failures and server
/// lifecycle misuse surface to the caller.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// I/O error from the underlying TCP stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing error from the codec layer
    #[error("Frame error: {0}")]
    Frame(#[from] wiregate_codec::FrameError),

    /// Connection with the given ID was not found
    #[error("Connection {0} not found")]
    ConnectionNotFound(ConnectionId),

    /// Connection has been closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Read-idle deadline elapsed without inbound activity
    #[error("Idle timeout elapsed")]
    IdleTimeout,

    /// Server is not running
    #[error("Server not running")]
    ServerNotRunning,

    /// Maximum number of connections reached
    #[error("Maximum connections ({0}) reached")]
    MaxConnectionsReached(usize),

    /// Generic error with a message
    #[error("{0}")]
    Other(String),
}

impl GatewayError {
    /// Check if the error is local to a single connection
    ///
    /// Connection-local errors force that connection into `Closing` and are
    /// never retried or propagated to other connections.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            GatewayError::Io(_)
                | GatewayError::Frame(_)
                | GatewayError::ConnectionClosed
                | GatewayError::ConnectionNotFound(_)
                | GatewayError::IdleTimeout
        )
    }

    /// Check if the error is an operational (non-failure) closure
    ///
    /// Idle timeouts are deliberate liveness-driven closures, logged as
    /// operational events rather than failures.
    pub fn is_operational(&self) -> bool {
        matches!(self, GatewayError::IdleTimeout)
    }
}
