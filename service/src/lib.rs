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

//! Wiregate Gateway Server Implementation
//!
//! This crate provides an async-first TCP gateway server for large numbers
//! of long-lived device connections:
//!
//! - No race conditions in connection management
//! - Guaranteed resource cleanup on every close path
//! - Read-idle liveness detection with per-connection sequencing
//! - Peer-keyed connection registry with identity-safe removal
//! - Lock-free metrics and monitoring
//! - Clear separation between framing, lifecycle, and business logic
//!
//! # Architecture
//!
//! ```text
//! GatewayServer
//!     ↓
//! ConnectionManager ──→ ConnectionRegistry
//!     ↓
//! ConnectionWorker → GatewayConnection → GatewayCodec
//! ```
//!
//! The server accepts sockets on its own task; every accepted connection is
//! owned by exactly one worker task that drives its codec, idle deadlines,
//! and teardown. The registry maps peer identifiers to live connection
//! handles and is the only state shared across connections.
//!
//! # Example
//!
//! ```no_run
//! use wiregate_service::{AckHandler, GatewayServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("0.0.0.0:7000".parse().unwrap());
//!     let server = GatewayServer::new(config).await?;
//!     server.start(std::sync::Arc::new(AckHandler)).await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod error;
mod handler;
mod manager;
mod metrics;
mod registry;
mod server;
mod types;
mod worker;

pub use config::{IdleConfig, ServerConfig};
pub use connection::GatewayConnection;
pub use error::{GatewayError, Result};
pub use handler::{AckHandler, CallbackHandler, GatewayHandler};
pub use manager::ConnectionManager;
pub use metrics::{MetricsSnapshot, ServerMetrics};
pub use registry::{ConnectionRegistry, RegistryPolicy};
pub use server::GatewayServer;
pub use types::{ConnectionId, ConnectionInfo, ConnectionState, ServerSnapshot};
pub use worker::{ConnectionWorker, ControlMessage, WorkerConfig};

pub use wiregate_codec::{Frame, FramingScheme, GatewayCodec, Reply};
