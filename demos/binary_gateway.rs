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

//! Binary Gateway Example
//!
//! This example runs a binary-mode gateway that:
//! - Accepts device connections on port 7000
//! - Logs every inbound frame as uppercase hex
//! - Acknowledges each frame with the fixed byte sequence EF 10 09 09 08
//! - Closes connections that stay silent past the read-idle threshold
//!
//! ## Usage
//!
//! Run the gateway:
//! ```bash
//! cargo run --example binary_gateway
//! ```
//!
//! Send it some bytes:
//! ```bash
//! printf '\x01\x02\x9f' | nc localhost 7000 | xxd
//! ```

use std::sync::Arc;
use std::time::Duration;
use wiregate_service::{
    ConnectionId, FramingScheme, GatewayConnection, GatewayHandler, GatewayServer, IdleConfig,
    ServerConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    println!("Starting binary gateway on 127.0.0.1:7000");
    println!("Send frames with: printf '\\x01\\x02' | nc localhost 7000");
    println!("Press Ctrl+C to stop the server\n");

    // Configure the server
    let config = ServerConfig::new("127.0.0.1:7000".parse()?)
        .with_framing(FramingScheme::Binary)
        .with_max_connections(1000)
        .with_idle(IdleConfig::default().with_read_idle(Some(Duration::from_secs(300))));

    // Create the server
    let server = GatewayServer::new(config).await?;

    // Create a custom handler
    let handler = Arc::new(DeviceHandler);

    // Start the server
    server.start(handler).await?;

    // Wait for Ctrl+C
    tokio::signal::ctrl_c().await?;
    println!("\nShutting down server...");

    // Graceful shutdown
    server.shutdown().await?;
    println!("Server stopped");

    Ok(())
}

/// Handler that logs frames and relies on the built-in acknowledgement
struct DeviceHandler;

#[async_trait::async_trait]
impl GatewayHandler for DeviceHandler {
    async fn on_connect(&self, id: ConnectionId, conn: &GatewayConnection) {
        tracing::info!("Device {} connected from {}", id, conn.peer_addr());
    }

    async fn on_message(
        &self,
        id: ConnectionId,
        _conn: &GatewayConnection,
        frame: wiregate_service::Frame,
    ) -> Option<bytes::Bytes> {
        tracing::info!("Device {} sent: {}", id, frame.to_hex());
        // Returning None lets the worker send the fixed acknowledgement
        None
    }

    async fn on_idle_timeout(&self, id: ConnectionId, _conn: &GatewayConnection) {
        tracing::warn!("Device {} idle timeout", id);
    }

    async fn on_disconnect(&self, id: ConnectionId, _conn: &GatewayConnection) {
        tracing::info!("Device {} disconnected", id);
    }
}
