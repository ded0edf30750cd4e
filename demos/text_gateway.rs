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

//! Text Gateway Example
//!
//! This example runs a text-mode gateway that:
//! - Accepts device connections on port 7001
//! - Logs inbound frames both as text and as byte-wise hex
//! - Acknowledges each frame with the string "123456789"
//! - Answers "PING" with "PONG" to show a handler reply overriding the ack
//!
//! ## Usage
//!
//! Run the gateway:
//! ```bash
//! cargo run --example text_gateway
//! ```
//!
//! Talk to it:
//! ```bash
//! printf 'PING' | nc localhost 7001
//! ```

use std::sync::Arc;
use wiregate_service::{
    ConnectionId, FramingScheme, GatewayConnection, GatewayHandler, GatewayServer, ServerConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    println!("Starting text gateway on 127.0.0.1:7001");
    println!("Talk to it with: printf 'PING' | nc localhost 7001");
    println!("Press Ctrl+C to stop the server\n");

    let config = ServerConfig::new("127.0.0.1:7001".parse()?)
        .with_framing(FramingScheme::Text)
        .with_max_connections(1000);

    let server = GatewayServer::new(config).await?;

    let handler = Arc::new(PingHandler);

    server.start(handler).await?;

    tokio::signal::ctrl_c().await?;
    println!("\nShutting down server...");

    server.shutdown().await?;
    println!("Server stopped");

    Ok(())
}

/// Handler that answers PING and otherwise falls back to the fixed ack
struct PingHandler;

#[async_trait::async_trait]
impl GatewayHandler for PingHandler {
    async fn on_connect(&self, id: ConnectionId, conn: &GatewayConnection) {
        tracing::info!("Device {} connected from {}", id, conn.peer_addr());
    }

    async fn on_message(
        &self,
        id: ConnectionId,
        _conn: &GatewayConnection,
        frame: wiregate_service::Frame,
    ) -> Option<bytes::Bytes> {
        let text = frame.as_text();
        tracing::info!("Device {} sent: {:?} (hex {})", id, text, frame.to_hex());

        if text.trim() == "PING" {
            return Some(bytes::Bytes::from_static(b"PONG"));
        }

        None
    }

    async fn on_disconnect(&self, id: ConnectionId, _conn: &GatewayConnection) {
        tracing::info!("Device {} disconnected", id);
    }
}
