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

//! End-to-end gateway tests against real loopback sockets.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use wiregate_service::{
    AckHandler, ConnectionId, Frame, FramingScheme, GatewayConnection, GatewayHandler,
    GatewayServer, IdleConfig, ServerConfig,
};

/// Start a server on an ephemeral loopback port with the given config.
async fn spawn_server(config: ServerConfig, handler: Arc<dyn GatewayHandler>) -> GatewayServer {
    let server = GatewayServer::new(config).await.expect("bind failed");
    server.start(handler).await.expect("start failed");
    server
}

fn loopback_config() -> ServerConfig {
    ServerConfig::new("127.0.0.1:0".parse().unwrap())
}

/// Read exactly `n` bytes from the stream, with an overall deadline so a
/// broken server fails the test instead of hanging it.
async fn read_exact_timed(stream: &mut TcpStream, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut buf))
        .await
        .expect("read timed out")
        .expect("read failed");
    buf
}

#[tokio::test]
async fn test_binary_ack_on_wire() {
    let config = loopback_config().with_framing(FramingScheme::Binary);
    let server = spawn_server(config, Arc::new(AckHandler)).await;

    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();
    client.write_all(&[0x01, 0x02, 0x9F, 0xFF]).await.unwrap();

    let ack = read_exact_timed(&mut client, 5).await;
    assert_eq!(ack, [0xEF, 0x10, 0x09, 0x09, 0x08]);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_text_ack_on_wire() {
    let config = loopback_config().with_framing(FramingScheme::Text);
    let server = spawn_server(config, Arc::new(AckHandler)).await;

    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();
    client.write_all(b"hello gateway").await.unwrap();

    let ack = read_exact_timed(&mut client, 9).await;
    assert_eq!(&ack, b"123456789");

    server.shutdown().await.unwrap();
}

struct EchoHandler;

#[async_trait]
impl GatewayHandler for EchoHandler {
    async fn on_message(
        &self,
        _id: ConnectionId,
        _conn: &GatewayConnection,
        frame: Frame,
    ) -> Option<Bytes> {
        Some(frame.payload().clone())
    }
}

#[tokio::test]
async fn test_handler_reply_replaces_ack() {
    let config = loopback_config().with_framing(FramingScheme::Binary);
    let server = spawn_server(config, Arc::new(EchoHandler)).await;

    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();
    client.write_all(&[0xDE, 0xAD, 0xBE, 0xEF]).await.unwrap();

    let reply = read_exact_timed(&mut client, 4).await;
    assert_eq!(reply, [0xDE, 0xAD, 0xBE, 0xEF]);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_connections_are_isolated() {
    let config = loopback_config().with_framing(FramingScheme::Binary);
    let server = spawn_server(config, Arc::new(EchoHandler)).await;

    let mut a = TcpStream::connect(server.bind_address()).await.unwrap();
    let mut b = TcpStream::connect(server.bind_address()).await.unwrap();

    a.write_all(&[0xAA]).await.unwrap();
    b.write_all(&[0xBB]).await.unwrap();

    // Each connection sees only its own traffic.
    assert_eq!(read_exact_timed(&mut a, 1).await, [0xAA]);
    assert_eq!(read_exact_timed(&mut b, 1).await, [0xBB]);

    a.write_all(&[0xA1]).await.unwrap();
    assert_eq!(read_exact_timed(&mut a, 1).await, [0xA1]);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_per_connection_ordering() {
    let config = loopback_config().with_framing(FramingScheme::Binary);
    let server = spawn_server(config, Arc::new(EchoHandler)).await;

    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();

    // Replies must come back in send order. Writes are spaced out so each
    // lands as its own frame.
    for byte in [0x10u8, 0x20, 0x30] {
        client.write_all(&[byte]).await.unwrap();
        assert_eq!(read_exact_timed(&mut client, 1).await, [byte]);
    }

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_idle_timeout_closes_connection() {
    let config = loopback_config()
        .with_idle(IdleConfig::default().with_read_idle(Some(Duration::from_millis(200))));
    let server = spawn_server(config, Arc::new(AckHandler)).await;

    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();

    // Send nothing. The server must close the connection once the read-idle
    // threshold elapses, observed here as EOF.
    let mut buf = [0u8; 1];
    let n = tokio::time::timeout(Duration::from_secs(5), client.read(&mut buf))
        .await
        .expect("idle timeout never fired")
        .expect("read failed");
    assert_eq!(n, 0);

    let snapshot = server.metrics().snapshot();
    assert_eq!(snapshot.idle_timeouts, 1);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_activity_resets_idle_deadline() {
    let config = loopback_config()
        .with_idle(IdleConfig::default().with_read_idle(Some(Duration::from_millis(400))));
    let server = spawn_server(config, Arc::new(AckHandler)).await;

    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();

    // Keep sending at half the threshold. The connection must stay open
    // well past the raw threshold.
    for _ in 0..4 {
        tokio::time::sleep(Duration::from_millis(200)).await;
        client.write_all(&[0x42]).await.unwrap();
        let ack = read_exact_timed(&mut client, 5).await;
        assert_eq!(ack, [0xEF, 0x10, 0x09, 0x09, 0x08]);
    }

    assert_eq!(server.metrics().snapshot().idle_timeouts, 0);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_zero_idle_disables_timeout() {
    let config = loopback_config().with_idle(IdleConfig::disabled());
    let server = spawn_server(config, Arc::new(AckHandler)).await;

    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();

    // Stay silent longer than the default threshold scale. The connection
    // must remain open and responsive.
    tokio::time::sleep(Duration::from_millis(500)).await;
    client.write_all(&[0x01]).await.unwrap();
    let ack = read_exact_timed(&mut client, 5).await;
    assert_eq!(ack, [0xEF, 0x10, 0x09, 0x09, 0x08]);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_connection_count_tracks_lifecycle() {
    let server = spawn_server(loopback_config(), Arc::new(AckHandler)).await;
    assert_eq!(server.connection_count(), 0);

    let client = TcpStream::connect(server.bind_address()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.connection_count(), 1);

    drop(client);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.connection_count(), 0);

    let snapshot = server.metrics().snapshot();
    assert_eq!(snapshot.total_connections, 1);
    assert_eq!(snapshot.active_connections, 0);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_max_connections_rejects_excess() {
    let config = loopback_config().with_max_connections(1);
    let server = spawn_server(config, Arc::new(AckHandler)).await;

    let mut first = TcpStream::connect(server.bind_address()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.connection_count(), 1);

    // Second connection is accepted at the OS level and then dropped.
    let mut second = TcpStream::connect(server.bind_address()).await.unwrap();
    let mut buf = [0u8; 1];
    let n = tokio::time::timeout(Duration::from_secs(5), second.read(&mut buf))
        .await
        .expect("rejection never closed the socket")
        .expect("read failed");
    assert_eq!(n, 0);

    // The first connection is unaffected.
    first.write_all(&[0x01]).await.unwrap();
    let ack = read_exact_timed(&mut first, 5).await;
    assert_eq!(ack, [0xEF, 0x10, 0x09, 0x09, 0x08]);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_clients() {
    let server = spawn_server(loopback_config(), Arc::new(AckHandler)).await;

    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    server.shutdown().await.unwrap();
    assert!(!server.is_running());

    // The client observes the close as EOF (or a reset).
    let mut buf = [0u8; 1];
    match tokio::time::timeout(Duration::from_secs(5), client.read(&mut buf)).await {
        Ok(Ok(n)) => assert_eq!(n, 0),
        Ok(Err(_)) => {}
        Err(_) => panic!("client socket never closed after shutdown"),
    }
}

#[tokio::test]
async fn test_new_connections_refused_after_shutdown() {
    let server = spawn_server(loopback_config(), Arc::new(AckHandler)).await;
    let addr = server.bind_address();
    server.shutdown().await.unwrap();

    // The listener is gone, so a fresh connect must fail or be closed
    // immediately without service.
    match TcpStream::connect(addr).await {
        Err(_) => {}
        Ok(mut stream) => {
            stream.write_all(&[0x01]).await.unwrap();
            let mut buf = [0u8; 8];
            match tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf)).await {
                Ok(Ok(0)) | Ok(Err(_)) | Err(_) => {}
                Ok(Ok(_)) => panic!("server answered after shutdown"),
            }
        }
    }
}
