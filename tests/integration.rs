use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use bbs_gateway::Server;
use bbs_gateway::server::GatewayConfig;
use bbs_gateway::utils::logging::MemorySink;

const WAIT: Duration = Duration::from_secs(3);

// Start a gateway bridging to a fake BBS listener
async fn start_gateway() -> (SocketAddr, TcpListener, Arc<MemorySink>) {
    let bbs = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = GatewayConfig {
        bind_address: "127.0.0.1".into(),
        listen_port: 0,
        remote_host: "127.0.0.1".into(),
        remote_port: bbs.local_addr().unwrap().port(),
        ..GatewayConfig::default()
    };
    let sink = Arc::new(MemorySink::default());
    let server = Server::bind(&config, sink.clone()).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.start());
    (addr, bbs, sink)
}

// Connect a node and the matching BBS side, consuming the greeting
async fn open_session(gateway: SocketAddr, bbs: &TcpListener) -> (TcpStream, TcpStream) {
    let mut node = TcpStream::connect(gateway).await.unwrap();
    let (upstream, _) = timeout(WAIT, bbs.accept()).await.unwrap().unwrap();
    let greeting = read_until(&mut node, "\r\n").await;
    assert!(greeting.starts_with("Connected to BBS 127.0.0.1:"));
    (node, upstream)
}

// Read until the accumulated text contains `needle`
async fn read_until(stream: &mut TcpStream, needle: &str) -> String {
    let mut received = Vec::new();
    let mut buf = [0u8; 1024];
    while !String::from_utf8_lossy(&received).contains(needle) {
        let n = timeout(WAIT, stream.read(&mut buf)).await.unwrap().unwrap();
        assert!(n > 0, "stream closed before {needle:?} arrived");
        received.extend_from_slice(&buf[..n]);
    }
    String::from_utf8(received).unwrap()
}

async fn read_to_close(stream: &mut TcpStream) -> Vec<u8> {
    let mut received = Vec::new();
    timeout(WAIT, stream.read_to_end(&mut received))
        .await
        .unwrap()
        .unwrap();
    received
}

#[tokio::test]
async fn test_lines_reach_bbs_in_order() {
    let (gateway, bbs, sink) = start_gateway().await;
    let (mut node, mut upstream) = open_session(gateway, &bbs).await;

    node.write_all(b"GUEST\r").await.unwrap();
    node.write_all(b"R 12\r\nL\n").await.unwrap();

    let mut received = Vec::new();
    let mut buf = [0u8; 256];
    while received.len() < b"GUEST\nR 12\nL\n".len() {
        let n = timeout(WAIT, upstream.read(&mut buf)).await.unwrap().unwrap();
        assert!(n > 0);
        received.extend_from_slice(&buf[..n]);
    }
    assert_eq!(received, b"GUEST\nR 12\nL\n");
    assert!(sink.contains("received from node: R 12"));
}

#[tokio::test]
async fn test_bbs_output_is_sanitized() {
    let (gateway, bbs, _sink) = start_gateway().await;
    let (mut node, mut upstream) = open_session(gateway, &bbs).await;

    upstream
        .write_all(b"\xFF\xFB\x01\xFF\xFB\x03\x1B[2J\x1B[1;32mWelcome\x07\r\nName: ")
        .await
        .unwrap();

    let text = read_until(&mut node, "Name: ").await;
    assert_eq!(text, "Welcome\r\nName: ");
}

#[tokio::test]
async fn test_exit_command_disconnects() {
    let (gateway, bbs, sink) = start_gateway().await;
    let (mut node, mut upstream) = open_session(gateway, &bbs).await;

    node.write_all(b"  ExIt  \r\n").await.unwrap();

    let output = read_to_close(&mut node).await;
    assert_eq!(output, b"Disconnecting from the BBS...\r\n");

    let forwarded = read_to_close(&mut upstream).await;
    assert!(forwarded.is_empty());

    // Teardown logs after the sockets are released.
    timeout(WAIT, async {
        while !sink.contains("session terminated") {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_bbs_hangup_closes_node() {
    let (gateway, bbs, _sink) = start_gateway().await;
    let (mut node, upstream) = open_session(gateway, &bbs).await;

    drop(upstream);

    let output = read_to_close(&mut node).await;
    assert!(output.is_empty());
}

#[tokio::test]
async fn test_unreachable_bbs_reports_error() {
    let (gateway, bbs, sink) = start_gateway().await;
    drop(bbs);

    let mut node = TcpStream::connect(gateway).await.unwrap();
    let output = read_to_close(&mut node).await;
    assert_eq!(output, b"Error: unable to connect to the BBS.\r\n");
    assert!(sink.contains("Failed to connect to BBS"));
}

#[tokio::test]
async fn test_concurrent_sessions_are_isolated() {
    let (gateway, bbs, _sink) = start_gateway().await;
    let (mut node_a, mut upstream_a) = open_session(gateway, &bbs).await;
    let (mut node_b, mut upstream_b) = open_session(gateway, &bbs).await;

    upstream_a.write_all(b"for A only\r\n").await.unwrap();
    upstream_b.write_all(b"for B only\r\n").await.unwrap();

    upstream_a.shutdown().await.unwrap();
    upstream_b.shutdown().await.unwrap();

    let a = String::from_utf8(read_to_close(&mut node_a).await).unwrap();
    let b = String::from_utf8(read_to_close(&mut node_b).await).unwrap();
    assert_eq!(a, "for A only\r\n");
    assert_eq!(b, "for B only\r\n");
}
