//! Integration tests for the packet channel.
//!
//! Most tests run the channel over `tokio::io::duplex`: one end goes into
//! the channel, the test keeps the other end and plays the server. The TCP
//! test at the bottom checks the real connector against a local listener.

use std::sync::Arc;
use std::time::Duration;

use clashkit_protocol::{
    ChatMessageClient, ChatMessageServer, FrameHeader, JsonCodec, Packet, PacketCodec,
};
use clashkit_transport::{
    read_frame, Connector, Endpoint, PacketChannel, TcpConnector, TransportError,
};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

fn codec() -> Arc<dyn PacketCodec> {
    Arc::new(JsonCodec)
}

fn chat(text: &str) -> Packet {
    Packet::ChatMessageClient(ChatMessageClient {
        message: text.into(),
    })
}

fn server_chat(text: &str) -> Packet {
    Packet::ChatMessageServer(ChatMessageServer {
        message: text.into(),
        username: "archer".into(),
        user_id: 99,
        level: 12,
        clan_name: Some("Goblins".into()),
    })
}

/// Opens a channel over an in-memory pipe, returning the server end.
fn open_pair() -> (Arc<PacketChannel>, DuplexStream) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    (PacketChannel::open(client, codec()), server)
}

async fn read_packet(server: &mut DuplexStream) -> Packet {
    let frame = tokio::time::timeout(Duration::from_secs(5), read_frame(server))
        .await
        .expect("frame should arrive")
        .expect("frame should be readable");
    JsonCodec.decode(&frame).expect("frame should decode")
}

async fn write_packet(server: &mut DuplexStream, packet: &Packet) {
    let frame = JsonCodec.encode(packet).unwrap();
    server.write_all(&frame).await.unwrap();
}

type Received = mpsc::UnboundedReceiver<(Vec<u8>, Packet)>;
type Errors = mpsc::UnboundedReceiver<TransportError>;

/// Starts the receive loop, forwarding callbacks into channels.
fn start(channel: &PacketChannel) -> (Received, Errors) {
    let (packet_tx, packet_rx) = mpsc::unbounded_channel();
    let (error_tx, error_rx) = mpsc::unbounded_channel();
    channel
        .start_receiving(
            move |raw, packet| {
                let _ = packet_tx.send((raw.to_vec(), packet));
            },
            move |error| {
                let _ = error_tx.send(error);
            },
        )
        .expect("receive loop should start");
    (packet_rx, error_rx)
}

// =========================================================================
// Sending
// =========================================================================

#[tokio::test]
async fn test_sends_arrive_in_call_order() {
    let (channel, mut server) = open_pair();

    for text in ["A", "B", "C"] {
        channel.send(&chat(text)).unwrap();
    }

    for expected in ["A", "B", "C"] {
        assert_eq!(read_packet(&mut server).await, chat(expected));
    }
}

#[tokio::test]
async fn test_concurrent_senders_each_keep_their_own_order() {
    let (channel, mut server) = open_pair();

    let mut tasks = Vec::new();
    for sender in ["x", "y"] {
        let channel = Arc::clone(&channel);
        tasks.push(tokio::spawn(async move {
            for i in 0..20 {
                channel.send(&chat(&format!("{sender}{i}"))).unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let mut next = [0usize; 2];
    for _ in 0..40 {
        let Packet::ChatMessageClient(msg) = read_packet(&mut server).await else {
            panic!("expected chat packet");
        };
        let (who, n) = msg.message.split_at(1);
        let slot = if who == "x" { 0 } else { 1 };
        assert_eq!(n.parse::<usize>().unwrap(), next[slot], "{}", msg.message);
        next[slot] += 1;
    }
}

#[tokio::test]
async fn test_send_after_close_is_not_connected() {
    let (channel, _server) = open_pair();

    channel.close();

    assert!(!channel.is_open());
    assert!(matches!(
        channel.send(&chat("late")),
        Err(TransportError::NotConnected)
    ));
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let (channel, _server) = open_pair();
    channel.close();
    channel.close();
    assert!(!channel.is_open());
}

// =========================================================================
// Receiving
// =========================================================================

#[tokio::test]
async fn test_received_frames_reach_on_packet_with_raw_bytes() {
    let (channel, mut server) = open_pair();
    let (mut packets, _errors) = start(&channel);

    let packet = server_chat("hello");
    write_packet(&mut server, &packet).await;

    let (raw, received) = packets.recv().await.unwrap();
    assert_eq!(received, packet);
    assert_eq!(raw, JsonCodec.encode(&packet).unwrap());
}

#[tokio::test]
async fn test_peer_close_reports_error_once_and_ends_loop() {
    let (channel, mut server) = open_pair();
    let (mut packets, mut errors) = start(&channel);

    write_packet(&mut server, &server_chat("last words")).await;
    drop(server);

    assert!(packets.recv().await.is_some());
    let error = errors.recv().await.expect("error should be reported");
    assert!(matches!(error, TransportError::ConnectionClosed(_)));

    // The loop has exited: both callbacks were dropped, no more calls.
    assert!(errors.recv().await.is_none());
    assert!(packets.recv().await.is_none());
}

#[tokio::test]
async fn test_malformed_body_reports_codec_error_and_stops() {
    let (channel, mut server) = open_pair();
    let (mut packets, mut errors) = start(&channel);

    let body = b"{broken";
    let mut frame = FrameHeader::new(24715, body.len()).unwrap().to_bytes().to_vec();
    frame.extend_from_slice(body);
    server.write_all(&frame).await.unwrap();
    // A valid frame after the broken one must never be delivered.
    let after = JsonCodec.encode(&server_chat("after")).unwrap();
    let _ = server.write_all(&after).await;

    let error = errors.recv().await.unwrap();
    assert!(matches!(error, TransportError::Codec(_)), "got {error:?}");
    assert!(packets.recv().await.is_none());
}

#[tokio::test]
async fn test_close_unblocks_pending_receive_without_error() {
    let (channel, _server) = open_pair();
    let (mut packets, mut errors) = start(&channel);

    // Nothing has been written, so the loop is parked in a read.
    tokio::task::yield_now().await;
    channel.close();

    let ended = tokio::time::timeout(Duration::from_secs(5), errors.recv())
        .await
        .expect("receive loop should exit after close");
    assert!(ended.is_none(), "close must not be reported as an error");
    assert!(packets.recv().await.is_none());
}

#[tokio::test]
async fn test_start_receiving_twice_fails() {
    let (channel, _server) = open_pair();
    let _callbacks = start(&channel);

    let second = channel.start_receiving(|_, _| {}, |_| {});
    assert!(matches!(second, Err(TransportError::AlreadyReceiving)));
}

#[tokio::test]
async fn test_start_receiving_after_close_fails() {
    let (channel, _server) = open_pair();
    channel.close();

    let result = channel.start_receiving(|_, _| {}, |_| {});
    assert!(matches!(result, Err(TransportError::NotConnected)));
}

#[tokio::test]
async fn test_channel_ids_are_unique() {
    let (a, _sa) = open_pair();
    let (b, _sb) = open_pair();
    assert_ne!(a.id(), b.id());
}

// =========================================================================
// TCP
// =========================================================================

#[tokio::test]
async fn test_tcp_connector_round_trip() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = Endpoint::from(listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let frame = read_frame(&mut stream).await.unwrap();
        let packet = JsonCodec.decode(&frame).unwrap();
        stream
            .write_all(&JsonCodec.encode(&server_chat("pong")).unwrap())
            .await
            .unwrap();
        packet
    });

    let stream = TcpConnector.connect(&endpoint).await.expect("should connect");
    let channel = PacketChannel::open(stream, codec());
    let (mut packets, _errors) = start(&channel);

    channel.send(&chat("ping")).unwrap();

    assert_eq!(server.await.unwrap(), chat("ping"));
    let (_, reply) = packets.recv().await.unwrap();
    assert_eq!(reply, server_chat("pong"));
}

#[tokio::test]
async fn test_tcp_connector_refused() {
    // Bind then drop to get a port nobody is listening on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = Endpoint::from(listener.local_addr().unwrap());
    drop(listener);

    let result = TcpConnector.connect(&endpoint).await;
    assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
}
