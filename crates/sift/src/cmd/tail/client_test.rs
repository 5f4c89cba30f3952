//! Tests for the tap client against a scripted server

use super::*;
use sift_protocol::PacketRecord;
use tokio::net::UnixListener;

fn record(protocol: &str) -> PacketRecord {
    PacketRecord {
        captured_at: "12:00:00".into(),
        source_addr: "10.0.0.1".into(),
        dest_addr: "10.0.0.2".into(),
        protocol: protocol.into(),
        source_port: "53".into(),
        dest_port: "5353".into(),
        size_bytes: 90,
        payload_summary: "query A example.com".into(),
    }
}

#[tokio::test]
async fn test_subscribe_and_receive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tap.sock");
    let listener = UnixListener::bind(&path).unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut reader = BufReader::new(read);

        let mut request = String::new();
        reader.read_line(&mut request).await.unwrap();

        let history = FeedMessage::AllPackets {
            packets: vec![record("DNS")],
        };
        write.write_all(history.to_line().unwrap().as_bytes()).await.unwrap();
        write.write_all(b"\n").await.unwrap();
        write
            .write_all(FeedMessage::CaptureStopped.to_line().unwrap().as_bytes())
            .await
            .unwrap();

        SubscribeRequest::from_line(&request).unwrap()
    });

    let mut client = TapClient::connect(&path).await.unwrap();
    let request = SubscribeRequest::new()
        .with_protocols(["dns"])
        .with_last_n(5);
    client.subscribe(&request).await.unwrap();

    match client.recv().await.unwrap() {
        Some(FeedMessage::AllPackets { packets }) => {
            assert_eq!(packets, vec![record("DNS")]);
        }
        other => panic!("expected history, got {other:?}"),
    }
    // blank lines are skipped
    assert_eq!(
        client.recv().await.unwrap(),
        Some(FeedMessage::CaptureStopped)
    );
    assert_eq!(client.recv().await.unwrap(), None);

    let received = server.await.unwrap();
    assert_eq!(received, request);
}

#[tokio::test]
async fn test_connect_missing_socket() {
    let dir = tempfile::tempdir().unwrap();
    let err = TapClient::connect(dir.path().join("absent.sock"))
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("absent.sock"));
}

#[tokio::test]
async fn test_garbage_line_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tap.sock");
    let listener = UnixListener::bind(&path).unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(b"not json\n").await.unwrap();
        // keep the stream open until the client has read
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    });

    let mut client = TapClient::connect(&path).await.unwrap();
    assert!(client.recv().await.is_err());
}
