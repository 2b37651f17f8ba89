use std::{sync::Arc, time::Duration};

use anyhow::Result;
use bytes::Bytes;
use network_client::{ConnectError, Dispatcher, MessageSink, SendError, TcpClientTransport};
use network_shared::{
    ClientNetworkingConfig, ConnectionState, Credentials, FrameCodec, MessageId, ServerEndpoint,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::mpsc,
    time::timeout,
};

const WAIT: Duration = Duration::from_secs(5);

fn config(timeout_ms: u64) -> ClientNetworkingConfig {
    ClientNetworkingConfig {
        connect_timeout_ms: timeout_ms,
        ..ClientNetworkingConfig::default()
    }
}

async fn listener() -> Result<(TcpListener, ServerEndpoint)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    Ok((listener, ServerEndpoint::new("127.0.0.1", port)))
}

async fn read_frame(stream: &mut TcpStream) -> Result<(i32, Vec<u8>)> {
    let id = stream.read_i32().await?;
    let len = stream.read_i32().await?;
    let mut payload = vec![0; len as usize];
    stream.read_exact(&mut payload).await?;
    Ok((id, payload))
}

fn creds() -> Credentials {
    Credentials::new("amiya", "rhodes")
}

/// Connects `transport` and returns the server side of the accepted socket.
async fn connect_pair(
    transport: &TcpClientTransport,
    listener: &TcpListener,
    endpoint: &ServerEndpoint,
) -> Result<TcpStream> {
    let credentials = creds();
    let (connected, accepted) = tokio::join!(transport.connect(endpoint, &credentials), listener.accept());
    connected?;
    Ok(accepted?.0)
}

async fn wait_for_state(transport: &TcpClientTransport, state: ConnectionState) -> Result<()> {
    let mut rx = transport.subscribe_state();
    timeout(WAIT, rx.wait_for(|s| *s == state)).await??;
    Ok(())
}

#[test_log::test(tokio::test)]
async fn login_is_first_frame_after_connect() -> Result<()> {
    let (listener, endpoint) = listener().await?;
    let transport = TcpClientTransport::new(config(2_000), Arc::new(Dispatcher::new()));

    let mut server = connect_pair(&transport, &listener, &endpoint).await?;
    assert!(transport.is_connected());

    let (id, payload) = read_frame(&mut server).await?;
    assert_eq!(id, MessageId::Login.as_i32());
    let body: serde_json::Value = serde_json::from_slice(&payload)?;
    assert_eq!(body["username"], "amiya");
    assert_eq!(body["password"], "rhodes");

    transport.send_empty(MessageId::GetPlayerInfo).await?;
    let (id, payload) = read_frame(&mut server).await?;
    assert_eq!(id, 1003);
    assert!(payload.is_empty());

    let metrics = transport.metrics();
    assert_eq!(metrics.frames_sent, 2);
    assert_eq!(metrics.connects, 1);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn fragmented_push_is_dispatched_once() -> Result<()> {
    let (listener, endpoint) = listener().await?;
    let dispatcher = Arc::new(Dispatcher::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    dispatcher.register(MessageId::BackpackUpdatePush, move |payload: &[u8]| {
        let _ = tx.send(payload.to_vec());
    });
    let transport = TcpClientTransport::new(config(2_000), dispatcher);
    let mut server = connect_pair(&transport, &listener, &endpoint).await?;
    server.set_nodelay(true)?;
    read_frame(&mut server).await?;

    let frame = FrameCodec::default().encode_to_bytes(2010, br#"[{"id":1,"quantity":3}]"#)?;
    for byte in frame.iter() {
        server.write_all(&[*byte]).await?;
        server.flush().await?;
    }

    let payload = timeout(WAIT, rx.recv()).await?.expect("handler invoked");
    assert_eq!(payload, br#"[{"id":1,"quantity":3}]"#.to_vec());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err(), "frame dispatched more than once");
    Ok(())
}

#[tokio::test]
async fn send_without_connection_fails() {
    let transport = TcpClientTransport::new(config(2_000), Arc::new(Dispatcher::new()));
    let err = transport.send(2001, Default::default()).await.unwrap_err();
    assert!(matches!(err, SendError::NotConnected));
    assert_eq!(transport.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn refused_connection_reports_unreachable() -> Result<()> {
    let (listener, endpoint) = listener().await?;
    drop(listener);
    let transport = TcpClientTransport::new(config(2_000), Arc::new(Dispatcher::new()));

    let err = transport.connect(&endpoint, &creds()).await.unwrap_err();
    assert!(
        matches!(err, ConnectError::Unreachable { .. } | ConnectError::Timeout { .. }),
        "{err}"
    );
    assert!(!transport.is_connected());
    assert_eq!(transport.state(), ConnectionState::Disconnected);
    Ok(())
}

#[tokio::test]
async fn connect_attempt_is_bounded_by_timeout() {
    // Non-routable address: either times out or fails fast, but never hangs.
    let transport = TcpClientTransport::new(config(200), Arc::new(Dispatcher::new()));
    let endpoint = ServerEndpoint::new("10.255.255.1", 9);
    let result = timeout(WAIT, transport.connect(&endpoint, &creds())).await;
    let err = result.expect("connect must honour its timeout").unwrap_err();
    assert!(matches!(err, ConnectError::Timeout { .. } | ConnectError::Unreachable { .. }));
    assert_eq!(transport.state(), ConnectionState::Disconnected);
}

#[test_log::test(tokio::test)]
async fn remote_close_moves_to_disconnected() -> Result<()> {
    let (listener, endpoint) = listener().await?;
    let transport = TcpClientTransport::new(config(2_000), Arc::new(Dispatcher::new()));
    let mut server = connect_pair(&transport, &listener, &endpoint).await?;
    read_frame(&mut server).await?;
    drop(server);

    wait_for_state(&transport, ConnectionState::Disconnected).await?;
    let err = transport.send_empty(MessageId::GetPlayerStages).await.unwrap_err();
    assert!(matches!(err, SendError::NotConnected));
    assert_eq!(transport.metrics().disconnects, 1);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn negative_length_terminates_connection() -> Result<()> {
    let (listener, endpoint) = listener().await?;
    let transport = TcpClientTransport::new(config(2_000), Arc::new(Dispatcher::new()));
    let mut server = connect_pair(&transport, &listener, &endpoint).await?;
    read_frame(&mut server).await?;

    server.write_i32(2002).await?;
    server.write_i32(-8).await?;

    wait_for_state(&transport, ConnectionState::Disconnected).await?;
    Ok(())
}

#[tokio::test]
async fn disconnect_is_idempotent() -> Result<()> {
    let (listener, endpoint) = listener().await?;
    let transport = TcpClientTransport::new(config(2_000), Arc::new(Dispatcher::new()));
    let mut server = connect_pair(&transport, &listener, &endpoint).await?;

    transport.disconnect().await;
    transport.disconnect().await;
    assert_eq!(transport.state(), ConnectionState::Disconnected);
    assert_eq!(transport.metrics().disconnects, 1);

    // Login frame, then EOF.
    read_frame(&mut server).await?;
    let mut rest = Vec::new();
    assert_eq!(timeout(WAIT, server.read_to_end(&mut rest)).await??, 0);
    Ok(())
}

#[tokio::test]
async fn reconnect_replaces_previous_connection() -> Result<()> {
    let (listener, endpoint) = listener().await?;
    let transport = TcpClientTransport::new(config(2_000), Arc::new(Dispatcher::new()));

    let mut first = connect_pair(&transport, &listener, &endpoint).await?;
    read_frame(&mut first).await?;
    let mut second = connect_pair(&transport, &listener, &endpoint).await?;

    let mut rest = Vec::new();
    assert_eq!(timeout(WAIT, first.read_to_end(&mut rest)).await??, 0, "old socket closed");
    let (id, _) = read_frame(&mut second).await?;
    assert_eq!(id, MessageId::Login.as_i32());
    assert!(transport.is_connected());
    assert_eq!(transport.metrics().connects, 2);
    Ok(())
}

#[tokio::test]
async fn unresolvable_host_reports_unreachable() {
    let transport = TcpClientTransport::new(config(5_000), Arc::new(Dispatcher::new()));
    let endpoint = ServerEndpoint::new("bad-host.invalid", 1);

    let err = transport.connect(&endpoint, &creds()).await.unwrap_err();
    assert!(matches!(err, ConnectError::Unreachable { .. }), "{err}");
    assert!(!transport.is_connected());
    assert_eq!(transport.state(), ConnectionState::Disconnected);
}

/// Writes 512 KiB frames until one fails; the peer never reads.
async fn flood(transport: &TcpClientTransport) -> SendError {
    let payload = Bytes::from(vec![0u8; 512 * 1024]);
    loop {
        if let Err(err) = transport.send(MessageId::GetBackpack.as_i32(), payload.clone()).await {
            return err;
        }
    }
}

#[test_log::test(tokio::test)]
async fn disconnect_interrupts_write_to_stalled_peer() -> Result<()> {
    let (listener, endpoint) = listener().await?;
    let transport = TcpClientTransport::new(
        ClientNetworkingConfig {
            write_timeout_ms: 60_000,
            ..config(2_000)
        },
        Arc::new(Dispatcher::new()),
    );
    let _stalled = connect_pair(&transport, &listener, &endpoint).await?;

    let teardown = async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        timeout(WAIT, transport.disconnect()).await
    };
    let (err, closed) = tokio::join!(flood(&transport), teardown);

    assert!(closed.is_ok(), "disconnect blocked behind a pending write");
    assert!(matches!(err, SendError::Aborted | SendError::NotConnected), "{err}");
    assert_eq!(transport.state(), ConnectionState::Disconnected);

    // Reconnecting goes through disconnect as well and must not hang either.
    let mut fresh = timeout(WAIT, connect_pair(&transport, &listener, &endpoint)).await??;
    let (id, _) = read_frame(&mut fresh).await?;
    assert_eq!(id, MessageId::Login.as_i32());
    assert!(transport.is_connected());
    Ok(())
}

#[test_log::test(tokio::test)]
async fn stalled_write_times_out_and_disconnects() -> Result<()> {
    let (listener, endpoint) = listener().await?;
    let transport = TcpClientTransport::new(
        ClientNetworkingConfig {
            write_timeout_ms: 200,
            ..config(2_000)
        },
        Arc::new(Dispatcher::new()),
    );
    let _stalled = connect_pair(&transport, &listener, &endpoint).await?;

    let err = timeout(WAIT, flood(&transport)).await?;
    assert!(matches!(err, SendError::Timeout(after) if after == Duration::from_millis(200)), "{err}");
    assert_eq!(transport.state(), ConnectionState::Disconnected);
    assert_eq!(transport.metrics().disconnects, 1);
    assert!(matches!(
        transport.send_empty(MessageId::GetPlayerStages).await,
        Err(SendError::NotConnected)
    ));
    Ok(())
}
