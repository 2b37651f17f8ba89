mod support;

use std::time::Duration;

use anyhow::{Result, bail};
use game_sync::{GameSync, SyncEvent};
use network_shared::{ClientNetworkingConfig, Credentials, FrameCodec, MessageId, ServerEndpoint};
use serde_json::{Value, json};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::broadcast,
    time::timeout,
};

const WAIT: Duration = Duration::from_secs(5);

async fn read_frame(stream: &mut TcpStream) -> Result<(i32, Vec<u8>)> {
    let id = stream.read_i32().await?;
    let len = stream.read_i32().await?;
    let mut payload = vec![0; len as usize];
    stream.read_exact(&mut payload).await?;
    Ok((id, payload))
}

async fn write_response(stream: &mut TcpStream, message_id: MessageId, data: Value) -> Result<()> {
    let body = json!({ "success": true, "message": "", "data": data }).to_string();
    let frame = FrameCodec::default().encode_to_bytes(message_id.as_i32(), body.as_bytes())?;
    stream.write_all(&frame).await?;
    Ok(())
}

async fn next_event(events: &mut broadcast::Receiver<SyncEvent>) -> Result<SyncEvent> {
    Ok(timeout(WAIT, events.recv()).await??)
}

#[test_log::test(tokio::test)]
async fn login_then_backpack_roundtrip() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let endpoint = ServerEndpoint::new("127.0.0.1", listener.local_addr()?.port());

    let sync = GameSync::init(ClientNetworkingConfig::default(), support::tables());
    let mut events = sync.subscribe();

    let credentials = Credentials::new("amiya", "rhodes");
    let (connected, accepted) = tokio::join!(
        sync.connect_to(&endpoint, &credentials),
        listener.accept()
    );
    connected?;
    let (mut server, _) = accepted?;
    assert!(sync.is_connected());

    let (id, payload) = read_frame(&mut server).await?;
    assert_eq!(id, MessageId::Login.as_i32());
    let login: Value = serde_json::from_slice(&payload)?;
    assert_eq!(login["username"], "amiya");

    write_response(
        &mut server,
        MessageId::LoginResponse,
        json!({ "id": 42, "playerName": "Amiya", "level": 12, "exp": 0 }),
    )
    .await?;
    let SyncEvent::PlayerDataReceive(player) = next_event(&mut events).await? else {
        bail!("expected player data first");
    };
    assert_eq!(player.id, 42);
    assert_eq!(sync.profile().player_id(), 42);

    sync.inventory().request_backpack(player.id).await?;
    let (id, payload) = read_frame(&mut server).await?;
    assert_eq!(id, MessageId::GetBackpack.as_i32());
    assert_eq!(serde_json::from_slice::<Value>(&payload)?, json!({ "playerId": 42 }));

    write_response(&mut server, MessageId::GetBackpackResponse, json!([support::item(1, 5), support::item(2, 1)]))
        .await?;
    assert_eq!(next_event(&mut events).await?, SyncEvent::InventoryReceived);
    assert_eq!(sync.inventory().count(), 2);
    assert_eq!(sync.inventory().quantity_of(1), 5);

    let metrics = sync.metrics();
    assert_eq!(metrics.frames_sent, 2);
    assert_eq!(metrics.frames_received, 2);

    let dispatcher = sync.dispatcher().clone();
    assert!(!dispatcher.is_empty());
    sync.shutdown().await;
    assert!(dispatcher.is_empty());

    // The client closed its side.
    let mut rest = Vec::new();
    timeout(WAIT, server.read_to_end(&mut rest)).await??;
    Ok(())
}

#[test_log::test(tokio::test)]
async fn requests_before_connect_fail() -> Result<()> {
    let sync = GameSync::init(ClientNetworkingConfig::default(), support::tables());
    assert!(!sync.is_connected());
    assert!(sync.roster().request_operators().await.is_err());
    assert_eq!(sync.metrics().frames_sent, 0);
    Ok(())
}
