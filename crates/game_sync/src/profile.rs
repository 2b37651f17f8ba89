//! Player profile: a single record, replaced wholesale.

use std::sync::{Arc, RwLock};

use network_client::{Dispatcher, MessageSink, SendError};
use network_shared::MessageId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    PlayerId,
    cache::SingleRecordCache,
    events::{Notifier, SyncEvent},
    model::{self, DomainStore, SharedStore, SyncPhase},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub id: PlayerId,
    #[serde(default)]
    pub player_name: String,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub exp: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayerNameRequest<'a> {
    player_name: &'a str,
}

/// Responses that deliver the profile for the first time in a session.
const RECEIVE_RESPONSES: [MessageId; 3] = [
    MessageId::LoginResponse,
    MessageId::CreatePlayerResponse,
    MessageId::GetPlayerInfoResponse,
];

pub struct ProfileModel<T> {
    sink: Arc<T>,
    dispatcher: Arc<Dispatcher>,
    notifier: Notifier,
    store: SharedStore<SingleRecordCache<PlayerProfile>>,
}

impl<T: MessageSink> ProfileModel<T> {
    pub fn new(sink: Arc<T>, dispatcher: Arc<Dispatcher>, notifier: Notifier) -> Self {
        Self {
            sink,
            dispatcher,
            notifier,
            store: Arc::new(RwLock::new(DomainStore::default())),
        }
    }

    pub fn init(&self) {
        model::write(&self.store).reset();
        let codec = self.sink.codec().clone();

        for message_id in RECEIVE_RESPONSES {
            let store = Arc::clone(&self.store);
            let notifier = self.notifier.clone();
            model::on_response(&self.dispatcher, message_id, codec.clone(), move |player: PlayerProfile| {
                model::write(&store).snapshot(|cache| cache.set(player.clone()));
                info!(target: "game_sync::profile", player_id = player.id, name = %player.player_name, "player data received");
                notifier.publish(SyncEvent::PlayerDataReceive(player));
            });
        }

        let store = Arc::clone(&self.store);
        let notifier = self.notifier.clone();
        model::on_response(
            &self.dispatcher,
            MessageId::UpdatePlayerResponse,
            codec,
            move |player: PlayerProfile| {
                model::write(&store).snapshot(|cache| cache.set(player.clone()));
                debug!(target: "game_sync::profile", player_id = player.id, name = %player.player_name, "player data updated");
                notifier.publish(SyncEvent::PlayerDataUpdate(player));
            },
        );
        debug!(target: "game_sync::profile", "handlers registered");
    }

    pub fn unregister_handlers(&self) {
        for message_id in RECEIVE_RESPONSES {
            self.dispatcher.unregister(message_id);
        }
        self.dispatcher.unregister(MessageId::UpdatePlayerResponse);
    }

    pub fn phase(&self) -> SyncPhase {
        model::read(&self.store).phase
    }

    pub async fn request_create_player(&self, player_name: &str) -> Result<(), SendError> {
        self.sink
            .send_message(MessageId::CreatePlayer, &PlayerNameRequest { player_name })
            .await
    }

    pub async fn request_player_info(&self) -> Result<(), SendError> {
        self.sink.send_empty(MessageId::GetPlayerInfo).await
    }

    pub async fn request_update_player(&self, player_name: &str) -> Result<(), SendError> {
        self.sink
            .send_message(MessageId::UpdatePlayer, &PlayerNameRequest { player_name })
            .await
    }

    pub fn current(&self) -> Option<PlayerProfile> {
        model::read(&self.store).cache.get().cloned()
    }

    /// 0 while no profile has been received.
    pub fn player_id(&self) -> PlayerId {
        model::read(&self.store).cache.get().map_or(0, |p| p.id)
    }

    pub fn player_name(&self) -> String {
        model::read(&self.store)
            .cache
            .get()
            .map(|p| p.player_name.clone())
            .unwrap_or_default()
    }

    pub fn is_logged_in(&self) -> bool {
        self.player_id() > 0
    }
}
