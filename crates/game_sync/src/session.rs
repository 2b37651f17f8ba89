//! One game-server session: transport, dispatcher, notifier and the four
//! domain models, constructed together and torn down together.

use std::sync::Arc;

use network_client::{ConnectError, Dispatcher, TcpClientTransport, TransportMetricsSnapshot};
use network_shared::{
    ClientNetworkingConfig, ConnectionState, Credentials, JsonSerializer, MessageSerializer, ServerEndpoint,
};
use tokio::sync::{broadcast, watch};
use tracing::info;

use crate::{
    events::{Notifier, SyncEvent},
    inventory::InventoryModel,
    lookup::ConfigTables,
    profile::ProfileModel,
    roster::RosterModel,
    stage::StageModel,
};

pub struct GameSync<S = JsonSerializer> {
    config: ClientNetworkingConfig,
    dispatcher: Arc<Dispatcher>,
    transport: Arc<TcpClientTransport<S>>,
    notifier: Notifier,
    inventory: InventoryModel<TcpClientTransport<S>>,
    roster: RosterModel<TcpClientTransport<S>>,
    stage: StageModel<TcpClientTransport<S>>,
    profile: ProfileModel<TcpClientTransport<S>>,
}

impl GameSync<JsonSerializer> {
    /// Builds a session speaking JSON payloads and registers every handler.
    pub fn init(config: ClientNetworkingConfig, tables: Arc<ConfigTables>) -> Self {
        Self::with_codec(config, tables, JsonSerializer)
    }
}

impl<S> GameSync<S>
where
    S: MessageSerializer + Clone,
{
    pub fn with_codec(config: ClientNetworkingConfig, tables: Arc<ConfigTables>, codec: S) -> Self {
        let dispatcher = Arc::new(Dispatcher::new());
        let notifier = Notifier::new(config.event_capacity);
        let transport = Arc::new(TcpClientTransport::with_codec(
            config.clone(),
            Arc::clone(&dispatcher),
            codec,
        ));

        let sync = Self {
            inventory: InventoryModel::new(
                Arc::clone(&transport),
                Arc::clone(&dispatcher),
                tables.clone(),
                notifier.clone(),
            ),
            roster: RosterModel::new(Arc::clone(&transport), Arc::clone(&dispatcher), notifier.clone()),
            stage: StageModel::new(
                Arc::clone(&transport),
                Arc::clone(&dispatcher),
                tables,
                notifier.clone(),
            ),
            profile: ProfileModel::new(Arc::clone(&transport), Arc::clone(&dispatcher), notifier.clone()),
            config,
            dispatcher,
            transport,
            notifier,
        };
        sync.reset();
        sync
    }

    /// Clears every cache and re-registers every handler.
    pub fn reset(&self) {
        self.profile.init();
        self.inventory.init();
        self.roster.init();
        self.stage.init();
        info!(target: "game_sync", handlers = self.dispatcher.len(), "sync models initialised");
    }

    /// Connects to the endpoint from the configuration.
    pub async fn connect(&self, credentials: &Credentials) -> Result<(), ConnectError> {
        self.connect_to(&self.config.endpoint(), credentials).await
    }

    pub async fn connect_to(&self, endpoint: &ServerEndpoint, credentials: &Credentials) -> Result<(), ConnectError> {
        self.transport.connect(endpoint, credentials).await
    }

    pub async fn disconnect(&self) {
        self.transport.disconnect().await;
    }

    /// Disconnects and unregisters every handler.
    pub async fn shutdown(self) {
        self.transport.disconnect().await;
        self.profile.unregister_handlers();
        self.inventory.unregister_handlers();
        self.roster.unregister_handlers();
        self.stage.unregister_handlers();
        info!(target: "game_sync", remaining = self.dispatcher.len(), "sync session shut down");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.notifier.subscribe()
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.transport.subscribe_state()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn metrics(&self) -> TransportMetricsSnapshot {
        self.transport.metrics()
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn inventory(&self) -> &InventoryModel<TcpClientTransport<S>> {
        &self.inventory
    }

    pub fn roster(&self) -> &RosterModel<TcpClientTransport<S>> {
        &self.roster
    }

    pub fn stage(&self) -> &StageModel<TcpClientTransport<S>> {
        &self.stage
    }

    pub fn profile(&self) -> &ProfileModel<TcpClientTransport<S>> {
        &self.profile
    }
}
