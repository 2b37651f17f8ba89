#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use bytes::Bytes;
use game_sync::{
    ConfigTables, InventoryModel, Notifier, ProfileModel, RosterModel, StageModel,
    lookup::{BackpackTypeConfig, ItemConfig, StageConfig},
};
use network_client::{Dispatcher, MessageSink, SendError};
use network_shared::{JsonSerializer, MessageId};
use serde::Serialize;
use serde_json::{Value, json};

/// Captures outgoing frames instead of writing them to a socket.
#[derive(Default)]
pub struct RecordingSink {
    codec: JsonSerializer,
    sent: Mutex<Vec<(i32, Bytes)>>,
    offline: AtomicBool,
}

impl RecordingSink {
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(i32, Bytes)> {
        self.sent.lock().unwrap().clone()
    }

    /// The last frame, payload parsed as JSON (`Null` for empty payloads).
    pub fn last_json(&self) -> Option<(i32, Value)> {
        let sent = self.sent.lock().unwrap();
        sent.last().map(|(id, payload)| {
            let body = if payload.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(payload).unwrap()
            };
            (*id, body)
        })
    }
}

impl MessageSink for RecordingSink {
    type Codec = JsonSerializer;

    fn codec(&self) -> &JsonSerializer {
        &self.codec
    }

    async fn send(&self, message_id: i32, payload: Bytes) -> Result<(), SendError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SendError::NotConnected);
        }
        self.sent.lock().unwrap().push((message_id, payload));
        Ok(())
    }
}

/// Item 1 and 3 live in backpack type 1, item 2 in type 2.
/// Stages 101/102 are chapter 1, 201 is chapter 2.
pub fn tables() -> Arc<ConfigTables> {
    let item = |id: i32, backpack_type_id: i32| ItemConfig {
        id,
        name: format!("item-{id}"),
        quality: 1,
        backpack_type_id,
        description: String::new(),
    };
    let stage = |id: i32, chapter: i32| StageConfig {
        id,
        stage_name: format!("{chapter}-{id}"),
        stage_type: 0,
        difficulty: 1,
        chapter,
    };
    Arc::new(ConfigTables::from_rows(
        [item(1, 1), item(2, 2), item(3, 1)],
        [stage(101, 1), stage(102, 1), stage(201, 2)],
        Vec::<BackpackTypeConfig>::new(),
    ))
}

pub struct Harness {
    pub sink: Arc<RecordingSink>,
    pub dispatcher: Arc<Dispatcher>,
    pub notifier: Notifier,
    pub inventory: InventoryModel<RecordingSink>,
    pub roster: RosterModel<RecordingSink>,
    pub stage: StageModel<RecordingSink>,
    pub profile: ProfileModel<RecordingSink>,
}

impl Harness {
    pub fn new() -> Self {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Arc::new(Dispatcher::new());
        let notifier = Notifier::new(64);
        let tables = tables();
        let harness = Self {
            inventory: InventoryModel::new(
                Arc::clone(&sink),
                Arc::clone(&dispatcher),
                tables.clone(),
                notifier.clone(),
            ),
            roster: RosterModel::new(Arc::clone(&sink), Arc::clone(&dispatcher), notifier.clone()),
            stage: StageModel::new(Arc::clone(&sink), Arc::clone(&dispatcher), tables, notifier.clone()),
            profile: ProfileModel::new(Arc::clone(&sink), Arc::clone(&dispatcher), notifier.clone()),
            sink,
            dispatcher,
            notifier,
        };
        harness.inventory.init();
        harness.roster.init();
        harness.stage.init();
        harness.profile.init();
        harness
    }

    /// Feeds a successful `{success, message, data}` response.
    pub fn respond<T: Serialize>(&self, message_id: MessageId, data: T) -> bool {
        let body = json!({ "success": true, "message": "", "data": data });
        self.dispatcher.dispatch(message_id.as_i32(), body.to_string().as_bytes())
    }

    pub fn respond_raw(&self, message_id: MessageId, payload: &[u8]) -> bool {
        self.dispatcher.dispatch(message_id.as_i32(), payload)
    }

    pub fn push<T: Serialize>(&self, message_id: MessageId, data: T) -> bool {
        let body = serde_json::to_vec(&data).unwrap();
        self.dispatcher.dispatch(message_id.as_i32(), &body)
    }
}

pub fn item(id: i32, quantity: i32) -> Value {
    json!({ "id": id, "name": format!("item-{id}"), "quantity": quantity, "type": "material" })
}
