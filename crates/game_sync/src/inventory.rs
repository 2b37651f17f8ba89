//! Backpack (inventory) synchronisation.
//!
//! Items are grouped by backpack type, which comes from the item config
//! table. Items without a config row are dropped. A merged record with a
//! non-positive quantity means the stack is used up and is removed.

use std::sync::{Arc, RwLock};

use network_client::{Dispatcher, MessageSink, SendError};
use network_shared::MessageId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    BackpackTypeId, ItemId, PlayerId,
    cache::{ApplyReport, GroupedCache, Record},
    events::{Notifier, SyncEvent},
    lookup::ItemGroupLookup,
    model::{self, DomainStore, SharedStore, SyncPhase},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    #[serde(default)]
    pub name: String,
    pub quantity: i32,
    /// Free-form category sent by the server ("material", "equipment", ...).
    #[serde(rename = "type", default)]
    pub item_type: String,
}

impl Record for ItemRecord {
    type Id = ItemId;

    fn id(&self) -> ItemId {
        self.id
    }

    fn is_valid(&self) -> bool {
        self.id > 0
    }
}

type InventoryCache = GroupedCache<BackpackTypeId, ItemRecord>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BackpackRequest {
    player_id: PlayerId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BackpackByTypeRequest {
    player_id: PlayerId,
    #[serde(rename = "type")]
    backpack_type: BackpackTypeId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemQuantityRequest {
    player_id: PlayerId,
    item_id: ItemId,
    quantity: i32,
}

pub struct InventoryModel<T> {
    sink: Arc<T>,
    dispatcher: Arc<Dispatcher>,
    lookup: Arc<dyn ItemGroupLookup>,
    notifier: Notifier,
    store: SharedStore<InventoryCache>,
}

impl<T: MessageSink> InventoryModel<T> {
    pub fn new(
        sink: Arc<T>,
        dispatcher: Arc<Dispatcher>,
        lookup: Arc<dyn ItemGroupLookup>,
        notifier: Notifier,
    ) -> Self {
        Self {
            sink,
            dispatcher,
            lookup,
            notifier,
            store: Arc::new(RwLock::new(DomainStore::default())),
        }
    }

    /// Clears the cache and (re)registers all handlers.
    pub fn init(&self) {
        model::write(&self.store).reset();
        let codec = self.sink.codec().clone();

        let (store, lookup, notifier) = self.handler_state();
        model::on_response(
            &self.dispatcher,
            MessageId::GetBackpackResponse,
            codec.clone(),
            move |items: Vec<ItemRecord>| {
                let report = model::write(&store)
                    .snapshot(|cache| cache.replace_all(items, |item| lookup.backpack_type_of(item.id)));
                info!(target: "game_sync::inventory", applied = report.applied, dropped = report.dropped, "backpack snapshot applied");
                notifier.publish(SyncEvent::InventoryReceived);
            },
        );

        let (store, lookup, notifier) = self.handler_state();
        model::on_response(
            &self.dispatcher,
            MessageId::GetBackpackByTypeResponse,
            codec.clone(),
            move |items: Vec<ItemRecord>| {
                merge_and_notify(&store, lookup.as_ref(), &notifier, items);
            },
        );

        for message_id in [MessageId::UseItemResponse, MessageId::AddItemResponse] {
            let (store, lookup, notifier) = self.handler_state();
            model::on_response(&self.dispatcher, message_id, codec.clone(), move |item: ItemRecord| {
                merge_and_notify(&store, lookup.as_ref(), &notifier, vec![item]);
            });
        }

        let (store, lookup, notifier) = self.handler_state();
        model::on_push(
            &self.dispatcher,
            MessageId::BackpackUpdatePush,
            codec,
            move |items: Vec<ItemRecord>| {
                merge_and_notify(&store, lookup.as_ref(), &notifier, items);
            },
        );
        debug!(target: "game_sync::inventory", "handlers registered");
    }

    pub fn unregister_handlers(&self) {
        for id in [
            MessageId::GetBackpackResponse,
            MessageId::GetBackpackByTypeResponse,
            MessageId::UseItemResponse,
            MessageId::AddItemResponse,
            MessageId::BackpackUpdatePush,
        ] {
            self.dispatcher.unregister(id);
        }
    }

    fn handler_state(&self) -> (SharedStore<InventoryCache>, Arc<dyn ItemGroupLookup>, Notifier) {
        (Arc::clone(&self.store), Arc::clone(&self.lookup), self.notifier.clone())
    }

    pub fn phase(&self) -> SyncPhase {
        model::read(&self.store).phase
    }

    /// Full backpack; answered with a snapshot.
    pub async fn request_backpack(&self, player_id: PlayerId) -> Result<(), SendError> {
        self.sink
            .send_message(MessageId::GetBackpack, &BackpackRequest { player_id })
            .await
    }

    /// One backpack type; merged into the cache.
    pub async fn request_backpack_by_type(
        &self,
        player_id: PlayerId,
        backpack_type: BackpackTypeId,
    ) -> Result<(), SendError> {
        self.sink
            .send_message(
                MessageId::GetBackpackByType,
                &BackpackByTypeRequest {
                    player_id,
                    backpack_type,
                },
            )
            .await
    }

    pub async fn request_use_item(&self, player_id: PlayerId, item_id: ItemId, quantity: i32) -> Result<(), SendError> {
        self.sink
            .send_message(
                MessageId::UseItem,
                &ItemQuantityRequest {
                    player_id,
                    item_id,
                    quantity,
                },
            )
            .await
    }

    pub async fn request_add_item(&self, player_id: PlayerId, item_id: ItemId, quantity: i32) -> Result<(), SendError> {
        self.sink
            .send_message(
                MessageId::AddItem,
                &ItemQuantityRequest {
                    player_id,
                    item_id,
                    quantity,
                },
            )
            .await
    }

    pub fn items(&self) -> Vec<ItemRecord> {
        model::read(&self.store).cache.values().cloned().collect()
    }

    pub fn group(&self, backpack_type: BackpackTypeId) -> Vec<ItemRecord> {
        model::read(&self.store)
            .cache
            .group(backpack_type)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn backpack_types(&self) -> Vec<BackpackTypeId> {
        model::read(&self.store).cache.groups().map(|(group, _)| *group).collect()
    }

    pub fn item(&self, item_id: ItemId) -> Option<ItemRecord> {
        model::read(&self.store).cache.get(item_id).cloned()
    }

    pub fn quantity_of(&self, item_id: ItemId) -> i32 {
        model::read(&self.store)
            .cache
            .get(item_id)
            .map_or(0, |item| item.quantity)
    }

    pub fn count(&self) -> usize {
        model::read(&self.store).cache.len()
    }
}

fn merge_and_notify(
    store: &RwLock<DomainStore<InventoryCache>>,
    lookup: &dyn ItemGroupLookup,
    notifier: &Notifier,
    items: Vec<ItemRecord>,
) {
    let (report, removed) = {
        let mut guard = model::write(store);
        let (depleted, stocked): (Vec<_>, Vec<_>) = items.into_iter().partition(|item| item.quantity <= 0);
        let removed = depleted
            .iter()
            .filter(|item| guard.cache.remove(item.id).is_some())
            .count();
        let report: ApplyReport = guard.cache.merge(stocked, |item| lookup.backpack_type_of(item.id));
        (report, removed)
    };
    debug!(
        target: "game_sync::inventory",
        applied = report.applied,
        removed,
        dropped = report.dropped,
        "backpack update merged"
    );
    if report.applied + removed > 0 {
        notifier.publish(SyncEvent::InventoryUpdated);
    }
}
