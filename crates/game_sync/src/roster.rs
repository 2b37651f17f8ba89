//! Operator roster synchronisation.

use std::sync::{Arc, RwLock};

use network_client::{Dispatcher, MessageSink, SendError};
use network_shared::MessageId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    ItemId, OperatorId,
    cache::{KeyedCache, Record},
    events::{Notifier, SyncEvent},
    model::{self, DomainStore, SharedStore, SyncPhase},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRecord {
    pub skill_id: i32,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub mastery_level: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorRecord {
    pub operator_id: OperatorId,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub elite_level: i32,
    #[serde(default)]
    pub exp: i32,
    #[serde(default)]
    pub current_hp: i32,
    #[serde(default)]
    pub skills: Vec<SkillRecord>,
}

impl Record for OperatorRecord {
    type Id = OperatorId;

    fn id(&self) -> OperatorId {
        self.operator_id
    }

    fn is_valid(&self) -> bool {
        self.operator_id > 0
    }
}

/// Material spent on a level-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCost {
    pub item_id: ItemId,
    pub quantity: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OperatorRequest {
    operator_id: OperatorId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LevelUpRequest<'a> {
    operator_id: OperatorId,
    item_list: &'a [ItemCost],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SkillRequest {
    operator_id: OperatorId,
    skill_id: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HpRequest {
    operator_id: OperatorId,
    current_hp: i32,
}

const UPDATE_RESPONSES: [MessageId; 6] = [
    MessageId::AddOperatorResponse,
    MessageId::LevelUpOperatorResponse,
    MessageId::EliteOperatorResponse,
    MessageId::UpgradeSkillResponse,
    MessageId::MasterSkillResponse,
    MessageId::UpdateOperatorHpResponse,
];

pub struct RosterModel<T> {
    sink: Arc<T>,
    dispatcher: Arc<Dispatcher>,
    notifier: Notifier,
    store: SharedStore<KeyedCache<OperatorRecord>>,
}

impl<T: MessageSink> RosterModel<T> {
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

        let store = Arc::clone(&self.store);
        let notifier = self.notifier.clone();
        model::on_response(
            &self.dispatcher,
            MessageId::GetPlayerOperatorsResponse,
            codec.clone(),
            move |operators: Vec<OperatorRecord>| {
                if operators.is_empty() {
                    warn!(target: "game_sync::roster", "server sent an empty operator list");
                }
                let report = model::write(&store).snapshot(|cache| cache.replace_all(operators));
                info!(target: "game_sync::roster", stored = report.applied, dropped = report.dropped, "operator snapshot applied");
                notifier.publish(SyncEvent::OperatorDataReceive);
            },
        );

        for message_id in UPDATE_RESPONSES {
            let store = Arc::clone(&self.store);
            let notifier = self.notifier.clone();
            model::on_response(&self.dispatcher, message_id, codec.clone(), move |operator: OperatorRecord| {
                apply_update(&store, &notifier, operator);
            });
        }
        debug!(target: "game_sync::roster", "handlers registered");
    }

    pub fn unregister_handlers(&self) {
        self.dispatcher.unregister(MessageId::GetPlayerOperatorsResponse);
        for message_id in UPDATE_RESPONSES {
            self.dispatcher.unregister(message_id);
        }
    }

    pub fn phase(&self) -> SyncPhase {
        model::read(&self.store).phase
    }

    pub async fn request_operators(&self) -> Result<(), SendError> {
        self.sink.send_empty(MessageId::GetPlayerOperators).await
    }

    pub async fn request_add_operator(&self, operator_id: OperatorId) -> Result<(), SendError> {
        self.sink
            .send_message(MessageId::AddOperator, &OperatorRequest { operator_id })
            .await
    }

    pub async fn request_level_up(&self, operator_id: OperatorId, items: &[ItemCost]) -> Result<(), SendError> {
        self.sink
            .send_message(
                MessageId::LevelUpOperator,
                &LevelUpRequest {
                    operator_id,
                    item_list: items,
                },
            )
            .await
    }

    pub async fn request_elite_promote(&self, operator_id: OperatorId) -> Result<(), SendError> {
        self.sink
            .send_message(MessageId::EliteOperator, &OperatorRequest { operator_id })
            .await
    }

    pub async fn request_upgrade_skill(&self, operator_id: OperatorId, skill_id: i32) -> Result<(), SendError> {
        self.sink
            .send_message(MessageId::UpgradeSkill, &SkillRequest { operator_id, skill_id })
            .await
    }

    pub async fn request_master_skill(&self, operator_id: OperatorId, skill_id: i32) -> Result<(), SendError> {
        self.sink
            .send_message(MessageId::MasterSkill, &SkillRequest { operator_id, skill_id })
            .await
    }

    pub async fn request_update_hp(&self, operator_id: OperatorId, current_hp: i32) -> Result<(), SendError> {
        self.sink
            .send_message(MessageId::UpdateOperatorHp, &HpRequest { operator_id, current_hp })
            .await
    }

    pub fn operators(&self) -> Vec<OperatorRecord> {
        model::read(&self.store).cache.values().cloned().collect()
    }

    pub fn operator(&self, operator_id: OperatorId) -> Option<OperatorRecord> {
        model::read(&self.store).cache.get(operator_id).cloned()
    }

    pub fn has_operator(&self, operator_id: OperatorId) -> bool {
        model::read(&self.store).cache.get(operator_id).is_some()
    }

    pub fn count(&self) -> usize {
        model::read(&self.store).cache.len()
    }
}

fn apply_update(store: &RwLock<DomainStore<KeyedCache<OperatorRecord>>>, notifier: &Notifier, operator: OperatorRecord) {
    let report = model::write(store).cache.merge([operator.clone()]);
    if report.applied == 0 {
        return;
    }
    debug!(
        target: "game_sync::roster",
        operator_id = operator.operator_id,
        level = operator.level,
        elite_level = operator.elite_level,
        "operator updated"
    );
    notifier.publish(SyncEvent::OperatorDataUpdate(operator));
}
