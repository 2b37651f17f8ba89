//! Stage progress synchronisation, grouped by chapter.

use std::sync::{Arc, RwLock};

use network_client::{Dispatcher, MessageSink, SendError};
use network_shared::MessageId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    ChapterId, OperatorId, StageId,
    cache::{GroupedCache, Record},
    events::{Notifier, SyncEvent},
    lookup::StageGroupLookup,
    model::{self, DomainStore, SharedStore, SyncPhase},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub stage_id: StageId,
    #[serde(default)]
    pub star: i32,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub operator_ids: Vec<OperatorId>,
}

impl Record for StageRecord {
    type Id = StageId;

    fn id(&self) -> StageId {
        self.stage_id
    }
}

type StageCache = GroupedCache<ChapterId, StageRecord>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveStageRequest<'a> {
    stage_id: StageId,
    star: i32,
    operator_ids: &'a [OperatorId],
}

pub struct StageModel<T> {
    sink: Arc<T>,
    dispatcher: Arc<Dispatcher>,
    lookup: Arc<dyn StageGroupLookup>,
    notifier: Notifier,
    store: SharedStore<StageCache>,
}

impl<T: MessageSink> StageModel<T> {
    pub fn new(
        sink: Arc<T>,
        dispatcher: Arc<Dispatcher>,
        lookup: Arc<dyn StageGroupLookup>,
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

    pub fn init(&self) {
        model::write(&self.store).reset();
        let codec = self.sink.codec().clone();

        let store = Arc::clone(&self.store);
        let lookup = Arc::clone(&self.lookup);
        let notifier = self.notifier.clone();
        model::on_response(
            &self.dispatcher,
            MessageId::GetPlayerStagesResponse,
            codec.clone(),
            move |stages: Vec<StageRecord>| {
                let report = model::write(&store)
                    .snapshot(|cache| cache.replace_all(stages, |stage| lookup.chapter_of(stage.stage_id)));
                info!(target: "game_sync::stage", applied = report.applied, dropped = report.dropped, "stage snapshot applied");
                notifier.publish(SyncEvent::StageDataReceive);
            },
        );

        let store = Arc::clone(&self.store);
        let lookup = Arc::clone(&self.lookup);
        let notifier = self.notifier.clone();
        model::on_response(
            &self.dispatcher,
            MessageId::SaveStageRecordResponse,
            codec,
            move |stage: StageRecord| {
                apply_update(&store, lookup.as_ref(), &notifier, stage);
            },
        );
        debug!(target: "game_sync::stage", "handlers registered");
    }

    pub fn unregister_handlers(&self) {
        self.dispatcher.unregister(MessageId::GetPlayerStagesResponse);
        self.dispatcher.unregister(MessageId::SaveStageRecordResponse);
    }

    pub fn phase(&self) -> SyncPhase {
        model::read(&self.store).phase
    }

    /// All stage records of the logged-in player (empty request body).
    pub async fn request_player_stages(&self) -> Result<(), SendError> {
        self.sink.send_empty(MessageId::GetPlayerStages).await
    }

    pub async fn request_save_stage_record(
        &self,
        stage_id: StageId,
        star: i32,
        operator_ids: &[OperatorId],
    ) -> Result<(), SendError> {
        self.sink
            .send_message(
                MessageId::SaveStageRecord,
                &SaveStageRequest {
                    stage_id,
                    star,
                    operator_ids,
                },
            )
            .await
    }

    pub fn stages(&self) -> Vec<StageRecord> {
        model::read(&self.store).cache.values().cloned().collect()
    }

    pub fn chapter(&self, chapter: ChapterId) -> Vec<StageRecord> {
        model::read(&self.store)
            .cache
            .group(chapter)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn stage(&self, stage_id: StageId) -> Option<StageRecord> {
        model::read(&self.store).cache.get(stage_id).cloned()
    }

    pub fn is_stage_passed(&self, stage_id: StageId) -> bool {
        model::read(&self.store)
            .cache
            .get(stage_id)
            .is_some_and(|stage| stage.passed)
    }

    pub fn stars_in_chapter(&self, chapter: ChapterId) -> i32 {
        model::read(&self.store)
            .cache
            .group(chapter)
            .map_or(0, |members| members.values().map(|stage| stage.star).sum())
    }

    pub fn count(&self) -> usize {
        model::read(&self.store).cache.len()
    }
}

fn apply_update(
    store: &RwLock<DomainStore<StageCache>>,
    lookup: &dyn StageGroupLookup,
    notifier: &Notifier,
    stage: StageRecord,
) {
    let report = model::write(store)
        .cache
        .merge([stage.clone()], |record| lookup.chapter_of(record.stage_id));
    if report.applied == 0 {
        return;
    }
    debug!(target: "game_sync::stage", stage_id = stage.stage_id, star = stage.star, "stage record saved");
    notifier.publish(SyncEvent::StageDataUpdate(stage));
}
