use tokio::sync::broadcast;
use tracing::trace;

use crate::{profile::PlayerProfile, roster::OperatorRecord, stage::StageRecord};

/// Published after a cache change has been committed.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    InventoryReceived,
    InventoryUpdated,
    OperatorDataReceive,
    OperatorDataUpdate(OperatorRecord),
    StageDataReceive,
    StageDataUpdate(StageRecord),
    PlayerDataReceive(PlayerProfile),
    PlayerDataUpdate(PlayerProfile),
}

impl SyncEvent {
    /// Stable name for UI bindings and logs.
    pub const fn name(&self) -> &'static str {
        match self {
            SyncEvent::InventoryReceived => "OnBackpackDataReceive",
            SyncEvent::InventoryUpdated => "OnBackpackDataUpdate",
            SyncEvent::OperatorDataReceive => "OnOperatorDataReceive",
            SyncEvent::OperatorDataUpdate(_) => "OnOperatorDataUpdate",
            SyncEvent::StageDataReceive => "OnStageDataReceive",
            SyncEvent::StageDataUpdate(_) => "OnStageDataUpdate",
            SyncEvent::PlayerDataReceive(_) => "OnPlayerDataReceive",
            SyncEvent::PlayerDataUpdate(_) => "OnPlayerDataUpdate",
        }
    }
}

/// Fan-out of [`SyncEvent`]s. Publishing never blocks; subscribers that fall
/// behind lose the oldest events.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<SyncEvent>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, event: SyncEvent) {
        trace!(target: "game_sync::events", name = event.name(), "publish");
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_silent() {
        let notifier = Notifier::new(4);
        notifier.publish(SyncEvent::InventoryReceived);
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn every_subscriber_sees_every_event() {
        let notifier = Notifier::new(4);
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();
        notifier.publish(SyncEvent::StageDataReceive);

        assert_eq!(a.try_recv().unwrap().name(), "OnStageDataReceive");
        assert_eq!(b.try_recv().unwrap(), SyncEvent::StageDataReceive);
    }

    #[test]
    fn lagging_subscriber_loses_oldest() {
        let notifier = Notifier::new(2);
        let mut rx = notifier.subscribe();
        for _ in 0..3 {
            notifier.publish(SyncEvent::InventoryUpdated);
        }
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(1))
        ));
        assert_eq!(rx.try_recv().unwrap(), SyncEvent::InventoryUpdated);
    }
}
