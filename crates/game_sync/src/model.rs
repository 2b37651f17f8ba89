use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use network_client::Dispatcher;
use network_shared::{MessageId, MessageSerializer, ServerResponse};
use serde::de::DeserializeOwned;
use tracing::warn;

/// Lifecycle of a domain model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    /// Handlers not registered yet.
    #[default]
    Uninitialized,
    /// Handlers registered, cache empty until the first snapshot.
    Initialized,
    /// At least one full snapshot applied.
    Populated,
}

/// Cache plus lifecycle phase, guarded together.
#[derive(Debug, Default)]
pub(crate) struct DomainStore<C> {
    pub cache: C,
    pub phase: SyncPhase,
}

pub(crate) type SharedStore<C> = std::sync::Arc<RwLock<DomainStore<C>>>;

pub(crate) fn read<C>(store: &RwLock<DomainStore<C>>) -> RwLockReadGuard<'_, DomainStore<C>> {
    store.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<C>(store: &RwLock<DomainStore<C>>) -> RwLockWriteGuard<'_, DomainStore<C>> {
    store.write().unwrap_or_else(PoisonError::into_inner)
}

impl<C: Default> DomainStore<C> {
    /// Empties the cache and marks the model ready for its first snapshot.
    pub fn reset(&mut self) {
        self.cache = C::default();
        self.phase = SyncPhase::Initialized;
    }

    /// Runs `apply` as a full snapshot.
    pub fn snapshot<R>(&mut self, apply: impl FnOnce(&mut C) -> R) -> R {
        let result = apply(&mut self.cache);
        self.phase = SyncPhase::Populated;
        result
    }
}

/// Decodes a `{success, message, data}` envelope. Undecodable payloads and
/// rejected requests are logged and yield `None`.
pub(crate) fn decode_envelope<S, T>(codec: &S, message_id: MessageId, payload: &[u8]) -> Option<T>
where
    S: MessageSerializer,
    T: DeserializeOwned,
{
    let response: ServerResponse<T> = match codec.deserialize(payload) {
        Ok(response) => response,
        Err(err) => {
            warn!(
                target: "game_sync",
                message_id = %message_id,
                payload_len = payload.len(),
                error = %err,
                "undecodable response dropped"
            );
            return None;
        }
    };
    match response.into_result() {
        Ok(data) => Some(data),
        Err(err) => {
            warn!(target: "game_sync", message_id = %message_id, error = %err, "response ignored");
            None
        }
    }
}

/// Decodes a server push (bare records, no envelope).
pub(crate) fn decode_push<S, T>(codec: &S, message_id: MessageId, payload: &[u8]) -> Option<T>
where
    S: MessageSerializer,
    T: DeserializeOwned,
{
    match codec.deserialize(payload) {
        Ok(data) => Some(data),
        Err(err) => {
            warn!(
                target: "game_sync",
                message_id = %message_id,
                payload_len = payload.len(),
                error = %err,
                "undecodable push dropped"
            );
            None
        }
    }
}

/// Registers a handler that decodes an envelope of `T` and hands the data to `apply`.
pub(crate) fn on_response<S, T, F>(dispatcher: &Dispatcher, message_id: MessageId, codec: S, apply: F)
where
    S: MessageSerializer,
    T: DeserializeOwned,
    F: Fn(T) + Send + Sync + 'static,
{
    dispatcher.register(message_id, move |payload: &[u8]| {
        if let Some(data) = decode_envelope::<S, T>(&codec, message_id, payload) {
            apply(data);
        }
    });
}

/// Registers a handler for a server push carrying a bare `T`.
pub(crate) fn on_push<S, T, F>(dispatcher: &Dispatcher, message_id: MessageId, codec: S, apply: F)
where
    S: MessageSerializer,
    T: DeserializeOwned,
    F: Fn(T) + Send + Sync + 'static,
{
    dispatcher.register(message_id, move |payload: &[u8]| {
        if let Some(data) = decode_push::<S, T>(&codec, message_id, payload) {
            apply(data);
        }
    });
}
