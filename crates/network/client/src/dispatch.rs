//! Routing eingehender Frames an genau einen Handler pro Nachrichten-ID.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use tracing::{trace, warn};

/// Handler für die Payload eines Frames. Läuft synchron in der Lese-Schleife
/// und darf deshalb nicht blockieren.
pub type Handler = Arc<dyn Fn(&[u8]) + Send + Sync + 'static>;

/// Registry `message id -> handler`. Eine erneute Registrierung ersetzt den
/// vorherigen Handler.
#[derive(Default)]
pub struct Dispatcher {
    handlers: RwLock<HashMap<i32, Handler>>,
    unhandled: AtomicU64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, message_id: impl Into<i32>, handler: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        let message_id = message_id.into();
        let replaced = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(message_id, Arc::new(handler))
            .is_some();
        if replaced {
            trace!(target: "network::dispatch", message_id, "handler replaced");
        }
    }

    pub fn unregister(&self, message_id: impl Into<i32>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&message_id.into());
    }

    /// Ruft den Handler für `message_id` auf. Liefert `false`, wenn keiner
    /// registriert ist; der Frame wird dann verworfen.
    pub fn dispatch(&self, message_id: i32, payload: &[u8]) -> bool {
        // Klonen statt Lock halten: Handler dürfen selbst (de)registrieren.
        let handler = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&message_id)
            .cloned();

        match handler {
            Some(handler) => {
                handler(payload);
                true
            }
            None => {
                self.unhandled.fetch_add(1, Ordering::Relaxed);
                warn!(
                    target: "network::dispatch",
                    message_id,
                    payload_len = payload.len(),
                    "no handler registered, frame dropped"
                );
                false
            }
        }
    }

    pub fn is_registered(&self, message_id: impl Into<i32>) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&message_id.into())
    }

    pub fn len(&self) -> usize {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Anzahl verworfener Frames ohne Handler.
    pub fn unhandled_count(&self) -> u64 {
        self.unhandled.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<i32> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort_unstable();
        f.debug_struct("Dispatcher")
            .field("registered", &ids)
            .field("unhandled", &self.unhandled_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use network_shared::MessageId;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<Vec<u8>>>>, impl Fn(&[u8]) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |payload: &[u8]| sink.lock().unwrap().push(payload.to_vec()))
    }

    #[test]
    fn dispatch_reaches_registered_handler_once() {
        let d = Dispatcher::new();
        let (seen, handler) = recorder();
        d.register(MessageId::GetBackpackResponse, handler);

        assert!(d.dispatch(2002, b"abc"));
        assert_eq!(seen.lock().unwrap().as_slice(), &[b"abc".to_vec()]);
    }

    #[test]
    fn last_registration_wins() {
        let d = Dispatcher::new();
        let (first, h1) = recorder();
        let (second, h2) = recorder();
        d.register(7, h1);
        d.register(7, h2);

        d.dispatch(7, b"x");
        assert!(first.lock().unwrap().is_empty());
        assert_eq!(second.lock().unwrap().len(), 1);
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn unknown_id_is_dropped_and_counted() {
        let d = Dispatcher::new();
        assert!(!d.dispatch(9999, b""));
        assert_eq!(d.unhandled_count(), 1);
    }

    #[test]
    fn unregister_is_noop_when_absent() {
        let d = Dispatcher::new();
        d.unregister(1);
        let (_, h) = recorder();
        d.register(1, h);
        assert!(d.is_registered(1));
        d.unregister(1);
        assert!(!d.is_registered(1));
        assert!(d.is_empty());
    }

    #[test]
    fn handler_may_unregister_itself() {
        let d = Arc::new(Dispatcher::new());
        let inner = Arc::clone(&d);
        d.register(5, move |_| inner.unregister(5));
        assert!(d.dispatch(5, b""));
        assert!(!d.is_registered(5));
    }

    #[test]
    fn concurrent_register_and_dispatch() {
        let d = Arc::new(Dispatcher::new());
        let threads: Vec<_> = (0..4)
            .map(|t| {
                let d = Arc::clone(&d);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        d.register(i % 10, move |_| {});
                        d.dispatch((i + t) % 10, b"p");
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(d.len(), 10);
    }
}
