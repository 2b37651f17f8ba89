//! Verwaltung des clientseitigen Tokio-Runtimes.

use std::{future::Future, sync::Arc};

use thiserror::Error;
use tokio::runtime::{Builder, Handle, Runtime};

/// Gemeinsamer Zugriffspunkt auf den Client-Netzwerkruntime.
///
/// Entweder besitzt die Struktur einen eigenen Runtime (`multi_thread`) oder
/// sie leiht sich den Handle eines bereits laufenden (`current`, `from_handle`).
#[derive(Debug, Clone)]
pub struct ClientNetworkRuntime {
    handle: Handle,
    _owned: Option<Arc<Runtime>>,
}

impl ClientNetworkRuntime {
    /// Baut einen Multi-Thread-Runtime mit zwei Worker-Threads für clientseitige Aufgaben.
    pub fn multi_thread() -> Result<Self, RuntimeError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("sync-client-net")
            .enable_all()
            .build()
            .map_err(RuntimeError::Build)?;
        Ok(Self {
            handle: runtime.handle().clone(),
            _owned: Some(Arc::new(runtime)),
        })
    }

    /// Nutzt einen fremden Runtime, z. B. den der Tests.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            _owned: None,
        }
    }

    /// Handle des Runtimes, in dem der Aufrufer gerade läuft.
    pub fn current() -> Result<Self, RuntimeError> {
        Handle::try_current()
            .map(Self::from_handle)
            .map_err(|_| RuntimeError::NoCurrentRuntime)
    }

    /// Spawnt ein Future auf dem Runtime.
    pub fn spawn<F>(&self, future: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Blockiert den aktuellen Thread bis das Future fertig ist.
    /// Darf nicht aus einem Runtime-Thread heraus aufgerufen werden.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.handle.block_on(future)
    }

    /// Liefert einen Klon des Handles.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }
}

/// Fehler, die beim Aufbau des Runtimes auftreten können.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to build tokio runtime: {0}")]
    Build(std::io::Error),
    #[error("no tokio runtime is running on this thread")]
    NoCurrentRuntime,
}
