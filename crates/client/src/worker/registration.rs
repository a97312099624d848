//! Worker registration: the slot holding the current worker for an origin.

use super::lifecycle::ActivationReport;
use super::{Clients, EventOutcome, ServiceWorker, WorkerEvent, WorkerSettings, WorkerState};
use crate::fetch::Network;
use std::sync::Arc;
use swcache_core::{CacheStorage, Error};
use tokio::sync::{Mutex, RwLock};

/// A worker that finished installing and is waiting to activate.
#[derive(Debug)]
pub struct Installation {
    pub worker: Arc<ServiceWorker>,
    /// Entries written by the precache.
    pub entries: usize,
    /// A page was already controlled when the new worker finished installing.
    pub update_available: bool,
}

/// A worker that took over as the active one.
#[derive(Debug)]
pub struct Activation {
    pub worker: Arc<ServiceWorker>,
    pub report: ActivationReport,
    /// Store name of the worker this one replaced.
    pub replaced: Option<String>,
}

/// Result of installing and activating a new worker in one step.
#[derive(Debug)]
pub struct UpdateOutcome {
    pub worker: Arc<ServiceWorker>,
    pub entries: usize,
    pub activation: ActivationReport,
    pub update_available: bool,
    pub replaced: Option<String>,
}

/// Holds the waiting and active workers and the clients they control.
pub struct Registration {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    clients: Arc<Clients>,
    waiting: RwLock<Option<Arc<ServiceWorker>>>,
    active: RwLock<Option<Arc<ServiceWorker>>>,
    updating: Mutex<()>,
}

impl Registration {
    pub fn new(storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self {
            storage,
            network,
            clients: Arc::new(Clients::new()),
            waiting: RwLock::new(None),
            active: RwLock::new(None),
            updating: Mutex::new(()),
        }
    }

    pub fn clients(&self) -> &Arc<Clients> {
        &self.clients
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    pub async fn active(&self) -> Option<Arc<ServiceWorker>> {
        self.active.read().await.clone()
    }

    pub async fn waiting(&self) -> Option<Arc<ServiceWorker>> {
        self.waiting.read().await.clone()
    }

    /// Install a new worker for `settings` and park it as the waiting worker.
    ///
    /// A failed install leaves the active worker untouched and clears nothing;
    /// a previously waiting worker is replaced only on success.
    pub async fn install(&self, settings: WorkerSettings) -> Result<Installation, Error> {
        let _guard = self.updating.lock().await;
        self.install_locked(settings).await
    }

    /// Activate the waiting worker in place of the active one.
    pub async fn activate(&self) -> Result<Activation, Error> {
        let _guard = self.updating.lock().await;
        self.activate_locked().await
    }

    /// Install and immediately activate a worker for `settings`.
    ///
    /// When the active worker already serves the same generation it is
    /// returned as is: nothing is fetched and no update is flagged.
    pub async fn update(&self, settings: WorkerSettings) -> Result<UpdateOutcome, Error> {
        let _guard = self.updating.lock().await;
        let current = self
            .active()
            .await
            .filter(|worker| worker.cache_name() == settings.generation.store_name());
        if let Some(worker) = current {
            tracing::debug!(cache = %worker.cache_name(), "worker already current");
            return Ok(UpdateOutcome {
                worker,
                entries: 0,
                activation: ActivationReport::default(),
                update_available: false,
                replaced: None,
            });
        }

        let installation = self.install_locked(settings).await?;
        let activation = self.activate_locked().await?;

        Ok(UpdateOutcome {
            worker: activation.worker,
            entries: installation.entries,
            activation: activation.report,
            update_available: installation.update_available,
            replaced: activation.replaced,
        })
    }

    async fn install_locked(&self, settings: WorkerSettings) -> Result<Installation, Error> {
        let worker = Arc::new(ServiceWorker::with_clients(
            settings,
            self.storage.clone(),
            self.network.clone(),
            self.clients.clone(),
        ));

        let entries = worker.install().await?;
        let update_available = self
            .clients
            .match_all()
            .await
            .iter()
            .any(|w| w.controller.is_some());
        if update_available {
            tracing::info!(cache = %worker.cache_name(), "new version installed while a page is controlled");
        }

        if let Some(old) = self.waiting.write().await.replace(worker.clone()) {
            old.set_state(WorkerState::Redundant).await;
        }

        Ok(Installation { worker, entries, update_available })
    }

    async fn activate_locked(&self) -> Result<Activation, Error> {
        let Some(worker) = self.waiting.write().await.take() else {
            return Err(Error::InvalidState { expected: "waiting worker".into(), actual: "none".into() });
        };

        let report = match worker.activate().await {
            Ok(report) => report,
            Err(e) => {
                *self.waiting.write().await = Some(worker);
                return Err(e);
            }
        };

        let previous = self.active.write().await.replace(worker.clone());
        let replaced = match previous {
            Some(old) => {
                old.set_state(WorkerState::Redundant).await;
                Some(old.cache_name().to_string())
            }
            None => None,
        };

        Ok(Activation { worker, report, replaced })
    }

    /// Rebuild the worker for `settings` from a store left by an earlier
    /// process, parking it as the waiting worker. Returns `None` when the
    /// store does not exist.
    pub async fn restore_waiting(&self, settings: WorkerSettings) -> Result<Option<Arc<ServiceWorker>>, Error> {
        let _guard = self.updating.lock().await;
        let Some(worker) = self.restore(settings, WorkerState::Installed).await? else {
            return Ok(None);
        };
        *self.waiting.write().await = Some(worker.clone());
        Ok(Some(worker))
    }

    /// Rebuild the worker for `settings` as the active worker without
    /// running activation. Returns `None` when the store does not exist.
    pub async fn resume_active(&self, settings: WorkerSettings) -> Result<Option<Arc<ServiceWorker>>, Error> {
        let _guard = self.updating.lock().await;
        let Some(worker) = self.restore(settings, WorkerState::Activated).await? else {
            return Ok(None);
        };
        *self.active.write().await = Some(worker.clone());
        tracing::info!(cache = %worker.cache_name(), "resumed worker from existing cache");
        Ok(Some(worker))
    }

    async fn restore(&self, settings: WorkerSettings, state: WorkerState) -> Result<Option<Arc<ServiceWorker>>, Error> {
        if !self.storage.has_store(settings.generation.store_name()).await? {
            return Ok(None);
        }
        Ok(Some(Arc::new(ServiceWorker::in_state(
            settings,
            self.storage.clone(),
            self.network.clone(),
            self.clients.clone(),
            state,
        ))))
    }

    /// Deliver an event to the active worker.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome, Error> {
        match self.active().await {
            Some(worker) => worker.dispatch(event).await,
            None => Err(Error::InvalidState { expected: "active worker".into(), actual: "none".into() }),
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration").finish_non_exhaustive()
    }
}
