//! Offline cache worker.
//!
//! ### Lifecycle
//! - `install` fetches the precache manifest and writes it into the new
//!   generation's store in one transaction; any failure leaves no store.
//! - `activate` deletes stale generations, then claims open clients.
//!
//! ### Fetch Interception
//! - Cache-first for GET requests on non-bypassed schemes.
//! - Misses go to the network once; `200 basic` same-origin responses are
//!   written back in the background.
//! - Failed HTML navigations fall back to the precached offline document;
//!   other failures get a synthetic `408`.
//!
//! ### Events
//! - Every host event goes through [`ServiceWorker::dispatch`], which returns
//!   the handler's result together with a [`WaitUntil`] for background work.

pub mod clients;
pub mod completion;
pub mod intercept;
pub mod lifecycle;
pub mod notify;
pub mod registration;

pub use clients::{ClientId, Clients, WindowClient};
pub use completion::WaitUntil;
pub use intercept::{FetchDisposition, OFFLINE_BODY, ResponseSource};
pub use lifecycle::ActivationReport;
pub use notify::{ClickAction, Notification, NotificationCenter, NotificationData};
pub use registration::{Activation, Installation, Registration, UpdateOutcome};

use crate::fetch::Network;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use swcache_core::{AppConfig, CacheStorage, DeletionScope, Error, Generation, Request};
use tokio::sync::RwLock;
use url::Url;

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Created, no install attempted yet
    Parsed,
    Installing,
    /// Precache complete, waiting to activate
    Installed,
    Activating,
    /// Current generation, intercepting fetches
    Activated,
    /// Failed install or replaced by a newer worker
    Redundant,
}

impl WorkerState {
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Notification content used by the push handler.
#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub title: String,
    pub default_body: String,
    pub icon: Url,
    pub badge: Url,
    pub vibrate: Vec<u32>,
}

/// Everything a worker needs to know about its deployment.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub generation: Generation,
    pub deletion_scope: DeletionScope,
    pub origin: Url,
    /// App root; notification clicks focus or open this.
    pub scope_url: Url,
    pub precache: Vec<Url>,
    pub offline_document: Url,
    pub bypass_schemes: Vec<String>,
    pub notifications: NotificationSettings,
    pub sync_tag: String,
}

impl WorkerSettings {
    /// Resolve settings from application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let invalid = |e: swcache_core::config::ConfigError| Error::InvalidUrl(e.to_string());
        let icon = config.resolve(&config.notification_icon).map_err(invalid)?;

        Ok(Self {
            generation: config.generation(),
            deletion_scope: config.deletion_scope(),
            origin: config.origin_url().map_err(invalid)?,
            scope_url: config.scope_url().map_err(invalid)?,
            precache: config.precache_urls().map_err(invalid)?,
            offline_document: config.offline_url().map_err(invalid)?,
            bypass_schemes: config.bypass_schemes.clone(),
            notifications: NotificationSettings {
                title: config.app_title.clone(),
                default_body: config.push_default_body.clone(),
                badge: icon.clone(),
                icon,
                vibrate: vec![100, 50, 100],
            },
            sync_tag: config.sync_tag.clone(),
        })
    }
}

/// Event kinds a host can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
    Push,
    NotificationClick,
    Sync,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Install => "install",
            EventKind::Activate => "activate",
            EventKind::Fetch => "fetch",
            EventKind::Push => "push",
            EventKind::NotificationClick => "notificationclick",
            EventKind::Sync => "sync",
        };
        f.write_str(s)
    }
}

/// A host event with its payload.
#[derive(Debug)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    Push(Option<Bytes>),
    NotificationClick(u64),
    Sync(String),
}

impl WorkerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WorkerEvent::Install => EventKind::Install,
            WorkerEvent::Activate => EventKind::Activate,
            WorkerEvent::Fetch(_) => EventKind::Fetch,
            WorkerEvent::Push(_) => EventKind::Push,
            WorkerEvent::NotificationClick(_) => EventKind::NotificationClick,
            WorkerEvent::Sync(_) => EventKind::Sync,
        }
    }
}

/// What a handler produced.
#[derive(Debug)]
pub enum EventResult {
    Installed { entries: usize },
    Activated { deleted: Vec<String>, claimed: usize },
    Fetch(FetchDisposition),
    Notified(Notification),
    NotificationClicked(ClickAction),
    Synced { handled: bool },
}

/// Handler result plus the work the host must wait for.
#[derive(Debug)]
pub struct EventOutcome {
    pub result: EventResult,
    pub wait_until: WaitUntil,
}

impl EventOutcome {
    fn done(result: EventResult) -> Self {
        Self { result, wait_until: WaitUntil::new() }
    }
}

/// The offline cache worker for one cache generation.
pub struct ServiceWorker {
    settings: WorkerSettings,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
    clients: Arc<Clients>,
    notifications: NotificationCenter,
}

impl ServiceWorker {
    pub fn new(settings: WorkerSettings, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self::with_clients(settings, storage, network, Arc::new(Clients::new()))
    }

    /// Create a worker sharing an existing client registry, so a replacement
    /// worker can claim the pages its predecessor controlled.
    pub fn with_clients(
        settings: WorkerSettings, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, clients: Arc<Clients>,
    ) -> Self {
        Self::in_state(settings, storage, network, clients, WorkerState::Parsed)
    }

    /// A worker whose generation was precached by an earlier process.
    pub(crate) fn in_state(
        settings: WorkerSettings, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, clients: Arc<Clients>,
        state: WorkerState,
    ) -> Self {
        Self {
            settings,
            storage,
            network,
            state: RwLock::new(state),
            skip_waiting: AtomicBool::new(false),
            clients,
            notifications: NotificationCenter::new(),
        }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Name of the store this worker owns.
    pub fn cache_name(&self) -> &str {
        self.settings.generation.store_name()
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub(crate) async fn set_state(&self, state: WorkerState) {
        let mut current = self.state.write().await;
        if *current != state {
            tracing::debug!(cache = %self.cache_name(), from = %*current, to = %state, "worker state change");
            *current = state;
        }
    }

    /// Move from `from` to `to` under one write guard, failing if the worker
    /// is in any other state.
    pub(crate) async fn transition(&self, from: WorkerState, to: WorkerState) -> Result<(), Error> {
        let mut current = self.state.write().await;
        if *current != from {
            return Err(Error::InvalidState { expected: from.to_string(), actual: current.to_string() });
        }
        tracing::debug!(cache = %self.cache_name(), from = %from, to = %to, "worker state change");
        *current = to;
        Ok(())
    }

    /// Whether a successful install asked to skip the waiting phase.
    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn clients(&self) -> &Arc<Clients> {
        &self.clients
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    /// Route an event to its handler.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome, Error> {
        let kind = event.kind();
        tracing::debug!(event = %kind, cache = %self.cache_name(), "dispatching worker event");

        match event {
            WorkerEvent::Install => {
                let entries = self.install().await?;
                Ok(EventOutcome::done(EventResult::Installed { entries }))
            }
            WorkerEvent::Activate => {
                let report = self.activate().await?;
                Ok(EventOutcome::done(EventResult::Activated { deleted: report.deleted, claimed: report.claimed }))
            }
            WorkerEvent::Fetch(request) => {
                let (disposition, wait_until) = self.handle_fetch(request).await?;
                Ok(EventOutcome { result: EventResult::Fetch(disposition), wait_until })
            }
            WorkerEvent::Push(payload) => {
                let notification = self.push(payload).await;
                Ok(EventOutcome::done(EventResult::Notified(notification)))
            }
            WorkerEvent::NotificationClick(id) => {
                let action = self.notification_click(id).await?;
                Ok(EventOutcome::done(EventResult::NotificationClicked(action)))
            }
            WorkerEvent::Sync(tag) => {
                let handled = self.sync(&tag).await;
                Ok(EventOutcome::done(EventResult::Synced { handled }))
            }
        }
    }
}

impl fmt::Debug for ServiceWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceWorker")
            .field("cache", &self.cache_name())
            .field("skip_waiting", &self.skip_waiting())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted network and failure-injecting storage shared by worker tests.

    use super::*;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use swcache_core::{CacheDb, Response, ResponseType};

    pub const ORIGIN: &str = "https://example.com";

    pub fn config(version: &str) -> AppConfig {
        AppConfig {
            origin: ORIGIN.into(),
            scope: "/app/".into(),
            cache_prefix: "app-cache".into(),
            cache_version: version.into(),
            precache: vec!["".into(), "index.html".into(), "style.css".into(), "app.js".into()],
            ..Default::default()
        }
    }

    pub fn url(path: &str) -> Url {
        Url::parse(ORIGIN).unwrap().join(path).unwrap()
    }

    enum Scripted {
        Respond { status: u16, kind: ResponseType, body: &'static str },
        Fail,
    }

    /// In-process network keyed by URL; unknown URLs fail like an outage.
    #[derive(Default)]
    pub struct ScriptedNetwork {
        routes: Mutex<HashMap<String, Scripted>>,
        calls: AtomicUsize,
    }

    impl ScriptedNetwork {
        pub fn new() -> Self {
            Self::default()
        }

        /// Serve every precache entry of `config` with a 200 basic response.
        pub fn serving_manifest(config: &AppConfig) -> Self {
            let network = Self::new();
            for url in config.precache_urls().unwrap() {
                network.respond(url.as_str(), 200, "precached");
            }
            network
        }

        pub fn respond(&self, url: &str, status: u16, body: &'static str) {
            self.respond_as(url, status, ResponseType::Basic, body);
        }

        pub fn respond_as(&self, url: &str, status: u16, kind: ResponseType, body: &'static str) {
            self.routes
                .lock()
                .unwrap()
                .insert(url.to_string(), Scripted::Respond { status, kind, body });
        }

        pub fn fail(&self, url: &str) {
            self.routes.lock().unwrap().insert(url.to_string(), Scripted::Fail);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Network for ScriptedNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let routes = self.routes.lock().unwrap();
            match routes.get(request.url().as_str()) {
                Some(Scripted::Respond { status, kind, body }) => Ok(Response::new(*status, *body)
                    .with_kind(*kind)
                    .with_url(request.url().clone())
                    .with_header("Content-Type", "text/plain")),
                Some(Scripted::Fail) | None => Err(Error::Network(format!("offline: {}", request.url()))),
            }
        }
    }

    /// Storage wrapper that fails selected operations and counts accesses.
    pub struct FaultyStorage {
        pub inner: CacheDb,
        fail_delete: Mutex<HashSet<String>>,
        fail_put: AtomicBool,
        pub matches: AtomicUsize,
        pub puts: AtomicUsize,
    }

    impl FaultyStorage {
        pub fn new(inner: CacheDb) -> Self {
            Self {
                inner,
                fail_delete: Mutex::new(HashSet::new()),
                fail_put: AtomicBool::new(false),
                matches: AtomicUsize::new(0),
                puts: AtomicUsize::new(0),
            }
        }

        pub fn fail_delete_of(&self, name: &str) {
            self.fail_delete.lock().unwrap().insert(name.to_string());
        }

        pub fn fail_puts(&self) {
            self.fail_put.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl CacheStorage for FaultyStorage {
        async fn open_store(&self, name: &str) -> Result<(), Error> {
            self.inner.open_store(name).await
        }

        async fn has_store(&self, name: &str) -> Result<bool, Error> {
            self.inner.has_store(name).await
        }

        async fn store_names(&self) -> Result<Vec<String>, Error> {
            self.inner.store_names().await
        }

        async fn delete_store(&self, name: &str) -> Result<bool, Error> {
            if self.fail_delete.lock().unwrap().contains(name) {
                return Err(Error::InvalidInput(format!("injected delete failure: {name}")));
            }
            self.inner.delete_store(name).await
        }

        async fn match_request(&self, store: &str, request: &Request) -> Result<Option<Response>, Error> {
            self.matches.fetch_add(1, Ordering::SeqCst);
            self.inner.match_request(store, request).await
        }

        async fn put(&self, store: &str, request: &Request, response: Response) -> Result<(), Error> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            if self.fail_put.load(Ordering::SeqCst) {
                return Err(Error::InvalidInput("injected put failure".into()));
            }
            self.inner.put(store, request, response).await
        }

        async fn put_all(&self, store: &str, entries: Vec<(Request, Response)>) -> Result<(), Error> {
            self.inner.put_all(store, entries).await
        }

        async fn entry_urls(&self, store: &str) -> Result<Vec<String>, Error> {
            self.inner.entry_urls(store).await
        }
    }

    /// Worker over an in-memory database, returned with its collaborators.
    pub async fn worker(version: &str) -> (ServiceWorker, Arc<FaultyStorage>, Arc<ScriptedNetwork>) {
        let config = config(version);
        let storage = Arc::new(FaultyStorage::new(CacheDb::open_in_memory().await.unwrap()));
        let network = Arc::new(ScriptedNetwork::serving_manifest(&config));
        let worker = ServiceWorker::new(WorkerSettings::from_config(&config).unwrap(), storage.clone(), network.clone());
        (worker, storage, network)
    }

    /// Worker that has installed and activated successfully.
    pub async fn active_worker(version: &str) -> (ServiceWorker, Arc<FaultyStorage>, Arc<ScriptedNetwork>) {
        let (worker, storage, network) = worker(version).await;
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        (worker, storage, network)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let settings = WorkerSettings::from_config(&config("v1")).unwrap();
        assert_eq!(settings.generation.store_name(), "app-cache-v1");
        assert_eq!(settings.scope_url.as_str(), "https://example.com/app/");
        assert_eq!(settings.offline_document.as_str(), "https://example.com/app/index.html");
        assert_eq!(settings.precache.len(), 4);
        assert_eq!(settings.notifications.icon.as_str(), "https://example.com/app/icons/icon-192.png");
        assert_eq!(settings.notifications.vibrate, vec![100, 50, 100]);
    }

    #[test]
    fn test_state_display_and_intercept() {
        assert_eq!(WorkerState::Activated.to_string(), "activated");
        assert!(WorkerState::Activated.can_intercept_fetch());
        assert!(!WorkerState::Installed.can_intercept_fetch());
    }

    #[tokio::test]
    async fn test_dispatch_lifecycle_and_fetch() {
        let (worker, _storage, network) = worker("v1").await;

        let outcome = worker.dispatch(WorkerEvent::Install).await.unwrap();
        assert!(matches!(outcome.result, EventResult::Installed { entries: 4 }));

        let outcome = worker.dispatch(WorkerEvent::Activate).await.unwrap();
        assert!(matches!(outcome.result, EventResult::Activated { .. }));
        assert_eq!(worker.state().await, WorkerState::Activated);

        let calls = network.calls();
        let outcome = worker
            .dispatch(WorkerEvent::Fetch(Request::get(url("/app/style.css"))))
            .await
            .unwrap();
        match outcome.result {
            EventResult::Fetch(FetchDisposition::Respond(response, ResponseSource::Cache)) => {
                assert_eq!(response.text(), "precached");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(network.calls(), calls);
        outcome.wait_until.settled().await;
    }

    #[tokio::test]
    async fn test_dispatch_push_and_sync() {
        let (worker, _storage, _network) = worker("v1").await;

        let outcome = worker.dispatch(WorkerEvent::Push(None)).await.unwrap();
        let EventResult::Notified(notification) = outcome.result else {
            panic!("expected notification");
        };

        let outcome = worker
            .dispatch(WorkerEvent::NotificationClick(notification.id))
            .await
            .unwrap();
        assert!(matches!(outcome.result, EventResult::NotificationClicked(ClickAction::Opened(_))));

        let outcome = worker.dispatch(WorkerEvent::Sync("sync-data".into())).await.unwrap();
        assert!(matches!(outcome.result, EventResult::Synced { handled: true }));
    }

    #[test]
    fn test_event_kind() {
        assert_eq!(WorkerEvent::Sync("x".into()).kind(), EventKind::Sync);
        assert_eq!(WorkerEvent::NotificationClick(1).kind().to_string(), "notificationclick");
    }
}
