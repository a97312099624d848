//! Page-side glue around the worker.
//!
//! A [`PageController`] lives for one page load. It registers the worker at
//! most once, routes resource loads through the worker, and drives the
//! install banners and content panels.

pub mod install;
pub mod panels;
pub mod platform;

pub use install::{Banners, IOS_TIP_DISMISSED, InstallOutcome, InstallPrompt, PWA_DISMISSED};
pub use panels::{Panel, Panels};
pub use platform::{Environment, Platform};

use crate::worker::{ClientId, Registration, ResponseSource, ServiceWorker, WorkerSettings};
use futures_util::future::try_join_all;
use std::sync::Arc;
use swcache_core::{Error, PreferenceStore, Request, Response};
use tokio::sync::{Mutex, OnceCell};
use url::Url;

#[derive(Default)]
struct PageState {
    banners: Banners,
    deferred_prompt: Option<Arc<dyn InstallPrompt>>,
    update_available: bool,
    reload_requested: bool,
    online: bool,
}

/// Controller for a single page load.
pub struct PageController {
    platform: Platform,
    settings: WorkerSettings,
    registration: Arc<Registration>,
    preferences: Arc<dyn PreferenceStore>,
    client_id: ClientId,
    registered: OnceCell<Arc<ServiceWorker>>,
    panels: Mutex<Panels>,
    state: Mutex<PageState>,
}

impl PageController {
    /// Open a page at `url`. If a worker is already active the page starts
    /// out controlled by it.
    pub async fn open(
        url: Url, env: &Environment, settings: WorkerSettings, registration: Arc<Registration>,
        preferences: Arc<dyn PreferenceStore>, panels: Panels,
    ) -> Self {
        let platform = Platform::detect(env);
        let controller = match registration.active().await {
            Some(worker) if platform.service_worker => Some(worker.cache_name().to_string()),
            _ => None,
        };
        let client_id = registration.clients().attach(url.clone(), controller).await;

        let mode = if platform.standalone { "standalone" } else { "browser" };
        let device = if platform.ios { "ios" } else { "other" };
        tracing::info!(%url, mode, device, "page opened");

        Self {
            platform,
            settings,
            registration,
            preferences,
            client_id,
            registered: OnceCell::new(),
            panels: Mutex::new(panels),
            state: Mutex::new(PageState { online: true, ..Default::default() }),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Register the worker for this page load.
    ///
    /// The first successful call installs and activates; later calls return
    /// the same worker without touching the network. A failed registration
    /// is logged and returned, and may be retried.
    pub async fn register_worker(&self) -> Result<Arc<ServiceWorker>, Error> {
        if !self.platform.service_worker {
            return Err(Error::InvalidState { expected: "service worker support".into(), actual: "unsupported".into() });
        }

        self.registered
            .get_or_try_init(|| async {
                match self.registration.update(self.settings.clone()).await {
                    Ok(outcome) => {
                        tracing::info!(scope = %self.settings.scope_url, cache = %outcome.worker.cache_name(), "worker registered");
                        if outcome.update_available {
                            tracing::info!("new content available, refresh to update");
                            self.state.lock().await.update_available = true;
                        }
                        Ok(outcome.worker)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "worker registration failed");
                        Err(e)
                    }
                }
            })
            .await
            .cloned()
    }

    pub async fn update_available(&self) -> bool {
        self.state.lock().await.update_available
    }

    /// Accept a pending update by requesting a reload. Returns whether one
    /// was pending.
    pub async fn apply_update(&self) -> bool {
        let mut state = self.state.lock().await;
        if !state.update_available {
            return false;
        }
        state.update_available = false;
        state.reload_requested = true;
        true
    }

    /// Whether this page has asked to be reloaded.
    pub async fn reload_requested(&self) -> bool {
        self.state.lock().await.reload_requested
    }

    /// Load a page resource. Controlled pages go through the worker and wait
    /// for its background writes; uncontrolled pages hit the network.
    pub async fn load(&self, request: Request) -> Result<(Response, ResponseSource), Error> {
        let controlled = self
            .registration
            .clients()
            .get(self.client_id)
            .await
            .and_then(|c| c.controller)
            .is_some();

        match self.registration.active().await {
            Some(worker) if controlled => {
                let (response, source, wait_until) = worker.respond(request).await?;
                wait_until.settled().await;
                Ok((response, source))
            }
            _ => {
                let response = self.registration.network().fetch(&request).await?;
                Ok((response, ResponseSource::Passthrough))
            }
        }
    }

    /// Decide which banners to show on page start.
    pub async fn show_install_promotion(&self) -> Result<Banners, Error> {
        let mut state = self.state.lock().await;
        if self.platform.standalone {
            state.banners.hide_all();
            return Ok(state.banners);
        }

        if self.platform.ios && !self.preferences.flag(IOS_TIP_DISMISSED).await? {
            state.banners.ios_tip = true;
        }
        Ok(state.banners)
    }

    /// Capture the browser's install prompt for later replay.
    ///
    /// Returns whether the install banner is now shown. A previously
    /// dismissed banner stays hidden but the prompt is still kept.
    pub async fn on_before_install_prompt(&self, prompt: Arc<dyn InstallPrompt>) -> Result<bool, Error> {
        if self.platform.standalone {
            return Ok(false);
        }

        let dismissed = self.preferences.flag(PWA_DISMISSED).await?;
        let mut state = self.state.lock().await;
        state.deferred_prompt = Some(prompt);
        state.banners.install_banner = !dismissed;
        Ok(state.banners.install_banner)
    }

    /// Hide the banner and replay the deferred prompt. The prompt can only be
    /// replayed once; returns `None` when there is nothing to replay.
    pub async fn accept_install(&self) -> Result<Option<InstallOutcome>, Error> {
        let prompt = {
            let mut state = self.state.lock().await;
            state.banners.install_banner = false;
            state.deferred_prompt.take()
        };
        let Some(prompt) = prompt else {
            return Ok(None);
        };

        let outcome = prompt.prompt().await?;
        if outcome == InstallOutcome::Accepted {
            tracing::info!("user accepted the install prompt");
        }
        Ok(Some(outcome))
    }

    pub async fn dismiss_install(&self) -> Result<(), Error> {
        self.state.lock().await.banners.install_banner = false;
        self.preferences.set_flag(PWA_DISMISSED, true).await
    }

    pub async fn close_ios_tip(&self) -> Result<(), Error> {
        self.state.lock().await.banners.ios_tip = false;
        self.preferences.set_flag(IOS_TIP_DISMISSED, true).await
    }

    pub async fn banners(&self) -> Banners {
        self.state.lock().await.banners
    }

    pub async fn show_content(&self, id: &str) -> bool {
        self.panels.lock().await.show(id)
    }

    pub async fn close_content(&self) {
        self.panels.lock().await.close();
    }

    pub async fn panels(&self) -> Panels {
        self.panels.lock().await.clone()
    }

    /// Delete every cache store for the origin, then request a reload.
    pub async fn clear_caches(&self) -> Result<Vec<String>, Error> {
        if !self.platform.service_worker {
            return Err(Error::InvalidState { expected: "service worker support".into(), actual: "unsupported".into() });
        }

        let storage = self.registration.storage();
        let names = storage.store_names().await?;
        try_join_all(names.iter().map(|name| storage.delete_store(name))).await?;
        tracing::info!(count = names.len(), "cleared all caches, reloading");

        self.state.lock().await.reload_requested = true;
        Ok(names)
    }

    /// Record a connectivity change.
    pub async fn set_online(&self, online: bool) {
        let mut state = self.state.lock().await;
        if state.online != online {
            if online {
                tracing::info!("network connected");
            } else {
                tracing::warn!("network disconnected");
            }
        }
        state.online = online;
    }

    pub async fn is_online(&self) -> bool {
        self.state.lock().await.online
    }
}

impl std::fmt::Debug for PageController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageController")
            .field("platform", &self.platform)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}
