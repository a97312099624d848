//! Window clients visible to the worker.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use url::Url;

pub type ClientId = u64;

/// A page (window) the worker can see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowClient {
    pub id: ClientId,
    pub url: Url,
    pub focused: bool,
    /// Store name of the generation controlling this page, if any.
    pub controller: Option<String>,
}

/// Registry of open window clients.
#[derive(Debug)]
pub struct Clients {
    next_id: AtomicU64,
    windows: RwLock<Vec<WindowClient>>,
}

impl Default for Clients {
    fn default() -> Self {
        Self::new()
    }
}

impl Clients {
    pub fn new() -> Self {
        Self { next_id: AtomicU64::new(1), windows: RwLock::new(Vec::new()) }
    }

    /// Register an already-open page. It starts uncontrolled.
    pub async fn connect(&self, url: Url) -> ClientId {
        self.attach(url, None).await
    }

    /// Register a page loaded under `controller`.
    pub async fn attach(&self, url: Url, controller: Option<String>) -> ClientId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.windows
            .write()
            .await
            .push(WindowClient { id, url, focused: false, controller });
        id
    }

    pub async fn disconnect(&self, id: ClientId) -> bool {
        let mut windows = self.windows.write().await;
        let before = windows.len();
        windows.retain(|w| w.id != id);
        windows.len() != before
    }

    pub async fn get(&self, id: ClientId) -> Option<WindowClient> {
        self.windows.read().await.iter().find(|w| w.id == id).cloned()
    }

    pub async fn match_all(&self) -> Vec<WindowClient> {
        self.windows.read().await.clone()
    }

    /// Take control of every open page. Returns how many changed controller.
    pub async fn claim(&self, store_name: &str) -> usize {
        let mut windows = self.windows.write().await;
        let mut claimed = 0;
        for window in windows.iter_mut() {
            if window.controller.as_deref() != Some(store_name) {
                window.controller = Some(store_name.to_string());
                claimed += 1;
            }
        }
        claimed
    }

    /// Focus one window, unfocusing the rest.
    pub async fn focus(&self, id: ClientId) -> bool {
        let mut windows = self.windows.write().await;
        if !windows.iter().any(|w| w.id == id) {
            return false;
        }
        for window in windows.iter_mut() {
            window.focused = window.id == id;
        }
        true
    }

    /// Open and focus a new window at `url`.
    pub async fn open_window(&self, url: Url, controller: Option<String>) -> ClientId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut windows = self.windows.write().await;
        for window in windows.iter_mut() {
            window.focused = false;
        }
        windows.push(WindowClient { id, url, focused: true, controller });
        id
    }
}
