//! Push notifications, notification clicks and background sync.
//!
//! None of these carry application data; push shows a notification and sync
//! only records that it ran.

use super::{ClientId, ServiceWorker, WorkerState};
use bytes::Bytes;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use swcache_core::Error;
use tokio::sync::RwLock;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationData {
    /// Milliseconds since the Unix epoch.
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub icon: Url,
    pub badge: Url,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
}

/// Result of handling a notification click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "client_id", rename_all = "snake_case")]
pub enum ClickAction {
    /// An existing window at the app root was focused.
    Focused(ClientId),
    /// No such window existed; a new one was opened.
    Opened(ClientId),
}

/// Notifications currently on screen.
#[derive(Debug)]
pub struct NotificationCenter {
    next_id: AtomicU64,
    shown: RwLock<Vec<Notification>>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self { next_id: AtomicU64::new(1), shown: RwLock::new(Vec::new()) }
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub async fn show(&self, notification: Notification) {
        self.shown.write().await.push(notification);
    }

    /// Remove a notification. Returns `false` if it was not showing.
    pub async fn close(&self, id: u64) -> bool {
        let mut shown = self.shown.write().await;
        let before = shown.len();
        shown.retain(|n| n.id != id);
        shown.len() != before
    }

    pub async fn shown(&self) -> Vec<Notification> {
        self.shown.read().await.clone()
    }
}

impl ServiceWorker {
    /// Handle a push message by showing a notification.
    pub async fn push(&self, payload: Option<Bytes>) -> Notification {
        let settings = &self.settings().notifications;
        let body = match payload {
            Some(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            None => settings.default_body.clone(),
        };

        let notification = Notification {
            id: self.notifications().next_id(),
            title: settings.title.clone(),
            body,
            icon: settings.icon.clone(),
            badge: settings.badge.clone(),
            vibrate: settings.vibrate.clone(),
            data: NotificationData { date_of_arrival: chrono::Utc::now().timestamp_millis(), primary_key: 1 },
        };

        tracing::info!(id = notification.id, body = %notification.body, "showing push notification");
        self.notifications().show(notification.clone()).await;
        notification
    }

    /// Close the clicked notification, then focus a window at the app root or
    /// open one.
    pub async fn notification_click(&self, id: u64) -> Result<ClickAction, Error> {
        if !self.notifications().close(id).await {
            return Err(Error::InvalidInput(format!("no notification with id {id}")));
        }

        let root = &self.settings().scope_url;
        let existing = self
            .clients()
            .match_all()
            .await
            .into_iter()
            .find(|w| w.url.origin() == root.origin() && w.url.path() == root.path());

        if let Some(window) = existing
            && self.clients().focus(window.id).await
        {
            tracing::debug!(client = window.id, "focused existing window");
            return Ok(ClickAction::Focused(window.id));
        }

        let controller =
            (self.state().await == WorkerState::Activated).then(|| self.cache_name().to_string());
        let opened = self.clients().open_window(root.clone(), controller).await;
        tracing::debug!(client = opened, url = %root, "opened window");
        Ok(ClickAction::Opened(opened))
    }

    /// Handle a background sync. Returns whether the tag was recognized.
    pub async fn sync(&self, tag: &str) -> bool {
        if tag == self.settings().sync_tag {
            tracing::info!(tag, "background sync started");
            true
        } else {
            tracing::debug!(tag, "ignoring unknown sync tag");
            false
        }
    }
}
