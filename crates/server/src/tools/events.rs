//! worker_push, worker_notification_click and worker_sync tool implementations.

use super::json_result;
use crate::error::ToolError;
use bytes::Bytes;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::worker::{ClickAction, Notification};
use swcache_client::{EventResult, Registration, WorkerEvent};

/// Parameters for the worker_push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerPushParams {
    /// Push payload text. Without one the default message is shown.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Output from the worker_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerPushOutput {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    /// Arrival time, milliseconds since the Unix epoch.
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

impl From<Notification> for WorkerPushOutput {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            title: n.title,
            body: n.body,
            icon: n.icon.to_string(),
            badge: n.badge.to_string(),
            vibrate: n.vibrate,
            date_of_arrival: n.data.date_of_arrival,
            primary_key: n.data.primary_key,
        }
    }
}

/// Parameters for the worker_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerNotificationClickParams {
    /// Id returned by worker_push.
    pub id: u64,
}

/// Output from the worker_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerNotificationClickOutput {
    /// "focused" or "opened".
    pub action: String,
    pub client_id: u64,
}

/// Parameters for the worker_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSyncParams {
    pub tag: String,
}

/// Output from the worker_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSyncOutput {
    pub tag: String,
    /// Whether the worker recognized the tag.
    pub handled: bool,
}

fn unexpected(event: &str) -> McpError {
    ToolError::OutputFailed(format!("{event} event produced an unexpected result")).into()
}

/// Implementation of the worker_push tool.
pub async fn push_impl(registration: &Registration, params: WorkerPushParams) -> Result<CallToolResult, McpError> {
    let payload = params.payload.map(Bytes::from);
    let outcome = registration.dispatch(WorkerEvent::Push(payload)).await?;
    let EventResult::Notified(notification) = outcome.result else {
        return Err(unexpected("push"));
    };
    json_result(&WorkerPushOutput::from(notification))
}

/// Implementation of the worker_notification_click tool.
pub async fn notification_click_impl(
    registration: &Registration, params: WorkerNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let outcome = registration.dispatch(WorkerEvent::NotificationClick(params.id)).await?;
    let EventResult::NotificationClicked(action) = outcome.result else {
        return Err(unexpected("notificationclick"));
    };

    let output = match action {
        ClickAction::Focused(id) => WorkerNotificationClickOutput { action: "focused".into(), client_id: id },
        ClickAction::Opened(id) => WorkerNotificationClickOutput { action: "opened".into(), client_id: id },
    };
    json_result(&output)
}

/// Implementation of the worker_sync tool.
pub async fn sync_impl(registration: &Registration, params: WorkerSyncParams) -> Result<CallToolResult, McpError> {
    let tag = params.tag.trim().to_string();
    if tag.is_empty() {
        return Err(ToolError::InvalidInput("tag must not be empty".into()).into());
    }

    let outcome = registration.dispatch(WorkerEvent::Sync(tag.clone())).await?;
    let EventResult::Synced { handled } = outcome.result else {
        return Err(unexpected("sync"));
    };
    json_result(&WorkerSyncOutput { tag, handled })
}
