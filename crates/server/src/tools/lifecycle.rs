//! worker_install and worker_activate tool implementations.

use super::json_result;
use crate::error::ToolError;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{Registration, WorkerSettings};
use swcache_core::Generation;

/// Parameters for the worker_install tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerInstallParams {
    /// Cache version to install. Defaults to the configured version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Output from the worker_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerInstallOutput {
    /// Store the new worker owns.
    pub cache: String,
    /// Number of precached entries.
    pub entries: usize,
    pub state: String,
    /// Whether a page was already controlled when the install finished.
    pub update_available: bool,
}

/// Output from the worker_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerActivateOutput {
    pub cache: String,
    /// Stale stores deleted during activation.
    pub deleted: Vec<String>,
    /// Clients newly controlled by this worker.
    pub claimed: usize,
    /// Store of the worker that was replaced, if any.
    pub replaced: Option<String>,
}

/// Implementation of the worker_install tool.
pub async fn install_impl(
    registration: &Registration, settings: &WorkerSettings, params: WorkerInstallParams,
) -> Result<CallToolResult, McpError> {
    let mut settings = settings.clone();
    if let Some(version) = params.version {
        let version = version.trim();
        if version.is_empty() {
            return Err(ToolError::InvalidInput("version must not be empty".into()).into());
        }
        settings.generation = Generation::new(settings.generation.prefix(), version);
    }

    let installation = registration.install(settings).await?;
    let output = WorkerInstallOutput {
        cache: installation.worker.cache_name().to_string(),
        entries: installation.entries,
        state: installation.worker.state().await.to_string(),
        update_available: installation.update_available,
    };
    json_result(&output)
}

/// Implementation of the worker_activate tool.
pub async fn activate_impl(registration: &Registration) -> Result<CallToolResult, McpError> {
    let activation = registration.activate().await?;
    let output = WorkerActivateOutput {
        cache: activation.worker.cache_name().to_string(),
        deleted: activation.report.deleted,
        claimed: activation.report.claimed,
        replaced: activation.replaced,
    };
    json_result(&output)
}
