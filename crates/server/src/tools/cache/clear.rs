//! cache_clear tool implementation.
//!
//! Deletes one named store, or every store when no name is given.

use crate::tools::json_result;
use futures_util::future::try_join_all;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::Registration;
use swcache_core::Error;

/// Parameters for the cache_clear tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearParams {
    /// Store to delete. Omit to delete every store.
    #[serde(default)]
    pub store: Option<String>,
}

/// Output from the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    pub deleted: Vec<String>,
}

/// Implementation of the cache_clear tool.
pub async fn clear_impl(registration: &Registration, params: CacheClearParams) -> Result<CallToolResult, McpError> {
    let storage = registration.storage();

    let deleted = match params.store {
        Some(name) => {
            if !storage.delete_store(&name).await? {
                return Err(Error::StoreNotFound(name).into());
            }
            vec![name]
        }
        None => {
            let names = storage.store_names().await?;
            try_join_all(names.iter().map(|name| storage.delete_store(name))).await?;
            names
        }
    };

    tracing::info!(count = deleted.len(), "cleared caches");
    json_result(&CacheClearOutput { deleted })
}
