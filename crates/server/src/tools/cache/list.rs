//! cache_list tool implementation.
//!
//! Lists every store, oldest first, marking the one the active worker owns.

use crate::tools::json_result;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::Registration;

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// Include the URL of every entry in each store.
    #[serde(default)]
    pub include_urls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    /// Owned by the active worker.
    pub current: bool,
    pub entries: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub stores: Vec<StoreSummary>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(registration: &Registration, params: CacheListParams) -> Result<CallToolResult, McpError> {
    let storage = registration.storage();
    let current = registration.active().await.map(|w| w.cache_name().to_string());

    let mut stores = Vec::new();
    for name in storage.store_names().await? {
        let urls = storage.entry_urls(&name).await?;
        stores.push(StoreSummary {
            current: current.as_deref() == Some(name.as_str()),
            entries: urls.len(),
            urls: params.include_urls.then_some(urls),
            name,
        });
    }

    json_result(&CacheListOutput { stores })
}
