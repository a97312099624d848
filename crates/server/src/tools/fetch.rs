//! worker_fetch tool implementation.
//!
//! Sends a request through the active worker exactly as a controlled page
//! would, falling back to a direct network fetch when the worker passes
//! the request through or no worker is active.

use super::json_result;
use crate::error::ToolError;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::{EventResult, FetchDisposition, Registration, ResponseSource, WorkerEvent};
use swcache_core::{Request, Response};
use url::Url;

/// Parameters for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL to request.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Optional Accept header. Include `text/html` to request a document.
    #[serde(default)]
    pub accept: Option<String>,

    /// Maximum body characters to include in the output (default: 4000).
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_method() -> String {
    "GET".into()
}

fn default_max_chars() -> usize {
    4000
}

/// Output from the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    /// Where the response came from: cache, network, offline_fallback,
    /// synthetic or passthrough.
    pub source: String,
    pub response_type: String,
    pub content_type: Option<String>,
    pub body: String,
    pub body_truncated: bool,
}

impl WorkerFetchOutput {
    fn new(url: &Url, response: &Response, source: ResponseSource, max_chars: usize) -> Self {
        let text = response.text();
        let body_truncated = text.chars().count() > max_chars;
        let body = if body_truncated { text.chars().take(max_chars).collect() } else { text };
        let source = serde_json::to_value(source)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();

        Self {
            url: url.to_string(),
            status: response.status(),
            status_text: response.status_text().to_string(),
            source,
            response_type: response.kind().to_string(),
            content_type: response.content_type().map(String::from),
            body,
            body_truncated,
        }
    }
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(registration: &Registration, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    let url = Url::parse(params.url.trim()).map_err(|e| ToolError::InvalidInput(format!("{}: {e}", params.url)))?;
    if params.method.trim().is_empty() {
        return Err(ToolError::InvalidInput("method must not be empty".into()).into());
    }

    let mut request = Request::new(&params.method, url.clone());
    if let Some(accept) = params.accept.as_deref() {
        request = request.with_header("Accept", accept);
    }

    let (response, source) = match registration.active().await {
        Some(_) => {
            let outcome = registration.dispatch(WorkerEvent::Fetch(request)).await?;
            let EventResult::Fetch(disposition) = outcome.result else {
                return Err(ToolError::OutputFailed("fetch event produced no fetch result".into()).into());
            };
            outcome.wait_until.settled().await;
            match disposition {
                FetchDisposition::Respond(response, source) => (response, source),
                FetchDisposition::Passthrough(request) => {
                    (registration.network().fetch(&request).await?, ResponseSource::Passthrough)
                }
            }
        }
        None => (registration.network().fetch(&request).await?, ResponseSource::Passthrough),
    };

    tracing::debug!(%url, status = response.status(), ?source, "worker_fetch");
    json_result(&WorkerFetchOutput::new(&url, &response, source, params.max_chars))
}
