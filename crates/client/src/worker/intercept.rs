//! Cache-first fetch handling.

use super::{ServiceWorker, WaitUntil};
use crate::fetch::{has_scheme, is_same_origin};
use serde::Serialize;
use swcache_core::{Error, Request, Response, ResponseType};

/// Body of the synthetic response for failed non-document requests.
pub const OFFLINE_BODY: &str = "Network connection failed. Please check your network settings.";

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    /// The precached offline document, served for a failed navigation.
    OfflineFallback,
    /// The `408` produced when the network is unreachable.
    Synthetic,
    /// Not intercepted; fetched directly by the host.
    Passthrough,
}

/// Whether the worker answered a request or left it to the host.
#[derive(Debug)]
pub enum FetchDisposition {
    Respond(Response, ResponseSource),
    Passthrough(Request),
}

fn offline_response() -> Response {
    Response::new(408, OFFLINE_BODY).with_header("Content-Type", "text/plain")
}

impl ServiceWorker {
    fn should_intercept(&self, request: &Request) -> bool {
        request.is_get() && !has_scheme(request.url(), &self.settings().bypass_schemes)
    }

    /// Handle an intercepted request.
    ///
    /// Requests the worker does not handle (non-GET, bypassed schemes, or a
    /// worker that is not yet activated) come back as
    /// [`FetchDisposition::Passthrough`] without touching the cache.
    pub async fn handle_fetch(&self, request: Request) -> Result<(FetchDisposition, WaitUntil), Error> {
        let mut wait_until = WaitUntil::new();

        if !self.state().await.can_intercept_fetch() || !self.should_intercept(&request) {
            tracing::trace!(method = request.method(), url = %request.url(), "passthrough");
            return Ok((FetchDisposition::Passthrough(request), wait_until));
        }

        let store = self.cache_name();
        match self.storage().match_request(store, &request).await {
            Ok(Some(cached)) => {
                tracing::debug!(url = %request.url(), "cache hit");
                return Ok((FetchDisposition::Respond(cached, ResponseSource::Cache), wait_until));
            }
            Ok(None) => tracing::debug!(url = %request.url(), "cache miss"),
            Err(e) => tracing::warn!(url = %request.url(), error = %e, "cache lookup failed, using network"),
        }

        let response = match self.network().fetch(&request).await {
            Ok(response) => response,
            Err(e) => {
                let fallback = self.offline_fallback(&request, e).await?;
                return Ok((fallback, wait_until));
            }
        };

        if response.status() != 200 || response.kind() != ResponseType::Basic {
            return Ok((FetchDisposition::Respond(response, ResponseSource::Network), wait_until));
        }

        if is_same_origin(request.url(), &self.settings().origin) {
            let copy = response.duplicate();
            let storage = self.storage().clone();
            let store = store.to_string();
            wait_until.push(tokio::spawn(async move {
                if let Err(e) = storage.put(&store, &request, copy).await {
                    tracing::warn!(url = %request.url(), error = %e, "failed to cache response");
                }
            }));
        }

        Ok((FetchDisposition::Respond(response, ResponseSource::Network), wait_until))
    }

    /// Answer a request whose network fetch failed.
    async fn offline_fallback(&self, request: &Request, error: Error) -> Result<FetchDisposition, Error> {
        if !request.accepts_html() {
            tracing::debug!(url = %request.url(), error = %error, "network failed, serving offline response");
            return Ok(FetchDisposition::Respond(offline_response(), ResponseSource::Synthetic));
        }

        let document = Request::get(self.settings().offline_document.clone());
        match self.storage().match_request(self.cache_name(), &document).await {
            Ok(Some(response)) => {
                tracing::debug!(url = %request.url(), "network failed, serving offline document");
                Ok(FetchDisposition::Respond(response, ResponseSource::OfflineFallback))
            }
            Ok(None) => Err(error),
            Err(lookup) => {
                tracing::warn!(error = %lookup, "offline document lookup failed");
                Err(error)
            }
        }
    }

    /// Handle a request end to end, fetching passthrough requests directly.
    pub async fn respond(&self, request: Request) -> Result<(Response, ResponseSource, WaitUntil), Error> {
        let (disposition, wait_until) = self.handle_fetch(request).await?;
        match disposition {
            FetchDisposition::Respond(response, source) => Ok((response, source, wait_until)),
            FetchDisposition::Passthrough(request) => {
                let response = self.network().fetch(&request).await?;
                Ok((response, ResponseSource::Passthrough, wait_until))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::{ServiceWorker, WorkerSettings};
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use swcache_core::{AppConfig, CacheDb, CacheStorage};
    use url::Url;

    async fn respond(worker: &ServiceWorker, request: Request) -> (Response, ResponseSource) {
        let (disposition, wait_until) = worker.handle_fetch(request).await.unwrap();
        wait_until.settled().await;
        match disposition {
            FetchDisposition::Respond(response, source) => (response, source),
            FetchDisposition::Passthrough(request) => panic!("unexpected passthrough for {}", request.url()),
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let (worker, _storage, network) = active_worker("v1").await;
        let before = network.calls();

        let (response, source) = respond(&worker, Request::get(url("/app/app.js"))).await;

        assert_eq!(source, ResponseSource::Cache);
        assert_eq!(response.text(), "precached");
        assert_eq!(network.calls(), before);
    }

    #[tokio::test]
    async fn test_fragment_matches_precached_entry() {
        let (worker, _storage, network) = active_worker("v1").await;
        let before = network.calls();

        let target = Url::parse("https://example.com/app/index.html#top").unwrap();
        let (response, source) = respond(&worker, Request::get(target)).await;

        assert_eq!(source, ResponseSource::Cache);
        assert_eq!(response.text(), "precached");
        assert_eq!(network.calls(), before);
    }

    #[tokio::test]
    async fn test_miss_populates_cache() {
        let (worker, storage, network) = active_worker("v1").await;
        network.respond("https://example.com/app/data.json", 200, "{}");

        let (response, source) = respond(&worker, Request::get(url("/app/data.json"))).await;
        assert_eq!(source, ResponseSource::Network);
        assert_eq!(response.text(), "{}");

        let cached = storage
            .match_request("app-cache-v1", &Request::get(url("/app/data.json")))
            .await
            .unwrap();
        assert_eq!(cached.unwrap().text(), "{}");

        let calls = network.calls();
        let (_, source) = respond(&worker, Request::get(url("/app/data.json"))).await;
        assert_eq!(source, ResponseSource::Cache);
        assert_eq!(network.calls(), calls);
    }

    #[tokio::test]
    async fn test_non_200_not_cached() {
        let (worker, storage, network) = active_worker("v1").await;
        network.respond("https://example.com/app/gone", 404, "nope");

        let (response, _) = respond(&worker, Request::get(url("/app/gone"))).await;
        assert_eq!(response.status(), 404);
        assert_eq!(storage.puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cors_response_not_cached() {
        let (worker, storage, network) = active_worker("v1").await;
        network.respond_as("https://example.com/app/font.woff", 200, ResponseType::Cors, "font");

        let (response, _) = respond(&worker, Request::get(url("/app/font.woff"))).await;
        assert_eq!(response.kind(), ResponseType::Cors);
        assert_eq!(storage.puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cross_origin_basic_not_cached() {
        let (worker, storage, network) = active_worker("v1").await;
        network.respond("https://cdn.example.org/lib.js", 200, "lib");

        let request = Request::get(Url::parse("https://cdn.example.org/lib.js").unwrap());
        let (response, source) = respond(&worker, request).await;

        assert_eq!(source, ResponseSource::Network);
        assert_eq!(response.text(), "lib");
        assert_eq!(storage.puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_failure_still_responds() {
        let (worker, storage, network) = active_worker("v1").await;
        network.respond("https://example.com/app/late.css", 200, "late");
        storage.fail_puts();

        let (response, source) = respond(&worker, Request::get(url("/app/late.css"))).await;
        assert_eq!(source, ResponseSource::Network);
        assert_eq!(response.text(), "late");
        assert_eq!(storage.puts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_get_passthrough() {
        let (worker, storage, network) = active_worker("v1").await;
        let matches = storage.matches.load(Ordering::SeqCst);
        let calls = network.calls();

        let (disposition, wait_until) = worker.handle_fetch(Request::new("POST", url("/app/api"))).await.unwrap();

        assert!(matches!(disposition, FetchDisposition::Passthrough(r) if r.method() == "POST"));
        assert!(wait_until.is_empty());
        assert_eq!(storage.matches.load(Ordering::SeqCst), matches);
        assert_eq!(network.calls(), calls);
    }

    #[tokio::test]
    async fn test_bypassed_scheme_passthrough() {
        let (worker, storage, _network) = active_worker("v1").await;
        let matches = storage.matches.load(Ordering::SeqCst);

        let request = Request::get(Url::parse("chrome-extension://abcdef/popup.html").unwrap());
        let (disposition, _) = worker.handle_fetch(request).await.unwrap();

        assert!(matches!(disposition, FetchDisposition::Passthrough(_)));
        assert_eq!(storage.matches.load(Ordering::SeqCst), matches);
    }

    #[tokio::test]
    async fn test_inactive_worker_passthrough() {
        let (worker, _storage, _network) = worker("v1").await;
        worker.install().await.unwrap();

        let (disposition, _) = worker.handle_fetch(Request::get(url("/app/app.js"))).await.unwrap();
        assert!(matches!(disposition, FetchDisposition::Passthrough(_)));
    }

    #[tokio::test]
    async fn test_offline_navigation_serves_offline_document() {
        let (worker, _storage, network) = active_worker("v1").await;
        network.fail("https://example.com/app/lessons/1");

        let (response, source) = respond(&worker, Request::navigate(url("/app/lessons/1"))).await;
        assert_eq!(source, ResponseSource::OfflineFallback);
        assert_eq!(response.status(), 200);
        assert_eq!(response.text(), "precached");
    }

    #[tokio::test]
    async fn test_offline_asset_gets_synthetic_408() {
        let (worker, _storage, _network) = active_worker("v1").await;

        let request = Request::get(url("/app/missing.png")).with_header("Accept", "image/png");
        let (response, source) = respond(&worker, request).await;

        assert_eq!(source, ResponseSource::Synthetic);
        assert_eq!(response.status(), 408);
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(response.text(), OFFLINE_BODY);
    }

    #[tokio::test]
    async fn test_offline_without_accept_is_not_navigation() {
        let (worker, _storage, _network) = active_worker("v1").await;
        let (response, source) = respond(&worker, Request::get(url("/app/unknown"))).await;
        assert_eq!(source, ResponseSource::Synthetic);
        assert_eq!(response.status(), 408);
    }

    #[tokio::test]
    async fn test_missing_offline_document_propagates_error() {
        let relocated = AppConfig { offline_document: "offline.html".into(), ..config("v1") };
        let storage = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let network = Arc::new(ScriptedNetwork::serving_manifest(&relocated));
        let worker = ServiceWorker::new(WorkerSettings::from_config(&relocated).unwrap(), storage, network);
        worker.install().await.unwrap();
        worker.activate().await.unwrap();

        let result = worker.handle_fetch(Request::navigate(url("/app/lessons/2"))).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_respond_fetches_passthrough() {
        let (worker, _storage, network) = active_worker("v1").await;
        network.respond("https://example.com/app/api", 201, "created");

        let (response, source, _) = worker.respond(Request::new("POST", url("/app/api"))).await.unwrap();
        assert_eq!(source, ResponseSource::Passthrough);
        assert_eq!(response.status(), 201);
    }
}
