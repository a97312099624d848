//! Install and activate handlers.

use super::{ServiceWorker, WorkerState};
use futures_util::future::{join_all, try_join_all};
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::time::Instant;
use swcache_core::{Error, Request, Response};
use url::Url;

/// Outcome of a successful activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    /// Stale stores that were removed.
    pub deleted: Vec<String>,
    /// Clients whose controller changed.
    pub claimed: usize,
}

impl ServiceWorker {
    /// Precache the manifest into this generation's store.
    ///
    /// Every manifest entry is fetched before anything is written. A network
    /// error or non-OK status on any entry fails the whole install, moves the
    /// worker to `redundant` and leaves no store behind.
    pub async fn install(&self) -> Result<usize, Error> {
        self.transition(WorkerState::Parsed, WorkerState::Installing).await?;

        let start = Instant::now();
        match self.precache().await {
            Ok(count) => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                self.set_state(WorkerState::Installed).await;
                tracing::info!(
                    cache = %self.cache_name(),
                    entries = count,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "precache complete"
                );
                Ok(count)
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant).await;
                tracing::error!(cache = %self.cache_name(), error = %e, "install failed");
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<usize, Error> {
        let fetches = self.settings().precache.iter().map(|url| self.fetch_manifest_entry(url));
        let entries = try_join_all(fetches).await?;
        let count = entries.len();
        self.storage().put_all(self.cache_name(), entries).await?;
        Ok(count)
    }

    async fn fetch_manifest_entry(&self, url: &Url) -> Result<(Request, Response), Error> {
        let request = Request::get(url.clone());
        let response = self
            .network()
            .fetch(&request)
            .await
            .map_err(|e| Error::PrecacheFailed { url: url.to_string(), reason: e.to_string() })?;

        if !response.ok() {
            return Err(Error::PrecacheFailed {
                url: url.to_string(),
                reason: format!("status {} {}", response.status(), response.status_text()),
            });
        }
        Ok((request, response))
    }

    /// Delete stale generations, then claim every open client.
    ///
    /// Deletions run concurrently; a failed deletion is logged and does not
    /// stop the others or the claim.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        self.transition(WorkerState::Installed, WorkerState::Activating).await?;

        let names = match self.storage().store_names().await {
            Ok(names) => names,
            Err(e) => {
                self.set_state(WorkerState::Installed).await;
                return Err(e);
            }
        };

        let generation = &self.settings().generation;
        let scope = self.settings().deletion_scope;
        let stale: Vec<String> = names.into_iter().filter(|name| generation.is_stale(name, scope)).collect();

        let results = join_all(stale.iter().map(|name| self.storage().delete_store(name))).await;

        let mut deleted = Vec::new();
        for (name, result) in stale.into_iter().zip(results) {
            match result {
                Ok(true) => {
                    tracing::info!(store = %name, "deleted stale cache");
                    deleted.push(name);
                }
                Ok(false) => tracing::debug!(store = %name, "stale cache already gone"),
                Err(e) => tracing::warn!(store = %name, error = %e, "failed to delete stale cache"),
            }
        }

        let claimed = self.clients().claim(self.cache_name()).await;
        self.set_state(WorkerState::Activated).await;
        tracing::info!(cache = %self.cache_name(), deleted = deleted.len(), claimed, "worker activated");

        Ok(ActivationReport { deleted, claimed })
    }
}
