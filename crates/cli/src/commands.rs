//! Command handlers. Each returns a serializable report that `main` prints.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use swcache_client::{Registration, ResponseSource, WorkerSettings};
use swcache_core::{Generation, Request};
use url::Url;

#[derive(Debug, Serialize)]
pub struct InstallReport {
    pub cache: String,
    pub entries: usize,
}

#[derive(Debug, Serialize)]
pub struct ActivateReport {
    pub cache: String,
    pub deleted: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FetchReport {
    pub status: u16,
    pub status_text: String,
    pub source: ResponseSource,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct StoreReport {
    pub name: String,
    pub entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
}

/// Apply a `--cache-version` override.
pub fn with_version(mut settings: WorkerSettings, version: Option<String>) -> WorkerSettings {
    if let Some(version) = version {
        settings.generation = Generation::new(settings.generation.prefix(), version);
    }
    settings
}

pub async fn install(registration: &Registration, settings: WorkerSettings) -> Result<InstallReport> {
    let installation = registration.install(settings).await?;
    Ok(InstallReport { cache: installation.worker.cache_name().to_string(), entries: installation.entries })
}

pub async fn activate(registration: &Registration, settings: WorkerSettings) -> Result<ActivateReport> {
    let cache = settings.generation.store_name().to_string();
    if registration.restore_waiting(settings).await?.is_none() {
        bail!("cache {cache} is not installed; run `swcache install` first");
    }
    let activation = registration.activate().await?;
    Ok(ActivateReport { cache, deleted: activation.report.deleted })
}

pub async fn fetch(
    registration: &Registration, settings: WorkerSettings, url: &str, method: &str, accept: Option<&str>,
) -> Result<FetchReport> {
    let url = Url::parse(url).with_context(|| format!("invalid url: {url}"))?;
    let mut request = Request::new(method, url);
    if let Some(accept) = accept {
        request = request.with_header("Accept", accept);
    }

    let (response, source) = match registration.resume_active(settings).await? {
        Some(worker) => {
            let (response, source, wait_until) = worker.respond(request).await?;
            wait_until.settled().await;
            (response, source)
        }
        None => {
            tracing::warn!("no installed cache generation, fetching directly");
            (registration.network().fetch(&request).await?, ResponseSource::Passthrough)
        }
    };

    Ok(FetchReport {
        status: response.status(),
        status_text: response.status_text().to_string(),
        source,
        content_type: response.content_type().map(String::from),
        body: response.text(),
    })
}

pub async fn stores(registration: &Registration, include_urls: bool) -> Result<Vec<StoreReport>> {
    let storage = registration.storage();
    let mut reports = Vec::new();
    for name in storage.store_names().await? {
        let urls = storage.entry_urls(&name).await?;
        reports.push(StoreReport { entries: urls.len(), urls: include_urls.then_some(urls), name });
    }
    Ok(reports)
}

pub async fn clear(registration: &Registration, store: Option<String>) -> Result<Vec<String>> {
    let storage = registration.storage();
    let names = match store {
        Some(name) => vec![name],
        None => storage.store_names().await?,
    };

    let mut deleted = Vec::new();
    for name in names {
        if storage.delete_store(&name).await? {
            deleted.push(name);
        } else {
            tracing::warn!(store = %name, "no such store");
        }
    }
    Ok(deleted)
}
