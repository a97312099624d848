//! SQLite-backed named cache stores.
//!
//! This module provides persistent request/response stores using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named stores, one per cache generation
//! - Entries keyed by a SHA-256 request identity (method + URL)
//! - Atomic multi-entry writes for precaching
//! - Persisted preference flags
//! - Automatic schema migrations

pub mod connection;
pub mod generation;
pub mod hash;
pub mod migrations;
pub mod preferences;
pub mod stores;

use async_trait::async_trait;

pub use crate::Error;
use crate::http::{Request, Response};

pub use connection::CacheDb;
pub use generation::{DeletionScope, Generation, store_name};

/// Storage operations the worker and page controller rely on.
///
/// Implemented by [`CacheDb`]; tests wrap it to inject failures.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the named store if it does not exist yet.
    async fn open_store(&self, name: &str) -> Result<(), Error>;

    async fn has_store(&self, name: &str) -> Result<bool, Error>;

    /// Names of every store, oldest first.
    async fn store_names(&self) -> Result<Vec<String>, Error>;

    /// Delete a store and all its entries. Returns whether it existed.
    async fn delete_store(&self, name: &str) -> Result<bool, Error>;

    /// Look up a request identity in one store. A missing store is a miss.
    async fn match_request(&self, store: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Store a response, creating the store if needed.
    async fn put(&self, store: &str, request: &Request, response: Response) -> Result<(), Error>;

    /// Create the store and write every entry in one transaction.
    async fn put_all(&self, store: &str, entries: Vec<(Request, Response)>) -> Result<(), Error>;

    /// URLs of the entries held by a store.
    async fn entry_urls(&self, store: &str) -> Result<Vec<String>, Error>;
}

/// Persisted boolean flags keyed by feature name.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Current value; unset flags read as `false`.
    async fn flag(&self, feature: &str) -> Result<bool, Error>;

    async fn set_flag(&self, feature: &str, enabled: bool) -> Result<(), Error>;
}
