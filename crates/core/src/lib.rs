//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Request/response model with one-shot bodies
//! - Named cache stores and preference flags with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CacheStorage, DeletionScope, Generation, PreferenceStore};
pub use config::AppConfig;
pub use error::Error;
pub use http::{Headers, Request, Response, ResponseType};
