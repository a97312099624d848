//! Cache-related MCP tools.
//!
//! These operate on cache storage directly, outside the worker's event flow.

pub mod clear;
pub mod list;

pub use clear::{CacheClearParams, clear_impl};
pub use list::{CacheListParams, list_impl};
