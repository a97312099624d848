//! Client code for swcache.
//!
//! This crate provides the network fetch client, the offline cache worker,
//! and the page controller that registers and drives it. Hosts (the MCP
//! server and the CLI) deliver events to the worker through this crate.

pub mod controller;
pub mod fetch;
pub mod worker;

pub use controller::{Environment, PageController, Panels, Platform};
pub use fetch::{FetchClient, FetchConfig, Network};
pub use worker::{
    EventKind, EventOutcome, EventResult, FetchDisposition, Registration, ResponseSource, ServiceWorker, WaitUntil,
    WorkerEvent, WorkerSettings, WorkerState,
};
