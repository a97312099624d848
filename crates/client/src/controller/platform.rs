//! Host platform detection.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static IOS_DEVICE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"iPad|iPhone|iPod").unwrap());

/// What the page can observe about its browser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Environment {
    pub user_agent: String,
    /// Legacy IE/Edge mobile marker that also spoofs iOS user agents.
    #[serde(default)]
    pub ms_stream: bool,
    /// `(display-mode: standalone)` matches.
    #[serde(default)]
    pub display_standalone: bool,
    /// `navigator.standalone`, set by iOS home-screen launches.
    #[serde(default)]
    pub navigator_standalone: bool,
    #[serde(default)]
    pub referrer: String,
    /// The browser exposes a worker container.
    #[serde(default = "supported")]
    pub service_worker: bool,
}

fn supported() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Platform {
    pub ios: bool,
    pub standalone: bool,
    pub service_worker: bool,
}

impl Platform {
    pub fn detect(env: &Environment) -> Self {
        Self {
            ios: IOS_DEVICE.is_match(&env.user_agent) && !env.ms_stream,
            standalone: env.display_standalone || env.navigator_standalone || env.referrer.contains("android-app://"),
            service_worker: env.service_worker,
        }
    }
}
