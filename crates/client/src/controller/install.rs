//! Install promotion: the deferred install prompt and the two banners.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use swcache_core::Error;

/// Preference flag set when the user dismisses the install banner.
pub const PWA_DISMISSED: &str = "pwaDismissed";

/// Preference flag set when the user closes the iOS home-screen tip.
pub const IOS_TIP_DISMISSED: &str = "iosTipDismissed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallOutcome {
    Accepted,
    Dismissed,
}

/// A captured `beforeinstallprompt` that can be replayed later.
#[async_trait]
pub trait InstallPrompt: Send + Sync {
    /// Show the native prompt and wait for the user's choice.
    async fn prompt(&self) -> Result<InstallOutcome, Error>;
}

/// Banner visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Banners {
    pub install_banner: bool,
    pub ios_tip: bool,
}

impl Banners {
    pub fn hide_all(&mut self) {
        self.install_banner = false;
        self.ios_tip = false;
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hide_all() {
        let mut banners = Banners { install_banner: true, ios_tip: true };
        banners.hide_all();
        assert_eq!(banners, Banners::default());
    }

    #[test]
    fn test_outcome_serde() {
        assert_eq!(serde_json::to_string(&InstallOutcome::Accepted).unwrap(), "\"accepted\"");
    }
}
