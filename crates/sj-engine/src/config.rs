//! Engine configuration
//!
//! The default configuration is the shipped profile: the Alibaba domain
//! list, the "Alibaba" container, the `azclid` click identifier, and the
//! Multi-Account Containers companion id.

use crate::companion::DEFAULT_COMPANION_ID;
use crate::host::IdentityDetails;
use sj_core::JAILED_DOMAINS;

/// Host versions older than this use the legacy identity icon.
pub const LEGACY_ICON_VERSION: u32 = 67;
const LEGACY_ICON: &str = "briefcase";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Name/color/icon of the dedicated container.
    pub container: IdentityDetails,
    /// The static jailed-domain list.
    pub domains: Vec<String>,
    /// Extension id of the companion container extension.
    pub companion_id: String,
    /// Tracking click-identifier stripped from navigations.
    pub tracking_param: String,
    /// Host (browser) major version, when known. Gates the identity icon
    /// choice for old hosts.
    pub host_version: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            container: IdentityDetails {
                name: "Alibaba".to_string(),
                color: "orange".to_string(),
                icon: "cart".to_string(),
            },
            domains: JAILED_DOMAINS.iter().map(|d| d.to_string()).collect(),
            companion_id: DEFAULT_COMPANION_ID.to_string(),
            tracking_param: "azclid".to_string(),
            host_version: None,
        }
    }
}

impl EngineConfig {
    /// Container details with the host-version icon gate applied.
    pub fn identity_details(&self) -> IdentityDetails {
        let mut details = self.container.clone();
        if let Some(version) = self.host_version {
            if version < LEGACY_ICON_VERSION {
                details.icon = LEGACY_ICON.to_string();
            }
        }
        details
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let config = EngineConfig::default();
        assert_eq!(config.container.name, "Alibaba");
        assert_eq!(config.tracking_param, "azclid");
        assert_eq!(config.domains.len(), JAILED_DOMAINS.len());
    }

    #[test]
    fn test_icon_gate() {
        let mut config = EngineConfig::default();
        assert_eq!(config.identity_details().icon, "cart");

        config.host_version = Some(66);
        assert_eq!(config.identity_details().icon, "briefcase");
        assert_eq!(config.identity_details().color, "orange");

        config.host_version = Some(67);
        assert_eq!(config.identity_details().icon, "cart");
    }
}
