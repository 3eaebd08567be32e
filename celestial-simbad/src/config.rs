//! Client configuration: which SIMBAD mirror to talk to and how.

use std::time::Duration;

/// Primary SIMBAD mirror operated by CDS Strasbourg.
pub const DEFAULT_MIRROR: &str = "https://simbad.cds.unistra.fr/simbad";
/// Harvard CfA mirror.
pub const HARVARD_MIRROR: &str = "https://simbad.harvard.edu/simbad";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// TAP output format; the table adapter reads `TABLEDATA` serialization.
pub const DEFAULT_TAP_FORMAT: &str = "votable/td";

pub const MIRROR_ENV: &str = "SIMBAD_MIRROR";
pub const TIMEOUT_ENV: &str = "SIMBAD_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimbadConfig {
    /// Base URL without trailing slash, e.g. `https://simbad.cds.unistra.fr/simbad`.
    pub mirror_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    /// Value of the `format` parameter sent to the TAP endpoint.
    pub tap_format: String,
}

impl SimbadConfig {
    pub fn new() -> Self {
        Self {
            mirror_url: DEFAULT_MIRROR.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("celestial-simbad/{}", env!("CARGO_PKG_VERSION")),
            tap_format: DEFAULT_TAP_FORMAT.to_string(),
        }
    }

    /// Defaults overridden by `SIMBAD_MIRROR` and `SIMBAD_TIMEOUT_SECS`.
    ///
    /// An unparsable timeout is ignored and the default kept.
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Ok(mirror) = std::env::var(MIRROR_ENV) {
            if !mirror.trim().is_empty() {
                config = config.with_mirror(mirror);
            }
        }
        if let Some(secs) = std::env::var(TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
    }

    pub fn with_mirror(mut self, mirror_url: impl Into<String>) -> Self {
        self.mirror_url = mirror_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_tap_format(mut self, format: impl Into<String>) -> Self {
        self.tap_format = format.into();
        self
    }

    pub fn script_endpoint(&self) -> String {
        format!("{}/sim-script", self.mirror_url)
    }

    pub fn tap_endpoint(&self) -> String {
        format!("{}/sim-tap/sync", self.mirror_url)
    }
}

impl Default for SimbadConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimbadConfig::default();
        assert_eq!(config.mirror_url, DEFAULT_MIRROR);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.tap_format, "votable/td");
        assert_eq!(
            config.user_agent,
            format!("celestial-simbad/{}", env!("CARGO_PKG_VERSION"))
        );
    }

    #[test]
    fn test_with_mirror_trims_trailing_slash() {
        let config = SimbadConfig::new().with_mirror("https://simbad.harvard.edu/simbad/");
        assert_eq!(config.mirror_url, HARVARD_MIRROR);
        assert_eq!(
            config.tap_endpoint(),
            "https://simbad.harvard.edu/simbad/sim-tap/sync"
        );
        assert_eq!(
            config.script_endpoint(),
            "https://simbad.harvard.edu/simbad/sim-script"
        );
    }

    #[test]
    fn test_builder_methods() {
        let config = SimbadConfig::new()
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("test-agent")
            .with_tap_format("votable");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.tap_format, "votable");
    }
}
