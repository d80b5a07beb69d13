//! Deployment configuration, TOML-loadable with serde defaults.

pub mod defaults;
mod monitoring_config;
mod notification_config;
mod ratelimit_config;

pub use monitoring_config::{MonitoringConfig, PatientThresholds, Thresholds};
pub use notification_config::NotificationConfig;
pub use ratelimit_config::RateLimitConfig;

use serde::{Deserialize, Serialize};

use crate::errors::{VigilError, VigilResult};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    pub monitoring: MonitoringConfig,
    pub notification: NotificationConfig,
    pub rate_limit: RateLimitConfig,
    /// Shared secret the scheduler trigger must present. None disables
    /// the check (trusted-network deployments only).
    pub scheduler_secret: Option<String>,
}

impl VigilConfig {
    /// Parse from a TOML string and validate.
    pub fn from_toml_str(raw: &str) -> VigilResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| VigilError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> VigilResult<()> {
        self.monitoring.validate()?;
        self.notification.validate()?;
        self.rate_limit.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = VigilConfig::from_toml_str("").unwrap();
        assert_eq!(
            config.monitoring.soft_threshold_secs,
            defaults::DEFAULT_SOFT_THRESHOLD_SECS
        );
        assert_eq!(config.rate_limit.limit, defaults::DEFAULT_RATE_LIMIT);
        assert!(config.scheduler_secret.is_none());
    }

    #[test]
    fn partial_toml_overrides_one_section() {
        let raw = r#"
            scheduler_secret = "s3cret"

            [monitoring]
            soft_threshold_secs = 30
            escalation_window_secs = 60
        "#;
        let config = VigilConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.monitoring.soft_threshold_secs, 30);
        assert_eq!(config.scheduler_secret.as_deref(), Some("s3cret"));
        // Untouched section keeps its defaults.
        assert_eq!(
            config.notification.max_attempts,
            defaults::DEFAULT_MAX_SEND_ATTEMPTS
        );
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = VigilConfig::from_toml_str("[monitoring]\nsoft_threshold_secs = 0").unwrap_err();
        assert_eq!(err.kind(), "config");
    }
}
