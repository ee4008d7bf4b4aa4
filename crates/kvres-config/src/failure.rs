use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Strategy used to decide that a store node is unhealthy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureDetectorKind {
    /// Mark a node down when its success ratio drops under a threshold.
    #[default]
    Threshold,
    /// Mark a node down for a fixed period after any failure.
    BannagePeriod,
}

/// Node failure detection settings.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FailureDetectorConfig {
    kind: FailureDetectorKind,
    bannage_period: Duration,
    async_recovery_interval: Duration,
    catastrophic_error_types: Vec<String>,
    request_length_threshold: Duration,
    threshold_percent: u8,
    threshold_count_minimum: u32,
    threshold_interval: Duration,
}

impl Default for FailureDetectorConfig {
    fn default() -> Self {
        Self {
            kind: FailureDetectorKind::Threshold,
            bannage_period: Duration::from_secs(30),
            async_recovery_interval: Duration::from_secs(10),
            catastrophic_error_types: vec![
                "connection_refused".to_string(),
                "no_route_to_host".to_string(),
                "unknown_host".to_string(),
            ],
            request_length_threshold: Duration::from_secs(5),
            threshold_percent: 95,
            threshold_count_minimum: 30,
            threshold_interval: Duration::from_secs(300),
        }
    }
}

impl FailureDetectorConfig {
    pub fn builder() -> FailureDetectorConfigBuilder {
        FailureDetectorConfigBuilder {
            working: Self::default(),
        }
    }

    pub fn to_builder(&self) -> FailureDetectorConfigBuilder {
        FailureDetectorConfigBuilder {
            working: self.clone(),
        }
    }

    pub fn kind(&self) -> FailureDetectorKind {
        self.kind
    }

    pub fn bannage_period(&self) -> Duration {
        self.bannage_period
    }

    pub fn async_recovery_interval(&self) -> Duration {
        self.async_recovery_interval
    }

    /// Error kinds that immediately mark a node unavailable.
    pub fn catastrophic_error_types(&self) -> &[String] {
        &self.catastrophic_error_types
    }

    /// Requests slower than this count as failures.
    pub fn request_length_threshold(&self) -> Duration {
        self.request_length_threshold
    }

    pub fn threshold_percent(&self) -> u8 {
        self.threshold_percent
    }

    pub fn threshold_count_minimum(&self) -> u32 {
        self.threshold_count_minimum
    }

    pub fn threshold_interval(&self) -> Duration {
        self.threshold_interval
    }

    pub(crate) fn validate(&self) -> ConfigResult<()> {
        if self.threshold_percent > 100 {
            return Err(ConfigError::invalid(
                "failure_detector.threshold_percent",
                format!("{} is not a percentage", self.threshold_percent),
            ));
        }
        if self.threshold_interval.is_zero() {
            return Err(ConfigError::invalid(
                "failure_detector.threshold_interval",
                "must be greater than zero",
            ));
        }
        if self.catastrophic_error_types.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "failure_detector.catastrophic_error_types",
                "entries must not be blank",
            ));
        }
        Ok(())
    }
}

/// Accumulates failure detector changes.
#[derive(Clone, Debug)]
pub struct FailureDetectorConfigBuilder {
    working: FailureDetectorConfig,
}

impl FailureDetectorConfigBuilder {
    pub fn kind(&mut self, kind: FailureDetectorKind) -> &mut Self {
        self.working.kind = kind;
        self
    }

    pub fn bannage_period(&mut self, period: Duration) -> &mut Self {
        self.working.bannage_period = period;
        self
    }

    pub fn async_recovery_interval(&mut self, interval: Duration) -> &mut Self {
        self.working.async_recovery_interval = interval;
        self
    }

    /// Replace the catastrophic error types with a copy of `types`.
    pub fn catastrophic_error_types<I, S>(&mut self, types: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.working.catastrophic_error_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn request_length_threshold(&mut self, threshold: Duration) -> &mut Self {
        self.working.request_length_threshold = threshold;
        self
    }

    pub fn threshold_percent(&mut self, percent: u8) -> &mut Self {
        self.working.threshold_percent = percent;
        self
    }

    pub fn threshold_count_minimum(&mut self, minimum: u32) -> &mut Self {
        self.working.threshold_count_minimum = minimum;
        self
    }

    pub fn threshold_interval(&mut self, interval: Duration) -> &mut Self {
        self.working.threshold_interval = interval;
        self
    }

    pub fn build(&self) -> ConfigResult<FailureDetectorConfig> {
        self.working.validate()?;
        Ok(self.working.clone())
    }

    pub(crate) fn into_unvalidated(self) -> FailureDetectorConfig {
        self.working
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = FailureDetectorConfig::builder().build().unwrap();
        assert_eq!(c, FailureDetectorConfig::default());
        assert_eq!(c.kind(), FailureDetectorKind::Threshold);
        assert_eq!(c.threshold_percent(), 95);
    }

    #[test]
    fn error_type_list_is_copied() {
        let mut types = vec!["timeout".to_string()];
        let c = FailureDetectorConfig::builder()
            .catastrophic_error_types(types.iter().cloned())
            .build()
            .unwrap();
        types.push("reset".to_string());
        assert_eq!(c.catastrophic_error_types(), ["timeout".to_string()]);
    }

    #[test]
    fn threshold_over_100_rejected() {
        let err = FailureDetectorConfig::builder()
            .threshold_percent(101)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "failure_detector.threshold_percent", .. }
        ));
    }

    #[test]
    fn blank_error_type_rejected() {
        let err = FailureDetectorConfig::builder()
            .catastrophic_error_types(["ok", " "])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("catastrophic_error_types"));
    }

    #[test]
    fn to_builder_leaves_original() {
        let base = FailureDetectorConfig::default();
        let banned = base
            .to_builder()
            .kind(FailureDetectorKind::BannagePeriod)
            .build()
            .unwrap();
        assert_eq!(base.kind(), FailureDetectorKind::Threshold);
        assert_eq!(banned.kind(), FailureDetectorKind::BannagePeriod);
        assert_ne!(base, banned);
    }
}
