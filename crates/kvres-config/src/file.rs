//! TOML representation of [`ClientConfig`](crate::ClientConfig).
//!
//! Durations are written in milliseconds (`*_ms` keys). Every key is
//! optional; unset keys keep the builder defaults. Unknown keys are rejected
//! so that typos do not go unnoticed.
//!
//! ```toml
//! bootstrap_urls = ["tcp://node-a:6666"]
//! socket_timeout_ms = 2000
//!
//! [timeouts]
//! default_ms = 1500
//! partial_get_all_allowed = true
//!
//! [timeouts.operations]
//! put = 3000
//!
//! [failure_detector]
//! threshold_percent = 80
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::client::{ClientConfigBuilder, RequestFormat, RoutingTier};
use crate::error::{ConfigError, ConfigResult};
use crate::failure::{FailureDetectorConfig, FailureDetectorKind};
use crate::opcode::OpCode;
use crate::timeout::TimeoutConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfigFile {
    pub bootstrap_urls: Option<Vec<String>>,
    pub client_context_name: Option<String>,
    pub client_zone_id: Option<u32>,
    pub async_job_thread_pool_size: Option<u32>,
    pub async_metadata_refresh_ms: Option<u64>,
    pub client_registry_update_interval_ms: Option<u64>,
    pub default_client_enabled: Option<bool>,
    pub jmx_enabled: Option<bool>,
    pub lazy_enabled: Option<bool>,
    pub pipeline_routed_store_enabled: Option<bool>,
    pub max_bootstrap_retries: Option<u32>,
    pub max_connections_per_node: Option<u32>,
    pub max_total_connections: Option<u32>,
    pub max_queued_requests: Option<u32>,
    pub max_threads: Option<u32>,
    pub selectors: Option<u32>,
    pub request_format: Option<RequestFormat>,
    pub routing_tier: Option<RoutingTier>,
    pub serializer_factory: Option<String>,
    pub socket_buffer_size: Option<u32>,
    pub socket_keep_alive: Option<bool>,
    pub connection_timeout_ms: Option<u64>,
    pub socket_timeout_ms: Option<u64>,
    pub routing_timeout_ms: Option<u64>,
    pub thread_idle_time_ms: Option<u64>,
    pub sys_jmx_enabled: Option<bool>,
    pub sys_pipeline_routed_store_enabled: Option<bool>,
    pub sys_max_connections_per_node: Option<u32>,
    pub sys_connection_timeout_ms: Option<u64>,
    pub sys_socket_timeout_ms: Option<u64>,
    pub sys_routing_timeout_ms: Option<u64>,
    pub timeouts: Option<TimeoutSection>,
    pub failure_detector: Option<FailureDetectorSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutSection {
    pub default_ms: Option<u64>,
    pub partial_get_all_allowed: Option<bool>,
    pub operations: BTreeMap<String, u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FailureDetectorSection {
    pub kind: Option<FailureDetectorKind>,
    pub bannage_period_ms: Option<u64>,
    pub async_recovery_interval_ms: Option<u64>,
    pub catastrophic_error_types: Option<Vec<String>>,
    pub request_length_threshold_ms: Option<u64>,
    pub threshold_percent: Option<u8>,
    pub threshold_count_minimum: Option<u32>,
    pub threshold_interval_ms: Option<u64>,
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

impl ClientConfigFile {
    /// Copy every key present in the file onto `builder`.
    pub fn apply(self, builder: &mut ClientConfigBuilder) -> ConfigResult<()> {
        if let Some(v) = self.bootstrap_urls {
            builder.bootstrap_urls(v);
        }
        if let Some(v) = self.client_context_name {
            builder.client_context_name(v);
        }
        if let Some(v) = self.client_zone_id {
            builder.client_zone_id(v);
        }
        if let Some(v) = self.async_job_thread_pool_size {
            builder.async_job_thread_pool_size(v);
        }
        if let Some(v) = self.async_metadata_refresh_ms {
            builder.async_metadata_refresh(ms(v));
        }
        if let Some(v) = self.client_registry_update_interval_ms {
            builder.client_registry_update_interval(ms(v));
        }
        if let Some(v) = self.default_client_enabled {
            builder.default_client_enabled(v);
        }
        if let Some(v) = self.jmx_enabled {
            builder.jmx_enabled(v);
        }
        if let Some(v) = self.lazy_enabled {
            builder.lazy_enabled(v);
        }
        if let Some(v) = self.pipeline_routed_store_enabled {
            builder.pipeline_routed_store_enabled(v);
        }
        if let Some(v) = self.max_bootstrap_retries {
            builder.max_bootstrap_retries(v);
        }
        if let Some(v) = self.max_connections_per_node {
            builder.max_connections_per_node(v);
        }
        if let Some(v) = self.max_total_connections {
            builder.max_total_connections(v);
        }
        if let Some(v) = self.max_queued_requests {
            builder.max_queued_requests(v);
        }
        if let Some(v) = self.max_threads {
            builder.max_threads(v);
        }
        if let Some(v) = self.selectors {
            builder.selectors(v);
        }
        if let Some(v) = self.request_format {
            builder.request_format(v);
        }
        if let Some(v) = self.routing_tier {
            builder.routing_tier(v);
        }
        if let Some(v) = self.serializer_factory {
            builder.serializer_factory(v);
        }
        if let Some(v) = self.socket_buffer_size {
            builder.socket_buffer_size(v);
        }
        if let Some(v) = self.socket_keep_alive {
            builder.socket_keep_alive(v);
        }
        if let Some(v) = self.connection_timeout_ms {
            builder.connection_timeout(ms(v));
        }
        if let Some(v) = self.socket_timeout_ms {
            builder.socket_timeout(ms(v));
        }
        if let Some(v) = self.routing_timeout_ms {
            builder.routing_timeout(ms(v));
        }
        if let Some(v) = self.thread_idle_time_ms {
            builder.thread_idle_time(ms(v));
        }
        if let Some(v) = self.sys_jmx_enabled {
            builder.sys_jmx_enabled(v);
        }
        if let Some(v) = self.sys_pipeline_routed_store_enabled {
            builder.sys_pipeline_routed_store_enabled(v);
        }
        if let Some(v) = self.sys_max_connections_per_node {
            builder.sys_max_connections_per_node(v);
        }
        if let Some(v) = self.sys_connection_timeout_ms {
            builder.sys_connection_timeout(ms(v));
        }
        if let Some(v) = self.sys_socket_timeout_ms {
            builder.sys_socket_timeout(ms(v));
        }
        if let Some(v) = self.sys_routing_timeout_ms {
            builder.sys_routing_timeout(ms(v));
        }
        if let Some(section) = self.timeouts {
            builder.timeout_config(&section.into_config()?);
        }
        if let Some(section) = self.failure_detector {
            builder.failure_detector(&section.into_config());
        }
        Ok(())
    }
}

impl TimeoutSection {
    /// Unvalidated; the client builder validates the nested value on build.
    fn into_config(self) -> ConfigResult<TimeoutConfig> {
        let global = self.default_ms.map(ms).unwrap_or(TimeoutConfig::DEFAULT_TIMEOUT);
        let mut builder = TimeoutConfig::builder(global);
        if let Some(allowed) = self.partial_get_all_allowed {
            builder.partial_get_all_allowed(allowed);
        }
        for (name, timeout) in self.operations {
            let op = OpCode::from_name(&name).ok_or_else(|| {
                ConfigError::invalid("timeouts.operations", format!("unknown operation {name}"))
            })?;
            builder.operation_timeout(op, ms(timeout));
        }
        Ok(builder.into_unvalidated())
    }
}

impl FailureDetectorSection {
    fn into_config(self) -> FailureDetectorConfig {
        let mut builder = FailureDetectorConfig::builder();
        if let Some(v) = self.kind {
            builder.kind(v);
        }
        if let Some(v) = self.bannage_period_ms {
            builder.bannage_period(ms(v));
        }
        if let Some(v) = self.async_recovery_interval_ms {
            builder.async_recovery_interval(ms(v));
        }
        if let Some(v) = self.catastrophic_error_types {
            builder.catastrophic_error_types(v);
        }
        if let Some(v) = self.request_length_threshold_ms {
            builder.request_length_threshold(ms(v));
        }
        if let Some(v) = self.threshold_percent {
            builder.threshold_percent(v);
        }
        if let Some(v) = self.threshold_count_minimum {
            builder.threshold_count_minimum(v);
        }
        if let Some(v) = self.threshold_interval_ms {
            builder.threshold_interval(ms(v));
        }
        builder.into_unvalidated()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::client::ClientConfig;

    use super::*;

    const SAMPLE: &str = r#"
bootstrap_urls = ["tcp://node-a:6666", "tcp://node-b:6666"]
client_context_name = "orders"
routing_tier = "server"
socket_timeout_ms = 2000
thread_idle_time_ms = 30000
sys_max_connections_per_node = 2
sys_routing_timeout_ms = 8000

[timeouts]
default_ms = 1500
partial_get_all_allowed = true

[timeouts.operations]
put = 3000

[failure_detector]
kind = "bannage_period"
threshold_percent = 80
catastrophic_error_types = ["connection_refused"]
"#;

    #[test]
    fn parses_full_document() {
        let c = ClientConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(c.bootstrap_urls().len(), 2);
        assert_eq!(c.client_context_name(), "orders");
        assert_eq!(c.routing_tier(), RoutingTier::Server);
        assert_eq!(c.socket_timeout(), Duration::from_secs(2));
        assert_eq!(c.thread_idle_time(), Duration::from_secs(30));
        assert_eq!(c.sys_max_connections_per_node(), 2);
        assert_eq!(c.sys_routing_timeout(), Duration::from_secs(8));
        assert_eq!(c.bootstrap_uris()[1].host_str(), Some("node-b"));
        assert_eq!(c.timeout_config().timeout_for(OpCode::Get), Duration::from_millis(1500));
        assert_eq!(c.timeout_config().timeout_for(OpCode::Put), Duration::from_secs(3));
        assert!(c.timeout_config().is_partial_get_all_allowed());
        assert_eq!(c.failure_detector().kind(), FailureDetectorKind::BannagePeriod);
        assert_eq!(c.failure_detector().threshold_percent(), 80);
        // Untouched keys keep defaults.
        assert_eq!(c.max_threads(), ClientConfig::default().max_threads());
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(ClientConfig::from_toml_str("").unwrap(), ClientConfig::default());
    }

    #[test]
    fn unknown_key_rejected() {
        let err = ClientConfig::from_toml_str("max_thread = 4").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_operation_rejected() {
        let err = ClientConfig::from_toml_str("[timeouts.operations]\nfetch = 10").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "timeouts.operations", .. }));
    }

    #[test]
    fn invalid_value_rejected_after_parse() {
        let err = ClientConfig::from_toml_str("[failure_detector]\nthreshold_percent = 150")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let c = ClientConfig::load(file.path()).unwrap();
        assert_eq!(c, ClientConfig::from_toml_str(SAMPLE).unwrap());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
