use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::failure::FailureDetectorConfig;
use crate::file::ClientConfigFile;
use crate::timeout::TimeoutConfig;

/// Request encoding spoken to store nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestFormat {
    #[default]
    Native,
    ProtocolBuffers,
    Admin,
}

/// Where request routing happens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingTier {
    #[default]
    Client,
    Server,
}

/// Immutable configuration of a store client.
///
/// Built through [`ClientConfigBuilder`]. Every build is a deep copy, so
/// later changes to the builder (or to the lists passed into it) never reach
/// an already-built configuration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClientConfig {
    bootstrap_urls: Vec<String>,
    bootstrap_uris: Vec<Url>,
    client_context_name: String,
    client_zone_id: u32,
    async_job_thread_pool_size: u32,
    async_metadata_refresh: Duration,
    client_registry_update_interval: Duration,
    default_client_enabled: bool,
    jmx_enabled: bool,
    lazy_enabled: bool,
    pipeline_routed_store_enabled: bool,
    max_bootstrap_retries: u32,
    max_connections_per_node: u32,
    max_total_connections: u32,
    max_queued_requests: u32,
    max_threads: u32,
    selectors: u32,
    request_format: RequestFormat,
    routing_tier: RoutingTier,
    serializer_factory: String,
    socket_buffer_size: u32,
    socket_keep_alive: bool,
    connection_timeout: Duration,
    socket_timeout: Duration,
    routing_timeout: Duration,
    thread_idle_time: Duration,
    sys_jmx_enabled: bool,
    sys_pipeline_routed_store_enabled: bool,
    sys_max_connections_per_node: u32,
    sys_connection_timeout: Duration,
    sys_socket_timeout: Duration,
    sys_routing_timeout: Duration,
    failure_detector: FailureDetectorConfig,
    timeout_config: TimeoutConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            bootstrap_urls: Vec::new(),
            bootstrap_uris: Vec::new(),
            client_context_name: "default".to_string(),
            client_zone_id: 0,
            async_job_thread_pool_size: 2,
            async_metadata_refresh: Duration::from_secs(120),
            client_registry_update_interval: Duration::from_secs(3600),
            default_client_enabled: false,
            jmx_enabled: true,
            lazy_enabled: false,
            pipeline_routed_store_enabled: true,
            max_bootstrap_retries: 2,
            max_connections_per_node: 50,
            max_total_connections: 500,
            max_queued_requests: 50,
            max_threads: 6,
            selectors: 8,
            request_format: RequestFormat::Native,
            routing_tier: RoutingTier::Client,
            serializer_factory: "default".to_string(),
            socket_buffer_size: 64 * 1024,
            socket_keep_alive: false,
            connection_timeout: Duration::from_millis(500),
            socket_timeout: Duration::from_secs(5),
            routing_timeout: TimeoutConfig::DEFAULT_TIMEOUT,
            thread_idle_time: Duration::from_secs(100),
            sys_jmx_enabled: false,
            sys_pipeline_routed_store_enabled: true,
            sys_max_connections_per_node: 5,
            sys_connection_timeout: Duration::from_millis(1500),
            sys_socket_timeout: Duration::from_secs(5),
            sys_routing_timeout: Duration::from_secs(5),
            failure_detector: FailureDetectorConfig::default(),
            timeout_config: TimeoutConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Start a builder from the default configuration.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            working: Self::default(),
        }
    }

    /// Start a builder from a copy of this configuration.
    pub fn to_builder(&self) -> ClientConfigBuilder {
        ClientConfigBuilder {
            working: self.clone(),
        }
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let file: ClientConfigFile = toml::from_str(text)?;
        let mut builder = Self::builder();
        file.apply(&mut builder)?;
        builder.build()
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), urls = config.bootstrap_urls.len(), "client config loaded");
        Ok(config)
    }

    pub fn bootstrap_urls(&self) -> &[String] {
        &self.bootstrap_urls
    }

    /// The bootstrap URLs parsed at build time, in input order, without
    /// duplicates.
    pub fn bootstrap_uris(&self) -> &[Url] {
        &self.bootstrap_uris
    }

    pub fn client_context_name(&self) -> &str {
        &self.client_context_name
    }

    pub fn client_zone_id(&self) -> u32 {
        self.client_zone_id
    }

    pub fn async_job_thread_pool_size(&self) -> u32 {
        self.async_job_thread_pool_size
    }

    pub fn async_metadata_refresh(&self) -> Duration {
        self.async_metadata_refresh
    }

    pub fn client_registry_update_interval(&self) -> Duration {
        self.client_registry_update_interval
    }

    pub fn is_default_client_enabled(&self) -> bool {
        self.default_client_enabled
    }

    pub fn is_jmx_enabled(&self) -> bool {
        self.jmx_enabled
    }

    pub fn is_lazy_enabled(&self) -> bool {
        self.lazy_enabled
    }

    pub fn is_pipeline_routed_store_enabled(&self) -> bool {
        self.pipeline_routed_store_enabled
    }

    pub fn max_bootstrap_retries(&self) -> u32 {
        self.max_bootstrap_retries
    }

    pub fn max_connections_per_node(&self) -> u32 {
        self.max_connections_per_node
    }

    pub fn max_total_connections(&self) -> u32 {
        self.max_total_connections
    }

    pub fn max_queued_requests(&self) -> u32 {
        self.max_queued_requests
    }

    pub fn max_threads(&self) -> u32 {
        self.max_threads
    }

    pub fn selectors(&self) -> u32 {
        self.selectors
    }

    pub fn request_format(&self) -> RequestFormat {
        self.request_format
    }

    pub fn routing_tier(&self) -> RoutingTier {
        self.routing_tier
    }

    pub fn serializer_factory(&self) -> &str {
        &self.serializer_factory
    }

    pub fn socket_buffer_size(&self) -> u32 {
        self.socket_buffer_size
    }

    pub fn socket_keep_alive(&self) -> bool {
        self.socket_keep_alive
    }

    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    pub fn socket_timeout(&self) -> Duration {
        self.socket_timeout
    }

    pub fn routing_timeout(&self) -> Duration {
        self.routing_timeout
    }

    /// How long an idle worker thread is kept alive.
    pub fn thread_idle_time(&self) -> Duration {
        self.thread_idle_time
    }

    /// JMX for the internal system-store client.
    pub fn is_sys_jmx_enabled(&self) -> bool {
        self.sys_jmx_enabled
    }

    pub fn is_sys_pipeline_routed_store_enabled(&self) -> bool {
        self.sys_pipeline_routed_store_enabled
    }

    pub fn sys_max_connections_per_node(&self) -> u32 {
        self.sys_max_connections_per_node
    }

    pub fn sys_connection_timeout(&self) -> Duration {
        self.sys_connection_timeout
    }

    pub fn sys_socket_timeout(&self) -> Duration {
        self.sys_socket_timeout
    }

    pub fn sys_routing_timeout(&self) -> Duration {
        self.sys_routing_timeout
    }

    pub fn failure_detector(&self) -> &FailureDetectorConfig {
        &self.failure_detector
    }

    pub fn timeout_config(&self) -> &TimeoutConfig {
        &self.timeout_config
    }

    /// Check every field and return the parsed bootstrap URLs.
    fn validate(&self) -> ConfigResult<Vec<Url>> {
        let mut uris: Vec<Url> = Vec::with_capacity(self.bootstrap_urls.len());
        for raw in &self.bootstrap_urls {
            let url = parse_bootstrap_url(raw)?;
            if !uris.contains(&url) {
                uris.push(url);
            }
        }
        if self.client_context_name.trim().is_empty() {
            return Err(ConfigError::invalid("client_context_name", "must not be blank"));
        }
        if self.serializer_factory.trim().is_empty() {
            return Err(ConfigError::invalid("serializer_factory", "must not be blank"));
        }
        let positive = [
            ("async_job_thread_pool_size", self.async_job_thread_pool_size),
            ("max_connections_per_node", self.max_connections_per_node),
            ("max_total_connections", self.max_total_connections),
            ("max_threads", self.max_threads),
            ("selectors", self.selectors),
            ("socket_buffer_size", self.socket_buffer_size),
            ("sys_max_connections_per_node", self.sys_max_connections_per_node),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::invalid(*field, "must be greater than zero"));
        }
        if self.max_total_connections < self.max_connections_per_node {
            return Err(ConfigError::invalid(
                "max_total_connections",
                format!(
                    "{} is less than max_connections_per_node ({})",
                    self.max_total_connections, self.max_connections_per_node
                ),
            ));
        }
        let timeouts = [
            ("connection_timeout", self.connection_timeout),
            ("socket_timeout", self.socket_timeout),
            ("routing_timeout", self.routing_timeout),
            ("thread_idle_time", self.thread_idle_time),
            ("sys_connection_timeout", self.sys_connection_timeout),
            ("sys_socket_timeout", self.sys_socket_timeout),
            ("sys_routing_timeout", self.sys_routing_timeout),
        ];
        if let Some((field, _)) = timeouts.iter().find(|(_, d)| d.is_zero()) {
            return Err(ConfigError::invalid(*field, "must be greater than zero"));
        }
        self.failure_detector.validate()?;
        self.timeout_config.validate()?;
        Ok(uris)
    }
}

fn parse_bootstrap_url(raw: &str) -> ConfigResult<Url> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::invalid("bootstrap_urls", format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "tcp" | "http" | "https") {
        return Err(ConfigError::invalid(
            "bootstrap_urls",
            format!("{raw}: unsupported scheme {}", url.scheme()),
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::invalid("bootstrap_urls", format!("{raw}: missing host")));
    }
    Ok(url)
}

/// Accumulates client configuration changes.
///
/// Setters take `&mut self` so the same builder can produce several
/// configurations; [`build`](ClientConfigBuilder::build) copies the working
/// state out each time.
#[derive(Clone, Debug)]
pub struct ClientConfigBuilder {
    working: ClientConfig,
}

impl ClientConfigBuilder {
    /// Replace the bootstrap URLs with a copy of `urls`.
    pub fn bootstrap_urls<I, S>(&mut self, urls: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.working.bootstrap_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_bootstrap_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.working.bootstrap_urls.push(url.into());
        self
    }

    pub fn client_context_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.working.client_context_name = name.into();
        self
    }

    pub fn client_zone_id(&mut self, zone: u32) -> &mut Self {
        self.working.client_zone_id = zone;
        self
    }

    pub fn async_job_thread_pool_size(&mut self, size: u32) -> &mut Self {
        self.working.async_job_thread_pool_size = size;
        self
    }

    pub fn async_metadata_refresh(&mut self, interval: Duration) -> &mut Self {
        self.working.async_metadata_refresh = interval;
        self
    }

    pub fn client_registry_update_interval(&mut self, interval: Duration) -> &mut Self {
        self.working.client_registry_update_interval = interval;
        self
    }

    pub fn default_client_enabled(&mut self, enabled: bool) -> &mut Self {
        self.working.default_client_enabled = enabled;
        self
    }

    pub fn jmx_enabled(&mut self, enabled: bool) -> &mut Self {
        self.working.jmx_enabled = enabled;
        self
    }

    pub fn lazy_enabled(&mut self, enabled: bool) -> &mut Self {
        self.working.lazy_enabled = enabled;
        self
    }

    pub fn pipeline_routed_store_enabled(&mut self, enabled: bool) -> &mut Self {
        self.working.pipeline_routed_store_enabled = enabled;
        self
    }

    pub fn max_bootstrap_retries(&mut self, retries: u32) -> &mut Self {
        self.working.max_bootstrap_retries = retries;
        self
    }

    pub fn max_connections_per_node(&mut self, max: u32) -> &mut Self {
        self.working.max_connections_per_node = max;
        self
    }

    pub fn max_total_connections(&mut self, max: u32) -> &mut Self {
        self.working.max_total_connections = max;
        self
    }

    pub fn max_queued_requests(&mut self, max: u32) -> &mut Self {
        self.working.max_queued_requests = max;
        self
    }

    pub fn max_threads(&mut self, max: u32) -> &mut Self {
        self.working.max_threads = max;
        self
    }

    pub fn selectors(&mut self, selectors: u32) -> &mut Self {
        self.working.selectors = selectors;
        self
    }

    pub fn request_format(&mut self, format: RequestFormat) -> &mut Self {
        self.working.request_format = format;
        self
    }

    pub fn routing_tier(&mut self, tier: RoutingTier) -> &mut Self {
        self.working.routing_tier = tier;
        self
    }

    pub fn serializer_factory(&mut self, factory: impl Into<String>) -> &mut Self {
        self.working.serializer_factory = factory.into();
        self
    }

    pub fn socket_buffer_size(&mut self, bytes: u32) -> &mut Self {
        self.working.socket_buffer_size = bytes;
        self
    }

    pub fn socket_keep_alive(&mut self, keep_alive: bool) -> &mut Self {
        self.working.socket_keep_alive = keep_alive;
        self
    }

    pub fn connection_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.working.connection_timeout = timeout;
        self
    }

    pub fn socket_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.working.socket_timeout = timeout;
        self
    }

    pub fn routing_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.working.routing_timeout = timeout;
        self
    }

    pub fn thread_idle_time(&mut self, idle: Duration) -> &mut Self {
        self.working.thread_idle_time = idle;
        self
    }

    pub fn sys_jmx_enabled(&mut self, enabled: bool) -> &mut Self {
        self.working.sys_jmx_enabled = enabled;
        self
    }

    pub fn sys_pipeline_routed_store_enabled(&mut self, enabled: bool) -> &mut Self {
        self.working.sys_pipeline_routed_store_enabled = enabled;
        self
    }

    pub fn sys_max_connections_per_node(&mut self, max: u32) -> &mut Self {
        self.working.sys_max_connections_per_node = max;
        self
    }

    pub fn sys_connection_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.working.sys_connection_timeout = timeout;
        self
    }

    pub fn sys_socket_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.working.sys_socket_timeout = timeout;
        self
    }

    pub fn sys_routing_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.working.sys_routing_timeout = timeout;
        self
    }

    pub fn failure_detector(&mut self, config: &FailureDetectorConfig) -> &mut Self {
        self.working.failure_detector = config.clone();
        self
    }

    pub fn timeout_config(&mut self, config: &TimeoutConfig) -> &mut Self {
        self.working.timeout_config = config.clone();
        self
    }

    /// Validate and copy out the configuration. The builder stays usable.
    ///
    /// Bootstrap URLs are parsed here; a URL that does not parse, uses a
    /// scheme other than `tcp`, `http` or `https`, or has no host is
    /// rejected.
    pub fn build(&self) -> ConfigResult<ClientConfig> {
        let uris = self.working.validate()?;
        let mut config = self.working.clone();
        config.bootstrap_uris = uris;
        Ok(config)
    }
}
