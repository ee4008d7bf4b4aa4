use std::fmt;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::opcode::OpCode;

/// Per-operation timeouts for a store client.
///
/// Every [`OpCode`] always has an effective timeout, so two configurations
/// compare equal exactly when they time out every operation the same way and
/// agree on whether partial get-all results are allowed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TimeoutConfig {
    timeouts: [Duration; OpCode::COUNT],
    partial_get_all_allowed: bool,
}

impl TimeoutConfig {
    /// Default timeout applied to every operation.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

    /// Use `global` for every operation.
    pub fn new(global: Duration, partial_get_all_allowed: bool) -> Self {
        Self {
            timeouts: [global; OpCode::COUNT],
            partial_get_all_allowed,
        }
    }

    /// Separate timeouts for the common operations; everything else uses
    /// `get`.
    pub fn per_operation(
        get: Duration,
        put: Duration,
        delete: Duration,
        get_all: Duration,
        get_version: Duration,
        partial_get_all_allowed: bool,
    ) -> Self {
        let mut config = Self::new(get, partial_get_all_allowed);
        config.timeouts[OpCode::Put.index()] = put;
        config.timeouts[OpCode::Delete.index()] = delete;
        config.timeouts[OpCode::GetAll.index()] = get_all;
        config.timeouts[OpCode::GetVersion.index()] = get_version;
        config
    }

    /// Start a builder with `global` as every operation's timeout.
    pub fn builder(global: Duration) -> TimeoutConfigBuilder {
        TimeoutConfigBuilder {
            working: Self::new(global, false),
        }
    }

    /// Start a builder from a copy of this configuration.
    pub fn to_builder(&self) -> TimeoutConfigBuilder {
        TimeoutConfigBuilder {
            working: self.clone(),
        }
    }

    pub fn timeout_for(&self, op: OpCode) -> Duration {
        self.timeouts[op.index()]
    }

    pub fn is_partial_get_all_allowed(&self) -> bool {
        self.partial_get_all_allowed
    }

    /// Iterate over every operation and its effective timeout.
    pub fn iter(&self) -> impl Iterator<Item = (OpCode, Duration)> + '_ {
        OpCode::ALL.iter().map(|op| (*op, self.timeout_for(*op)))
    }

    pub(crate) fn validate(&self) -> ConfigResult<()> {
        if let Some((op, _)) = self.iter().find(|(_, d)| d.is_zero()) {
            return Err(ConfigError::invalid(
                "timeout_config",
                format!("timeout for {op} must be greater than zero"),
            ));
        }
        Ok(())
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT, false)
    }
}

impl fmt::Debug for TimeoutConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("TimeoutConfig");
        s.field("partial_get_all_allowed", &self.partial_get_all_allowed);
        for (op, timeout) in self.iter() {
            s.field(op.name(), &timeout);
        }
        s.finish()
    }
}

/// Accumulates timeout changes and produces independent [`TimeoutConfig`]s.
#[derive(Clone, Debug)]
pub struct TimeoutConfigBuilder {
    working: TimeoutConfig,
}

impl TimeoutConfigBuilder {
    pub fn operation_timeout(&mut self, op: OpCode, timeout: Duration) -> &mut Self {
        self.working.timeouts[op.index()] = timeout;
        self
    }

    pub fn partial_get_all_allowed(&mut self, allowed: bool) -> &mut Self {
        self.working.partial_get_all_allowed = allowed;
        self
    }

    /// Validate and copy out the configuration. The builder stays usable.
    pub fn build(&self) -> ConfigResult<TimeoutConfig> {
        self.working.validate()?;
        Ok(self.working.clone())
    }

    pub(crate) fn into_unvalidated(self) -> TimeoutConfig {
        self.working
    }
}
