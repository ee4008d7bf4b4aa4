use thiserror::Error;

/// Errors produced by version operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("counter overflow for node {node}")]
    CounterOverflow { node: u16 },
}
