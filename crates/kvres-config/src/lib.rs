//! Client configuration for kvres store clients.
//!
//! Configuration values are immutable: fields are private and only readable
//! through getters. Changes go through a builder, which mutates its own
//! working copy and hands out an independent, validated value on every
//! [`build`](ClientConfigBuilder::build). Equality and hashing cover exactly
//! the fields a build copies.
//!
//! # Modules
//!
//! - [`opcode`] -- Store operations that can carry their own timeout
//! - [`timeout`] -- [`TimeoutConfig`] and its builder
//! - [`failure`] -- [`FailureDetectorConfig`] and its builder
//! - [`client`] -- [`ClientConfig`] and its builder
//! - [`file`] -- TOML representation used by [`ClientConfig::load`]

pub mod client;
pub mod error;
pub mod failure;
pub mod file;
pub mod opcode;
pub mod timeout;

pub use client::{ClientConfig, ClientConfigBuilder, RequestFormat, RoutingTier};
pub use error::{ConfigError, ConfigResult};
pub use failure::{FailureDetectorConfig, FailureDetectorConfigBuilder, FailureDetectorKind};
pub use opcode::OpCode;
pub use timeout::{TimeoutConfig, TimeoutConfigBuilder};
