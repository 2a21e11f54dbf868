//! # World Error Types
//!
//! Errors raised by the world layer. Store, selector and voxel errors live in
//! their own crates and convert into these where they cross a boundary.

use std::fmt;
use std::path::PathBuf;

use bloxim_core::SelectorError;
use bloxim_voxel::VoxelError;
use thiserror::Error;

use crate::events::{EventCategory, SubscriptionId};

/// Errors raised while loading or validating a world config.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML text did not parse.
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A zone or filter selector did not parse.
    #[error("invalid selector: {0}")]
    Selector(#[from] SelectorError),

    /// A material table could not be registered.
    #[error("material table: {0}")]
    Voxel(#[from] VoxelError),
}

/// Failure reported by an event handler.
///
/// Dispatch never stops on one; it is logged and surfaced as a [`HostError`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    /// Creates an error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self(message.to_owned())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Failures of the asynchronous key-value store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The request queue is full; retry on a later tick.
    #[error("storage queue full")]
    Busy,

    /// The store side of the channel went away.
    #[error("storage backend disconnected")]
    Disconnected,

    /// The value could not be converted to JSON.
    #[error("value not serializable: {0}")]
    Serialize(String),

    /// The backend rejected the operation.
    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// A handler fault caught at the dispatch boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostError {
    /// Tick during which the handler ran.
    pub tick: u64,
    /// Subscription whose handler failed.
    pub subscription: SubscriptionId,
    /// Category of the event being delivered.
    pub category: EventCategory,
    /// The handler's message.
    pub message: String,
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tick {}: {} failed on {:?} event: {}",
            self.tick, self.subscription, self.category, self.message
        )
    }
}

impl std::error::Error for HostError {}
