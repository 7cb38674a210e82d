//! Configuration management for recast
//!
//! Typed settings for the transformer, the size estimator and logging. The
//! values are loaded through [`RecastConfig`], which layers the embedded
//! defaults, user and repository files, an explicit file and environment
//! variables.

use crate::error::{RecastError, RecastResult};
use crate::estimate::{DEFAULT_MAX_CLASS_DEPTH, DEFAULT_MAX_DEPTH, SizeEstimator};
use crate::strategy::StrategyType;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod core;

pub use self::core::RecastConfig;


/// Complete recast configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub converter: ConverterConfig,
    pub estimator: EstimatorConfig,
    pub logging: LoggingConfig,
}

/// Transformer settings. Immutable once a transformer is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Nominal records per batch, before the strategy adjusts it
    pub page_size: usize,

    /// Worker threads owned by a transformer
    pub pool_size: usize,

    /// Source count at which the parallel path activates on its own
    pub threshold: usize,

    /// Always take the parallel path
    pub parallel: bool,

    /// Memory budget for memory-aware strategies (MB)
    pub max_memory_mb: u64,

    /// Batch size strategy
    pub strategy: StrategyType,

    /// Records measured for the average size (0 = all)
    pub sample_limit: usize,

    /// Seconds shutdown waits for running batches before cancelling them
    pub shutdown_timeout_secs: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            page_size: 1000,
            pool_size: 10,
            threshold: 1000,
            parallel: false,
            max_memory_mb: 10,
            strategy: StrategyType::Default,
            sample_limit: 0,
            shutdown_timeout_secs: 10,
        }
    }
}

impl ConverterConfig {
    /// Reject settings no transformer can run with
    pub fn validate(&self) -> RecastResult<()> {
        let checks = [
            (self.page_size == 0, "page size must be greater than 0"),
            (self.pool_size == 0, "pool size must be greater than 0"),
            (self.threshold == 0, "parallel threshold must be greater than 0"),
            (self.max_memory_mb == 0, "memory budget must be greater than 0"),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(RecastError::invalid_argument(*message)),
            None => Ok(()),
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Size estimator limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Nesting depth after which values count as a single reference
    pub max_depth: usize,

    /// Class levels (own type plus parents) whose fields are counted
    pub max_class_depth: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_class_depth: DEFAULT_MAX_CLASS_DEPTH,
        }
    }
}

impl EstimatorConfig {
    pub fn estimator(&self) -> SizeEstimator {
        SizeEstimator::new(self.max_depth, self.max_class_depth)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log filter when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
