//! Batch size strategies for the parallel path.
//!
//! A strategy turns a nominal page size, the worker pool size, a memory
//! budget and a sample of the source records into the number of records per
//! parallel batch. Invalid input is rejected with
//! [`RecastError::InvalidArgument`]; anything that goes wrong while computing
//! (a failed memory reading, a non-finite intermediate) is logged and the
//! strategy falls back to a batch size of 1.

mod cpu;
mod default;
mod dynamic;
mod hybrid;
mod memory;
mod registry;

pub use cpu::{CoreBudget, CpuBasedStrategy};
pub use default::DefaultStrategy;
pub use dynamic::DynamicStrategy;
pub use hybrid::HybridStrategy;
pub use memory::MemoryBasedStrategy;
pub use registry::StrategyRegistry;

use crate::error::{RecastError, RecastResult};
use crate::estimate::{EstimateSize, SizeEstimator};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Bytes in one megabyte of memory budget
pub const BYTES_PER_MB: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StrategyType {
    #[default]
    Default,
    Dynamic,
    CpuBased,
    MemoryBased,
    Hybrid,
}

impl StrategyType {
    pub const ALL: [StrategyType; 5] = [
        StrategyType::Default,
        StrategyType::Dynamic,
        StrategyType::CpuBased,
        StrategyType::MemoryBased,
        StrategyType::Hybrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyType::Default => "default",
            StrategyType::Dynamic => "dynamic",
            StrategyType::CpuBased => "cpu_based",
            StrategyType::MemoryBased => "memory_based",
            StrategyType::Hybrid => "hybrid",
        }
    }

    /// Parse a selector, falling back to `Default` for unknown names
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            tracing::warn!(
                selector = name,
                "Unknown page size strategy, using default"
            );
            StrategyType::Default
        })
    }
}

impl FromStr for StrategyType {
    type Err = RecastError;

    /// Case-insensitive; `_` and `-` are ignored (`cpu_based`, `CPU-BASED`, `CpuBased`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.trim() {
            "default" => Ok(StrategyType::Default),
            "dynamic" => Ok(StrategyType::Dynamic),
            "cpubased" => Ok(StrategyType::CpuBased),
            "memorybased" => Ok(StrategyType::MemoryBased),
            "hybrid" => Ok(StrategyType::Hybrid),
            _ => Err(RecastError::invalid_argument(format!(
                "unknown page size strategy '{}'",
                s
            ))),
        }
    }
}

impl From<String> for StrategyType {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<StrategyType> for String {
    fn from(kind: StrategyType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records a strategy measures to find the average object size.
pub trait SizeSample {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mean estimated size in bytes, `None` when the sample is empty
    fn average_size(&self) -> Option<u64>;
}

/// A sample drawn from the source slice of a conversion.
///
/// The average is computed on first use and kept. With a non-zero `limit`
/// only that many evenly spaced records are measured.
pub struct SourceSample<'a, S> {
    sources: &'a [S],
    estimator: SizeEstimator,
    limit: usize,
    average: OnceLock<Option<u64>>,
}

impl<'a, S: EstimateSize> SourceSample<'a, S> {
    pub fn new(sources: &'a [S], estimator: SizeEstimator) -> Self {
        Self {
            sources,
            estimator,
            limit: 0,
            average: OnceLock::new(),
        }
    }

    /// Measure at most `limit` records (0 measures all of them)
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

impl<S: EstimateSize> SizeSample for SourceSample<'_, S> {
    fn len(&self) -> usize {
        self.sources.len()
    }

    fn average_size(&self) -> Option<u64> {
        *self.average.get_or_init(|| {
            let len = self.sources.len();
            if self.limit == 0 || self.limit >= len {
                return self.estimator.average(self.sources);
            }

            let limit = self.limit;
            self.estimator
                .average((0..limit).map(|i| &self.sources[i * len / limit]))
        })
    }
}

/// A sample whose size statistics are already known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownSample {
    pub len: usize,
    pub average: u64,
}

impl SizeSample for KnownSample {
    fn len(&self) -> usize {
        self.len
    }

    fn average_size(&self) -> Option<u64> {
        (self.len > 0).then_some(self.average)
    }
}

/// Inputs to a batch size calculation.
#[derive(Clone, Copy)]
pub struct PageSizeRequest<'a> {
    pub page_size: usize,
    pub pool_size: usize,
    pub memory_budget_mb: u64,
    pub sample: &'a dyn SizeSample,
}

impl<'a> PageSizeRequest<'a> {
    pub fn new(
        page_size: usize,
        pool_size: usize,
        memory_budget_mb: u64,
        sample: &'a dyn SizeSample,
    ) -> Self {
        Self {
            page_size,
            pool_size,
            memory_budget_mb,
            sample,
        }
    }

    pub(crate) fn require_pool(&self) -> RecastResult<()> {
        if self.pool_size == 0 {
            return Err(RecastError::invalid_argument(
                "pool size must be greater than 0",
            ));
        }
        Ok(())
    }

    pub(crate) fn require_budget(&self) -> RecastResult<u64> {
        if self.memory_budget_mb == 0 {
            return Err(RecastError::invalid_argument(
                "memory budget must be greater than 0",
            ));
        }
        Ok(self.memory_budget_mb.saturating_mul(BYTES_PER_MB))
    }

    pub(crate) fn require_average(&self) -> RecastResult<u64> {
        match self.sample.average_size() {
            None => Err(RecastError::invalid_argument(
                "sample must contain at least one record",
            )),
            Some(0) => Err(RecastError::invalid_argument(
                "average object size must be greater than 0",
            )),
            Some(average) => Ok(average),
        }
    }
}

impl fmt::Debug for PageSizeRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageSizeRequest")
            .field("page_size", &self.page_size)
            .field("pool_size", &self.pool_size)
            .field("memory_budget_mb", &self.memory_budget_mb)
            .field("sample_len", &self.sample.len())
            .finish()
    }
}

/// A batch size policy.
pub trait PageSizeStrategy: Send + Sync + fmt::Debug {
    fn strategy_type(&self) -> StrategyType;

    /// Records per batch, always at least 1 on success
    fn calculate_page_size(&self, request: &PageSizeRequest<'_>) -> RecastResult<usize>;
}

/// Settle an internal computation: log failures and fall back to 1
pub(crate) fn settle(kind: StrategyType, outcome: anyhow::Result<usize>) -> usize {
    match outcome {
        Ok(size) => size.max(1),
        Err(e) => {
            tracing::error!(
                strategy = %kind,
                "Failed to calculate page size, falling back to 1: {:#}",
                e
            );
            1
        }
    }
}

/// Convert a finite, non-negative float count to `usize`
pub(crate) fn to_count(value: f64) -> anyhow::Result<usize> {
    if !value.is_finite() || value < 0.0 {
        anyhow::bail!("computed record count {} is not a usable number", value);
    }
    Ok(value.min(usize::MAX as f64) as usize)
}
