use super::{PageSizeRequest, PageSizeStrategy, StrategyType, settle};
use crate::error::RecastResult;
use crate::profile::SystemProfile;

/// Share of total memory that belongs to one core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreBudget {
    pub total_memory: u64,
    pub cores: usize,
}

impl CoreBudget {
    pub fn new(total_memory: u64, cores: usize) -> Self {
        Self {
            total_memory,
            cores,
        }
    }

    /// Read from the process-wide system profile, detected once
    pub fn from_system() -> Self {
        let profile = SystemProfile::get();
        Self::new(profile.total_memory, profile.cpu_count)
    }

    pub fn per_core(&self) -> anyhow::Result<u64> {
        if self.cores == 0 {
            anyhow::bail!("core count is 0");
        }
        let per_core = self.total_memory / self.cores as u64;
        if per_core == 0 {
            anyhow::bail!("total memory of {} bytes is unknown or too small", self.total_memory);
        }
        Ok(per_core)
    }

    /// Records of `average` bytes that fit in one core's share, at least 1
    pub(crate) fn records_per_core(&self, average: u64) -> anyhow::Result<usize> {
        let count = self.per_core()? / average;
        Ok(usize::try_from(count).unwrap_or(usize::MAX).max(1))
    }
}

/// Fits one core's share of memory, never above the nominal page size.
///
/// `min(page_size, max(1, total_memory / cores / average))`
#[derive(Debug, Clone)]
pub struct CpuBasedStrategy {
    budget: CoreBudget,
}

impl CpuBasedStrategy {
    pub fn new() -> Self {
        Self::with_budget(CoreBudget::from_system())
    }

    pub fn with_budget(budget: CoreBudget) -> Self {
        Self { budget }
    }
}

impl Default for CpuBasedStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSizeStrategy for CpuBasedStrategy {
    fn strategy_type(&self) -> StrategyType {
        StrategyType::CpuBased
    }

    fn calculate_page_size(&self, request: &PageSizeRequest<'_>) -> RecastResult<usize> {
        request.require_pool()?;
        let average = request.require_average()?;

        let outcome = self.budget.records_per_core(average).map(|per_core| {
            tracing::debug!(per_core, page_size = request.page_size, "CPU page size inputs");
            per_core.min(request.page_size)
        });

        Ok(settle(self.strategy_type(), outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::KnownSample;

    #[test]
    fn test_capped_at_page_size() {
        // 8 GB over 8 cores fits a million 1 KB records per core
        let strategy = CpuBasedStrategy::with_budget(CoreBudget::new(8_000_000_000, 8));
        let sample = KnownSample { len: 5, average: 1_000 };
        let request = PageSizeRequest::new(500, 4, 10, &sample);
        assert_eq!(strategy.calculate_page_size(&request).unwrap(), 500);
    }

    #[test]
    fn test_per_core_count() {
        let strategy = CpuBasedStrategy::with_budget(CoreBudget::new(40_000, 4));
        let sample = KnownSample { len: 5, average: 1_000 };
        let request = PageSizeRequest::new(500, 4, 10, &sample);
        assert_eq!(strategy.calculate_page_size(&request).unwrap(), 10);
    }

    #[test]
    fn test_huge_records_floor_at_one() {
        let strategy = CpuBasedStrategy::with_budget(CoreBudget::new(4_000, 4));
        let sample = KnownSample { len: 5, average: 1_000_000 };
        let request = PageSizeRequest::new(500, 4, 10, &sample);
        assert_eq!(strategy.calculate_page_size(&request).unwrap(), 1);
    }

    #[test]
    fn test_unknown_memory_degrades() {
        let strategy = CpuBasedStrategy::with_budget(CoreBudget::new(0, 4));
        let sample = KnownSample { len: 5, average: 10 };
        let request = PageSizeRequest::new(500, 4, 10, &sample);
        assert_eq!(strategy.calculate_page_size(&request).unwrap(), 1);
    }

    #[test]
    fn test_rejects_empty_sample() {
        let strategy = CpuBasedStrategy::with_budget(CoreBudget::new(40_000, 4));
        let empty = KnownSample { len: 0, average: 0 };
        let request = PageSizeRequest::new(500, 4, 10, &empty);
        assert!(strategy.calculate_page_size(&request).is_err());
    }

    #[test]
    fn test_system_budget() {
        let budget = CoreBudget::from_system();
        assert!(budget.cores > 0);
    }
}
