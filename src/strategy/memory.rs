use super::{PageSizeRequest, PageSizeStrategy, StrategyType, settle};
use crate::error::RecastResult;
use crate::profile::MemoryProbe;
use std::sync::Arc;

/// Sizes batches from the memory budget minus the memory currently free.
///
/// `max(1, (min(max, budget) - free) / average)`
#[derive(Debug, Clone)]
pub struct MemoryBasedStrategy {
    probe: Arc<dyn MemoryProbe>,
}

impl MemoryBasedStrategy {
    pub fn new(probe: Arc<dyn MemoryProbe>) -> Self {
        Self { probe }
    }

    fn compute(&self, budget: u64, average: u64) -> anyhow::Result<usize> {
        let snapshot = self.probe.snapshot()?;
        let usable = snapshot.max.min(budget).saturating_sub(snapshot.free);

        tracing::debug!(
            max = snapshot.max,
            free = snapshot.free,
            usable,
            "Memory page size inputs"
        );

        Ok(usize::try_from(usable / average).unwrap_or(usize::MAX))
    }
}

impl PageSizeStrategy for MemoryBasedStrategy {
    fn strategy_type(&self) -> StrategyType {
        StrategyType::MemoryBased
    }

    fn calculate_page_size(&self, request: &PageSizeRequest<'_>) -> RecastResult<usize> {
        request.require_pool()?;
        let budget = request.require_budget()?;
        let average = request.require_average()?;

        Ok(settle(self.strategy_type(), self.compute(budget, average)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::FixedMemoryProbe;
    use crate::strategy::KnownSample;

    fn strategy(max: u64, used: u64, free: u64) -> MemoryBasedStrategy {
        MemoryBasedStrategy::new(Arc::new(FixedMemoryProbe::new(max, used, free)))
    }

    #[test]
    fn test_budget_minus_free() {
        // min(64 MB, 10 MB) - 2 MB = 8 MB of 1 KB records
        let s = strategy(64_000_000, 62_000_000, 2_000_000);
        let sample = KnownSample { len: 3, average: 1_000 };
        let request = PageSizeRequest::new(100, 4, 10, &sample);
        assert_eq!(s.calculate_page_size(&request).unwrap(), 8_000);
    }

    #[test]
    fn test_may_exceed_page_size() {
        let s = strategy(64_000_000, 64_000_000, 0);
        let sample = KnownSample { len: 3, average: 100 };
        let request = PageSizeRequest::new(10, 4, 1, &sample);
        assert!(s.calculate_page_size(&request).unwrap() > 10);
    }

    #[test]
    fn test_plenty_free_floors_at_one() {
        let s = strategy(64_000_000, 0, 64_000_000);
        let sample = KnownSample { len: 3, average: 100 };
        let request = PageSizeRequest::new(10, 4, 10, &sample);
        assert_eq!(s.calculate_page_size(&request).unwrap(), 1);
    }

    #[test]
    fn test_validation() {
        let s = strategy(64_000_000, 0, 0);
        let sample = KnownSample { len: 3, average: 100 };
        assert!(s.calculate_page_size(&PageSizeRequest::new(10, 4, 0, &sample)).is_err());
        assert!(s.calculate_page_size(&PageSizeRequest::new(10, 0, 10, &sample)).is_err());
    }
}
