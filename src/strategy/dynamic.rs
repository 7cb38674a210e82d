use super::{PageSizeRequest, PageSizeStrategy, StrategyType, settle, to_count};
use crate::error::RecastResult;
use crate::profile::MemoryProbe;
use std::sync::Arc;

/// Splits the memory budget across workers and scales the share by the
/// current memory load factor.
///
/// `max(1, round(budget / pool / average * used / max))`
#[derive(Debug, Clone)]
pub struct DynamicStrategy {
    probe: Arc<dyn MemoryProbe>,
}

impl DynamicStrategy {
    pub fn new(probe: Arc<dyn MemoryProbe>) -> Self {
        Self { probe }
    }

    fn compute(&self, budget: u64, pool_size: usize, average: u64) -> anyhow::Result<usize> {
        let per_worker_budget = budget as f64 / pool_size as f64;
        let per_worker_count = per_worker_budget / average as f64;
        let load_factor = self.probe.snapshot()?.load_factor()?;

        tracing::debug!(
            per_worker_budget,
            per_worker_count,
            load_factor,
            "Dynamic page size inputs"
        );

        to_count((per_worker_count * load_factor).round())
    }
}

impl PageSizeStrategy for DynamicStrategy {
    fn strategy_type(&self) -> StrategyType {
        StrategyType::Dynamic
    }

    fn calculate_page_size(&self, request: &PageSizeRequest<'_>) -> RecastResult<usize> {
        request.require_pool()?;
        let budget = request.require_budget()?;
        let average = request.require_average()?;

        Ok(settle(
            self.strategy_type(),
            self.compute(budget, request.pool_size, average),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::FixedMemoryProbe;
    use crate::strategy::KnownSample;

    fn strategy(max: u64, used: u64, free: u64) -> DynamicStrategy {
        DynamicStrategy::new(Arc::new(FixedMemoryProbe::new(max, used, free)))
    }

    #[test]
    fn test_scales_with_load_factor() {
        let sample = KnownSample { len: 10, average: 1_000 };
        let request = PageSizeRequest::new(100, 4, 10, &sample);

        // 10 MB / 4 workers / 1000 bytes = 2500 records, half loaded
        let half = strategy(1_000, 500, 500);
        assert_eq!(half.calculate_page_size(&request).unwrap(), 1250);

        // fully loaded memory keeps the full share
        let full = strategy(1_000, 1_000, 0);
        assert_eq!(full.calculate_page_size(&request).unwrap(), 2500);
    }

    #[test]
    fn test_never_below_one() {
        let sample = KnownSample { len: 10, average: 1_000 };
        let request = PageSizeRequest::new(100, 4, 10, &sample);
        let idle = strategy(1_000, 0, 1_000);
        assert_eq!(idle.calculate_page_size(&request).unwrap(), 1);
    }

    #[test]
    fn test_rounds_to_nearest() {
        // 1 MB / 3 workers / 1000 bytes = 333.33, times 0.5 = 166.67
        let sample = KnownSample { len: 1, average: 1_000 };
        let request = PageSizeRequest::new(100, 3, 1, &sample);
        assert_eq!(strategy(10, 5, 5).calculate_page_size(&request).unwrap(), 167);
    }

    #[test]
    fn test_validation() {
        let empty = KnownSample { len: 0, average: 0 };
        let sample = KnownSample { len: 2, average: 64 };
        let s = strategy(1_000, 500, 500);

        assert!(s.calculate_page_size(&PageSizeRequest::new(100, 0, 10, &sample)).is_err());
        assert!(s.calculate_page_size(&PageSizeRequest::new(100, 4, 0, &sample)).is_err());
        assert!(s.calculate_page_size(&PageSizeRequest::new(100, 4, 10, &empty)).is_err());
    }

    #[test]
    fn test_probe_failure_degrades() {
        let sample = KnownSample { len: 2, average: 64 };
        let request = PageSizeRequest::new(100, 4, 10, &sample);
        let broken = strategy(0, 0, 0);
        assert_eq!(broken.calculate_page_size(&request).unwrap(), 1);
    }
}
