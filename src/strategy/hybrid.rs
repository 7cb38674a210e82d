use super::{CoreBudget, PageSizeRequest, PageSizeStrategy, StrategyType, settle};
use crate::error::RecastResult;
use crate::profile::MemoryProbe;
use std::sync::Arc;

/// The smaller of the per-core count and the memory headroom count.
///
/// Each count is floored at 1 and the result never exceeds the nominal page
/// size. An empty sample yields 1.
#[derive(Debug, Clone)]
pub struct HybridStrategy {
    budget: CoreBudget,
    probe: Arc<dyn MemoryProbe>,
}

impl HybridStrategy {
    pub fn new(probe: Arc<dyn MemoryProbe>) -> Self {
        Self::with_budget(CoreBudget::from_system(), probe)
    }

    pub fn with_budget(budget: CoreBudget, probe: Arc<dyn MemoryProbe>) -> Self {
        Self { budget, probe }
    }

    fn compute(&self, page_size: usize, average: u64) -> anyhow::Result<usize> {
        let cpu_count = self.budget.records_per_core(average)?;

        let headroom = self.probe.snapshot()?.headroom();
        let memory_count = usize::try_from(headroom / average)
            .unwrap_or(usize::MAX)
            .max(1);

        tracing::debug!(cpu_count, memory_count, page_size, "Hybrid page size inputs");

        Ok(cpu_count.min(memory_count).min(page_size))
    }
}

impl PageSizeStrategy for HybridStrategy {
    fn strategy_type(&self) -> StrategyType {
        StrategyType::Hybrid
    }

    fn calculate_page_size(&self, request: &PageSizeRequest<'_>) -> RecastResult<usize> {
        request.require_pool()?;
        if request.sample.is_empty() {
            return Ok(1);
        }
        let average = request.require_average()?;

        Ok(settle(
            self.strategy_type(),
            self.compute(request.page_size, average),
        ))
    }
}
