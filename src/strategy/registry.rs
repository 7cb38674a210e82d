use super::{
    CoreBudget, CpuBasedStrategy, DefaultStrategy, DynamicStrategy, HybridStrategy,
    MemoryBasedStrategy, PageSizeStrategy, StrategyType,
};
use crate::profile::{MemoryProbe, SystemMemoryProbe};
use std::collections::HashMap;
use std::sync::Arc;

/// One strategy instance per [`StrategyType`].
///
/// Built once and only read afterwards, so lookups from many threads need no
/// locking.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<StrategyType, Arc<dyn PageSizeStrategy>>,
    fallback: Arc<dyn PageSizeStrategy>,
}

impl StrategyRegistry {
    pub fn new(probe: Arc<dyn MemoryProbe>) -> Self {
        Self::with_core_budget(probe, CoreBudget::from_system())
    }

    /// Registry whose CPU-aware strategies use a fixed core budget
    pub fn with_core_budget(probe: Arc<dyn MemoryProbe>, budget: CoreBudget) -> Self {
        let fallback: Arc<dyn PageSizeStrategy> = Arc::new(DefaultStrategy);
        let strategies: Vec<Arc<dyn PageSizeStrategy>> = vec![
            fallback.clone(),
            Arc::new(DynamicStrategy::new(probe.clone())),
            Arc::new(CpuBasedStrategy::with_budget(budget)),
            Arc::new(MemoryBasedStrategy::new(probe.clone())),
            Arc::new(HybridStrategy::with_budget(budget, probe)),
        ];

        Self {
            strategies: strategies
                .into_iter()
                .map(|strategy| (strategy.strategy_type(), strategy))
                .collect(),
            fallback,
        }
    }

    pub fn get(&self, kind: StrategyType) -> Arc<dyn PageSizeStrategy> {
        self.strategies
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    /// Look up by selector name; unknown names get the default strategy
    pub fn resolve(&self, name: &str) -> Arc<dyn PageSizeStrategy> {
        self.get(StrategyType::from_name(name))
    }

    /// All strategies in [`StrategyType::ALL`] order
    pub fn iter(&self) -> impl Iterator<Item = Arc<dyn PageSizeStrategy>> + '_ {
        StrategyType::ALL.into_iter().map(|kind| self.get(kind))
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new(Arc::new(SystemMemoryProbe::new()))
    }
}
