//! List conversion with automatic parallelism.
//!
//! A [`Transformer`] converts a slice of source records into freshly built
//! targets by copying matching properties. Small inputs are converted on the
//! calling thread. Inputs at or above the configured threshold (or any input
//! when `parallel` is set) are cut into contiguous batches whose size comes
//! from the configured [`PageSizeStrategy`]; the batches run on the
//! transformer's worker pool and are reassembled in source order.
//!
//! Elements whose properties cannot be copied are logged and dropped. A batch
//! that fails as a whole (a panicking factory, a forced shutdown) fails the
//! entire call: the first failure stops batches that have not started yet and
//! the failure of the lowest-indexed batch is reported.

mod report;

pub use report::{ConversionReport, ConversionSummary, ElementFailure};

use crate::config::ConverterConfig;
use crate::copy::{Properties, copy_properties};
use crate::error::{RecastError, RecastResult};
use crate::estimate::{EstimateSize, SizeEstimator};
use crate::parallel::{ExecutionPath, ShutdownOutcome, WorkerPool};
use crate::profile::{MemoryProbe, SystemMemoryProbe};
use crate::strategy::{
    CoreBudget, PageSizeRequest, PageSizeStrategy, SourceSample, StrategyRegistry, StrategyType,
};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Post-copy hook, run on whichever thread converted the element
pub type Callback<'a, S, T> = dyn Fn(&S, &mut T) -> anyhow::Result<()> + Sync + 'a;

type Factory<'a, T> = dyn Fn() -> T + Sync + 'a;

/// Converts record lists, owning a worker pool for the parallel path.
///
/// ```rust
/// use recast::config::ConverterConfig;
/// use recast::record;
/// use recast::transform::Transformer;
///
/// #[derive(Debug, Clone, Default)]
/// pub struct User { pub name: String, pub age: u32 }
///
/// #[derive(Debug, Clone, Default)]
/// pub struct UserDto { pub id: u64, pub name: String, pub age: u32 }
///
/// record!(User { fields: [name, age] });
/// record!(UserDto { fields: [id, name, age] });
///
/// let transformer = Transformer::new(ConverterConfig::default()).unwrap();
/// let users = vec![User { name: "A".into(), age: 30 }];
/// let dtos = transformer.convert_all(&users, UserDto::default).unwrap();
/// assert_eq!(dtos[0].name, "A");
/// assert_eq!(dtos[0].id, 0);
/// ```
#[derive(Debug)]
pub struct Transformer {
    config: ConverterConfig,
    estimator: SizeEstimator,
    strategy: Arc<dyn PageSizeStrategy>,
    pool: WorkerPool,
}

/// Builder for a [`Transformer`] with non-default collaborators
pub struct TransformerBuilder {
    config: ConverterConfig,
    estimator: SizeEstimator,
    probe: Option<Arc<dyn MemoryProbe>>,
    core_budget: Option<CoreBudget>,
}

impl TransformerBuilder {
    pub fn estimator(mut self, estimator: SizeEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// Memory readings used by the memory-aware strategies
    pub fn probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Memory per core used by the CPU-aware strategies
    pub fn core_budget(mut self, budget: CoreBudget) -> Self {
        self.core_budget = Some(budget);
        self
    }

    pub fn build(self) -> RecastResult<Transformer> {
        self.config.validate()?;

        let probe: Arc<dyn MemoryProbe> = match self.probe {
            Some(probe) => probe,
            None => Arc::new(SystemMemoryProbe::new()),
        };
        let budget = self.core_budget.unwrap_or_else(CoreBudget::from_system);
        let registry = StrategyRegistry::with_core_budget(probe, budget);
        let pool = WorkerPool::new(self.config.pool_size, self.config.shutdown_timeout())?;

        Ok(Transformer {
            strategy: registry.get(self.config.strategy),
            estimator: self.estimator,
            config: self.config,
            pool,
        })
    }
}

impl Transformer {
    pub fn new(config: ConverterConfig) -> RecastResult<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: ConverterConfig) -> TransformerBuilder {
        TransformerBuilder {
            config,
            estimator: SizeEstimator::default(),
            probe: None,
            core_budget: None,
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn strategy_type(&self) -> StrategyType {
        self.strategy.strategy_type()
    }

    pub fn is_shutdown(&self) -> bool {
        self.pool.is_shutdown()
    }

    /// Path a conversion of `len` records would take
    pub fn path_for(&self, len: usize) -> ExecutionPath {
        ExecutionPath::select(self.config.parallel, len, self.config.threshold)
    }

    /// Batch size the configured strategy picks for `sources`
    pub fn batch_size_for<S: EstimateSize>(&self, sources: &[S]) -> RecastResult<usize> {
        let sample = SourceSample::new(sources, self.estimator).with_limit(self.config.sample_limit);
        let request = PageSizeRequest::new(
            self.config.page_size,
            self.config.pool_size,
            self.config.max_memory_mb,
            &sample,
        );
        self.strategy.calculate_page_size(&request)
    }

    /// Convert every source into a target built by `factory`.
    ///
    /// Elements that fail to copy are dropped, so the result may be shorter
    /// than `sources`. Order is preserved.
    pub fn convert_all<S, T, F>(&self, sources: &[S], factory: F) -> RecastResult<Vec<T>>
    where
        S: Properties + EstimateSize + Sync,
        T: Properties + Send,
        F: Fn() -> T + Sync,
    {
        self.run(sources, &factory, None)
            .map(ConversionReport::into_targets)
    }

    /// Like [`convert_all`](Self::convert_all), running `callback` after
    /// each successful copy. Callback errors and panics are logged and the
    /// element is kept.
    pub fn convert_all_with<S, T, F, C>(
        &self,
        sources: &[S],
        factory: F,
        callback: C,
    ) -> RecastResult<Vec<T>>
    where
        S: Properties + EstimateSize + Sync,
        T: Properties + Send,
        F: Fn() -> T + Sync,
        C: Fn(&S, &mut T) -> anyhow::Result<()> + Sync,
    {
        self.run(sources, &factory, Some(&callback))
            .map(ConversionReport::into_targets)
    }

    /// Convert and report which elements were dropped and why
    pub fn convert_all_detailed<S, T, F>(
        &self,
        sources: &[S],
        factory: F,
        callback: Option<&Callback<'_, S, T>>,
    ) -> RecastResult<ConversionReport<T>>
    where
        S: Properties + EstimateSize + Sync,
        T: Properties + Send,
        F: Fn() -> T + Sync,
    {
        self.run(sources, &factory, callback)
    }

    /// Release the worker pool. Later conversions fail with
    /// [`RecastError::PoolShutdown`].
    pub fn shutdown(&self) -> ShutdownOutcome {
        let outcome = self.pool.shutdown();
        if outcome != ShutdownOutcome::AlreadyShutdown {
            tracing::debug!(%outcome, "Transformer shut down");
        }
        outcome
    }

    fn run<S, T>(
        &self,
        sources: &[S],
        factory: &Factory<'_, T>,
        callback: Option<&Callback<'_, S, T>>,
    ) -> RecastResult<ConversionReport<T>>
    where
        S: Properties + EstimateSize + Sync,
        T: Properties + Send,
    {
        if self.pool.is_shutdown() {
            return Err(RecastError::PoolShutdown);
        }

        let path = self.path_for(sources.len());
        if sources.is_empty() {
            return Ok(ConversionReport::empty(path));
        }

        match path {
            ExecutionPath::Sequential => self.run_sequential(sources, factory, callback),
            ExecutionPath::Parallel => self.run_parallel(sources, factory, callback),
        }
    }

    fn run_sequential<S, T>(
        &self,
        sources: &[S],
        factory: &Factory<'_, T>,
        callback: Option<&Callback<'_, S, T>>,
    ) -> RecastResult<ConversionReport<T>>
    where
        S: Properties,
        T: Properties,
    {
        let batch = Batch {
            index: 0,
            offset: 0,
            sources,
        };
        let output = batch.run_guarded(factory, callback, &self.pool)?;

        Ok(ConversionReport {
            targets: output.targets,
            failures: output.failures,
            path: ExecutionPath::Sequential,
            batch_size: sources.len(),
            batches: 1,
        })
    }

    fn run_parallel<S, T>(
        &self,
        sources: &[S],
        factory: &Factory<'_, T>,
        callback: Option<&Callback<'_, S, T>>,
    ) -> RecastResult<ConversionReport<T>>
    where
        S: Properties + EstimateSize + Sync,
        T: Properties + Send,
    {
        let batch_size = self.batch_size_for(sources)?;

        tracing::info!(
            strategy = %self.strategy.strategy_type(),
            threshold = self.config.threshold,
            pool_size = self.config.pool_size,
            page_size = self.config.page_size,
            batch_size,
            sources = sources.len(),
            "Parallel conversion enabled"
        );

        let batches: Vec<Batch<'_, S>> = sources
            .chunks(batch_size)
            .enumerate()
            .map(|(index, sources)| Batch {
                index,
                offset: index * batch_size,
                sources,
            })
            .collect();
        let batch_count = batches.len();
        let abort = AtomicBool::new(false);

        let outcomes: Vec<BatchOutcome<T>> = self.pool.execute(|| {
            batches
                .par_iter()
                .map(|batch| {
                    if abort.load(Ordering::Acquire) {
                        return BatchOutcome::Skipped;
                    }
                    match batch.run_guarded(factory, callback, &self.pool) {
                        Ok(output) => BatchOutcome::Done(output),
                        Err(e) => {
                            abort.store(true, Ordering::Release);
                            BatchOutcome::Failed(e)
                        }
                    }
                })
                .collect()
        })?;

        let mut report = ConversionReport {
            targets: Vec::with_capacity(sources.len()),
            failures: Vec::new(),
            path: ExecutionPath::Parallel,
            batch_size,
            batches: batch_count,
        };

        let mut skipped = None;
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                BatchOutcome::Done(output) => {
                    report.targets.extend(output.targets);
                    report.failures.extend(output.failures);
                }
                BatchOutcome::Failed(e) => {
                    tracing::error!(batch = index, "Parallel conversion failed: {}", e);
                    return Err(e);
                }
                BatchOutcome::Skipped => {
                    skipped.get_or_insert(index);
                }
            }
        }

        if let Some(index) = skipped {
            return Err(RecastError::batch_failed(index, "batch was skipped"));
        }

        Ok(report)
    }
}

impl Drop for Transformer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A contiguous run of sources converted by one worker
struct Batch<'a, S> {
    index: usize,
    /// Position of the first source in the whole input
    offset: usize,
    sources: &'a [S],
}

struct BatchOutput<T> {
    targets: Vec<T>,
    failures: Vec<ElementFailure>,
}

enum BatchOutcome<T> {
    Done(BatchOutput<T>),
    Failed(RecastError),
    Skipped,
}

impl<S: Properties> Batch<'_, S> {
    /// Convert the batch; a panic fails the batch instead of unwinding
    fn run_guarded<T: Properties>(
        &self,
        factory: &Factory<'_, T>,
        callback: Option<&Callback<'_, S, T>>,
        pool: &WorkerPool,
    ) -> RecastResult<BatchOutput<T>> {
        tracing::debug!(
            batch = self.index,
            offset = self.offset,
            len = self.sources.len(),
            "Converting batch"
        );

        catch_unwind(AssertUnwindSafe(|| self.run(factory, callback, pool))).unwrap_or_else(
            |payload| {
                Err(RecastError::batch_failed(
                    self.index,
                    format!("panicked: {}", panic_message(payload.as_ref())),
                ))
            },
        )
    }

    fn run<T: Properties>(
        &self,
        factory: &Factory<'_, T>,
        callback: Option<&Callback<'_, S, T>>,
        pool: &WorkerPool,
    ) -> RecastResult<BatchOutput<T>> {
        let mut output = BatchOutput {
            targets: Vec::with_capacity(self.sources.len()),
            failures: Vec::new(),
        };

        for (position, source) in self.sources.iter().enumerate() {
            if pool.is_cancelled() {
                return Err(RecastError::Cancelled);
            }

            let index = self.offset + position;
            let mut target = factory();
            if let Err(error) = copy_properties(source, &mut target) {
                tracing::warn!(index, %error, "Dropping element that failed to convert");
                output.failures.push(ElementFailure { index, error });
                continue;
            }

            if let Some(callback) = callback {
                run_callback(callback, source, &mut target, index);
            }
            output.targets.push(target);
        }

        Ok(output)
    }
}

fn run_callback<S, T>(callback: &Callback<'_, S, T>, source: &S, target: &mut T, index: usize) {
    match catch_unwind(AssertUnwindSafe(|| callback(source, target))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(index, "Conversion callback failed: {:#}", e),
        Err(payload) => tracing::error!(
            index,
            "Conversion callback panicked: {}",
            panic_message(payload.as_ref())
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copy::PropertyDescriptor;
    use crate::profile::FixedMemoryProbe;
    use crate::record;
    use std::sync::Barrier;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Item {
        id: u64,
        label: String,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct ItemView {
        id: u64,
        label: String,
        seen: bool,
    }

    record!(Item { fields: [id, label] });
    record!(ItemView { fields: [id, label, seen] });

    lazy_static::lazy_static! {
        static ref FRAGILE_GATE: Barrier = Barrier::new(2);
    }

    /// Records 2 and 7 panic on read, once both have been reached
    #[derive(Debug, Clone)]
    struct Fragile {
        id: u64,
    }

    impl Properties for Fragile {
        fn properties() -> Vec<PropertyDescriptor<Self>> {
            vec![PropertyDescriptor::getter("id", |f: &Fragile| {
                if f.id == 2 || f.id == 7 {
                    FRAGILE_GATE.wait();
                    panic!("fragile record {}", f.id);
                }
                Ok(f.id)
            })]
        }
    }

    impl EstimateSize for Fragile {
        fn estimate_size(&self, estimator: &SizeEstimator, _depth: usize) -> u64 {
            estimator.scalar(8)
        }
    }

    fn items(n: u64) -> Vec<Item> {
        (0..n)
            .map(|id| Item {
                id,
                label: format!("item-{}", id),
            })
            .collect()
    }

    fn transformer(config: ConverterConfig) -> Transformer {
        Transformer::builder(config)
            .probe(Arc::new(FixedMemoryProbe::new(1_000_000, 500_000, 500_000)))
            .core_budget(CoreBudget::new(8_000_000, 8))
            .build()
            .unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = ConverterConfig {
            pool_size: 0,
            ..ConverterConfig::default()
        };
        assert!(matches!(
            Transformer::new(config),
            Err(RecastError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_sequential_report() {
        let t = transformer(ConverterConfig::default());
        let report = t
            .convert_all_detailed(&items(3), ItemView::default, None)
            .unwrap();
        assert_eq!(report.path, ExecutionPath::Sequential);
        assert_eq!(report.batches, 1);
        assert_eq!(report.batch_size, 3);
        assert_eq!(report.converted(), 3);
        assert!(report.is_complete());
    }

    #[test]
    fn test_parallel_report() {
        let t = transformer(ConverterConfig {
            threshold: 10,
            page_size: 4,
            pool_size: 3,
            ..ConverterConfig::default()
        });
        let report = t
            .convert_all_detailed(&items(10), ItemView::default, None)
            .unwrap();
        assert_eq!(report.path, ExecutionPath::Parallel);
        assert_eq!(report.batch_size, 4);
        assert_eq!(report.batches, 3);
        let ids: Vec<u64> = report.targets.iter().map(|view| view.id).collect();
        assert_eq!(ids, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_input_on_parallel_path() {
        let t = transformer(ConverterConfig {
            parallel: true,
            strategy: StrategyType::Dynamic,
            ..ConverterConfig::default()
        });
        let report = t
            .convert_all_detailed(&Vec::<Item>::new(), ItemView::default, None)
            .unwrap();
        assert_eq!(report.batches, 0);
        assert!(report.targets.is_empty());
    }

    #[test]
    fn test_callback_runs_per_element() {
        let t = transformer(ConverterConfig {
            parallel: true,
            page_size: 2,
            pool_size: 2,
            ..ConverterConfig::default()
        });
        let views = t
            .convert_all_with(&items(5), ItemView::default, |item: &Item, view: &mut ItemView| {
                view.seen = item.id % 2 == 0;
                Ok(())
            })
            .unwrap();
        let seen: Vec<bool> = views.iter().map(|view| view.seen).collect();
        assert_eq!(seen, vec![true, false, true, false, true]);
    }

    #[test]
    fn test_callback_failures_are_swallowed() {
        let t = transformer(ConverterConfig::default());
        let views = t
            .convert_all_with(&items(4), ItemView::default, |item: &Item, _: &mut ItemView| {
                match item.id {
                    1 => anyhow::bail!("rejected"),
                    2 => panic!("callback exploded"),
                    _ => Ok(()),
                }
            })
            .unwrap();
        assert_eq!(views.len(), 4);
    }

    #[test]
    fn test_factory_panic_fails_the_call() {
        for parallel in [false, true] {
            let t = transformer(ConverterConfig {
                parallel,
                page_size: 2,
                pool_size: 2,
                ..ConverterConfig::default()
            });
            let calls = AtomicUsize::new(0);
            let result = t.convert_all(&items(6), || {
                if calls.fetch_add(1, Ordering::SeqCst) == 3 {
                    panic!("factory exploded");
                }
                ItemView::default()
            });
            match result {
                Err(RecastError::BatchFailed { reason, .. }) => {
                    assert!(reason.contains("factory exploded"));
                }
                other => panic!("expected a batch failure, got {:?}", other.map(|v| v.len())),
            }
        }
    }

    #[test]
    fn test_first_failure_skips_unstarted_batches() {
        let t = transformer(ConverterConfig {
            parallel: true,
            page_size: 1,
            pool_size: 2,
            ..ConverterConfig::default()
        });
        let calls = AtomicUsize::new(0);
        let result = t.convert_all(&items(2000), || {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first target refused");
            }
            std::thread::sleep(Duration::from_millis(1));
            ItemView::default()
        });

        assert!(matches!(result, Err(RecastError::BatchFailed { .. })));
        assert!(calls.load(Ordering::SeqCst) < 2000);
    }

    #[test]
    fn test_lowest_failed_batch_is_reported() {
        let t = transformer(ConverterConfig {
            parallel: true,
            page_size: 5,
            pool_size: 2,
            ..ConverterConfig::default()
        });
        let sources: Vec<Fragile> = (0..10).map(|id| Fragile { id }).collect();

        match t.convert_all(&sources, ItemView::default) {
            Err(RecastError::BatchFailed { batch, reason }) => {
                assert_eq!(batch, 0);
                assert!(reason.contains("fragile record 2"));
            }
            other => panic!("expected a batch failure, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_forced_shutdown_cancels_conversion() {
        let t = Arc::new(transformer(ConverterConfig {
            parallel: true,
            page_size: 10,
            pool_size: 2,
            shutdown_timeout_secs: 0,
            ..ConverterConfig::default()
        }));
        let started = Arc::new(AtomicBool::new(false));

        let job = {
            let t = t.clone();
            let started = started.clone();
            std::thread::spawn(move || {
                t.convert_all(&items(2000), || {
                    started.store(true, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(2));
                    ItemView::default()
                })
                .map(|views| views.len())
            })
        };

        while !started.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }

        assert_eq!(t.shutdown(), ShutdownOutcome::Forced);
        assert!(matches!(job.join().unwrap(), Err(RecastError::Cancelled)));
        assert!(t.is_shutdown());
    }

    #[test]
    fn test_shutdown_from_callback_cancels() {
        let t = transformer(ConverterConfig {
            parallel: true,
            page_size: 2,
            pool_size: 2,
            ..ConverterConfig::default()
        });

        let result = t.convert_all_with(&items(6), ItemView::default, |item: &Item, _: &mut ItemView| {
            if item.id == 0 {
                t.shutdown();
            }
            Ok(())
        });

        assert!(matches!(result, Err(RecastError::Cancelled)));
        assert!(t.is_shutdown());
        assert_eq!(t.shutdown(), ShutdownOutcome::AlreadyShutdown);
    }

    #[test]
    fn test_shutdown() {
        let t = transformer(ConverterConfig::default());
        assert_eq!(t.shutdown(), ShutdownOutcome::Graceful);
        assert_eq!(t.shutdown(), ShutdownOutcome::AlreadyShutdown);
        assert!(t.is_shutdown());
        assert!(matches!(
            t.convert_all(&items(2), ItemView::default),
            Err(RecastError::PoolShutdown)
        ));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
