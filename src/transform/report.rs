use crate::error::CopyError;
use crate::parallel::ExecutionPath;
use serde::Serialize;

/// An element that was dropped from a conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementFailure {
    /// Position of the element in the source slice
    pub index: usize,
    pub error: CopyError,
}

/// Converted targets together with what happened on the way.
#[derive(Debug)]
pub struct ConversionReport<T> {
    /// Converted elements, in source order
    pub targets: Vec<T>,
    /// Dropped elements, in source order
    pub failures: Vec<ElementFailure>,
    pub path: ExecutionPath,
    /// Records per batch (the whole input on the sequential path)
    pub batch_size: usize,
    pub batches: usize,
}

impl<T> ConversionReport<T> {
    pub(crate) fn empty(path: ExecutionPath) -> Self {
        Self {
            targets: Vec::new(),
            failures: Vec::new(),
            path,
            batch_size: 0,
            batches: 0,
        }
    }

    pub fn converted(&self) -> usize {
        self.targets.len()
    }

    pub fn dropped(&self) -> usize {
        self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_targets(self) -> Vec<T> {
        self.targets
    }

    pub fn summary(&self) -> ConversionSummary {
        ConversionSummary {
            path: self.path,
            batch_size: self.batch_size,
            batches: self.batches,
            converted: self.converted(),
            dropped: self.dropped(),
            failed_indices: self.failures.iter().map(|failure| failure.index).collect(),
        }
    }
}

/// Serializable counters of a [`ConversionReport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub path: ExecutionPath,
    pub batch_size: usize,
    pub batches: usize,
    pub converted: usize,
    pub dropped: usize,
    pub failed_indices: Vec<usize>,
}
