use serde::Serialize;
use std::fmt;

/// Sequential or parallel execution of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPath {
    Sequential,
    Parallel,
}

impl ExecutionPath {
    /// Threshold-based path selection
    ///
    /// # Decision Logic
    /// ```text
    /// if parallel_flag || work_items_count >= threshold {
    ///     Parallel
    /// } else {
    ///     Sequential
    /// }
    /// ```
    ///
    /// # Example
    /// ```rust
    /// use recast::parallel::ExecutionPath;
    ///
    /// // 36 < 50 → Sequential (threshold not met)
    /// assert_eq!(ExecutionPath::select(false, 36, 50), ExecutionPath::Sequential);
    ///
    /// // 100 >= 50 → Parallel (threshold met)
    /// assert_eq!(ExecutionPath::select(false, 100, 50), ExecutionPath::Parallel);
    ///
    /// // the flag wins regardless of size
    /// assert_eq!(ExecutionPath::select(true, 1, 50), ExecutionPath::Parallel);
    /// ```
    pub fn select(parallel_flag: bool, work_items_count: usize, threshold: usize) -> Self {
        if parallel_flag || work_items_count >= threshold {
            ExecutionPath::Parallel
        } else {
            ExecutionPath::Sequential
        }
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, ExecutionPath::Parallel)
    }
}

impl fmt::Display for ExecutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionPath::Sequential => write!(f, "sequential"),
            ExecutionPath::Parallel => write!(f, "parallel"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_selection() {
        // Small workload should be sequential
        assert_eq!(ExecutionPath::select(false, 5, 10), ExecutionPath::Sequential);

        // Threshold is inclusive
        assert_eq!(ExecutionPath::select(false, 10, 10), ExecutionPath::Parallel);

        // Large workload should be parallel
        assert_eq!(ExecutionPath::select(false, 20, 10), ExecutionPath::Parallel);
    }

    #[test]
    fn test_flag_forces_parallel() {
        assert!(ExecutionPath::select(true, 0, 1000).is_parallel());
        assert!(!ExecutionPath::select(false, 999, 1000).is_parallel());
    }
}
