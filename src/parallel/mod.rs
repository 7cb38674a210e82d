//! Execution path selection and the bounded worker pool
//!
//! This module knows nothing about records or conversions. It answers two
//! questions for the transformer:
//!
//! - **Which path**: [`ExecutionPath::select`] compares the workload against
//!   the auto-parallel threshold (or honours an explicit parallel flag).
//! - **Where to run**: [`WorkerPool`] owns a fixed number of named worker
//!   threads, runs jobs on them, and tears them down exactly once.
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │   Transformer   │    │   Parallel       │    │   rayon         │
//! │                 │───▶│   Module         │───▶│   ThreadPool    │
//! │ • Batch sizing  │    │ • Path choice    │    │                 │
//! │ • Copy/callback │    │ • Pool lifecycle │    │ • Worker threads│
//! │ • Reassembly    │    │ • Cancellation   │    │ • Work stealing │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust
//! use recast::parallel::{ExecutionPath, WorkerPool};
//! use std::time::Duration;
//!
//! let path = ExecutionPath::select(false, 2_500, 1_000);
//! assert_eq!(path, ExecutionPath::Parallel);
//!
//! let pool = WorkerPool::new(2, Duration::from_secs(1)).unwrap();
//! let sum = pool.execute(|| (1..=10).sum::<i32>()).unwrap();
//! assert_eq!(sum, 55);
//! pool.shutdown();
//! ```

pub mod core;
pub mod pool;

pub use self::core::ExecutionPath;
pub use pool::{ShutdownOutcome, WorkerPool};
