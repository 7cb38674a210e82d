//! # Recast - Adaptive Parallel Object Transformation
//!
//! Recast converts lists of records from one type into another by copying
//! properties with matching names. Small lists are converted on the calling
//! thread; large ones are split into batches sized from an estimate of the
//! records' memory footprint and the machine's resources, and converted on a
//! bounded worker pool.
//!
//! ## Features
//!
//! - **Name-matched copy**: cached per (source, target) pair, inherited
//!   properties included
//! - **Size estimation**: approximate footprint of nested records, depth bounded
//! - **Batch strategies**: default, dynamic, CPU-based, memory-based and hybrid
//! - **Order preserving**: parallel results come back in source order
//!
//! ## Quick Start
//!
//! ```rust
//! use recast::config::ConverterConfig;
//! use recast::record;
//! use recast::transform::Transformer;
//!
//! #[derive(Debug, Clone, Default)]
//! pub struct Person { pub name: String, pub age: u32 }
//!
//! #[derive(Debug, Clone, Default)]
//! pub struct PersonDto { pub id: u64, pub name: String, pub age: u32 }
//!
//! record!(Person { fields: [name, age] });
//! record!(PersonDto { fields: [id, name, age] });
//!
//! let config = ConverterConfig { parallel: true, pool_size: 2, ..Default::default() };
//! let transformer = Transformer::new(config)?;
//! let people = vec![Person { name: "A".into(), age: 30 }; 3];
//! let dtos = transformer.convert_all(&people, PersonDto::default)?;
//! assert_eq!(dtos.len(), 3);
//! # Ok::<(), recast::error::RecastError>(())
//! ```

mod macros;

pub mod cli;
pub mod config;
pub mod copy;
pub mod error;
pub mod estimate;
pub mod parallel;
pub mod profile;
pub mod strategy;
pub mod transform;

pub use config::{ConverterConfig, RecastConfig};
pub use error::{CopyError, RecastError, RecastResult};
pub use transform::{ConversionReport, Transformer};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
