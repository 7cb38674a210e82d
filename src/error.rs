//! Error types for recast.
//!
//! Call-level failures are reported as [`RecastError`]. Failures that only
//! affect a single element are [`CopyError`]s: they are logged and the element
//! is dropped, so they never abort a whole conversion.

use thiserror::Error;

/// Failure of a whole conversion call, or of building a transformer.
#[derive(Error, Debug)]
pub enum RecastError {
    /// Invalid configuration or arguments, raised before any work starts
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A batch failed in a way that could not be handled per element
    #[error("conversion failed in batch {batch}: {reason}")]
    BatchFailed { batch: usize, reason: String },

    /// In-flight work was cancelled by a forced shutdown
    #[error("conversion cancelled by worker pool shutdown")]
    Cancelled,

    /// The transformer's worker pool has been shut down
    #[error("worker pool has been shut down")]
    PoolShutdown,

    /// The worker pool could not be created
    #[error("worker pool error: {0}")]
    Pool(String),

    /// Configuration could not be loaded or extracted
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

/// Convenience result type for recast operations.
pub type RecastResult<T> = Result<T, RecastError>;

impl RecastError {
    pub fn invalid_argument<T: Into<String>>(msg: T) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn batch_failed<T: Into<String>>(batch: usize, reason: T) -> Self {
        Self::BatchFailed {
            batch,
            reason: reason.into(),
        }
    }
}

impl From<figment::Error> for RecastError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

/// Failure to copy the properties of a single element.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CopyError {
    /// Both sides expose the property but with different types
    #[error("property `{property}` expects {expected}, found {found}")]
    TypeMismatch {
        property: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// The source refused to produce the property value
    #[error("failed to read property `{property}`: {reason}")]
    Read { property: &'static str, reason: String },

    /// The target refused to accept the property value
    #[error("failed to write property `{property}`: {reason}")]
    Write { property: &'static str, reason: String },
}

impl CopyError {
    pub fn read<T: Into<String>>(property: &'static str, reason: T) -> Self {
        Self::Read {
            property,
            reason: reason.into(),
        }
    }

    pub fn write<T: Into<String>>(property: &'static str, reason: T) -> Self {
        Self::Write {
            property,
            reason: reason.into(),
        }
    }

    /// Name of the property the failure happened on
    pub fn property(&self) -> &'static str {
        match self {
            Self::TypeMismatch { property, .. }
            | Self::Read { property, .. }
            | Self::Write { property, .. } => property,
        }
    }
}

/// A field could not be read while estimating an object's size.
#[derive(Error, Debug, Clone)]
#[error("field `{field}` is not accessible: {reason}")]
pub struct FieldAccessError {
    pub field: &'static str,
    pub reason: String,
}

impl FieldAccessError {
    pub fn new<T: Into<String>>(field: &'static str, reason: T) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}
