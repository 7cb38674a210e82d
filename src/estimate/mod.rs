//! Approximate in-memory footprint of object graphs.
//!
//! The estimator walks a value through the [`EstimateSize`] trait and adds up
//! fixed costs that model a 64-bit managed runtime: a per-object overhead,
//! a reference width per slot, and per-type widths for scalars. It is a
//! heuristic used to size parallel batches, not an exact measurement.
//!
//! Recursion is bounded by `max_depth`. Anything at or beyond that depth is
//! counted as a single reference, which keeps cyclic or very deep graphs
//! cheap to estimate at the price of under-counting them. There is no cycle
//! detection.
//!
//! ```rust
//! use recast::estimate::{SizeEstimator, format_size};
//!
//! let estimator = SizeEstimator::default();
//! let names = vec!["ada".to_string(), "grace".to_string()];
//! let bytes = estimator.estimate(&names);
//! assert!(bytes > 0);
//! assert_eq!(format_size(1536), "1.5 KB");
//! ```

mod impls;
mod layout;

pub use layout::{ClassLayout, FieldAccessor, FieldDecl, FieldKind, Introspect};

/// Width of an object reference
pub const REFERENCE_SIZE: u64 = 4;

/// Fixed header cost of every object
pub const OBJECT_OVERHEAD: u64 = 16;

/// Cost of an interned value such as an enum constant
pub const INTERNED_SIZE: u64 = 4;

/// Cost of an absent value
pub const NULL_SIZE: u64 = REFERENCE_SIZE;

/// Default nesting depth after which values are counted as references
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Default number of class levels (own type plus parents) whose fields count
pub const DEFAULT_MAX_CLASS_DEPTH: usize = 3;

/// Binary unit names used by [`format_size`]
pub const UNIT_NAMES: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];

/// A value whose memory footprint can be estimated.
///
/// Implementations describe their own shape by calling one of the
/// [`SizeEstimator`] helpers (`scalar`, `text`, `sequence`, `map`, `object`,
/// ...). The depth check happens before `estimate_size` is called, so
/// implementations never need to test `depth` themselves.
pub trait EstimateSize {
    fn estimate_size(&self, estimator: &SizeEstimator, depth: usize) -> u64;
}

/// Recursive size estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeEstimator {
    max_depth: usize,
    max_class_depth: usize,
}

impl Default for SizeEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH, DEFAULT_MAX_CLASS_DEPTH)
    }
}

impl SizeEstimator {
    pub fn new(max_depth: usize, max_class_depth: usize) -> Self {
        Self {
            max_depth,
            max_class_depth: max_class_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn max_class_depth(&self) -> usize {
        self.max_class_depth
    }

    /// Estimate the footprint of `value`, in bytes
    pub fn estimate<V: EstimateSize + ?Sized>(&self, value: &V) -> u64 {
        self.estimate_at(value, 0)
    }

    /// Estimate `value` as if it were found `depth` levels down a graph
    pub fn estimate_at<V: EstimateSize + ?Sized>(&self, value: &V, depth: usize) -> u64 {
        if depth >= self.max_depth {
            return REFERENCE_SIZE;
        }
        value.estimate_size(self, depth)
    }

    /// Cost of an absent value
    pub fn null(&self) -> u64 {
        NULL_SIZE
    }

    /// A boxed scalar of `width` bytes
    pub fn scalar(&self, width: u64) -> u64 {
        OBJECT_OVERHEAD + width
    }

    /// Text of `chars` characters, two bytes each
    pub fn text(&self, chars: usize) -> u64 {
        OBJECT_OVERHEAD + 2 * chars as u64
    }

    /// An interned constant
    pub fn interned(&self) -> u64 {
        INTERNED_SIZE
    }

    /// A sequence: overhead plus every element and its slot
    pub fn sequence<'a, V, I>(&self, items: I, depth: usize) -> u64
    where
        V: EstimateSize + ?Sized + 'a,
        I: IntoIterator<Item = &'a V>,
    {
        items.into_iter().fold(OBJECT_OVERHEAD, |size, item| {
            size.saturating_add(self.estimate_at(item, depth + 1) + REFERENCE_SIZE)
        })
    }

    /// An associative map: overhead plus two slots, key and value per entry
    pub fn map<'a, K, V, I>(&self, entries: I, depth: usize) -> u64
    where
        K: EstimateSize + ?Sized + 'a,
        V: EstimateSize + ?Sized + 'a,
        I: IntoIterator<Item = (&'a K, &'a V)>,
    {
        entries.into_iter().fold(OBJECT_OVERHEAD, |size, (key, value)| {
            size.saturating_add(
                2 * REFERENCE_SIZE
                    + self.estimate_at(key, depth + 1)
                    + self.estimate_at(value, depth + 1),
            )
        })
    }

    /// An object described by its [`ClassLayout`].
    ///
    /// Static fields cost one reference each. Instance fields cost one
    /// reference plus the estimate of the value they hold. A field that
    /// cannot be read is logged and contributes nothing.
    pub fn object<T: Introspect>(&self, value: &T, depth: usize) -> u64 {
        let fields = layout::cached_fields::<T>(self.max_class_depth);
        let mut size = OBJECT_OVERHEAD;

        for field in fields.iter() {
            match &field.kind {
                FieldKind::Static => size += REFERENCE_SIZE,
                FieldKind::Instance(access) => {
                    let mut field_size = 0u64;
                    let mut visit = |field_value: &dyn EstimateSize| {
                        field_size += self.estimate_at(field_value, depth + 1) + REFERENCE_SIZE;
                    };
                    match access(value, &mut visit) {
                        Ok(()) => size = size.saturating_add(field_size),
                        Err(e) => {
                            tracing::warn!(
                                owner = field.owner,
                                field = field.name,
                                "Failed to estimate field size: {}",
                                e
                            );
                        }
                    }
                }
            }
        }

        size
    }

    /// Mean estimate over `items`, or `None` when there are none
    pub fn average<'a, V, I>(&self, items: I) -> Option<u64>
    where
        V: EstimateSize + 'a,
        I: IntoIterator<Item = &'a V>,
    {
        let (total, count) = items.into_iter().fold((0u64, 0u64), |(total, count), item| {
            (total.saturating_add(self.estimate(item)), count + 1)
        });
        (count > 0).then(|| total / count)
    }
}

/// Format a byte count with binary units, e.g. `1536` → `"1.5 KB"`.
///
/// Values keep at most two decimals, drop trailing zeros, and group the
/// integer part by thousands. Zero formats as `"0"`.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0".to_string();
    }

    let mut group = 0usize;
    let mut scaled = bytes as f64;
    while scaled >= 1024.0 && group < UNIT_NAMES.len() - 1 {
        scaled /= 1024.0;
        group += 1;
    }

    let rounded = format!("{:.2}", scaled);
    let (integer, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if fraction.is_empty() {
        format!("{} {}", grouped, UNIT_NAMES[group])
    } else {
        format!("{}.{} {}", grouped, fraction, UNIT_NAMES[group])
    }
}
