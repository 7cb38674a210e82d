//! [`EstimateSize`] for std and serde_json types.

use super::{EstimateSize, SizeEstimator};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

macro_rules! scalar {
    ($width:expr => $($ty:ty),+) => {
        $(impl EstimateSize for $ty {
            fn estimate_size(&self, estimator: &SizeEstimator, _depth: usize) -> u64 {
                estimator.scalar($width)
            }
        })+
    };
}

scalar!(1 => bool, char);
scalar!(2 => i8, u8, i16, u16);
scalar!(4 => i32, u32, f32);
scalar!(8 => i64, u64, f64, isize, usize);
scalar!(16 => i128, u128);

impl EstimateSize for str {
    fn estimate_size(&self, estimator: &SizeEstimator, _depth: usize) -> u64 {
        estimator.text(self.chars().count())
    }
}

impl EstimateSize for String {
    fn estimate_size(&self, estimator: &SizeEstimator, depth: usize) -> u64 {
        self.as_str().estimate_size(estimator, depth)
    }
}

impl EstimateSize for () {
    fn estimate_size(&self, estimator: &SizeEstimator, _depth: usize) -> u64 {
        estimator.null()
    }
}

impl<T: EstimateSize> EstimateSize for Option<T> {
    fn estimate_size(&self, estimator: &SizeEstimator, depth: usize) -> u64 {
        match self {
            Some(value) => value.estimate_size(estimator, depth),
            None => estimator.null(),
        }
    }
}

// Pointers are transparent: the pointee is what gets counted.
macro_rules! transparent {
    ($($ptr:ident),+) => {
        $(impl<T: EstimateSize + ?Sized> EstimateSize for $ptr<T> {
            fn estimate_size(&self, estimator: &SizeEstimator, depth: usize) -> u64 {
                (**self).estimate_size(estimator, depth)
            }
        })+
    };
}

transparent!(Box, Arc, Rc);

impl<T: EstimateSize + ?Sized> EstimateSize for &T {
    fn estimate_size(&self, estimator: &SizeEstimator, depth: usize) -> u64 {
        (**self).estimate_size(estimator, depth)
    }
}

impl<T: EstimateSize> EstimateSize for [T] {
    fn estimate_size(&self, estimator: &SizeEstimator, depth: usize) -> u64 {
        estimator.sequence(self.iter(), depth)
    }
}

impl<T: EstimateSize, const N: usize> EstimateSize for [T; N] {
    fn estimate_size(&self, estimator: &SizeEstimator, depth: usize) -> u64 {
        estimator.sequence(self.iter(), depth)
    }
}

macro_rules! sequence {
    ($($coll:ident),+) => {
        $(impl<T: EstimateSize> EstimateSize for $coll<T> {
            fn estimate_size(&self, estimator: &SizeEstimator, depth: usize) -> u64 {
                estimator.sequence(self.iter(), depth)
            }
        })+
    };
}

sequence!(Vec, VecDeque, LinkedList, BTreeSet);

impl<T: EstimateSize, S> EstimateSize for HashSet<T, S> {
    fn estimate_size(&self, estimator: &SizeEstimator, depth: usize) -> u64 {
        estimator.sequence(self.iter(), depth)
    }
}

impl<K: EstimateSize, V: EstimateSize, S> EstimateSize for HashMap<K, V, S> {
    fn estimate_size(&self, estimator: &SizeEstimator, depth: usize) -> u64 {
        estimator.map(self.iter(), depth)
    }
}

impl<K: EstimateSize, V: EstimateSize> EstimateSize for BTreeMap<K, V> {
    fn estimate_size(&self, estimator: &SizeEstimator, depth: usize) -> u64 {
        estimator.map(self.iter(), depth)
    }
}

impl EstimateSize for serde_json::Value {
    fn estimate_size(&self, estimator: &SizeEstimator, depth: usize) -> u64 {
        use serde_json::Value;

        match self {
            Value::Null => estimator.null(),
            Value::Bool(_) => estimator.scalar(1),
            Value::Number(_) => estimator.scalar(8),
            Value::String(text) => estimator.text(text.chars().count()),
            Value::Array(items) => estimator.sequence(items.iter(), depth),
            Value::Object(entries) => estimator.map(entries.iter(), depth),
        }
    }
}
