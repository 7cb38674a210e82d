//! Name-matched property copy between two types.
//!
//! Types describe their properties once through [`Properties`]. The first
//! copy from `S` to `T` builds a plan of the readable properties of `S` that
//! have a writable counterpart of the same name on `T`; the plan is cached
//! for the process lifetime, so later copies only run the matched pairs.
//!
//! Copies are shallow: readers hand over a clone of the field, writers store
//! it as is. Properties that only exist on one side are ignored.

mod descriptor;
mod value;

pub use descriptor::{PropertyDescriptor, Reader, Writer};
pub use value::PropertyValue;

use crate::error::CopyError;
use dashmap::DashMap;
use lazy_static::lazy_static;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

type Erased = Arc<dyn Any + Send + Sync>;

lazy_static! {
    static ref READ_MAPS: DashMap<TypeId, Erased> = DashMap::new();
    static ref WRITE_MAPS: DashMap<TypeId, Erased> = DashMap::new();
    static ref COPY_PLANS: DashMap<(TypeId, TypeId), Erased> = DashMap::new();
}

/// Types that expose named properties for copying.
///
/// Declarations earlier in the list win over later ones with the same name,
/// so a type lists its own properties before the ones it inherits.
pub trait Properties: Sized + 'static {
    fn properties() -> Vec<PropertyDescriptor<Self>>;
}

/// Readable properties of a type, in declaration order
struct ReadMap<S> {
    readers: Vec<(&'static str, Reader<S>)>,
}

/// Writable properties of a type, by name
struct WriteMap<T> {
    writers: HashMap<&'static str, Writer<T>>,
}

struct CopyStep<S, T> {
    name: &'static str,
    read: Reader<S>,
    write: Writer<T>,
}

/// Matched properties for one (source, target) pair
struct CopyPlan<S, T> {
    steps: Vec<CopyStep<S, T>>,
}

/// Copy every property `target` can accept from `source`.
///
/// Returns the number of properties copied. The first failing property
/// aborts the copy; properties written before it stay written.
pub fn copy_properties<S: Properties, T: Properties>(
    source: &S,
    target: &mut T,
) -> Result<usize, CopyError> {
    let plan = copy_plan::<S, T>();
    for step in &plan.steps {
        let value = (step.read)(source)?;
        (step.write)(target, value)?;
        tracing::trace!(property = step.name, "Copied property");
    }
    Ok(plan.steps.len())
}

/// Property names copied from `S` to `T`, in copy order
pub fn matched_properties<S: Properties, T: Properties>() -> Vec<&'static str> {
    copy_plan::<S, T>().steps.iter().map(|step| step.name).collect()
}

pub fn readable_properties<S: Properties>() -> Vec<&'static str> {
    read_map::<S>().readers.iter().map(|(name, _)| *name).collect()
}

pub fn writable_properties<T: Properties>() -> Vec<&'static str> {
    let mut names: Vec<_> = write_map::<T>().writers.keys().copied().collect();
    names.sort_unstable();
    names
}

fn read_map<S: Properties>() -> Arc<ReadMap<S>> {
    cached(&READ_MAPS, TypeId::of::<S>(), || {
        let mut readers: Vec<(&'static str, Reader<S>)> = Vec::new();
        for desc in S::properties() {
            if let Some(read) = desc.reader()
                && !readers.iter().any(|(name, _)| *name == desc.name())
            {
                readers.push((desc.name(), read.clone()));
            }
        }
        tracing::debug!(
            source = type_name::<S>(),
            count = readers.len(),
            "Cached readable properties"
        );
        ReadMap { readers }
    })
}

fn write_map<T: Properties>() -> Arc<WriteMap<T>> {
    cached(&WRITE_MAPS, TypeId::of::<T>(), || {
        let mut writers = HashMap::new();
        for desc in T::properties() {
            if let Some(write) = desc.writer() {
                writers.entry(desc.name()).or_insert_with(|| write.clone());
            }
        }
        tracing::debug!(
            target_type = type_name::<T>(),
            count = writers.len(),
            "Cached writable properties"
        );
        WriteMap { writers }
    })
}

fn copy_plan<S: Properties, T: Properties>() -> Arc<CopyPlan<S, T>> {
    cached(&COPY_PLANS, (TypeId::of::<S>(), TypeId::of::<T>()), || {
        let reads = read_map::<S>();
        let writes = write_map::<T>();
        let steps = reads
            .readers
            .iter()
            .filter_map(|(name, read)| {
                writes.writers.get(name).map(|write| CopyStep {
                    name: *name,
                    read: read.clone(),
                    write: write.clone(),
                })
            })
            .collect();
        CopyPlan { steps }
    })
}

/// Look up a type-keyed entry, building it outside the map on first use.
/// Two threads racing on the first build produce equal values; the first
/// insert wins.
fn cached<K, V, F>(cache: &DashMap<K, Erased>, key: K, build: F) -> Arc<V>
where
    K: Eq + Hash + Clone,
    V: Send + Sync + 'static,
    F: FnOnce() -> V,
{
    if let Some(entry) = cache.get(&key)
        && let Ok(value) = entry.value().clone().downcast::<V>()
    {
        return value;
    }

    let value = Arc::new(build());
    let stored = cache
        .entry(key)
        .or_insert_with(|| value.clone() as Erased)
        .value()
        .clone();
    stored.downcast::<V>().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Person {
        name: String,
        age: u32,
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct PersonView {
        id: u64,
        name: String,
        age: u32,
    }

    #[derive(Debug, Default)]
    struct Mismatched {
        age: String,
    }

    impl Properties for Person {
        fn properties() -> Vec<PropertyDescriptor<Self>> {
            vec![
                PropertyDescriptor::read_write("name", |p: &Person| &p.name, |p: &mut Person| &mut p.name),
                PropertyDescriptor::read_write("age", |p: &Person| &p.age, |p: &mut Person| &mut p.age),
            ]
        }
    }

    impl Properties for PersonView {
        fn properties() -> Vec<PropertyDescriptor<Self>> {
            vec![
                PropertyDescriptor::read_write("id", |p: &PersonView| &p.id, |p: &mut PersonView| &mut p.id),
                PropertyDescriptor::read_write("name", |p: &PersonView| &p.name, |p: &mut PersonView| &mut p.name),
                PropertyDescriptor::read_write("age", |p: &PersonView| &p.age, |p: &mut PersonView| &mut p.age),
            ]
        }
    }

    impl Properties for Mismatched {
        fn properties() -> Vec<PropertyDescriptor<Self>> {
            vec![PropertyDescriptor::read_write(
                "age",
                |m: &Mismatched| &m.age,
                |m: &mut Mismatched| &mut m.age,
            )]
        }
    }

    #[test]
    fn test_copy_matching_properties() {
        let source = Person {
            name: "A".to_string(),
            age: 30,
        };
        let mut target = PersonView::default();

        let copied = copy_properties(&source, &mut target).unwrap();
        assert_eq!(copied, 2);
        assert_eq!(target.name, "A");
        assert_eq!(target.age, 30);
        assert_eq!(target.id, 0);
        assert_eq!(source.name, "A");
    }

    #[test]
    fn test_unmatched_properties_are_ignored() {
        let source = PersonView {
            id: 9,
            name: "B".to_string(),
            age: 41,
        };
        let mut target = Person::default();
        copy_properties(&source, &mut target).unwrap();
        assert_eq!(
            target,
            Person {
                name: "B".to_string(),
                age: 41
            }
        );
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let source = Person {
            name: "C".to_string(),
            age: 5,
        };
        let mut target = Mismatched::default();
        let err = copy_properties(&source, &mut target).unwrap_err();
        assert_eq!(err.property(), "age");
        assert!(target.age.is_empty());
    }

    #[test]
    fn test_plans_are_cached() {
        let first = copy_plan::<Person, PersonView>();
        let second = copy_plan::<Person, PersonView>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(matched_properties::<Person, PersonView>(), vec!["name", "age"]);
        assert_eq!(readable_properties::<PersonView>(), vec!["id", "name", "age"]);
        assert_eq!(writable_properties::<Person>(), vec!["age", "name"]);
    }

    #[test]
    fn test_concurrent_first_use() {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                std::thread::spawn(move || {
                    let source = Person {
                        name: format!("p{}", i),
                        age: i,
                    };
                    let mut target = PersonView::default();
                    copy_properties(&source, &mut target).unwrap();
                    target
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let target = handle.join().unwrap();
            assert_eq!(target.name, format!("p{}", i));
            assert_eq!(target.age, i as u32);
        }
    }
}
