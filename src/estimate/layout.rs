//! Field layouts for user types.
//!
//! A [`ClassLayout`] lists the fields of a type, its class-level constants,
//! and optionally a parent type whose layout is folded in. The estimator
//! flattens the hierarchy once per (type, class depth) and caches the result
//! for the life of the process.

use super::EstimateSize;
use crate::error::FieldAccessError;
use dashmap::DashMap;
use lazy_static::lazy_static;
use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::sync::Arc;

/// Reads one field of `T` and hands the value to the visitor.
pub type FieldAccessor<T> = Arc<
    dyn Fn(&T, &mut dyn FnMut(&dyn EstimateSize)) -> Result<(), FieldAccessError> + Send + Sync,
>;

type ParentFields<T> = Box<dyn Fn(usize) -> Vec<FieldDecl<T>> + Send + Sync>;

lazy_static! {
    static ref FIELD_CACHE: DashMap<(TypeId, usize), Arc<dyn Any + Send + Sync>> = DashMap::new();
}

pub enum FieldKind<T> {
    /// Class-level constant: costs a reference, never read
    Static,
    Instance(FieldAccessor<T>),
}

pub struct FieldDecl<T> {
    /// Type that declares the field
    pub owner: &'static str,
    pub name: &'static str,
    pub kind: FieldKind<T>,
}

impl<P: 'static> FieldDecl<P> {
    /// Re-root a parent's field so it can be read from a child value
    fn project<T: 'static>(self, parent_of: fn(&T) -> &P) -> FieldDecl<T> {
        let kind = match self.kind {
            FieldKind::Static => FieldKind::Static,
            FieldKind::Instance(access) => FieldKind::Instance(accessor(
                move |value: &T, visit: &mut dyn FnMut(&dyn EstimateSize)| {
                    access(parent_of(value), visit)
                },
            )),
        };
        FieldDecl {
            owner: self.owner,
            name: self.name,
            kind,
        }
    }
}

/// Types whose size is estimated field by field.
pub trait Introspect: Sized + 'static {
    fn layout() -> ClassLayout<Self>;
}

/// Builder describing the fields of `T`.
///
/// ```rust
/// use recast::estimate::{ClassLayout, EstimateSize, Introspect, SizeEstimator};
///
/// struct Point { x: i32, y: i32 }
///
/// impl Introspect for Point {
///     fn layout() -> ClassLayout<Self> {
///         ClassLayout::new("Point")
///             .field("x", |p: &Point| &p.x)
///             .field("y", |p: &Point| &p.y)
///     }
/// }
///
/// impl EstimateSize for Point {
///     fn estimate_size(&self, estimator: &SizeEstimator, depth: usize) -> u64 {
///         estimator.object(self, depth)
///     }
/// }
///
/// // header + 2 * (boxed int + slot)
/// assert_eq!(SizeEstimator::default().estimate(&Point { x: 1, y: 2 }), 16 + 2 * 24);
/// ```
pub struct ClassLayout<T> {
    name: &'static str,
    fields: Vec<FieldDecl<T>>,
    parent: Option<ParentFields<T>>,
}

impl<T: 'static> ClassLayout<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
            parent: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Instance field read through a plain projection
    pub fn field<F>(self, name: &'static str, get: fn(&T) -> &F) -> Self
    where
        F: EstimateSize + 'static,
    {
        self.with_accessor(
            name,
            accessor(move |value: &T, visit: &mut dyn FnMut(&dyn EstimateSize)| {
                visit(get(value));
                Ok(())
            }),
        )
    }

    /// Instance field whose read can fail
    pub fn try_field<F, V>(self, name: &'static str, read: F) -> Self
    where
        F: Fn(&T) -> Result<V, FieldAccessError> + Send + Sync + 'static,
        V: EstimateSize,
    {
        self.with_accessor(
            name,
            accessor(move |value: &T, visit: &mut dyn FnMut(&dyn EstimateSize)| {
                let field_value = read(value)?;
                visit(&field_value);
                Ok(())
            }),
        )
    }

    /// Class-level constant
    pub fn constant(mut self, name: &'static str) -> Self {
        self.fields.push(FieldDecl {
            owner: self.name,
            name,
            kind: FieldKind::Static,
        });
        self
    }

    /// Fold in the fields of a parent type embedded in `T`
    pub fn extends<P: Introspect>(mut self, parent_of: fn(&T) -> &P) -> Self {
        self.parent = Some(Box::new(move |levels: usize| {
            P::layout()
                .flatten(levels)
                .into_iter()
                .map(|decl| decl.project(parent_of))
                .collect()
        }));
        self
    }

    fn with_accessor(mut self, name: &'static str, access: FieldAccessor<T>) -> Self {
        self.fields.push(FieldDecl {
            owner: self.name,
            name,
            kind: FieldKind::Instance(access),
        });
        self
    }

    /// Fields of this type and up to `levels - 1` ancestors, own fields first
    pub fn flatten(self, levels: usize) -> Vec<FieldDecl<T>> {
        if levels == 0 {
            return Vec::new();
        }

        let mut fields = self.fields;
        if levels > 1
            && let Some(parent) = self.parent
        {
            fields.extend(parent(levels - 1));
        }

        let mut seen = HashSet::new();
        fields.retain(|decl| seen.insert((decl.owner, decl.name)));
        fields
    }
}

fn accessor<T, F>(read: F) -> FieldAccessor<T>
where
    F: Fn(&T, &mut dyn FnMut(&dyn EstimateSize)) -> Result<(), FieldAccessError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(read)
}

/// Flattened fields of `T`, computed once per class depth
pub(crate) fn cached_fields<T: Introspect>(levels: usize) -> Arc<Vec<FieldDecl<T>>> {
    let key = (TypeId::of::<T>(), levels);

    if let Some(entry) = FIELD_CACHE.get(&key)
        && let Ok(fields) = entry.value().clone().downcast::<Vec<FieldDecl<T>>>()
    {
        return fields;
    }

    // Built outside the map so a layout may touch the cache itself
    let fields = Arc::new(T::layout().flatten(levels));
    let erased: Arc<dyn Any + Send + Sync> = fields.clone();
    FIELD_CACHE.entry(key).or_insert(erased);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::{OBJECT_OVERHEAD, REFERENCE_SIZE, SizeEstimator};

    struct Base {
        id: u64,
    }

    struct Middle {
        base: Base,
        label: String,
    }

    struct Leaf {
        middle: Middle,
        score: i32,
    }

    struct Broken {
        ok: i32,
    }

    impl Introspect for Base {
        fn layout() -> ClassLayout<Self> {
            ClassLayout::new("Base")
                .field("id", |b: &Base| &b.id)
                .constant("VERSION")
        }
    }

    impl Introspect for Middle {
        fn layout() -> ClassLayout<Self> {
            ClassLayout::new("Middle")
                .field("label", |m: &Middle| &m.label)
                .extends(|m: &Middle| &m.base)
        }
    }

    impl Introspect for Leaf {
        fn layout() -> ClassLayout<Self> {
            ClassLayout::new("Leaf")
                .field("score", |l: &Leaf| &l.score)
                .extends(|l: &Leaf| &l.middle)
        }
    }

    impl Introspect for Broken {
        fn layout() -> ClassLayout<Self> {
            ClassLayout::new("Broken")
                .field("ok", |b: &Broken| &b.ok)
                .try_field("locked", |_: &Broken| -> Result<String, FieldAccessError> {
                    Err(FieldAccessError::new("locked", "access denied"))
                })
        }
    }

    macro_rules! estimate_as_object {
        ($($ty:ty),*) => {
            $(impl EstimateSize for $ty {
                fn estimate_size(&self, estimator: &SizeEstimator, depth: usize) -> u64 {
                    estimator.object(self, depth)
                }
            })*
        };
    }

    estimate_as_object!(Base, Middle, Leaf, Broken);

    fn leaf() -> Leaf {
        Leaf {
            middle: Middle {
                base: Base { id: 7 },
                label: "abcd".to_string(),
            },
            score: 3,
        }
    }

    #[test]
    fn test_hierarchy_is_flattened() {
        let names: Vec<_> = Leaf::layout()
            .flatten(3)
            .iter()
            .map(|decl| (decl.owner, decl.name))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Leaf", "score"),
                ("Middle", "label"),
                ("Base", "id"),
                ("Base", "VERSION"),
            ]
        );
    }

    #[test]
    fn test_class_depth_limits_ancestors() {
        assert_eq!(Leaf::layout().flatten(1).len(), 1);
        assert_eq!(Leaf::layout().flatten(2).len(), 2);
        assert!(Leaf::layout().flatten(0).is_empty());
    }

    #[test]
    fn test_object_estimate() {
        let estimator = SizeEstimator::default();
        let expected = OBJECT_OVERHEAD
            + (20 + REFERENCE_SIZE) // score
            + (16 + 8 + REFERENCE_SIZE) // label
            + (24 + REFERENCE_SIZE) // id
            + REFERENCE_SIZE; // VERSION
        assert_eq!(estimator.estimate(&leaf()), expected);
    }

    #[test]
    fn test_shallow_class_depth() {
        let estimator = SizeEstimator::new(3, 1);
        assert_eq!(
            estimator.estimate(&leaf()),
            OBJECT_OVERHEAD + 20 + REFERENCE_SIZE
        );
    }

    #[test]
    fn test_failed_field_contributes_nothing() {
        let estimator = SizeEstimator::default();
        let size = estimator.estimate(&Broken { ok: 1 });
        assert_eq!(size, OBJECT_OVERHEAD + 20 + REFERENCE_SIZE);
    }

    #[test]
    fn test_cache_returns_same_layout() {
        let first = cached_fields::<Leaf>(3);
        let second = cached_fields::<Leaf>(3);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cached_fields::<Leaf>(2).len(), 2);
    }
}
