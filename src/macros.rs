/// Derive [`Properties`](crate::copy::Properties),
/// [`Introspect`](crate::estimate::Introspect) and
/// [`EstimateSize`](crate::estimate::EstimateSize) for a plain struct.
///
/// Every listed field becomes a read/write property and an estimated
/// instance field. `statics` names class-level constants that only count
/// towards the size estimate. `parent` names a field holding an embedded
/// parent record whose properties and fields are inherited.
///
/// ```rust
/// use recast::record;
///
/// #[derive(Debug, Clone, Default)]
/// pub struct Audit {
///     pub created_by: String,
/// }
///
/// #[derive(Debug, Clone, Default)]
/// pub struct Order {
///     pub audit: Audit,
///     pub id: u64,
///     pub total: f64,
/// }
///
/// record!(Audit { fields: [created_by] });
/// record!(Order {
///     fields: [id, total],
///     statics: [CURRENCY],
///     parent: audit => Audit,
/// });
///
/// let names = recast::copy::readable_properties::<Order>();
/// assert_eq!(names, vec!["id", "total", "created_by"]);
/// ```
#[macro_export]
macro_rules! record {
    (
        $ty:ident {
            fields: [$($field:ident),* $(,)?]
            $(, statics: [$($constant:ident),* $(,)?])?
            $(, parent: $parent_field:ident => $parent:ty)?
            $(,)?
        }
    ) => {
        impl $crate::copy::Properties for $ty {
            fn properties() -> ::std::vec::Vec<$crate::copy::PropertyDescriptor<Self>> {
                #[allow(unused_mut)]
                let mut properties = ::std::vec![
                    $($crate::copy::PropertyDescriptor::read_write(
                        ::std::stringify!($field),
                        |record: &$ty| &record.$field,
                        |record: &mut $ty| &mut record.$field,
                    ),)*
                ];
                $(
                    properties.extend(
                        <$parent as $crate::copy::Properties>::properties()
                            .into_iter()
                            .map(|property| {
                                property.project(
                                    |record: &$ty| &record.$parent_field,
                                    |record: &mut $ty| &mut record.$parent_field,
                                )
                            }),
                    );
                )?
                properties
            }
        }

        impl $crate::estimate::Introspect for $ty {
            fn layout() -> $crate::estimate::ClassLayout<Self> {
                $crate::estimate::ClassLayout::new(::std::stringify!($ty))
                    $(.field(::std::stringify!($field), |record: &$ty| &record.$field))*
                    $($(.constant(::std::stringify!($constant)))*)?
                    $(.extends(|record: &$ty| &record.$parent_field))?
            }
        }

        impl $crate::estimate::EstimateSize for $ty {
            fn estimate_size(&self, estimator: &$crate::estimate::SizeEstimator, depth: usize) -> u64 {
                estimator.object(self, depth)
            }
        }
    };
}

/// Mark enum-like types as interned constants for the size estimator.
///
/// ```rust
/// #[derive(Debug, Clone, Copy)]
/// pub enum Tier { Free, Pro }
///
/// recast::interned!(Tier);
///
/// let estimator = recast::estimate::SizeEstimator::default();
/// assert_eq!(estimator.estimate(&Tier::Pro), recast::estimate::INTERNED_SIZE);
/// ```
#[macro_export]
macro_rules! interned {
    ($($ty:ty),+ $(,)?) => {
        $(impl $crate::estimate::EstimateSize for $ty {
            fn estimate_size(&self, estimator: &$crate::estimate::SizeEstimator, _depth: usize) -> u64 {
                estimator.interned()
            }
        })+
    };
}
