use crate::error::CopyError;
use std::any::{Any, type_name};
use std::fmt;

/// A property value in transit between a reader and a writer.
///
/// Values are moved, never converted: a writer only accepts the exact type
/// the reader produced.
pub struct PropertyValue {
    value: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl PropertyValue {
    pub fn new<V: Any + Send>(value: V) -> Self {
        Self {
            value: Box::new(value),
            type_name: type_name::<V>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<V: Any>(&self) -> bool {
        self.value.is::<V>()
    }

    /// Take the value back out, or get `self` back if the type differs
    pub fn downcast<V: Any>(self) -> Result<V, Self> {
        let type_name = self.type_name;
        self.value
            .downcast::<V>()
            .map(|value| *value)
            .map_err(|value| Self { value, type_name })
    }

    /// Move the value into `slot`, failing on a type mismatch
    pub fn assign_to<V: Any>(self, slot: &mut V, property: &'static str) -> Result<(), CopyError> {
        *slot = self.into_typed(property)?;
        Ok(())
    }

    pub(crate) fn into_typed<V: Any>(self, property: &'static str) -> Result<V, CopyError> {
        self.downcast::<V>().map_err(|value| CopyError::TypeMismatch {
            property,
            expected: type_name::<V>(),
            found: value.type_name,
        })
    }
}

impl fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyValue")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}
