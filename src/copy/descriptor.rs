use super::PropertyValue;
use crate::error::CopyError;
use std::any::Any;
use std::sync::Arc;

pub type Reader<T> = Arc<dyn Fn(&T) -> Result<PropertyValue, CopyError> + Send + Sync>;
pub type Writer<T> = Arc<dyn Fn(&mut T, PropertyValue) -> Result<(), CopyError> + Send + Sync>;

/// A named property of `T` with an optional getter and setter.
pub struct PropertyDescriptor<T> {
    name: &'static str,
    reader: Option<Reader<T>>,
    writer: Option<Writer<T>>,
}

impl<T> Clone for PropertyDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            reader: self.reader.clone(),
            writer: self.writer.clone(),
        }
    }
}

impl<T: 'static> PropertyDescriptor<T> {
    /// Field that can be read (by clone) and written
    pub fn read_write<V>(name: &'static str, get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self
    where
        V: Clone + Any + Send,
    {
        Self {
            name,
            reader: Some(field_reader(get)),
            writer: Some(field_writer(name, get_mut)),
        }
    }

    pub fn read_only<V>(name: &'static str, get: fn(&T) -> &V) -> Self
    where
        V: Clone + Any + Send,
    {
        Self {
            name,
            reader: Some(field_reader(get)),
            writer: None,
        }
    }

    pub fn write_only<V>(name: &'static str, get_mut: fn(&mut T) -> &mut V) -> Self
    where
        V: Any + Send,
    {
        Self {
            name,
            reader: None,
            writer: Some(field_writer(name, get_mut)),
        }
    }

    /// Getter that computes its value and may fail
    pub fn getter<V, F>(name: &'static str, read: F) -> Self
    where
        V: Any + Send,
        F: Fn(&T) -> Result<V, CopyError> + Send + Sync + 'static,
    {
        Self {
            name,
            reader: Some(Arc::new(move |source: &T| read(source).map(PropertyValue::new))),
            writer: None,
        }
    }

    /// Setter that receives the value and may reject it
    pub fn setter<V, F>(name: &'static str, write: F) -> Self
    where
        V: Any + Send,
        F: Fn(&mut T, V) -> Result<(), CopyError> + Send + Sync + 'static,
    {
        Self {
            name,
            reader: None,
            writer: Some(Arc::new(move |target: &mut T, value: PropertyValue| {
                write(target, value.into_typed(name)?)
            })),
        }
    }

    /// Add a setter to a getter-only descriptor, or replace the existing one
    pub fn with_setter<V, F>(mut self, write: F) -> Self
    where
        V: Any + Send,
        F: Fn(&mut T, V) -> Result<(), CopyError> + Send + Sync + 'static,
    {
        self.writer = Self::setter(self.name, write).writer;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_readable(&self) -> bool {
        self.reader.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.writer.is_some()
    }

    pub(crate) fn reader(&self) -> Option<&Reader<T>> {
        self.reader.as_ref()
    }

    pub(crate) fn writer(&self) -> Option<&Writer<T>> {
        self.writer.as_ref()
    }

    /// Expose this property on a type `C` that embeds a `T`
    pub fn project<C: 'static>(
        self,
        get: fn(&C) -> &T,
        get_mut: fn(&mut C) -> &mut T,
    ) -> PropertyDescriptor<C> {
        let reader = self.reader.map(|read| -> Reader<C> {
            Arc::new(move |outer: &C| read(get(outer)))
        });
        let writer = self.writer.map(|write| -> Writer<C> {
            Arc::new(move |outer: &mut C, value: PropertyValue| write(get_mut(outer), value))
        });
        PropertyDescriptor {
            name: self.name,
            reader,
            writer,
        }
    }
}

fn field_reader<T: 'static, V: Clone + Any + Send>(get: fn(&T) -> &V) -> Reader<T> {
    Arc::new(move |source: &T| Ok(PropertyValue::new(get(source).clone())))
}

fn field_writer<T: 'static, V: Any + Send>(
    name: &'static str,
    get_mut: fn(&mut T) -> &mut V,
) -> Writer<T> {
    Arc::new(move |target: &mut T, value: PropertyValue| value.assign_to(get_mut(target), name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Inner {
        code: String,
    }

    #[derive(Default)]
    struct Outer {
        inner: Inner,
    }

    #[test]
    fn test_read_write_field() {
        let desc = PropertyDescriptor::read_write("code", |i: &Inner| &i.code, |i: &mut Inner| &mut i.code);
        assert!(desc.is_readable() && desc.is_writable());

        let source = Inner { code: "X1".into() };
        let mut target = Inner::default();
        let value = (desc.reader().unwrap())(&source).unwrap();
        (desc.writer().unwrap())(&mut target, value).unwrap();
        assert_eq!(target.code, "X1");
    }

    #[test]
    fn test_projection() {
        let desc = PropertyDescriptor::read_write("code", |i: &Inner| &i.code, |i: &mut Inner| &mut i.code)
            .project(|o: &Outer| &o.inner, |o: &mut Outer| &mut o.inner);

        let mut outer = Outer::default();
        (desc.writer().unwrap())(&mut outer, PropertyValue::new("Z9".to_string())).unwrap();
        assert_eq!(outer.inner.code, "Z9");

        let value = (desc.reader().unwrap())(&outer).unwrap();
        assert_eq!(value.downcast::<String>().unwrap(), "Z9");
    }

    #[test]
    fn test_setter_rejects_wrong_type() {
        let desc = PropertyDescriptor::<Inner>::setter("code", |i: &mut Inner, code: String| {
            i.code = code;
            Ok(())
        });
        let mut target = Inner::default();
        let err = (desc.writer().unwrap())(&mut target, PropertyValue::new(1u8)).unwrap_err();
        assert!(matches!(err, CopyError::TypeMismatch { property: "code", .. }));
    }

    #[test]
    fn test_getter_failure() {
        let desc = PropertyDescriptor::<Inner>::getter("checksum", |_: &Inner| -> Result<u32, CopyError> {
            Err(CopyError::read("checksum", "not computed"))
        });
        assert!(!desc.is_writable());
        assert!((desc.reader().unwrap())(&Inner::default()).is_err());
    }
}
