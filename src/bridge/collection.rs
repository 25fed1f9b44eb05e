//! Collection and array adapter.
//!
//! Managed sequence types are exposed through index based operations
//! (`get_Count`, `get_Item`, `set_Item`, `Add`, `Remove`). Fixed-shape arrays cross the
//! boundary by element-wise copy in both directions; the native side never aliases managed
//! array storage.

use crate::{
    bridge::{NativeArray, NativeArrayView, NativeValue, TypeMapper},
    metadata::typedesc::TypeDescriptor,
    runtime::{exception, Domain, HeapObject, ManagedValue, ObjectRef},
    Error, Result,
};

fn checked_index(index: i64, count: usize) -> Result<usize> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < count)
        .ok_or(Error::IndexOutOfRange { index, count })
}

fn not_a_sequence(object: &HeapObject) -> Error {
    Error::TypeMismatch {
        expected: "sequence or array".to_string(),
        found: object.kind().to_string(),
    }
}

/// Index based access to managed sequences and arrays.
#[derive(Debug, Clone, Copy)]
pub struct CollectionAdapter<'a> {
    domain: &'a Domain,
}

impl<'a> CollectionAdapter<'a> {
    /// Creates an adapter over the objects of `domain`.
    #[must_use]
    pub fn new(domain: &'a Domain) -> Self {
        CollectionAdapter { domain }
    }

    /// Number of elements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `seq` is neither a sequence nor an array.
    pub fn count(&self, seq: ObjectRef) -> Result<usize> {
        self.domain.heap().with(seq, |object| match object {
            HeapObject::List { items, .. } => Ok(items.len()),
            HeapObject::Array { elements, .. } => Ok(elements.len()),
            other => Err(not_a_sequence(other)),
        })?
    }

    /// Declared element type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `seq` is neither a sequence nor an array.
    pub fn element_type(&self, seq: ObjectRef) -> Result<TypeDescriptor> {
        self.domain.heap().with(seq, |object| match object {
            HeapObject::List { element, .. } | HeapObject::Array { element, .. } => {
                Ok(element.clone())
            }
            other => Err(not_a_sequence(other)),
        })?
    }

    /// Element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] unless `0 <= index < count`.
    pub fn get_at(&self, seq: ObjectRef, index: i64) -> Result<ManagedValue> {
        self.domain.heap().with(seq, |object| {
            let values = match object {
                HeapObject::List { items, .. } => items,
                HeapObject::Array { elements, .. } => elements,
                other => return Err(not_a_sequence(other)),
            };
            let slot = checked_index(index, values.len())?;
            Ok(values[slot].clone())
        })?
    }

    /// Replaces the element at `index`; the count is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] unless `0 <= index < count`, and
    /// [`Error::TypeMismatch`] if `value` does not fit the element type.
    pub fn set_at(&self, seq: ObjectRef, index: i64, value: ManagedValue) -> Result<()> {
        self.domain.heap().with_mut(seq, |object| {
            let (element, values) = match object {
                HeapObject::List { element, items, .. } => (element, items),
                HeapObject::Array { element, elements } => (element, elements),
                other => return Err(not_a_sequence(other)),
            };
            element.check(&value)?;
            let slot = checked_index(index, values.len())?;
            values[slot] = value;
            Ok(())
        })?
    }

    /// Appends an element.
    ///
    /// # Errors
    ///
    /// Throws `System.NotSupportedException` for fixed-size arrays and returns
    /// [`Error::TypeMismatch`] if `value` does not fit the element type.
    pub fn add(&self, seq: ObjectRef, value: ManagedValue) -> Result<()> {
        self.domain.heap().with_mut(seq, |object| match object {
            HeapObject::List { element, items, .. } => {
                element.check(&value)?;
                items.push(value);
                Ok(())
            }
            HeapObject::Array { .. } => {
                throw!(exception::NOT_SUPPORTED, "Collection was of a fixed size.")
            }
            other => Err(not_a_sequence(other)),
        })?
    }

    /// Removes the first element equal to `value` under managed equality.
    ///
    /// Returns `false`, leaving the sequence untouched, if no element matches.
    ///
    /// # Errors
    ///
    /// Throws `System.NotSupportedException` for fixed-size arrays and propagates
    /// exceptions thrown by user-defined equality.
    pub fn remove_by_value(&self, seq: ObjectRef, value: &ManagedValue) -> Result<bool> {
        let items = self.domain.heap().with(seq, |object| match object {
            HeapObject::List { items, .. } => Ok(items.clone()),
            HeapObject::Array { .. } => Err(crate::runtime::ManagedException::new(
                exception::NOT_SUPPORTED,
                "Collection was of a fixed size.",
            )
            .into()),
            other => Err(not_a_sequence(other)),
        })??;

        // Equality may run managed code, so it is evaluated without the heap lock held.
        let mut found = None;
        for (position, item) in items.iter().enumerate() {
            if self.domain.equals(item, value)? {
                found = Some((position, item.clone()));
                break;
            }
        }
        let Some((position, matched)) = found else {
            return Ok(false);
        };

        self.domain.heap().with_mut(seq, |object| {
            if let HeapObject::List { items, .. } = object {
                let current = if items.get(position) == Some(&matched) {
                    Some(position)
                } else {
                    items.iter().position(|item| item == &matched)
                };
                if let Some(index) = current {
                    items.remove(index);
                    return true;
                }
            }
            false
        })
    }
}

/// Copies a managed array or sequence into a native array.
///
/// Object elements are converted to handles; if a later element fails to convert, the
/// handles already issued are released again.
///
/// # Errors
///
/// Returns [`Error::TypeMismatch`] if `array` is not an array, and conversion errors.
pub fn array_to_native(
    mapper: &TypeMapper<'_>,
    array: ObjectRef,
    element: &TypeDescriptor,
) -> Result<NativeArray> {
    let values = mapper.domain().heap().with(array, |object| match object {
        HeapObject::Array { elements, .. } => Ok(elements.clone()),
        HeapObject::List { items, .. } => Ok(items.clone()),
        other => Err(not_a_sequence(other)),
    })??;

    let mut items = Vec::with_capacity(values.len());
    for value in &values {
        match mapper.to_native(value, element) {
            Ok(native) => items.push(native),
            Err(error) => {
                for issued in &items {
                    mapper.discard(issued);
                }
                return Err(error);
            }
        }
    }
    Ok(NativeArray::new(element.clone(), items))
}

/// Copies a native array view into a fresh managed array.
///
/// # Errors
///
/// Returns conversion errors for elements that do not fit `element`.
pub fn array_from_native(
    mapper: &TypeMapper<'_>,
    view: NativeArrayView<'_>,
    element: &TypeDescriptor,
) -> Result<ManagedValue> {
    let elements = view
        .iter()
        .map(|value| mapper.to_managed(value, element))
        .collect::<Result<Vec<_>>>()?;
    mapper.domain().new_array(element.clone(), elements)
}

/// A native view over a native array value, for adapters that take views.
#[must_use]
pub fn view_of(value: &NativeValue) -> Option<NativeArrayView<'_>> {
    value.as_array().map(NativeArray::view)
}
