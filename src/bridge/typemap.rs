//! Type mapper: conversion between managed and native values.
//!
//! | Descriptor | Managed | Native |
//! |------------|---------|--------|
//! | primitive | `ManagedValue::I4(..)` etc. | same-width scalar, bit for bit |
//! | enum | underlying integer | underlying integer, masked to its width |
//! | string | `String` / `Null` | terminated copy / null pointer |
//! | struct | `Struct` (copy) | handle to a boxed snapshot |
//! | object | `Object` / `Null` | handle / null handle |
//! | array | `Object` (array) / `Null` | element-wise copy / null array |

use std::{ffi::CString, sync::Arc};

use crate::{
    bridge::{collection, HandleTable, ManagedHandle, NativeValue},
    metadata::typedesc::{PrimitiveKind, TypeDescriptor},
    runtime::{Domain, HeapObject, ManagedValue, ObjectRef},
    Error, Result,
};

/// The primitive kind a native scalar carries.
#[must_use]
pub fn native_kind(value: &NativeValue) -> Option<PrimitiveKind> {
    Some(match value {
        NativeValue::Bool(_) => PrimitiveKind::Boolean,
        NativeValue::Char(_) => PrimitiveKind::Char,
        NativeValue::I8(_) => PrimitiveKind::SByte,
        NativeValue::U8(_) => PrimitiveKind::Byte,
        NativeValue::I16(_) => PrimitiveKind::Int16,
        NativeValue::U16(_) => PrimitiveKind::UInt16,
        NativeValue::I32(_) => PrimitiveKind::Int32,
        NativeValue::U32(_) => PrimitiveKind::UInt32,
        NativeValue::I64(_) => PrimitiveKind::Int64,
        NativeValue::U64(_) => PrimitiveKind::UInt64,
        NativeValue::F32(_) => PrimitiveKind::Single,
        NativeValue::F64(_) => PrimitiveKind::Double,
        _ => return None,
    })
}

fn mismatch(expected: &TypeDescriptor, found: impl Into<String>) -> Error {
    Error::TypeMismatch {
        expected: expected.type_name(),
        found: found.into(),
    }
}

/// Converts values in both directions for one bridge.
///
/// Handles issued while converting to native belong to the caller, who releases them.
#[derive(Debug, Clone, Copy)]
pub struct TypeMapper<'a> {
    domain: &'a Domain,
    handles: &'a HandleTable,
}

impl<'a> TypeMapper<'a> {
    /// Creates a mapper over a domain and the handle table its objects are exposed through.
    #[must_use]
    pub fn new(domain: &'a Domain, handles: &'a HandleTable) -> Self {
        TypeMapper { domain, handles }
    }

    /// The managed domain.
    #[must_use]
    pub fn domain(&self) -> &'a Domain {
        self.domain
    }

    /// The handle table.
    #[must_use]
    pub fn handles(&self) -> &'a HandleTable {
        self.handles
    }

    /// Converts a managed value to its native representation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the value does not fit `desc`,
    /// [`Error::InteriorNul`] for strings that can not be terminated, and handle faults
    /// if the handle table is exhausted.
    pub fn to_native(&self, value: &ManagedValue, desc: &TypeDescriptor) -> Result<NativeValue> {
        match desc {
            TypeDescriptor::Void => Ok(NativeValue::Void),
            TypeDescriptor::Primitive(kind) => {
                desc.check(value)?;
                Self::primitive_to_native(value, *kind)
            }
            TypeDescriptor::Enum(enum_desc) => {
                let bits = value
                    .to_bits()
                    .ok_or_else(|| mismatch(desc, value.describe()))?;
                Ok(NativeValue::from_bits(enum_desc.underlying, bits & enum_desc.underlying.mask()))
            }
            TypeDescriptor::String => match value {
                ManagedValue::Null => Ok(NativeValue::String(None)),
                ManagedValue::String(s) => {
                    Ok(NativeValue::String(Some(CString::new(s.as_bytes())?)))
                }
                other => Err(mismatch(desc, other.describe())),
            },
            TypeDescriptor::Struct(layout) => match value {
                ManagedValue::Struct(snapshot)
                    if snapshot.type_name() == layout.name.to_string() =>
                {
                    let boxed = self.domain.box_value(snapshot.clone())?;
                    self.expose(boxed, Arc::from(snapshot.type_name()))
                }
                ManagedValue::Object(object) => self.expose_object(*object),
                other => Err(mismatch(desc, other.describe())),
            },
            TypeDescriptor::Object(_) => match value {
                ManagedValue::Null => Ok(NativeValue::Handle(ManagedHandle::NULL)),
                ManagedValue::Object(object) => self.expose_object(*object),
                ManagedValue::Struct(snapshot) => {
                    let boxed = self.domain.box_value(snapshot.clone())?;
                    self.expose(boxed, Arc::from(snapshot.type_name()))
                }
                other => Err(mismatch(desc, other.describe())),
            },
            TypeDescriptor::Array(element) => match value {
                ManagedValue::Null => Ok(NativeValue::Array(None)),
                ManagedValue::Object(object) => {
                    let array = collection::array_to_native(self, *object, element)?;
                    Ok(NativeValue::Array(Some(array)))
                }
                other => Err(mismatch(desc, other.describe())),
            },
        }
    }

    fn primitive_to_native(value: &ManagedValue, kind: PrimitiveKind) -> Result<NativeValue> {
        Ok(match value {
            ManagedValue::Boolean(v) => NativeValue::Bool(*v),
            ManagedValue::Char(v) => NativeValue::Char(*v),
            ManagedValue::I1(v) => NativeValue::I8(*v),
            ManagedValue::U1(v) => NativeValue::U8(*v),
            ManagedValue::I2(v) => NativeValue::I16(*v),
            ManagedValue::U2(v) => NativeValue::U16(*v),
            ManagedValue::I4(v) => NativeValue::I32(*v),
            ManagedValue::U4(v) => NativeValue::U32(*v),
            ManagedValue::I8(v) => NativeValue::I64(*v),
            ManagedValue::U8(v) => NativeValue::U64(*v),
            ManagedValue::R4(v) => NativeValue::F32(*v),
            ManagedValue::R8(v) => NativeValue::F64(*v),
            other => {
                return Err(Error::TypeMismatch {
                    expected: kind.clr_name().to_string(),
                    found: other.describe(),
                })
            }
        })
    }

    fn expose_object(&self, object: ObjectRef) -> Result<NativeValue> {
        let class = self.domain.heap().with(object, HeapObject::type_name)?;
        self.expose(object, Arc::from(class))
    }

    fn expose(&self, object: ObjectRef, class: Arc<str>) -> Result<NativeValue> {
        let handle = self.handles.acquire(self.domain.heap(), object, class)?;
        Ok(NativeValue::Handle(handle))
    }

    /// Converts a native value to its managed representation.
    ///
    /// Object handles are resolved and checked for assignability to `desc`. Struct handles
    /// yield a copy of the boxed snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] for values of the wrong shape or type, handle
    /// faults for stale or null struct handles, and [`Error::InvalidString`] for
    /// non UTF-8 strings.
    pub fn to_managed(&self, value: &NativeValue, desc: &TypeDescriptor) -> Result<ManagedValue> {
        match desc {
            TypeDescriptor::Void => Ok(ManagedValue::Void),
            TypeDescriptor::Primitive(kind) => {
                if native_kind(value) != Some(*kind) {
                    return Err(mismatch(desc, value.describe()));
                }
                Ok(match value {
                    NativeValue::F32(v) => ManagedValue::R4(*v),
                    NativeValue::F64(v) => ManagedValue::R8(*v),
                    other => {
                        let bits = other.to_bits().ok_or_else(|| mismatch(desc, other.describe()))?;
                        kind.from_bits(bits)
                    }
                })
            }
            TypeDescriptor::Enum(enum_desc) => {
                let bits = match native_kind(value) {
                    Some(kind) if kind.is_integer() => value.to_bits(),
                    _ => None,
                }
                .ok_or_else(|| mismatch(desc, value.describe()))?;
                Ok(enum_desc.to_managed(bits))
            }
            TypeDescriptor::String => match value {
                NativeValue::String(None) => Ok(ManagedValue::Null),
                NativeValue::String(Some(s)) => Ok(ManagedValue::string(s.to_str()?)),
                other => Err(mismatch(desc, other.describe())),
            },
            TypeDescriptor::Struct(layout) => {
                let handle = value
                    .as_handle()
                    .ok_or_else(|| mismatch(desc, value.describe()))?;
                let (object, _) = self.handles.resolve(handle)?;
                let snapshot = self.domain.heap().with(object, |obj| match obj {
                    HeapObject::Boxed(snapshot) => Some(snapshot.clone()),
                    _ => None,
                })?;
                match snapshot {
                    Some(snapshot) if snapshot.type_name() == layout.name.to_string() => {
                        Ok(ManagedValue::Struct(snapshot))
                    }
                    Some(snapshot) => Err(mismatch(desc, snapshot.type_name())),
                    None => Err(mismatch(desc, "object")),
                }
            }
            TypeDescriptor::Object(name) => {
                let handle = value
                    .as_handle()
                    .ok_or_else(|| mismatch(desc, value.describe()))?;
                if handle.is_null() {
                    return Ok(ManagedValue::Null);
                }
                let (object, class) = self.handles.resolve(handle)?;
                if !self.domain.is_assignable(&class, name) {
                    return Err(mismatch(desc, class.to_string()));
                }
                Ok(ManagedValue::Object(object))
            }
            TypeDescriptor::Array(element) => match value {
                NativeValue::Array(None) => Ok(ManagedValue::Null),
                NativeValue::Array(Some(array)) => {
                    collection::array_from_native(self, array.view(), element)
                }
                other => Err(mismatch(desc, other.describe())),
            },
        }
    }

    /// Releases every handle a converted value holds. Used to unwind partial conversions.
    pub fn discard(&self, value: &NativeValue) {
        match value {
            NativeValue::Handle(handle) if !handle.is_null() => {
                if let Err(error) = self.handles.release(self.domain.heap(), *handle) {
                    tracing::debug!(%handle, %error, "discarded handle was not live");
                }
            }
            NativeValue::Array(Some(array)) => {
                for item in array.items() {
                    self.discard(item);
                }
            }
            _ => {}
        }
    }
}
