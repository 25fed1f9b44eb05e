//! Native-side representation of values crossing the boundary.
//!
//! These types are what a native caller passes into and receives from generated entry
//! points: fixed-width scalars, terminated byte strings, copied arrays and opaque
//! [`ManagedHandle`] tokens.

use std::{
    ffi::{CStr, CString},
    fmt,
};

use crate::{
    metadata::typedesc::{PrimitiveKind, TypeDescriptor},
    Error, Result,
};

/// Opaque token referencing one managed object.
///
/// The low 32 bits hold the slot index plus one, the high 32 bits the slot generation.
/// The all-zero value is the null handle. A handle only has meaning for the handle
/// table that issued it.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ManagedHandle(u64);

impl ManagedHandle {
    /// The null handle, returned when a constructor or accessor fails.
    pub const NULL: ManagedHandle = ManagedHandle(0);

    pub(crate) fn from_parts(index: u32, generation: u32) -> Self {
        ManagedHandle((u64::from(generation) << 32) | (u64::from(index) + 1))
    }

    /// Slot index, `None` for the null handle.
    pub(crate) fn index(self) -> Option<usize> {
        #[allow(clippy::cast_possible_truncation)]
        let low = (self.0 & 0xFFFF_FFFF) as u32;
        low.checked_sub(1).map(|index| index as usize)
    }

    /// Slot generation at the time the handle was issued.
    pub(crate) fn generation(self) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let high = (self.0 >> 32) as u32;
        high
    }

    /// Rebuilds a handle from its raw value, as received from native code.
    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        ManagedHandle(raw)
    }

    /// The raw value handed to native code.
    #[must_use]
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Returns `true` for the null handle.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ManagedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// A native value as passed to or returned from an entry point.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NativeValue {
    /// No value
    #[default]
    Void,
    /// `bool`
    Bool(bool),
    /// `int8_t`
    I8(i8),
    /// `uint8_t`
    U8(u8),
    /// `int16_t`
    I16(i16),
    /// `uint16_t`
    U16(u16),
    /// `int32_t`
    I32(i32),
    /// `uint32_t`
    U32(u32),
    /// `int64_t`
    I64(i64),
    /// `uint64_t`
    U64(u64),
    /// `float`
    F32(f32),
    /// `double`
    F64(f64),
    /// UTF-16 code unit
    Char(u16),
    /// Terminated byte string; `None` is the null pointer
    String(Option<CString>),
    /// Copied array; `None` is a null array
    Array(Option<NativeArray>),
    /// Object or boxed struct
    Handle(ManagedHandle),
}

impl NativeValue {
    /// The zero value of a primitive kind.
    #[must_use]
    pub fn zero(kind: PrimitiveKind) -> Self {
        Self::from_bits(kind, 0)
    }

    /// Builds a value of the given kind from raw bits, truncating to the width.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn from_bits(kind: PrimitiveKind, bits: u64) -> Self {
        match kind {
            PrimitiveKind::Boolean => NativeValue::Bool(bits != 0),
            PrimitiveKind::Char => NativeValue::Char(bits as u16),
            PrimitiveKind::SByte => NativeValue::I8(bits as u8 as i8),
            PrimitiveKind::Byte => NativeValue::U8(bits as u8),
            PrimitiveKind::Int16 => NativeValue::I16(bits as u16 as i16),
            PrimitiveKind::UInt16 => NativeValue::U16(bits as u16),
            PrimitiveKind::Int32 => NativeValue::I32(bits as u32 as i32),
            PrimitiveKind::UInt32 => NativeValue::U32(bits as u32),
            PrimitiveKind::Int64 => NativeValue::I64(bits as i64),
            PrimitiveKind::UInt64 => NativeValue::U64(bits),
            PrimitiveKind::Single => NativeValue::F32(f32::from_bits(bits as u32)),
            PrimitiveKind::Double => NativeValue::F64(f64::from_bits(bits)),
        }
    }

    /// Raw bits of an integer, boolean or character value, zero extended.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn to_bits(&self) -> Option<u64> {
        Some(match self {
            NativeValue::Bool(v) => u64::from(*v),
            NativeValue::I8(v) => u64::from(*v as u8),
            NativeValue::U8(v) => u64::from(*v),
            NativeValue::I16(v) => u64::from(*v as u16),
            NativeValue::U16(v) | NativeValue::Char(v) => u64::from(*v),
            NativeValue::I32(v) => u64::from(*v as u32),
            NativeValue::U32(v) => u64::from(*v),
            NativeValue::I64(v) => *v as u64,
            NativeValue::U64(v) => *v,
            _ => return None,
        })
    }

    /// Builds a non-null string value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InteriorNul`] if `value` contains a NUL byte.
    pub fn string(value: &str) -> Result<Self> {
        Ok(NativeValue::String(Some(CString::new(value)?)))
    }

    /// The null string.
    #[must_use]
    pub fn null_string() -> Self {
        NativeValue::String(None)
    }

    /// A short description of the value, for diagnostics.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            NativeValue::Void => "void",
            NativeValue::Bool(_) => "bool",
            NativeValue::I8(_) => "int8_t",
            NativeValue::U8(_) => "uint8_t",
            NativeValue::I16(_) => "int16_t",
            NativeValue::U16(_) => "uint16_t",
            NativeValue::I32(_) => "int32_t",
            NativeValue::U32(_) => "uint32_t",
            NativeValue::I64(_) => "int64_t",
            NativeValue::U64(_) => "uint64_t",
            NativeValue::F32(_) => "float",
            NativeValue::F64(_) => "double",
            NativeValue::Char(_) => "gunichar2",
            NativeValue::String(_) => "char*",
            NativeValue::Array(_) => "array",
            NativeValue::Handle(_) => "handle",
        }
    }

    /// Returns the handle, if this is a handle value.
    #[must_use]
    pub fn as_handle(&self) -> Option<ManagedHandle> {
        match self {
            NativeValue::Handle(handle) => Some(*handle),
            _ => None,
        }
    }

    /// Returns the boolean value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NativeValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns an `int32_t` value.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            NativeValue::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a `float` value.
    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            NativeValue::F32(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string content; `None` for null or non-UTF-8 strings and non-strings.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::String(Some(s)) => s.to_str().ok(),
            _ => None,
        }
    }

    /// Returns `true` for the null string, the null array and the null handle.
    #[must_use]
    pub fn is_null(&self) -> bool {
        match self {
            NativeValue::String(s) => s.is_none(),
            NativeValue::Array(a) => a.is_none(),
            NativeValue::Handle(h) => h.is_null(),
            _ => false,
        }
    }

    /// Returns the array, if this is a non-null array value.
    #[must_use]
    pub fn as_array(&self) -> Option<&NativeArray> {
        match self {
            NativeValue::Array(Some(array)) => Some(array),
            _ => None,
        }
    }
}

macro_rules! native_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for NativeValue {
                fn from(value: $ty) -> Self {
                    NativeValue::$variant(value)
                }
            }
        )*
    };
}

native_from! {
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    ManagedHandle => Handle,
}

impl From<NativeArray> for NativeValue {
    fn from(value: NativeArray) -> Self {
        NativeValue::Array(Some(value))
    }
}

/// Caller-managed growable string buffer used for string `out` and `ref` parameters.
///
/// The bridge clears and refills the buffer on success. A null managed string leaves the
/// buffer in the null state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeString {
    value: Option<CString>,
}

impl NativeString {
    /// Creates a buffer holding `value`, or the null state for `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InteriorNul`] if `value` contains a NUL byte.
    pub fn new(value: Option<&str>) -> Result<Self> {
        Ok(NativeString {
            value: value.map(CString::new).transpose()?,
        })
    }

    /// Creates an empty, non-null buffer.
    #[must_use]
    pub fn empty() -> Self {
        NativeString {
            value: Some(CString::default()),
        }
    }

    /// The buffer content; `None` in the null state.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_deref().and_then(|s| s.to_str().ok())
    }

    /// The buffer content as a C string.
    #[must_use]
    pub fn as_c_str(&self) -> Option<&CStr> {
        self.value.as_deref()
    }

    /// Returns `true` in the null state.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// Resets the buffer to the null state.
    pub fn clear(&mut self) {
        self.value = None;
    }

    /// Replaces the buffer content.
    pub fn assign(&mut self, value: Option<CString>) {
        self.value = value;
    }

    /// The content as a native string value.
    #[must_use]
    pub fn to_native(&self) -> NativeValue {
        NativeValue::String(self.value.clone())
    }
}

/// A copied array crossing the boundary, with its element type.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeArray {
    element: TypeDescriptor,
    items: Vec<NativeValue>,
}

impl NativeArray {
    /// Creates an array of `element` values.
    #[must_use]
    pub fn new(element: TypeDescriptor, items: Vec<NativeValue>) -> Self {
        NativeArray { element, items }
    }

    /// Element type.
    #[must_use]
    pub fn element(&self) -> &TypeDescriptor {
        &self.element
    }

    /// Elements in order.
    #[must_use]
    pub fn items(&self) -> &[NativeValue] {
        &self.items
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the array has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Borrows the array as a transient view.
    #[must_use]
    pub fn view(&self) -> NativeArrayView<'_> {
        NativeArrayView {
            buffer: &self.items,
            element: &self.element,
        }
    }
}

/// A transient `(buffer, length, element type)` triple over native array storage.
#[derive(Debug, Clone, Copy)]
pub struct NativeArrayView<'a> {
    buffer: &'a [NativeValue],
    element: &'a TypeDescriptor,
}

impl<'a> NativeArrayView<'a> {
    /// Creates a view over caller-owned storage.
    #[must_use]
    pub fn new(buffer: &'a [NativeValue], element: &'a TypeDescriptor) -> Self {
        NativeArrayView { buffer, element }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Element type.
    #[must_use]
    pub fn element(&self) -> &'a TypeDescriptor {
        self.element
    }

    /// Element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&'a NativeValue> {
        self.buffer.get(index)
    }

    /// Iterates the elements in order.
    pub fn iter(&self) -> impl Iterator<Item = &'a NativeValue> {
        self.buffer.iter()
    }
}

/// A caller-supplied output location.
#[derive(Debug)]
pub enum NativeSlot<'a> {
    /// Scalar, handle or array location
    Value(&'a mut NativeValue),
    /// Growable string buffer
    String(&'a mut NativeString),
}

impl NativeSlot<'_> {
    /// The current content of the location.
    #[must_use]
    pub fn read(&self) -> NativeValue {
        match self {
            NativeSlot::Value(value) => (**value).clone(),
            NativeSlot::String(buffer) => buffer.to_native(),
        }
    }

    /// Returns `true` if [`NativeSlot::write`] would store `value`.
    #[must_use]
    pub fn accepts(&self, value: &NativeValue) -> bool {
        match self {
            NativeSlot::Value(_) => true,
            NativeSlot::String(_) => matches!(value, NativeValue::String(_)),
        }
    }

    /// Stores a value into the location.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] when storing a non-string into a string buffer.
    pub fn write(&mut self, value: NativeValue) -> Result<()> {
        match self {
            NativeSlot::Value(slot) => {
                **slot = value;
                Ok(())
            }
            NativeSlot::String(buffer) => match value {
                NativeValue::String(content) => {
                    buffer.assign(content);
                    Ok(())
                }
                other => Err(Error::TypeMismatch {
                    expected: "char*".to_string(),
                    found: other.describe().to_string(),
                }),
            },
        }
    }
}

/// One native argument of an entry point invocation.
#[derive(Debug)]
pub enum NativeArg<'a> {
    /// Passed by value
    In(NativeValue),
    /// Written on success only
    Out(NativeSlot<'a>),
    /// Read before and written after the call
    Ref(NativeSlot<'a>),
}

impl<'a> NativeArg<'a> {
    /// An `in` argument.
    pub fn input(value: impl Into<NativeValue>) -> Self {
        NativeArg::In(value.into())
    }

    /// An `out` scalar, handle or array argument.
    pub fn out(slot: &'a mut NativeValue) -> Self {
        NativeArg::Out(NativeSlot::Value(slot))
    }

    /// An `out` string argument.
    pub fn out_string(buffer: &'a mut NativeString) -> Self {
        NativeArg::Out(NativeSlot::String(buffer))
    }

    /// A `ref` scalar, handle or array argument.
    pub fn by_ref(slot: &'a mut NativeValue) -> Self {
        NativeArg::Ref(NativeSlot::Value(slot))
    }

    /// A `ref` string argument.
    pub fn ref_string(buffer: &'a mut NativeString) -> Self {
        NativeArg::Ref(NativeSlot::String(buffer))
    }

    /// Direction name, for diagnostics.
    #[must_use]
    pub fn direction(&self) -> &'static str {
        match self {
            NativeArg::In(_) => "In",
            NativeArg::Out(_) => "Out",
            NativeArg::Ref(_) => "Ref",
        }
    }
}
