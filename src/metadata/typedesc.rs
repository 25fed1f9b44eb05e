//! Static type descriptors shared by all marshaling operations.
//!
//! A [`TypeDescriptor`] is the immutable description of how a managed type crosses the
//! boundary. Descriptors are produced once while the managed type metadata is registered
//! and are then shared (via `Arc`) by every binding, every field and every conversion that
//! touches the type.
//!
//! # Supported Types
//!
//! | Descriptor | Managed side | Native side |
//! |------------|--------------|-------------|
//! | [`TypeDescriptor::Primitive`] | `bool`, `char`, 8-64 bit integers, `float`, `double` | same width and signedness |
//! | [`TypeDescriptor::String`] | `System.String` (nullable) | terminated byte string or null |
//! | [`TypeDescriptor::Enum`] | enum value | underlying integer |
//! | [`TypeDescriptor::Struct`] | value type | handle to a boxed snapshot with accessors |
//! | [`TypeDescriptor::Array`] | `T[]` | `(buffer, length)` copy |
//! | [`TypeDescriptor::Object`] | class or interface reference | handle |
//!
//! # Numeric Limits
//!
//! [`PrimitiveKind::min_value`] and [`PrimitiveKind::max_value`] are taken directly from the
//! Rust primitive constants, which are the platform's own limits for that width and
//! signedness. No runtime-specific constant tables are involved.

use std::{fmt, sync::Arc};

use strum::{Display, EnumCount, EnumIter};

use crate::{
    bridge::NativeValue,
    metadata::mangler::QualifiedName,
    runtime::{ManagedValue, StructValue},
    Error, Result,
};

/// Primitive value kinds that cross the boundary unchanged in width and signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumCount)]
pub enum PrimitiveKind {
    /// `System.Boolean`
    Boolean,
    /// `System.Char`, a UTF-16 code unit
    Char,
    /// `System.SByte`
    SByte,
    /// `System.Byte`
    Byte,
    /// `System.Int16`
    Int16,
    /// `System.UInt16`
    UInt16,
    /// `System.Int32`
    Int32,
    /// `System.UInt32`
    UInt32,
    /// `System.Int64`
    Int64,
    /// `System.UInt64`
    UInt64,
    /// `System.Single`
    Single,
    /// `System.Double`
    Double,
}

impl PrimitiveKind {
    /// Size of the native representation in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            PrimitiveKind::Boolean | PrimitiveKind::SByte | PrimitiveKind::Byte => 1,
            PrimitiveKind::Char | PrimitiveKind::Int16 | PrimitiveKind::UInt16 => 2,
            PrimitiveKind::Int32 | PrimitiveKind::UInt32 | PrimitiveKind::Single => 4,
            PrimitiveKind::Int64 | PrimitiveKind::UInt64 | PrimitiveKind::Double => 8,
        }
    }

    /// Returns `true` for signed integers and floating point kinds.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            PrimitiveKind::SByte
                | PrimitiveKind::Int16
                | PrimitiveKind::Int32
                | PrimitiveKind::Int64
                | PrimitiveKind::Single
                | PrimitiveKind::Double
        )
    }

    /// Returns `true` for the integer kinds that can back an enum.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        !matches!(
            self,
            PrimitiveKind::Boolean
                | PrimitiveKind::Char
                | PrimitiveKind::Single
                | PrimitiveKind::Double
        )
    }

    /// Bit mask covering the width of an integer kind.
    #[must_use]
    pub fn mask(&self) -> u64 {
        match self.size() {
            8 => u64::MAX,
            size => (1u64 << (size * 8)) - 1,
        }
    }

    /// The managed type name, e.g. `System.Int32`.
    #[must_use]
    pub fn clr_name(&self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "System.Boolean",
            PrimitiveKind::Char => "System.Char",
            PrimitiveKind::SByte => "System.SByte",
            PrimitiveKind::Byte => "System.Byte",
            PrimitiveKind::Int16 => "System.Int16",
            PrimitiveKind::UInt16 => "System.UInt16",
            PrimitiveKind::Int32 => "System.Int32",
            PrimitiveKind::UInt32 => "System.UInt32",
            PrimitiveKind::Int64 => "System.Int64",
            PrimitiveKind::UInt64 => "System.UInt64",
            PrimitiveKind::Single => "System.Single",
            PrimitiveKind::Double => "System.Double",
        }
    }

    /// The C spelling used in generated headers.
    #[must_use]
    pub fn c_name(&self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "bool",
            PrimitiveKind::Char => "gunichar2",
            PrimitiveKind::SByte => "int8_t",
            PrimitiveKind::Byte => "uint8_t",
            PrimitiveKind::Int16 => "int16_t",
            PrimitiveKind::UInt16 => "uint16_t",
            PrimitiveKind::Int32 => "int32_t",
            PrimitiveKind::UInt32 => "uint32_t",
            PrimitiveKind::Int64 => "int64_t",
            PrimitiveKind::UInt64 => "uint64_t",
            PrimitiveKind::Single => "float",
            PrimitiveKind::Double => "double",
        }
    }

    /// The smallest representable value, as a native value.
    ///
    /// Floating point minimums are the most negative finite value (`-FLT_MAX`, `-DBL_MAX`).
    #[must_use]
    pub fn min_value(&self) -> NativeValue {
        match self {
            PrimitiveKind::Boolean => NativeValue::Bool(false),
            PrimitiveKind::Char => NativeValue::Char(u16::MIN),
            PrimitiveKind::SByte => NativeValue::I8(i8::MIN),
            PrimitiveKind::Byte => NativeValue::U8(u8::MIN),
            PrimitiveKind::Int16 => NativeValue::I16(i16::MIN),
            PrimitiveKind::UInt16 => NativeValue::U16(u16::MIN),
            PrimitiveKind::Int32 => NativeValue::I32(i32::MIN),
            PrimitiveKind::UInt32 => NativeValue::U32(u32::MIN),
            PrimitiveKind::Int64 => NativeValue::I64(i64::MIN),
            PrimitiveKind::UInt64 => NativeValue::U64(u64::MIN),
            PrimitiveKind::Single => NativeValue::F32(f32::MIN),
            PrimitiveKind::Double => NativeValue::F64(f64::MIN),
        }
    }

    /// The largest representable value, as a native value.
    #[must_use]
    pub fn max_value(&self) -> NativeValue {
        match self {
            PrimitiveKind::Boolean => NativeValue::Bool(true),
            PrimitiveKind::Char => NativeValue::Char(u16::MAX),
            PrimitiveKind::SByte => NativeValue::I8(i8::MAX),
            PrimitiveKind::Byte => NativeValue::U8(u8::MAX),
            PrimitiveKind::Int16 => NativeValue::I16(i16::MAX),
            PrimitiveKind::UInt16 => NativeValue::U16(u16::MAX),
            PrimitiveKind::Int32 => NativeValue::I32(i32::MAX),
            PrimitiveKind::UInt32 => NativeValue::U32(u32::MAX),
            PrimitiveKind::Int64 => NativeValue::I64(i64::MAX),
            PrimitiveKind::UInt64 => NativeValue::U64(u64::MAX),
            PrimitiveKind::Single => NativeValue::F32(f32::MAX),
            PrimitiveKind::Double => NativeValue::F64(f64::MAX),
        }
    }

    /// The managed zero value of this kind.
    #[must_use]
    pub fn zero(&self) -> ManagedValue {
        self.from_bits(0)
    }

    /// Builds a managed integer value of this kind from raw bits, truncating to the width.
    ///
    /// Floating point kinds reinterpret the low bits as IEEE-754.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_bits(&self, bits: u64) -> ManagedValue {
        match self {
            PrimitiveKind::Boolean => ManagedValue::Boolean(bits != 0),
            PrimitiveKind::Char => ManagedValue::Char(bits as u16),
            PrimitiveKind::SByte => ManagedValue::I1(bits as u8 as i8),
            PrimitiveKind::Byte => ManagedValue::U1(bits as u8),
            PrimitiveKind::Int16 => ManagedValue::I2(bits as u16 as i16),
            PrimitiveKind::UInt16 => ManagedValue::U2(bits as u16),
            PrimitiveKind::Int32 => ManagedValue::I4(bits as u32 as i32),
            PrimitiveKind::UInt32 => ManagedValue::U4(bits as u32),
            PrimitiveKind::Int64 => ManagedValue::I8(bits as i64),
            PrimitiveKind::UInt64 => ManagedValue::U8(bits),
            PrimitiveKind::Single => ManagedValue::R4(f32::from_bits(bits as u32)),
            PrimitiveKind::Double => ManagedValue::R8(f64::from_bits(bits)),
        }
    }
}

/// Enum type metadata: underlying width, flag semantics and the declared members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    /// Fully qualified enum type name
    pub name: QualifiedName,
    /// The integer kind backing the enum
    pub underlying: PrimitiveKind,
    /// Whether members are meant to be combined with bitwise OR
    pub flags: bool,
    /// Declared members in declaration order, as raw bits of the underlying width
    pub members: Vec<(String, u64)>,
}

impl EnumDescriptor {
    /// Creates an enum descriptor without members.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if `underlying` is not an integer kind.
    pub fn new(name: &str, underlying: PrimitiveKind, flags: bool) -> Result<Self> {
        if !underlying.is_integer() {
            return Err(malformed_error!(
                "Enum {} can not be backed by {}",
                name,
                underlying
            ));
        }

        Ok(EnumDescriptor {
            name: QualifiedName::parse(name),
            underlying,
            flags,
            members: Vec::new(),
        })
    }

    /// Adds a member. The value is truncated to the underlying width.
    #[must_use]
    pub fn member(mut self, name: &str, value: i64) -> Self {
        #[allow(clippy::cast_sign_loss)]
        let bits = (value as u64) & self.underlying.mask();
        self.members.push((name.to_string(), bits));
        self
    }

    /// Looks up the bits of a member by name.
    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<u64> {
        self.members
            .iter()
            .find(|(member, _)| member == name)
            .map(|(_, bits)| *bits)
    }

    /// Looks up the first member name declared with the given bits.
    #[must_use]
    pub fn name_of(&self, bits: u64) -> Option<&str> {
        let bits = bits & self.underlying.mask();
        self.members
            .iter()
            .find(|(_, value)| *value == bits)
            .map(|(name, _)| name.as_str())
    }

    /// Combines member values with bitwise OR, wrapping within the underlying width.
    ///
    /// For example, combining `0x20` and `0x02` on a byte-backed flag enum yields `0x22`.
    #[must_use]
    pub fn combine(&self, values: &[u64]) -> u64 {
        values.iter().fold(0, |acc, value| acc | value) & self.underlying.mask()
    }

    /// Converts raw bits into the managed value of the underlying kind.
    #[must_use]
    pub fn to_managed(&self, bits: u64) -> ManagedValue {
        self.underlying.from_bits(bits & self.underlying.mask())
    }
}

/// Struct layout: the ordered list of instance fields of a value type.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDescriptor {
    /// Fully qualified struct type name
    pub name: QualifiedName,
    /// Instance fields in declaration order
    pub fields: Vec<(String, TypeDescriptor)>,
}

impl StructDescriptor {
    /// Creates a struct descriptor without fields.
    #[must_use]
    pub fn new(name: &str) -> Self {
        StructDescriptor {
            name: QualifiedName::parse(name),
            fields: Vec::new(),
        }
    }

    /// Appends a field to the layout.
    #[must_use]
    pub fn field(mut self, name: &str, ty: TypeDescriptor) -> Self {
        self.fields.push((name.to_string(), ty));
        self
    }

    /// Returns the ordinal of a field in the layout.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(field, _)| field == name)
    }

    /// Builds the default value: every field at its own default, recursively.
    #[must_use]
    pub fn default_value(&self) -> StructValue {
        StructValue::new(
            Arc::from(self.name.to_string()),
            self.fields.iter().map(|(_, ty)| ty.default_managed()).collect(),
        )
    }
}

/// Static metadata describing how a managed type crosses the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// No value, only valid as a return type
    Void,
    /// Fixed-width primitive
    Primitive(PrimitiveKind),
    /// Nullable managed string
    String,
    /// Enum with its underlying integer width
    Enum(Arc<EnumDescriptor>),
    /// Value type with field layout
    Struct(Arc<StructDescriptor>),
    /// Single dimensional array of the element type
    Array(Box<TypeDescriptor>),
    /// Class or interface reference, by fully qualified name
    Object(Arc<str>),
}

impl TypeDescriptor {
    /// Shorthand for a primitive descriptor.
    #[must_use]
    pub fn primitive(kind: PrimitiveKind) -> Self {
        TypeDescriptor::Primitive(kind)
    }

    /// Shorthand for an object reference descriptor.
    #[must_use]
    pub fn object(name: &str) -> Self {
        TypeDescriptor::Object(Arc::from(name))
    }

    /// Shorthand for an array descriptor.
    #[must_use]
    pub fn array(element: TypeDescriptor) -> Self {
        TypeDescriptor::Array(Box::new(element))
    }

    /// Returns `true` if values of this type are represented by a handle on the native side.
    #[must_use]
    pub fn is_handle(&self) -> bool {
        matches!(self, TypeDescriptor::Struct(_) | TypeDescriptor::Object(_))
    }

    /// The managed type name, used in diagnostics and for assignability checks.
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            TypeDescriptor::Void => "System.Void".to_string(),
            TypeDescriptor::Primitive(kind) => kind.clr_name().to_string(),
            TypeDescriptor::String => "System.String".to_string(),
            TypeDescriptor::Enum(desc) => desc.name.to_string(),
            TypeDescriptor::Struct(desc) => desc.name.to_string(),
            TypeDescriptor::Array(element) => format!("{}[]", element.type_name()),
            TypeDescriptor::Object(name) => name.to_string(),
        }
    }

    /// The managed default value: zero, `false`, null, or a default struct.
    #[must_use]
    pub fn default_managed(&self) -> ManagedValue {
        match self {
            TypeDescriptor::Void => ManagedValue::Void,
            TypeDescriptor::Primitive(kind) => kind.zero(),
            TypeDescriptor::Enum(desc) => desc.underlying.zero(),
            TypeDescriptor::Struct(desc) => ManagedValue::Struct(desc.default_value()),
            TypeDescriptor::String | TypeDescriptor::Array(_) | TypeDescriptor::Object(_) => {
                ManagedValue::Null
            }
        }
    }

    /// The native default value: the sentinel returned by a domesticated fault.
    ///
    /// Object and struct results degrade to a null handle, strings and arrays to null,
    /// everything else to zero.
    #[must_use]
    pub fn default_native(&self) -> NativeValue {
        match self {
            TypeDescriptor::Void => NativeValue::Void,
            TypeDescriptor::Primitive(kind) => NativeValue::zero(*kind),
            TypeDescriptor::Enum(desc) => NativeValue::zero(desc.underlying),
            TypeDescriptor::String => NativeValue::String(None),
            TypeDescriptor::Array(_) => NativeValue::Array(None),
            TypeDescriptor::Struct(_) | TypeDescriptor::Object(_) => {
                NativeValue::Handle(crate::bridge::ManagedHandle::NULL)
            }
        }
    }

    /// Verifies that a managed value fits this descriptor.
    ///
    /// Object references are only checked for being a reference; assignability of the
    /// concrete class is the domain's concern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the value does not fit.
    pub fn check(&self, value: &ManagedValue) -> Result<()> {
        let fits = match (self, value) {
            (TypeDescriptor::Void, ManagedValue::Void) => true,
            (TypeDescriptor::Primitive(kind), value) => value.primitive_kind() == Some(*kind),
            (TypeDescriptor::Enum(desc), value) => {
                value.primitive_kind() == Some(desc.underlying)
            }
            (TypeDescriptor::String, ManagedValue::String(_) | ManagedValue::Null) => true,
            (TypeDescriptor::Struct(desc), ManagedValue::Struct(sv)) => {
                sv.type_name() == desc.name.to_string()
            }
            (
                TypeDescriptor::Array(_) | TypeDescriptor::Object(_),
                ManagedValue::Object(_) | ManagedValue::Null,
            ) => true,
            _ => false,
        };

        if fits {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                expected: self.type_name(),
                found: value.describe(),
            })
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

impl From<PrimitiveKind> for TypeDescriptor {
    fn from(kind: PrimitiveKind) -> Self {
        TypeDescriptor::Primitive(kind)
    }
}
