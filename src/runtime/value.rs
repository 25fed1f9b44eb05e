//! Managed value representation.
//!
//! [`ManagedValue`] is what managed member bodies receive as arguments and produce as
//! results. It covers every type the bridge can marshal.
//!
//! # Type Mapping
//!
//! | Managed type | Variant |
//! |--------------|---------|
//! | `void` | [`ManagedValue::Void`] |
//! | `null` | [`ManagedValue::Null`] |
//! | `bool` | [`ManagedValue::Boolean`] |
//! | `char` | [`ManagedValue::Char`] (UTF-16 code unit) |
//! | `sbyte` .. `ulong` | [`ManagedValue::I1`] .. [`ManagedValue::U8`] |
//! | `float`, `double` | [`ManagedValue::R4`], [`ManagedValue::R8`] |
//! | `string` | [`ManagedValue::String`] |
//! | enum | the variant of its underlying integer type |
//! | value type | [`ManagedValue::Struct`] (held by value, copied on assignment) |
//! | class, interface, array | [`ManagedValue::Object`] |

use std::{fmt, sync::Arc};

use crate::metadata::typedesc::PrimitiveKind;

/// Opaque reference to an object on the [`ManagedHeap`](crate::runtime::ManagedHeap).
///
/// Two references are equal exactly when they denote the same managed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef(pub(crate) u64);

impl ObjectRef {
    /// Creates a reference from a raw heap id.
    #[must_use]
    pub fn new(id: u64) -> Self {
        ObjectRef(id)
    }

    /// Returns the heap id of this reference.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({})", self.0)
    }
}

/// An unboxed value type instance: its type name plus field values in layout order.
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    type_name: Arc<str>,
    fields: Vec<ManagedValue>,
}

impl StructValue {
    /// Creates a struct value.
    #[must_use]
    pub fn new(type_name: Arc<str>, fields: Vec<ManagedValue>) -> Self {
        StructValue { type_name, fields }
    }

    /// Fully qualified name of the value type.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Field values in layout order.
    #[must_use]
    pub fn fields(&self) -> &[ManagedValue] {
        &self.fields
    }

    /// Returns the value of the field at `index`, if present.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&ManagedValue> {
        self.fields.get(index)
    }

    /// Replaces the value of the field at `index`. Returns `false` if there is no such field.
    pub fn set_field(&mut self, index: usize, value: ManagedValue) -> bool {
        match self.fields.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// A value as seen by managed code.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ManagedValue {
    /// No value, returned by `void` members
    #[default]
    Void,
    /// The null reference
    Null,
    /// `System.Boolean`
    Boolean(bool),
    /// `System.Char`
    Char(u16),
    /// `System.SByte`
    I1(i8),
    /// `System.Byte`
    U1(u8),
    /// `System.Int16`
    I2(i16),
    /// `System.UInt16`
    U2(u16),
    /// `System.Int32`
    I4(i32),
    /// `System.UInt32`
    U4(u32),
    /// `System.Int64`
    I8(i64),
    /// `System.UInt64`
    U8(u64),
    /// `System.Single`
    R4(f32),
    /// `System.Double`
    R8(f64),
    /// Non-null `System.String`
    String(Arc<str>),
    /// Unboxed value type
    Struct(StructValue),
    /// Reference to a heap object
    Object(ObjectRef),
}

impl ManagedValue {
    /// Builds a non-null string value.
    #[must_use]
    pub fn string(value: &str) -> Self {
        ManagedValue::String(Arc::from(value))
    }

    /// Builds a string value, mapping `None` to [`ManagedValue::Null`].
    #[must_use]
    pub fn nullable_string(value: Option<&str>) -> Self {
        value.map_or(ManagedValue::Null, ManagedValue::string)
    }

    /// The primitive kind of this value, if it is a primitive.
    #[must_use]
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        Some(match self {
            ManagedValue::Boolean(_) => PrimitiveKind::Boolean,
            ManagedValue::Char(_) => PrimitiveKind::Char,
            ManagedValue::I1(_) => PrimitiveKind::SByte,
            ManagedValue::U1(_) => PrimitiveKind::Byte,
            ManagedValue::I2(_) => PrimitiveKind::Int16,
            ManagedValue::U2(_) => PrimitiveKind::UInt16,
            ManagedValue::I4(_) => PrimitiveKind::Int32,
            ManagedValue::U4(_) => PrimitiveKind::UInt32,
            ManagedValue::I8(_) => PrimitiveKind::Int64,
            ManagedValue::U8(_) => PrimitiveKind::UInt64,
            ManagedValue::R4(_) => PrimitiveKind::Single,
            ManagedValue::R8(_) => PrimitiveKind::Double,
            _ => return None,
        })
    }

    /// A short description of the value's shape, for diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            ManagedValue::Void => "void".to_string(),
            ManagedValue::Null => "null".to_string(),
            ManagedValue::String(_) => "System.String".to_string(),
            ManagedValue::Struct(value) => value.type_name().to_string(),
            ManagedValue::Object(_) => "object".to_string(),
            other => other
                .primitive_kind()
                .map_or_else(|| "unknown".to_string(), |kind| kind.clr_name().to_string()),
        }
    }

    /// Returns `true` for [`ManagedValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ManagedValue::Null)
    }

    /// Raw bits of an integer, boolean or character value, zero extended.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn to_bits(&self) -> Option<u64> {
        Some(match self {
            ManagedValue::Boolean(v) => u64::from(*v),
            ManagedValue::Char(v) | ManagedValue::U2(v) => u64::from(*v),
            ManagedValue::I1(v) => u64::from(*v as u8),
            ManagedValue::U1(v) => u64::from(*v),
            ManagedValue::I2(v) => u64::from(*v as u16),
            ManagedValue::I4(v) => u64::from(*v as u32),
            ManagedValue::U4(v) => u64::from(*v),
            ManagedValue::I8(v) => *v as u64,
            ManagedValue::U8(v) => *v,
            _ => return None,
        })
    }

    /// Returns the boolean value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ManagedValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns any integer value widened to `i64`.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ManagedValue::I1(v) => Some(i64::from(*v)),
            ManagedValue::U1(v) => Some(i64::from(*v)),
            ManagedValue::I2(v) => Some(i64::from(*v)),
            ManagedValue::U2(v) | ManagedValue::Char(v) => Some(i64::from(*v)),
            ManagedValue::I4(v) => Some(i64::from(*v)),
            ManagedValue::U4(v) => Some(i64::from(*v)),
            ManagedValue::I8(v) => Some(*v),
            ManagedValue::U8(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Returns an `int` value.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            ManagedValue::I4(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a `float` value.
    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            ManagedValue::R4(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a `double` value.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ManagedValue::R8(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the content of a non-null string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ManagedValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the heap reference of an object value.
    #[must_use]
    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            ManagedValue::Object(r) => Some(*r),
            _ => None,
        }
    }

    /// Returns the unboxed struct.
    #[must_use]
    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            ManagedValue::Struct(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the unboxed struct mutably.
    pub fn as_struct_mut(&mut self) -> Option<&mut StructValue> {
        match self {
            ManagedValue::Struct(value) => Some(value),
            _ => None,
        }
    }

    /// Collects every heap reference reachable directly from this value, including
    /// references held in struct fields.
    pub fn references(&self, out: &mut Vec<ObjectRef>) {
        match self {
            ManagedValue::Object(r) => out.push(*r),
            ManagedValue::Struct(value) => {
                for field in value.fields() {
                    field.references(out);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Display for ManagedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagedValue::Void => write!(f, "void"),
            ManagedValue::Null => write!(f, "null"),
            ManagedValue::Boolean(v) => write!(f, "{v}"),
            ManagedValue::Char(v) => match char::from_u32(u32::from(*v)) {
                Some(c) => write!(f, "'{c}'"),
                None => write!(f, "'\\u{v:04x}'"),
            },
            ManagedValue::I1(v) => write!(f, "{v}"),
            ManagedValue::U1(v) => write!(f, "{v}"),
            ManagedValue::I2(v) => write!(f, "{v}"),
            ManagedValue::U2(v) => write!(f, "{v}"),
            ManagedValue::I4(v) => write!(f, "{v}"),
            ManagedValue::U4(v) => write!(f, "{v}"),
            ManagedValue::I8(v) => write!(f, "{v}"),
            ManagedValue::U8(v) => write!(f, "{v}"),
            ManagedValue::R4(v) => write!(f, "{v}"),
            ManagedValue::R8(v) => write!(f, "{v}"),
            ManagedValue::String(s) => write!(f, "\"{s}\""),
            ManagedValue::Struct(value) => write!(f, "{}{{..}}", value.type_name()),
            ManagedValue::Object(r) => write!(f, "{r}"),
        }
    }
}

macro_rules! managed_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ManagedValue {
                fn from(value: $ty) -> Self {
                    ManagedValue::$variant(value)
                }
            }
        )*
    };
}

managed_from! {
    bool => Boolean,
    i8 => I1,
    u8 => U1,
    i16 => I2,
    u16 => U2,
    i32 => I4,
    u32 => U4,
    i64 => I8,
    u64 => U8,
    f32 => R4,
    f64 => R8,
    StructValue => Struct,
    ObjectRef => Object,
}

impl From<&str> for ManagedValue {
    fn from(value: &str) -> Self {
        ManagedValue::string(value)
    }
}

impl From<String> for ManagedValue {
    fn from(value: String) -> Self {
        ManagedValue::String(Arc::from(value))
    }
}

impl From<Option<&str>> for ManagedValue {
    fn from(value: Option<&str>) -> Self {
        ManagedValue::nullable_string(value)
    }
}
