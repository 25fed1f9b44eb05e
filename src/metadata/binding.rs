//! Static metadata binding one generated native symbol to one managed member.
//!
//! A [`MethodBinding`] is produced once per entry point during generation and is
//! immutable afterwards. The marshaling runtime reads it on every call to learn the
//! target type, the member kind, the parameter directions and the declared return type.

use bitflags::bitflags;
use strum::{Display, EnumIter};

use crate::metadata::{mangler::QualifiedName, typedesc::TypeDescriptor};

/// Overloadable operators, named after their managed special names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum OperatorKind {
    /// `a + b`
    #[strum(serialize = "op_Addition")]
    Addition,
    /// `a - b`
    #[strum(serialize = "op_Subtraction")]
    Subtraction,
    /// `a * b`
    #[strum(serialize = "op_Multiply")]
    Multiply,
    /// `a / b`
    #[strum(serialize = "op_Division")]
    Division,
    /// `a % b`
    #[strum(serialize = "op_Modulus")]
    Modulus,
    /// `-a`
    #[strum(serialize = "op_UnaryNegation")]
    UnaryNegation,
    /// `a == b`
    #[strum(serialize = "op_Equality")]
    Equality,
    /// `a != b`
    #[strum(serialize = "op_Inequality")]
    Inequality,
    /// `a < b`
    #[strum(serialize = "op_LessThan")]
    LessThan,
    /// `a > b`
    #[strum(serialize = "op_GreaterThan")]
    GreaterThan,
    /// `a <= b`
    #[strum(serialize = "op_LessThanOrEqual")]
    LessThanOrEqual,
    /// `a >= b`
    #[strum(serialize = "op_GreaterThanOrEqual")]
    GreaterThanOrEqual,
    /// implicit conversion
    #[strum(serialize = "op_Implicit")]
    Implicit,
    /// explicit conversion
    #[strum(serialize = "op_Explicit")]
    Explicit,
}

impl OperatorKind {
    /// Returns `true` for operators that yield a boolean.
    #[must_use]
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            OperatorKind::Equality
                | OperatorKind::Inequality
                | OperatorKind::LessThan
                | OperatorKind::GreaterThan
                | OperatorKind::LessThanOrEqual
                | OperatorKind::GreaterThanOrEqual
        )
    }

    /// Number of operands the operator takes.
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            OperatorKind::UnaryNegation | OperatorKind::Implicit | OperatorKind::Explicit => 1,
            _ => 2,
        }
    }
}

/// Index-based operations served by the collection adapter for sequence types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SequenceOp {
    /// `get_Count`
    Count,
    /// `get_Item(index)`
    GetAt,
    /// `set_Item(index, value)`
    SetAt,
    /// `Add(value)`
    Add,
    /// `Remove(value)`
    Remove,
}

/// The kind of managed member a binding reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Instance constructor
    Constructor,
    /// Ordinary method
    Method,
    /// Property getter
    Getter,
    /// Property setter
    Setter,
    /// Operator overload
    Operator(OperatorKind),
    /// Direct read of a public field
    FieldGet,
    /// Direct write of a public field
    FieldSet,
    /// Sequence operation served by the collection adapter
    Sequence(SequenceOp),
}

bitflags! {
    /// Attributes of a bound member that change how it is invoked.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemberFlags: u32 {
        /// No instance handle is passed
        const STATIC = 0x0001;
        /// The concrete member is looked up on the runtime class of the instance
        const DISPATCH = 0x0002;
        /// Synthesized by the generator (implicit constructor, field accessor, sequence op)
        const IMPLICIT = 0x0004;
    }
}

/// Direction of a parameter across the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ParamDirection {
    /// Passed by value
    In,
    /// Written by the callee through a caller supplied location, only on success
    Out,
    /// Read before and written after the call through the same location
    Ref,
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    /// Parameter name, used in generated headers
    pub name: String,
    /// Declared type
    pub ty: TypeDescriptor,
    /// Passing direction
    pub direction: ParamDirection,
}

impl ParamDescriptor {
    /// Creates an `in` parameter.
    #[must_use]
    pub fn input(name: &str, ty: TypeDescriptor) -> Self {
        ParamDescriptor {
            name: name.to_string(),
            ty,
            direction: ParamDirection::In,
        }
    }

    /// Creates an `out` parameter.
    #[must_use]
    pub fn output(name: &str, ty: TypeDescriptor) -> Self {
        ParamDescriptor {
            name: name.to_string(),
            ty,
            direction: ParamDirection::Out,
        }
    }

    /// Creates a `ref` parameter.
    #[must_use]
    pub fn reference(name: &str, ty: TypeDescriptor) -> Self {
        ParamDescriptor {
            name: name.to_string(),
            ty,
            direction: ParamDirection::Ref,
        }
    }
}

/// Maps one generated native symbol to a managed member.
#[derive(Debug, Clone)]
pub struct MethodBinding {
    /// The flat native symbol, e.g. `Properties_Query_get_Answer`
    pub symbol: String,
    /// The type declaring the member
    pub target: QualifiedName,
    /// Managed member name (property, field, method or operator name)
    pub member: String,
    /// What kind of member is reached
    pub kind: MemberKind,
    /// Invocation attributes
    pub flags: MemberFlags,
    /// Declared parameters, excluding the instance
    pub params: Vec<ParamDescriptor>,
    /// Declared return type
    pub ret: TypeDescriptor,
    /// Overload rank among same-named members of the target
    pub rank: usize,
    /// Position of the member in the declaring class, `None` for synthesized bindings
    pub member_index: Option<usize>,
}

impl MethodBinding {
    /// Returns `true` if no instance handle is passed.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MemberFlags::STATIC)
    }

    /// Returns `true` if the instance handle is the first native argument.
    #[must_use]
    pub fn takes_instance(&self) -> bool {
        !self.is_static() && self.kind != MemberKind::Constructor
    }

    /// Number of native arguments an entry point takes, including the instance handle.
    #[must_use]
    pub fn native_arity(&self) -> usize {
        self.params.len() + usize::from(self.takes_instance())
    }

    /// Returns `true` for entry points that only exist because the generator synthesized them.
    #[must_use]
    pub fn is_implicit(&self) -> bool {
        self.flags.contains(MemberFlags::IMPLICIT)
    }
}
