//! # dotbridge Prelude
//!
//! The types needed to describe a managed domain and drive it through the bridge.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotbridge operations
pub use crate::Error;

/// The result type used throughout dotbridge
pub use crate::Result;

/// Bridge configuration
pub use crate::BridgeConfig;

// ================================================================================================
// Managed Runtime
// ================================================================================================

/// Domain, class metadata and member bodies
pub use crate::runtime::{CallFrame, ClassBuilder, ClassKind, Domain, FieldDef, ManagedClass};

/// Managed values and exceptions
pub use crate::runtime::{ManagedException, ManagedValue, ObjectRef, StructValue};

/// Well-known managed exception type names
pub use crate::runtime::exception;

// ================================================================================================
// Metadata
// ================================================================================================

/// Type descriptors
pub use crate::metadata::typedesc::{
    EnumDescriptor, PrimitiveKind, StructDescriptor, TypeDescriptor,
};

/// Bindings and parameters
pub use crate::metadata::binding::{
    MemberKind, MethodBinding, OperatorKind, ParamDescriptor, ParamDirection,
};

/// Naming and generation
pub use crate::metadata::{header::HeaderWriter, mangler::QualifiedName, registry::BindingRegistry};

// ================================================================================================
// Native Surface
// ================================================================================================

/// Marshaling runtime
pub use crate::bridge::Bridge;

/// Native values and call arguments
pub use crate::bridge::{
    ManagedHandle, NativeArg, NativeArray, NativeArrayView, NativeSlot, NativeString, NativeValue,
};

/// Fault reporting
pub use crate::bridge::{ErrorHook, ExceptionState, FaultKind, FaultSummary};
