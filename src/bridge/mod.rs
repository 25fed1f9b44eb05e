//! The native side of the boundary.
//!
//! This module turns the managed domain into a flat procedural surface. Each generated
//! entry point is served by the [`Bridge`], which converts arguments with the
//! [`TypeMapper`], tracks exposed objects in the [`HandleTable`], runs the managed member
//! under [`domesticate`] and converts the results back.
//!
//! # Key Components
//!
//! - [`crate::bridge::Bridge`] - Marshaling runtime serving every entry point
//! - [`crate::bridge::TypeMapper`] - Managed and native value conversion
//! - [`crate::bridge::HandleTable`] - Reference counted handles with stable identity
//! - [`crate::bridge::ExceptionState`] - Fault recording and the error report hook
//! - [`crate::bridge::CollectionAdapter`] - Index based sequence access and array copies
//! - [`crate::bridge::NativeValue`] / [`crate::bridge::NativeArg`] - Native call arguments
//!
//! # Usage Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use dotbridge::prelude::*;
//!
//! let domain = Domain::new();
//! domain
//!     .register(
//!         ClassBuilder::static_class("BuiltinTypes")
//!             .static_method(
//!                 "PassOutInt",
//!                 vec![ParamDescriptor::output("value", PrimitiveKind::Int32.into())],
//!                 TypeDescriptor::Void,
//!                 |_, frame| {
//!                     frame.set_arg(0, ManagedValue::I4(5))?;
//!                     Ok(ManagedValue::Void)
//!                 },
//!             )
//!             .build(),
//!     )
//!     .unwrap();
//!
//! let bridge = Bridge::new(Arc::new(domain)).unwrap();
//! let mut value = NativeValue::I32(0);
//! bridge
//!     .invoke("BuiltinTypes_PassOutInt", &mut [NativeArg::out(&mut value)])
//!     .unwrap();
//! assert_eq!(value, NativeValue::I32(5));
//! ```

/// Collection and array adapter
pub mod collection;
/// Exception domestication and the error report hook
pub mod exception;
/// Handle table
pub mod handles;
/// Marshaling runtime
pub mod marshal;
/// Native value representation
pub mod native;
/// Type mapper
pub mod typemap;

pub use collection::CollectionAdapter;
pub use exception::{
    domesticate, ErrorHook, ExceptionState, FaultKind, FaultSummary, NativeErrorHook,
    NativeErrorReport,
};
pub use handles::HandleTable;
pub use marshal::Bridge;
pub use native::{
    ManagedHandle, NativeArg, NativeArray, NativeArrayView, NativeSlot, NativeString, NativeValue,
};
pub use typemap::TypeMapper;
