//! The managed runtime the bridge exposes.
//!
//! This module models the managed side of the boundary: the type metadata of managed
//! classes, the garbage collected heap their instances live on, the values managed code
//! operates on, and the exceptions it throws. Member bodies are plain Rust closures, so a
//! host can describe any managed surface and drive it through the bridge.
//!
//! # Key Components
//!
//! - [`crate::runtime::Domain`] - Class registry, object construction, dispatch and equality
//! - [`crate::runtime::ManagedClass`] / [`crate::runtime::ClassBuilder`] - Type metadata
//! - [`crate::runtime::ManagedHeap`] - Heap with root counts and mark/sweep collection
//! - [`crate::runtime::ManagedValue`] - Values passed to and returned from managed members
//! - [`crate::runtime::ManagedException`] - Exceptions thrown by managed members
//!
//! # Usage Examples
//!
//! ```rust
//! use dotbridge::prelude::*;
//!
//! let domain = Domain::new();
//! domain
//!     .register(
//!         ClassBuilder::class("Methods.Item")
//!             .field(FieldDef::instance("integer", PrimitiveKind::Int32.into()))
//!             .constructor(
//!                 vec![ParamDescriptor::input("i", PrimitiveKind::Int32.into())],
//!                 |domain, frame| {
//!                     let value = frame.arg(0)?.clone();
//!                     let mut this = frame.this.clone().unwrap_or(ManagedValue::Null);
//!                     domain.set_field(&mut this, "integer", value)?;
//!                     Ok(ManagedValue::Void)
//!                 },
//!             )
//!             .build(),
//!     )
//!     .unwrap();
//!
//! let item = domain.new_object("Methods.Item", vec![ManagedValue::I4(7)]).unwrap();
//! assert_eq!(domain.get_field(&item, "integer").unwrap(), ManagedValue::I4(7));
//! ```
//!
//! # Thread Safety
//!
//! [`crate::runtime::Domain`] is `Send + Sync`. Classes are immutable after registration
//! except for their static fields and initialization state, which are lock protected.

mod class;
mod domain;
pub mod exception;
mod heap;
mod value;

pub use class::{Body, CallFrame, ClassBuilder, ClassKind, FieldDef, ManagedClass, ManagedMember};
pub use domain::Domain;
pub use exception::ManagedException;
pub use heap::{HeapObject, ManagedHeap};
pub use value::{ManagedValue, ObjectRef, StructValue};
