// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![warn(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # dotbridge
//!
//! A marshaling bridge that exposes the types of a garbage collected, object oriented
//! managed runtime through a flat, name-mangled native call surface. Native code calls
//! `Properties_Query_get_Answer(handle)` as if it were a plain procedural library; the
//! bridge translates values, keeps object identity and lifetime consistent with native
//! handles, and makes sure no managed fault ever crosses the boundary.
//!
//! ## Features
//!
//! - **Exact numeric semantics** - primitives cross bit for bit, enums wrap within their width
//! - **Stable identity** - one handle per exposed object, reference counted and rooted
//! - **Domesticated faults** - managed exceptions become null handles or default values
//! - **Value types** - structs cross as snapshots with accessor style operations
//! - **Collections** - index based sequence access and element-wise array copies
//! - **Header generation** - the whole surface rendered as a C header
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use dotbridge::prelude::*;
//!
//! let domain = Domain::new();
//! domain
//!     .register(
//!         ClassBuilder::class("Properties.Query")
//!             .field(FieldDef::instance("answer", PrimitiveKind::Int32.into()).with_init(42))
//!             .getter("Answer", PrimitiveKind::Int32.into(), |domain, frame| {
//!                 domain.get_field(frame.this.as_ref().unwrap_or(&ManagedValue::Null), "answer")
//!             })
//!             .build(),
//!     )
//!     .unwrap();
//!
//! let bridge = Bridge::new(Arc::new(domain))?;
//! let query = bridge.call("Properties_Query_new", vec![])?;
//! assert_eq!(bridge.call("Properties_Query_get_Answer", vec![query])?, NativeValue::I32(42));
//! # Ok::<(), dotbridge::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`runtime`] - The managed side: classes, heap, values, exceptions
//! - [`metadata`] - Type descriptors, name mangling, bindings and surface generation
//! - [`bridge`] - Handle table, type mapper, domesticator, collection adapter, [`Bridge`]
//! - [`ffi`] - The `extern "C"` error report hook registration
//! - [`config`] - [`BridgeConfig`]
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! Managed faults are returned as [`Error::ManagedFault`] by the runtime and turned into
//! sentinel results by the bridge. What reaches the caller of [`Bridge::invoke`] are
//! handle faults, bounds faults and usage errors, all recoverable at the call site.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and installs no subscriber.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use dotbridge::prelude::*;
///
/// let domain = Domain::new();
/// assert!(domain.is_empty());
/// ```
pub mod prelude;

/// The native side: marshaling runtime and its components
pub mod bridge;

/// Bridge configuration
pub mod config;

/// `extern "C"` entry points of the process-wide fault state
pub mod ffi;

/// Type descriptors, name mangling and surface generation
pub mod metadata;

/// The managed runtime model
pub mod runtime;

/// `dotbridge` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `dotbridge` Error type
///
/// # Examples
///
/// ```rust
/// use dotbridge::Error;
///
/// let error = Error::IndexOutOfRange { index: 3, count: 1 };
/// assert!(error.is_bounds_fault());
/// ```
pub use error::Error;

pub use bridge::{Bridge, ManagedHandle, NativeArg, NativeValue};
pub use config::BridgeConfig;
