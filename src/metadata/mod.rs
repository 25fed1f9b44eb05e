//! Static metadata of the generated surface.
//!
//! Everything here is immutable once generated: type descriptors shared by all
//! conversions of a type, the naming scheme of flat symbols, and one binding per entry
//! point.
//!
//! # Key Components
//!
//! - [`typedesc`] - Primitive, enum, struct, array and object descriptors
//! - [`mangler`] - Flat symbol naming with declaration order overload ranks
//! - [`binding`] - Entry point bindings: member kind, flags and parameter directions
//! - [`registry`] - Generation of the surface from a managed domain
//! - [`header`] - C header rendering of a generated surface
//!
//! # Examples
//!
//! ```rust
//! use dotbridge::metadata::mangler::mangle;
//!
//! assert_eq!(mangle(&["First", "Second"], "Widget", "new", 0), "First_Second_Widget_new");
//! assert_eq!(mangle::<&str>(&[], "Widget", "new", 2), "Widget_new_2");
//! ```

/// Entry point bindings
pub mod binding;
/// C header emitter
pub mod header;
/// Flat symbol naming
pub mod mangler;
/// Surface generation
pub mod registry;
/// Type descriptors
pub mod typedesc;
