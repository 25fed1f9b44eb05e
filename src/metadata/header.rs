//! C header rendering of a generated surface.
//!
//! [`HeaderWriter`] turns a [`BindingRegistry`] into the declarations a native consumer
//! compiles against: opaque handle typedefs, enum typedefs with their constants, array
//! wrappers over `GArray`, the error report hook, and one prototype per entry point.
//!
//! | Descriptor | `in` / return | `out` / `ref` |
//! |------------|---------------|---------------|
//! | primitive | `int32_t`, `bool`, ... | `int32_t*` |
//! | string | `const char*` | `GString*` |
//! | enum | `<Flat>` | `<Flat>*` |
//! | object, struct | `<Flat>*` | `<Flat>**` |
//! | array | `_<Element>Array` | `_<Element>Array*` |

use std::{collections::BTreeSet, fmt::Write};

use crate::{
    metadata::{
        binding::{MethodBinding, ParamDirection},
        mangler::QualifiedName,
        registry::BindingRegistry,
        typedesc::{PrimitiveKind, TypeDescriptor},
    },
    runtime::{ClassKind, Domain},
};

/// Name of the array wrapper struct for an element type, e.g. `_Int32Array`.
#[must_use]
pub fn array_wrapper(element: &TypeDescriptor) -> String {
    let element_name = match element {
        TypeDescriptor::Void => "Void".to_string(),
        TypeDescriptor::Primitive(kind) => kind.to_string(),
        TypeDescriptor::String => "String".to_string(),
        TypeDescriptor::Enum(desc) => desc.name.flat(),
        TypeDescriptor::Struct(desc) => desc.name.flat(),
        TypeDescriptor::Array(inner) => array_wrapper(inner),
        TypeDescriptor::Object(name) => QualifiedName::parse(name).flat(),
    };
    format!("_{element_name}Array")
}

/// The C spelling of a descriptor in the given position.
#[must_use]
pub fn c_type(desc: &TypeDescriptor, direction: ParamDirection) -> String {
    let by_ref = direction != ParamDirection::In;
    let base = match desc {
        TypeDescriptor::Void => return "void".to_string(),
        TypeDescriptor::String if by_ref => return "GString*".to_string(),
        TypeDescriptor::String => "const char*".to_string(),
        TypeDescriptor::Primitive(kind) => kind.c_name().to_string(),
        TypeDescriptor::Enum(desc) => desc.name.flat(),
        TypeDescriptor::Struct(desc) => format!("{}*", desc.name.flat()),
        TypeDescriptor::Object(name) => format!("{}*", QualifiedName::parse(name).flat()),
        TypeDescriptor::Array(element) => array_wrapper(element),
    };
    if by_ref {
        format!("{base}*")
    } else {
        base
    }
}

/// C literal for enum bits, sign extended for signed underlying kinds.
fn enum_literal(underlying: PrimitiveKind, bits: u64) -> String {
    let suffix = if underlying.size() == 8 { "LL" } else { "" };
    if underlying.is_signed() {
        let shift = 64 - underlying.size() * 8;
        #[allow(clippy::cast_possible_wrap)]
        let value = ((bits << shift) as i64) >> shift;
        format!("{value}{suffix}")
    } else {
        format!("{bits}u{suffix}")
    }
}

fn collect_arrays(desc: &TypeDescriptor, out: &mut BTreeSet<String>) {
    if let TypeDescriptor::Array(element) = desc {
        out.insert(array_wrapper(element));
        collect_arrays(element, out);
    }
}

/// Renders the C header of a generated surface.
#[derive(Debug)]
pub struct HeaderWriter<'a> {
    domain: &'a Domain,
    registry: &'a BindingRegistry,
    guard: String,
}

impl<'a> HeaderWriter<'a> {
    /// Creates a writer with the default include guard.
    #[must_use]
    pub fn new(domain: &'a Domain, registry: &'a BindingRegistry) -> Self {
        HeaderWriter {
            domain,
            registry,
            guard: "DOTBRIDGE_GENERATED_H".to_string(),
        }
    }

    /// Sets the library name the include guard is derived from.
    #[must_use]
    pub fn library(mut self, name: &str) -> Self {
        let sanitized: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        self.guard = format!("{sanitized}_H");
        self
    }

    fn prototype(binding: &MethodBinding) -> String {
        let mut params = Vec::with_capacity(binding.native_arity());
        if binding.takes_instance() {
            params.push(format!("{}* object", binding.target.flat()));
        }
        for param in &binding.params {
            params.push(format!("{} {}", c_type(&param.ty, param.direction), param.name));
        }
        let params = if params.is_empty() {
            "void".to_string()
        } else {
            params.join(", ")
        };
        format!(
            "{} {}({});",
            c_type(&binding.ret, ParamDirection::In),
            binding.symbol,
            params
        )
    }

    /// Renders the complete header.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let guard = &self.guard;

        let _ = writeln!(out, "/* Generated by dotbridge. Do not edit. */");
        let _ = writeln!(out, "#ifndef {guard}");
        let _ = writeln!(out, "#define {guard}");
        out.push('\n');
        out.push_str("#include <stdbool.h>\n#include <stdint.h>\n#include <glib.h>\n\n");
        out.push_str("#ifdef __cplusplus\nextern \"C\" {\n#endif\n\n");

        let classes = self.domain.classes();

        let exposed = classes
            .iter()
            .filter(|c| c.kind() != ClassKind::Enum && c.kind() != ClassKind::Static);
        for class in exposed {
            let flat = class.name().flat();
            let _ = writeln!(out, "typedef struct {flat} {flat};");
        }
        out.push('\n');

        for class in &classes {
            let Some(desc) = class.enum_desc() else {
                continue;
            };
            let flat = class.name().flat();
            let _ = writeln!(
                out,
                "/* {}{} */",
                class.full_name(),
                if desc.flags { " [Flags]" } else { "" }
            );
            let _ = writeln!(out, "typedef {} {flat};", desc.underlying.c_name());
            for (member, bits) in &desc.members {
                let literal = enum_literal(desc.underlying, *bits);
                let _ = writeln!(out, "#define {flat}_{member} (({flat}){literal})");
            }
            out.push('\n');
        }

        let mut arrays = BTreeSet::new();
        for binding in self.registry.bindings() {
            collect_arrays(&binding.ret, &mut arrays);
            for param in &binding.params {
                collect_arrays(&param.ty, &mut arrays);
            }
        }
        for wrapper in &arrays {
            let _ = writeln!(out, "typedef struct {wrapper} {{ GArray* array; }} {wrapper};");
        }
        if !arrays.is_empty() {
            out.push('\n');
        }

        out.push_str("typedef struct dotbridge_error_report {\n");
        out.push_str("    uint32_t kind;\n    const char* symbol;\n");
        out.push_str("    const char* type_name;\n    const char* message;\n");
        out.push_str("} dotbridge_error_report;\n");
        out.push_str(
            "typedef void (*dotbridge_error_report_hook)(const dotbridge_error_report* report);\n",
        );
        out.push_str(
            "void dotbridge_install_error_report_hook(dotbridge_error_report_hook hook);\n",
        );
        out.push_str("uint32_t dotbridge_last_error_kind(void);\n");
        out.push_str("void dotbridge_clear_last_error(void);\n\n");

        let mut current: Option<&QualifiedName> = None;
        for binding in self.registry.bindings() {
            if current != Some(&binding.target) {
                let _ = writeln!(out, "/* {} */", binding.target);
                current = Some(&binding.target);
            }
            let _ = writeln!(out, "{}", Self::prototype(binding));
        }

        out.push_str("\n#ifdef __cplusplus\n}\n#endif\n\n");
        let _ = writeln!(out, "#endif /* {guard} */");
        out
    }
}
