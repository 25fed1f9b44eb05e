//! Deterministic mapping of managed member identities to flat native symbol names.
//!
//! Every generated entry point is named from four inputs: the namespace path, the type
//! name, the member name and the overload rank. Segments are joined with
//! [`SEPARATOR`], in order, without reordering or deduplication, so that
//! `First.Second.ClassWithNestedNamespace.ToString` becomes
//! `First_Second_ClassWithNestedNamespace_ToString`.
//!
//! # Overload Ranks
//!
//! The first declaration of a member name in a type gets rank `0` and no suffix; the
//! `k`-th subsequent declaration gets the suffix `_k`. Ranks follow declaration order
//! only, never parameter count or parameter types, which keeps the mapping stable across
//! regenerations as long as the declaration order is stable.
//!
//! | Member | Symbol |
//! |--------|--------|
//! | first constructor | `<Type>_new` |
//! | second constructor | `<Type>_new_1` |
//! | property getter / setter | `<Type>_get_<Name>` / `<Type>_set_<Name>` |
//! | operator | `<Type>_op_<OperatorName>` |
//! | method | `<Type>_<Name>[_<k>]` |

use std::{collections::HashMap, fmt};

use crate::metadata::binding::OperatorKind;

/// Separator placed between namespace segments, type name, member name and rank suffix.
pub const SEPARATOR: char = '_';

/// A managed type name split into its namespace path and simple name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    /// Namespace segments, outermost first (possibly empty)
    pub namespace: Vec<String>,
    /// Simple type name
    pub name: String,
}

impl QualifiedName {
    /// Creates a qualified name from its parts.
    #[must_use]
    pub fn new(namespace: &[&str], name: &str) -> Self {
        QualifiedName {
            namespace: namespace.iter().map(ToString::to_string).collect(),
            name: name.to_string(),
        }
    }

    /// Splits a dotted managed name (`First.Second.Type`) into namespace and name.
    #[must_use]
    pub fn parse(dotted: &str) -> Self {
        match dotted.rsplit_once('.') {
            Some((namespace, name)) => QualifiedName {
                namespace: namespace.split('.').map(ToString::to_string).collect(),
                name: name.to_string(),
            },
            None => QualifiedName {
                namespace: Vec::new(),
                name: dotted.to_string(),
            },
        }
    }

    /// The flattened native type name: namespace segments and name joined by [`SEPARATOR`].
    #[must_use]
    pub fn flat(&self) -> String {
        let mut flat = String::new();
        for segment in &self.namespace {
            flat.push_str(segment);
            flat.push(SEPARATOR);
        }
        flat.push_str(&self.name);
        flat
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.namespace {
            write!(f, "{segment}.")?;
        }
        write!(f, "{}", self.name)
    }
}

/// Builds a flat symbol name.
///
/// ## Arguments
/// * `namespace` - Namespace segments, outermost first
/// * `type_name` - The simple type name
/// * `member`    - The member part (`new`, `get_Answer`, `op_Addition`, `Concat`, ...)
/// * `rank`      - Overload rank; `0` adds no suffix
///
/// # Examples
///
/// ```rust
/// use dotbridge::metadata::mangler::mangle;
///
/// assert_eq!(mangle(&["Constructors"], "Unique", "new", 1), "Constructors_Unique_new_1");
/// assert_eq!(
///     mangle::<&str>(&[], "ClassWithoutNamespace", "ToString", 0),
///     "ClassWithoutNamespace_ToString"
/// );
/// ```
#[must_use]
pub fn mangle<S: AsRef<str>>(
    namespace: &[S],
    type_name: &str,
    member: &str,
    rank: usize,
) -> String {
    let mut symbol = String::new();
    for segment in namespace {
        symbol.push_str(segment.as_ref());
        symbol.push(SEPARATOR);
    }
    symbol.push_str(type_name);
    symbol.push(SEPARATOR);
    symbol.push_str(member);
    if rank > 0 {
        symbol.push(SEPARATOR);
        symbol.push_str(&rank.to_string());
    }
    symbol
}

/// Assigns overload ranks in declaration order and produces symbol names.
///
/// One mangler is used per generation pass. Each call for the same `(type, member)` pair
/// receives the next rank.
#[derive(Debug, Default)]
pub struct NameMangler {
    ranks: HashMap<(String, String), usize>,
}

impl NameMangler {
    /// Creates a mangler with no declarations seen yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the next rank for `member` in `ty` and returns `(symbol, rank)`.
    pub fn claim(&mut self, ty: &QualifiedName, member: &str) -> (String, usize) {
        let counter = self
            .ranks
            .entry((ty.flat(), member.to_string()))
            .or_insert(0);
        let rank = *counter;
        *counter += 1;

        (mangle(ty.namespace.as_slice(), &ty.name, member, rank), rank)
    }

    /// Mangles the next constructor declaration.
    pub fn constructor(&mut self, ty: &QualifiedName) -> (String, usize) {
        self.claim(ty, "new")
    }

    /// Mangles the next method declaration named `name`.
    pub fn method(&mut self, ty: &QualifiedName, name: &str) -> (String, usize) {
        self.claim(ty, name)
    }

    /// Mangles a property or field getter.
    pub fn getter(&mut self, ty: &QualifiedName, name: &str) -> (String, usize) {
        self.claim(ty, &format!("get_{name}"))
    }

    /// Mangles a property or field setter.
    pub fn setter(&mut self, ty: &QualifiedName, name: &str) -> (String, usize) {
        self.claim(ty, &format!("set_{name}"))
    }

    /// Mangles an operator overload.
    pub fn operator(&mut self, ty: &QualifiedName, op: OperatorKind) -> (String, usize) {
        self.claim(ty, &op.to_string())
    }

    /// Mangles a named constant such as an enum member. Constants never carry a rank.
    #[must_use]
    pub fn constant(ty: &QualifiedName, name: &str) -> String {
        mangle(ty.namespace.as_slice(), &ty.name, name, 0)
    }
}
