//! Generation of the flat native surface from managed type metadata.
//!
//! [`BindingRegistry::generate`] walks the classes of a [`Domain`] in registration order
//! and their members in declaration order, producing one [`MethodBinding`] per native
//! entry point and one named constant per enum member:
//!
//! | Source | Entry points |
//! |--------|--------------|
//! | enum member | constant `<Flat>_<Member>` |
//! | class or struct without constructors | implicit `<Flat>_new` |
//! | public field | `<Flat>_get_<Name>`, `<Flat>_set_<Name>` unless read-only |
//! | constructor | `<Flat>_new`, `<Flat>_new_1`, ... |
//! | method, accessor, operator | `<Flat>_<Name>[_k]`, `<Flat>_get_<Name>`, `<Flat>_op_<Op>` |
//! | sequence type | `get_Count`, `get_Item`, `set_Item`, `Add`, `Remove` |
//!
//! Interface members are bound with [`MemberFlags::DISPATCH`], so the marshaling runtime
//! resolves the concrete implementation from the instance at call time.

use std::collections::HashMap;

use crate::{
    bridge::NativeValue,
    metadata::{
        binding::{
            MemberFlags, MemberKind, MethodBinding, ParamDescriptor, ParamDirection, SequenceOp,
        },
        mangler::{NameMangler, QualifiedName},
        typedesc::{PrimitiveKind, TypeDescriptor},
    },
    runtime::{ClassKind, Domain, ManagedClass},
    Error, Result,
};

/// All bindings and constants of one generated surface, addressable by symbol.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    bindings: Vec<MethodBinding>,
    by_symbol: HashMap<String, usize>,
    constants: Vec<(String, NativeValue)>,
    constant_index: HashMap<String, usize>,
}

impl BindingRegistry {
    /// Generates the surface of every class registered in `domain`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateSymbol`] if two entry points mangle to the same name and
    /// [`Error::Malformed`] for members that can not be bound (constructors with `out` or
    /// `ref` parameters, constructors on non-instantiable types).
    pub fn generate(domain: &Domain) -> Result<Self> {
        let mut registry = BindingRegistry::default();
        let mut mangler = NameMangler::new();

        for class in domain.classes() {
            registry.bind_class(&mut mangler, &class)?;
        }

        tracing::debug!(
            bindings = registry.bindings.len(),
            constants = registry.constants.len(),
            "binding surface generated"
        );
        Ok(registry)
    }

    fn bind_class(&mut self, mangler: &mut NameMangler, class: &ManagedClass) -> Result<()> {
        let name = class.name();

        if let Some(desc) = class.enum_desc() {
            for (member, bits) in &desc.members {
                let symbol = NameMangler::constant(name, member);
                self.add_constant(symbol, NativeValue::from_bits(desc.underlying, *bits))?;
            }
            return Ok(());
        }

        if class.is_instantiable() && !class.has_constructor() {
            let (symbol, rank) = mangler.constructor(name);
            self.add(MethodBinding {
                symbol,
                target: name.clone(),
                member: ".ctor".to_string(),
                kind: MemberKind::Constructor,
                flags: MemberFlags::IMPLICIT,
                params: Vec::new(),
                ret: class.descriptor(),
                rank,
                member_index: None,
            })?;
        }

        self.bind_fields(mangler, class)?;

        let dispatch = if class.kind() == ClassKind::Interface {
            MemberFlags::DISPATCH
        } else {
            MemberFlags::empty()
        };

        for (index, member) in class.members().iter().enumerate() {
            let ((symbol, rank), ret) = match member.kind {
                MemberKind::Constructor => {
                    if !class.is_instantiable() {
                        return Err(malformed_error!(
                            "{} {} declares a constructor",
                            class.kind(),
                            class.full_name()
                        ));
                    }
                    if member.params.iter().any(|p| p.direction != ParamDirection::In) {
                        return Err(malformed_error!(
                            "Constructor of {} takes out or ref parameters",
                            class.full_name()
                        ));
                    }
                    (mangler.constructor(name), class.descriptor())
                }
                MemberKind::Method => (mangler.method(name, &member.name), member.ret.clone()),
                MemberKind::Getter => (mangler.getter(name, &member.name), member.ret.clone()),
                MemberKind::Setter => (mangler.setter(name, &member.name), TypeDescriptor::Void),
                MemberKind::Operator(op) => (mangler.operator(name, op), member.ret.clone()),
                MemberKind::FieldGet | MemberKind::FieldSet | MemberKind::Sequence(_) => {
                    return Err(malformed_error!(
                        "Member {} of {} has a synthesized kind",
                        member.name,
                        class.full_name()
                    ))
                }
            };

            self.add(MethodBinding {
                symbol,
                target: name.clone(),
                member: member.name.clone(),
                kind: member.kind,
                flags: member.flags | dispatch,
                params: member.params.clone(),
                ret,
                rank,
                member_index: Some(index),
            })?;
        }

        if let Some(element) = class.element() {
            self.bind_sequence(mangler, name, element)?;
        }
        Ok(())
    }

    fn bind_fields(&mut self, mangler: &mut NameMangler, class: &ManagedClass) -> Result<()> {
        let name = class.name();
        for field in class.fields().iter().filter(|field| field.public) {
            let flags = if field.is_static {
                MemberFlags::STATIC | MemberFlags::IMPLICIT
            } else {
                MemberFlags::IMPLICIT
            };

            let (symbol, rank) = mangler.getter(name, &field.name);
            self.add(MethodBinding {
                symbol,
                target: name.clone(),
                member: field.name.clone(),
                kind: MemberKind::FieldGet,
                flags,
                params: Vec::new(),
                ret: field.ty.clone(),
                rank,
                member_index: None,
            })?;

            if field.readonly {
                continue;
            }
            let (symbol, rank) = mangler.setter(name, &field.name);
            self.add(MethodBinding {
                symbol,
                target: name.clone(),
                member: field.name.clone(),
                kind: MemberKind::FieldSet,
                flags,
                params: vec![ParamDescriptor::input("value", field.ty.clone())],
                ret: TypeDescriptor::Void,
                rank,
                member_index: None,
            })?;
        }
        Ok(())
    }

    fn bind_sequence(
        &mut self,
        mangler: &mut NameMangler,
        name: &QualifiedName,
        element: &TypeDescriptor,
    ) -> Result<()> {
        let index = || ParamDescriptor::input("index", PrimitiveKind::Int32.into());
        let value = || ParamDescriptor::input("value", element.clone());

        let count = TypeDescriptor::from(PrimitiveKind::Int32);
        let void = || TypeDescriptor::Void;

        let ops = [
            (mangler.getter(name, "Count"), SequenceOp::Count, vec![], count),
            (mangler.getter(name, "Item"), SequenceOp::GetAt, vec![index()], element.clone()),
            (mangler.setter(name, "Item"), SequenceOp::SetAt, vec![index(), value()], void()),
            (mangler.method(name, "Add"), SequenceOp::Add, vec![value()], void()),
            (mangler.method(name, "Remove"), SequenceOp::Remove, vec![value()], void()),
        ];

        for ((symbol, rank), op, params, ret) in ops {
            self.add(MethodBinding {
                symbol,
                target: name.clone(),
                member: op.to_string(),
                kind: MemberKind::Sequence(op),
                flags: MemberFlags::IMPLICIT,
                params,
                ret,
                rank,
                member_index: None,
            })?;
        }
        Ok(())
    }

    fn add(&mut self, binding: MethodBinding) -> Result<()> {
        if self.by_symbol.contains_key(&binding.symbol)
            || self.constant_index.contains_key(&binding.symbol)
        {
            return Err(Error::DuplicateSymbol(binding.symbol));
        }
        self.by_symbol.insert(binding.symbol.clone(), self.bindings.len());
        self.bindings.push(binding);
        Ok(())
    }

    fn add_constant(&mut self, symbol: String, value: NativeValue) -> Result<()> {
        if self.by_symbol.contains_key(&symbol) || self.constant_index.contains_key(&symbol) {
            return Err(Error::DuplicateSymbol(symbol));
        }
        self.constant_index.insert(symbol.clone(), self.constants.len());
        self.constants.push((symbol, value));
        Ok(())
    }

    /// Looks up the binding of an entry point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSymbol`] if no entry point has this name.
    pub fn get(&self, symbol: &str) -> Result<&MethodBinding> {
        self.by_symbol
            .get(symbol)
            .map(|index| &self.bindings[*index])
            .ok_or_else(|| Error::UnknownSymbol(symbol.to_string()))
    }

    /// Looks up a named constant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSymbol`] if no constant has this name.
    pub fn constant(&self, symbol: &str) -> Result<&NativeValue> {
        self.constant_index
            .get(symbol)
            .map(|index| &self.constants[*index].1)
            .ok_or_else(|| Error::UnknownSymbol(symbol.to_string()))
    }

    /// All bindings in generation order.
    #[must_use]
    pub fn bindings(&self) -> &[MethodBinding] {
        &self.bindings
    }

    /// All constants in generation order.
    #[must_use]
    pub fn constants(&self) -> &[(String, NativeValue)] {
        &self.constants
    }

    /// Entry point symbols in generation order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|binding| binding.symbol.as_str())
    }

    /// Number of entry points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if nothing was generated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.constants.is_empty()
    }
}
