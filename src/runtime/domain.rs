//! The managed domain: class registry, heap and execution of managed members.
//!
//! [`Domain`] is the managed side the bridge talks to. It owns the registered classes and
//! the [`ManagedHeap`], creates objects, runs constructors and static initializers,
//! dispatches instance members to the runtime class of their receiver, and implements
//! managed equality.
//!
//! # Dispatch
//!
//! Instance members are looked up on the runtime class of the receiver first and then
//! along its base chain, stopping at the class that declared the member. Interface
//! members have no body of their own and are always resolved this way.
//!
//! # Equality
//!
//! [`Domain::equals`] follows managed semantics:
//!
//! | Operands | Rule |
//! |----------|------|
//! | objects | `Equals(object)` if the class declares one, reference equality otherwise |
//! | value types | `op_Equality` if declared, field-by-field structural equality otherwise |
//! | primitives, strings | value equality |

use std::sync::Arc;

use dashmap::DashMap;

use crate::{
    metadata::{
        binding::{MemberKind, OperatorKind},
        typedesc::TypeDescriptor,
    },
    runtime::{
        exception, CallFrame, ClassKind, FieldDef, HeapObject, ManagedClass, ManagedHeap,
        ManagedMember, ManagedValue, ObjectRef, StructValue,
    },
    Error, Result,
};

/// Registry of managed types plus the heap their instances live on.
#[derive(Debug, Default)]
pub struct Domain {
    classes: DashMap<Arc<str>, Arc<ManagedClass>>,
    order: boxcar::Vec<Arc<ManagedClass>>,
    heap: ManagedHeap,
}

impl Domain {
    /// Creates an empty domain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if a class with the same name is already registered.
    pub fn register(&self, class: ManagedClass) -> Result<Arc<ManagedClass>> {
        let name = class.full_name_arc();
        if self.classes.contains_key(&name) {
            return Err(malformed_error!("Type {} is registered twice", name));
        }

        let class = Arc::new(class);
        self.classes.insert(name, class.clone());
        self.order.push(class.clone());
        Ok(class)
    }

    /// Looks up a class by fully qualified name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeNotFound`] if no such class is registered.
    pub fn class(&self, name: &str) -> Result<Arc<ManagedClass>> {
        self.classes
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::TypeNotFound(name.to_string()))
    }

    /// All classes in registration order.
    #[must_use]
    pub fn classes(&self) -> Vec<Arc<ManagedClass>> {
        self.order.iter().map(|(_, class)| class.clone()).collect()
    }

    /// Number of registered classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.count()
    }

    /// Returns `true` if no classes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The heap holding all reference-typed objects.
    #[must_use]
    pub fn heap(&self) -> &ManagedHeap {
        &self.heap
    }

    /// The class followed by all of its base classes, most derived first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeNotFound`] if a base class is not registered and
    /// [`Error::Malformed`] for cyclic inheritance.
    pub fn base_chain(&self, class: &Arc<ManagedClass>) -> Result<Vec<Arc<ManagedClass>>> {
        let mut chain = vec![class.clone()];
        let mut current = class.clone();
        while let Some(base) = current.base() {
            let next = self.class(base)?;
            if chain.iter().any(|seen| seen.full_name() == next.full_name()) {
                return Err(malformed_error!("Cyclic inheritance through {}", base));
            }
            chain.push(next.clone());
            current = next;
        }
        Ok(chain)
    }

    /// Returns `true` if a value of type `from` can be used where `to` is expected.
    #[must_use]
    pub fn is_assignable(&self, from: &str, to: &str) -> bool {
        if from == to || to == "System.Object" {
            return true;
        }
        let Ok(class) = self.class(from) else {
            return false;
        };
        class.base().is_some_and(|base| self.is_assignable(base, to))
            || class
                .interfaces()
                .any(|interface| self.is_assignable(interface, to))
    }

    /// The runtime class of an object or struct value.
    ///
    /// # Errors
    ///
    /// Throws `System.NullReferenceException` for null and returns
    /// [`Error::TypeMismatch`] for values that have no class (primitives, arrays).
    pub fn class_of(&self, value: &ManagedValue) -> Result<Arc<ManagedClass>> {
        match value {
            ManagedValue::Null => throw!(
                exception::NULL_REFERENCE,
                "Object reference not set to an instance of an object."
            ),
            ManagedValue::Struct(value) => self.class(value.type_name()),
            ManagedValue::Object(object) => {
                let name = self.heap.with(*object, |obj| match obj {
                    HeapObject::Instance { class, .. } | HeapObject::List { class, .. } => {
                        Some(class.to_string())
                    }
                    HeapObject::Boxed(value) => Some(value.type_name().to_string()),
                    HeapObject::Array { .. } => None,
                })?;
                match name {
                    Some(name) => self.class(&name),
                    None => Err(Error::TypeMismatch {
                        expected: "class instance".to_string(),
                        found: "array".to_string(),
                    }),
                }
            }
            other => Err(Error::TypeMismatch {
                expected: "class instance".to_string(),
                found: other.describe(),
            }),
        }
    }

    /// Instance field layout of a class, base class fields first.
    ///
    /// # Errors
    ///
    /// Fails if the base chain can not be resolved.
    pub fn instance_layout(&self, class: &Arc<ManagedClass>) -> Result<Vec<FieldDef>> {
        let mut layout = Vec::new();
        for owner in self.base_chain(class)?.iter().rev() {
            layout.extend(owner.fields().iter().filter(|f| !f.is_static).cloned());
        }
        Ok(layout)
    }

    fn field_slot(&self, class: &Arc<ManagedClass>, name: &str) -> Result<(usize, TypeDescriptor)> {
        let layout = self.instance_layout(class)?;
        // Derived fields shadow base fields of the same name.
        layout
            .iter()
            .enumerate()
            .rev()
            .find(|(_, field)| field.name == name)
            .map(|(index, field)| (index, field.ty.clone()))
            .ok_or_else(|| Error::MemberNotFound {
                type_name: class.full_name().to_string(),
                member: name.to_string(),
            })
    }

    /// Reads an instance field of an object or struct.
    ///
    /// # Errors
    ///
    /// Throws `System.NullReferenceException` for a null receiver and returns
    /// [`Error::MemberNotFound`] if the field does not exist.
    pub fn get_field(&self, this: &ManagedValue, name: &str) -> Result<ManagedValue> {
        let class = self.class_of(this)?;
        let (slot, _) = self.field_slot(&class, name)?;
        let missing = || Error::MemberNotFound {
            type_name: class.full_name().to_string(),
            member: name.to_string(),
        };

        match this {
            ManagedValue::Struct(value) => value.field(slot).cloned().ok_or_else(missing),
            ManagedValue::Object(object) => self
                .heap
                .with(*object, |obj| match obj {
                    HeapObject::Instance { fields, .. } => fields.get(slot).cloned(),
                    HeapObject::Boxed(value) => value.field(slot).cloned(),
                    _ => None,
                })?
                .ok_or_else(missing),
            _ => Err(missing()),
        }
    }

    /// Writes an instance field. Struct receivers are updated in place.
    ///
    /// # Errors
    ///
    /// Throws `System.NullReferenceException` for a null receiver and returns
    /// [`Error::MemberNotFound`] or [`Error::TypeMismatch`] on layout or type errors.
    pub fn set_field(
        &self,
        this: &mut ManagedValue,
        name: &str,
        value: ManagedValue,
    ) -> Result<()> {
        let class = self.class_of(this)?;
        let (slot, ty) = self.field_slot(&class, name)?;
        ty.check(&value)?;

        let stored = match this {
            ManagedValue::Struct(target) => target.set_field(slot, value),
            ManagedValue::Object(object) => self.heap.with_mut(*object, |obj| match obj {
                HeapObject::Instance { fields, .. } => match fields.get_mut(slot) {
                    Some(field) => {
                        *field = value;
                        true
                    }
                    None => false,
                },
                HeapObject::Boxed(target) => target.set_field(slot, value),
                _ => false,
            })?,
            _ => false,
        };

        if stored {
            Ok(())
        } else {
            Err(Error::MemberNotFound {
                type_name: class.full_name().to_string(),
                member: name.to_string(),
            })
        }
    }

    /// Reads a static field, running the static initializer first if needed.
    ///
    /// # Errors
    ///
    /// Throws `System.TypeInitializationException` if the type is unusable.
    pub fn get_static(&self, type_name: &str, name: &str) -> Result<ManagedValue> {
        let class = self.class(type_name)?;
        class.ensure_initialized(self)?;
        class.read_static(name)
    }

    /// Writes a static field, running the static initializer first if needed.
    ///
    /// # Errors
    ///
    /// Throws `System.TypeInitializationException` if the type is unusable.
    pub fn set_static(&self, type_name: &str, name: &str, value: ManagedValue) -> Result<()> {
        let class = self.class(type_name)?;
        class.ensure_initialized(self)?;
        if let Some(field) = class.fields().iter().find(|f| f.is_static && f.name == name) {
            field.ty.check(&value)?;
        }
        class.write_static(name, value)
    }

    /// Allocates an uninitialized instance: fields hold their initializers or defaults and
    /// no constructor has run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] for types that can not be instantiated.
    pub fn allocate(&self, class: &Arc<ManagedClass>) -> Result<ManagedValue> {
        match class.kind() {
            ClassKind::Struct => {
                let layout = class.struct_desc().ok_or_else(|| {
                    malformed_error!("Value type {} has no layout", class.full_name())
                })?;
                Ok(ManagedValue::Struct(layout.default_value()))
            }
            ClassKind::Class => {
                let object = match class.element() {
                    Some(element) => HeapObject::List {
                        class: class.full_name_arc(),
                        element: element.clone(),
                        items: Vec::new(),
                    },
                    None => HeapObject::Instance {
                        class: class.full_name_arc(),
                        fields: self
                            .instance_layout(class)?
                            .iter()
                            .map(FieldDef::initial_value)
                            .collect(),
                    },
                };
                Ok(ManagedValue::Object(self.heap.alloc(object)?))
            }
            kind => Err(malformed_error!(
                "Type {} of kind {} can not be instantiated",
                class.full_name(),
                kind
            )),
        }
    }

    /// Allocates an array.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if an element does not fit the element type.
    pub fn new_array(
        &self,
        element: TypeDescriptor,
        elements: Vec<ManagedValue>,
    ) -> Result<ManagedValue> {
        for value in &elements {
            element.check(value)?;
        }
        Ok(ManagedValue::Object(
            self.heap.alloc(HeapObject::Array { element, elements })?,
        ))
    }

    /// Boxes a struct value into a fresh heap object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the heap lock is poisoned.
    pub fn box_value(&self, value: StructValue) -> Result<ObjectRef> {
        self.heap.alloc(HeapObject::Boxed(value))
    }

    /// Index of the constructor whose parameters accept `args`.
    ///
    /// `Ok(None)` selects the implicit default constructor of a class that declares none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MemberNotFound`] if no constructor matches.
    pub fn resolve_constructor(
        &self,
        class: &ManagedClass,
        args: &[ManagedValue],
    ) -> Result<Option<usize>> {
        if !class.has_constructor() && args.is_empty() {
            return Ok(None);
        }
        class
            .members()
            .iter()
            .position(|m| m.kind == MemberKind::Constructor && m.accepts(args))
            .map(Some)
            .ok_or_else(|| Error::MemberNotFound {
                type_name: class.full_name().to_string(),
                member: format!(".ctor/{}", args.len()),
            })
    }

    /// Runs a constructor on an allocated instance and returns the constructed value.
    ///
    /// For value types the returned value is the initialized struct; for classes it is the
    /// unchanged object reference.
    ///
    /// # Errors
    ///
    /// Propagates exceptions thrown by the static initializer or the constructor body.
    pub fn run_constructor(
        &self,
        class: &Arc<ManagedClass>,
        constructor: Option<usize>,
        this: ManagedValue,
        args: Vec<ManagedValue>,
    ) -> Result<ManagedValue> {
        class.ensure_initialized(self)?;
        let Some(index) = constructor else {
            return Ok(this);
        };

        let member = class.member(index)?;
        if member.kind != MemberKind::Constructor {
            return Err(malformed_error!(
                "Member {} of {} is not a constructor",
                member.name,
                class.full_name()
            ));
        }

        let mut frame = CallFrame::with_this(this, args);
        self.execute(class, member, &mut frame)?;
        frame.this.ok_or_else(|| {
            malformed_error!("Constructor of {} dropped its instance", class.full_name())
        })
    }

    /// Creates and constructs an object, picking the constructor that accepts `args`.
    ///
    /// # Errors
    ///
    /// Propagates static initializer and constructor exceptions.
    pub fn new_object(&self, type_name: &str, args: Vec<ManagedValue>) -> Result<ManagedValue> {
        let class = self.class(type_name)?;
        class.ensure_initialized(self)?;
        let constructor = self.resolve_constructor(&class, &args)?;
        let this = self.allocate(&class)?;
        self.run_constructor(&class, constructor, this, args)
    }

    /// Runs the base class constructor accepting `args` on `this`.
    ///
    /// Called from constructor bodies of `declaring` to chain to their base.
    ///
    /// # Errors
    ///
    /// Propagates exceptions thrown by the base constructor.
    pub fn call_base_constructor(
        &self,
        declaring: &str,
        this: &ManagedValue,
        args: Vec<ManagedValue>,
    ) -> Result<()> {
        let class = self.class(declaring)?;
        let base_name = class
            .base()
            .ok_or_else(|| malformed_error!("Type {} has no base class", declaring))?;
        let base = self.class(base_name)?;
        let constructor = self.resolve_constructor(&base, &args)?;
        self.run_constructor(&base, constructor, this.clone(), args)?;
        Ok(())
    }

    fn execute(
        &self,
        class: &ManagedClass,
        member: &ManagedMember,
        frame: &mut CallFrame,
    ) -> Result<ManagedValue> {
        tracing::trace!(
            class = %class.full_name(),
            member = %member.name,
            "executing managed member"
        );
        match &member.body {
            Some(body) => body(self, frame),
            None => Err(Error::MemberNotFound {
                type_name: class.full_name().to_string(),
                member: member.name.clone(),
            }),
        }
    }

    /// Finds the implementation of `member` (declared on `declaring`) for the runtime class
    /// of the receiver.
    fn dispatch(
        &self,
        declaring: &Arc<ManagedClass>,
        member_index: usize,
        receiver: &Arc<ManagedClass>,
    ) -> Result<(Arc<ManagedClass>, usize)> {
        let member = declaring.member(member_index)?;
        for class in self.base_chain(receiver)? {
            if class.full_name() == declaring.full_name() {
                break;
            }
            if let Some(index) = class.find_implementation(member) {
                return Ok((class, index));
            }
        }

        if member.body.is_some() {
            return Ok((declaring.clone(), member_index));
        }
        Err(Error::MemberNotFound {
            type_name: receiver.full_name().to_string(),
            member: member.name.clone(),
        })
    }

    /// Invokes member `member_index` of `class`.
    ///
    /// Static members run the static initializer first. Instance members are dispatched to
    /// the runtime class of `frame.this`, which must be assignable to `class`.
    ///
    /// # Errors
    ///
    /// Propagates managed exceptions and returns [`Error::TypeMismatch`] if the receiver
    /// has the wrong type.
    pub fn invoke(
        &self,
        class: &Arc<ManagedClass>,
        member_index: usize,
        frame: &mut CallFrame,
    ) -> Result<ManagedValue> {
        let member = class.member(member_index)?;
        if member.is_static() {
            class.ensure_initialized(self)?;
            return self.execute(class, member, frame);
        }

        let receiver = self.class_of(frame.this.as_ref().unwrap_or(&ManagedValue::Null))?;
        if !self.is_assignable(receiver.full_name(), class.full_name()) {
            return Err(Error::TypeMismatch {
                expected: class.full_name().to_string(),
                found: receiver.full_name().to_string(),
            });
        }

        let (target, index) = self.dispatch(class, member_index, &receiver)?;
        let member = target.member(index)?;
        self.execute(&target, member, frame)
    }

    fn find_instance_member(
        &self,
        this: &ManagedValue,
        name: &str,
        kind: MemberKind,
        args: &[ManagedValue],
    ) -> Result<(Arc<ManagedClass>, usize)> {
        let receiver = self.class_of(this)?;
        for class in self.base_chain(&receiver)? {
            let found = class.members().iter().position(|m| {
                m.kind == kind
                    && m.name == name
                    && !m.is_static()
                    && m.body.is_some()
                    && m.accepts(args)
            });
            if let Some(index) = found {
                return Ok((class, index));
            }
        }
        Err(Error::MemberNotFound {
            type_name: receiver.full_name().to_string(),
            member: name.to_string(),
        })
    }

    /// Calls an instance method by name on the runtime class of `this`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MemberNotFound`] if no method accepts `args`, and propagates
    /// managed exceptions.
    pub fn call(
        &self,
        this: &ManagedValue,
        name: &str,
        args: Vec<ManagedValue>,
    ) -> Result<ManagedValue> {
        let (class, index) = self.find_instance_member(this, name, MemberKind::Method, &args)?;
        let mut frame = CallFrame::with_this(this.clone(), args);
        self.execute(&class, class.member(index)?, &mut frame)
    }

    /// Reads an instance property by name on the runtime class of `this`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MemberNotFound`] if there is no such getter.
    pub fn get_property(&self, this: &ManagedValue, name: &str) -> Result<ManagedValue> {
        let (class, index) = self.find_instance_member(this, name, MemberKind::Getter, &[])?;
        let mut frame = CallFrame::with_this(this.clone(), Vec::new());
        self.execute(&class, class.member(index)?, &mut frame)
    }

    /// Calls a static method by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MemberNotFound`] if no static method accepts `args`, and propagates
    /// managed exceptions.
    pub fn call_static(
        &self,
        type_name: &str,
        name: &str,
        args: Vec<ManagedValue>,
    ) -> Result<ManagedValue> {
        let class = self.class(type_name)?;
        let index = class
            .members()
            .iter()
            .position(|m| {
                m.kind == MemberKind::Method && m.name == name && m.is_static() && m.accepts(&args)
            })
            .ok_or_else(|| Error::MemberNotFound {
                type_name: type_name.to_string(),
                member: name.to_string(),
            })?;
        let mut frame = CallFrame::new(args);
        self.invoke(&class, index, &mut frame)
    }

    /// Managed equality of two values.
    ///
    /// # Errors
    ///
    /// Propagates exceptions thrown by user-defined `Equals` or `op_Equality`.
    pub fn equals(&self, a: &ManagedValue, b: &ManagedValue) -> Result<bool> {
        match (a, b) {
            (ManagedValue::Null, ManagedValue::Null) => Ok(true),
            (ManagedValue::Null, _) | (_, ManagedValue::Null) => Ok(false),
            (ManagedValue::Object(x), ManagedValue::Object(y)) => {
                // Arrays have no class and fall back to reference equality.
                let overridden = self
                    .find_instance_member(a, "Equals", MemberKind::Method, &[b.clone()])
                    .ok();
                match overridden {
                    Some((class, index)) => {
                        let mut frame = CallFrame::with_this(a.clone(), vec![b.clone()]);
                        let result = self.execute(&class, class.member(index)?, &mut frame)?;
                        Ok(result.as_bool().unwrap_or(false))
                    }
                    None => Ok(x == y),
                }
            }
            (ManagedValue::Struct(x), ManagedValue::Struct(y)) => {
                if x.type_name() != y.type_name() {
                    return Ok(false);
                }
                let class = self.class(x.type_name())?;
                if let Some(index) = class.find_member(
                    &OperatorKind::Equality.to_string(),
                    MemberKind::Operator(OperatorKind::Equality),
                ) {
                    let mut frame = CallFrame::new(vec![a.clone(), b.clone()]);
                    let result = self.invoke(&class, index, &mut frame)?;
                    return Ok(result.as_bool().unwrap_or(false));
                }
                for (left, right) in x.fields().iter().zip(y.fields()) {
                    if !self.equals(left, right)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (x, y) => Ok(x == y),
        }
    }

    /// Runs a collection, treating all static fields and `roots` as live.
    ///
    /// Returns the number of objects freed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if a lock is poisoned.
    pub fn collect(&self, roots: &[ManagedValue]) -> Result<usize> {
        let mut live = roots.to_vec();
        for (_, class) in self.order.iter() {
            live.extend(class.static_values()?);
        }
        let freed = self.heap.collect(&live)?;
        tracing::debug!(freed, remaining = self.heap.len(), "managed heap collected");
        Ok(freed)
    }
}
