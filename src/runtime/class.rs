//! Managed type metadata and member bodies.
//!
//! A [`ManagedClass`] describes one managed type: its kind, its base type and
//! interfaces, its fields, and its members in declaration order. Members carry an
//! optional [`Body`]; interface members have none and are always dispatched to the
//! concrete implementation at call time.
//!
//! Classes are built with [`ClassBuilder`] and registered in a
//! [`Domain`](crate::runtime::Domain).
//!
//! # Static Initialization
//!
//! Each class owns a static initialization state machine:
//!
//! ```text
//! Uninitialized -> Running(thread) -> Initialized
//!                                  \-> Failed(exception)
//! ```
//!
//! `Failed` is permanent. Every later touch of the type raises
//! `System.TypeInitializationException` wrapping the original exception, without running
//! the initializer again. The initializing thread may re-enter the type while it is
//! `Running`; other threads block until the initializer finishes.

use std::{
    fmt,
    sync::{Arc, Condvar, Mutex, RwLock},
    thread::{self, ThreadId},
};

use strum::Display;

use crate::{
    metadata::{
        binding::{MemberFlags, MemberKind, OperatorKind, ParamDescriptor},
        mangler::QualifiedName,
        typedesc::{EnumDescriptor, StructDescriptor, TypeDescriptor},
    },
    runtime::{exception, Domain, ManagedException, ManagedValue, ObjectRef, StructValue},
    Error, Result,
};

/// Executable body of a managed member.
///
/// Bodies receive the domain (to allocate objects, read fields or call other members) and
/// the call frame. They return the member's result, or throw by returning
/// [`Error::ManagedFault`].
pub type Body = Arc<dyn Fn(&Domain, &mut CallFrame) -> Result<ManagedValue> + Send + Sync>;

/// Arguments of one managed invocation.
///
/// `out` and `ref` parameters are written back by assigning to their slot in `args`.
#[derive(Debug, Clone, Default)]
pub struct CallFrame {
    /// The instance, `None` for static members
    pub this: Option<ManagedValue>,
    /// Arguments in declaration order
    pub args: Vec<ManagedValue>,
}

impl CallFrame {
    /// Creates a frame for a static member.
    #[must_use]
    pub fn new(args: Vec<ManagedValue>) -> Self {
        CallFrame { this: None, args }
    }

    /// Creates a frame for an instance member.
    #[must_use]
    pub fn with_this(this: ManagedValue, args: Vec<ManagedValue>) -> Self {
        CallFrame {
            this: Some(this),
            args,
        }
    }

    /// Returns the argument at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the frame has fewer arguments.
    pub fn arg(&self, index: usize) -> Result<&ManagedValue> {
        self.args
            .get(index)
            .ok_or_else(|| malformed_error!("Missing argument {}", index))
    }

    /// Assigns an `out` or `ref` argument.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the frame has fewer arguments.
    pub fn set_arg(&mut self, index: usize, value: impl Into<ManagedValue>) -> Result<()> {
        match self.args.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => Err(malformed_error!("Missing argument {}", index)),
        }
    }

    /// Returns an integer argument widened to `i64`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the argument is not an integer.
    pub fn arg_i64(&self, index: usize) -> Result<i64> {
        let value = self.arg(index)?;
        value.as_i64().ok_or_else(|| Error::TypeMismatch {
            expected: "integer".to_string(),
            found: value.describe(),
        })
    }

    /// Returns an `int` argument.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the argument is not an `int`.
    pub fn arg_i32(&self, index: usize) -> Result<i32> {
        let value = self.arg(index)?;
        value.as_i32().ok_or_else(|| Error::TypeMismatch {
            expected: "System.Int32".to_string(),
            found: value.describe(),
        })
    }

    /// Returns a `bool` argument.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the argument is not a `bool`.
    pub fn arg_bool(&self, index: usize) -> Result<bool> {
        let value = self.arg(index)?;
        value.as_bool().ok_or_else(|| Error::TypeMismatch {
            expected: "System.Boolean".to_string(),
            found: value.describe(),
        })
    }

    /// Returns a string argument; `None` for a null string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the argument is neither a string nor null.
    pub fn arg_str(&self, index: usize) -> Result<Option<&str>> {
        match self.arg(index)? {
            ManagedValue::String(s) => Ok(Some(s)),
            ManagedValue::Null => Ok(None),
            other => Err(Error::TypeMismatch {
                expected: "System.String".to_string(),
                found: other.describe(),
            }),
        }
    }

    /// Returns the instance as a heap reference.
    ///
    /// # Errors
    ///
    /// Throws `System.NullReferenceException` for a missing or null instance and returns
    /// [`Error::TypeMismatch`] if the instance is a value type.
    pub fn this_object(&self) -> Result<ObjectRef> {
        match &self.this {
            Some(ManagedValue::Object(r)) => Ok(*r),
            Some(ManagedValue::Null) | None => {
                throw!(
                    exception::NULL_REFERENCE,
                    "Object reference not set to an instance of an object."
                )
            }
            Some(other) => Err(Error::TypeMismatch {
                expected: "object".to_string(),
                found: other.describe(),
            }),
        }
    }

    /// Returns the value type instance for in-place mutation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the instance is not an unboxed struct.
    pub fn this_struct(&mut self) -> Result<&mut StructValue> {
        match &mut self.this {
            Some(ManagedValue::Struct(value)) => Ok(value),
            other => Err(Error::TypeMismatch {
                expected: "value type".to_string(),
                found: other
                    .as_ref()
                    .map_or_else(|| "none".to_string(), ManagedValue::describe),
            }),
        }
    }
}

/// Category of a managed type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ClassKind {
    /// Reference type
    Class,
    /// Value type
    Struct,
    /// Interface, members are dispatched to implementations
    Interface,
    /// Enumeration
    Enum,
    /// Static class, never instantiated
    Static,
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: TypeDescriptor,
    /// Static fields live on the class, instance fields on each object
    pub is_static: bool,
    /// Read-only and constant fields get no generated setter
    pub readonly: bool,
    /// Public fields get generated accessors
    pub public: bool,
    /// Initial value; the type default when absent
    pub init: Option<ManagedValue>,
}

impl FieldDef {
    /// An instance field.
    #[must_use]
    pub fn instance(name: &str, ty: TypeDescriptor) -> Self {
        FieldDef {
            name: name.to_string(),
            ty,
            is_static: false,
            readonly: false,
            public: false,
            init: None,
        }
    }

    /// A static field.
    #[must_use]
    pub fn shared(name: &str, ty: TypeDescriptor) -> Self {
        FieldDef {
            is_static: true,
            ..FieldDef::instance(name, ty)
        }
    }

    /// Marks the field read-only.
    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Marks the field public, so native code can reach it through accessors.
    #[must_use]
    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    /// Sets the field initializer.
    #[must_use]
    pub fn with_init(mut self, value: impl Into<ManagedValue>) -> Self {
        self.init = Some(value.into());
        self
    }

    /// The value the field holds before any code runs.
    #[must_use]
    pub fn initial_value(&self) -> ManagedValue {
        self.init.clone().unwrap_or_else(|| self.ty.default_managed())
    }
}

/// A member declaration.
#[derive(Clone)]
pub struct ManagedMember {
    /// Member name; property name for accessors, special name for operators
    pub name: String,
    /// Member kind
    pub kind: MemberKind,
    /// Static or instance
    pub flags: MemberFlags,
    /// Declared parameters
    pub params: Vec<ParamDescriptor>,
    /// Declared return type
    pub ret: TypeDescriptor,
    /// Body; `None` for interface members
    pub body: Option<Body>,
}

impl ManagedMember {
    /// Returns `true` for static members.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MemberFlags::STATIC)
    }

    /// Returns `true` if `other` has the same name, kind and parameter list, so that one
    /// implements or overrides the other.
    #[must_use]
    pub fn same_signature(&self, other: &ManagedMember) -> bool {
        self.name == other.name && self.kind == other.kind && self.params == other.params
    }

    /// Returns `true` if `args` fit the declared parameter types.
    #[must_use]
    pub fn accepts(&self, args: &[ManagedValue]) -> bool {
        self.params.len() == args.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(param, arg)| param.ty.check(arg).is_ok())
    }
}

impl fmt::Debug for ManagedMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedMember")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("flags", &self.flags)
            .field("params", &self.params.len())
            .field("ret", &self.ret)
            .field("body", &self.body.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
enum InitState {
    Uninitialized,
    Running(ThreadId),
    Initialized,
    Failed(ManagedException),
}

/// A registered managed type.
pub struct ManagedClass {
    name: QualifiedName,
    full_name: Arc<str>,
    kind: ClassKind,
    base: Option<Arc<str>>,
    interfaces: Vec<Arc<str>>,
    fields: Vec<FieldDef>,
    members: Vec<ManagedMember>,
    static_init: Option<Body>,
    element: Option<TypeDescriptor>,
    enum_desc: Option<Arc<EnumDescriptor>>,
    struct_desc: Option<Arc<StructDescriptor>>,
    statics: RwLock<Vec<ManagedValue>>,
    init_state: Mutex<InitState>,
    init_done: Condvar,
}

impl ManagedClass {
    /// Qualified name split into namespace and simple name.
    #[must_use]
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    /// Fully qualified dotted name.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Shared fully qualified name.
    #[must_use]
    pub fn full_name_arc(&self) -> Arc<str> {
        self.full_name.clone()
    }

    /// Type category.
    #[must_use]
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Base class name.
    #[must_use]
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// Names of directly implemented interfaces.
    pub fn interfaces(&self) -> impl Iterator<Item = &str> {
        self.interfaces.iter().map(AsRef::as_ref)
    }

    /// Declared fields in order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Declared members in order.
    #[must_use]
    pub fn members(&self) -> &[ManagedMember] {
        &self.members
    }

    /// Returns the member at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MemberNotFound`] if the index is out of range.
    pub fn member(&self, index: usize) -> Result<&ManagedMember> {
        self.members.get(index).ok_or_else(|| Error::MemberNotFound {
            type_name: self.full_name.to_string(),
            member: format!("#{index}"),
        })
    }

    /// Returns the index of the first member with this name and kind.
    #[must_use]
    pub fn find_member(&self, name: &str, kind: MemberKind) -> Option<usize> {
        self.members
            .iter()
            .position(|member| member.kind == kind && member.name == name)
    }

    /// Returns the index of a member with the same signature as `wanted`.
    #[must_use]
    pub fn find_implementation(&self, wanted: &ManagedMember) -> Option<usize> {
        self.members
            .iter()
            .position(|member| member.body.is_some() && member.same_signature(wanted))
    }

    /// Element type when the class is an ordered managed sequence.
    #[must_use]
    pub fn element(&self) -> Option<&TypeDescriptor> {
        self.element.as_ref()
    }

    /// Enum metadata, for enum types.
    #[must_use]
    pub fn enum_desc(&self) -> Option<&Arc<EnumDescriptor>> {
        self.enum_desc.as_ref()
    }

    /// Field layout, for value types.
    #[must_use]
    pub fn struct_desc(&self) -> Option<&Arc<StructDescriptor>> {
        self.struct_desc.as_ref()
    }

    /// Returns `true` if the class declares at least one constructor.
    #[must_use]
    pub fn has_constructor(&self) -> bool {
        self.members
            .iter()
            .any(|member| member.kind == MemberKind::Constructor)
    }

    /// Returns `true` if native code can create instances of this type.
    #[must_use]
    pub fn is_instantiable(&self) -> bool {
        matches!(self.kind, ClassKind::Class | ClassKind::Struct)
    }

    /// The descriptor values of this type are marshaled with.
    #[must_use]
    pub fn descriptor(&self) -> TypeDescriptor {
        match (&self.struct_desc, &self.enum_desc) {
            (Some(desc), _) => TypeDescriptor::Struct(desc.clone()),
            (None, Some(desc)) => TypeDescriptor::Enum(desc.clone()),
            (None, None) => TypeDescriptor::Object(self.full_name.clone()),
        }
    }

    fn static_slot(&self, name: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|field| field.is_static && field.name == name)
            .ok_or_else(|| Error::MemberNotFound {
                type_name: self.full_name.to_string(),
                member: name.to_string(),
            })
    }

    /// Reads a static field without triggering static initialization.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MemberNotFound`] if there is no such static field.
    pub fn read_static(&self, name: &str) -> Result<ManagedValue> {
        let slot = self.static_slot(name)?;
        let statics = read_lock!(self.statics);
        Ok(statics[slot].clone())
    }

    /// Writes a static field without triggering static initialization.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MemberNotFound`] if there is no such static field.
    pub fn write_static(&self, name: &str, value: ManagedValue) -> Result<()> {
        let slot = self.static_slot(name)?;
        let mut statics = write_lock!(self.statics);
        statics[slot] = value;
        Ok(())
    }

    /// Copies the current values of all static fields, used as collection roots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the statics lock is poisoned.
    pub fn static_values(&self) -> Result<Vec<ManagedValue>> {
        let statics = read_lock!(self.statics);
        Ok(statics.clone())
    }

    /// Returns `true` once the static initializer has run to completion.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.init_state
            .lock()
            .is_ok_and(|state| matches!(*state, InitState::Initialized))
    }

    /// Returns `true` if the static initializer threw and the type is unusable.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.init_state
            .lock()
            .is_ok_and(|state| matches!(*state, InitState::Failed(_)))
    }

    /// Runs the static initializer if it has not run yet.
    ///
    /// # Errors
    ///
    /// Throws `System.TypeInitializationException` if the initializer fails now or failed
    /// earlier.
    pub fn ensure_initialized(&self, domain: &Domain) -> Result<()> {
        let current = thread::current().id();
        {
            let mut state = lock!(self.init_state);
            loop {
                let blocked = match &*state {
                    InitState::Initialized => return Ok(()),
                    InitState::Failed(cause) => {
                        return Err(ManagedException::type_initialization(
                            &self.full_name,
                            cause.clone(),
                        )
                        .into())
                    }
                    InitState::Running(owner) => *owner != current,
                    InitState::Uninitialized => false,
                };
                if !blocked {
                    if matches!(*state, InitState::Running(_)) {
                        return Ok(());
                    }
                    break;
                }
                state = self
                    .init_done
                    .wait(state)
                    .map_err(|_| Error::LockError)?;
            }

            if self.static_init.is_none() {
                *state = InitState::Initialized;
                return Ok(());
            }
            *state = InitState::Running(current);
        }

        tracing::debug!(class = %self.full_name, "running static initializer");
        let mut guard = InitGuard {
            class: self,
            armed: true,
        };

        let result = match &self.static_init {
            Some(initializer) => initializer(domain, &mut CallFrame::default()),
            None => Ok(ManagedValue::Void),
        };

        guard.armed = false;
        let mut state = lock!(self.init_state);
        let outcome = match result {
            Ok(_) => {
                *state = InitState::Initialized;
                Ok(())
            }
            Err(Error::ManagedFault(cause)) => {
                tracing::debug!(class = %self.full_name, %cause, "static initializer failed");
                *state = InitState::Failed(cause.clone());
                Err(ManagedException::type_initialization(&self.full_name, cause).into())
            }
            Err(other) => {
                *state = InitState::Uninitialized;
                Err(other)
            }
        };
        self.init_done.notify_all();
        outcome
    }
}

/// Marks the class as failed if the static initializer unwinds.
struct InitGuard<'a> {
    class: &'a ManagedClass,
    armed: bool,
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(mut state) = self.class.init_state.lock() {
            *state = InitState::Failed(ManagedException::new(
                exception::EXECUTION_ENGINE,
                "static initializer panicked",
            ));
        }
        self.class.init_done.notify_all();
    }
}

impl fmt::Debug for ManagedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedClass")
            .field("name", &self.full_name)
            .field("kind", &self.kind)
            .field("base", &self.base)
            .field("interfaces", &self.interfaces)
            .field("fields", &self.fields.len())
            .field("members", &self.members)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ManagedClass`].
///
/// # Example
///
/// ```rust
/// use dotbridge::prelude::*;
///
/// let query = ClassBuilder::class("Properties.Query")
///     .field(FieldDef::instance("answer", PrimitiveKind::Int32.into()).with_init(42))
///     .getter("Answer", PrimitiveKind::Int32.into(), |domain, frame| {
///         domain.get_field(frame.this.as_ref().unwrap_or(&ManagedValue::Null), "answer")
///     })
///     .build();
///
/// assert_eq!(query.full_name(), "Properties.Query");
/// assert!(!query.has_constructor());
/// ```
pub struct ClassBuilder {
    name: QualifiedName,
    kind: ClassKind,
    base: Option<Arc<str>>,
    interfaces: Vec<Arc<str>>,
    fields: Vec<FieldDef>,
    members: Vec<ManagedMember>,
    static_init: Option<Body>,
    element: Option<TypeDescriptor>,
    enum_desc: Option<Arc<EnumDescriptor>>,
    struct_desc: Option<Arc<StructDescriptor>>,
}

impl ClassBuilder {
    fn with_kind(name: QualifiedName, kind: ClassKind) -> Self {
        ClassBuilder {
            name,
            kind,
            base: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            members: Vec::new(),
            static_init: None,
            element: None,
            enum_desc: None,
            struct_desc: None,
        }
    }

    /// Starts a reference type.
    #[must_use]
    pub fn class(name: &str) -> Self {
        Self::with_kind(QualifiedName::parse(name), ClassKind::Class)
    }

    /// Starts a static class.
    #[must_use]
    pub fn static_class(name: &str) -> Self {
        Self::with_kind(QualifiedName::parse(name), ClassKind::Static)
    }

    /// Starts an interface.
    #[must_use]
    pub fn interface(name: &str) -> Self {
        Self::with_kind(QualifiedName::parse(name), ClassKind::Interface)
    }

    /// Starts a value type. Its instance fields are taken from the layout.
    #[must_use]
    pub fn structure(layout: Arc<StructDescriptor>) -> Self {
        let mut builder = Self::with_kind(layout.name.clone(), ClassKind::Struct);
        builder.fields = layout
            .fields
            .iter()
            .map(|(name, ty)| FieldDef::instance(name, ty.clone()))
            .collect();
        builder.struct_desc = Some(layout);
        builder
    }

    /// Starts an enum type.
    #[must_use]
    pub fn enumeration(desc: Arc<EnumDescriptor>) -> Self {
        let mut builder = Self::with_kind(desc.name.clone(), ClassKind::Enum);
        builder.enum_desc = Some(desc);
        builder
    }

    /// Sets the base class.
    #[must_use]
    pub fn base(mut self, name: &str) -> Self {
        self.base = Some(Arc::from(name));
        self
    }

    /// Adds an implemented interface.
    #[must_use]
    pub fn implements(mut self, name: &str) -> Self {
        self.interfaces.push(Arc::from(name));
        self
    }

    /// Declares the type as an ordered sequence of `element`.
    #[must_use]
    pub fn sequence_of(mut self, element: TypeDescriptor) -> Self {
        self.element = Some(element);
        self
    }

    /// Adds a field. Instance fields on value types are ignored; use the layout instead.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        if self.kind != ClassKind::Struct || field.is_static {
            self.fields.push(field);
        }
        self
    }

    /// Marks an already declared field public. Used for value type layout fields.
    #[must_use]
    pub fn expose(mut self, name: &str) -> Self {
        for field in self.fields.iter_mut().filter(|field| field.name == name) {
            field.public = true;
        }
        self
    }

    /// Sets the static initializer.
    #[must_use]
    pub fn static_init<F>(mut self, body: F) -> Self
    where
        F: Fn(&Domain, &mut CallFrame) -> Result<ManagedValue> + Send + Sync + 'static,
    {
        self.static_init = Some(Arc::new(body));
        self
    }

    /// Adds a member with an explicit descriptor.
    #[must_use]
    pub fn member(mut self, member: ManagedMember) -> Self {
        self.members.push(member);
        self
    }

    fn push<F>(
        self,
        name: &str,
        kind: MemberKind,
        flags: MemberFlags,
        params: Vec<ParamDescriptor>,
        ret: TypeDescriptor,
        body: F,
    ) -> Self
    where
        F: Fn(&Domain, &mut CallFrame) -> Result<ManagedValue> + Send + Sync + 'static,
    {
        self.member(ManagedMember {
            name: name.to_string(),
            kind,
            flags,
            params,
            ret,
            body: Some(Arc::new(body)),
        })
    }

    /// Adds a constructor.
    #[must_use]
    pub fn constructor<F>(self, params: Vec<ParamDescriptor>, body: F) -> Self
    where
        F: Fn(&Domain, &mut CallFrame) -> Result<ManagedValue> + Send + Sync + 'static,
    {
        self.push(
            ".ctor",
            MemberKind::Constructor,
            MemberFlags::empty(),
            params,
            TypeDescriptor::Void,
            body,
        )
    }

    /// Adds an instance method.
    #[must_use]
    pub fn method<F>(
        self,
        name: &str,
        params: Vec<ParamDescriptor>,
        ret: TypeDescriptor,
        body: F,
    ) -> Self
    where
        F: Fn(&Domain, &mut CallFrame) -> Result<ManagedValue> + Send + Sync + 'static,
    {
        self.push(name, MemberKind::Method, MemberFlags::empty(), params, ret, body)
    }

    /// Adds a static method.
    #[must_use]
    pub fn static_method<F>(
        self,
        name: &str,
        params: Vec<ParamDescriptor>,
        ret: TypeDescriptor,
        body: F,
    ) -> Self
    where
        F: Fn(&Domain, &mut CallFrame) -> Result<ManagedValue> + Send + Sync + 'static,
    {
        self.push(name, MemberKind::Method, MemberFlags::STATIC, params, ret, body)
    }

    /// Adds an instance property getter.
    #[must_use]
    pub fn getter<F>(self, name: &str, ret: TypeDescriptor, body: F) -> Self
    where
        F: Fn(&Domain, &mut CallFrame) -> Result<ManagedValue> + Send + Sync + 'static,
    {
        self.push(name, MemberKind::Getter, MemberFlags::empty(), Vec::new(), ret, body)
    }

    /// Adds a static property getter.
    #[must_use]
    pub fn static_getter<F>(self, name: &str, ret: TypeDescriptor, body: F) -> Self
    where
        F: Fn(&Domain, &mut CallFrame) -> Result<ManagedValue> + Send + Sync + 'static,
    {
        self.push(name, MemberKind::Getter, MemberFlags::STATIC, Vec::new(), ret, body)
    }

    /// Adds an instance property setter.
    #[must_use]
    pub fn setter<F>(self, name: &str, ty: TypeDescriptor, body: F) -> Self
    where
        F: Fn(&Domain, &mut CallFrame) -> Result<ManagedValue> + Send + Sync + 'static,
    {
        self.push(
            name,
            MemberKind::Setter,
            MemberFlags::empty(),
            vec![ParamDescriptor::input("value", ty)],
            TypeDescriptor::Void,
            body,
        )
    }

    /// Adds a static property setter.
    #[must_use]
    pub fn static_setter<F>(self, name: &str, ty: TypeDescriptor, body: F) -> Self
    where
        F: Fn(&Domain, &mut CallFrame) -> Result<ManagedValue> + Send + Sync + 'static,
    {
        self.push(
            name,
            MemberKind::Setter,
            MemberFlags::STATIC,
            vec![ParamDescriptor::input("value", ty)],
            TypeDescriptor::Void,
            body,
        )
    }

    /// Adds an operator overload. Operators are always static.
    #[must_use]
    pub fn operator<F>(
        self,
        op: OperatorKind,
        params: Vec<ParamDescriptor>,
        ret: TypeDescriptor,
        body: F,
    ) -> Self
    where
        F: Fn(&Domain, &mut CallFrame) -> Result<ManagedValue> + Send + Sync + 'static,
    {
        self.push(
            &op.to_string(),
            MemberKind::Operator(op),
            MemberFlags::STATIC,
            params,
            ret,
            body,
        )
    }

    /// Adds an abstract instance method, implemented by concrete types.
    #[must_use]
    pub fn abstract_method(
        self,
        name: &str,
        params: Vec<ParamDescriptor>,
        ret: TypeDescriptor,
    ) -> Self {
        self.member(ManagedMember {
            name: name.to_string(),
            kind: MemberKind::Method,
            flags: MemberFlags::DISPATCH,
            params,
            ret,
            body: None,
        })
    }

    /// Adds an abstract property getter, implemented by concrete types.
    #[must_use]
    pub fn abstract_getter(self, name: &str, ret: TypeDescriptor) -> Self {
        self.member(ManagedMember {
            name: name.to_string(),
            kind: MemberKind::Getter,
            flags: MemberFlags::DISPATCH,
            params: Vec::new(),
            ret,
            body: None,
        })
    }

    /// Finishes the class. Static fields start at their initial values.
    #[must_use]
    pub fn build(self) -> ManagedClass {
        let statics = self
            .fields
            .iter()
            .map(|field| {
                if field.is_static {
                    field.initial_value()
                } else {
                    ManagedValue::Void
                }
            })
            .collect();

        ManagedClass {
            full_name: Arc::from(self.name.to_string()),
            name: self.name,
            kind: self.kind,
            base: self.base,
            interfaces: self.interfaces,
            fields: self.fields,
            members: self.members,
            static_init: self.static_init,
            element: self.element,
            enum_desc: self.enum_desc,
            struct_desc: self.struct_desc,
            statics: RwLock::new(statics),
            init_state: Mutex::new(InitState::Uninitialized),
            init_done: Condvar::new(),
        }
    }
}
