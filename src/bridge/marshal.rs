//! Marshaling runtime: the entry point orchestrator.
//!
//! A [`Bridge`] owns the generated [`BindingRegistry`] of a [`Domain`] and serves every
//! flat entry point through [`Bridge::invoke`]:
//!
//! ```text
//! symbol -> MethodBinding -> receiver handle -> in/ref args (to managed)
//!        -> domesticate { managed member -> return value, out/ref args (to native) }
//!        -> write out/ref slots -> native result
//! ```
//!
//! Managed faults never surface as `Err`: they are domesticated into the default value of
//! the declared return type and `out` slots are left untouched. Handle, bounds and usage
//! errors are returned to the caller.
//!
//! # Value Types
//!
//! A struct handle refers to a boxed snapshot. Instance members of a struct run on a copy
//! of the snapshot and the mutated copy is stored back into the same box, so mutation
//! through a handle is visible through that handle only. Struct results always get a
//! fresh box.
//!
//! # Collection
//!
//! Objects that only live inside an invocation (managed results awaiting their handle,
//! arrays copied in from native buffers) are rooted by nothing. Every invocation holds the
//! bridge's call gate for reading and [`Bridge::collect`] takes it for writing, so a
//! collection waits for in-flight calls to finish converting.

use std::sync::{Arc, RwLock};

use crate::{
    bridge::{
        exception::{domesticate, ErrorHook, ExceptionState, FaultKind, FaultSummary},
        handles::PendingHandle,
        CollectionAdapter, HandleTable, ManagedHandle, NativeArg, NativeSlot, NativeValue,
        TypeMapper,
    },
    config::BridgeConfig,
    metadata::{
        binding::{MemberKind, MethodBinding, ParamDescriptor, ParamDirection, SequenceOp},
        header::{c_type, HeaderWriter},
        registry::BindingRegistry,
        typedesc::TypeDescriptor,
    },
    runtime::{CallFrame, Domain, HeapObject, ManagedValue, ObjectRef},
    Error, Result,
};

/// The resolved instance of an instance entry point.
#[derive(Debug)]
struct Receiver {
    value: ManagedValue,
    /// The box a struct receiver was copied from
    boxed: Option<ObjectRef>,
}

/// Managed results of one executed member, before conversion.
struct Executed<'a> {
    ret: ManagedValue,
    args: Vec<ManagedValue>,
    _pending: Option<PendingHandle<'a>>,
}

type Converted = (NativeValue, Vec<NativeValue>);

/// The flat native surface of a managed domain.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use dotbridge::prelude::*;
///
/// let domain = Domain::new();
/// domain
///     .register(
///         ClassBuilder::static_class("Platform")
///             .static_getter("IsWindows", PrimitiveKind::Boolean.into(), |_, _| {
///                 Ok(ManagedValue::Boolean(false))
///             })
///             .build(),
///     )
///     .unwrap();
///
/// let bridge = Bridge::new(Arc::new(domain)).unwrap();
/// assert_eq!(bridge.call("Platform_get_IsWindows", vec![]).unwrap(), NativeValue::Bool(false));
/// ```
#[derive(Debug)]
pub struct Bridge {
    domain: Arc<Domain>,
    registry: BindingRegistry,
    handles: HandleTable,
    exceptions: Arc<ExceptionState>,
    config: BridgeConfig,
    /// Shared by invocations, exclusive for collections
    gate: RwLock<()>,
}

impl Bridge {
    /// Generates the surface of `domain` with the default configuration.
    ///
    /// Faults are recorded in the process-wide [`ExceptionState::global`].
    ///
    /// # Errors
    ///
    /// Returns generation errors, see [`BindingRegistry::generate`].
    pub fn new(domain: Arc<Domain>) -> Result<Self> {
        Self::with_config(domain, BridgeConfig::default())
    }

    /// Generates the surface of `domain` with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns generation errors, see [`BindingRegistry::generate`].
    pub fn with_config(domain: Arc<Domain>, config: BridgeConfig) -> Result<Self> {
        let registry = BindingRegistry::generate(&domain)?;
        tracing::debug!(
            entry_points = registry.len(),
            constants = registry.constants().len(),
            max_handles = config.max_handles,
            "bridge ready"
        );
        Ok(Bridge {
            domain,
            registry,
            handles: HandleTable::new(config.max_handles),
            exceptions: ExceptionState::global(),
            config,
            gate: RwLock::new(()),
        })
    }

    /// Records faults in `state` instead of the process-wide state.
    #[must_use]
    pub fn with_exception_state(mut self, state: Arc<ExceptionState>) -> Self {
        self.exceptions = state;
        self
    }

    /// The managed domain.
    #[must_use]
    pub fn domain(&self) -> &Arc<Domain> {
        &self.domain
    }

    /// The generated surface.
    #[must_use]
    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    /// The handle table.
    #[must_use]
    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    /// The fault state this bridge records into.
    #[must_use]
    pub fn exceptions(&self) -> &Arc<ExceptionState> {
        &self.exceptions
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// A type mapper over this bridge's domain and handles.
    #[must_use]
    pub fn mapper(&self) -> TypeMapper<'_> {
        TypeMapper::new(&self.domain, &self.handles)
    }

    /// The binding of an entry point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSymbol`] for unknown entry points.
    pub fn binding(&self, symbol: &str) -> Result<&MethodBinding> {
        self.registry.get(symbol)
    }

    /// Renders the C header of the surface.
    #[must_use]
    pub fn header(&self) -> String {
        HeaderWriter::new(&self.domain, &self.registry).render()
    }

    /// Value of an enum constant such as `Enums_IntEnum_Max`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSymbol`] if no constant has this name.
    pub fn constant(&self, symbol: &str) -> Result<NativeValue> {
        self.registry.constant(symbol).cloned()
    }

    /// Installs an error report hook, or removes it with `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the hook lock is poisoned.
    pub fn install_error_hook(&self, hook: Option<ErrorHook>) -> Result<()> {
        self.exceptions.install_hook(hook)
    }

    /// The fault domesticated by the most recent invocation, if any.
    #[must_use]
    pub fn last_fault(&self) -> Option<FaultSummary> {
        self.exceptions.last_fault()
    }

    /// Drops one reference of a handle and returns the references left.
    ///
    /// # Errors
    ///
    /// Returns handle faults for null, unknown and already released handles.
    pub fn release(&self, handle: ManagedHandle) -> Result<usize> {
        let left = self.handles.release(self.domain.heap(), handle)?;
        if left == 0 && self.config.collect_on_release {
            self.collect()?;
        }
        Ok(left)
    }

    /// Returns `true` if two handles refer to the same managed object.
    ///
    /// # Errors
    ///
    /// Returns handle faults for invalid handles.
    pub fn same_object(&self, a: ManagedHandle, b: ManagedHandle) -> Result<bool> {
        self.handles.same_object(a, b)
    }

    /// Collects managed objects that are neither rooted by a handle nor reachable from a
    /// static field. Returns the number of objects freed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if a lock is poisoned.
    pub fn collect(&self) -> Result<usize> {
        let _gate = write_lock!(self.gate);
        let freed = self.domain.collect(&[])?;
        tracing::debug!(freed, "managed heap collected");
        Ok(freed)
    }

    /// The managed value behind a handle; a copy of the snapshot for struct handles.
    ///
    /// # Errors
    ///
    /// Returns handle faults for invalid handles.
    pub fn resolve(&self, handle: ManagedHandle) -> Result<ManagedValue> {
        let (object, _) = self.handles.resolve(handle)?;
        let snapshot = self.domain.heap().with(object, |obj| match obj {
            HeapObject::Boxed(snapshot) => Some(snapshot.clone()),
            _ => None,
        })?;
        Ok(snapshot.map_or(ManagedValue::Object(object), ManagedValue::Struct))
    }

    /// Invokes an entry point with `in` arguments only.
    ///
    /// # Errors
    ///
    /// Fails like [`Bridge::invoke`].
    pub fn call(&self, symbol: &str, args: Vec<NativeValue>) -> Result<NativeValue> {
        let mut args: Vec<NativeArg<'_>> = args.into_iter().map(NativeArg::In).collect();
        self.invoke(symbol, &mut args)
    }

    /// Invokes an entry point.
    ///
    /// `args` starts with the instance handle for instance entry points, followed by one
    /// argument per declared parameter whose direction matches the declaration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSymbol`], [`Error::ArgumentCount`], [`Error::TypeMismatch`]
    /// for mismatched arguments, handle faults, bounds faults and lock errors. Managed
    /// faults are never returned; they yield the default value of the return type.
    pub fn invoke(&self, symbol: &str, args: &mut [NativeArg<'_>]) -> Result<NativeValue> {
        tracing::trace!(symbol, "entry point invoked");
        let binding = self.registry.get(symbol)?;
        if args.len() != binding.native_arity() {
            return Err(Error::ArgumentCount {
                symbol: symbol.to_string(),
                expected: binding.native_arity(),
                got: args.len(),
            });
        }
        let _gate = read_lock!(self.gate);
        self.exceptions.clear_last();

        let (receiver, params) = if binding.takes_instance() {
            let (first, rest) = args.split_first_mut().ok_or(Error::NullHandle)?;
            (Some(self.receiver(binding, first)?), rest)
        } else {
            (None, args)
        };

        let mapper = self.mapper();
        let managed = binding
            .params
            .iter()
            .zip(params.iter())
            .map(|(param, arg)| Self::argument(&mapper, param, arg))
            .collect::<Result<Vec<_>>>()?;

        let kind = if binding.kind == MemberKind::Constructor {
            FaultKind::Construction
        } else {
            FaultKind::Invocation
        };
        let converted = domesticate(&self.exceptions, &self.config, symbol, kind, None, || {
            let executed = self.execute(binding, receiver, managed)?;
            Self::convert(&mapper, binding, &executed).map(Some)
        })?;

        let Some((ret, outs)) = converted else {
            return Ok(binding.ret.default_native());
        };

        let mut slots: Vec<&mut NativeSlot<'_>> = params
            .iter_mut()
            .filter_map(|arg| match arg {
                NativeArg::Out(slot) | NativeArg::Ref(slot) => Some(slot),
                NativeArg::In(_) => None,
            })
            .collect();
        let rejected = slots
            .iter()
            .zip(&outs)
            .find(|(slot, value)| !slot.accepts(value));
        if let Some((_, value)) = rejected {
            let error = Error::TypeMismatch {
                expected: "char*".to_string(),
                found: value.describe().to_string(),
            };
            mapper.discard(&ret);
            for value in &outs {
                mapper.discard(value);
            }
            return Err(error);
        }

        for (slot, value) in slots.iter_mut().zip(outs) {
            slot.write(value)?;
        }
        Ok(ret)
    }

    fn receiver(&self, binding: &MethodBinding, arg: &NativeArg<'_>) -> Result<Receiver> {
        let handle = match arg {
            NativeArg::In(NativeValue::Handle(handle)) => *handle,
            other => {
                return Err(Error::TypeMismatch {
                    expected: format!("{} handle", binding.target),
                    found: other.direction().to_string(),
                })
            }
        };

        let (object, class) = self.handles.resolve(handle)?;
        let target = binding.target.to_string();
        if !self.domain.is_assignable(&class, &target) {
            return Err(Error::TypeMismatch {
                expected: target,
                found: class.to_string(),
            });
        }

        let snapshot = self.domain.heap().with(object, |obj| match obj {
            HeapObject::Boxed(snapshot) => Some(snapshot.clone()),
            _ => None,
        })?;
        Ok(match snapshot {
            Some(snapshot) => Receiver {
                value: ManagedValue::Struct(snapshot),
                boxed: Some(object),
            },
            None => Receiver {
                value: ManagedValue::Object(object),
                boxed: None,
            },
        })
    }

    fn argument(
        mapper: &TypeMapper<'_>,
        param: &ParamDescriptor,
        arg: &NativeArg<'_>,
    ) -> Result<ManagedValue> {
        match (param.direction, arg) {
            (ParamDirection::In, NativeArg::In(value)) => mapper.to_managed(value, &param.ty),
            (ParamDirection::Out, NativeArg::Out(slot)) => {
                Self::check_slot(param, slot)?;
                Ok(param.ty.default_managed())
            }
            (ParamDirection::Ref, NativeArg::Ref(slot)) => {
                Self::check_slot(param, slot)?;
                mapper.to_managed(&slot.read(), &param.ty)
            }
            (direction, other) => Err(Error::TypeMismatch {
                expected: format!("{direction} argument '{}'", param.name),
                found: other.direction().to_string(),
            }),
        }
    }

    /// String buffers only take string parameters.
    fn check_slot(param: &ParamDescriptor, slot: &NativeSlot<'_>) -> Result<()> {
        if matches!(slot, NativeSlot::String(_)) && !matches!(param.ty, TypeDescriptor::String) {
            return Err(Error::TypeMismatch {
                expected: c_type(&param.ty, param.direction),
                found: "char*".to_string(),
            });
        }
        Ok(())
    }

    fn execute(
        &self,
        binding: &MethodBinding,
        receiver: Option<Receiver>,
        args: Vec<ManagedValue>,
    ) -> Result<Executed<'_>> {
        let class = self.domain.class(&binding.target.to_string())?;
        let mut frame = match &receiver {
            Some(receiver) => CallFrame::with_this(receiver.value.clone(), args),
            None => CallFrame::new(args),
        };

        let ret = match binding.kind {
            MemberKind::Constructor => {
                class.ensure_initialized(&self.domain)?;
                let this = self.domain.allocate(&class)?;
                let pending = match &this {
                    ManagedValue::Object(object) => {
                        let handle = self
                            .handles
                            .acquire(self.domain.heap(), *object, class.full_name_arc())?;
                        Some(PendingHandle::new(&self.handles, self.domain.heap(), handle))
                    }
                    _ => None,
                };
                let ret = self
                    .domain
                    .run_constructor(&class, binding.member_index, this, frame.args)?;
                return Ok(Executed {
                    ret,
                    args: Vec::new(),
                    _pending: pending,
                });
            }
            MemberKind::Method
            | MemberKind::Getter
            | MemberKind::Setter
            | MemberKind::Operator(_) => {
                let index = binding.member_index.ok_or_else(|| {
                    malformed_error!("Entry point {} has no managed member", binding.symbol)
                })?;
                self.domain.invoke(&class, index, &mut frame)?
            }
            MemberKind::FieldGet => match &frame.this {
                Some(this) => self.domain.get_field(this, &binding.member)?,
                None => self.domain.get_static(class.full_name(), &binding.member)?,
            },
            MemberKind::FieldSet => {
                let value = frame.arg(0)?.clone();
                match frame.this.as_mut() {
                    Some(this) => self.domain.set_field(this, &binding.member, value)?,
                    None => self.domain.set_static(class.full_name(), &binding.member, value)?,
                }
                ManagedValue::Void
            }
            MemberKind::Sequence(op) => self.sequence(op, &frame)?,
        };

        if let Some(receiver) = &receiver {
            self.store_back(receiver, frame.this.as_ref())?;
        }
        Ok(Executed {
            ret,
            args: frame.args,
            _pending: None,
        })
    }

    fn sequence(&self, op: SequenceOp, frame: &CallFrame) -> Result<ManagedValue> {
        let seq = frame.this_object()?;
        let adapter = CollectionAdapter::new(&self.domain);
        Ok(match op {
            SequenceOp::Count => {
                let count = adapter.count(seq)?;
                ManagedValue::I4(i32::try_from(count).map_err(|_| Error::IndexOutOfRange {
                    index: i64::MAX,
                    count,
                })?)
            }
            SequenceOp::GetAt => adapter.get_at(seq, frame.arg_i64(0)?)?,
            SequenceOp::SetAt => {
                adapter.set_at(seq, frame.arg_i64(0)?, frame.arg(1)?.clone())?;
                ManagedValue::Void
            }
            SequenceOp::Add => {
                adapter.add(seq, frame.arg(0)?.clone())?;
                ManagedValue::Void
            }
            SequenceOp::Remove => {
                adapter.remove_by_value(seq, frame.arg(0)?)?;
                ManagedValue::Void
            }
        })
    }

    /// Writes a mutated struct receiver back into the box it was copied from.
    fn store_back(&self, receiver: &Receiver, this: Option<&ManagedValue>) -> Result<()> {
        let (Some(boxed), Some(ManagedValue::Struct(updated))) = (receiver.boxed, this) else {
            return Ok(());
        };
        self.domain.heap().with_mut(boxed, |object| {
            if let HeapObject::Boxed(snapshot) = object {
                *snapshot = updated.clone();
            }
        })
    }

    /// Converts the return value and the `out`/`ref` arguments, releasing every handle
    /// already issued if a later conversion fails.
    fn convert(
        mapper: &TypeMapper<'_>,
        binding: &MethodBinding,
        executed: &Executed<'_>,
    ) -> Result<Converted> {
        let ret = mapper.to_native(&executed.ret, &binding.ret)?;
        let mut outs = Vec::new();
        for (index, param) in binding.params.iter().enumerate() {
            if param.direction == ParamDirection::In {
                continue;
            }
            let converted = executed
                .args
                .get(index)
                .ok_or_else(|| malformed_error!("{} lost argument {}", binding.symbol, param.name))
                .and_then(|value| mapper.to_native(value, &param.ty));
            match converted {
                Ok(value) => outs.push(value),
                Err(error) => {
                    mapper.discard(&ret);
                    for value in &outs {
                        mapper.discard(value);
                    }
                    return Err(error);
                }
            }
        }
        Ok((ret, outs))
    }
}
