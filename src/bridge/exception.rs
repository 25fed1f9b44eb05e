//! Exception domestication.
//!
//! Managed faults never cross the boundary. [`domesticate`] runs one managed operation
//! and, when it throws, records the fault in the [`ExceptionState`], notifies the
//! installed [`ErrorHook`] (if any) synchronously, and hands back the caller-chosen
//! default value instead. Constructors therefore return a null handle, value-returning
//! members return zero, and `out` parameters stay untouched.
//!
//! Errors that are not managed faults (handle faults, bounds faults, misuse) are not
//! domesticated; they are reported to the caller as ordinary [`Error`]s.

use std::{
    ffi::{c_char, CString},
    fmt,
    panic::{self, AssertUnwindSafe},
    ptr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, OnceLock, RwLock,
    },
};

use crate::{
    config::BridgeConfig,
    runtime::{exception, ManagedException},
    Error, Result,
};

/// Where in an invocation a fault was raised.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
pub enum FaultKind {
    /// No fault recorded
    #[default]
    None = 0,
    /// A constructor threw; the entry point returned a null handle
    Construction = 1,
    /// A method, accessor or operator threw; the entry point returned its default value
    Invocation = 2,
    /// The type's static initializer failed, now or earlier
    TypeInitialization = 3,
}

/// One domesticated fault, as recorded in the [`ExceptionState`] and passed to hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultSummary {
    /// Fault category
    pub kind: FaultKind,
    /// Entry point that faulted
    pub symbol: String,
    /// Managed exception type, e.g. `System.InvalidOperationException`
    pub type_name: String,
    /// Exception message
    pub message: String,
}

impl FaultSummary {
    /// Summarizes a managed exception raised by `symbol`.
    #[must_use]
    pub fn new(kind: FaultKind, symbol: &str, thrown: &ManagedException) -> Self {
        // An initializer failure is reported as such even if it surfaced through a
        // constructor or member.
        let kind = if thrown.type_name() == exception::TYPE_INITIALIZATION {
            FaultKind::TypeInitialization
        } else {
            kind
        };
        FaultSummary {
            kind,
            symbol: symbol.to_string(),
            type_name: thrown.type_name().to_string(),
            message: thrown.message().to_string(),
        }
    }
}

impl fmt::Display for FaultSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}: {}: {}", self.kind, self.symbol, self.type_name, self.message)
    }
}

/// C layout of a fault report handed to a native hook.
///
/// The strings are only valid for the duration of the hook call.
#[repr(C)]
#[derive(Debug)]
pub struct NativeErrorReport {
    /// [`FaultKind`] discriminant
    pub kind: u32,
    /// Entry point symbol
    pub symbol: *const c_char,
    /// Managed exception type name
    pub type_name: *const c_char,
    /// Exception message
    pub message: *const c_char,
}

/// Native error hook signature.
pub type NativeErrorHook = extern "C" fn(report: *const NativeErrorReport);

/// An installed error notification hook.
#[derive(Clone)]
pub enum ErrorHook {
    /// A native function pointer
    Native(NativeErrorHook),
    /// A Rust callback
    Callback(Arc<dyn Fn(&FaultSummary) + Send + Sync>),
}

impl ErrorHook {
    /// Wraps a Rust closure.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&FaultSummary) + Send + Sync + 'static,
    {
        ErrorHook::Callback(Arc::new(f))
    }

    fn notify(&self, summary: &FaultSummary) {
        match self {
            ErrorHook::Callback(callback) => callback(summary),
            ErrorHook::Native(hook) => {
                let symbol = lossy_cstring(&summary.symbol);
                let type_name = lossy_cstring(&summary.type_name);
                let message = lossy_cstring(&summary.message);
                let report = NativeErrorReport {
                    kind: summary.kind as u32,
                    symbol: symbol.as_ptr(),
                    type_name: type_name.as_ptr(),
                    message: message.as_ptr(),
                };
                hook(ptr::addr_of!(report));
            }
        }
    }
}

impl fmt::Debug for ErrorHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorHook::Native(hook) => write!(f, "ErrorHook::Native({:p})", *hook as *const ()),
            ErrorHook::Callback(_) => write!(f, "ErrorHook::Callback"),
        }
    }
}

fn lossy_cstring(value: &str) -> CString {
    CString::new(value.replace('\0', "\u{FFFD}")).unwrap_or_default()
}

/// Fault bookkeeping shared by every bridge using it.
///
/// Starts with no hook installed. [`ExceptionState::global`] is the process-wide instance
/// the `extern "C"` surface operates on; tests and embedders may create private ones.
#[derive(Debug, Default)]
pub struct ExceptionState {
    hook: RwLock<Option<ErrorHook>>,
    last: Mutex<Option<FaultSummary>>,
    faults: AtomicU64,
}

static GLOBAL: OnceLock<Arc<ExceptionState>> = OnceLock::new();

impl ExceptionState {
    /// Creates a state with no hook and no recorded fault.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide state.
    pub fn global() -> Arc<ExceptionState> {
        GLOBAL.get_or_init(|| Arc::new(ExceptionState::new())).clone()
    }

    /// Installs a hook, or removes the current one with `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the hook lock is poisoned.
    pub fn install_hook(&self, hook: Option<ErrorHook>) -> Result<()> {
        let mut slot = write_lock!(self.hook);
        tracing::debug!(installed = hook.is_some(), "error report hook changed");
        *slot = hook;
        Ok(())
    }

    /// Returns `true` if a hook is installed.
    #[must_use]
    pub fn has_hook(&self) -> bool {
        self.hook.read().is_ok_and(|hook| hook.is_some())
    }

    /// The most recently recorded fault.
    #[must_use]
    pub fn last_fault(&self) -> Option<FaultSummary> {
        self.last.lock().ok().and_then(|last| last.clone())
    }

    /// Forgets the most recently recorded fault.
    pub fn clear_last(&self) {
        if let Ok(mut last) = self.last.lock() {
            *last = None;
        }
    }

    /// Number of faults recorded since creation.
    #[must_use]
    pub fn fault_count(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    /// Records a fault and notifies the hook.
    ///
    /// The hook runs without any lock held, so it may call back into the bridge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if a lock is poisoned.
    pub fn record(&self, summary: FaultSummary) -> Result<()> {
        self.faults.fetch_add(1, Ordering::Relaxed);
        {
            let mut last = lock!(self.last);
            *last = Some(summary.clone());
        }

        let hook = read_lock!(self.hook).clone();
        if let Some(hook) = hook {
            hook.notify(&summary);
        }
        Ok(())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "managed body panicked".to_string()
    }
}

/// Runs a managed operation, converting a managed fault into `default`.
///
/// On success the operation's value is returned. On [`Error::ManagedFault`] the fault is
/// recorded in `state`, the hook is notified, and `Ok(default)` is returned. With
/// [`BridgeConfig::catch_panics`] a panic is treated as a
/// `System.ExecutionEngineException`. Every other error is returned unchanged.
///
/// # Errors
///
/// Returns non-managed errors from `op` and [`Error::LockError`] if recording fails.
pub fn domesticate<T, F>(
    state: &ExceptionState,
    config: &BridgeConfig,
    symbol: &str,
    kind: FaultKind,
    default: T,
    op: F,
) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let outcome = if config.catch_panics {
        match panic::catch_unwind(AssertUnwindSafe(op)) {
            Ok(outcome) => outcome,
            Err(payload) => Err(ManagedException::new(
                exception::EXECUTION_ENGINE,
                panic_message(payload.as_ref()),
            )
            .into()),
        }
    } else {
        op()
    };

    match outcome {
        Ok(value) => Ok(value),
        Err(Error::ManagedFault(thrown)) => {
            let summary = FaultSummary::new(kind, symbol, &thrown);
            if config.log_faults {
                tracing::warn!(
                    symbol,
                    kind = %summary.kind,
                    exception = %thrown.type_name(),
                    message = %thrown.root_cause().message(),
                    "managed fault domesticated"
                );
            }
            state.record(summary)?;
            Ok(default)
        }
        Err(other) => Err(other),
    }
}
