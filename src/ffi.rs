//! `extern "C"` surface of the process-wide fault state.
//!
//! These are the only symbols that are exported as-is; they operate on
//! [`ExceptionState::global`], the state every [`Bridge`](crate::Bridge) created with
//! [`Bridge::new`](crate::Bridge::new) records into.

use crate::bridge::{ErrorHook, ExceptionState, FaultKind, NativeErrorHook};

/// Installs the process-wide error report hook. Passing null removes it.
///
/// The hook runs synchronously on the faulting thread, before the faulting entry point
/// returns. The report and its strings are only valid during the call.
#[no_mangle]
pub extern "C" fn dotbridge_install_error_report_hook(hook: Option<NativeErrorHook>) {
    if let Err(error) = ExceptionState::global().install_hook(hook.map(ErrorHook::Native)) {
        tracing::error!(%error, "failed to install error report hook");
    }
}

/// Kind of the most recently domesticated fault, `0` if there is none.
#[no_mangle]
pub extern "C" fn dotbridge_last_error_kind() -> u32 {
    ExceptionState::global()
        .last_fault()
        .map_or(FaultKind::None, |fault| fault.kind) as u32
}

/// Forgets the most recently domesticated fault.
#[no_mangle]
pub extern "C" fn dotbridge_clear_last_error() {
    ExceptionState::global().clear_last();
}
