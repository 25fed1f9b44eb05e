use thiserror::Error;

use crate::runtime::ManagedException;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants follow the fault taxonomy of the bridge. Managed faults are carried as
/// [`Error::ManagedFault`] until the exception domesticator converts them into the
/// sentinel-value convention; everything else is reported to the caller as a local,
/// recoverable failure.
///
/// # Error Categories
///
/// ## Managed Faults
/// - [`Error::ManagedFault`] - A managed constructor, static initializer, method, property or
///   operator threw
///
/// ## Handle Faults
/// - [`Error::InvalidHandle`] - The handle was never issued by the handle table
/// - [`Error::HandleReleased`] - The handle was issued but its last reference was released
/// - [`Error::NullHandle`] - A null handle was passed where an object is required
/// - [`Error::HandleTableFull`] - The configured handle budget is exhausted
///
/// ## Bounds Faults
/// - [`Error::IndexOutOfRange`] - Collection index outside `[0, count)`
///
/// ## Usage and Metadata Errors
/// - [`Error::UnknownSymbol`] - No generated entry point has this name
/// - [`Error::TypeNotFound`] / [`Error::MemberNotFound`] - Metadata lookups failed
/// - [`Error::TypeMismatch`] / [`Error::ArgumentCount`] - Native arguments do not fit the binding
/// - [`Error::InvalidString`] / [`Error::InteriorNul`] - String content can not cross the boundary
/// - [`Error::DuplicateSymbol`] / [`Error::Malformed`] - Inconsistent type metadata
/// - [`Error::LockError`] - Thread synchronization failure
///
/// # Examples
///
/// ```rust,ignore
/// use dotbridge::{Error, NativeArg, NativeValue};
///
/// match bridge.invoke("Methods_Collection_get_Item", &mut args) {
///     Ok(value) => println!("item: {:?}", value),
///     Err(Error::IndexOutOfRange { index, count }) => {
///         eprintln!("index {} out of range ({} items)", index, count);
///     }
///     Err(e) if e.is_handle_fault() => eprintln!("stale handle: {}", e),
///     Err(e) => eprintln!("other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A managed member threw.
    ///
    /// Produced by managed bodies, constructors and static initializers. The marshaling
    /// runtime never returns this variant from a generated entry point; it is domesticated
    /// into the default value of the entry point's native return type.
    #[error("Managed fault - {0}")]
    ManagedFault(#[from] ManagedException),

    /// The handle is unknown to the handle table.
    ///
    /// Either the slot index was never allocated or the value was not produced by this
    /// bridge at all.
    #[error("Invalid handle - 0x{0:016x}")]
    InvalidHandle(u64),

    /// The handle was valid once, but every reference to it has been released.
    #[error("Handle already released - 0x{0:016x}")]
    HandleReleased(u64),

    /// A null handle was supplied where a live object is required.
    #[error("Null handle where an object is required")]
    NullHandle,

    /// The handle table refuses to grow beyond the configured limit.
    #[error("Handle table exhausted - {0} live handles")]
    HandleTableFull(usize),

    /// Collection index outside of `[0, count)`.
    #[error("Index {index} out of range for sequence of length {count}")]
    IndexOutOfRange {
        /// The requested index
        index: i64,
        /// The number of elements in the sequence
        count: usize,
    },

    /// No generated entry point exists with this symbol name.
    #[error("Unknown entry point - {0}")]
    UnknownSymbol(String),

    /// The managed type is not registered in the domain.
    #[error("Type not found - {0}")]
    TypeNotFound(String),

    /// The managed type does not declare the requested member.
    #[error("Member not found - {type_name}::{member}")]
    MemberNotFound {
        /// The fully qualified managed type name
        type_name: String,
        /// The member name that was looked up
        member: String,
    },

    /// A value did not match the type descriptor it was marshaled against.
    #[error("Type mismatch - expected {expected}, found {found}")]
    TypeMismatch {
        /// Description of the expected type
        expected: String,
        /// Description of the value that was supplied
        found: String,
    },

    /// The number of native arguments does not match the binding.
    #[error("Argument count mismatch for {symbol} - expected {expected}, got {got}")]
    ArgumentCount {
        /// The entry point that was invoked
        symbol: String,
        /// Number of native arguments the binding takes
        expected: usize,
        /// Number of native arguments that were supplied
        got: usize,
    },

    /// Native string bytes are not valid UTF-8 and can not become a managed string.
    #[error("String is not valid UTF-8 - {0}")]
    InvalidString(#[from] std::str::Utf8Error),

    /// A managed string contains an interior NUL and can not become a terminated native string.
    #[error("String contains an interior NUL - {0}")]
    InteriorNul(#[from] std::ffi::NulError),

    /// Two bindings were generated with the same flat symbol name.
    #[error("Duplicate symbol - {0}")]
    DuplicateSymbol(String),

    /// Type metadata is inconsistent.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Failed to lock target.
    ///
    /// A lock guarding the handle table, heap or exception state was poisoned by a
    /// panicking thread.
    #[error("Failed to lock target")]
    LockError,
}

impl Error {
    /// Returns `true` for the handle fault family (stale, released, null or exhausted handles).
    #[must_use]
    pub fn is_handle_fault(&self) -> bool {
        matches!(
            self,
            Error::InvalidHandle(_)
                | Error::HandleReleased(_)
                | Error::NullHandle
                | Error::HandleTableFull(_)
        )
    }

    /// Returns `true` if this is a collection bounds fault.
    #[must_use]
    pub fn is_bounds_fault(&self) -> bool {
        matches!(self, Error::IndexOutOfRange { .. })
    }

    /// Returns `true` if a managed member threw.
    #[must_use]
    pub fn is_managed_fault(&self) -> bool {
        matches!(self, Error::ManagedFault(_))
    }

    /// Returns the managed exception, if this error carries one.
    #[must_use]
    pub fn managed_exception(&self) -> Option<&ManagedException> {
        match self {
            Error::ManagedFault(exception) => Some(exception),
            _ => None,
        }
    }
}
