//! Managed exceptions.
//!
//! A [`ManagedException`] is what a managed body throws. Inside the runtime it travels as
//! [`Error::ManagedFault`](crate::Error::ManagedFault); the bridge domesticates it before
//! any native caller sees it.

use std::sync::Arc;

use thiserror::Error;

/// `System.Exception`
pub const EXCEPTION: &str = "System.Exception";
/// `System.NullReferenceException`
pub const NULL_REFERENCE: &str = "System.NullReferenceException";
/// `System.InvalidOperationException`
pub const INVALID_OPERATION: &str = "System.InvalidOperationException";
/// `System.ArgumentOutOfRangeException`
pub const ARGUMENT_OUT_OF_RANGE: &str = "System.ArgumentOutOfRangeException";
/// `System.NotSupportedException`
pub const NOT_SUPPORTED: &str = "System.NotSupportedException";
/// `System.TypeInitializationException`
pub const TYPE_INITIALIZATION: &str = "System.TypeInitializationException";
/// `System.ExecutionEngineException`, used for panics inside managed bodies
pub const EXECUTION_ENGINE: &str = "System.ExecutionEngineException";

/// An exception thrown by managed code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{type_name}: {message}")]
pub struct ManagedException {
    type_name: Arc<str>,
    message: String,
    inner: Option<Box<ManagedException>>,
}

impl ManagedException {
    /// Creates an exception of the given managed type.
    #[must_use]
    pub fn new(type_name: &str, message: impl Into<String>) -> Self {
        ManagedException {
            type_name: Arc::from(type_name),
            message: message.into(),
            inner: None,
        }
    }

    /// Attaches the exception that caused this one.
    #[must_use]
    pub fn with_inner(mut self, inner: ManagedException) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    /// The `TypeInitializationException` raised whenever a type whose static initializer
    /// failed is touched.
    #[must_use]
    pub fn type_initialization(type_name: &str, cause: ManagedException) -> Self {
        ManagedException::new(
            TYPE_INITIALIZATION,
            format!("The type initializer for '{type_name}' threw an exception."),
        )
        .with_inner(cause)
    }

    /// Fully qualified managed exception type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The exception message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The wrapped exception, if any.
    #[must_use]
    pub fn inner(&self) -> Option<&ManagedException> {
        self.inner.as_deref()
    }

    /// The innermost exception of the chain.
    #[must_use]
    pub fn root_cause(&self) -> &ManagedException {
        let mut current = self;
        while let Some(inner) = current.inner() {
            current = inner;
        }
        current
    }
}
