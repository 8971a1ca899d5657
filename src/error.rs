//! Error taxonomy for instrumented driver operations.

use thiserror::Error;

use crate::capability::Capability;

/// Errors surfaced by the wrapper and the native driver contract.
///
/// The wrapper never masks a delegate error: whatever the native call
/// returned is handed to the `on_error` hook for classification and then
/// returned to the caller unchanged. The only errors the wrapper itself
/// originates are [`DriverError::Unsupported`] (a missing capability,
/// raised before any hook fires), [`DriverError::Hook`] (a hook closure
/// failed), and the registry errors.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The native object does not implement an optional capability.
    ///
    /// This is a configuration/environment error, not a transient one:
    /// it is raised immediately at first use and never retried.
    #[error("{object} does not support {capability}")]
    Unsupported {
        /// The native object kind, e.g. `"connection"` or `"statement"`.
        object: &'static str,
        capability: Capability,
    },

    /// Benign fall-through signal from the native driver.
    ///
    /// Not a genuine failure: it means "this hook point is not
    /// applicable, continue the normal driver fallback". `on_error`
    /// tags the span as dropped rather than errored and returns the
    /// signal unchanged so the fallback chain continues.
    #[error("operation not applicable, fall through")]
    Skip,

    /// A driver is already registered under this key.
    #[error("driver already registered under {0:?}")]
    AlreadyRegistered(String),

    /// No driver is registered under this key.
    #[error("no driver registered under {0:?}")]
    UnknownDriver(String),

    /// Connecting to the database failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// The native call itself failed.
    #[error("database error: {0}")]
    Database(String),

    /// A `before`/`after` hook failed; distinct from a delegate error
    /// and never double-wrapped.
    #[error("hook failed: {0}")]
    Hook(String),
}

/// How `on_error` should treat a failed delegate call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// A fall-through signal: tag the span as dropped, not errored.
    Benign,
    /// A real failure: tag the span as errored and record the error.
    Genuine,
}

impl DriverError {
    /// Classify this error for span tagging.
    pub fn disposition(&self) -> ErrorDisposition {
        match self {
            DriverError::Skip => ErrorDisposition::Benign,
            _ => ErrorDisposition::Genuine,
        }
    }

    /// Shorthand for a database-side failure.
    pub fn database(message: impl Into<String>) -> Self {
        DriverError::Database(message.into())
    }

    /// Shorthand for a hook failure.
    pub fn hook(message: impl Into<String>) -> Self {
        DriverError::Hook(message.into())
    }
}
