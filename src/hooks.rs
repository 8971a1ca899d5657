//! The before/after/on-error hook contract.
//!
//! A [`Hooks`] value is a named triple of callbacks wrapped around every
//! delegated native call. The triple is protocol-agnostic: the same
//! lifecycle shape (start span/timer before the call, classify success
//! vs. error after it) is what HTTP middleware, gRPC interceptors and
//! Redis command hooks reuse, each with its own notion of "command
//! text". This crate wires it to SQL driver calls.
//!
//! For a given operation the wrapper guarantees: `before` runs strictly
//! before the native call, and exactly one of `after`/`on_error` runs
//! strictly after it. If `before` fails, the native call never executes
//! and neither terminal hook fires.

use std::sync::Arc;
use std::time::Instant;

use tracing::Span;

use crate::error::DriverError;
use crate::value::SqlValue;

/// Per-operation correlation token.
///
/// Created by the `before` hook and handed back to whichever terminal
/// hook runs, carrying the operation-start timestamp and the active
/// span across the opaque native-call boundary. The span is closed when
/// the last handle to it is dropped, which happens once the terminal
/// hook returns and the wrapper releases the token.
#[derive(Debug)]
pub struct OpToken {
    span: Span,
    started_at: Instant,
}

impl OpToken {
    /// Token for an operation starting now.
    pub fn new(span: Span) -> Self {
        OpToken {
            span,
            started_at: Instant::now(),
        }
    }

    /// The span active for this operation.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// When the operation started.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Time elapsed since `before` ran.
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

/// Called before the native call. A non-`Ok` return aborts the
/// operation; the native call does not execute.
pub type BeforeFn = Arc<dyn Fn(&str, &[SqlValue]) -> Result<OpToken, DriverError> + Send + Sync>;

/// Called exactly once after a successful native call. An error here is
/// returned to the caller directly.
pub type AfterFn = Arc<dyn Fn(&OpToken, &str, &[SqlValue]) -> Result<(), DriverError> + Send + Sync>;

/// Called exactly once after a failed native call. Classifies the error
/// and returns it (unchanged, for this crate's hook sets) to the caller.
pub type OnErrorFn =
    Arc<dyn Fn(&OpToken, DriverError, &str, &[SqlValue]) -> DriverError + Send + Sync>;

/// A set of hooks invoked around the execution of a native call.
///
/// Owned by the driver that created it and shared read-only with every
/// connection and statement the driver spawns. All side effects
/// (tracing, metrics, audit logging) live inside the closures; the
/// wrapper itself holds no observability state.
#[derive(Clone)]
pub struct Hooks {
    pub before: BeforeFn,
    pub after: AfterFn,
    pub on_error: OnErrorFn,
}

impl Hooks {
    /// Hooks that trace nothing: a disabled span per call and no other
    /// side effects.
    pub fn noop() -> Self {
        let before: BeforeFn =
            Arc::new(|_: &str, _: &[SqlValue]| Ok(OpToken::new(Span::none())));
        let after: AfterFn = Arc::new(|_: &OpToken, _: &str, _: &[SqlValue]| Ok(()));
        let on_error: OnErrorFn =
            Arc::new(|_: &OpToken, err: DriverError, _: &str, _: &[SqlValue]| err);
        Hooks {
            before,
            after,
            on_error,
        }
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}
