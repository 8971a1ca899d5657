//! Traced transaction wrapper with long-transaction flagging.

use std::time::{Duration, Instant};

use tracing::Span;

use crate::error::DriverError;
use crate::native::NativeTransaction;

/// A traced wrapper around a native transaction handle.
///
/// The transaction's lifetime is measured from `begin` to whichever of
/// `commit`/`rollback` is called; consuming `self` makes exactly one
/// terminal call possible. If neither is called the span stays
/// unflagged; reclaiming orphaned transactions is the native driver's
/// job, not the wrapper's.
pub struct TracedTransaction {
    inner: Box<dyn NativeTransaction>,
    started_at: Instant,
    span: Span,
    /// Captured from the process-wide setting at `begin`.
    long_tx_threshold: Duration,
}

impl TracedTransaction {
    pub(crate) fn new(
        inner: Box<dyn NativeTransaction>,
        started_at: Instant,
        span: Span,
        long_tx_threshold: Duration,
    ) -> Self {
        Self {
            inner,
            started_at,
            span,
            long_tx_threshold,
        }
    }

    /// Commit the transaction.
    ///
    /// The long-transaction flag is evaluated after the delegate
    /// returns, whether or not the commit itself succeeded; the
    /// duration is still informative.
    pub async fn commit(self) -> Result<(), DriverError> {
        let result = self.inner.commit().await;
        finish(&self.span, self.started_at, self.long_tx_threshold, &result);
        result
    }

    /// Roll the transaction back. Same flagging rules as [`commit`].
    ///
    /// [`commit`]: TracedTransaction::commit
    pub async fn rollback(self) -> Result<(), DriverError> {
        let result = self.inner.rollback().await;
        finish(&self.span, self.started_at, self.long_tx_threshold, &result);
        result
    }
}

impl std::fmt::Debug for TracedTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracedTransaction")
            .field("started_at", &self.started_at)
            .field("long_tx_threshold", &self.long_tx_threshold)
            .finish_non_exhaustive()
    }
}

fn finish(span: &Span, started_at: Instant, threshold: Duration, result: &Result<(), DriverError>) {
    let flagged = flag_long_tx(span, started_at.elapsed(), threshold);
    match result {
        Ok(()) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.message", err.to_string().as_str());
        }
    }
    if flagged {
        tracing::warn!(
            parent: span,
            duration_ms = started_at.elapsed().as_millis() as i64,
            threshold_ms = threshold.as_millis() as i64,
            "long transaction detected"
        );
    }
}

/// Record the long-transaction attributes when `elapsed` has reached the
/// threshold. Returns whether the flag was set.
fn flag_long_tx(span: &Span, elapsed: Duration, threshold: Duration) -> bool {
    if elapsed < threshold {
        return false;
    }
    span.record("long_tx", true);
    span.record("tx_duration_ms", elapsed.as_millis() as i64);
    true
}
