//! Process-wide instrumentation thresholds.
//!
//! Both thresholds apply to every wrapped driver in the process and can
//! be changed at runtime, independently of any single connection or
//! transaction instance. A transaction captures the long-transaction
//! threshold at `begin`, so changing it mid-flight affects only
//! transactions begun afterwards.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Queries slower than this are flagged `slow_query` on their span and
/// logged at WARN level. Default: 1s.
static SLOW_SQL_THRESHOLD_MS: AtomicU64 = AtomicU64::new(1_000);

/// Transactions whose commit/rollback happens later than this after
/// `begin` are flagged `long_tx` on the transaction span. Default: 3s.
static LONG_TX_THRESHOLD_MS: AtomicU64 = AtomicU64::new(3_000);

/// Set the threshold for flagging a slow SQL query.
pub fn set_slow_sql_threshold(threshold: Duration) {
    SLOW_SQL_THRESHOLD_MS.store(threshold.as_millis() as u64, Ordering::Relaxed);
}

/// The current slow-query threshold.
pub fn slow_sql_threshold() -> Duration {
    Duration::from_millis(SLOW_SQL_THRESHOLD_MS.load(Ordering::Relaxed))
}

/// Set the threshold for flagging a long transaction.
pub fn set_long_tx_threshold(threshold: Duration) {
    LONG_TX_THRESHOLD_MS.store(threshold.as_millis() as u64, Ordering::Relaxed);
}

/// The current long-transaction threshold.
pub fn long_tx_threshold() -> Duration {
    Duration::from_millis(LONG_TX_THRESHOLD_MS.load(Ordering::Relaxed))
}
