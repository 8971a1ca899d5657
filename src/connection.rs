//! Traced database connection wrapper.

use std::sync::Arc;
use std::time::Instant;

use tracing::{field, Instrument};

use crate::capability::{Capability, CapabilitySet};
use crate::config;
use crate::error::DriverError;
use crate::hooks::Hooks;
use crate::native::{ExecResult, NativeConnection, Rows};
use crate::statement::TracedStatement;
use crate::transaction::TracedTransaction;
use crate::value::{flatten, SqlParam};

/// A traced wrapper around a native connection.
///
/// Every capability the native connection exposes is individually
/// wrapped with the owning driver's hook set; capabilities the native
/// connection lacks are not invented. The supported set is resolved
/// once when the connection is wrapped.
///
/// # Hook lifecycle
///
/// For each `exec`/`query` call (and for statement calls, see
/// [`TracedStatement`]): `before` runs first; if it succeeds the native
/// call executes inside the operation span; then exactly one of
/// `after`/`on_error` runs. A missing capability fails immediately
/// before any hook fires; it is a configuration error, not a
/// transient one.
pub struct TracedConnection {
    inner: Box<dyn NativeConnection>,
    capabilities: CapabilitySet,
    hooks: Arc<Hooks>,
}

impl TracedConnection {
    /// Wrap a native connection, resolving its capability set.
    pub fn new(inner: Box<dyn NativeConnection>, hooks: Arc<Hooks>) -> Self {
        let capabilities = inner.capabilities();
        Self {
            inner,
            capabilities,
            hooks,
        }
    }

    /// The capability set resolved at wrap time.
    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    fn require(&self, capability: Capability) -> Result<(), DriverError> {
        if !self.capabilities.supports(capability) {
            return Err(DriverError::Unsupported {
                object: "connection",
                capability,
            });
        }
        Ok(())
    }

    /// Execute a statement that returns no rows.
    pub async fn exec(
        &mut self,
        query: &str,
        params: &[SqlParam],
    ) -> Result<ExecResult, DriverError> {
        self.require(Capability::Exec)?;

        let args = flatten(params);
        let token = (self.hooks.before)(query, &args)?;

        let result = self
            .inner
            .exec(query, params)
            .instrument(token.span().clone())
            .await;

        match result {
            Ok(res) => {
                (self.hooks.after)(&token, query, &args)?;
                Ok(res)
            }
            Err(err) => Err((self.hooks.on_error)(&token, err, query, &args)),
        }
    }

    /// Execute a statement that returns rows.
    pub async fn query(&mut self, query: &str, params: &[SqlParam]) -> Result<Rows, DriverError> {
        self.require(Capability::Query)?;

        let args = flatten(params);
        let token = (self.hooks.before)(query, &args)?;

        let result = self
            .inner
            .query(query, params)
            .instrument(token.span().clone())
            .await;

        match result {
            Ok(rows) => {
                (self.hooks.after)(&token, query, &args)?;
                Ok(rows)
            }
            Err(err) => Err((self.hooks.on_error)(&token, err, query, &args)),
        }
    }

    /// Prepare a statement, capturing the query text for the hooks that
    /// fire on later statement calls. No hook fires on prepare itself.
    pub async fn prepare(&mut self, query: &str) -> Result<TracedStatement, DriverError> {
        self.require(Capability::Prepare)?;

        let stmt = self.inner.prepare(query).await?;
        Ok(TracedStatement::new(stmt, query, Arc::clone(&self.hooks)))
    }

    /// Begin a transaction, measured from now until commit/rollback.
    pub async fn begin(&mut self) -> Result<TracedTransaction, DriverError> {
        self.require(Capability::BeginTx)?;

        let span = tracing::info_span!(
            "db.transaction",
            otel.name = "BEGIN",
            db.operation = "BEGIN",
            long_tx = field::Empty,
            tx_duration_ms = field::Empty,
            otel.status_code = field::Empty,
            error.message = field::Empty,
        );

        let tx = self.inner.begin().instrument(span.clone()).await?;
        Ok(TracedTransaction::new(
            tx,
            Instant::now(),
            span,
            config::long_tx_threshold(),
        ))
    }

    /// Verify the connection is alive.
    pub async fn ping(&mut self) -> Result<(), DriverError> {
        self.inner.ping().await
    }

    /// Close the underlying connection.
    pub async fn close(self) -> Result<(), DriverError> {
        self.inner.close().await
    }
}

impl std::fmt::Debug for TracedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracedConnection")
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{AfterFn, BeforeFn, OpToken};
    use crate::mock::{event_log, events, recording_hooks, Event, EventLog, MockConnection};
    use crate::value::SqlValue;

    fn wrapped(conn: MockConnection, log: &EventLog) -> TracedConnection {
        TracedConnection::new(
            Box::new(conn.with_log(log.clone())),
            Arc::new(recording_hooks(log)),
        )
    }

    fn full_caps() -> CapabilitySet {
        CapabilitySet::all()
    }

    #[tokio::test]
    async fn test_exec_success_runs_before_delegate_after() {
        let log = event_log();
        let mut conn = wrapped(MockConnection::new(full_caps()), &log);

        let query = "INSERT INTO t_user (uid) VALUES (?)";
        let params = vec![SqlParam::positional("u-1")];
        let result = conn.exec(query, &params).await.unwrap();
        assert_eq!(result.rows_affected, 1);

        let args = vec![SqlValue::Text("u-1".into())];
        assert_eq!(
            events(&log),
            vec![
                Event::Before {
                    query: query.to_string(),
                    args: args.clone(),
                },
                Event::Delegate("conn.exec"),
                Event::After {
                    query: query.to_string(),
                    args,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_named_params_reach_hooks_flattened() {
        let log = event_log();
        let mut conn = wrapped(MockConnection::new(full_caps()), &log);

        let params = vec![SqlParam::named("id", 7), SqlParam::positional("x")];
        conn.query("SELECT * FROM t WHERE id = :id AND k = ?", &params)
            .await
            .unwrap();

        match &events(&log)[0] {
            Event::Before { args, .. } => {
                assert_eq!(
                    args,
                    &vec![SqlValue::Int(7), SqlValue::Text("x".into())]
                );
            }
            other => panic!("expected Before first, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_query_runs_on_error_never_after() {
        let log = event_log();
        let mut conn = wrapped(
            MockConnection::new(full_caps()).fail_next_with(DriverError::database("boom")),
            &log,
        );

        let err = conn.query("SELECT * FROM t_user", &[]).await.unwrap_err();
        assert!(matches!(err, DriverError::Database(msg) if msg == "boom"));

        assert_eq!(
            events(&log),
            vec![
                Event::Before {
                    query: "SELECT * FROM t_user".to_string(),
                    args: vec![],
                },
                Event::Delegate("conn.query"),
                Event::OnError {
                    query: "SELECT * FROM t_user".to_string(),
                    benign: false,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_benign_skip_is_classified_and_propagated_unchanged() {
        let log = event_log();
        let mut conn = wrapped(
            MockConnection::new(full_caps()).fail_next_with(DriverError::Skip),
            &log,
        );

        let err = conn.exec("INSERT INTO t (k) VALUES (?)", &[]).await.unwrap_err();
        assert!(matches!(err, DriverError::Skip));

        let recorded = events(&log);
        assert_eq!(
            recorded.last(),
            Some(&Event::OnError {
                query: "INSERT INTO t (k) VALUES (?)".to_string(),
                benign: true,
            })
        );
    }

    #[tokio::test]
    async fn test_missing_query_capability_fails_fast_without_hooks() {
        let log = event_log();
        let caps = CapabilitySet::none().with(Capability::Exec);
        let mut conn = wrapped(MockConnection::new(caps), &log);

        let err = conn.query("SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            DriverError::Unsupported {
                object: "connection",
                capability: Capability::Query,
            }
        ));
        assert!(events(&log).is_empty());
    }

    #[tokio::test]
    async fn test_before_error_aborts_operation() {
        let log = event_log();
        let mut hooks = recording_hooks(&log);
        let failing: BeforeFn =
            Arc::new(|_query: &str, _args: &[SqlValue]| Err(DriverError::hook("tracer down")));
        hooks.before = failing;

        let mut conn =
            TracedConnection::new(Box::new(MockConnection::new(full_caps()).with_log(log.clone())), Arc::new(hooks));

        let err = conn.exec("INSERT INTO t (k) VALUES (?)", &[]).await.unwrap_err();
        assert!(matches!(err, DriverError::Hook(_)));
        // The native call never executed and no terminal hook fired.
        assert!(events(&log).is_empty());
    }

    #[tokio::test]
    async fn test_after_error_is_returned_directly() {
        let log = event_log();
        let mut hooks = recording_hooks(&log);
        let failing: AfterFn = Arc::new(|_token: &OpToken, _query: &str, _args: &[SqlValue]| {
            Err(DriverError::hook("exporter down"))
        });
        hooks.after = failing;

        let mut conn = TracedConnection::new(
            Box::new(MockConnection::new(full_caps()).with_log(log.clone())),
            Arc::new(hooks),
        );

        let err = conn.exec("INSERT INTO t (k) VALUES (?)", &[]).await.unwrap_err();
        assert!(matches!(err, DriverError::Hook(msg) if msg == "exporter down"));
        // The delegate did run; only the after hook failed.
        assert!(events(&log).contains(&Event::Delegate("conn.exec")));
    }

    #[tokio::test]
    async fn test_prepared_statement_reuses_prepare_time_query_text() {
        let log = event_log();
        let mut conn = wrapped(MockConnection::new(full_caps()), &log);

        let query = "INSERT INTO t (k) VALUES (?)";
        let mut stmt = conn.prepare(query).await.unwrap();
        assert_eq!(stmt.query_text(), query);

        stmt.exec(&[SqlParam::positional("a")]).await.unwrap();
        stmt.exec(&[SqlParam::positional("b")]).await.unwrap();

        assert_eq!(
            events(&log),
            vec![
                Event::Delegate("conn.prepare"),
                Event::Before {
                    query: query.to_string(),
                    args: vec![SqlValue::Text("a".into())],
                },
                Event::Delegate("stmt.exec"),
                Event::After {
                    query: query.to_string(),
                    args: vec![SqlValue::Text("a".into())],
                },
                Event::Before {
                    query: query.to_string(),
                    args: vec![SqlValue::Text("b".into())],
                },
                Event::Delegate("stmt.exec"),
                Event::After {
                    query: query.to_string(),
                    args: vec![SqlValue::Text("b".into())],
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_statement_missing_capability_fails_fast() {
        let log = event_log();
        let stmt_caps = CapabilitySet::none().with(Capability::Query);
        let mut conn = wrapped(
            MockConnection::new(full_caps()).with_statement_capabilities(stmt_caps),
            &log,
        );

        let mut stmt = conn.prepare("SELECT * FROM t WHERE k = ?").await.unwrap();
        let err = stmt.exec(&[SqlParam::positional("a")]).await.unwrap_err();
        assert!(matches!(
            err,
            DriverError::Unsupported {
                object: "statement",
                capability: Capability::Exec,
            }
        ));
        // Only the prepare delegate ran; no hook fired for the exec.
        assert_eq!(events(&log), vec![Event::Delegate("conn.prepare")]);
    }

    #[tokio::test]
    async fn test_prepare_requires_capability() {
        let log = event_log();
        let caps = CapabilitySet::none().with(Capability::Exec).with(Capability::Query);
        let mut conn = wrapped(MockConnection::new(caps), &log);

        let err = conn.prepare("SELECT 1").await.unwrap_err();
        assert!(matches!(
            err,
            DriverError::Unsupported {
                object: "connection",
                capability: Capability::Prepare,
            }
        ));
        assert!(events(&log).is_empty());
    }

    #[tokio::test]
    async fn test_begin_requires_capability() {
        let log = event_log();
        let caps = CapabilitySet::none().with(Capability::Exec);
        let mut conn = wrapped(MockConnection::new(caps), &log);

        let err = conn.begin().await.unwrap_err();
        assert!(matches!(
            err,
            DriverError::Unsupported {
                object: "connection",
                capability: Capability::BeginTx,
            }
        ));
    }

    #[tokio::test]
    async fn test_commit_delegates_and_reports_outcome() {
        let log = event_log();
        let mut conn = wrapped(MockConnection::new(full_caps()), &log);

        let tx = conn.begin().await.unwrap();
        tx.commit().await.unwrap();
        assert!(events(&log).contains(&Event::Delegate("tx.commit")));
    }

    #[tokio::test]
    async fn test_failed_commit_error_is_passed_through() {
        let log = event_log();
        let mut conn = wrapped(
            MockConnection::new(full_caps()).fail_commit_with(DriverError::database("deadlock")),
            &log,
        );

        let tx = conn.begin().await.unwrap();
        let err = tx.commit().await.unwrap_err();
        assert!(matches!(err, DriverError::Database(msg) if msg == "deadlock"));
    }

    #[tokio::test]
    async fn test_rollback_delegates() {
        let log = event_log();
        let mut conn = wrapped(MockConnection::new(full_caps()), &log);

        let tx = conn.begin().await.unwrap();
        tx.rollback().await.unwrap();
        assert!(events(&log).contains(&Event::Delegate("tx.rollback")));
    }
}
