//! Scripted native-driver doubles for wrapper tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::Span;

use crate::capability::CapabilitySet;
use crate::error::{DriverError, ErrorDisposition};
use crate::hooks::{AfterFn, BeforeFn, Hooks, OnErrorFn, OpToken};
use crate::native::{
    ExecResult, NativeConnection, NativeDriver, NativeStatement, NativeTransaction, Rows,
};
use crate::value::{SqlParam, SqlValue};

/// One observable step of a wrapped operation: hook invocations and
/// delegate calls share a single log so ordering is assertable.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    Before { query: String, args: Vec<SqlValue> },
    Delegate(&'static str),
    After { query: String, args: Vec<SqlValue> },
    OnError { query: String, benign: bool },
}

pub(crate) type EventLog = Arc<Mutex<Vec<Event>>>;

pub(crate) fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub(crate) fn events(log: &EventLog) -> Vec<Event> {
    log.lock().unwrap().clone()
}

fn push(log: &EventLog, event: Event) {
    log.lock().unwrap().push(event);
}

/// Hooks that record their invocations instead of tracing.
pub(crate) fn recording_hooks(log: &EventLog) -> Hooks {
    let before_log = Arc::clone(log);
    let before: BeforeFn = Arc::new(move |query: &str, args: &[SqlValue]| {
        push(
            &before_log,
            Event::Before {
                query: query.to_string(),
                args: args.to_vec(),
            },
        );
        Ok(OpToken::new(Span::none()))
    });

    let after_log = Arc::clone(log);
    let after: AfterFn = Arc::new(move |_token: &OpToken, query: &str, args: &[SqlValue]| {
        push(
            &after_log,
            Event::After {
                query: query.to_string(),
                args: args.to_vec(),
            },
        );
        Ok(())
    });

    let error_log = Arc::clone(log);
    let on_error: OnErrorFn =
        Arc::new(move |_token: &OpToken, err: DriverError, query: &str, _args: &[SqlValue]| {
            push(
                &error_log,
                Event::OnError {
                    query: query.to_string(),
                    benign: err.disposition() == ErrorDisposition::Benign,
                },
            );
            err
        });

    Hooks {
        before,
        after,
        on_error,
    }
}

pub(crate) struct MockDriver {
    pub(crate) caps: CapabilitySet,
    pub(crate) stmt_caps: CapabilitySet,
    pub(crate) log: EventLog,
}

#[async_trait]
impl NativeDriver for MockDriver {
    async fn connect(&self, _dsn: &str) -> Result<Box<dyn NativeConnection>, DriverError> {
        push(&self.log, Event::Delegate("driver.connect"));
        Ok(Box::new(
            MockConnection::new(self.caps)
                .with_statement_capabilities(self.stmt_caps)
                .with_log(Arc::clone(&self.log)),
        ))
    }
}

pub(crate) struct MockConnection {
    caps: CapabilitySet,
    stmt_caps: CapabilitySet,
    log: EventLog,
    fail_next: Option<DriverError>,
    fail_commit: Option<DriverError>,
}

impl MockConnection {
    pub(crate) fn new(caps: CapabilitySet) -> Self {
        Self {
            caps,
            stmt_caps: CapabilitySet::all(),
            log: event_log(),
            fail_next: None,
            fail_commit: None,
        }
    }

    pub(crate) fn with_log(mut self, log: EventLog) -> Self {
        self.log = log;
        self
    }

    pub(crate) fn with_statement_capabilities(mut self, caps: CapabilitySet) -> Self {
        self.stmt_caps = caps;
        self
    }

    /// Fail the next exec/query delegate call with `err`.
    pub(crate) fn fail_next_with(mut self, err: DriverError) -> Self {
        self.fail_next = Some(err);
        self
    }

    /// Fail commit/rollback of transactions begun on this connection.
    pub(crate) fn fail_commit_with(mut self, err: DriverError) -> Self {
        self.fail_commit = Some(err);
        self
    }
}

#[async_trait]
impl NativeConnection for MockConnection {
    fn capabilities(&self) -> CapabilitySet {
        self.caps
    }

    async fn exec(&mut self, _query: &str, args: &[SqlParam]) -> Result<ExecResult, DriverError> {
        push(&self.log, Event::Delegate("conn.exec"));
        if let Some(err) = self.fail_next.take() {
            return Err(err);
        }
        let _ = args;
        Ok(ExecResult {
            rows_affected: 1,
            last_insert_id: Some(1),
        })
    }

    async fn query(&mut self, _query: &str, args: &[SqlParam]) -> Result<Rows, DriverError> {
        push(&self.log, Event::Delegate("conn.query"));
        if let Some(err) = self.fail_next.take() {
            return Err(err);
        }
        let _ = args;
        Ok(Rows {
            columns: vec!["value".to_string()],
            rows: vec![vec![SqlValue::Int(1)]],
        })
    }

    async fn prepare(&mut self, _query: &str) -> Result<Box<dyn NativeStatement>, DriverError> {
        push(&self.log, Event::Delegate("conn.prepare"));
        Ok(Box::new(MockStatement {
            caps: self.stmt_caps,
            log: Arc::clone(&self.log),
        }))
    }

    async fn begin(&mut self) -> Result<Box<dyn NativeTransaction>, DriverError> {
        push(&self.log, Event::Delegate("conn.begin"));
        Ok(Box::new(MockTransaction {
            log: Arc::clone(&self.log),
            fail: self.fail_commit.take(),
        }))
    }

    async fn ping(&mut self) -> Result<(), DriverError> {
        push(&self.log, Event::Delegate("conn.ping"));
        Ok(())
    }
}

pub(crate) struct MockStatement {
    caps: CapabilitySet,
    log: EventLog,
}

#[async_trait]
impl NativeStatement for MockStatement {
    fn capabilities(&self) -> CapabilitySet {
        self.caps
    }

    async fn exec(&mut self, _args: &[SqlParam]) -> Result<ExecResult, DriverError> {
        push(&self.log, Event::Delegate("stmt.exec"));
        Ok(ExecResult {
            rows_affected: 1,
            last_insert_id: None,
        })
    }

    async fn query(&mut self, _args: &[SqlParam]) -> Result<Rows, DriverError> {
        push(&self.log, Event::Delegate("stmt.query"));
        Ok(Rows::default())
    }
}

pub(crate) struct MockTransaction {
    pub(crate) log: EventLog,
    pub(crate) fail: Option<DriverError>,
}

#[async_trait]
impl NativeTransaction for MockTransaction {
    async fn commit(self: Box<Self>) -> Result<(), DriverError> {
        push(&self.log, Event::Delegate("tx.commit"));
        match self.fail {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn rollback(self: Box<Self>) -> Result<(), DriverError> {
        push(&self.log, Event::Delegate("tx.rollback"));
        match self.fail {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
