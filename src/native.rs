//! The native driver contract the wrapper decorates.
//!
//! These traits describe the underlying database driver: the thing that
//! actually talks to the server. The wrapper delegates to it and never
//! reimplements any of it. Connections and statements advertise which
//! optional operations they support via [`capabilities`]; the optional
//! methods have default bodies returning the corresponding capability
//! error so partial implementations stay honest.
//!
//! [`capabilities`]: NativeConnection::capabilities

use async_trait::async_trait;

use crate::capability::{Capability, CapabilitySet};
use crate::error::DriverError;
use crate::value::{SqlParam, SqlValue};

/// Result of a statement that returns no rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

/// Result of a statement that returns rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl Rows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A native database driver: opens connections against a DSN.
#[async_trait]
pub trait NativeDriver: Send + Sync {
    async fn connect(&self, dsn: &str) -> Result<Box<dyn NativeConnection>, DriverError>;
}

/// A native connection.
///
/// A connection is used by one task at a time; the wrapper does not add
/// any synchronization around it.
#[async_trait]
pub trait NativeConnection: Send {
    /// The optional operations this connection supports.
    ///
    /// Resolved once when the connection is wrapped and consulted before
    /// every delegation; the default method bodies below are a backstop,
    /// not the authority.
    fn capabilities(&self) -> CapabilitySet;

    async fn exec(&mut self, query: &str, args: &[SqlParam]) -> Result<ExecResult, DriverError> {
        let _ = (query, args);
        Err(DriverError::Unsupported {
            object: "connection",
            capability: Capability::Exec,
        })
    }

    async fn query(&mut self, query: &str, args: &[SqlParam]) -> Result<Rows, DriverError> {
        let _ = (query, args);
        Err(DriverError::Unsupported {
            object: "connection",
            capability: Capability::Query,
        })
    }

    async fn prepare(&mut self, query: &str) -> Result<Box<dyn NativeStatement>, DriverError> {
        let _ = query;
        Err(DriverError::Unsupported {
            object: "connection",
            capability: Capability::Prepare,
        })
    }

    async fn begin(&mut self) -> Result<Box<dyn NativeTransaction>, DriverError> {
        Err(DriverError::Unsupported {
            object: "connection",
            capability: Capability::BeginTx,
        })
    }

    /// Verify the connection is alive.
    async fn ping(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        Ok(())
    }
}

/// A native prepared statement.
///
/// Native statements do not retain the SQL text they were prepared from;
/// the wrapper captures it at prepare time.
#[async_trait]
pub trait NativeStatement: Send {
    /// The optional operations this statement supports
    /// ([`Capability::Exec`] and [`Capability::Query`] are meaningful
    /// here).
    fn capabilities(&self) -> CapabilitySet;

    async fn exec(&mut self, args: &[SqlParam]) -> Result<ExecResult, DriverError> {
        let _ = args;
        Err(DriverError::Unsupported {
            object: "statement",
            capability: Capability::Exec,
        })
    }

    async fn query(&mut self, args: &[SqlParam]) -> Result<Rows, DriverError> {
        let _ = args;
        Err(DriverError::Unsupported {
            object: "statement",
            capability: Capability::Query,
        })
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        Ok(())
    }
}

/// A native transaction handle.
///
/// Commit and rollback consume the handle, so exactly one terminal call
/// is possible per transaction.
#[async_trait]
pub trait NativeTransaction: Send {
    async fn commit(self: Box<Self>) -> Result<(), DriverError>;
    async fn rollback(self: Box<Self>) -> Result<(), DriverError>;
}
