//! Traced prepared-statement wrapper.

use std::sync::Arc;

use tracing::Instrument;

use crate::capability::{Capability, CapabilitySet};
use crate::error::DriverError;
use crate::hooks::Hooks;
use crate::native::{ExecResult, NativeStatement, Rows};
use crate::value::{flatten, SqlParam};

/// A traced wrapper around a native prepared statement.
///
/// Native statement calls only supply arguments, not SQL, so the query
/// text used to prepare the statement is captured here and reported to
/// the hooks on every subsequent `exec`/`query`.
pub struct TracedStatement {
    inner: Box<dyn NativeStatement>,
    capabilities: CapabilitySet,
    hooks: Arc<Hooks>,
    query: String,
}

impl TracedStatement {
    pub(crate) fn new(inner: Box<dyn NativeStatement>, query: &str, hooks: Arc<Hooks>) -> Self {
        let capabilities = inner.capabilities();
        Self {
            inner,
            capabilities,
            hooks,
            query: query.to_string(),
        }
    }

    /// The query text this statement was prepared from.
    pub fn query_text(&self) -> &str {
        &self.query
    }

    fn require(&self, capability: Capability) -> Result<(), DriverError> {
        if !self.capabilities.supports(capability) {
            return Err(DriverError::Unsupported {
                object: "statement",
                capability,
            });
        }
        Ok(())
    }

    /// Execute the prepared statement without returning rows.
    pub async fn exec(&mut self, params: &[SqlParam]) -> Result<ExecResult, DriverError> {
        self.require(Capability::Exec)?;

        let args = flatten(params);
        let token = (self.hooks.before)(&self.query, &args)?;

        let result = self
            .inner
            .exec(params)
            .instrument(token.span().clone())
            .await;

        match result {
            Ok(res) => {
                (self.hooks.after)(&token, &self.query, &args)?;
                Ok(res)
            }
            Err(err) => Err((self.hooks.on_error)(&token, err, &self.query, &args)),
        }
    }

    /// Execute the prepared statement and return rows.
    pub async fn query(&mut self, params: &[SqlParam]) -> Result<Rows, DriverError> {
        self.require(Capability::Query)?;

        let args = flatten(params);
        let token = (self.hooks.before)(&self.query, &args)?;

        let result = self
            .inner
            .query(params)
            .instrument(token.span().clone())
            .await;

        match result {
            Ok(rows) => {
                (self.hooks.after)(&token, &self.query, &args)?;
                Ok(rows)
            }
            Err(err) => Err((self.hooks.on_error)(&token, err, &self.query, &args)),
        }
    }

    /// Close the underlying statement. No hook fires on close.
    pub async fn close(self) -> Result<(), DriverError> {
        self.inner.close().await
    }
}

impl std::fmt::Debug for TracedStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracedStatement")
            .field("query", &self.query)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}
