//! SQL logging through `tracing`.
//!
//! Enabled by the `tracing` crate feature (on by default). With the feature
//! off every method here is a no-op.

use crate::compiler::CompiledQuery;
use crate::error::QbError;

/// Cut `sql` to at most `max_bytes`, backing off to a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Emits compile and execution events on the `sqlweave.sql` target.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SqlLogger {
    max_sql_length: Option<usize>,
}

impl SqlLogger {
    pub(crate) fn new(max_sql_length: Option<usize>) -> Self {
        Self { max_sql_length }
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    /// A query was compiled.
    pub(crate) fn compiled(&self, query: &CompiledQuery) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "sqlweave.sql",
            query_type = ?query.query_type,
            param_count = query.bindings.len(),
            sql = %self.truncate_sql(&query.sql),
        );
        #[cfg(not(feature = "tracing"))]
        let _ = query;
    }

    /// A query is about to be handed to an executor.
    pub(crate) fn executing(&self, query: &CompiledQuery) {
        #[cfg(feature = "tracing")]
        tracing::trace!(
            target: "sqlweave.sql",
            query_type = ?query.query_type,
            param_count = query.bindings.len(),
            sql = %self.truncate_sql(&query.sql),
            "executing query"
        );
        #[cfg(not(feature = "tracing"))]
        let _ = query;
    }

    /// The executor returned an error.
    pub(crate) fn failed(&self, query: &CompiledQuery, error: &QbError) {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            target: "sqlweave.sql",
            query_type = ?query.query_type,
            sql = %self.truncate_sql(&query.sql),
            error = %error,
            "query failed"
        );
        #[cfg(not(feature = "tracing"))]
        let _ = (query, error);
    }
}
