//! Execution seam.
//!
//! The compiler never talks to a database. Callers hand compiled queries to
//! an [`Executor`] they provide, backed by whatever driver they use.

use crate::compiler::CompiledQuery;
use crate::error::QbResult;
use crate::trace::SqlLogger;

/// A result row, column name to value.
pub type ResultRow = serde_json::Map<String, serde_json::Value>;

/// Runs compiled queries.
///
/// Implementations substitute `%s`/`%d`/`%f` placeholders with the query's
/// bindings in order, the way a prepared-statement API does.
pub trait Executor: Send + Sync {
    /// Run a write and return the number of affected rows.
    fn execute(
        &self,
        query: &CompiledQuery,
    ) -> impl std::future::Future<Output = QbResult<u64>> + Send;

    /// Run a read and return every row.
    fn fetch_all(
        &self,
        query: &CompiledQuery,
    ) -> impl std::future::Future<Output = QbResult<Vec<ResultRow>>> + Send;

    /// Run a read and return the first row, if any.
    ///
    /// The default implementation calls [`Executor::fetch_all`].
    fn fetch_optional(
        &self,
        query: &CompiledQuery,
    ) -> impl std::future::Future<Output = QbResult<Option<ResultRow>>> + Send {
        async move {
            let rows = self.fetch_all(query).await?;
            Ok(rows.into_iter().next())
        }
    }
}

pub(crate) async fn execute<E: Executor>(
    executor: &E,
    logger: SqlLogger,
    query: &CompiledQuery,
) -> QbResult<u64> {
    logger.executing(query);
    executor.execute(query).await.inspect_err(|e| logger.failed(query, e))
}

/// Execute each query in order and sum the affected rows.
///
/// Stops at the first failure; queries already run are not rolled back.
pub(crate) async fn execute_all<E: Executor>(
    executor: &E,
    logger: SqlLogger,
    queries: &[CompiledQuery],
) -> QbResult<u64> {
    let mut affected = 0;
    for query in queries {
        affected += execute(executor, logger, query).await?;
    }
    Ok(affected)
}

pub(crate) async fn fetch_all<E: Executor>(
    executor: &E,
    logger: SqlLogger,
    query: &CompiledQuery,
) -> QbResult<Vec<ResultRow>> {
    logger.executing(query);
    executor.fetch_all(query).await.inspect_err(|e| logger.failed(query, e))
}

pub(crate) async fn fetch_optional<E: Executor>(
    executor: &E,
    logger: SqlLogger,
    query: &CompiledQuery,
) -> QbResult<Option<ResultRow>> {
    logger.executing(query);
    executor
        .fetch_optional(query)
        .await
        .inspect_err(|e| logger.failed(query, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::QueryType;
    use crate::error::QbError;
    use std::sync::Mutex;

    struct FlakyExecutor {
        fail_on: usize,
        seen: Mutex<Vec<String>>,
    }

    impl Executor for FlakyExecutor {
        async fn execute(&self, query: &CompiledQuery) -> QbResult<u64> {
            let mut seen = self.seen.lock().unwrap();
            seen.push(query.sql.clone());
            if seen.len() == self.fail_on {
                return Err(QbError::execution("duplicate key"));
            }
            Ok(1)
        }

        async fn fetch_all(&self, _query: &CompiledQuery) -> QbResult<Vec<ResultRow>> {
            Ok(Vec::new())
        }
    }

    fn query(sql: &str) -> CompiledQuery {
        CompiledQuery {
            sql: sql.to_string(),
            bindings: Vec::new(),
            query_type: QueryType::Insert,
        }
    }

    #[tokio::test]
    async fn test_execute_all_sums_affected_rows() {
        let executor = FlakyExecutor {
            fail_on: 0,
            seen: Mutex::new(Vec::new()),
        };
        let queries = [query("A"), query("B"), query("C")];
        let affected = execute_all(&executor, SqlLogger::default(), &queries)
            .await
            .unwrap();
        assert_eq!(affected, 3);
    }

    #[tokio::test]
    async fn test_execute_all_stops_at_first_failure() {
        let executor = FlakyExecutor {
            fail_on: 2,
            seen: Mutex::new(Vec::new()),
        };
        let queries = [query("A"), query("B"), query("C")];
        let err = execute_all(&executor, SqlLogger::default(), &queries)
            .await
            .unwrap_err();
        assert!(err.is_execution());
        assert_eq!(*executor.seen.lock().unwrap(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_fetch_optional_defaults_to_first_row() {
        let executor = FlakyExecutor {
            fail_on: 0,
            seen: Mutex::new(Vec::new()),
        };
        let row = fetch_optional(&executor, SqlLogger::default(), &query("SELECT 1"))
            .await
            .unwrap();
        assert!(row.is_none());
    }
}
