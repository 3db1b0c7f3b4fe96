//! Fluent query builder.
//!
//! [`QueryBuilder`] accumulates statements and hands them to a
//! [`QueryCompiler`]. It is a plain value: every method consumes and returns
//! it, and it can be cloned to derive several queries from one base.
//!
//! # Usage
//!
//! ```
//! use sqlweave::prelude::*;
//!
//! let query = QueryBuilder::new(CompilerConfig::new().with_table_prefix("wp_"))
//!     .table("posts")
//!     .select(["posts.id", "posts.title"])
//!     .where_("posts.status", "=", "publish")
//!     .where_nested(|q| q.where_("posts.author", "=", 3).or_where("posts.featured", "=", true))
//!     .order_by("posts.date", "desc")
//!     .limit(10)
//!     .select_query()?;
//!
//! assert_eq!(
//!     query.sql,
//!     "SELECT wp_posts.id, wp_posts.title FROM wp_posts \
//!      WHERE wp_posts.status = %s AND (wp_posts.author = %d OR wp_posts.featured = %d) \
//!      ORDER BY wp_posts.date DESC LIMIT 10"
//! );
//! assert_eq!(query.bindings.len(), 3);
//! # Ok::<(), sqlweave::QbError>(())
//! ```
//!
//! Statements that fail validation do not panic: the first error is kept
//! and returned by whichever compile or execute method runs next.

mod join;
mod where_clause;

pub use join::JoinBuilder;
pub use where_clause::{NestedCriteria, WhereClause};

use crate::client::{self, Executor, ResultRow};
use crate::compiler::{Aggregate, CompiledQuery, QueryCompiler, QueryType};
use crate::config::CompilerConfig;
use crate::error::{QbError, QbResult};
use crate::statement::{
    CriteriaKind, CriteriaStatement, Direction, Field, GroupByStatement, InsertMode,
    InsertStatement, JoinType, Joiner, Operand, OrderByStatement, QueryStatements, Row,
    SelectStatement, TableStatement,
};
use crate::value::{Raw, Value};

/// Builds and runs one query.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    compiler: QueryCompiler,
    statements: QueryStatements,
    build_error: Option<QbError>,
}

impl QueryBuilder {
    /// Create a builder with its own compiler.
    pub fn new(config: CompilerConfig) -> Self {
        Self::with_compiler(QueryCompiler::new(config))
    }

    pub fn with_compiler(compiler: QueryCompiler) -> Self {
        Self {
            compiler,
            statements: QueryStatements::new(),
            build_error: None,
        }
    }

    /// A fresh builder sharing this one's configuration.
    pub fn new_query(&self) -> Self {
        Self::with_compiler(self.compiler.clone())
    }

    pub fn statements(&self) -> &QueryStatements {
        &self.statements
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    /// The first statement error recorded, if any.
    pub fn build_error(&self) -> Option<&QbError> {
        self.build_error.as_ref()
    }

    fn record<T>(&mut self, result: QbResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.build_error.get_or_insert(err);
                None
            }
        }
    }

    fn validate(&self) -> QbResult<()> {
        match &self.build_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    // ==================== Tables ====================

    /// Add a table (or a raw sub-query) to FROM.
    pub fn table(mut self, table: impl Into<Field>) -> Self {
        if let Some(t) = self.record(TableStatement::new(table, None)) {
            self.statements.push_table(t);
        }
        self
    }

    pub fn table_as(mut self, table: impl Into<Field>, alias: impl Into<String>) -> Self {
        if let Some(t) = self.record(TableStatement::new(table, Some(alias.into()))) {
            self.statements.push_table(t);
        }
        self
    }

    pub fn tables<I, T>(self, tables: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Field>,
    {
        tables.into_iter().fold(self, |qb, t| qb.table(t))
    }

    // ==================== SELECT columns ====================

    /// Append projected columns.
    pub fn select<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Field>,
    {
        for field in fields {
            if let Some(s) = self.record(SelectStatement::new(field, None)) {
                self.statements.push_select(s);
            }
        }
        self
    }

    pub fn select_as(mut self, field: impl Into<Field>, alias: impl Into<String>) -> Self {
        if let Some(s) = self.record(SelectStatement::new(field, Some(alias.into()))) {
            self.statements.push_select(s);
        }
        self
    }

    /// Append a literal projection such as `COUNT(*) AS total`.
    pub fn select_raw(self, sql: impl Into<String>) -> Self {
        self.select([Raw::new(sql)])
    }

    pub fn distinct(mut self) -> Self {
        self.statements.set_distinct(true);
        self
    }

    // ==================== JOIN ====================

    /// `INNER JOIN table ON left op right`
    pub fn join(
        self,
        table: impl Into<Field>,
        left: impl Into<Field>,
        operator: &str,
        right: impl Into<Field>,
    ) -> Self {
        self.join_with(table, JoinType::Inner, |j| j.on(left, operator, right))
    }

    pub fn left_join(
        self,
        table: impl Into<Field>,
        left: impl Into<Field>,
        operator: &str,
        right: impl Into<Field>,
    ) -> Self {
        self.join_with(table, JoinType::Left, |j| j.on(left, operator, right))
    }

    pub fn right_join(
        self,
        table: impl Into<Field>,
        left: impl Into<Field>,
        operator: &str,
        right: impl Into<Field>,
    ) -> Self {
        self.join_with(table, JoinType::Right, |j| j.on(left, operator, right))
    }

    pub fn cross_join(self, table: impl Into<Field>) -> Self {
        self.join_with(table, JoinType::Cross, |j| j)
    }

    /// Join with conditions built by `f`.
    pub fn join_with<F>(mut self, table: impl Into<Field>, join_type: JoinType, f: F) -> Self
    where
        F: FnOnce(JoinBuilder) -> JoinBuilder,
    {
        let join = f(JoinBuilder::new(table, join_type)).build();
        if let Some(join) = self.record(join) {
            self.statements.push_join(join);
        }
        self
    }

    // ==================== HAVING ====================

    fn add_having(
        mut self,
        field: impl Into<Field>,
        operator: &str,
        value: Value,
        joiner: Joiner,
    ) -> Self {
        let having = CriteriaStatement::new(
            field,
            operator,
            Some(Operand::Value(value)),
            joiner,
            CriteriaKind::Having,
        );
        if let Some(h) = self.record(having) {
            self.push_statement(h);
        }
        self
    }

    pub fn having(
        self,
        field: impl Into<Field>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.add_having(field, operator, value.into(), Joiner::And)
    }

    pub fn or_having(
        self,
        field: impl Into<Field>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.add_having(field, operator, value.into(), Joiner::Or)
    }

    pub fn having_raw(mut self, raw: Raw) -> Self {
        self.push_statement(CriteriaStatement::raw(raw, Joiner::And, CriteriaKind::Having));
        self
    }

    /// `AND (...)` in HAVING.
    pub fn having_nested<F>(mut self, f: F) -> Self
    where
        F: FnOnce(NestedCriteria) -> NestedCriteria,
    {
        let group = f(NestedCriteria::new(CriteriaKind::Having))
            .into_criteria()
            .map(|inner| CriteriaStatement::nested(inner, Joiner::And, CriteriaKind::Having));
        if let Some(h) = self.record(group) {
            self.push_statement(h);
        }
        self
    }

    fn push_statement(&mut self, criteria: CriteriaStatement) {
        let result = self.statements.push_criteria(criteria);
        self.record(result);
    }

    // ==================== Grouping, ordering, paging ====================

    pub fn group_by(mut self, field: impl Into<Field>) -> Self {
        if let Some(g) = self.record(GroupByStatement::new(field)) {
            self.statements.push_group_by(g);
        }
        self
    }

    /// Order by `field`; a direction other than `desc` sorts ascending.
    pub fn order_by(self, field: impl Into<Field>, direction: &str) -> Self {
        self.order_by_direction(field, Direction::parse_lossy(Some(direction)))
    }

    pub fn order_by_asc(self, field: impl Into<Field>) -> Self {
        self.order_by_direction(field, Direction::Asc)
    }

    pub fn order_by_desc(self, field: impl Into<Field>) -> Self {
        self.order_by_direction(field, Direction::Desc)
    }

    pub fn order_by_direction(mut self, field: impl Into<Field>, direction: Direction) -> Self {
        if let Some(o) = self.record(OrderByStatement::new(field, direction)) {
            self.statements.push_order_by(o);
        }
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.statements.set_limit(Some(n));
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.statements.set_offset(Some(n));
        self
    }

    /// Pagination helper.
    ///
    /// `page` is 1-based (clamped to >= 1), `per_page` is clamped to >= 1.
    /// An offset past `u64::MAX` is recorded as an error.
    pub fn paginate(mut self, page: u64, per_page: u64) -> Self {
        let page = page.max(1);
        let size = per_page.max(1);
        let offset = (page - 1).checked_mul(size).ok_or_else(|| {
            QbError::invalid_statement(format!(
                "page {page} of size {size} overflows the offset"
            ))
        });
        if let Some(offset) = self.record(offset) {
            self.statements.set_limit(Some(size));
            self.statements.set_offset(Some(offset));
        }
        self
    }

    /// Assignments for `ON DUPLICATE KEY UPDATE` on inserts.
    pub fn on_duplicate_key_update(mut self, data: Row) -> Self {
        let result = self.statements.set_on_duplicate(data);
        self.record(result);
        self
    }

    // ==================== Compilation ====================

    /// Compile a query type that needs no extra data (select, delete).
    pub fn compile(&self, query_type: QueryType) -> QbResult<CompiledQuery> {
        self.validate()?;
        self.compiler.compile(query_type, &self.statements)
    }

    pub fn select_query(&self) -> QbResult<CompiledQuery> {
        self.validate()?;
        self.compiler.compile_select(&self.statements)
    }

    pub fn insert_query(&self, data: Row) -> QbResult<CompiledQuery> {
        self.insert_query_with_mode(data, InsertMode::Insert)
    }

    pub fn insert_ignore_query(&self, data: Row) -> QbResult<CompiledQuery> {
        self.insert_query_with_mode(data, InsertMode::InsertIgnore)
    }

    pub fn replace_query(&self, data: Row) -> QbResult<CompiledQuery> {
        self.insert_query_with_mode(data, InsertMode::Replace)
    }

    pub fn insert_query_with_mode(&self, data: Row, mode: InsertMode) -> QbResult<CompiledQuery> {
        self.validate()?;
        let insert = InsertStatement::single(data)?;
        let mut queries = self.compiler.compile_insert(&self.statements, &insert, mode)?;
        queries.pop().ok_or(QbError::NoDataGiven)
    }

    /// One query per row.
    pub fn batch_insert_queries(
        &self,
        rows: Vec<Row>,
        mode: InsertMode,
    ) -> QbResult<Vec<CompiledQuery>> {
        self.validate()?;
        let insert = InsertStatement::batch(rows)?;
        self.compiler.compile_insert(&self.statements, &insert, mode)
    }

    pub fn update_query(&self, data: Row) -> QbResult<CompiledQuery> {
        self.validate()?;
        self.compiler.compile_update(&self.statements, &data)
    }

    pub fn delete_query(&self) -> QbResult<CompiledQuery> {
        self.validate()?;
        self.compiler.compile_delete(&self.statements)
    }

    pub fn aggregate_query(
        &self,
        aggregate: Aggregate,
        field: impl Into<Field>,
    ) -> QbResult<CompiledQuery> {
        self.validate()?;
        self.compiler.compile_aggregate(&self.statements, aggregate, field)
    }

    pub fn count_query(&self) -> QbResult<CompiledQuery> {
        self.aggregate_query(Aggregate::Count, "*")
    }

    /// This select as a `(<sql>) AS alias` fragment for use in another query.
    pub fn subquery(&self, alias: &str) -> QbResult<Raw> {
        Ok(self.select_query()?.into_raw(alias))
    }

    // ==================== Execution ====================

    /// Run the select and return every row.
    pub async fn get<E: Executor>(&self, executor: &E) -> QbResult<Vec<ResultRow>> {
        let query = self.select_query()?;
        client::fetch_all(executor, self.compiler.logger(), &query).await
    }

    /// Run the select with `LIMIT 1`.
    pub async fn first<E: Executor>(&self, executor: &E) -> QbResult<Option<ResultRow>> {
        let query = self.clone().limit(1).select_query()?;
        client::fetch_optional(executor, self.compiler.logger(), &query).await
    }

    /// Run an aggregate and read its `field` column.
    pub async fn aggregate<E: Executor>(
        &self,
        executor: &E,
        aggregate: Aggregate,
        field: impl Into<Field>,
    ) -> QbResult<Option<serde_json::Value>> {
        let query = self.aggregate_query(aggregate, field)?;
        let row = client::fetch_optional(executor, self.compiler.logger(), &query).await?;
        Ok(row.and_then(|mut r| r.remove("field")))
    }

    /// Number of rows the select would return.
    pub async fn count<E: Executor>(&self, executor: &E) -> QbResult<u64> {
        let value = self.aggregate(executor, Aggregate::Count, "*").await?;
        match value {
            None | Some(serde_json::Value::Null) => Ok(0),
            Some(serde_json::Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| QbError::execution(format!("COUNT returned {n}"))),
            Some(serde_json::Value::String(s)) => s
                .parse()
                .map_err(|_| QbError::execution(format!("COUNT returned '{s}'"))),
            Some(other) => Err(QbError::execution(format!("COUNT returned {other}"))),
        }
    }

    pub async fn execute_insert<E: Executor>(&self, executor: &E, data: Row) -> QbResult<u64> {
        let query = self.insert_query(data)?;
        client::execute(executor, self.compiler.logger(), &query).await
    }

    /// Insert each row with its own statement and sum the affected rows.
    ///
    /// Every row is compiled before the first one runs.
    pub async fn execute_batch_insert<E: Executor>(
        &self,
        executor: &E,
        rows: Vec<Row>,
    ) -> QbResult<u64> {
        let queries = self.batch_insert_queries(rows, InsertMode::Insert)?;
        client::execute_all(executor, self.compiler.logger(), &queries).await
    }

    pub async fn execute_update<E: Executor>(&self, executor: &E, data: Row) -> QbResult<u64> {
        let query = self.update_query(data)?;
        client::execute(executor, self.compiler.logger(), &query).await
    }

    pub async fn execute_delete<E: Executor>(&self, executor: &E) -> QbResult<u64> {
        let query = self.delete_query()?;
        client::execute(executor, self.compiler.logger(), &query).await
    }
}

impl WhereClause for QueryBuilder {
    fn criteria_kind(&self) -> CriteriaKind {
        CriteriaKind::Where
    }

    fn push_criteria(&mut self, criteria: QbResult<CriteriaStatement>) {
        if let Some(c) = self.record(criteria) {
            self.push_statement(c);
        }
    }
}
