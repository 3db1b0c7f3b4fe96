//! Query assembly.
//!
//! [`QueryCompiler`] turns a [`QueryStatements`] set into one complete SQL
//! string plus its bindings. Clauses are emitted in a fixed order and
//! empty ones are left out; bindings are collected in the same pass, so
//! they line up with the placeholders in the text.

use crate::config::CompilerConfig;
use crate::criteria::CriteriaCompiler;
use crate::error::{QbError, QbResult};
use crate::normalize::{Normalizer, render_sql};
use crate::prefix::TablePrefixer;
use crate::statement::{
    Field, InsertMode, InsertStatement, QueryStatements, Row, SelectStatement, TableStatement,
    validate_row,
};
use crate::trace::SqlLogger;
use crate::value::{Binding, BindingList, Raw};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The kind of SQL a compiled query holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Select,
    Insert,
    InsertIgnore,
    Replace,
    Update,
    Delete,
    Aggregate,
}

impl QueryType {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryType::Select => "select",
            QueryType::Insert => "insert",
            QueryType::InsertIgnore => "insert_ignore",
            QueryType::Replace => "replace",
            QueryType::Update => "update",
            QueryType::Delete => "delete",
            QueryType::Aggregate => "aggregate",
        }
    }
}

impl From<InsertMode> for QueryType {
    fn from(mode: InsertMode) -> Self {
        match mode {
            InsertMode::Insert => QueryType::Insert,
            InsertMode::InsertIgnore => QueryType::InsertIgnore,
            InsertMode::Replace => QueryType::Replace,
        }
    }
}

impl FromStr for QueryType {
    type Err = QbError;

    fn from_str(s: &str) -> QbResult<Self> {
        match s.trim().to_ascii_lowercase().replace(' ', "_").as_str() {
            "select" => Ok(QueryType::Select),
            "insert" => Ok(QueryType::Insert),
            "insert_ignore" | "insertignore" => Ok(QueryType::InsertIgnore),
            "replace" => Ok(QueryType::Replace),
            "update" => Ok(QueryType::Update),
            "delete" => Ok(QueryType::Delete),
            "aggregate" => Ok(QueryType::Aggregate),
            _ => Err(QbError::UnsupportedQueryType(s.to_string())),
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate function for [`QueryCompiler::compile_aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregate {
    Count,
    Min,
    Max,
    Sum,
    Avg,
}

impl Aggregate {
    pub fn function(self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
        }
    }
}

/// SQL text with its ordered bindings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub bindings: Vec<Binding>,
    pub query_type: QueryType,
}

impl CompiledQuery {
    /// Wrap the query as `(<sql>) AS <alias>` for use as a sub-query.
    ///
    /// The bindings travel with the fragment and are interpolated when it
    /// is resolved.
    pub fn into_raw(self, alias: &str) -> Raw {
        Raw::with_bindings(format!("({}) AS {}", self.sql, alias), self.bindings)
    }

    /// The SQL with every binding substituted as a literal (for debugging).
    ///
    /// Unlike [`CompiledQuery::sql`], the result is not a placeholder string:
    /// `%%` is collapsed and literals are not escaped for it.
    pub fn interpolated_sql(&self) -> String {
        render_sql(&Raw::with_bindings(self.sql.clone(), self.bindings.clone()))
    }
}

/// Compiles statement sets into SQL.
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    config: CompilerConfig,
    prefixer: TablePrefixer,
    logger: SqlLogger,
}

impl Default for QueryCompiler {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

impl QueryCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        let prefixer = config.prefixer();
        let logger = SqlLogger::new(config.max_logged_sql_length);
        Self {
            config,
            prefixer,
            logger,
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn prefixer(&self) -> &TablePrefixer {
        &self.prefixer
    }

    pub(crate) fn logger(&self) -> SqlLogger {
        self.logger
    }

    fn normalizer(&self) -> Normalizer<'_> {
        Normalizer::new(&self.prefixer)
    }

    fn criteria(&self) -> CriteriaCompiler<'_> {
        CriteriaCompiler::new(self.normalizer())
    }

    /// Compile a query type that needs nothing beyond the statements.
    ///
    /// Writes that carry data and aggregates have their own entry points and
    /// are rejected here.
    pub fn compile(
        &self,
        query_type: QueryType,
        statements: &QueryStatements,
    ) -> QbResult<CompiledQuery> {
        match query_type {
            QueryType::Select => self.compile_select(statements),
            QueryType::Delete => self.compile_delete(statements),
            QueryType::Insert
            | QueryType::InsertIgnore
            | QueryType::Replace
            | QueryType::Update
            | QueryType::Aggregate => Err(QbError::UnsupportedQueryType(format!(
                "{query_type} needs data or a function; use its dedicated compile method"
            ))),
        }
    }

    // ==================== SELECT ====================

    pub fn compile_select(&self, statements: &QueryStatements) -> QbResult<CompiledQuery> {
        let (sql, bindings) = self.build_select(statements)?;
        Ok(self.finish(sql, bindings, QueryType::Select))
    }

    fn build_select(&self, statements: &QueryStatements) -> QbResult<(String, BindingList)> {
        let normalizer = self.normalizer();
        let criteria = self.criteria();
        let mut bindings = BindingList::new();

        let tables = self.tables(statements.tables())?;

        let projection = if statements.selects().is_empty() {
            "*".to_string()
        } else {
            statements
                .selects()
                .iter()
                .map(|s| normalizer.resolve_aliased(s.field(), s.alias()))
                .collect::<QbResult<Vec<_>>>()?
                .join(", ")
        };

        let mut sql = String::from("SELECT ");
        if statements.distinct() {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&projection);
        sql.push_str(" FROM ");
        sql.push_str(&tables);

        // JOINs
        for join in statements.joins() {
            let table = normalizer.resolve_table(join.table())?;
            let on = criteria.compile_into(join.conditions(), &mut bindings)?;
            sql.push(' ');
            sql.push_str(join.join_type().keyword());
            sql.push_str(" JOIN ");
            sql.push_str(&table);
            if !on.is_empty() {
                sql.push_str(" ON ");
                sql.push_str(&on);
            }
        }

        // WHERE
        let where_sql = criteria.compile_into(statements.wheres(), &mut bindings)?;
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        // GROUP BY
        if !statements.group_bys().is_empty() {
            let fields = statements
                .group_bys()
                .iter()
                .map(|g| normalizer.resolve_field(g.field()))
                .collect::<QbResult<Vec<_>>>()?;
            sql.push_str(" GROUP BY ");
            sql.push_str(&fields.join(", "));
        }

        // HAVING
        let having_sql = criteria.compile_into(statements.havings(), &mut bindings)?;
        if !having_sql.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&having_sql);
        }

        // ORDER BY
        if !statements.order_bys().is_empty() {
            let clauses = statements
                .order_bys()
                .iter()
                .map(|o| {
                    normalizer
                        .resolve_field(o.field())
                        .map(|f| format!("{} {}", f, o.direction().as_str()))
                })
                .collect::<QbResult<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&clauses.join(", "));
        }

        self.push_limit_offset(&mut sql, statements);

        Ok((sql, bindings))
    }

    fn tables(&self, tables: &[TableStatement]) -> QbResult<String> {
        if tables.is_empty() {
            return Err(QbError::NoTableSpecified);
        }
        let normalizer = self.normalizer();
        Ok(tables
            .iter()
            .map(|t| normalizer.resolve_table(t))
            .collect::<QbResult<Vec<_>>>()?
            .join(", "))
    }

    /// The single target table of a write.
    fn write_table(&self, statements: &QueryStatements) -> QbResult<String> {
        match statements.tables() {
            [table] => self.normalizer().resolve_table(table),
            _ => Err(QbError::NoTableSpecified),
        }
    }

    fn push_limit_offset(&self, sql: &mut String, statements: &QueryStatements) {
        if let Some(limit) = statements.limit() {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = statements.offset() {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }

    // ==================== Aggregates ====================

    /// `SELECT <FN>(<field>) AS field ...` over the current statements.
    ///
    /// ORDER BY, LIMIT and OFFSET are dropped. A grouped query is wrapped in
    /// a sub-query so the aggregate covers the groups rather than each one.
    pub fn compile_aggregate(
        &self,
        statements: &QueryStatements,
        aggregate: Aggregate,
        field: impl Into<Field>,
    ) -> QbResult<CompiledQuery> {
        let field = self.normalizer().resolve_field(&field.into())?;
        let expression = format!("{}({}) AS field", aggregate.function(), field);
        let base = statements.without_ordering();

        let grouped = !statements.group_bys().is_empty() || !statements.havings().is_empty();
        let (sql, bindings) = if grouped {
            let (inner, bindings) = self.build_select(&base)?;
            (format!("SELECT {expression} FROM ({inner}) AS t"), bindings)
        } else {
            let select = SelectStatement::new(Raw::new(expression), None)?;
            self.build_select(&base.with_selects(vec![select]))?
        };

        Ok(self.finish(sql, bindings, QueryType::Aggregate))
    }

    // ==================== INSERT ====================

    /// One compiled query per row of the insert.
    pub fn compile_insert(
        &self,
        statements: &QueryStatements,
        insert: &InsertStatement,
        mode: InsertMode,
    ) -> QbResult<Vec<CompiledQuery>> {
        insert
            .rows()
            .iter()
            .map(|row| self.compile_insert_row(statements, row, mode))
            .collect()
    }

    pub fn compile_insert_row(
        &self,
        statements: &QueryStatements,
        row: &Row,
        mode: InsertMode,
    ) -> QbResult<CompiledQuery> {
        let table = self.write_table(statements)?;
        validate_row(row)?;

        let mut bindings = BindingList::new();
        let keys: Vec<&str> = row.iter().map(|(k, _)| k.as_str()).collect();
        let values: Vec<String> = row.iter().map(|(_, v)| bindings.push_value(v)).collect();

        let mut sql = format!(
            "{} INTO {} ({}) VALUES ({})",
            mode.keyword(),
            table,
            keys.join(","),
            values.join(",")
        );

        let on_duplicate = statements.on_duplicate();
        if !on_duplicate.is_empty() {
            sql.push_str(" ON DUPLICATE KEY UPDATE ");
            sql.push_str(&assignments(on_duplicate, &mut bindings));
        }

        Ok(self.finish(sql, bindings, mode.into()))
    }

    // ==================== UPDATE / DELETE ====================

    pub fn compile_update(
        &self,
        statements: &QueryStatements,
        data: &Row,
    ) -> QbResult<CompiledQuery> {
        let table = self.write_table(statements)?;
        validate_row(data)?;

        let mut bindings = BindingList::new();
        let mut sql = format!("UPDATE {} SET {}", table, assignments(data, &mut bindings));
        self.push_where(&mut sql, statements, &mut bindings)?;
        if let Some(limit) = statements.limit() {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        Ok(self.finish(sql, bindings, QueryType::Update))
    }

    pub fn compile_delete(&self, statements: &QueryStatements) -> QbResult<CompiledQuery> {
        let table = self.write_table(statements)?;

        let mut bindings = BindingList::new();
        let mut sql = format!("DELETE FROM {table}");
        self.push_where(&mut sql, statements, &mut bindings)?;
        if let Some(limit) = statements.limit() {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        Ok(self.finish(sql, bindings, QueryType::Delete))
    }

    fn push_where(
        &self,
        sql: &mut String,
        statements: &QueryStatements,
        bindings: &mut BindingList,
    ) -> QbResult<()> {
        let where_sql = self.criteria().compile_into(statements.wheres(), bindings)?;
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }
        Ok(())
    }

    fn finish(&self, sql: String, bindings: BindingList, query_type: QueryType) -> CompiledQuery {
        let query = CompiledQuery {
            sql,
            bindings: bindings.into_vec(),
            query_type,
        };
        self.logger.compiled(&query);
        query
    }
}

/// `k=v, k=v` with values bound in order.
fn assignments(row: &Row, bindings: &mut BindingList) -> String {
    row.iter()
        .map(|(key, value)| format!("{}={}", key, bindings.push_value(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::{
        CriteriaKind, CriteriaStatement, Direction, GroupByStatement, JoinStatement, JoinType,
        Joiner, Operand, OrderByStatement, row,
    };

    fn statements(table: &str) -> QueryStatements {
        let mut st = QueryStatements::new();
        st.push_table(TableStatement::new(table, None).unwrap());
        st
    }

    fn where_(field: &str, op: &str, value: impl Into<crate::value::Value>) -> CriteriaStatement {
        CriteriaStatement::new(
            field,
            op,
            Some(Operand::value(value)),
            Joiner::And,
            CriteriaKind::Where,
        )
        .unwrap()
    }

    #[test]
    fn test_select_star() {
        let q = QueryCompiler::default().compile_select(&statements("users")).unwrap();
        assert_eq!(q.sql, "SELECT * FROM users");
        assert!(q.bindings.is_empty());
        assert_eq!(q.query_type, QueryType::Select);
    }

    #[test]
    fn test_select_requires_table() {
        let err = QueryCompiler::default()
            .compile_select(&QueryStatements::new())
            .unwrap_err();
        assert!(matches!(err, QbError::NoTableSpecified));
    }

    #[test]
    fn test_select_clause_order() {
        let mut st = statements("orders");
        st.set_distinct(true);
        st.push_select(SelectStatement::new("user_id", None).unwrap());
        st.push_select(SelectStatement::new(Raw::new("SUM(total)"), Some("spent".into())).unwrap());
        let on = CriteriaStatement::new(
            "orders.user_id",
            "=",
            Some(Operand::column("users.id")),
            Joiner::And,
            CriteriaKind::Join,
        )
        .unwrap();
        st.push_join(
            JoinStatement::new(
                TableStatement::new("users", None).unwrap(),
                JoinType::Left,
                vec![on],
            )
            .unwrap(),
        );
        st.push_criteria(where_("status", "=", "paid")).unwrap();
        st.push_group_by(GroupByStatement::new("user_id").unwrap());
        st.push_criteria(
            CriteriaStatement::new(
                Raw::new("SUM(total)"),
                ">",
                Some(Operand::value(100)),
                Joiner::And,
                CriteriaKind::Having,
            )
            .unwrap(),
        )
        .unwrap();
        st.push_order_by(OrderByStatement::new("spent", Direction::Desc).unwrap());
        st.set_limit(Some(10));
        st.set_offset(Some(20));

        let q = QueryCompiler::default().compile_select(&st).unwrap();
        assert_eq!(
            q.sql,
            "SELECT DISTINCT user_id, SUM(total) AS spent FROM orders \
             LEFT JOIN users ON orders.user_id = users.id \
             WHERE status = %s GROUP BY user_id HAVING SUM(total) > %d \
             ORDER BY spent DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(q.bindings, vec![Binding::string("paid"), Binding::int(100)]);
    }

    #[test]
    fn test_cross_join_without_conditions() {
        let mut st = statements("a");
        st.push_join(
            JoinStatement::new(TableStatement::new("b", None).unwrap(), JoinType::Cross, vec![])
                .unwrap(),
        );
        let q = QueryCompiler::default().compile_select(&st).unwrap();
        assert_eq!(q.sql, "SELECT * FROM a CROSS JOIN b");
    }

    #[test]
    fn test_insert_with_on_duplicate() {
        let mut st = statements("users");
        st.set_on_duplicate(row([("name", "Sana")])).unwrap();
        let data = row([
            ("id", crate::value::Value::from(1)),
            ("name", "Sana".into()),
            ("created_at", crate::value::Value::raw("NOW()")),
        ]);
        let q = QueryCompiler::default()
            .compile_insert_row(&st, &data, InsertMode::Insert)
            .unwrap();
        assert_eq!(
            q.sql,
            "INSERT INTO users (id,name,created_at) VALUES (%d,%s,NOW()) \
             ON DUPLICATE KEY UPDATE name=%s"
        );
        assert_eq!(
            q.bindings,
            vec![Binding::int(1), Binding::string("Sana"), Binding::string("Sana")]
        );
    }

    #[test]
    fn test_insert_modes_and_batch() {
        let st = statements("t");
        let insert = InsertStatement::batch(vec![row([("a", 1)]), row([("a", 2)])]).unwrap();
        let compiler = QueryCompiler::default();

        let queries = compiler.compile_insert(&st, &insert, InsertMode::Replace).unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].sql, "REPLACE INTO t (a) VALUES (%d)");
        assert_eq!(queries[1].bindings, vec![Binding::int(2)]);
        assert_eq!(queries[0].query_type, QueryType::Replace);

        let ignore = compiler
            .compile_insert_row(&st, &row([("a", 1)]), InsertMode::InsertIgnore)
            .unwrap();
        assert!(ignore.sql.starts_with("INSERT IGNORE INTO t"));
    }

    #[test]
    fn test_insert_requires_table_and_data() {
        let compiler = QueryCompiler::default();
        assert!(matches!(
            compiler.compile_insert_row(
                &QueryStatements::new(),
                &row([("a", 1)]),
                InsertMode::Insert
            ),
            Err(QbError::NoTableSpecified)
        ));
        assert!(matches!(
            compiler.compile_insert_row(&statements("t"), &Row::new(), InsertMode::Insert),
            Err(QbError::NoDataGiven)
        ));
    }

    #[test]
    fn test_update_and_delete() {
        let mut st = statements("users");
        st.push_criteria(where_("id", "=", 5)).unwrap();
        st.set_limit(Some(1));
        let compiler = QueryCompiler::default();

        let update = compiler
            .compile_update(&st, &row([("name", "Ayo"), ("role", "admin")]))
            .unwrap();
        assert_eq!(update.sql, "UPDATE users SET name=%s, role=%s WHERE id = %d LIMIT 1");
        assert_eq!(update.bindings.len(), 3);
        assert_eq!(update.bindings[2], Binding::int(5));

        let delete = compiler.compile_delete(&st).unwrap();
        assert_eq!(delete.sql, "DELETE FROM users WHERE id = %d LIMIT 1");

        assert!(matches!(
            compiler.compile_update(&st, &Row::new()),
            Err(QbError::NoDataGiven)
        ));
    }

    #[test]
    fn test_aggregate() {
        let mut st = statements("orders");
        st.push_criteria(where_("status", "=", "paid")).unwrap();
        st.push_order_by(OrderByStatement::new("id", Direction::Asc).unwrap());
        st.set_limit(Some(5));
        let compiler = QueryCompiler::default();

        let q = compiler.compile_aggregate(&st, Aggregate::Count, "*").unwrap();
        assert_eq!(q.sql, "SELECT COUNT(*) AS field FROM orders WHERE status = %s");

        st.push_group_by(GroupByStatement::new("user_id").unwrap());
        let q = compiler.compile_aggregate(&st, Aggregate::Count, "*").unwrap();
        assert_eq!(
            q.sql,
            "SELECT COUNT(*) AS field FROM \
             (SELECT * FROM orders WHERE status = %s GROUP BY user_id) AS t"
        );
        assert_eq!(q.bindings.len(), 1);
    }

    #[test]
    fn test_generic_compile_rejects_writes() {
        let compiler = QueryCompiler::default();
        let st = statements("t");
        assert!(compiler.compile(QueryType::Select, &st).is_ok());
        assert!(matches!(
            compiler.compile(QueryType::Update, &st),
            Err(QbError::UnsupportedQueryType(_))
        ));
        assert!(matches!(
            "truncate".parse::<QueryType>(),
            Err(QbError::UnsupportedQueryType(_))
        ));
    }

    #[test]
    fn test_prefix_applies_everywhere() {
        let compiler = QueryCompiler::new(CompilerConfig::new().with_table_prefix("wp_"));
        let mut st = statements("posts");
        st.push_select(SelectStatement::new("posts.title", None).unwrap());
        st.push_criteria(where_("posts.id", ">", 3)).unwrap();
        let q = compiler.compile_select(&st).unwrap();
        assert_eq!(
            q.sql,
            "SELECT wp_posts.title FROM wp_posts WHERE wp_posts.id > %d"
        );
    }

    #[test]
    fn test_subquery_as_table() {
        let compiler = QueryCompiler::default();
        let mut inner = statements("orders");
        inner.push_criteria(where_("total", ">", 10)).unwrap();
        let sub = compiler.compile_select(&inner).unwrap().into_raw("o");

        let mut outer = QueryStatements::new();
        outer.push_table(TableStatement::new(sub, None).unwrap());
        let q = compiler.compile_select(&outer).unwrap();
        assert_eq!(q.sql, "SELECT * FROM (SELECT * FROM orders WHERE total > 10) AS o");
        assert!(q.bindings.is_empty());
    }

    #[test]
    fn test_interpolated_sql() {
        let mut st = statements("users");
        st.push_criteria(where_("name", "=", "O'Neil")).unwrap();
        let q = QueryCompiler::default().compile_select(&st).unwrap();
        assert_eq!(q.interpolated_sql(), r"SELECT * FROM users WHERE name = 'O\'Neil'");
    }
}
