//! Statement model.
//!
//! Every clause element of a query is an immutable statement value. Shapes
//! that cannot compile (a nested group with a value, a JSON selector used as
//! a table, ...) are rejected when the statement is constructed, not when
//! the query is compiled.

use crate::error::{QbError, QbResult};
use crate::json::JsonSelector;
use crate::value::{Raw, Value};
use std::fmt;
use std::str::FromStr;

/// A column slot: anything that can stand where a column name stands.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// Plain name, possibly `table.column` or `column->json->path`.
    Column(String),
    /// Literal SQL.
    Raw(Raw),
    /// Explicit JSON selector.
    Json(JsonSelector),
    /// Parenthesized sub-criteria group.
    Nested(Vec<CriteriaStatement>),
}

impl Field {
    pub fn is_nested(&self) -> bool {
        matches!(self, Field::Nested(_))
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::Column(s.to_string())
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Field::Column(s)
    }
}

impl From<Raw> for Field {
    fn from(raw: Raw) -> Self {
        Field::Raw(raw)
    }
}

impl From<JsonSelector> for Field {
    fn from(selector: JsonSelector) -> Self {
        Field::Json(selector)
    }
}

/// Boolean connective in front of a criteria fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Joiner {
    #[default]
    And,
    Or,
    AndNot,
    OrNot,
}

impl Joiner {
    pub fn as_str(self) -> &'static str {
        match self {
            Joiner::And => "AND",
            Joiner::Or => "OR",
            Joiner::AndNot => "AND NOT",
            Joiner::OrNot => "OR NOT",
        }
    }

    /// What is left of the joiner on the first fragment of a list.
    pub(crate) fn leading(self) -> Option<&'static str> {
        match self {
            Joiner::And | Joiner::Or => None,
            Joiner::AndNot | Joiner::OrNot => Some("NOT"),
        }
    }
}

impl fmt::Display for Joiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which clause a criteria statement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriteriaKind {
    Where,
    Having,
    Join,
}

impl CriteriaKind {
    pub fn keyword(self) -> &'static str {
        match self {
            CriteriaKind::Where => "WHERE",
            CriteriaKind::Having => "HAVING",
            CriteriaKind::Join => "ON",
        }
    }
}

/// Right-hand side of a criteria statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Single value, bound or spliced.
    Value(Value),
    /// IN / BETWEEN family.
    List(Vec<Value>),
    /// Another column, as in join conditions. Never bound.
    Column(Field),
}

impl Operand {
    pub fn value(v: impl Into<Value>) -> Self {
        Operand::Value(v.into())
    }

    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Operand::List(values.into_iter().map(Into::into).collect())
    }

    pub fn column(field: impl Into<Field>) -> Self {
        Operand::Column(field.into())
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

/// One WHERE / HAVING / ON condition.
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaStatement {
    field: Field,
    operator: String,
    value: Option<Operand>,
    joiner: Joiner,
    kind: CriteriaKind,
}

impl CriteriaStatement {
    pub fn new(
        field: impl Into<Field>,
        operator: impl Into<String>,
        value: Option<Operand>,
        joiner: Joiner,
        kind: CriteriaKind,
    ) -> QbResult<Self> {
        let field = field.into();
        let operator = operator.into().trim().to_string();

        if field.is_nested() && value.is_some() {
            return Err(QbError::malformed("a nested group cannot carry a value"));
        }
        if let Some(Operand::Column(Field::Nested(_))) = value {
            return Err(QbError::malformed("a nested group cannot be compared against"));
        }
        let bare_raw = matches!(field, Field::Raw(_)) && value.is_none();
        if operator.is_empty() && !field.is_nested() && !bare_raw {
            return Err(QbError::malformed("criteria operator is empty"));
        }

        Ok(Self {
            field,
            operator,
            value,
            joiner,
            kind,
        })
    }

    /// A parenthesized group of inner criteria.
    pub fn nested(criteria: Vec<CriteriaStatement>, joiner: Joiner, kind: CriteriaKind) -> Self {
        Self {
            field: Field::Nested(criteria),
            operator: String::new(),
            value: None,
            joiner,
            kind,
        }
    }

    /// A literal boolean expression.
    pub fn raw(raw: Raw, joiner: Joiner, kind: CriteriaKind) -> Self {
        Self {
            field: Field::Raw(raw),
            operator: String::new(),
            value: None,
            joiner,
            kind,
        }
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn value(&self) -> Option<&Operand> {
        self.value.as_ref()
    }

    pub fn joiner(&self) -> Joiner {
        self.joiner
    }

    pub fn kind(&self) -> CriteriaKind {
        self.kind
    }
}

/// A projected column.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    field: Field,
    alias: Option<String>,
}

impl SelectStatement {
    pub fn new(field: impl Into<Field>, alias: Option<String>) -> QbResult<Self> {
        let field = field.into();
        if field.is_nested() {
            return Err(QbError::invalid_statement("a nested group cannot be selected"));
        }
        Ok(Self { field, alias })
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}

/// A table in FROM or JOIN, or a raw sub-query.
#[derive(Debug, Clone, PartialEq)]
pub struct TableStatement {
    table: Field,
    alias: Option<String>,
}

impl TableStatement {
    pub fn new(table: impl Into<Field>, alias: Option<String>) -> QbResult<Self> {
        let table = table.into();
        match &table {
            Field::Column(name) if name.trim().is_empty() => {
                return Err(QbError::invalid_statement("table name is empty"));
            }
            Field::Column(_) | Field::Raw(_) => {}
            Field::Json(_) | Field::Nested(_) => {
                return Err(QbError::invalid_statement(
                    "a table must be a name or a raw expression",
                ));
            }
        }
        Ok(Self { table, alias })
    }

    pub fn table(&self) -> &Field {
        &self.table
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}

/// Join flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Cross,
    LeftOuter,
    RightOuter,
    FullOuter,
}

impl JoinType {
    pub fn keyword(self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Cross => "CROSS",
            JoinType::LeftOuter => "LEFT OUTER",
            JoinType::RightOuter => "RIGHT OUTER",
            JoinType::FullOuter => "FULL OUTER",
        }
    }
}

impl FromStr for JoinType {
    type Err = QbError;

    fn from_str(s: &str) -> QbResult<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_ascii_uppercase().as_str() {
            "" | "INNER" => Ok(JoinType::Inner),
            "LEFT" => Ok(JoinType::Left),
            "RIGHT" => Ok(JoinType::Right),
            "CROSS" => Ok(JoinType::Cross),
            "LEFT OUTER" => Ok(JoinType::LeftOuter),
            "RIGHT OUTER" => Ok(JoinType::RightOuter),
            "FULL OUTER" | "OUTER" => Ok(JoinType::FullOuter),
            _ => Err(QbError::invalid_statement(format!("unknown join type '{s}'"))),
        }
    }
}

/// `<TYPE> JOIN <table> ON <conditions>`.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinStatement {
    table: TableStatement,
    join_type: JoinType,
    conditions: Vec<CriteriaStatement>,
}

impl JoinStatement {
    pub fn new(
        table: TableStatement,
        join_type: JoinType,
        conditions: Vec<CriteriaStatement>,
    ) -> QbResult<Self> {
        if conditions.iter().any(|c| c.kind() != CriteriaKind::Join) {
            return Err(QbError::malformed("join conditions must be ON criteria"));
        }
        if conditions.is_empty() && join_type != JoinType::Cross {
            return Err(QbError::malformed(format!(
                "{} JOIN needs at least one ON condition",
                join_type.keyword()
            )));
        }
        Ok(Self {
            table,
            join_type,
            conditions,
        })
    }

    pub fn table(&self) -> &TableStatement {
        &self.table
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    pub fn conditions(&self) -> &[CriteriaStatement] {
        &self.conditions
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Parse a direction; anything other than `desc` sorts ascending.
    pub fn parse_lossy(s: Option<&str>) -> Self {
        match s.map(|d| d.trim().to_ascii_uppercase()) {
            Some(d) if d == "DESC" => Direction::Desc,
            _ => Direction::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByStatement {
    field: Field,
    direction: Direction,
}

impl OrderByStatement {
    pub fn new(field: impl Into<Field>, direction: Direction) -> QbResult<Self> {
        let field = field.into();
        if field.is_nested() {
            return Err(QbError::invalid_statement("cannot order by a nested group"));
        }
        Ok(Self { field, direction })
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupByStatement {
    field: Field,
}

impl GroupByStatement {
    pub fn new(field: impl Into<Field>) -> QbResult<Self> {
        let field = field.into();
        if field.is_nested() {
            return Err(QbError::invalid_statement("cannot group by a nested group"));
        }
        Ok(Self { field })
    }

    pub fn field(&self) -> &Field {
        &self.field
    }
}

/// An ordered `column => value` row.
pub type Row = Vec<(String, Value)>;

/// Build a [`Row`] from pairs.
pub fn row<K, V, I>(pairs: I) -> Row
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

pub(crate) fn validate_row(row: &Row) -> QbResult<()> {
    if row.is_empty() {
        return Err(QbError::NoDataGiven);
    }
    if let Some((key, _)) = row.iter().find(|(k, _)| k.trim().is_empty()) {
        return Err(QbError::invalid_statement(format!(
            "row key '{key}' is empty"
        )));
    }
    Ok(())
}

/// One row, or a batch of rows sharing the same keys.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    rows: Vec<Row>,
}

impl InsertStatement {
    pub fn single(row: Row) -> QbResult<Self> {
        validate_row(&row)?;
        Ok(Self { rows: vec![row] })
    }

    pub fn batch(rows: Vec<Row>) -> QbResult<Self> {
        let Some(first) = rows.first() else {
            return Err(QbError::NoDataGiven);
        };
        let keys: Vec<&str> = first.iter().map(|(k, _)| k.as_str()).collect();
        for row in &rows {
            validate_row(row)?;
            let same_keys = row.len() == keys.len()
                && row.iter().zip(&keys).all(|((k, _), expected)| k == expected);
            if !same_keys {
                return Err(QbError::invalid_statement(
                    "every row of a batch insert must have the same keys",
                ));
            }
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn is_batch(&self) -> bool {
        self.rows.len() > 1
    }
}

/// Insert flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMode {
    #[default]
    Insert,
    InsertIgnore,
    Replace,
}

impl InsertMode {
    pub fn keyword(self) -> &'static str {
        match self {
            InsertMode::Insert => "INSERT",
            InsertMode::InsertIgnore => "INSERT IGNORE",
            InsertMode::Replace => "REPLACE",
        }
    }
}

/// All statements of one query, grouped by clause.
///
/// Lists are append-only; compiling preserves their order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryStatements {
    tables: Vec<TableStatement>,
    selects: Vec<SelectStatement>,
    wheres: Vec<CriteriaStatement>,
    havings: Vec<CriteriaStatement>,
    joins: Vec<JoinStatement>,
    order_bys: Vec<OrderByStatement>,
    group_bys: Vec<GroupByStatement>,
    distinct: bool,
    limit: Option<u64>,
    offset: Option<u64>,
    on_duplicate: Row,
}

impl QueryStatements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_table(&mut self, table: TableStatement) {
        self.tables.push(table);
    }

    pub fn push_select(&mut self, select: SelectStatement) {
        self.selects.push(select);
    }

    /// Append a WHERE or HAVING statement to its clause.
    pub fn push_criteria(&mut self, criteria: CriteriaStatement) -> QbResult<()> {
        match criteria.kind() {
            CriteriaKind::Where => self.wheres.push(criteria),
            CriteriaKind::Having => self.havings.push(criteria),
            CriteriaKind::Join => {
                return Err(QbError::malformed(
                    "ON criteria belong to a join statement",
                ));
            }
        }
        Ok(())
    }

    pub fn push_join(&mut self, join: JoinStatement) {
        self.joins.push(join);
    }

    pub fn push_order_by(&mut self, order_by: OrderByStatement) {
        self.order_bys.push(order_by);
    }

    pub fn push_group_by(&mut self, group_by: GroupByStatement) {
        self.group_bys.push(group_by);
    }

    pub fn set_distinct(&mut self, distinct: bool) {
        self.distinct = distinct;
    }

    pub fn set_limit(&mut self, limit: Option<u64>) {
        self.limit = limit;
    }

    pub fn set_offset(&mut self, offset: Option<u64>) {
        self.offset = offset;
    }

    /// Set the `ON DUPLICATE KEY UPDATE` assignments.
    pub fn set_on_duplicate(&mut self, data: Row) -> QbResult<()> {
        validate_row(&data)?;
        self.on_duplicate = data;
        Ok(())
    }

    pub fn tables(&self) -> &[TableStatement] {
        &self.tables
    }

    pub fn selects(&self) -> &[SelectStatement] {
        &self.selects
    }

    pub fn wheres(&self) -> &[CriteriaStatement] {
        &self.wheres
    }

    pub fn havings(&self) -> &[CriteriaStatement] {
        &self.havings
    }

    pub fn joins(&self) -> &[JoinStatement] {
        &self.joins
    }

    pub fn order_bys(&self) -> &[OrderByStatement] {
        &self.order_bys
    }

    pub fn group_bys(&self) -> &[GroupByStatement] {
        &self.group_bys
    }

    pub fn distinct(&self) -> bool {
        self.distinct
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn on_duplicate(&self) -> &Row {
        &self.on_duplicate
    }

    /// A copy without ORDER BY, LIMIT and OFFSET, for aggregates.
    pub(crate) fn without_ordering(&self) -> Self {
        Self {
            order_bys: Vec::new(),
            limit: None,
            offset: None,
            ..self.clone()
        }
    }

    pub(crate) fn with_selects(&self, selects: Vec<SelectStatement>) -> Self {
        Self {
            selects,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn where_eq(field: &str, value: i32) -> CriteriaStatement {
        CriteriaStatement::new(
            field,
            "=",
            Some(Operand::value(value)),
            Joiner::And,
            CriteriaKind::Where,
        )
        .unwrap()
    }

    #[test]
    fn test_nested_with_value_is_rejected() {
        let err = CriteriaStatement::new(
            Field::Nested(vec![where_eq("a", 1)]),
            "=",
            Some(Operand::value(1)),
            Joiner::And,
            CriteriaKind::Where,
        )
        .unwrap_err();
        assert!(matches!(err, QbError::MalformedCriteria(_)));
    }

    #[test]
    fn test_empty_operator_only_for_raw() {
        assert!(
            CriteriaStatement::new(
                "a",
                " ",
                Some(Operand::value(1)),
                Joiner::And,
                CriteriaKind::Where,
            )
            .is_err()
        );
        assert!(CriteriaStatement::new(
            Raw::new("a IS NULL"),
            "",
            None,
            Joiner::And,
            CriteriaKind::Where
        )
        .is_ok());
    }

    #[test]
    fn test_table_rejects_json_selector() {
        let selector = JsonSelector::parse("a->b").unwrap();
        assert!(TableStatement::new(selector, None).is_err());
        assert!(TableStatement::new("", None).is_err());
        assert!(TableStatement::new(Raw::new("(SELECT 1) AS t"), None).is_ok());
    }

    #[test]
    fn test_join_requires_on_criteria() {
        let table = TableStatement::new("b", None).unwrap();
        assert!(JoinStatement::new(table.clone(), JoinType::Left, vec![]).is_err());
        assert!(JoinStatement::new(table.clone(), JoinType::Cross, vec![]).is_ok());
        assert!(JoinStatement::new(table, JoinType::Inner, vec![where_eq("a", 1)]).is_err());
    }

    #[test]
    fn test_join_type_parse() {
        assert_eq!("left  outer".parse::<JoinType>().unwrap(), JoinType::LeftOuter);
        assert_eq!("".parse::<JoinType>().unwrap(), JoinType::Inner);
        assert!("sideways".parse::<JoinType>().is_err());
    }

    #[test]
    fn test_direction_defaults_to_asc() {
        assert_eq!(Direction::parse_lossy(Some("desc")), Direction::Desc);
        assert_eq!(Direction::parse_lossy(Some("sideways")), Direction::Asc);
        assert_eq!(Direction::parse_lossy(None), Direction::Asc);
    }

    #[test]
    fn test_insert_validation() {
        assert!(matches!(
            InsertStatement::single(Row::new()),
            Err(QbError::NoDataGiven)
        ));
        assert!(InsertStatement::single(row([("", 1)])).is_err());
        assert!(InsertStatement::batch(vec![row([("a", 1)]), row([("b", 2)])]).is_err());
        let batch = InsertStatement::batch(vec![row([("a", 1)]), row([("a", 2)])]).unwrap();
        assert!(batch.is_batch());
    }

    #[test]
    fn test_push_criteria_sorts_by_kind() {
        let mut statements = QueryStatements::new();
        statements.push_criteria(where_eq("a", 1)).unwrap();
        let having = CriteriaStatement::new(
            "b",
            ">",
            Some(Operand::value(2)),
            Joiner::And,
            CriteriaKind::Having,
        )
        .unwrap();
        statements.push_criteria(having).unwrap();
        let on = CriteriaStatement::new(
            "a.id",
            "=",
            Some(Operand::Column("b.id".into())),
            Joiner::And,
            CriteriaKind::Join,
        )
        .unwrap();
        assert!(statements.push_criteria(on).is_err());
        assert_eq!(statements.wheres().len(), 1);
        assert_eq!(statements.havings().len(), 1);
    }
}
