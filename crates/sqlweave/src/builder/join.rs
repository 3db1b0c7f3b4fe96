//! JOIN ... ON conditions.

use crate::error::{QbError, QbResult};
use crate::statement::{
    CriteriaKind, CriteriaStatement, Field, JoinStatement, JoinType, Joiner, Operand,
    TableStatement,
};
use crate::value::Value;

/// ON conditions of one join.
///
/// Conditions compare columns; use [`on_value`](Self::on_value) to compare
/// against a bound value instead.
#[derive(Debug, Clone)]
pub struct JoinBuilder {
    table: Field,
    alias: Option<String>,
    join_type: JoinType,
    conditions: Vec<CriteriaStatement>,
    build_error: Option<QbError>,
}

impl JoinBuilder {
    pub(crate) fn new(table: impl Into<Field>, join_type: JoinType) -> Self {
        Self {
            table: table.into(),
            alias: None,
            join_type,
            conditions: Vec::new(),
            build_error: None,
        }
    }

    /// Alias the joined table.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    fn push(
        mut self,
        field: impl Into<Field>,
        operator: &str,
        value: Operand,
        joiner: Joiner,
    ) -> Self {
        match CriteriaStatement::new(field, operator, Some(value), joiner, CriteriaKind::Join) {
            Ok(condition) => self.conditions.push(condition),
            Err(err) => {
                self.build_error.get_or_insert(err);
            }
        }
        self
    }

    /// `AND left op right`, both columns.
    pub fn on(self, left: impl Into<Field>, operator: &str, right: impl Into<Field>) -> Self {
        self.push(left, operator, Operand::column(right), Joiner::And)
    }

    /// `OR left op right`, both columns.
    pub fn or_on(self, left: impl Into<Field>, operator: &str, right: impl Into<Field>) -> Self {
        self.push(left, operator, Operand::column(right), Joiner::Or)
    }

    /// `AND field op <bound value>`.
    pub fn on_value(
        self,
        field: impl Into<Field>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.push(field, operator, Operand::value(value), Joiner::And)
    }

    pub fn or_on_value(
        self,
        field: impl Into<Field>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.push(field, operator, Operand::value(value), Joiner::Or)
    }

    pub(crate) fn build(self) -> QbResult<JoinStatement> {
        if let Some(err) = self.build_error {
            return Err(err);
        }
        let table = TableStatement::new(self.table, self.alias)?;
        JoinStatement::new(table, self.join_type, self.conditions)
    }
}
