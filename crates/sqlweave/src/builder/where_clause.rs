//! Shared WHERE methods for the query builder and nested groups.

use crate::error::{QbError, QbResult};
use crate::statement::{CriteriaKind, CriteriaStatement, Field, Joiner, Operand};
use crate::value::{Raw, Value};

/// Consuming criteria methods.
///
/// Implemented by [`QueryBuilder`](super::QueryBuilder) for its WHERE clause
/// and by [`NestedCriteria`] for parenthesized groups. Statements that fail
/// validation are remembered and reported when the query is compiled.
pub trait WhereClause: Sized {
    /// Clause the generated statements belong to.
    fn criteria_kind(&self) -> CriteriaKind;

    /// Append a statement, or remember why it could not be built.
    fn push_criteria(&mut self, criteria: QbResult<CriteriaStatement>);

    /// Add a condition with an explicit joiner and operand.
    fn add_criteria(
        mut self,
        field: impl Into<Field>,
        operator: &str,
        value: Option<Operand>,
        joiner: Joiner,
    ) -> Self {
        let kind = self.criteria_kind();
        self.push_criteria(CriteriaStatement::new(field, operator, value, joiner, kind));
        self
    }

    // ==================== Comparisons ====================

    /// `AND field op value`
    fn where_(self, field: impl Into<Field>, operator: &str, value: impl Into<Value>) -> Self {
        self.add_criteria(field, operator, Some(Operand::value(value)), Joiner::And)
    }

    /// `OR field op value`
    fn or_where(self, field: impl Into<Field>, operator: &str, value: impl Into<Value>) -> Self {
        self.add_criteria(field, operator, Some(Operand::value(value)), Joiner::Or)
    }

    /// `AND NOT field op value`
    fn where_not(self, field: impl Into<Field>, operator: &str, value: impl Into<Value>) -> Self {
        self.add_criteria(field, operator, Some(Operand::value(value)), Joiner::AndNot)
    }

    /// `OR NOT field op value`
    fn or_where_not(
        self,
        field: impl Into<Field>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.add_criteria(field, operator, Some(Operand::value(value)), Joiner::OrNot)
    }

    /// `AND field op value` when `value` is `Some`; otherwise unchanged.
    fn where_opt<V: Into<Value>>(
        self,
        field: impl Into<Field>,
        operator: &str,
        value: Option<V>,
    ) -> Self {
        match value {
            Some(value) => self.where_(field, operator, value),
            None => self,
        }
    }

    /// Compare two columns; nothing is bound.
    fn where_column(
        self,
        field: impl Into<Field>,
        operator: &str,
        other: impl Into<Field>,
    ) -> Self {
        self.add_criteria(field, operator, Some(Operand::column(other)), Joiner::And)
    }

    // ==================== Lists ====================

    fn where_in<I, V>(self, field: impl Into<Field>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_criteria(field, "IN", Some(Operand::list(values)), Joiner::And)
    }

    fn or_where_in<I, V>(self, field: impl Into<Field>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_criteria(field, "IN", Some(Operand::list(values)), Joiner::Or)
    }

    fn where_not_in<I, V>(self, field: impl Into<Field>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_criteria(field, "NOT IN", Some(Operand::list(values)), Joiner::And)
    }

    fn or_where_not_in<I, V>(self, field: impl Into<Field>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_criteria(field, "NOT IN", Some(Operand::list(values)), Joiner::Or)
    }

    fn where_between(
        self,
        field: impl Into<Field>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        let values = Operand::List(vec![low.into(), high.into()]);
        self.add_criteria(field, "BETWEEN", Some(values), Joiner::And)
    }

    fn or_where_between(
        self,
        field: impl Into<Field>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        let values = Operand::List(vec![low.into(), high.into()]);
        self.add_criteria(field, "BETWEEN", Some(values), Joiner::Or)
    }

    fn where_not_between(
        self,
        field: impl Into<Field>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        let values = Operand::List(vec![low.into(), high.into()]);
        self.add_criteria(field, "NOT BETWEEN", Some(values), Joiner::And)
    }

    // ==================== NULL checks ====================

    fn where_null(self, field: impl Into<Field>) -> Self {
        self.add_criteria(field, "IS NULL", None, Joiner::And)
    }

    fn or_where_null(self, field: impl Into<Field>) -> Self {
        self.add_criteria(field, "IS NULL", None, Joiner::Or)
    }

    fn where_not_null(self, field: impl Into<Field>) -> Self {
        self.add_criteria(field, "IS NOT NULL", None, Joiner::And)
    }

    fn or_where_not_null(self, field: impl Into<Field>) -> Self {
        self.add_criteria(field, "IS NOT NULL", None, Joiner::Or)
    }

    // ==================== Raw & nested ====================

    /// Add a literal condition; its bindings are interpolated.
    fn where_raw(mut self, raw: Raw) -> Self {
        let kind = self.criteria_kind();
        self.push_criteria(Ok(CriteriaStatement::raw(raw, Joiner::And, kind)));
        self
    }

    fn or_where_raw(mut self, raw: Raw) -> Self {
        let kind = self.criteria_kind();
        self.push_criteria(Ok(CriteriaStatement::raw(raw, Joiner::Or, kind)));
        self
    }

    /// `AND (...)`, built by `f` on a fresh group.
    fn where_nested<F>(self, f: F) -> Self
    where
        F: FnOnce(NestedCriteria) -> NestedCriteria,
    {
        self.nested(Joiner::And, f)
    }

    /// `OR (...)`
    fn or_where_nested<F>(self, f: F) -> Self
    where
        F: FnOnce(NestedCriteria) -> NestedCriteria,
    {
        self.nested(Joiner::Or, f)
    }

    /// `AND NOT (...)`
    fn where_not_nested<F>(self, f: F) -> Self
    where
        F: FnOnce(NestedCriteria) -> NestedCriteria,
    {
        self.nested(Joiner::AndNot, f)
    }

    /// Run `f` on a fresh group and append it with `joiner`.
    fn nested<F>(mut self, joiner: Joiner, f: F) -> Self
    where
        F: FnOnce(NestedCriteria) -> NestedCriteria,
    {
        let kind = self.criteria_kind();
        let group = f(NestedCriteria::new(kind));
        let statement = group
            .into_criteria()
            .map(|inner| CriteriaStatement::nested(inner, joiner, kind));
        self.push_criteria(statement);
        self
    }
}

/// A parenthesized group of criteria, filled in by a closure.
#[derive(Debug, Clone)]
pub struct NestedCriteria {
    kind: CriteriaKind,
    criteria: Vec<CriteriaStatement>,
    build_error: Option<QbError>,
}

impl NestedCriteria {
    pub(crate) fn new(kind: CriteriaKind) -> Self {
        Self {
            kind,
            criteria: Vec::new(),
            build_error: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub(crate) fn into_criteria(self) -> QbResult<Vec<CriteriaStatement>> {
        match self.build_error {
            Some(err) => Err(err),
            None => Ok(self.criteria),
        }
    }
}

impl WhereClause for NestedCriteria {
    fn criteria_kind(&self) -> CriteriaKind {
        self.kind
    }

    fn push_criteria(&mut self, criteria: QbResult<CriteriaStatement>) {
        match criteria {
            Ok(criteria) => self.criteria.push(criteria),
            Err(err) => {
                self.build_error.get_or_insert(err);
            }
        }
    }
}
