//! WHERE / HAVING / ON criteria compilation.
//!
//! Placeholders are emitted through a [`BindingList`], so the binding order
//! always matches the placeholder order in the text, including inside
//! nested groups.

use crate::error::{QbError, QbResult};
use crate::normalize::{Normalizer, interpolate};
use crate::statement::{CriteriaStatement, Field, Operand};
use crate::value::{BindingList, Value};

/// Compiles criteria lists against one normalizer.
#[derive(Debug, Clone, Copy)]
pub struct CriteriaCompiler<'a> {
    normalizer: Normalizer<'a>,
}

impl<'a> CriteriaCompiler<'a> {
    pub fn new(normalizer: Normalizer<'a>) -> Self {
        Self { normalizer }
    }

    /// Compile a criteria list into SQL text plus its bindings.
    ///
    /// An empty list compiles to an empty string.
    pub fn compile(&self, criteria: &[CriteriaStatement]) -> QbResult<(String, BindingList)> {
        let mut bindings = BindingList::new();
        let sql = self.compile_into(criteria, &mut bindings)?;
        Ok((sql, bindings))
    }

    /// Compile a list, appending its bindings to `bindings`.
    pub fn compile_into(
        &self,
        criteria: &[CriteriaStatement],
        bindings: &mut BindingList,
    ) -> QbResult<String> {
        let mut fragments: Vec<String> = Vec::with_capacity(criteria.len());

        for statement in criteria {
            let Some(predicate) = self.predicate(statement, bindings)? else {
                continue;
            };
            // The first fragment loses its AND/OR but keeps NOT.
            let joiner = if fragments.is_empty() {
                statement.joiner().leading()
            } else {
                Some(statement.joiner().as_str())
            };
            fragments.push(match joiner {
                Some(joiner) => format!("{joiner} {predicate}"),
                None => predicate,
            });
        }

        Ok(fragments.join(" ").trim().to_string())
    }

    /// The predicate text without its joiner; `None` for an empty group.
    fn predicate(
        &self,
        statement: &CriteriaStatement,
        bindings: &mut BindingList,
    ) -> QbResult<Option<String>> {
        let field = statement.field();
        let operator = statement.operator();

        match (field, statement.value()) {
            (Field::Nested(inner), None) => {
                let inner_sql = self.compile_into(inner, bindings)?;
                Ok((!inner_sql.is_empty()).then(|| format!("({inner_sql})")))
            }
            (Field::Nested(_), Some(_)) => Err(QbError::malformed(
                "a nested group cannot carry a value",
            )),
            (_, Some(Operand::List(values))) => {
                let column = self.normalizer.resolve_field(field)?;
                self.list_predicate(&column, operator, values, bindings)
                    .map(Some)
            }
            (Field::Raw(raw), None) if operator.is_empty() => Ok(Some(interpolate(raw))),
            (_, None) => {
                let column = self.normalizer.resolve_field(field)?;
                Ok(Some(format!("{column} {operator}")))
            }
            (_, Some(Operand::Value(value))) => {
                let column = self.normalizer.resolve_field(field)?;
                let rhs = bindings.push_value(value);
                Ok(Some(format!("{column} {operator} {rhs}")))
            }
            (_, Some(Operand::Column(other))) => {
                let column = self.normalizer.resolve_field(field)?;
                let rhs = self.normalizer.resolve_field(other)?;
                Ok(Some(format!("{column} {operator} {rhs}")))
            }
        }
    }

    fn list_predicate(
        &self,
        column: &str,
        operator: &str,
        values: &[Value],
        bindings: &mut BindingList,
    ) -> QbResult<String> {
        let upper = operator.to_ascii_uppercase();
        let negated = upper.split_whitespace().any(|w| w == "NOT");

        if upper.contains("BETWEEN") {
            if let [low, high] = values {
                let low = bindings.push_value(low);
                let high = bindings.push_value(high);
                return Ok(format!("{column} {operator} {low} AND {high}"));
            }
            if values.is_empty() {
                return Err(QbError::malformed(format!(
                    "{operator} on '{column}' needs two values"
                )));
            }
        }

        // IN () is invalid SQL; an empty list matches nothing (or everything when negated).
        if values.is_empty() {
            return Ok(if negated { "1=1" } else { "1=0" }.to_string());
        }

        let items: Vec<String> = values.iter().map(|v| bindings.push_value(v)).collect();
        Ok(format!("{column} {operator} ({})", items.join(", ")))
    }
}
