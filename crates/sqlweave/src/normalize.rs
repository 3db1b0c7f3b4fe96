//! Field normalization.
//!
//! Turns any [`Field`] into the SQL text that stands in its place: JSON
//! selectors become `JSON_UNQUOTE(JSON_EXTRACT(..))`, raw fragments get their
//! bindings interpolated, and plain names go through the prefixer.

use crate::error::{QbError, QbResult};
use crate::json::{JsonSelector, is_json_selector};
use crate::prefix::{PrefixContext, TablePrefixer};
use crate::statement::{Field, TableStatement};
use crate::value::Raw;

/// How substituted text treats `%`.
#[derive(Clone, Copy, PartialEq)]
enum Percent {
    /// Output stays a format string: literal `%` is doubled, `%%` kept.
    Escaped,
    /// Final SQL text: literals verbatim, `%%` collapsed to `%`.
    Plain,
}

/// Substitute a fragment's bindings into its `%s`/`%d`/`%f` tokens.
///
/// Tokens are filled left to right with escaped literals. The result is
/// still a placeholder string, so any `%` inside a literal is written as
/// `%%`. `%%` is kept as is and consumes nothing. Tokens without a binding
/// stay in the text and extra bindings are dropped.
pub fn interpolate(raw: &Raw) -> String {
    if !raw.has_bindings() {
        return raw.sql().to_string();
    }
    substitute(raw, Percent::Escaped)
}

/// The fragment as the database would receive it, for debugging.
pub fn render_sql(raw: &Raw) -> String {
    substitute(raw, Percent::Plain)
}

fn substitute(raw: &Raw, percent: Percent) -> String {
    let sql = raw.sql();
    let mut out = String::with_capacity(sql.len());
    let mut bindings = raw.bindings().iter();
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('%') => {
                chars.next();
                out.push_str(match percent {
                    Percent::Escaped => "%%",
                    Percent::Plain => "%",
                });
            }
            Some('s' | 'd' | 'f') => {
                let token = chars.next().unwrap_or_default();
                match bindings.next() {
                    Some(binding) => {
                        let literal = binding.to_sql_literal();
                        match percent {
                            Percent::Escaped => out.push_str(&literal.replace('%', "%%")),
                            Percent::Plain => out.push_str(&literal),
                        }
                    }
                    None => {
                        out.push('%');
                        out.push(token);
                    }
                }
            }
            _ => out.push('%'),
        }
    }
    out
}

/// Resolves fields and tables against one prefixer.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    prefixer: &'a TablePrefixer,
}

impl<'a> Normalizer<'a> {
    pub fn new(prefixer: &'a TablePrefixer) -> Self {
        Self { prefixer }
    }

    pub fn prefixer(&self) -> &'a TablePrefixer {
        self.prefixer
    }

    /// The SQL text for a column slot.
    pub fn resolve_field(&self, field: &Field) -> QbResult<String> {
        match field {
            Field::Column(name) if is_json_selector(name) => {
                let selector = JsonSelector::parse(name)?;
                Ok(selector.to_expression(self.prefixer).sql().to_string())
            }
            Field::Column(name) => Ok(self.prefixer.prefix(name, PrefixContext::Field)),
            Field::Json(selector) => Ok(selector.to_expression(self.prefixer).sql().to_string()),
            Field::Raw(raw) => Ok(interpolate(raw)),
            Field::Nested(_) => Err(QbError::malformed(
                "a nested criteria group cannot be used as a column",
            )),
        }
    }

    /// A field with an optional `AS alias`.
    pub fn resolve_aliased(&self, field: &Field, alias: Option<&str>) -> QbResult<String> {
        let resolved = self.resolve_field(field)?;
        Ok(with_alias(resolved, alias))
    }

    /// A table reference. Names are prefixed in table context.
    pub fn resolve_table(&self, table: &TableStatement) -> QbResult<String> {
        let resolved = match table.table() {
            Field::Column(name) => self.prefixer.prefix(name, PrefixContext::Table),
            Field::Raw(raw) => interpolate(raw),
            Field::Json(_) | Field::Nested(_) => {
                return Err(QbError::invalid_statement(
                    "a table must be a name or a raw expression",
                ));
            }
        };
        Ok(with_alias(resolved, table.alias()))
    }
}

fn with_alias(expr: String, alias: Option<&str>) -> String {
    match alias {
        Some(alias) if !alias.is_empty() => format!("{expr} AS {alias}"),
        _ => expr,
    }
}
