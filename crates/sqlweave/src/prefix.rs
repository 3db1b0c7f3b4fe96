//! Table prefixing.
//!
//! When a prefix is configured, table names always get it, and `table.column`
//! fields get it on their table part. The field rule is a heuristic rather
//! than an identifier parser: a field is only prefixed when it matches
//! `^[A-Za-z0-9_.]+$`, contains exactly one `.` and does not already start
//! with the prefix. That leaves `*`, function calls and
//! `schema.table.column` forms untouched.
//!
//! Raw fragments, JSON selectors and nested groups are never rewritten here;
//! JSON selectors prefix their column when they are expanded.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn prefixable_field() -> &'static Regex {
    static FIELD_RE: OnceLock<Regex> = OnceLock::new();
    FIELD_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_.]+$").expect("invalid built-in field regex")
    })
}

/// Where the value being prefixed appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixContext {
    /// A column reference, possibly `table.column`.
    Field,
    /// A table name.
    Table,
}

/// Applies the configured table prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePrefixer {
    prefix: Option<String>,
}

impl TablePrefixer {
    /// Create a prefixer. An empty prefix disables prefixing.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: (!prefix.is_empty()).then_some(prefix),
        }
    }

    /// A prefixer that leaves everything unchanged.
    pub fn none() -> Self {
        Self { prefix: None }
    }

    pub fn from_option(prefix: Option<String>) -> Self {
        prefix.map_or_else(Self::none, Self::new)
    }

    pub fn prefix_str(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Prefix a single name.
    pub fn prefix(&self, value: &str, context: PrefixContext) -> String {
        let Some(prefix) = self.prefix.as_deref() else {
            return value.to_string();
        };
        match context {
            PrefixContext::Table => format!("{prefix}{value}"),
            PrefixContext::Field => {
                let prefixable = prefixable_field().is_match(value)
                    && value.matches('.').count() == 1
                    && !value.starts_with(prefix);
                if prefixable {
                    format!("{prefix}{value}")
                } else {
                    value.to_string()
                }
            }
        }
    }
}
