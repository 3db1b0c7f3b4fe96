//! `column->key->key` selectors for values nested in JSON columns.
//!
//! # Example
//! ```
//! use sqlweave::json::{JsonSelector, is_json_selector};
//! use sqlweave::prefix::TablePrefixer;
//!
//! assert!(is_json_selector("meta->seo->title"));
//! let selector = JsonSelector::parse("meta->seo->title")?;
//! assert_eq!(
//!     selector.to_expression(&TablePrefixer::none()).sql(),
//!     r#"JSON_UNQUOTE(JSON_EXTRACT(meta, "$.seo.title"))"#
//! );
//! # Ok::<(), sqlweave::QbError>(())
//! ```

use crate::error::{QbError, QbResult};
use crate::prefix::{PrefixContext, TablePrefixer};
use crate::value::Raw;

const SEPARATOR: &str = "->";

/// True if `s` has a column and at least one path node.
pub fn is_json_selector(s: &str) -> bool {
    let parts: Vec<&str> = s.split(SEPARATOR).collect();
    parts.len() >= 2 && parts.iter().all(|p| !p.trim().is_empty())
}

/// A JSON column plus the path of nodes inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonSelector {
    column: String,
    nodes: Vec<String>,
}

impl JsonSelector {
    pub fn new<I, S>(column: impl Into<String>, nodes: I) -> QbResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let column = column.into();
        let nodes: Vec<String> = nodes.into_iter().map(Into::into).collect();
        if column.trim().is_empty() {
            return Err(QbError::InvalidJsonSelector(
                "selector column is empty".to_string(),
            ));
        }
        if nodes.is_empty() || nodes.iter().any(|n| n.trim().is_empty()) {
            return Err(QbError::InvalidJsonSelector(format!(
                "selector on '{column}' needs at least one non-empty node"
            )));
        }
        Ok(Self { column, nodes })
    }

    /// Parse `column->node->node`.
    pub fn parse(s: &str) -> QbResult<Self> {
        if !is_json_selector(s) {
            return Err(QbError::InvalidJsonSelector(s.to_string()));
        }
        let mut parts = s.split(SEPARATOR).map(|p| p.trim().to_string());
        let column = parts.next().unwrap_or_default();
        Self::new(column, parts)
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// The `$.a.b` path; nodes such as `tags[2]` pass through untouched.
    pub fn path(&self) -> String {
        format!("$.{}", self.nodes.join("."))
    }

    /// `JSON_EXTRACT(<column>, "$.a.b")`, still JSON-quoted.
    pub fn to_extract_expression(&self, prefixer: &TablePrefixer) -> Raw {
        let column = prefixer.prefix(&self.column, PrefixContext::Field);
        Raw::new(format!("JSON_EXTRACT({}, \"{}\")", column, self.path()))
    }

    /// `JSON_UNQUOTE(JSON_EXTRACT(<column>, "$.a.b"))`.
    pub fn to_expression(&self, prefixer: &TablePrefixer) -> Raw {
        let extract = self.to_extract_expression(prefixer);
        Raw::new(format!("JSON_UNQUOTE({})", extract.sql()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_json_selector() {
        assert!(is_json_selector("col->a->b"));
        assert!(is_json_selector("col->a"));
        assert!(!is_json_selector("col"));
        assert!(!is_json_selector("col->"));
        assert!(!is_json_selector("->a"));
    }

    #[test]
    fn test_parse() {
        let s = JsonSelector::parse("col -> a -> b").unwrap();
        assert_eq!(s.column(), "col");
        assert_eq!(s.nodes(), ["a", "b"]);
        assert!(matches!(
            JsonSelector::parse("col"),
            Err(QbError::InvalidJsonSelector(_))
        ));
    }

    #[test]
    fn test_expression() {
        let s = JsonSelector::parse("col->a->b").unwrap();
        assert_eq!(
            s.to_expression(&TablePrefixer::none()).sql(),
            r#"JSON_UNQUOTE(JSON_EXTRACT(col, "$.a.b"))"#
        );
    }

    #[test]
    fn test_expression_keeps_index_suffix() {
        let s = JsonSelector::new("data", ["tags[2]", "name"]).unwrap();
        assert_eq!(s.path(), "$.tags[2].name");
    }

    #[test]
    fn test_expression_prefixes_column() {
        let s = JsonSelector::parse("posts.meta->seo").unwrap();
        let prefixer = TablePrefixer::new("wp_");
        assert_eq!(
            s.to_expression(&prefixer).sql(),
            r#"JSON_UNQUOTE(JSON_EXTRACT(wp_posts.meta, "$.seo"))"#
        );
        assert_eq!(
            s.to_extract_expression(&prefixer).sql(),
            r#"JSON_EXTRACT(wp_posts.meta, "$.seo")"#
        );
    }

    #[test]
    fn test_new_rejects_empty_nodes() {
        assert!(JsonSelector::new("col", Vec::<String>::new()).is_err());
        assert!(JsonSelector::new("", ["a"]).is_err());
    }
}
