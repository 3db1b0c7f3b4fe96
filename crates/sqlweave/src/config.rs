//! Compiler configuration.
//!
//! A [`CompilerConfig`] is built in code or read from TOML and snapshotted by
//! each [`QueryCompiler`](crate::QueryCompiler) when it is created.

use crate::error::{QbError, QbResult};
use crate::prefix::TablePrefixer;
use serde::Deserialize;

const DEFAULT_MAX_LOGGED_SQL_LENGTH: usize = 200;

fn default_max_logged_sql_length() -> Option<usize> {
    Some(DEFAULT_MAX_LOGGED_SQL_LENGTH)
}

/// Configuration a [`QueryCompiler`](crate::QueryCompiler) is created with.
///
/// The compiler keeps its own copy; changing a config after the compiler
/// was built has no effect on it.
///
/// Can be embedded in an application config file:
///
/// ```toml
/// table_prefix = "wp_"
/// max_logged_sql_length = 500
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Prefix prepended to table names. `None` disables prefixing.
    pub table_prefix: Option<String>,
    /// Truncate logged SQL (in bytes). `None` logs it whole.
    #[serde(default = "default_max_logged_sql_length")]
    pub max_logged_sql_length: Option<usize>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            table_prefix: None,
            max_logged_sql_length: default_max_logged_sql_length(),
        }
    }
}

impl CompilerConfig {
    /// Create a configuration with defaults (no prefix, logged SQL truncated at 200 bytes).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(raw: &str) -> QbResult<Self> {
        toml::from_str(raw).map_err(|e| QbError::config(format!("failed to parse config: {e}")))
    }

    /// Set the table prefix. An empty prefix disables prefixing.
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.table_prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    pub fn without_table_prefix(mut self) -> Self {
        self.table_prefix = None;
        self
    }

    /// Set maximum SQL length to log.
    pub fn with_max_logged_sql_length(mut self, len: usize) -> Self {
        self.max_logged_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_log_truncation(mut self) -> Self {
        self.max_logged_sql_length = None;
        self
    }

    pub fn prefixer(&self) -> TablePrefixer {
        TablePrefixer::from_option(self.table_prefix.clone())
    }
}
