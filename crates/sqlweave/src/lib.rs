//! # sqlweave
//!
//! A query builder that compiles statements into MySQL-flavoured SQL with
//! `%s` / `%d` / `%f` placeholders and an ordered list of bindings, ready for
//! a prepared-statement API.
//!
//! ## Features
//!
//! - **Placeholders never drift**: bindings are collected in the same pass that emits the SQL
//! - **Table prefixes**: tables and `table.column` fields get a configured prefix
//! - **JSON selectors**: `meta->seo->title` compiles to `JSON_UNQUOTE(JSON_EXTRACT(..))`
//! - **Nested criteria**: closures build parenthesized groups, to any depth
//! - **Raw fragments**: literal SQL with its own bindings interpolated in place
//! - **No I/O**: compiled queries are handed to an [`Executor`] you provide
//!
//! ## Query Builder
//!
//! ```
//! use sqlweave::prelude::*;
//!
//! let qb = QueryBuilder::default().table("foo");
//!
//! let select = qb.clone().where_("tree", "=", "value").select_query()?;
//! assert_eq!(select.sql, "SELECT * FROM foo WHERE tree = %s");
//!
//! let insert = qb.insert_query(row([
//!     ("id", Value::from(24)),
//!     ("flag", Value::raw("CURRENT_TIMESTAMP")),
//! ]))?;
//! assert_eq!(insert.sql, "INSERT INTO foo (id,flag) VALUES (%d,CURRENT_TIMESTAMP)");
//! assert_eq!(insert.bindings, vec![Binding::int(24)]);
//! # Ok::<(), sqlweave::QbError>(())
//! ```

pub mod builder;
pub mod client;
pub mod compiler;
pub mod config;
pub mod criteria;
pub mod error;
pub mod json;
pub mod normalize;
pub mod prefix;
pub mod prelude;
pub mod statement;
pub mod value;

mod trace;

pub use builder::{JoinBuilder, NestedCriteria, QueryBuilder, WhereClause};
pub use client::{Executor, ResultRow};
pub use compiler::{Aggregate, CompiledQuery, QueryCompiler, QueryType};
pub use config::CompilerConfig;
pub use error::{QbError, QbResult};
pub use json::JsonSelector;
pub use prefix::TablePrefixer;
pub use statement::{
    CriteriaKind, CriteriaStatement, Direction, Field, InsertMode, JoinType, Joiner, Operand,
    QueryStatements, Row, row,
};
pub use value::{Binding, BindingKind, Raw, Scalar, Value};
