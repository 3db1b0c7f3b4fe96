//! Convenient imports for typical `sqlweave` usage.
//!
//! ```
//! use sqlweave::prelude::*;
//! ```

pub use crate::{
    Aggregate, Binding, CompiledQuery, CompilerConfig, Direction, Executor, InsertMode, JoinType,
    JsonSelector, QbError, QbResult, QueryBuilder, QueryType, Raw, ResultRow, Row, Value,
    WhereClause, row,
};
