//! # rqb: a visual SQL query builder backend
//!
//! rqb turns a structured builder state (table, columns, filters, grouping,
//! ordering, paging) into a SQL SELECT statement, expands dashboard variables
//! and time macros, and runs the result against a SQLite-compatible store.
//!
//! ## Quick Example
//!
//! ```
//! use rqb::prelude::*;
//!
//! let state = BuilderState::new("events")
//!     .aggregate(Aggregation::Count, "id")
//!     .filter("status", Operator::Eq, "ok")
//!     .group_by("status");
//!
//! assert_eq!(
//!     state.to_sql(),
//!     "SELECT COUNT(id)\nFROM events\nWHERE status = 'ok'\nGROUP BY status"
//! );
//! ```
//!
//! ## Pipeline
//!
//! | Stage       | Module          | Output                      |
//! |-------------|-----------------|-----------------------------|
//! | Build       | [`transpiler`]  | SQL text from a builder     |
//! | Substitute  | [`macros`]      | `$var` / `${var}` replaced  |
//! | Expand      | [`macros`]      | `$__timeFilter(...)` etc.   |
//! | Execute     | [`engine`]      | Raw rows                    |
//! | Shape       | [`frames`]      | Typed columns               |

pub mod ast;
pub mod config;
pub mod engine;
pub mod error;
pub mod frames;
pub mod macros;
pub mod parser;
pub mod transpiler;

pub use error::{Error, Result};
pub use transpiler::generate;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::config::Config;
    pub use crate::engine::{Datasource, QueryContext, SchemaProvider};
    pub use crate::error::{Error, Result};
    pub use crate::frames::{Frame, FrameKind};
    pub use crate::macros::{ScopedVars, TimeRange, VariableValue, apply_macros, substitute};
    pub use crate::parser::{parse_column, parse_condition, parse_order};
    pub use crate::transpiler::{LiteralMode, ToSql, generate};
}
