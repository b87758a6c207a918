//! SQL generation for builder queries.
//!
//! Converts a [`BuilderState`] into a readable statement, one clause per
//! line. Generation never fails: rows the user has not finished filling in
//! are skipped and a missing table yields an empty string.

pub mod clauses;
pub mod conditions;

#[cfg(test)]
mod tests;

use crate::ast::{BuilderState, EditorMode, QueryModel};

pub use clauses::{order_by_list, select_list, where_conjunction};
pub use conditions::{LiteralMode, render_condition};

/// Trait for converting query records to SQL.
pub trait ToSql {
    /// Convert this record to a SQL string.
    fn to_sql(&self) -> String {
        self.to_sql_with(LiteralMode::default())
    }

    /// Convert this record to a SQL string, choosing how literals are quoted.
    fn to_sql_with(&self, mode: LiteralMode) -> String;
}

impl ToSql for BuilderState {
    fn to_sql_with(&self, mode: LiteralMode) -> String {
        if self.table.is_empty() {
            return String::new();
        }

        let mut lines: Vec<String> = Vec::with_capacity(7);

        lines.push(format!("SELECT {}", select_list(&self.columns)));
        lines.push(format!("FROM {}", self.table));

        let filter = where_conjunction(&self.where_clause, mode);
        if !filter.is_empty() {
            lines.push(format!("WHERE {}", filter));
        }

        if !self.group_by.is_empty() {
            lines.push(format!("GROUP BY {}", self.group_by.join(", ")));
        }

        let order = order_by_list(&self.order_by);
        if !order.is_empty() {
            lines.push(format!("ORDER BY {}", order));
        }

        // LIMIT and OFFSET are not validated, the engine reports bad values
        if !self.limit.is_empty() {
            lines.push(format!("LIMIT {}", self.limit));
        }

        if !self.offset.is_empty() {
            lines.push(format!("OFFSET {}", self.offset));
        }

        lines.join("\n")
    }
}

impl ToSql for QueryModel {
    /// Builder queries are regenerated, code queries use `rawSql` as typed.
    fn to_sql_with(&self, mode: LiteralMode) -> String {
        match self.editor_mode {
            EditorMode::Builder => self.builder.to_sql_with(mode),
            EditorMode::Code => self.raw_sql.clone(),
        }
    }
}

/// Generate the SQL for a builder state.
///
/// # Example
///
/// ```
/// use rqb::prelude::*;
///
/// let state = BuilderState::new("events")
///     .column("id")
///     .aggregate(Aggregation::Sum, "amount")
///     .filter("status", Operator::Eq, "ok")
///     .limit(10);
///
/// assert_eq!(
///     rqb::generate(&state),
///     "SELECT id, SUM(amount)\nFROM events\nWHERE status = 'ok'\nLIMIT 10"
/// );
/// ```
pub fn generate(state: &BuilderState) -> String {
    let sql = state.to_sql();
    tracing::trace!(table = %state.table, lines = sql.lines().count(), "generated builder SQL");
    sql
}
