use crate::ast::{Operator, WhereCondition};

/// How quoted literals are written into the statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LiteralMode {
    /// Values are wrapped in single quotes exactly as typed. A value that
    /// contains `'` produces broken SQL.
    #[default]
    Verbatim,
    /// Opt-in: embedded single quotes are doubled (`O'Brien` -> `'O''Brien'`).
    /// `IN` lists and null checks are still written as given.
    Escaped,
}

impl LiteralMode {
    fn quote(self, value: &str) -> String {
        match self {
            LiteralMode::Verbatim => format!("'{}'", value),
            LiteralMode::Escaped => format!("'{}'", value.replace('\'', "''")),
        }
    }
}

/// Render a single predicate.
///
/// Returns `None` for half-filled rows (no column or no operator yet).
pub fn render_condition(condition: &WhereCondition, mode: LiteralMode) -> Option<String> {
    let WhereCondition {
        column,
        operator,
        value,
    } = condition;

    if column.is_empty() {
        return None;
    }

    let op = (*operator)?;

    let sql = match op {
        Operator::IsNull | Operator::IsNotNull => format!("{} {}", column, op),
        // The list is passed through untouched, the caller supplies `1,2,3` or `'a','b'`
        Operator::In => format!("{} IN ({})", column, value),
        _ => format!("{} {} {}", column, op, mode.quote(value)),
    };

    Some(sql)
}
