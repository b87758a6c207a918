//! Renderers for the list-shaped clauses.
//!
//! Each one takes the builder's rows in order and returns the clause body
//! without its keyword. An empty body means the clause is left out.

use crate::ast::{ColumnSelection, OrderByClause, WhereCondition};

use super::conditions::{LiteralMode, render_condition};

/// The SELECT list. No columns selects `*`.
pub fn select_list(columns: &[ColumnSelection]) -> String {
    if columns.is_empty() {
        return "*".to_string();
    }

    let cols: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    cols.join(", ")
}

/// The WHERE body: every complete condition, joined with AND.
pub fn where_conjunction(conditions: &[WhereCondition], mode: LiteralMode) -> String {
    let parts: Vec<String> = conditions
        .iter()
        .filter_map(|c| render_condition(c, mode))
        .collect();

    parts.join(" AND ")
}

/// The ORDER BY body. Rows without a column are skipped.
pub fn order_by_list(order_by: &[OrderByClause]) -> String {
    let parts: Vec<String> = order_by
        .iter()
        .filter(|o| !o.column.is_empty())
        .map(|o| o.to_string())
        .collect();

    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Aggregation, Direction, Operator};

    #[test]
    fn test_select_star_when_empty() {
        assert_eq!(select_list(&[]), "*");
    }

    #[test]
    fn test_select_keeps_order_and_aggregates() {
        let columns = [
            ColumnSelection::aggregate(Aggregation::Count, "id"),
            ColumnSelection::named("host"),
            ColumnSelection::aggregate(Aggregation::Max, "cpu"),
        ];
        assert_eq!(select_list(&columns), "COUNT(id), host, MAX(cpu)");
    }

    #[test]
    fn test_select_does_not_dedupe() {
        let columns = [ColumnSelection::named("a"), ColumnSelection::named("a")];
        assert_eq!(select_list(&columns), "a, a");
    }

    #[test]
    fn test_where_and_count() {
        let conditions = [
            WhereCondition::new("a", Operator::Eq, "1"),
            WhereCondition::new("", Operator::Eq, "dropped"),
            WhereCondition::unary("b", Operator::IsNull),
            WhereCondition {
                column: "c".to_string(),
                operator: None,
                value: "dropped".to_string(),
            },
            WhereCondition::new("d", Operator::In, "1,2"),
        ];

        let sql = where_conjunction(&conditions, LiteralMode::Verbatim);
        assert_eq!(sql, "a = '1' AND b IS NULL AND d IN (1,2)");
        assert_eq!(sql.matches(" AND ").count(), 2);
        assert!(!sql.contains("dropped"));
    }

    #[test]
    fn test_where_empty_when_nothing_survives() {
        let conditions = [WhereCondition::new("", Operator::Eq, "1")];
        assert_eq!(where_conjunction(&conditions, LiteralMode::Verbatim), "");
        assert_eq!(where_conjunction(&[], LiteralMode::Verbatim), "");
    }

    #[test]
    fn test_order_by_skips_blank_columns() {
        let order = [
            OrderByClause::new("ts", Direction::Desc),
            OrderByClause::new("", Direction::Asc),
            OrderByClause {
                column: "host".to_string(),
                direction: None,
            },
        ];
        assert_eq!(order_by_list(&order), "ts DESC, host ASC");
    }

    #[test]
    fn test_order_by_empty() {
        assert_eq!(order_by_list(&[]), "");
        assert_eq!(order_by_list(&[OrderByClause::default()]), "");
    }
}
