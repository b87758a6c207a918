//! Statement composition tests.

use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;
use crate::ast::*;

fn state(value: serde_json::Value) -> BuilderState {
    serde_json::from_value(value).unwrap()
}

// ============= Composer =============

#[test]
fn test_bare_table() {
    let s = state(json!({
        "table": "events",
        "columns": [],
        "whereClause": [],
        "groupBy": [],
        "orderBy": [],
        "limit": "",
        "offset": ""
    }));
    assert_eq!(generate(&s), "SELECT *\nFROM events");
}

#[test]
fn test_columns_where_limit() {
    let s = state(json!({
        "table": "events",
        "columns": [
            {"name": "id", "aggregation": ""},
            {"name": "amount", "aggregation": "SUM"}
        ],
        "whereClause": [{"column": "status", "operator": "=", "value": "ok"}],
        "limit": "10"
    }));
    assert_eq!(
        generate(&s),
        "SELECT id, SUM(amount)\nFROM events\nWHERE status = 'ok'\nLIMIT 10"
    );
}

#[test]
fn test_is_null() {
    let s = state(json!({
        "table": "t",
        "whereClause": [{"column": "x", "operator": "IS NULL", "value": ""}]
    }));
    assert_eq!(generate(&s), "SELECT *\nFROM t\nWHERE x IS NULL");
}

#[test]
fn test_in_list() {
    let s = state(json!({
        "table": "t",
        "whereClause": [{"column": "id", "operator": "IN", "value": "1,2,3"}]
    }));
    assert_eq!(generate(&s), "SELECT *\nFROM t\nWHERE id IN (1,2,3)");
}

#[test]
fn test_empty_table_generates_nothing() {
    let s = state(json!({
        "table": "",
        "columns": [{"name": "id", "aggregation": "COUNT"}],
        "whereClause": [{"column": "x", "operator": "=", "value": "1"}],
        "groupBy": ["x"],
        "limit": "5",
        "offset": "10"
    }));
    assert_eq!(generate(&s), "");
    assert_eq!(generate(&BuilderState::default()), "");
}

#[test]
fn test_order_by_drops_blank_entry() {
    let s = state(json!({
        "table": "t",
        "orderBy": [
            {"column": "ts", "direction": "DESC"},
            {"column": "", "direction": "ASC"}
        ]
    }));
    assert_eq!(generate(&s), "SELECT *\nFROM t\nORDER BY ts DESC");
}

#[test]
fn test_full_statement_clause_order() {
    let s = BuilderState::new("metrics")
        .column("host")
        .aggregate(Aggregation::Avg, "cpu")
        .filter("region", Operator::Ne, "eu")
        .filter("cpu", Operator::Gte, "0.5")
        .group_by("host")
        .group_by("region")
        .order_by("host", Direction::Asc)
        .limit(100)
        .offset(200);

    assert_eq!(
        generate(&s),
        "SELECT host, AVG(cpu)\n\
         FROM metrics\n\
         WHERE region != 'eu' AND cpu >= '0.5'\n\
         GROUP BY host, region\n\
         ORDER BY host ASC\n\
         LIMIT 100\n\
         OFFSET 200"
    );
}

#[test]
fn test_offset_without_limit() {
    let s = BuilderState::new("t").offset(5);
    assert_eq!(generate(&s), "SELECT *\nFROM t\nOFFSET 5");
}

#[test]
fn test_limit_passed_through_verbatim() {
    let s = BuilderState::new("t").limit("ten");
    assert_eq!(generate(&s), "SELECT *\nFROM t\nLIMIT ten");
}

#[test]
fn test_where_omitted_when_all_conditions_incomplete() {
    let mut s = BuilderState::new("t");
    s.where_clause.push(WhereCondition::new("", Operator::Eq, "1"));
    s.where_clause.push(WhereCondition {
        column: "x".to_string(),
        operator: None,
        value: String::new(),
    });
    assert_eq!(generate(&s), "SELECT *\nFROM t");
}

#[test]
fn test_no_group_by_validation() {
    // GROUP BY columns are not checked against the SELECT list
    let s = BuilderState::new("t").column("a").group_by("b");
    assert_eq!(generate(&s), "SELECT a\nFROM t\nGROUP BY b");
}

#[test]
fn test_generation_is_deterministic() {
    let s = BuilderState::new("t")
        .column("a")
        .filter("a", Operator::Like, "%x%")
        .order_by("a", Direction::Desc);
    assert_eq!(generate(&s), generate(&s.clone()));
}

#[test]
fn test_clause_presence_matches_fields() {
    let s = BuilderState::new("t").column("a");
    let sql = generate(&s);
    for keyword in ["WHERE", "GROUP BY", "ORDER BY", "LIMIT", "OFFSET"] {
        assert!(!sql.contains(keyword), "{keyword} should be omitted");
    }
}

#[test]
fn test_unescaped_quote_in_statement() {
    let s = BuilderState::new("people").filter("name", Operator::Eq, "O'Brien");
    assert_eq!(
        generate(&s),
        "SELECT *\nFROM people\nWHERE name = 'O'Brien'"
    );
    assert_eq!(
        s.to_sql_with(LiteralMode::Escaped),
        "SELECT *\nFROM people\nWHERE name = 'O''Brien'"
    );
}

// ============= Query model =============

#[test]
fn test_builder_mode_regenerates() {
    let mut model = QueryModel::builder(BuilderState::new("events").limit(1));
    model.raw_sql = "SELECT stale".to_string();
    assert_eq!(model.to_sql(), "SELECT *\nFROM events\nLIMIT 1");
}

#[test]
fn test_code_mode_uses_raw_sql() {
    let mut model = QueryModel::code("SELECT 1");
    model.builder = BuilderState::new("ignored");
    assert_eq!(model.to_sql(), "SELECT 1");
}

#[test]
fn test_builder_constructor_syncs_raw_sql() {
    let model = QueryModel::builder(BuilderState::new("events"));
    assert_eq!(model.raw_sql, "SELECT *\nFROM events");
    assert_eq!(model.editor_mode, EditorMode::Builder);
}
