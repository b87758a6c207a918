//! Query records collected by the visual builder.
//!
//! Every record here is a plain value. Editing a form field replaces the
//! record with a modified copy, which is why the builder helpers on
//! [`BuilderState`] take `self` by value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Aggregate functions offered in the column picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Count => write!(f, "COUNT"),
            Aggregation::Sum => write!(f, "SUM"),
            Aggregation::Avg => write!(f, "AVG"),
            Aggregation::Min => write!(f, "MIN"),
            Aggregation::Max => write!(f, "MAX"),
        }
    }
}

impl FromStr for Aggregation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "COUNT" => Ok(Aggregation::Count),
            "SUM" => Ok(Aggregation::Sum),
            "AVG" => Ok(Aggregation::Avg),
            "MIN" => Ok(Aggregation::Min),
            "MAX" => Ok(Aggregation::Max),
            _ => Err(Error::InvalidAggregation(s.to_string())),
        }
    }
}

/// Comparison operators for a single WHERE predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    Like,
    In,
    IsNull,
    IsNotNull,
}

impl Operator {
    /// Every operator, in the order the builder lists them.
    pub const ALL: [Operator; 10] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Lt,
        Operator::Gt,
        Operator::Lte,
        Operator::Gte,
        Operator::Like,
        Operator::In,
        Operator::IsNull,
        Operator::IsNotNull,
    ];

    /// Null checks take no value.
    pub fn is_unary(self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Lte => "<=",
            Operator::Gte => ">=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "is  not null" and "IS NOT NULL" are the same operator
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();

        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| Error::InvalidOperator(s.to_string()))
    }
}

/// Sort direction for ORDER BY entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "ASC"),
            Direction::Desc => write!(f, "DESC"),
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ASC" => Ok(Direction::Asc),
            "DESC" => Ok(Direction::Desc),
            _ => Err(Error::InvalidDirection(s.to_string())),
        }
    }
}

/// One SELECT projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSelection {
    pub name: String,
    /// `None` selects the raw column.
    #[serde(default, with = "empty_as_none")]
    pub aggregation: Option<Aggregation>,
}

impl ColumnSelection {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aggregation: None,
        }
    }

    pub fn aggregate(aggregation: Aggregation, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aggregation: Some(aggregation),
        }
    }
}

impl fmt::Display for ColumnSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.aggregation {
            Some(aggregation) => write!(f, "{}({})", aggregation, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// One predicate of the top-level AND conjunction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhereCondition {
    pub column: String,
    #[serde(default, with = "empty_as_none")]
    pub operator: Option<Operator>,
    /// Ignored by the null checks.
    #[serde(default)]
    pub value: String,
}

impl WhereCondition {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator: Some(operator),
            value: value.into(),
        }
    }

    /// A condition without a value, e.g. `IS NULL`.
    pub fn unary(column: impl Into<String>, operator: Operator) -> Self {
        Self::new(column, operator, "")
    }
}

/// One ORDER BY entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderByClause {
    pub column: String,
    /// `None` sorts ascending.
    #[serde(default, with = "empty_as_none")]
    pub direction: Option<Direction>,
}

impl OrderByClause {
    pub fn new(column: impl Into<String>, direction: Direction) -> Self {
        Self {
            column: column.into(),
            direction: Some(direction),
        }
    }
}

impl fmt::Display for OrderByClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.direction.unwrap_or_default())
    }
}

/// Everything the visual builder knows about a query.
///
/// `table` is the only field generation depends on. The sequences are
/// emitted in the order they are stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuilderState {
    pub table: String,
    pub columns: Vec<ColumnSelection>,
    pub where_clause: Vec<WhereCondition>,
    pub group_by: Vec<String>,
    pub order_by: Vec<OrderByClause>,
    pub limit: String,
    pub offset: String,
}

impl BuilderState {
    /// Start a query against the given table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Select a raw column.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(ColumnSelection::named(name));
        self
    }

    /// Select an aggregated column.
    pub fn aggregate(mut self, aggregation: Aggregation, name: impl Into<String>) -> Self {
        self.columns.push(ColumnSelection::aggregate(aggregation, name));
        self
    }

    /// Add a predicate to the WHERE conjunction.
    pub fn filter(
        mut self,
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<String>,
    ) -> Self {
        self.where_clause
            .push(WhereCondition::new(column, operator, value));
        self
    }

    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderByClause::new(column, direction));
        self
    }

    pub fn limit(mut self, limit: impl fmt::Display) -> Self {
        self.limit = limit.to_string();
        self
    }

    pub fn offset(mut self, offset: impl fmt::Display) -> Self {
        self.offset = offset.to_string();
        self
    }
}

/// Column metadata from the schema lookup. Only used to offer choices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

/// Which editor produced the query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    /// Hand-written `rawSql`.
    #[default]
    Code,
    /// SQL generated from the builder fields.
    Builder,
}

/// Shape of the returned frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFormat {
    #[default]
    Table,
    TimeSeries,
}

fn default_time_columns() -> Vec<String> {
    vec!["time".to_string()]
}

/// A full query record as stored by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryModel {
    #[serde(default)]
    pub raw_sql: String,
    #[serde(default)]
    pub format: QueryFormat,
    /// Columns converted to timestamps in the result frame.
    #[serde(default = "default_time_columns")]
    pub time_columns: Vec<String>,
    #[serde(default)]
    pub editor_mode: EditorMode,
    #[serde(flatten)]
    pub builder: BuilderState,
}

impl Default for QueryModel {
    fn default() -> Self {
        Self {
            raw_sql: String::new(),
            format: QueryFormat::default(),
            time_columns: default_time_columns(),
            editor_mode: EditorMode::default(),
            builder: BuilderState::default(),
        }
    }
}

impl QueryModel {
    /// A hand-written query.
    pub fn code(raw_sql: impl Into<String>) -> Self {
        Self {
            raw_sql: raw_sql.into(),
            ..Self::default()
        }
    }

    /// A builder query. `raw_sql` is kept in sync with the builder.
    pub fn builder(state: BuilderState) -> Self {
        Self {
            raw_sql: crate::transpiler::generate(&state),
            editor_mode: EditorMode::Builder,
            builder: state,
            ..Self::default()
        }
    }
}

/// The builder stores unset choices as `""`.
mod empty_as_none {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::fmt::Display;
    use std::str::FromStr;

    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Display,
    {
        match value {
            Some(value) => serializer.collect_str(value),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
        T::Err: Display,
    {
        let raw = Option::<String>::deserialize(deserializer)?;

        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => s.parse().map(Some).map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_from_str() {
        assert_eq!("=".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("like".parse::<Operator>().unwrap(), Operator::Like);
        assert_eq!("is  not null".parse::<Operator>().unwrap(), Operator::IsNotNull);
        assert!("<>".parse::<Operator>().is_err());
    }

    #[test]
    fn test_operator_display_matches_parse() {
        for op in Operator::ALL {
            assert_eq!(op.to_string().parse::<Operator>().unwrap(), op);
        }
    }

    #[test]
    fn test_column_display() {
        assert_eq!(ColumnSelection::named("id").to_string(), "id");
        assert_eq!(
            ColumnSelection::aggregate(Aggregation::Sum, "amount").to_string(),
            "SUM(amount)"
        );
    }

    #[test]
    fn test_order_defaults_to_asc() {
        let order = OrderByClause {
            column: "ts".to_string(),
            direction: None,
        };
        assert_eq!(order.to_string(), "ts ASC");
    }

    #[test]
    fn test_builder_state_from_json() {
        let state: BuilderState = serde_json::from_value(json!({
            "table": "events",
            "columns": [
                {"name": "id", "aggregation": ""},
                {"name": "amount", "aggregation": "SUM"}
            ],
            "whereClause": [{"column": "status", "operator": "=", "value": "ok"}],
            "orderBy": [{"column": "ts", "direction": "DESC"}],
            "limit": "10"
        }))
        .unwrap();

        assert_eq!(
            state,
            BuilderState::new("events")
                .column("id")
                .aggregate(Aggregation::Sum, "amount")
                .filter("status", Operator::Eq, "ok")
                .order_by("ts", Direction::Desc)
                .limit(10)
        );
    }

    #[test]
    fn test_empty_operator_is_none() {
        let cond: WhereCondition =
            serde_json::from_value(json!({"column": "x", "operator": "", "value": "1"})).unwrap();
        assert_eq!(cond.operator, None);
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let result: Result<WhereCondition, _> =
            serde_json::from_value(json!({"column": "x", "operator": "BETWEEN"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_none_serializes_as_empty_string() {
        let value = serde_json::to_value(ColumnSelection::named("id")).unwrap();
        assert_eq!(value, json!({"name": "id", "aggregation": ""}));
    }

    #[test]
    fn test_query_model_defaults() {
        let model: QueryModel = serde_json::from_value(json!({"rawSql": "SELECT 1"})).unwrap();
        assert_eq!(model.format, QueryFormat::Table);
        assert_eq!(model.editor_mode, EditorMode::Code);
        assert_eq!(model.time_columns, vec!["time".to_string()]);
        assert!(model.builder.table.is_empty());
    }

    #[test]
    fn test_query_model_flattened_builder_fields() {
        let model: QueryModel = serde_json::from_value(json!({
            "rawSql": "",
            "format": "time_series",
            "editorMode": "builder",
            "table": "metrics",
            "groupBy": ["host"]
        }))
        .unwrap();

        assert_eq!(model.format, QueryFormat::TimeSeries);
        assert_eq!(model.editor_mode, EditorMode::Builder);
        assert_eq!(model.builder.table, "metrics");
        assert_eq!(model.builder.group_by, vec!["host".to_string()]);
    }

    #[test]
    fn test_column_info_type_field() {
        let info: ColumnInfo =
            serde_json::from_value(json!({"name": "id", "type": "INTEGER"})).unwrap();
        assert_eq!(info.data_type, "INTEGER");
    }
}
