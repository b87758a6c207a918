//! Dashboard variables and time macros.
//!
//! Generated and hand-written SQL go through two passes before execution:
//!
//! 1. [`substitute`] replaces dashboard variables (`$host`, `${host}`).
//! 2. [`apply_macros`] expands the time macros against the panel's range.
//!
//! | Macro                        | Expands to                              |
//! |------------------------------|-----------------------------------------|
//! | `$__timeFilter(col)`         | `col >= <from> AND col <= <to>`         |
//! | `$__unixEpochFilter(col)`    | same as `$__timeFilter`                 |
//! | `$__timeGroup(col, 5m)`      | `(CAST(col / 300 AS INTEGER) * 300)`    |
//! | `$__timeFrom` / `$__timeTo`  | range bounds in epoch seconds           |
//!
//! Anything that does not parse as a macro or a known variable is copied
//! through unchanged.

use chrono::{DateTime, Utc};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_till, take_while1},
    character::complete::{char, digit0, digit1, multispace0},
    combinator::{map, map_res, opt, recognize, value},
    multi::many1,
    sequence::{delimited, preceded, tuple},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Interval used by `$__timeGroup` when the given one is unusable.
const DEFAULT_GROUP_SECONDS: i64 = 60;

/// The dashboard time range a query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Build a range from epoch seconds.
    pub fn from_unix(from: i64, to: i64) -> Self {
        Self {
            from: DateTime::from_timestamp(from, 0).unwrap_or_default(),
            to: DateTime::from_timestamp(to, 0).unwrap_or_default(),
        }
    }
}

/// Value of a dashboard variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    /// Inserted as typed.
    Single(String),
    /// Inserted as a quoted list (`'a','b'`), ready for `IN (...)`.
    Multi(Vec<String>),
}

impl VariableValue {
    fn render(&self) -> String {
        match self {
            VariableValue::Single(value) => value.clone(),
            VariableValue::Multi(values) => values
                .iter()
                .map(|v| format!("'{}'", v.replace('\'', "''")))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl From<&str> for VariableValue {
    fn from(v: &str) -> Self {
        VariableValue::Single(v.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(v: String) -> Self {
        VariableValue::Single(v)
    }
}

impl From<Vec<String>> for VariableValue {
    fn from(v: Vec<String>) -> Self {
        VariableValue::Multi(v)
    }
}

/// Variables visible to a single query, keyed by name without the `$`.
pub type ScopedVars = BTreeMap<String, VariableValue>;

/// Replace `$name` and `${name}` with the variable's value.
///
/// Names starting with `__` belong to the macro pass and are skipped, as are
/// names that have no value in `vars`.
pub fn substitute(sql: &str, vars: &ScopedVars) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;

    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let candidate = &rest[idx..];

        match parse_variable(candidate) {
            Ok((remaining, name)) if !name.starts_with("__") => match vars.get(name) {
                Some(value) => {
                    out.push_str(&value.render());
                    rest = remaining;
                }
                None => {
                    out.push_str(&candidate[..candidate.len() - remaining.len()]);
                    rest = remaining;
                }
            },
            _ => {
                out.push('$');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Expand the time macros in `sql`.
///
/// `interval_ms` is the panel's query interval, used for
/// `$__timeGroup(col, $__interval)`.
pub fn apply_macros(sql: &str, range: &TimeRange, interval_ms: i64) -> String {
    let from = range.from.timestamp();
    let to = range.to.timestamp();

    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;

    while let Some(idx) = rest.find("$__") {
        out.push_str(&rest[..idx]);
        let candidate = &rest[idx..];

        match parse_macro(candidate) {
            Ok((remaining, found)) => {
                out.push_str(&found.expand(from, to, interval_ms));
                rest = remaining;
            }
            Err(_) => {
                out.push_str("$__");
                rest = &candidate[3..];
            }
        }
    }

    out.push_str(rest);

    if out != sql {
        tracing::debug!(sql = %out, "expanded macros");
    }

    out
}

/// Convert an interval to whole seconds.
///
/// Accepts `$__interval`, bare seconds (`60`), durations (`5m`, `1h30m`,
/// `1.5h`, `500ms`) and days (`1d`). Returns 0 for anything else.
pub fn parse_interval(s: &str, interval_ms: i64) -> i64 {
    let s = s.trim();

    if s == "$__interval" {
        return interval_ms / 1000;
    }

    if let Ok(n) = s.parse::<i64>() {
        return n;
    }

    if let Ok(("", seconds)) = parse_duration(s) {
        return seconds as i64;
    }

    // Out of range day counts fall through to 0
    s.strip_suffix('d')
        .and_then(|days| days.parse::<i64>().ok())
        .and_then(|n| n.checked_mul(86_400))
        .unwrap_or(0)
}

/// A panel interval in milliseconds, or `None` unless it is a positive
/// duration that fits.
pub fn interval_ms(s: &str) -> Option<i64> {
    let seconds = parse_interval(s, 0);
    if seconds <= 0 {
        return None;
    }
    seconds.checked_mul(1000)
}

#[derive(Debug, Clone, PartialEq)]
enum Macro<'a> {
    TimeFilter(&'a str),
    UnixEpochFilter(&'a str),
    TimeGroup { column: &'a str, interval: &'a str },
    TimeFrom,
    TimeTo,
}

impl Macro<'_> {
    fn expand(&self, from: i64, to: i64, interval_ms: i64) -> String {
        match self {
            Macro::TimeFilter(col) | Macro::UnixEpochFilter(col) => {
                format!("{col} >= {from} AND {col} <= {to}")
            }
            Macro::TimeGroup { column, interval } => {
                let mut seconds = parse_interval(interval, interval_ms);
                if seconds <= 0 {
                    seconds = DEFAULT_GROUP_SECONDS;
                }
                format!("(CAST({column} / {seconds} AS INTEGER) * {seconds})")
            }
            Macro::TimeFrom => from.to_string(),
            Macro::TimeTo => to.to_string(),
        }
    }
}

fn parse_word(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn parse_macro(input: &str) -> IResult<&str, Macro<'_>> {
    alt((
        map(
            delimited(tag("$__timeFilter("), parse_word, char(')')),
            Macro::TimeFilter,
        ),
        map(
            delimited(tag("$__unixEpochFilter("), parse_word, char(')')),
            Macro::UnixEpochFilter,
        ),
        map(
            tuple((
                tag("$__timeGroup("),
                parse_word,
                multispace0,
                char(','),
                multispace0,
                take_till(|c: char| c == ')'),
                char(')'),
            )),
            |(_, column, _, _, _, interval, _)| Macro::TimeGroup {
                column,
                interval: interval.trim(),
            },
        ),
        value(Macro::TimeFrom, tag("$__timeFrom")),
        value(Macro::TimeTo, tag("$__timeTo")),
    ))(input)
}

/// `${name}` or `$name`.
fn parse_variable(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(tag("${"), parse_word, char('}')),
        preceded(char('$'), parse_word),
    ))(input)
}

/// Duration strings like `1h30m`, in seconds.
fn parse_duration(input: &str) -> IResult<&str, f64> {
    let (input, sign) = opt(alt((char('-'), char('+'))))(input)?;
    let (input, parts) = many1(tuple((parse_decimal, parse_unit)))(input)?;

    let total: f64 = parts.iter().map(|(n, unit)| n * unit).sum();
    let total = if sign == Some('-') { -total } else { total };

    Ok((input, total))
}

fn parse_decimal(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((digit1, opt(tuple((char('.'), digit0)))))),
        str::parse::<f64>,
    )(input)
}

/// Unit multiplier to seconds. `ms` must be tried before `m`.
fn parse_unit(input: &str) -> IResult<&str, f64> {
    alt((
        value(1e-9, tag("ns")),
        value(1e-6, alt((tag("us"), tag("µs")))),
        value(1e-3, tag("ms")),
        value(1.0, tag("s")),
        value(60.0, tag("m")),
        value(3600.0, tag("h")),
    ))(input)
}
