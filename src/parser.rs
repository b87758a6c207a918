//! Shorthand parsers for builder rows typed on the command line.
//!
//! These read one builder row each, the same thing a form field collects.
//! They are not SQL parsers: a generated statement is never read back.
//!
//! ```text
//! --column 'SUM(amount)'     -> ColumnSelection { name: amount, aggregation: SUM }
//! --where  "status = 'ok'"   -> WhereCondition  { status, =, ok }
//! --where  'id IN (1,2,3)'   -> WhereCondition  { id, IN, 1,2,3 }
//! --order-by 'ts desc'       -> OrderByClause   { ts, DESC }
//! ```

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{eof, map, opt, peek, recognize, value},
    sequence::{delimited, terminated, tuple},
};

use crate::ast::*;
use crate::error::{Error, Result};

/// Parse a SELECT entry: `name` or `AGG(name)`.
pub fn parse_column(input: &str) -> Result<ColumnSelection> {
    let trimmed = input.trim();
    let (rest, (head, inner)) = finish(
        trimmed,
        tuple((
            parse_identifier,
            opt(delimited(
                tuple((multispace0, char('('), multispace0)),
                parse_identifier,
                tuple((multispace0, char(')'))),
            )),
        ))(trimmed),
    )?;
    expect_end(trimmed, rest)?;

    match inner {
        Some(name) => Ok(ColumnSelection::aggregate(head.parse()?, name)),
        None => Ok(ColumnSelection::named(head)),
    }
}

/// Parse a WHERE entry: `column OP value`.
pub fn parse_condition(input: &str) -> Result<WhereCondition> {
    let trimmed = input.trim();
    let (rest, (column, _, op)) = finish(
        trimmed,
        tuple((parse_identifier, multispace0, parse_operator))(trimmed),
    )?;
    let rest = rest.trim();

    let value = match op {
        Operator::IsNull | Operator::IsNotNull => {
            expect_end(trimmed, rest)?;
            ""
        }
        Operator::In => strip_wrapping(rest, '(', ')'),
        _ => strip_wrapping(rest, '\'', '\''),
    };

    Ok(WhereCondition::new(column, op, value))
}

/// Parse an ORDER BY entry: `column [ASC|DESC]`.
pub fn parse_order(input: &str) -> Result<OrderByClause> {
    let trimmed = input.trim();
    let (rest, (column, direction)) = finish(
        trimmed,
        tuple((
            parse_identifier,
            opt(map(
                tuple((multispace1, parse_identifier)),
                |(_, word)| word,
            )),
        ))(trimmed),
    )?;
    expect_end(trimmed, rest)?;

    Ok(OrderByClause {
        column: column.to_string(),
        direction: direction.map(str::parse::<Direction>).transpose()?,
    })
}

/// Parse a column or table identifier, optionally qualified (`t.col`).
fn parse_identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '.' || c == '*')(input)
}

/// Parse a comparison operator. Longer symbols are tried first.
fn parse_operator(input: &str) -> IResult<&str, Operator> {
    alt((
        value(
            Operator::IsNotNull,
            recognize(tuple((
                tag_no_case("IS"),
                multispace1,
                tag_no_case("NOT"),
                multispace1,
                tag_no_case("NULL"),
            ))),
        ),
        value(
            Operator::IsNull,
            recognize(tuple((tag_no_case("IS"), multispace1, tag_no_case("NULL")))),
        ),
        value(Operator::Ne, tag("!=")),
        value(Operator::Lte, tag("<=")),
        value(Operator::Gte, tag(">=")),
        value(Operator::Eq, tag("=")),
        value(Operator::Lt, tag("<")),
        value(Operator::Gt, tag(">")),
        value(Operator::Like, keyword("LIKE")),
        value(Operator::In, keyword("IN")),
    ))(input)
}

/// A word operator must be followed by whitespace, `(` or the end.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(
        tag_no_case(word),
        peek(alt((multispace1, tag("("), eof))),
    )
}

fn strip_wrapping(value: &str, open: char, close: char) -> &str {
    value
        .strip_prefix(open)
        .and_then(|v| v.strip_suffix(close))
        .unwrap_or(value)
}

fn finish<'a, T>(input: &'a str, result: IResult<&'a str, T>) -> Result<(&'a str, T)> {
    result.map_err(|e| match e {
        nom::Err::Error(e) | nom::Err::Failure(e) => Error::parse(
            input.len() - e.input.len(),
            format!("Unexpected input: '{}'", e.input),
        ),
        nom::Err::Incomplete(_) => Error::parse(input.len(), "Unexpected end of input"),
    })
}

fn expect_end(input: &str, rest: &str) -> Result<()> {
    let rest_trimmed = rest.trim();
    if rest_trimmed.is_empty() {
        Ok(())
    } else {
        Err(Error::parse(
            input.len() - rest.trim_start().len(),
            format!("Unexpected trailing content: '{}'", rest_trimmed),
        ))
    }
}
