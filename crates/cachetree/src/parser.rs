//! Text filter syntax using nom
//!
//! ```text
//! filter  := clause ((';' | whitespace) clause)*
//! clause  := field '=' values
//! values  := '[' list? ']' | list
//! list    := value (',' value)*
//! value   := integer | float | "quoted string" | bare-word
//! ```
//!
//! A plain list with one element is a scalar condition; `[x]` is always an
//! array. Example: `sex=1; estimate=1,2 age=[3] location="US"`.

use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while1},
    character::complete::{char, digit1, multispace0, multispace1, one_of},
    combinator::{all_consuming, map, map_res, not, opt, peek, recognize, value},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    IResult,
};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::filter::{Condition, Filter};

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '/')
}

fn field_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-')(input)
}

fn integer(input: &str) -> IResult<&str, Value> {
    map_res(
        terminated(
            recognize(pair(opt(char('-')), digit1)),
            not(peek(alt((char('.'), char('e'), char('E'))))),
        ),
        |digits: &str| digits.parse::<i64>().map(Value::from),
    )(input)
}

fn float(input: &str) -> IResult<&str, Value> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |digits: &str| digits.parse::<f64>().map(Value::from),
    )(input)
}

fn quoted(input: &str) -> IResult<&str, Value> {
    let inner = escaped_transform(
        is_not("\\\""),
        '\\',
        alt((value("\\", tag("\\")), value("\"", tag("\"")))),
    );
    map(
        delimited(char('"'), opt(inner), char('"')),
        |s: Option<String>| Value::String(s.unwrap_or_default()),
    )(input)
}

fn bare(input: &str) -> IResult<&str, Value> {
    map(take_while1(is_word_char), |s: &str| Value::String(s.to_string()))(input)
}

// Numbers must be followed by a delimiter, otherwise `1990s` is a word
fn number(input: &str) -> IResult<&str, Value> {
    terminated(alt((integer, float)), not(peek(take_while1(is_word_char))))(input)
}

fn scalar(input: &str) -> IResult<&str, Value> {
    alt((number, quoted, bare))(input)
}

fn list(input: &str) -> IResult<&str, Vec<Value>> {
    separated_list0(tuple((multispace0, char(','), multispace0)), scalar)(input)
}

fn condition(input: &str) -> IResult<&str, Condition> {
    alt((
        map(
            delimited(
                pair(char('['), multispace0),
                list,
                pair(multispace0, char(']')),
            ),
            Condition::Any,
        ),
        map_res(list, |mut values: Vec<Value>| match values.len() {
            0 => Err("empty value list"),
            1 => Ok(Condition::One(values.remove(0))),
            _ => Ok(Condition::Any(values)),
        }),
    ))(input)
}

fn clause(input: &str) -> IResult<&str, (&str, Condition)> {
    separated_pair(
        field_name,
        tuple((multispace0, char('='), multispace0)),
        condition,
    )(input)
}

fn clause_separator(input: &str) -> IResult<&str, ()> {
    alt((
        value((), tuple((multispace0, char(';'), multispace0))),
        value((), multispace1),
    ))(input)
}

fn filter(input: &str) -> IResult<&str, Vec<(&str, Condition)>> {
    delimited(
        multispace0,
        separated_list0(clause_separator, clause),
        preceded(multispace0, opt(char(';'))),
    )(input)
}

/// Parse a text filter
pub fn parse_filter(input: &str) -> Result<Filter> {
    let (_, clauses) = all_consuming(terminated(filter, multispace0))(input)?;
    Ok(clauses
        .into_iter()
        .map(|(name, cond)| (name.to_string(), cond))
        .collect())
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_filter(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_scalars_and_lists() {
        let filter: Filter = "sex=1; estimate=1,2 age=[3]".parse().unwrap();

        assert_eq!(filter.get("sex"), Some(&Condition::One(json!(1))));
        assert_eq!(filter.get("estimate"), Some(&Condition::Any(vec![json!(1), json!(2)])));
        assert_eq!(filter.get("age"), Some(&Condition::Any(vec![json!(3)])));
        assert_eq!(filter.len(), 3);
    }

    #[test]
    fn test_parse_value_kinds() {
        let filter =
            parse_filter(r#"a=-4 b=2.5 c="two words" d=male e="say \"hi\"" f=1990s"#).unwrap();

        assert_eq!(filter.get("a"), Some(&Condition::One(json!(-4))));
        assert_eq!(filter.get("b"), Some(&Condition::One(json!(2.5))));
        assert_eq!(filter.get("c"), Some(&Condition::One(json!("two words"))));
        assert_eq!(filter.get("d"), Some(&Condition::One(json!("male"))));
        assert_eq!(filter.get("e"), Some(&Condition::One(json!("say \"hi\""))));
        assert_eq!(filter.get("f"), Some(&Condition::One(json!("1990s"))));
    }

    #[test]
    fn test_parse_spacing() {
        let filter = parse_filter("  location = [ 345 , 457 ] ;year=1990;  ").unwrap();

        assert_eq!(
            filter.get("location"),
            Some(&Condition::Any(vec![json!(345), json!(457)]))
        );
        assert_eq!(filter.get("year"), Some(&Condition::One(json!(1990))));
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_filter("").unwrap().is_empty());
        assert!(parse_filter("   ").unwrap().is_empty());
        assert_eq!(parse_filter("a=[]").unwrap().get("a"), Some(&Condition::Any(vec![])));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(parse_filter("sex"), Err(Error::Parse(_))));
        assert!(matches!(parse_filter("sex="), Err(Error::Parse(_))));
        assert!(matches!(parse_filter("sex=[1,2"), Err(Error::Parse(_))));
        assert!(matches!(parse_filter("=1"), Err(Error::Parse(_))));
    }
}
