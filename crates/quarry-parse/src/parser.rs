//! Pest-based parser for the Quarry query syntax

use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;
use quarry_query::{Condition, OrderKey, QueryNode, QueryOrder, QuerySelect, Value};
use thiserror::Error;

#[derive(Parser)]
#[grammar = "quarry.pest"]
pub struct QuarryParser;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Pest error: {0}")]
    Pest(#[from] pest::error::Error<Rule>),
}

/// Parse query text into a query tree.
///
/// A single stage gives that node, several stages give a chain.
pub fn parse(source: &str) -> Result<QueryNode, ParseError> {
    let mut pairs = QuarryParser::parse(Rule::query, source)?;
    let query = pairs.next().ok_or_else(|| ParseError::Syntax("Empty input".to_string()))?;

    let mut stages = Vec::new();
    for pair in query.into_inner() {
        match pair.as_rule() {
            Rule::EOI => {}
            _ => stages.push(parse_stage(pair)?),
        }
    }

    match stages.len() {
        0 => Err(ParseError::Syntax("Missing stage".to_string())),
        1 => Ok(stages.remove(0)),
        _ => Ok(QueryNode::chain(stages)),
    }
}

fn parse_stage(pair: Pair<Rule>) -> Result<QueryNode, ParseError> {
    match pair.as_rule() {
        Rule::filter_stage => {
            let condition = expect(skip_keywords(pair.into_inner()), "condition")?;
            Ok(QueryNode::filter(parse_condition(condition)?))
        }
        Rule::order_stage => {
            let orderbys = skip_keywords(pair.into_inner())
                .map(parse_order_key)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(QueryNode::Order(QueryOrder { orderbys }))
        }
        Rule::range_stage => {
            let mut start = None;
            let mut stop = None;
            for bound in skip_keywords(pair.into_inner()) {
                let value = parse_number::<u64>(bound.as_str())?;
                match bound.as_rule() {
                    Rule::range_start => start = Some(value),
                    _ => stop = Some(value),
                }
            }
            Ok(QueryNode::range(start, stop))
        }
        Rule::distinct_stage => Ok(QueryNode::distinct()),
        Rule::select_stage => {
            let block = expect(skip_keywords(pair.into_inner()), "select block")?;
            Ok(QueryNode::Select(parse_select_block(block)?))
        }
        rule => Err(ParseError::Syntax(format!("Unknown stage: {:?}", rule))),
    }
}

/// Drop keyword tokens, keeping the operands around them
fn skip_keywords(pairs: Pairs<'_, Rule>) -> impl Iterator<Item = Pair<'_, Rule>> {
    pairs.filter(|pair| {
        !matches!(
            pair.as_rule(),
            Rule::filter_kw
                | Rule::order_kw
                | Rule::range_kw
                | Rule::distinct_kw
                | Rule::select_kw
                | Rule::and_kw
                | Rule::or_kw
                | Rule::not_kw
        )
    })
}

fn expect<'i>(mut pairs: impl Iterator<Item = Pair<'i, Rule>>, what: &str) -> Result<Pair<'i, Rule>, ParseError> {
    pairs.next().ok_or_else(|| ParseError::Syntax(format!("Missing {}", what)))
}

fn parse_number<T: std::str::FromStr>(text: &str) -> Result<T, ParseError> {
    text.parse()
        .map_err(|_| ParseError::Syntax(format!("Number out of range: {}", text)))
}

// =============================================================================
// Conditions
// =============================================================================

fn parse_condition(pair: Pair<Rule>) -> Result<Condition, ParseError> {
    match pair.as_rule() {
        Rule::condition => {
            let mut operands = skip_keywords(pair.into_inner())
                .map(parse_condition)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(if operands.len() == 1 {
                operands.remove(0)
            } else {
                Condition::or(operands)
            })
        }
        Rule::and_cond => {
            let mut operands = skip_keywords(pair.into_inner())
                .map(parse_condition)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(if operands.len() == 1 {
                operands.remove(0)
            } else {
                Condition::and(operands)
            })
        }
        Rule::not_cond => {
            let mut inner = pair.into_inner();
            let first = expect(&mut inner, "condition")?;
            if first.as_rule() == Rule::not_kw {
                let negated = expect(&mut inner, "negated condition")?;
                Ok(Condition::not(parse_condition(negated)?))
            } else {
                parse_condition(first)
            }
        }
        Rule::comparison => {
            let mut inner = pair.into_inner();
            let property = expect(&mut inner, "property")?.as_str().to_string();
            let operator = expect(&mut inner, "operator")?.as_str();
            let value = parse_value(expect(&mut inner, "value")?)?;

            let operator = match operator {
                "==" => "=".to_string(),
                "<>" => "!=".to_string(),
                op => op.to_ascii_lowercase(),
            };
            Ok(Condition::compare(property, operator, value))
        }
        rule => Err(ParseError::Syntax(format!("Invalid condition: {:?}", rule))),
    }
}

fn parse_value(pair: Pair<Rule>) -> Result<Value, ParseError> {
    match pair.as_rule() {
        Rule::string => {
            let body = expect(pair.into_inner(), "string body")?;
            Ok(Value::String(unescape(body.as_str())))
        }
        Rule::float => Ok(Value::Float(parse_number(pair.as_str())?)),
        Rule::int => Ok(Value::Int(parse_number(pair.as_str())?)),
        Rule::true_lit => Ok(Value::Bool(true)),
        Rule::false_lit => Ok(Value::Bool(false)),
        Rule::null_lit => Ok(Value::Null),
        rule => Err(ParseError::Syntax(format!("Invalid literal: {:?}", rule))),
    }
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

// =============================================================================
// Order and select
// =============================================================================

fn parse_order_key(pair: Pair<Rule>) -> Result<OrderKey, ParseError> {
    let mut ascending = true;
    let mut property = None;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::descending => ascending = false,
            _ => property = Some(part.as_str().to_string()),
        }
    }

    Ok(OrderKey {
        property: property.ok_or_else(|| ParseError::Syntax("Missing order key".to_string()))?,
        ascending,
    })
}

fn parse_select_block(pair: Pair<Rule>) -> Result<QuerySelect, ParseError> {
    let mut select = QuerySelect::new();
    for item in pair.into_inner() {
        let rule = item.as_rule();
        let mut inner = item.into_inner();
        let name = expect(&mut inner, "name")?.as_str().to_string();

        let duplicate = match rule {
            Rule::field => {
                let source = inner.next().map_or_else(|| name.clone(), |p| p.as_str().to_string());
                select.mapping.insert(name.clone(), source).is_some()
            }
            Rule::sub_select => {
                let block = expect(&mut inner, "select block")?;
                select.sub_selects.insert(name.clone(), parse_select_block(block)?).is_some()
            }
            rule => return Err(ParseError::Syntax(format!("Invalid select item: {:?}", rule))),
        };

        if duplicate {
            return Err(ParseError::Syntax(format!("Duplicate select item: {}", name)));
        }
    }
    Ok(select)
}
