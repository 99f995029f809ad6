//! In-memory evaluation of query trees over JSON rows
//!
//! Relations are represented by nesting: a many-to-one relation is an object
//! cell, a one-to-many relation an array of objects. Comparisons follow SQL
//! three-valued logic so results match what a relational backend returns.

use crate::{Comparison, Condition, QueryNode, QueryOrder, QuerySelect, Value};
use serde_json::Value as Json;
use std::cmp::Ordering;
use std::collections::HashSet;
use thiserror::Error;

/// A row of a store, keyed by property name
pub type Row = serde_json::Map<String, Json>;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),
}

impl QueryNode {
    /// Evaluate the query over `rows`
    pub fn evaluate(&self, rows: Vec<Row>) -> Result<Vec<Row>, EvalError> {
        match self {
            QueryNode::Chain(chain) => chain
                .queries
                .iter()
                .try_fold(rows, |rows, query| query.evaluate(rows)),
            QueryNode::Filter(filter) => {
                let mut kept = Vec::with_capacity(rows.len());
                for row in rows {
                    if filter.condition.evaluate(&row)? == Some(true) {
                        kept.push(row);
                    }
                }
                Ok(kept)
            }
            QueryNode::Select(select) => Ok(rows.iter().flat_map(|row| select_row(select, row)).collect()),
            QueryNode::Order(order) => Ok(sort_rows(order, rows)),
            QueryNode::Range(range) => {
                let start = usize::try_from(range.start()).unwrap_or(usize::MAX);
                let limit = range
                    .limit()
                    .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
                Ok(rows.into_iter().skip(start).take(limit).collect())
            }
            QueryNode::Distinct(_) => {
                let mut seen = HashSet::new();
                Ok(rows
                    .into_iter()
                    .filter(|row| seen.insert(Json::Object(row.clone()).to_string()))
                    .collect())
            }
        }
    }
}

impl Condition {
    /// Evaluate against one row; `None` is SQL's unknown
    pub fn evaluate(&self, row: &Row) -> Result<Option<bool>, EvalError> {
        match self {
            Condition::And { conditions } => {
                let mut result = Some(true);
                for condition in conditions {
                    match condition.evaluate(row)? {
                        Some(false) => return Ok(Some(false)),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                Ok(result)
            }
            Condition::Or { conditions } => {
                let mut result = Some(false);
                for condition in conditions {
                    match condition.evaluate(row)? {
                        Some(true) => return Ok(Some(true)),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                Ok(result)
            }
            Condition::Not { condition } => Ok(condition.evaluate(row)?.map(|b| !b)),
            Condition::Comparison(comparison) => comparison.evaluate(row),
        }
    }
}

impl Comparison {
    fn evaluate(&self, row: &Row) -> Result<Option<bool>, EvalError> {
        let cell = lookup(row, &self.property);
        let Some(left) = Value::from_json(cell) else {
            return Ok(None);
        };
        let right = &self.value;

        if self.operator.eq_ignore_ascii_case("like") {
            return Ok(match (&left, right) {
                (Value::String(text), Value::String(pattern)) => Some(like(text, pattern)),
                _ => None,
            });
        }

        let ordering = left.sql_cmp(right);
        let result = match self.operator.as_str() {
            "=" | "==" => ordering.map(|o| o == Ordering::Equal),
            "!=" | "<>" => ordering.map(|o| o != Ordering::Equal),
            "<" => ordering.map(|o| o == Ordering::Less),
            "<=" => ordering.map(|o| o != Ordering::Greater),
            ">" => ordering.map(|o| o == Ordering::Greater),
            ">=" => ordering.map(|o| o != Ordering::Less),
            other => return Err(EvalError::UnsupportedOperator(other.to_string())),
        };
        Ok(result)
    }
}

/// Follow a dotted path through nested objects, null when it leads nowhere
fn lookup<'a>(row: &'a Row, path: &str) -> &'a Json {
    let mut segments = path.split('.');
    let Some(first) = segments.next() else {
        return &Json::Null;
    };
    let mut cell = row.get(first).unwrap_or(&Json::Null);
    for segment in segments {
        cell = match cell {
            Json::Object(object) => object.get(segment).unwrap_or(&Json::Null),
            _ => &Json::Null,
        };
    }
    cell
}

/// SQL LIKE with `%` and `_` wildcards
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // matches[j]: pattern[..i] matches text[..j]
    let mut matches = vec![false; text.len() + 1];
    matches[0] = true;
    for p in &pattern {
        let mut next = vec![false; text.len() + 1];
        match p {
            '%' => {
                let mut any = false;
                for j in 0..=text.len() {
                    any |= matches[j];
                    next[j] = any;
                }
            }
            _ => {
                for j in 1..=text.len() {
                    next[j] = matches[j - 1] && (*p == '_' || *p == text[j - 1]);
                }
            }
        }
        matches = next;
    }
    matches[text.len()]
}

fn sort_rows(order: &QueryOrder, mut rows: Vec<Row>) -> Vec<Row> {
    rows.sort_by(|a, b| {
        for key in &order.orderbys {
            let left = Value::from_json(lookup(a, &key.property)).unwrap_or(Value::Null);
            let right = Value::from_json(lookup(b, &key.property)).unwrap_or(Value::Null);
            // Nulls sort last in both directions
            let ordering = match (left.is_null(), right.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => {
                    let ordering = left.sql_cmp(&right).unwrap_or(Ordering::Equal);
                    if key.ascending {
                        ordering
                    } else {
                        ordering.reverse()
                    }
                }
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    rows
}

/// Project one row; relations reached through sub-selects behave like an
/// inner join, so a row yields zero, one or several output rows
fn select_row(select: &QuerySelect, row: &Row) -> Vec<Row> {
    let mut base = Row::new();
    for (output, source) in &select.mapping {
        base.insert(output.clone(), row.get(source).cloned().unwrap_or(Json::Null));
    }

    let mut results = vec![base];
    for (relation, sub_select) in &select.sub_selects {
        let related: Vec<&Row> = match row.get(relation) {
            Some(Json::Object(object)) => vec![object],
            Some(Json::Array(items)) => items.iter().filter_map(Json::as_object).collect(),
            _ => Vec::new(),
        };
        let sub_rows: Vec<Row> = related
            .into_iter()
            .flat_map(|related| select_row(sub_select, related))
            .collect();

        results = results
            .into_iter()
            .flat_map(|partial| {
                sub_rows.iter().map(move |sub_row| {
                    let mut merged = partial.clone();
                    merged.extend(sub_row.clone());
                    merged
                })
            })
            .collect();
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QuerySelect;
    use serde_json::json;

    fn rows() -> Vec<Row> {
        let data = json!([
            {"id": 1, "title": "Dune", "year": 1965, "author": {"id": 10, "name": "Frank"}},
            {"id": 2, "title": "Emma", "year": 1815, "author": {"id": 11, "name": "Jane"}},
            {"id": 3, "title": "Persuasion", "year": 1817, "author": {"id": 11, "name": "Jane"}},
            {"id": 4, "title": "Untitled", "year": null, "author": null},
        ]);
        serde_json::from_value(data).unwrap()
    }

    fn titles(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r["title"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_filter_through_relation() {
        let query = QueryNode::filter(Condition::equals("author.name", "Jane"));
        let result = query.evaluate(rows()).unwrap();
        assert_eq!(titles(&result), vec!["Emma", "Persuasion"]);
    }

    #[test]
    fn test_null_is_neither_true_nor_false() {
        let before = QueryNode::filter(Condition::compare("year", "<", 1900));
        let not_before = QueryNode::filter(Condition::not(Condition::compare("year", "<", 1900)));

        assert_eq!(before.evaluate(rows()).unwrap().len(), 2);
        assert_eq!(titles(&not_before.evaluate(rows()).unwrap()), vec!["Dune"]);
    }

    #[test]
    fn test_like() {
        assert!(like("Persuasion", "Pers%"));
        assert!(like("Emma", "E_m_"));
        assert!(like("Emma", "%"));
        assert!(!like("Emma", "E_m"));
        assert!(!like("Dune", "%x%"));
    }

    #[test]
    fn test_unknown_operator() {
        let query = QueryNode::filter(Condition::compare("year", "~", 1));
        assert!(matches!(
            query.evaluate(rows()),
            Err(EvalError::UnsupportedOperator(op)) if op == "~"
        ));
    }

    #[test]
    fn test_order_precedence_and_nulls_last() {
        let query = QueryNode::order([("author.name", false), ("year", true)]);
        let result = query.evaluate(rows()).unwrap();
        assert_eq!(titles(&result), vec!["Emma", "Persuasion", "Dune", "Untitled"]);
    }

    #[test]
    fn test_chain_range_distinct_select() {
        let query = QueryNode::chain(vec![
            QueryNode::order([("id", true)]),
            QueryNode::range(Some(1), Some(3)),
            QuerySelect::new()
                .sub_select("author", QuerySelect::new().field("name", "name"))
                .into(),
            QueryNode::distinct(),
        ]);
        let result = query.evaluate(rows()).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0]["name"], "Jane");
    }

    #[test]
    fn test_select_drops_rows_without_relation() {
        let query: QueryNode = QuerySelect::new()
            .field("title", "title")
            .sub_select("author", QuerySelect::new().field("who", "name"))
            .into();
        let result = query.evaluate(rows()).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result[0]["who"], "Frank");
    }
}
