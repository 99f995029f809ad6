//! Boolean conditions and literal values

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::btree_map;
use std::collections::BTreeMap;

/// Filter condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    And { conditions: Vec<Condition> },
    Or { conditions: Vec<Condition> },
    Not { condition: Box<Condition> },
    Comparison(Comparison),
}

/// `property operator value`, e.g. `author.name = "Ann"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Dotted property path, each segment but the last names a relation
    pub property: String,
    pub operator: String,
    pub value: Value,
}

impl Comparison {
    pub fn path(&self) -> impl Iterator<Item = &str> {
        self.property.split('.')
    }
}

impl Condition {
    pub fn and(conditions: Vec<Condition>) -> Self {
        Condition::And { conditions }
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Condition::Or { conditions }
    }

    pub fn not(condition: Condition) -> Self {
        Condition::Not {
            condition: Box::new(condition),
        }
    }

    pub fn compare(property: impl Into<String>, operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Comparison(Comparison {
            property: property.into(),
            operator: operator.into(),
            value: value.into(),
        })
    }

    pub fn equals(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, "=", value)
    }

    /// Nested map of every property path the condition references
    pub fn properties_tree(&self) -> PropertiesTree {
        let mut tree = PropertiesTree::default();
        self.collect_properties(&mut tree);
        tree
    }

    pub(crate) fn collect_properties(&self, tree: &mut PropertiesTree) {
        match self {
            Condition::And { conditions } | Condition::Or { conditions } => {
                for condition in conditions {
                    condition.collect_properties(tree);
                }
            }
            Condition::Not { condition } => condition.collect_properties(tree),
            Condition::Comparison(comparison) => tree.insert_path(comparison.path()),
        }
    }
}

/// Property names mapped to the properties referenced through them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertiesTree(BTreeMap<String, PropertiesTree>);

impl PropertiesTree {
    pub fn insert_path<'a>(&mut self, path: impl IntoIterator<Item = &'a str>) {
        let mut node = self;
        for segment in path {
            node = node.0.entry(segment.to_string()).or_default();
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertiesTree> {
        self.0.get(name)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, PropertiesTree> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<'a> IntoIterator for &'a PropertiesTree {
    type Item = (&'a String, &'a PropertiesTree);
    type IntoIter = btree_map::Iter<'a, String, PropertiesTree>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Convert a JSON cell, `None` for arrays and objects
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Value::Int(i)),
                None => n.as_f64().map(Value::Float),
            },
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::json!(f),
            Value::String(s) => serde_json::Value::String(s.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// SQL-style comparison: `None` when either side is null or the types
    /// do not compare
    pub fn sql_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_tree_merges_paths() {
        let condition = Condition::or(vec![
            Condition::equals("author.name", "Ann"),
            Condition::not(Condition::equals("author.country.code", "FR")),
            Condition::compare("year", "<", 1990),
        ]);

        let tree = condition.properties_tree();
        assert_eq!(tree.len(), 2);

        let author = tree.get("author").unwrap();
        assert!(author.get("name").unwrap().is_empty());
        assert!(author.get("country").unwrap().get("code").is_some());
        assert!(tree.get("year").unwrap().is_empty());
    }

    #[test]
    fn test_value_untagged_json() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, true, 3, 2.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Int(3),
                Value::Float(2.5),
                Value::String("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_sql_cmp_with_null_is_unknown() {
        assert_eq!(Value::Int(1).sql_cmp(&Value::Null), None);
        assert_eq!(Value::Int(1).sql_cmp(&Value::Float(1.5)), Some(Ordering::Less));
        assert_eq!(Value::from("b").sql_cmp(&Value::from("a")), Some(Ordering::Greater));
    }
}
