//! Quarry query trees
//!
//! Canonical, serializable representation of a query as a tree of nodes
//! (chain, filter, select, order, range, distinct). Trees are immutable values:
//! delegation and evaluation only read them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

mod condition;
mod eval;

pub use condition::*;
pub use eval::{EvalError, Row};

/// A node of a query tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryNode {
    Chain(QueryChain),
    Filter(QueryFilter),
    Select(QuerySelect),
    Order(QueryOrder),
    Range(QueryRange),
    Distinct(QueryDistinct),
}

impl QueryNode {
    pub fn chain(queries: Vec<QueryNode>) -> Self {
        QueryNode::Chain(QueryChain { queries })
    }

    pub fn filter(condition: Condition) -> Self {
        QueryNode::Filter(QueryFilter { condition })
    }

    pub fn order<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        QueryNode::Order(QueryOrder {
            orderbys: keys
                .into_iter()
                .map(|(property, ascending)| OrderKey {
                    property: property.into(),
                    ascending,
                })
                .collect(),
        })
    }

    pub fn range(start: Option<u64>, stop: Option<u64>) -> Self {
        QueryNode::Range(QueryRange { start, stop })
    }

    pub fn distinct() -> Self {
        QueryNode::Distinct(QueryDistinct {})
    }

    /// Short name of the node kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            QueryNode::Chain(_) => "chain",
            QueryNode::Filter(_) => "filter",
            QueryNode::Select(_) => "select",
            QueryNode::Order(_) => "order",
            QueryNode::Range(_) => "range",
            QueryNode::Distinct(_) => "distinct",
        }
    }

    /// Nested map of every property path the query reads.
    ///
    /// A sub-select contributes its relation with the fields it maps below it.
    /// Names read after a select are output names of that select.
    pub fn properties_tree(&self) -> PropertiesTree {
        let mut tree = PropertiesTree::default();
        self.collect_properties(&mut tree);
        tree
    }

    fn collect_properties(&self, tree: &mut PropertiesTree) {
        match self {
            QueryNode::Chain(chain) => {
                for query in &chain.queries {
                    query.collect_properties(tree);
                }
            }
            QueryNode::Filter(filter) => filter.condition.collect_properties(tree),
            QueryNode::Select(select) => select.collect_properties(&mut Vec::new(), tree),
            QueryNode::Order(order) => {
                for key in &order.orderbys {
                    tree.insert_path(key.property.split('.'));
                }
            }
            QueryNode::Range(_) | QueryNode::Distinct(_) => {}
        }
    }

    /// Calculate fingerprint (SHA-256) of the canonical JSON form
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("query trees always serialize");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl From<QuerySelect> for QueryNode {
    fn from(select: QuerySelect) -> Self {
        QueryNode::Select(select)
    }
}

/// Sub-queries applied in sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryChain {
    pub queries: Vec<QueryNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    pub condition: Condition,
}

/// Projection of fields under new names.
///
/// `mapping` maps each output name to a field of the input. `sub_selects`
/// follow the relation named by their key and contribute their own outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySelect {
    #[serde(default)]
    pub mapping: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sub_selects: BTreeMap<String, QuerySelect>,
}

impl QuerySelect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, output: impl Into<String>, source: impl Into<String>) -> Self {
        self.mapping.insert(output.into(), source.into());
        self
    }

    pub fn sub_select(mut self, relation: impl Into<String>, select: QuerySelect) -> Self {
        self.sub_selects.insert(relation.into(), select);
        self
    }
}

impl QuerySelect {
    fn collect_properties<'a>(&'a self, prefix: &mut Vec<&'a str>, tree: &mut PropertiesTree) {
        for source in self.mapping.values() {
            tree.insert_path(prefix.iter().copied().chain(std::iter::once(source.as_str())));
        }
        for (relation, sub_select) in &self.sub_selects {
            prefix.push(relation);
            sub_select.collect_properties(prefix, tree);
            prefix.pop();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderKey {
    pub property: String,
    #[serde(default = "ascending_default")]
    pub ascending: bool,
}

fn ascending_default() -> bool {
    true
}

/// Sort keys, first key has the highest precedence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOrder {
    pub orderbys: Vec<OrderKey>,
}

/// Half-open row window `[start, stop)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<u64>,
}

impl QueryRange {
    pub fn start(&self) -> u64 {
        self.start.unwrap_or(0)
    }

    /// Number of rows in the window, `None` when open-ended
    pub fn limit(&self) -> Option<u64> {
        self.stop.map(|stop| stop.saturating_sub(self.start()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDistinct {}
