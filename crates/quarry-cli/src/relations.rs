//! Related rows for residual queries
//!
//! A scan returns flat rows: a relation holds its local column. Residual
//! queries follow relations through nested values, an object for a
//! many-to-one relation and an array for the other kinds, so the relations a
//! residual reads are fetched and nested into the rows before evaluation.

use anyhow::bail;
use quarry_delegate::scan;
use quarry_duck::{DuckExecutor, ExecutionBudget};
use quarry_query::{PropertiesTree, Row};
use quarry_site::{Relation, Site, Store};
use serde_json::Value as Json;
use std::collections::HashMap;
use tracing::debug;

/// Nest the related rows every relation path of `tree` leads through.
///
/// A relation named without a sub-path keeps its local value. Names that are
/// not relations of `store` are left alone.
pub fn nest(
    executor: &DuckExecutor,
    site: &Site,
    store: &Store,
    tree: &PropertiesTree,
    mut rows: Vec<Row>,
    budget: ExecutionBudget,
) -> anyhow::Result<Vec<Row>> {
    for (name, sub_tree) in tree {
        let Some(remote) = store.properties().get(name).and_then(|property| property.remote.as_ref()) else {
            continue;
        };
        if sub_tree.is_empty() {
            continue;
        }

        let remote_store = site.store(&remote.store)?;
        let statement = match scan(remote_store) {
            Some(statement) if remote_store.shares_database_with(store) => statement,
            _ => bail!(
                "relation {} of store {} leads to store {}, which this database cannot read",
                name,
                store.id(),
                remote_store.id()
            ),
        };

        let related = executor.execute(&statement, Some(budget))?.into_rows();
        let keys: Vec<Option<String>> = related
            .iter()
            .map(|row| key(row.get(&remote.remote_property)))
            .collect();
        let related = nest(executor, site, remote_store, sub_tree, related, budget)?;
        debug!(relation = %name, remote = remote_store.id(), rows = related.len(), "related rows fetched");

        let mut index: HashMap<String, Vec<Row>> = HashMap::new();
        for (key, row) in keys.into_iter().zip(related) {
            if let Some(key) = key {
                index.entry(key).or_default().push(row);
            }
        }

        for row in &mut rows {
            let matches = key(row.get(name)).and_then(|key| index.get(&key));
            let cell = match remote.relation {
                Relation::ManyToOne => matches
                    .and_then(|matches| matches.first())
                    .map_or(Json::Null, |related| Json::Object(related.clone())),
                Relation::OneToMany | Relation::ManyToMany => Json::Array(
                    matches
                        .into_iter()
                        .flatten()
                        .map(|related| Json::Object(related.clone()))
                        .collect(),
                ),
            };
            row.insert(name.clone(), cell);
        }
    }
    Ok(rows)
}

/// Join key of a cell, `None` for NULL which matches nothing
fn key(cell: Option<&Json>) -> Option<String> {
    match cell {
        None | Some(Json::Null) => None,
        Some(value) => Some(value.to_string()),
    }
}
