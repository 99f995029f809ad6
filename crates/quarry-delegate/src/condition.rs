//! Condition lowering and join synthesis

use crate::resolver::{resolve, resolve_path};
use crate::{AccessPoint, DelegateError};
use quarry_query::{Comparison, Condition, PropertiesTree, Value};
use quarry_site::{Properties, Relation};
use quarry_sql::{BoolExpr, Literal, Operator, SelectStmt};

/// Whether every property of `tree` can be reached inside one statement.
///
/// Walks the whole tree even once the answer is known, so that unknown
/// properties are reported wherever they are.
pub(crate) fn tree_is_delegable(
    tree: &PropertiesTree,
    ap: AccessPoint<'_>,
    properties: &Properties,
) -> Result<bool, DelegateError> {
    let mut delegable = true;
    for (name, sub_tree) in tree {
        let property = resolve(properties, name)?;
        match &property.remote {
            None if sub_tree.is_empty() => {}
            None => {
                return Err(DelegateError::NotARelation {
                    scope: properties.scope().to_string(),
                    property: name.clone(),
                })
            }
            // The foreign key itself, no join needed
            Some(remote) if sub_tree.is_empty() => {
                delegable &= remote.relation == Relation::ManyToOne;
            }
            Some(remote) => {
                let store = ap.remote_store(remote)?;
                let remote_delegable = tree_is_delegable(sub_tree, ap, store.properties())?;
                if !remote_delegable || remote.relation != Relation::ManyToOne || !ap.can_join(store) {
                    tracing::trace!(
                        property = %name,
                        remote = %store.id(),
                        relation = %remote.relation,
                        "relation cannot be joined"
                    );
                    delegable = false;
                }
            }
        }
    }
    Ok(delegable)
}

/// Whether every operator of the condition can be rendered
pub(crate) fn operators_are_valid(condition: &Condition) -> bool {
    match condition {
        Condition::And { conditions } | Condition::Or { conditions } => {
            conditions.iter().all(operators_are_valid)
        }
        Condition::Not { condition } => operators_are_valid(condition),
        Condition::Comparison(comparison) => Operator::is_valid(&comparison.operator),
    }
}

/// Join every store `tree` reaches through many-to-one relations.
///
/// Each join is a left join on `local.column = remote.identity`, so rows
/// without a related row stay and see NULL in its columns. Multi-hop paths
/// recurse into the remote store. A relation referenced without a sub-path
/// compares its local column and joins nothing.
pub(crate) fn build_joins(
    mut stmt: SelectStmt,
    tree: &PropertiesTree,
    ap: AccessPoint<'_>,
    properties: &Properties,
) -> Result<SelectStmt, DelegateError> {
    for (name, sub_tree) in tree {
        let property = resolve(properties, name)?;
        let Some(remote) = &property.remote else {
            continue;
        };
        if remote.relation != Relation::ManyToOne {
            return Err(DelegateError::UnsupportedRelation {
                property: name.clone(),
                relation: remote.relation,
            });
        }
        if sub_tree.is_empty() {
            continue;
        }

        let (store, table) = ap.joinable(remote)?;
        let local = stmt
            .corresponding_column(&property.column)
            .ok_or_else(|| DelegateError::ColumnOutOfScope {
                column: property.column.to_string(),
            })?;
        let identity = store
            .identity_property()
            .ok_or_else(|| quarry_site::SiteError::MissingIdentity {
                store: store.id().to_string(),
            })?;

        stmt = stmt.left_join(table.clone(), local.eq(identity.column.clone()));
        stmt = build_joins(stmt, sub_tree, ap, store.properties())?;
    }
    Ok(stmt)
}

/// Lower a condition to a boolean expression over resolved columns
pub(crate) fn lower(
    condition: &Condition,
    ap: AccessPoint<'_>,
    properties: &Properties,
) -> Result<BoolExpr, DelegateError> {
    match condition {
        Condition::And { conditions } => Ok(BoolExpr::and(lower_all(conditions, ap, properties)?)),
        Condition::Or { conditions } => Ok(BoolExpr::or(lower_all(conditions, ap, properties)?)),
        Condition::Not { condition } => Ok(BoolExpr::not(lower(condition, ap, properties)?)),
        Condition::Comparison(comparison) => lower_comparison(comparison, ap, properties),
    }
}

fn lower_all(
    conditions: &[Condition],
    ap: AccessPoint<'_>,
    properties: &Properties,
) -> Result<Vec<BoolExpr>, DelegateError> {
    conditions
        .iter()
        .map(|condition| lower(condition, ap, properties))
        .collect()
}

fn lower_comparison(
    comparison: &Comparison,
    ap: AccessPoint<'_>,
    properties: &Properties,
) -> Result<BoolExpr, DelegateError> {
    let column = &resolve_path(&comparison.property, ap, properties)?.column;
    let value = literal(&comparison.value);
    if comparison.operator == "=" {
        Ok(column.eq(value))
    } else {
        Ok(column.op(&comparison.operator, value)?)
    }
}

fn literal(value: &Value) -> Literal {
    match value {
        Value::Null => Literal::Null,
        Value::Bool(b) => Literal::Bool(*b),
        Value::Int(i) => Literal::Int(*i),
        Value::Float(f) => Literal::Float(*f),
        Value::String(s) => Literal::String(s.clone()),
    }
}
