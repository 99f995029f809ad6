//! Order, range and distinct

use crate::condition::{build_joins, tree_is_delegable};
use crate::resolver::resolve_path;
use crate::{AccessPoint, Delegate, DelegateError, Validation};
use quarry_query::{PropertiesTree, QueryDistinct, QueryNode, QueryOrder, QueryRange};
use quarry_site::Properties;
use quarry_sql::{OrderByExpr, SelectStmt};

impl Delegate for QueryOrder {
    /// Keys may follow many-to-one relations into joinable stores
    fn validate(&self, ap: AccessPoint<'_>, properties: &Properties) -> Result<Validation, DelegateError> {
        for key in &self.orderbys {
            resolve_path(&key.property, ap, properties)?;
        }
        if tree_is_delegable(&keys_tree(self), ap, properties)? {
            Ok(Validation::delegable(QueryNode::Order(self.clone())))
        } else {
            tracing::debug!(store = %ap.store.id(), "order kept residual");
            Ok(Validation::residual(QueryNode::Order(self.clone())))
        }
    }

    /// One clause per key, in key order, ahead of any earlier order: sorting
    /// again makes the new keys primary
    fn translate(
        &self,
        stmt: SelectStmt,
        ap: AccessPoint<'_>,
        properties: &Properties,
    ) -> Result<SelectStmt, DelegateError> {
        let stmt = build_joins(stmt, &keys_tree(self), ap, properties)?;
        let mut keys = Vec::with_capacity(self.orderbys.len());
        for key in &self.orderbys {
            let column = resolve_path(&key.property, ap, properties)?.column.clone();
            keys.push(if key.ascending {
                OrderByExpr::asc(column)
            } else {
                OrderByExpr::desc(column)
            });
        }
        Ok(stmt.order_by_first(keys))
    }

    fn output_properties(&self, _ap: AccessPoint<'_>, properties: &Properties) -> Result<Properties, DelegateError> {
        Ok(properties.clone())
    }
}

fn keys_tree(order: &QueryOrder) -> PropertiesTree {
    let mut tree = PropertiesTree::default();
    for key in &order.orderbys {
        tree.insert_path(key.property.split('.'));
    }
    tree
}

impl Delegate for QueryRange {
    fn validate(&self, _ap: AccessPoint<'_>, _properties: &Properties) -> Result<Validation, DelegateError> {
        Ok(Validation::delegable(QueryNode::Range(*self)))
    }

    /// Apply the window relative to any window already on the statement
    fn translate(
        &self,
        mut stmt: SelectStmt,
        _ap: AccessPoint<'_>,
        _properties: &Properties,
    ) -> Result<SelectStmt, DelegateError> {
        let start = self.start();
        let offset = stmt.offset.unwrap_or(0).saturating_add(start);
        let limit = match (stmt.limit, self.limit()) {
            (None, limit) => limit,
            (Some(current), None) => Some(current.saturating_sub(start)),
            (Some(current), Some(limit)) => Some(current.saturating_sub(start).min(limit)),
        };

        if offset > 0 {
            stmt = stmt.offset(offset);
        }
        if let Some(limit) = limit {
            stmt = stmt.limit(limit);
        }
        Ok(stmt)
    }

    fn output_properties(&self, _ap: AccessPoint<'_>, properties: &Properties) -> Result<Properties, DelegateError> {
        Ok(properties.clone())
    }
}

impl Delegate for QueryDistinct {
    fn validate(&self, _ap: AccessPoint<'_>, _properties: &Properties) -> Result<Validation, DelegateError> {
        Ok(Validation::delegable(QueryNode::Distinct(self.clone())))
    }

    fn translate(
        &self,
        stmt: SelectStmt,
        _ap: AccessPoint<'_>,
        _properties: &Properties,
    ) -> Result<SelectStmt, DelegateError> {
        Ok(stmt.distinct())
    }

    fn output_properties(&self, _ap: AccessPoint<'_>, properties: &Properties) -> Result<Properties, DelegateError> {
        Ok(properties.clone())
    }
}
