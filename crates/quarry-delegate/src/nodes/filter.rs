use crate::condition::{build_joins, lower, operators_are_valid, tree_is_delegable};
use crate::{AccessPoint, Delegate, DelegateError, Validation};
use quarry_query::{QueryFilter, QueryNode};
use quarry_site::Properties;
use quarry_sql::SelectStmt;

impl Delegate for QueryFilter {
    /// All or nothing: one property out of reach keeps the whole filter
    /// residual
    fn validate(&self, ap: AccessPoint<'_>, properties: &Properties) -> Result<Validation, DelegateError> {
        let tree = self.condition.properties_tree();
        let reachable = tree_is_delegable(&tree, ap, properties)?;

        if reachable && operators_are_valid(&self.condition) {
            Ok(Validation::delegable(QueryNode::Filter(self.clone())))
        } else {
            tracing::debug!(store = %ap.store.id(), "filter kept residual");
            Ok(Validation::residual(QueryNode::Filter(self.clone())))
        }
    }

    fn translate(
        &self,
        stmt: SelectStmt,
        ap: AccessPoint<'_>,
        properties: &Properties,
    ) -> Result<SelectStmt, DelegateError> {
        let stmt = build_joins(stmt, &self.condition.properties_tree(), ap, properties)?;
        let predicate = lower(&self.condition, ap, properties)?;
        Ok(stmt.and_where(predicate))
    }

    fn output_properties(&self, _ap: AccessPoint<'_>, properties: &Properties) -> Result<Properties, DelegateError> {
        Ok(properties.clone())
    }
}
