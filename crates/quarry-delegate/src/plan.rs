//! Planning: what runs in the store, what runs afterwards

use crate::{AccessPoint, Delegate, DelegateError};
use quarry_query::QueryNode;
use quarry_site::{Site, Store};
use quarry_sql::SelectStmt;
use tracing::debug;

/// Execution plan of a query on one store
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Statement fetching the store's rows, `None` for non-relational stores
    pub statement: Option<SelectStmt>,
    /// Query to evaluate on the fetched rows
    pub residual: Option<QueryNode>,
}

impl Plan {
    pub fn is_fully_delegated(&self) -> bool {
        self.statement.is_some() && self.residual.is_none()
    }
}

/// Plans queries against the stores of a site
pub struct Delegator<'a> {
    site: &'a Site,
}

impl<'a> Delegator<'a> {
    pub fn new(site: &'a Site) -> Self {
        Self { site }
    }

    pub fn site(&self) -> &'a Site {
        self.site
    }

    /// Split `query` between the store and a residual.
    ///
    /// When nothing is delegated the statement is a plain scan and the whole
    /// query is residual. A chain validates to no delegable part as soon as
    /// one sub-query is residual, and its residual then only lists the
    /// residual sub-queries, so the original query has to run in full.
    pub fn plan(&self, store_id: &str, query: &QueryNode) -> Result<Plan, DelegateError> {
        let store = self.site.store(store_id)?;
        let span = tracing::debug_span!(
            "plan",
            store = store_id,
            kind = query.kind(),
            fingerprint = %query.fingerprint()
        );
        let _guard = span.enter();

        let Some(table) = store.table() else {
            debug!("store is not relational, nothing delegated");
            return Ok(Plan {
                statement: None,
                residual: Some(query.clone()),
            });
        };

        let ap = AccessPoint::new(self.site, store);
        let validation = query.validate(ap, store.properties())?;
        let scan = SelectStmt::from_table(table.clone());

        let plan = match validation.delegable {
            Some(delegable) => {
                let stmt = delegable.translate(scan, ap, store.properties())?;
                Plan {
                    statement: Some(project_all(stmt, store)),
                    residual: validation.residual,
                }
            }
            None => Plan {
                statement: Some(project_all(scan, store)),
                residual: Some(query.clone()),
            },
        };

        debug!(
            delegated = plan.residual.is_none(),
            sql = %plan.statement.as_ref().map(SelectStmt::to_sql).unwrap_or_default(),
            "planned"
        );
        Ok(plan)
    }
}

/// Statement reading every property of a relational store, `None` for other
/// stores
pub fn scan(store: &Store) -> Option<SelectStmt> {
    let table = store.table()?;
    Some(project_all(SelectStmt::from_table(table.clone()), store))
}

/// Project every store property when no select chose columns
fn project_all(stmt: SelectStmt, store: &Store) -> SelectStmt {
    if !stmt.columns.is_empty() {
        return stmt;
    }
    store
        .properties()
        .iter()
        .fold(stmt, |stmt, property| stmt.append_column(property.column.clone(), &property.name))
}
