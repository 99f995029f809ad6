use crate::resolver::resolve_path;
use crate::{AccessPoint, Delegate, DelegateError, Validation};
use quarry_query::{QueryChain, QueryNode};
use quarry_site::Properties;
use quarry_sql::{Column, SelectStmt};

impl Delegate for QueryChain {
    /// Validate each sub-query against the shape the previous ones produce.
    ///
    /// The chain is delegated only when every sub-query is: sub-queries apply
    /// in order, so delegating a prefix and keeping the rest is not generally
    /// equivalent. A sub-query SQL would apply before a clause the statement
    /// already carries is residual too.
    fn validate(&self, ap: AccessPoint<'_>, properties: &Properties) -> Result<Validation, DelegateError> {
        let mut properties = properties.clone();
        let mut clauses = Clauses::default();
        let mut cans = Vec::new();
        let mut cants = Vec::new();

        for query in &self.queries {
            let validation = query.validate(ap, &properties)?;
            if let Some(delegable) = validation.delegable {
                if clauses.admit(&delegable, ap, &properties)? {
                    cans.push(delegable);
                } else {
                    tracing::debug!(kind = delegable.kind(), store = %ap.store.id(), "sub-query would apply out of order");
                    cants.push(delegable);
                }
            }
            cants.extend(validation.residual);
            properties = query.output_properties(ap, &properties)?;
        }

        let delegable = (!cans.is_empty() && cants.is_empty()).then(|| QueryNode::chain(cans));
        let residual = (!cants.is_empty()).then(|| QueryNode::chain(cants));
        Ok(Validation { delegable, residual })
    }

    fn translate(
        &self,
        mut stmt: SelectStmt,
        ap: AccessPoint<'_>,
        properties: &Properties,
    ) -> Result<SelectStmt, DelegateError> {
        let mut properties = properties.clone();
        for query in &self.queries {
            stmt = query.translate(stmt, ap, &properties)?;
            properties = query.output_properties(ap, &properties)?;
        }
        Ok(stmt)
    }

    fn output_properties(&self, ap: AccessPoint<'_>, properties: &Properties) -> Result<Properties, DelegateError> {
        self.queries
            .iter()
            .try_fold(properties.clone(), |properties, query| {
                query.output_properties(ap, &properties)
            })
    }
}

/// Clauses a statement already carries.
///
/// SQL applies WHERE, then DISTINCT, then ORDER BY, then the window, whatever
/// order the chain lists them in.
#[derive(Debug, Default)]
struct Clauses {
    window: bool,
    distinct: bool,
    /// ORDER BY columns, primary first
    order: Vec<Column>,
    /// Select list, `None` while every store property is projected
    projection: Option<Vec<Column>>,
}

impl Clauses {
    /// Whether `query` still applies after everything admitted before it once
    /// added to the statement. Records its clauses when it does.
    fn admit(&mut self, query: &QueryNode, ap: AccessPoint<'_>, properties: &Properties) -> Result<bool, DelegateError> {
        match query {
            QueryNode::Chain(chain) => {
                let mut properties = properties.clone();
                for query in &chain.queries {
                    if !self.admit(query, ap, &properties)? {
                        return Ok(false);
                    }
                    properties = query.output_properties(ap, &properties)?;
                }
                Ok(true)
            }
            QueryNode::Filter(_) => Ok(!self.window),
            QueryNode::Order(order) => {
                let mut columns = Vec::with_capacity(order.orderbys.len());
                for key in &order.orderbys {
                    columns.push(resolve_path(&key.property, ap, properties)?.column.clone());
                }
                // SELECT DISTINCT can only sort on projected columns
                if self.window || (self.distinct && !self.projects(&columns, ap)) {
                    return Ok(false);
                }
                self.order.splice(0..0, columns);
                Ok(true)
            }
            QueryNode::Range(_) => {
                self.window = true;
                Ok(true)
            }
            QueryNode::Distinct(_) => {
                if self.window || !self.projects(&self.order, ap) {
                    return Ok(false);
                }
                self.distinct = true;
                Ok(true)
            }
            QueryNode::Select(select) => {
                // sub-selects are inner joins and change the row count
                if self.distinct || (self.window && !select.sub_selects.is_empty()) {
                    return Ok(false);
                }
                let output = query.output_properties(ap, properties)?;
                self.projection = Some(output.iter().map(|property| property.column.clone()).collect());
                Ok(true)
            }
        }
    }

    fn projects(&self, columns: &[Column], ap: AccessPoint<'_>) -> bool {
        columns.iter().all(|column| match &self.projection {
            Some(projection) => projection.contains(column),
            None => ap.store.properties().iter().any(|property| property.column == *column),
        })
    }
}
