//! `Delegate` implementations, one module per node kind

use crate::{AccessPoint, Delegate, DelegateError, Validation};
use quarry_query::QueryNode;
use quarry_site::Properties;
use quarry_sql::SelectStmt;

mod chain;
mod filter;
mod select;
mod simple;

impl Delegate for QueryNode {
    fn validate(&self, ap: AccessPoint<'_>, properties: &Properties) -> Result<Validation, DelegateError> {
        match self {
            QueryNode::Chain(chain) => chain.validate(ap, properties),
            QueryNode::Filter(filter) => filter.validate(ap, properties),
            QueryNode::Select(select) => select.validate(ap, properties),
            QueryNode::Order(order) => order.validate(ap, properties),
            QueryNode::Range(range) => range.validate(ap, properties),
            QueryNode::Distinct(distinct) => distinct.validate(ap, properties),
        }
    }

    fn translate(
        &self,
        stmt: SelectStmt,
        ap: AccessPoint<'_>,
        properties: &Properties,
    ) -> Result<SelectStmt, DelegateError> {
        tracing::trace!(kind = self.kind(), store = %ap.store.id(), "translating");
        match self {
            QueryNode::Chain(chain) => chain.translate(stmt, ap, properties),
            QueryNode::Filter(filter) => filter.translate(stmt, ap, properties),
            QueryNode::Select(select) => select.translate(stmt, ap, properties),
            QueryNode::Order(order) => order.translate(stmt, ap, properties),
            QueryNode::Range(range) => range.translate(stmt, ap, properties),
            QueryNode::Distinct(distinct) => distinct.translate(stmt, ap, properties),
        }
    }

    fn output_properties(&self, ap: AccessPoint<'_>, properties: &Properties) -> Result<Properties, DelegateError> {
        match self {
            QueryNode::Chain(chain) => chain.output_properties(ap, properties),
            QueryNode::Filter(filter) => filter.output_properties(ap, properties),
            QueryNode::Select(select) => select.output_properties(ap, properties),
            QueryNode::Order(order) => order.output_properties(ap, properties),
            QueryNode::Range(range) => range.output_properties(ap, properties),
            QueryNode::Distinct(distinct) => distinct.output_properties(ap, properties),
        }
    }
}
