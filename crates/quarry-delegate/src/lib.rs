//! Query delegation to relational stores
//!
//! Every query node knows how to split itself into the part a relational store
//! can run (`validate`) and how to add that part to a SELECT statement
//! (`translate`). Whatever cannot be delegated is returned as a residual
//! query, to be evaluated on the rows the statement produces.

use quarry_query::QueryNode;
use quarry_site::{Properties, RemoteRef, Site, Store};
use quarry_sql::{SelectStmt, Table};

mod condition;
mod error;
mod nodes;
mod plan;
mod resolver;

pub use error::DelegateError;
pub use plan::{scan, Delegator, Plan};
pub use resolver::{resolve, resolve_path};

/// The store a query is delegated to, with the site resolving its relations
#[derive(Debug, Clone, Copy)]
pub struct AccessPoint<'a> {
    pub site: &'a Site,
    pub store: &'a Store,
}

impl<'a> AccessPoint<'a> {
    pub fn new(site: &'a Site, store: &'a Store) -> Self {
        Self { site, store }
    }

    /// Store a relation points to
    pub fn remote_store(&self, remote: &RemoteRef) -> Result<&'a Store, DelegateError> {
        Ok(self.site.store(&remote.store)?)
    }

    /// Whether `other` can take part in a statement on this access point
    pub fn can_join(&self, other: &Store) -> bool {
        other.is_relational() && self.store.shares_database_with(other)
    }

    /// Store and table of a relation about to be joined
    pub(crate) fn joinable(&self, remote: &RemoteRef) -> Result<(&'a Store, &'a Table), DelegateError> {
        let store = self.remote_store(remote)?;
        match store.table() {
            Some(table) if self.can_join(store) => Ok((store, table)),
            _ => Err(DelegateError::NotDelegable {
                store: store.id().to_string(),
            }),
        }
    }
}

/// Split of a query into what a store runs and what is left
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub delegable: Option<QueryNode>,
    pub residual: Option<QueryNode>,
}

impl Validation {
    pub fn delegable(node: QueryNode) -> Self {
        Self {
            delegable: Some(node),
            residual: None,
        }
    }

    pub fn residual(node: QueryNode) -> Self {
        Self {
            delegable: None,
            residual: Some(node),
        }
    }

    pub fn is_fully_delegable(&self) -> bool {
        self.delegable.is_some() && self.residual.is_none()
    }
}

/// Validate/translate protocol implemented by every query node
pub trait Delegate {
    /// Split this node against `properties`, the shape of the rows it applies to
    fn validate(&self, ap: AccessPoint<'_>, properties: &Properties) -> Result<Validation, DelegateError>;

    /// Add this node to `stmt`. Only valid on nodes `validate` fully delegated.
    fn translate(
        &self,
        stmt: SelectStmt,
        ap: AccessPoint<'_>,
        properties: &Properties,
    ) -> Result<SelectStmt, DelegateError>;

    /// Shape of the rows this node produces from rows shaped like `properties`
    fn output_properties(&self, ap: AccessPoint<'_>, properties: &Properties) -> Result<Properties, DelegateError>;
}
