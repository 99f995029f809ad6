//! Delegation errors

use quarry_site::{Relation, SiteError};
use quarry_sql::SqlError;
use thiserror::Error;

/// Failures of validation and translation.
///
/// A query that cannot be delegated is not an error: it comes back as the
/// residual part of a `Validation`.
#[derive(Debug, Error)]
pub enum DelegateError {
    #[error("Unknown property {name:?} in {scope}")]
    UnknownProperty { scope: String, name: String },

    #[error("Property {property:?} has a {relation} relation, only many-to-one relations can be joined")]
    UnsupportedRelation { property: String, relation: Relation },

    #[error("Property {property:?} of {scope} is not a relation")]
    NotARelation { scope: String, property: String },

    #[error("Store {store} cannot be joined in this statement")]
    NotDelegable { store: String },

    #[error("Column {column} is not reachable from the statement")]
    ColumnOutOfScope { column: String },

    #[error(transparent)]
    Site(#[from] SiteError),

    #[error(transparent)]
    Sql(#[from] SqlError),
}
