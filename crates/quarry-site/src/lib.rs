//! Store registry
//!
//! A `Site` owns the stores queries run against. Each `Store` exposes its
//! property descriptors and, when it is backed by a relational database, the
//! physical table they map to.

use quarry_sql::{Column, Table};
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

mod config;
pub use config::{PropertyDefinition, SiteDefinition, StoreDefinition, StoreKindDefinition};

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Store not found: {0}")]
    UnknownStore(String),

    #[error("Store defined twice: {0}")]
    DuplicateStore(String),

    #[error("Property {store}.{property} references missing {target}")]
    DanglingReference {
        store: String,
        property: String,
        target: String,
    },

    #[error("Identity property {property} is not a property of store {store}")]
    UnknownIdentity { store: String, property: String },

    #[error("Store {store} is the target of a many-to-one relation but has no identity property")]
    MissingIdentity { store: String },

    #[error("Failed to read site file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Cardinality of a relation between two stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Relation {
    ManyToOne,
    OneToMany,
    ManyToMany,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relation::ManyToOne => "many-to-one",
            Relation::OneToMany => "one-to-many",
            Relation::ManyToMany => "many-to-many",
        })
    }
}

/// Where a relation property points to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRef {
    pub store: String,
    pub relation: Relation,
    /// Property of the remote store the local column joins against
    pub remote_property: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub column: Column,
    pub remote: Option<RemoteRef>,
}

impl PropertyDescriptor {
    pub fn is_local(&self) -> bool {
        self.remote.is_none()
    }

    /// Same property exposed under another name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

/// Property descriptors by name, tagged with the scope they describe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Properties {
    scope: String,
    entries: BTreeMap<String, PropertyDescriptor>,
}

impl Properties {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Store id, or a description of a derived shape
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn insert(&mut self, property: PropertyDescriptor) {
        self.entries.insert(property.name.clone(), property);
    }

    pub fn get(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> btree_map::Values<'_, String, PropertyDescriptor> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    /// A table in a relational database
    Relational { database: String, table: Table },
    /// Anything queries cannot be pushed down to
    External { backend: String },
}

#[derive(Debug, Clone)]
pub struct Store {
    id: String,
    kind: StoreKind,
    properties: Properties,
    identity: Vec<String>,
}

impl Store {
    pub fn relational(id: impl Into<String>, database: impl Into<String>, table: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            properties: Properties::new(id.clone()),
            kind: StoreKind::Relational {
                database: database.into(),
                table: Table::new(table),
            },
            id,
            identity: Vec::new(),
        }
    }

    pub fn external(id: impl Into<String>, backend: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            properties: Properties::new(id.clone()),
            kind: StoreKind::External {
                backend: backend.into(),
            },
            id,
            identity: Vec::new(),
        }
    }

    /// Local property stored in the column of the same name
    pub fn property(self, name: &str) -> Self {
        self.column_property(name, name)
    }

    pub fn column_property(mut self, name: &str, column: &str) -> Self {
        let column = self.column(column);
        self.properties.insert(PropertyDescriptor {
            name: name.to_string(),
            column,
            remote: None,
        });
        self
    }

    /// Relation property whose local side is `column`
    pub fn relation(mut self, name: &str, column: &str, remote: RemoteRef) -> Self {
        let column = self.column(column);
        self.properties.insert(PropertyDescriptor {
            name: name.to_string(),
            column,
            remote: Some(remote),
        });
        self
    }

    pub fn identity<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identity = names.into_iter().map(Into::into).collect();
        self
    }

    fn column(&self, name: &str) -> Column {
        match &self.kind {
            StoreKind::Relational { table, .. } => table.column(name),
            StoreKind::External { .. } => Column::new(self.id.clone(), name),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &StoreKind {
        &self.kind
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn is_relational(&self) -> bool {
        matches!(self.kind, StoreKind::Relational { .. })
    }

    pub fn table(&self) -> Option<&Table> {
        match &self.kind {
            StoreKind::Relational { table, .. } => Some(table),
            StoreKind::External { .. } => None,
        }
    }

    pub fn database(&self) -> Option<&str> {
        match &self.kind {
            StoreKind::Relational { database, .. } => Some(database),
            StoreKind::External { .. } => None,
        }
    }

    pub fn identity_properties(&self) -> &[String] {
        &self.identity
    }

    /// First identity property, the target of many-to-one joins
    pub fn identity_property(&self) -> Option<&PropertyDescriptor> {
        self.identity.first().and_then(|name| self.properties.get(name))
    }

    /// Whether a query on this store can join `other` in the same statement
    pub fn shares_database_with(&self, other: &Store) -> bool {
        match (self.database(), other.database()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Registry of stores by id
#[derive(Debug, Clone, Default)]
pub struct Site {
    stores: BTreeMap<String, Store>,
}

impl Site {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_store(&mut self, store: Store) -> Result<(), SiteError> {
        if self.stores.contains_key(store.id()) {
            return Err(SiteError::DuplicateStore(store.id().to_string()));
        }
        self.stores.insert(store.id().to_string(), store);
        Ok(())
    }

    pub fn with_store(mut self, store: Store) -> Result<Self, SiteError> {
        self.add_store(store)?;
        Ok(self)
    }

    pub fn store(&self, id: &str) -> Result<&Store, SiteError> {
        self.stores
            .get(id)
            .ok_or_else(|| SiteError::UnknownStore(id.to_string()))
    }

    pub fn stores(&self) -> impl Iterator<Item = &Store> {
        self.stores.values()
    }

    /// Verify identities and that every relation points to an existing store
    /// and property
    pub fn check(&self) -> Result<(), SiteError> {
        for store in self.stores.values() {
            for name in &store.identity {
                if !store.properties.contains(name) {
                    return Err(SiteError::UnknownIdentity {
                        store: store.id.clone(),
                        property: name.clone(),
                    });
                }
            }

            for property in store.properties.iter() {
                let Some(remote) = &property.remote else {
                    continue;
                };
                let target = self.stores.get(&remote.store).ok_or_else(|| SiteError::DanglingReference {
                    store: store.id.clone(),
                    property: property.name.clone(),
                    target: format!("store {}", remote.store),
                })?;
                if !target.properties.contains(&remote.remote_property) {
                    return Err(SiteError::DanglingReference {
                        store: store.id.clone(),
                        property: property.name.clone(),
                        target: format!("property {}.{}", remote.store, remote.remote_property),
                    });
                }
                if remote.relation == Relation::ManyToOne && target.identity.is_empty() {
                    return Err(SiteError::MissingIdentity {
                        store: target.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
