//! YAML site definitions
//!
//! ```yaml
//! stores:
//!   - id: books
//!     kind: { type: relational, database: library, table: book }
//!     identity: [id]
//!     properties:
//!       - name: id
//!       - name: author
//!         column: author_id
//!         remote: { store: authors, relation: many-to-one, remote_property: id }
//! ```

use crate::{RemoteRef, Site, SiteError, Store};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteDefinition {
    pub stores: Vec<StoreDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDefinition {
    pub id: String,
    pub kind: StoreKindDefinition,
    #[serde(default)]
    pub identity: Vec<String>,
    pub properties: Vec<PropertyDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreKindDefinition {
    Relational {
        database: String,
        /// Defaults to the store id
        #[serde(default)]
        table: Option<String>,
    },
    External {
        backend: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,
    /// Defaults to the property name
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub remote: Option<RemoteRef>,
}

impl StoreDefinition {
    fn into_store(self) -> Store {
        let mut store = match self.kind {
            StoreKindDefinition::Relational { database, table } => {
                let table = table.unwrap_or_else(|| self.id.clone());
                Store::relational(self.id, database, table)
            }
            StoreKindDefinition::External { backend } => Store::external(self.id, backend),
        };

        for property in self.properties {
            let column = property.column.as_deref().unwrap_or(&property.name);
            store = match property.remote {
                Some(remote) => store.relation(&property.name, column, remote),
                None => store.column_property(&property.name, column),
            };
        }
        store.identity(self.identity)
    }
}

impl SiteDefinition {
    /// Build and check the site
    pub fn into_site(self) -> Result<Site, SiteError> {
        let mut site = Site::new();
        for store in self.stores {
            site.add_store(store.into_store())?;
        }
        site.check()?;
        Ok(site)
    }
}

impl Site {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SiteError> {
        let definition: SiteDefinition = serde_yaml::from_str(yaml)?;
        definition.into_site()
    }

    /// Load a site definition file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SiteError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let site = Self::from_yaml_str(&contents)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            stores = site.stores().count(),
            "Loaded site definition"
        );
        Ok(site)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Relation, StoreKind};
    use quarry_sql::Column;

    const LIBRARY: &str = r#"
stores:
  - id: books
    kind: { type: relational, database: library, table: book }
    identity: [id]
    properties:
      - name: id
      - name: title
      - name: author
        column: author_id
        remote: { store: authors, relation: many-to-one, remote_property: id }
  - id: authors
    kind: { type: relational, database: library }
    identity: [id]
    properties:
      - name: id
      - name: name
  - id: reviews
    kind: { type: external, backend: rss }
    properties:
      - name: text
"#;

    #[test]
    fn test_load_from_yaml() {
        let site = Site::from_yaml_str(LIBRARY).unwrap();

        let books = site.store("books").unwrap();
        let author = books.properties().get("author").unwrap();
        assert_eq!(author.column, Column::new("book", "author_id"));
        assert_eq!(author.remote.as_ref().unwrap().relation, Relation::ManyToOne);

        // table defaults to the store id
        let authors = site.store("authors").unwrap();
        assert_eq!(authors.table().unwrap().name, "authors");

        let reviews = site.store("reviews").unwrap();
        assert!(matches!(reviews.kind(), StoreKind::External { backend } if backend == "rss"));
    }

    #[test]
    fn test_load_rejects_dangling_reference() {
        let yaml = LIBRARY.replace("remote_property: id", "remote_property: ident");
        assert!(matches!(
            Site::from_yaml_str(&yaml),
            Err(SiteError::DanglingReference { .. })
        ));
    }

    #[test]
    fn test_load_rejects_bad_yaml() {
        assert!(matches!(Site::from_yaml_str("stores: 3"), Err(SiteError::Yaml(_))));
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join("quarry_site_test.yaml");
        std::fs::write(&path, LIBRARY).unwrap();
        let site = Site::load(&path).unwrap();
        assert_eq!(site.stores().count(), 3);
        std::fs::remove_file(path).ok();
    }
}
