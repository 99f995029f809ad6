#![allow(dead_code)]

use quarry_delegate::{AccessPoint, Delegate, DelegateError, Validation};
use quarry_query::QueryNode;
use quarry_site::{Relation, RemoteRef, Site, Store};
use quarry_sql::SelectStmt;

fn remote(store: &str, relation: Relation, remote_property: &str) -> RemoteRef {
    RemoteRef {
        store: store.to_string(),
        relation,
        remote_property: remote_property.to_string(),
    }
}

/// Books and authors in one database, publishers in another, tags behind a
/// non-relational backend
pub fn library() -> Site {
    let stores = vec![
        Store::relational("books", "library", "book")
            .property("id")
            .property("title")
            .property("year")
            .relation("author", "author_id", remote("authors", Relation::ManyToOne, "id"))
            .relation("publisher", "publisher_id", remote("publishers", Relation::ManyToOne, "id"))
            .relation("tag", "tag_id", remote("tags", Relation::ManyToOne, "id"))
            .relation("reviews", "id", remote("reviews", Relation::OneToMany, "book_id"))
            .identity(["id"]),
        Store::relational("authors", "library", "author")
            .property("id")
            .property("name")
            .relation("country", "country_id", remote("countries", Relation::ManyToOne, "id"))
            .identity(["id"]),
        Store::relational("countries", "library", "country")
            .property("id")
            .property("code")
            .identity(["id"]),
        Store::relational("reviews", "library", "review")
            .property("id")
            .property("book_id")
            .property("stars")
            .identity(["id"]),
        Store::relational("publishers", "archive", "publisher")
            .property("id")
            .property("name")
            .identity(["id"]),
        Store::external("tags", "taxonomy-service")
            .property("id")
            .property("label")
            .identity(["id"]),
    ];

    let mut site = Site::new();
    for store in stores {
        site.add_store(store).unwrap();
    }
    site.check().unwrap();
    site
}

pub fn validate(site: &Site, query: &QueryNode) -> Result<Validation, DelegateError> {
    let books = site.store("books").unwrap();
    query.validate(AccessPoint::new(site, books), books.properties())
}

pub fn translate(site: &Site, query: &QueryNode) -> Result<SelectStmt, DelegateError> {
    let books = site.store("books").unwrap();
    let scan = SelectStmt::from_table(books.table().unwrap().clone());
    query.translate(scan, AccessPoint::new(site, books), books.properties())
}
