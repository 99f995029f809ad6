//! Validate/translate behaviour of every node kind against a library site

mod common;

use common::{library, translate, validate};
use quarry_delegate::{DelegateError, Validation};
use quarry_query::{Condition, QueryNode, QuerySelect};
use quarry_site::Relation;
use quarry_sql::SqlError;

#[test]
fn test_range_translation() {
    let site = library();

    let stmt = translate(&site, &QueryNode::range(Some(5), Some(15))).unwrap();
    assert_eq!((stmt.offset, stmt.limit), (Some(5), Some(10)));

    let stmt = translate(&site, &QueryNode::range(None, Some(10))).unwrap();
    assert_eq!((stmt.offset, stmt.limit), (None, Some(10)));

    let stmt = translate(&site, &QueryNode::range(Some(5), None)).unwrap();
    assert_eq!((stmt.offset, stmt.limit), (Some(5), None));
}

#[test]
fn test_chained_ranges_compose() {
    let site = library();
    let query = QueryNode::chain(vec![
        QueryNode::range(Some(5), Some(15)),
        QueryNode::range(Some(2), Some(4)),
    ]);
    let stmt = translate(&site, &query).unwrap();
    assert_eq!((stmt.offset, stmt.limit), (Some(7), Some(2)));
}

#[test]
fn test_distinct_is_idempotent() {
    let site = library();
    let once = translate(&site, &QueryNode::distinct()).unwrap();
    let twice = translate(&site, &QueryNode::chain(vec![QueryNode::distinct(), QueryNode::distinct()])).unwrap();
    assert_eq!(once, twice);
    assert_eq!(once.to_sql(), r#"SELECT DISTINCT * FROM "book""#);
}

#[test]
fn test_order_precedence() {
    let site = library();
    let query = QueryNode::order([("year", false), ("title", true)]);

    assert_eq!(validate(&site, &query).unwrap(), Validation::delegable(query.clone()));
    assert_eq!(
        translate(&site, &query).unwrap().to_sql(),
        r#"SELECT * FROM "book" ORDER BY "book"."year" DESC, "book"."title" ASC"#
    );
}

#[test]
fn test_order_through_relation() {
    let site = library();
    let query = QueryNode::order([("author.name", true), ("year", false)]);

    assert_eq!(validate(&site, &query).unwrap(), Validation::delegable(query.clone()));
    assert_eq!(
        translate(&site, &query).unwrap().to_sql(),
        concat!(
            r#"SELECT * FROM "book" LEFT JOIN "author" ON "book"."author_id" = "author"."id" "#,
            r#"ORDER BY "author"."name" ASC, "book"."year" DESC"#
        )
    );

    let query = QueryNode::order([("publisher.name", true)]);
    assert_eq!(validate(&site, &query).unwrap(), Validation::residual(query.clone()));

    assert!(matches!(
        validate(&site, &QueryNode::order([("author.age", true)])),
        Err(DelegateError::UnknownProperty { scope, name }) if scope == "authors" && name == "age"
    ));
}

#[test]
fn test_later_order_takes_precedence() {
    let site = library();
    let query = QueryNode::chain(vec![
        QueryNode::order([("year", true)]),
        QueryNode::order([("title", false)]),
    ]);

    assert!(validate(&site, &query).unwrap().is_fully_delegable());
    assert_eq!(
        translate(&site, &query).unwrap().to_sql(),
        r#"SELECT * FROM "book" ORDER BY "book"."title" DESC, "book"."year" ASC"#
    );
}

#[test]
fn test_local_filter() {
    let site = library();
    let query = QueryNode::filter(Condition::or(vec![
        Condition::compare("year", "<", 1900),
        Condition::not(Condition::compare("title", "like", "The %")),
    ]));

    assert!(validate(&site, &query).unwrap().is_fully_delegable());
    assert_eq!(
        translate(&site, &query).unwrap().to_sql(),
        r#"SELECT * FROM "book" WHERE ("book"."year" < 1900 OR NOT ("book"."title" LIKE 'The %'))"#
    );
}

#[test]
fn test_filter_joins_many_to_one_relation() {
    let site = library();
    let query = QueryNode::filter(Condition::equals("author.name", "Jane"));

    assert!(validate(&site, &query).unwrap().is_fully_delegable());
    assert_eq!(
        translate(&site, &query).unwrap().to_sql(),
        concat!(
            r#"SELECT * FROM "book" LEFT JOIN "author" ON "book"."author_id" = "author"."id" "#,
            r#"WHERE "author"."name" = 'Jane'"#
        )
    );
}

#[test]
fn test_filter_joins_multiple_hops() {
    let site = library();
    let query = QueryNode::filter(Condition::and(vec![
        Condition::equals("author.country.code", "FR"),
        Condition::compare("author.name", "!=", "Jules"),
    ]));

    assert!(validate(&site, &query).unwrap().is_fully_delegable());
    assert_eq!(
        translate(&site, &query).unwrap().to_sql(),
        concat!(
            r#"SELECT * FROM "book" "#,
            r#"LEFT JOIN "author" ON "book"."author_id" = "author"."id" "#,
            r#"LEFT JOIN "country" ON "author"."country_id" = "country"."id" "#,
            r#"WHERE ("country"."code" = 'FR' AND "author"."name" != 'Jules')"#
        )
    );
}

#[test]
fn test_filter_on_foreign_key_column_joins_nothing() {
    let site = library();
    let query = QueryNode::filter(Condition::equals("author", 3));

    assert!(validate(&site, &query).unwrap().is_fully_delegable());
    assert_eq!(
        translate(&site, &query).unwrap().to_sql(),
        r#"SELECT * FROM "book" WHERE "book"."author_id" = 3"#
    );

    // the local column of a one-to-many relation is not what the relation means
    let query = QueryNode::filter(Condition::equals("reviews", 3));
    assert_eq!(validate(&site, &query).unwrap(), Validation::residual(query.clone()));
}

#[test]
fn test_filter_mixing_relation_and_local_branches() {
    let site = library();
    let query = QueryNode::filter(Condition::or(vec![
        Condition::equals("author.name", "Jules"),
        Condition::equals("title", "Pamphlet"),
    ]));

    assert!(validate(&site, &query).unwrap().is_fully_delegable());
    assert_eq!(
        translate(&site, &query).unwrap().to_sql(),
        concat!(
            r#"SELECT * FROM "book" LEFT JOIN "author" ON "book"."author_id" = "author"."id" "#,
            r#"WHERE ("author"."name" = 'Jules' OR "book"."title" = 'Pamphlet')"#
        )
    );
}

#[test]
fn test_filter_through_unjoinable_stores_is_residual() {
    let site = library();

    // another database, a non-relational backend, a one-to-many relation
    for condition in [
        Condition::equals("publisher.name", "Penguin"),
        Condition::equals("tag.label", "classic"),
        Condition::compare("reviews.stars", ">", 3),
    ] {
        let query = QueryNode::filter(condition);
        assert_eq!(validate(&site, &query).unwrap(), Validation::residual(query.clone()));
    }
}

#[test]
fn test_translate_refuses_unjoinable_stores() {
    let site = library();

    let err = translate(&site, &QueryNode::filter(Condition::equals("publisher.name", "Penguin"))).unwrap_err();
    assert!(matches!(err, DelegateError::NotDelegable { store } if store == "publishers"));

    let err = translate(&site, &QueryNode::filter(Condition::equals("tag.label", "classic"))).unwrap_err();
    assert!(matches!(err, DelegateError::NotDelegable { store } if store == "tags"));

    let err = translate(&site, &QueryNode::filter(Condition::compare("reviews.stars", ">", 3))).unwrap_err();
    assert!(matches!(
        err,
        DelegateError::UnsupportedRelation { property, relation: Relation::OneToMany } if property == "reviews"
    ));
}

#[test]
fn test_unknown_property_is_an_error() {
    let site = library();
    let query = QueryNode::filter(Condition::and(vec![
        Condition::equals("title", "Emma"),
        Condition::equals("isbn", "0-14"),
    ]));

    assert!(matches!(
        validate(&site, &query),
        Err(DelegateError::UnknownProperty { scope, name }) if scope == "books" && name == "isbn"
    ));
    assert!(matches!(
        translate(&site, &query),
        Err(DelegateError::UnknownProperty { name, .. }) if name == "isbn"
    ));
}

#[test]
fn test_unknown_property_behind_residual_relation_is_an_error() {
    let site = library();
    let query = QueryNode::filter(Condition::equals("tag.colour", "red"));

    assert!(matches!(
        validate(&site, &query),
        Err(DelegateError::UnknownProperty { scope, name }) if scope == "tags" && name == "colour"
    ));
}

#[test]
fn test_path_through_local_property_is_an_error() {
    let site = library();
    let query = QueryNode::filter(Condition::equals("title.length", 4));
    assert!(matches!(
        validate(&site, &query),
        Err(DelegateError::NotARelation { property, .. }) if property == "title"
    ));
}

#[test]
fn test_unrenderable_operator_is_residual() {
    let site = library();
    let query = QueryNode::filter(Condition::compare("year", "+", 1));

    assert_eq!(validate(&site, &query).unwrap(), Validation::residual(query.clone()));
    assert!(matches!(
        translate(&site, &query),
        Err(DelegateError::Sql(SqlError::InvalidOperator(op))) if op == "+"
    ));
}

#[test]
fn test_select_with_sub_select() {
    let site = library();
    let query: QueryNode = QuerySelect::new()
        .field("title", "title")
        .sub_select("author", QuerySelect::new().field("who", "name"))
        .into();

    assert!(validate(&site, &query).unwrap().is_fully_delegable());
    assert_eq!(
        translate(&site, &query).unwrap().to_sql(),
        concat!(
            r#"SELECT "author"."name" AS "who", "book"."title" AS "title" "#,
            r#"FROM "book" JOIN "author" ON "book"."author_id" = "author"."id""#
        )
    );
}

#[test]
fn test_select_joins_on_remote_property() {
    let site = library();
    let query: QueryNode = QuerySelect::new()
        .sub_select("reviews", QuerySelect::new().field("stars", "stars"))
        .into();

    assert!(validate(&site, &query).unwrap().is_fully_delegable());
    assert_eq!(
        translate(&site, &query).unwrap().to_sql(),
        r#"SELECT "review"."stars" AS "stars" FROM "book" JOIN "review" ON "book"."id" = "review"."book_id""#
    );
}

#[test]
fn test_select_is_all_or_nothing() {
    let site = library();
    let query: QueryNode = QuerySelect::new()
        .field("title", "title")
        .sub_select("author", QuerySelect::new().field("who", "name"))
        .sub_select("tag", QuerySelect::new().field("label", "label"))
        .into();

    assert_eq!(validate(&site, &query).unwrap(), Validation::residual(query.clone()));
}

#[test]
fn test_select_errors() {
    let site = library();

    let query: QueryNode = QuerySelect::new().field("name", "isbn").into();
    assert!(matches!(validate(&site, &query), Err(DelegateError::UnknownProperty { .. })));

    let query: QueryNode = QuerySelect::new().sub_select("title", QuerySelect::new()).into();
    assert!(matches!(
        validate(&site, &query),
        Err(DelegateError::NotARelation { property, .. }) if property == "title"
    ));
}

#[test]
fn test_chain_is_all_or_nothing() {
    let site = library();
    let managed = QueryNode::filter(Condition::equals("title", "Emma"));
    let unmanaged = QueryNode::filter(Condition::equals("tag.label", "classic"));
    let query = QueryNode::chain(vec![managed, unmanaged.clone()]);

    let validation = validate(&site, &query).unwrap();
    assert_eq!(validation.delegable, None);
    assert_eq!(validation.residual, Some(QueryNode::chain(vec![unmanaged])));
}

#[test]
fn test_fully_managed_chain_has_no_residual() {
    let site = library();
    let query = QueryNode::chain(vec![
        QueryNode::filter(Condition::equals("title", "Emma")),
        QueryNode::distinct(),
    ]);

    let validation = validate(&site, &query).unwrap();
    assert_eq!(validation.delegable, Some(query));
    assert_eq!(validation.residual, None);
}

#[test]
fn test_chain_threads_selected_properties() {
    let site = library();
    let query = QueryNode::chain(vec![
        QuerySelect::new().field("t", "title").field("a", "author").into(),
        QueryNode::filter(Condition::equals("a.name", "Jane")),
        QueryNode::order([("t", true)]),
    ]);

    assert!(validate(&site, &query).unwrap().is_fully_delegable());
    assert_eq!(
        translate(&site, &query).unwrap().to_sql(),
        concat!(
            r#"SELECT "book"."author_id" AS "a", "book"."title" AS "t" FROM "book" "#,
            r#"LEFT JOIN "author" ON "book"."author_id" = "author"."id" WHERE "author"."name" = 'Jane' "#,
            r#"ORDER BY "book"."title" ASC"#
        )
    );
}

#[test]
fn test_chain_hides_unselected_properties() {
    let site = library();
    let query = QueryNode::chain(vec![
        QuerySelect::new().field("t", "title").into(),
        QueryNode::filter(Condition::equals("year", 1815)),
    ]);

    assert!(matches!(
        validate(&site, &query),
        Err(DelegateError::UnknownProperty { name, .. }) if name == "year"
    ));
}

#[test]
fn test_second_select_replaces_projection() {
    let site = library();
    let query = QueryNode::chain(vec![
        QuerySelect::new().field("t", "title").field("y", "year").into(),
        QuerySelect::new().field("label", "t").into(),
    ]);

    assert_eq!(
        translate(&site, &query).unwrap().to_sql(),
        r#"SELECT "book"."title" AS "label" FROM "book""#
    );
}

#[test]
fn test_chain_out_of_clause_order_is_residual() {
    let site = library();
    let window = || QueryNode::range(None, Some(2));
    let by_author_name = || QueryNode::order([("author.name", true)]);

    for queries in [
        vec![window(), QueryNode::filter(Condition::equals("title", "Emma"))],
        vec![window(), QueryNode::order([("year", true)])],
        vec![window(), QueryNode::distinct()],
        vec![QueryNode::distinct(), QuerySelect::new().field("t", "title").into()],
        vec![
            window(),
            QuerySelect::new()
                .sub_select("author", QuerySelect::new().field("who", "name"))
                .into(),
        ],
        vec![by_author_name(), QueryNode::distinct()],
        vec![QueryNode::distinct(), by_author_name()],
        vec![
            QueryNode::order([("year", true)]),
            QuerySelect::new().field("t", "title").into(),
            QueryNode::distinct(),
        ],
        vec![
            QueryNode::filter(Condition::equals("title", "Emma")),
            QueryNode::chain(vec![window(), QueryNode::filter(Condition::equals("year", 1815))]),
        ],
    ] {
        let query = QueryNode::chain(queries);
        let validation = validate(&site, &query).unwrap();
        assert_eq!(validation.delegable, None, "{:?}", query);
        assert!(validation.residual.is_some());
    }
}

#[test]
fn test_chain_in_clause_order_is_delegated() {
    let site = library();

    for queries in [
        vec![
            QueryNode::filter(Condition::equals("author.name", "Jane")),
            QueryNode::order([("year", true)]),
            QueryNode::range(Some(1), None),
            QueryNode::range(None, Some(2)),
        ],
        vec![QueryNode::order([("title", true)]), QueryNode::distinct()],
        vec![
            QuerySelect::new().field("t", "title").field("y", "year").into(),
            QueryNode::distinct(),
            QueryNode::order([("y", false)]),
            QueryNode::filter(Condition::compare("y", ">", 1800)),
        ],
        vec![
            QueryNode::range(None, Some(5)),
            QuerySelect::new().field("t", "title").into(),
        ],
    ] {
        let query = QueryNode::chain(queries);
        assert!(validate(&site, &query).unwrap().is_fully_delegable(), "{:?}", query);
    }
}
