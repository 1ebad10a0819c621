use std::sync::Arc;

use http::StatusCode;
use library_graph::GraphService;
use library_graph::TypeGraph;
use library_graph::graphql;
use library_graph::store::Author;
use library_graph::store::Book;
use library_graph::store::InMemoryStore;
use library_graph::store::Quotation;
use library_graph::store::RecordStore;
use library_graph::store::Seed;
use serde_json::Value;
use serde_json::json;

fn builtin_service() -> GraphService {
    service_over(Seed::builtin().into_store())
}

fn service_over(store: impl RecordStore + 'static) -> GraphService {
    GraphService::new(Arc::new(TypeGraph::library()), Arc::new(store))
}

fn query(service: &GraphService, query: &str) -> (StatusCode, Value) {
    run(service, graphql::Request::builder().query(query).build())
}

fn run(service: &GraphService, request: graphql::Request) -> (StatusCode, Value) {
    let response = service.execute(request);
    let status = response.status();
    (status, serde_json::to_value(response.into_body()).unwrap())
}

#[test_log::test]
fn book_with_its_author() {
    let (status, body) = query(
        &builtin_service(),
        "{ book(id: 1) { name author { name } } }",
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "data": {
                "book": {
                    "name": "Harry Potter and the Chamber of Secrets",
                    "author": { "name": "J. K. Rowling" }
                }
            }
        })
    );
}

#[test_log::test]
fn author_books_in_seed_order() {
    let (_, body) = query(
        &builtin_service(),
        "{ author(id: 3) { name books { name } } }",
    );
    assert_eq!(
        body,
        json!({
            "data": {
                "author": {
                    "name": "Brent Weeks",
                    "books": [
                        { "name": "The Way of Shadows" },
                        { "name": "Beyond the Shadows" }
                    ]
                }
            }
        })
    );
}

#[test_log::test]
fn missing_book_is_null_without_errors() {
    let (status, body) = query(&builtin_service(), "{ book(id: 999) { name } }");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": { "book": null } }));
}

#[test_log::test]
fn unknown_field_keeps_its_siblings() {
    let (status, body) = query(
        &builtin_service(),
        "{ book(id: 4) { name publisher author { name } } }",
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "data": {
                "book": {
                    "name": "The Fellowship of the Ring",
                    "author": { "name": "J. R. R. Tolkien" }
                }
            },
            "errors": [{
                "message": "Cannot query field \"publisher\" on type \"Book\".",
                "path": ["book", "publisher"],
                "extensions": {
                    "code": "UNKNOWN_FIELD",
                    "type": "Book",
                    "field": "publisher"
                }
            }]
        })
    );
}

#[test_log::test]
fn unknown_entry_point_returns_no_data() {
    let (status, body) = query(
        &builtin_service(),
        "{ book(id: 1) { name } allPublishers { name } }",
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("data").is_none());
    assert_eq!(
        body["errors"][0]["message"],
        json!("Cannot query field \"allPublishers\" on type \"Query\".")
    );
}

#[test_log::test]
fn every_author_round_trips_through_its_identifier() {
    let service = builtin_service();
    let (_, body) = query(&service, "{ allAuthors { id name birth } }");
    let authors = body["data"]["allAuthors"].as_array().unwrap().clone();
    assert_eq!(authors.len(), 3);

    for author in authors {
        let (_, body) = run(
            &service,
            graphql::Request::builder()
                .query("query Author($id: Int) { author(id: $id) { id name birth } }")
                .operation_name("Author")
                .variable("id", author["id"].as_i64().unwrap())
                .build(),
        );
        assert_eq!(body["data"]["author"], author);
    }
}

#[test_log::test]
fn relationships_point_back_to_their_owner() {
    let (_, body) = query(
        &builtin_service(),
        "{ allAuthors { id books { author { id } } quotations { author { id } } } }",
    );
    for author in body["data"]["allAuthors"].as_array().unwrap() {
        let id = &author["id"];
        for child in author["books"]
            .as_array()
            .unwrap()
            .iter()
            .chain(author["quotations"].as_array().unwrap())
        {
            assert_eq!(&child["author"]["id"], id);
        }
    }
}

#[test_log::test]
fn quotes_are_looked_up_by_their_own_identifier() {
    let (_, body) = query(
        &builtin_service(),
        "{ quote(id: 5) { id text author { name } } allQuotes { id } }",
    );
    assert_eq!(
        body["data"]["quote"],
        json!({
            "id": 5,
            "text": "Faithless is he that says farewell when the road darkens.",
            "author": { "name": "J. R. R. Tolkien" }
        })
    );
    assert_eq!(
        body["data"]["allQuotes"],
        json!([
            { "id": 1 }, { "id": 2 }, { "id": 3 }, { "id": 4 },
            { "id": 5 }, { "id": 6 }, { "id": 7 }
        ])
    );
}

#[test_log::test]
fn dangling_author_reference_is_null() {
    let service = service_over(InMemoryStore::new(
        vec![Author {
            id: 1,
            name: "Known".to_string(),
            birth: 1900,
        }],
        vec![Book {
            id: 10,
            name: "Lost".to_string(),
            author_id: 2,
        }],
        vec![Quotation {
            id: 20,
            text: "Unattributed".to_string(),
            author_id: 2,
        }],
    ));
    let (status, body) = query(
        &service,
        "{ book(id: 10) { name author { name } } quote(id: 20) { author { id } } author(id: 1) { books { id } } }",
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "data": {
                "book": { "name": "Lost", "author": null },
                "quote": { "author": null },
                "author": { "books": [] }
            }
        })
    );
}

#[test_log::test]
fn fragments_aliases_and_directives() {
    let (_, body) = run(
        &builtin_service(),
        graphql::Request::builder()
            .query(
                r#"
                query Shelf($withAuthor: Boolean!) {
                  first: book(id: 7) { ...BookParts }
                  second: book(id: 8) { ...BookParts }
                }
                fragment BookParts on Book {
                  title: name
                  author @include(if: $withAuthor) { name }
                  __typename
                }
                "#,
            )
            .variable("withAuthor", false)
            .build(),
    );
    assert_eq!(
        body,
        json!({
            "data": {
                "first": { "title": "The Way of Shadows", "__typename": "Book" },
                "second": { "title": "Beyond the Shadows", "__typename": "Book" }
            }
        })
    );
}

#[test_log::test]
fn object_field_without_selection_is_reported_after_merging() {
    let (status, body) = query(
        &builtin_service(),
        "{ book(id: 1) { name author author { name } } }",
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "data": { "book": { "name": "Harry Potter and the Chamber of Secrets" } },
            "errors": [{
                "message": "Field \"author\" of type \"Author\" must have a selection of subfields.",
                "path": ["book", "author"],
                "extensions": { "type": "Author", "field": "author", "code": "SUBSELECTION_REQUIRED" }
            }]
        })
    );
}

#[test_log::test]
fn introspection_next_to_data() {
    let (status, body) = query(
        &builtin_service(),
        r#"{
            quote(id: 2) { id }
            __schema { queryType { name } }
            book: __type(name: "Book") { kind fields { name type { kind ofType { name } } } }
            missing: __type(name: "Publisher") { name }
        }"#,
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "data": {
                "quote": { "id": 2 },
                "__schema": { "queryType": { "name": "Query" } },
                "book": {
                    "kind": "OBJECT",
                    "fields": [
                        { "name": "id", "type": { "kind": "NON_NULL", "ofType": { "name": "Int" } } },
                        { "name": "name", "type": { "kind": "NON_NULL", "ofType": { "name": "String" } } },
                        { "name": "authorId", "type": { "kind": "NON_NULL", "ofType": { "name": "Int" } } },
                        { "name": "author", "type": { "kind": "OBJECT", "ofType": null } }
                    ]
                },
                "missing": null
            }
        })
    );
}

#[test_log::test]
fn introspection_errors_are_field_errors() {
    let (status, body) = query(
        &builtin_service(),
        "{ __type(name: 3) { name } __schema { types { name owner } } }",
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["__type"], Value::Null);
    assert_eq!(body["data"]["__schema"]["types"][1], json!({ "name": "Book" }));
    assert_eq!(
        body["errors"],
        json!([
            {
                "message": "Argument \"name\" of field \"__type\" must be a String, got 3.",
                "path": ["__type"],
                "extensions": { "code": "INVALID_ARGUMENT" }
            },
            {
                "message": "Cannot query field \"owner\" on type \"__Type\".",
                "path": ["__schema", "types", "owner"],
                "extensions": { "type": "__Type", "field": "owner", "code": "UNKNOWN_FIELD" }
            }
        ])
    );
}
