//! The resolution engine.
//!
//! Execution runs in two passes. Validation checks every requested field
//! against the [`TypeGraph`] without touching the store, pruning invalid
//! selections into field errors. Resolution then walks the remaining selection
//! tree depth first, consulting the type graph for how each field is reached.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

mod engine;
mod validation;

use displaydoc::Display;
use thiserror::Error;

use crate::graphql;
use crate::graphql::ErrorExtension;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::Value;
use crate::schema::TypeGraph;
use crate::store::RecordStore;

/// An ordered selection tree.
pub type SelectionSet = Vec<Selection>;

/// One requested field and, for object fields, what to select below it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub name: String,
    pub alias: Option<String>,
    pub arguments: Object,
    pub selection_set: SelectionSet,
}

impl Selection {
    /// A field without sub-selection.
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn object(name: impl Into<String>, selection_set: SelectionSet) -> Self {
        Self {
            name: name.into(),
            selection_set,
            ..Default::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The key this field is written under in the result.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A request for one root entry point.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Request {
    pub entry_point: String,
    pub alias: Option<String>,
    pub arguments: Object,
    pub selection: SelectionSet,
}

impl Request {
    pub fn new(entry_point: impl Into<String>, arguments: Object, selection: SelectionSet) -> Self {
        Self {
            entry_point: entry_point.into(),
            alias: None,
            arguments,
            selection,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.entry_point)
    }
}

impl From<Selection> for Request {
    fn from(selection: Selection) -> Self {
        Self {
            entry_point: selection.name,
            alias: selection.alias,
            arguments: selection.arguments,
            selection: selection.selection_set,
        }
    }
}

/// Errors detected while executing a request.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExecutionError {
    /// Cannot query field "{0}" on type "Query".
    UnknownEntryPoint(String),
    /// Cannot query field "{field}" on type "{type_name}".
    UnknownField { field: String, type_name: String },
    /// Field "{field}" must not have a selection since type "{field_type}" has no subfields.
    SubselectionNotAllowed { field: String, field_type: String },
    /// Field "{field}" of type "{field_type}" must have a selection of subfields.
    SubselectionRequired { field: String, field_type: String },
    /// Unknown argument "{argument}" on field "{type_name}.{field}".
    UnknownArgument {
        argument: String,
        field: String,
        type_name: String,
    },
    /// Argument "{argument}" of field "{field}" must be {expected}, got {value}.
    InvalidArgument {
        argument: String,
        field: String,
        expected: &'static str,
        value: String,
    },
}

impl ErrorExtension for ExecutionError {
    fn extension_code(&self) -> String {
        match self {
            ExecutionError::UnknownEntryPoint(_) => "UNKNOWN_ENTRY_POINT",
            ExecutionError::UnknownField { .. } => "UNKNOWN_FIELD",
            ExecutionError::SubselectionNotAllowed { .. } => "SUBSELECTION_NOT_ALLOWED",
            ExecutionError::SubselectionRequired { .. } => "SUBSELECTION_REQUIRED",
            ExecutionError::UnknownArgument { .. } => "UNKNOWN_ARGUMENT",
            ExecutionError::InvalidArgument { .. } => "INVALID_ARGUMENT",
        }
        .to_string()
    }

    fn custom_extension_details(&self) -> Option<Object> {
        let mut obj = Object::new();
        match self {
            ExecutionError::UnknownEntryPoint(field) => {
                obj.insert("type", "Query".into());
                obj.insert("field", field.clone().into());
            }
            ExecutionError::UnknownField { field, type_name }
            | ExecutionError::UnknownArgument {
                field, type_name, ..
            } => {
                obj.insert("type", type_name.clone().into());
                obj.insert("field", field.clone().into());
            }
            ExecutionError::SubselectionNotAllowed { field, field_type }
            | ExecutionError::SubselectionRequired { field, field_type } => {
                obj.insert("type", field_type.clone().into());
                obj.insert("field", field.clone().into());
            }
            ExecutionError::InvalidArgument { .. } => (),
        }

        (!obj.is_empty()).then_some(obj)
    }
}

/// Executes root requests against a store, in order, into one response.
///
/// An unknown entry point fails the whole request and no `data` is returned.
/// Every other problem is local to a field: the field is left out (or set to
/// `null` for argument errors) and an error is appended.
pub fn execute(graph: &TypeGraph, store: &dyn RecordStore, requests: &[Request]) -> graphql::Response {
    let entry_points = requests
        .iter()
        .map(|request| request.entry_point.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let span = tracing::debug_span!("execute", entry_points = %entry_points);
    let _guard = span.enter();

    let roots = match validation::validate(graph, requests) {
        Ok(roots) => roots,
        Err(errors) => {
            tracing::debug!(count = errors.len(), "request rejected");
            return graphql::Response::from_errors(
                errors
                    .iter()
                    .map(|(error, path)| error.to_graphql_error(Some(path.clone())))
                    .collect(),
            );
        }
    };

    let mut data = Object::new();
    let mut errors = Vec::new();
    for root in roots {
        errors.extend(
            root.errors
                .iter()
                .map(|(error, path)| error.to_graphql_error(Some(path.clone()))),
        );
        if let Some(resolution) = &root.resolution {
            let mut field_errors = Vec::new();
            let value = engine::execute_root(
                graph,
                store,
                resolution,
                &root.selection_set,
                &Path::empty().join(root.response_key.as_str()),
                &mut field_errors,
            );
            errors.extend(
                field_errors
                    .iter()
                    .map(|(error, path)| error.to_graphql_error(Some(path.clone()))),
            );
            data.insert(root.response_key.as_str(), value);
        }
    }

    graphql::Response::builder()
        .data(Value::Object(data))
        .errors(errors)
        .build()
}

pub(crate) type FieldError = (ExecutionError, Path);

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;
    use crate::store::Seed;

    fn run(requests: &[Request]) -> serde_json_bytes::Value {
        let store = Seed::builtin().into_store();
        let response = execute(&TypeGraph::library(), &store, requests);
        serde_json_bytes::to_value(&response).unwrap()
    }

    fn id(id: i64) -> Object {
        json!({ "id": id }).as_object().unwrap().clone()
    }

    #[test]
    fn book_with_author() {
        let response = run(&[Request::new(
            "book",
            id(1),
            vec![
                Selection::leaf("name"),
                Selection::object("author", vec![Selection::leaf("name")]),
            ],
        )]);
        assert_eq!(
            response,
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

    #[test]
    fn missing_book_is_null() {
        let response = run(&[Request::new("book", id(999), vec![Selection::leaf("name")])]);
        assert_eq!(response, json!({ "data": { "book": null } }));
    }

    #[test]
    fn unknown_entry_point_returns_no_data() {
        let response = run(&[
            Request::new("allBooks", Object::new(), vec![Selection::leaf("id")]),
            Request::new("allPublishers", Object::new(), vec![Selection::leaf("id")]),
        ]);
        assert_eq!(
            response,
            json!({
                "errors": [{
                    "message": "Cannot query field \"allPublishers\" on type \"Query\".",
                    "path": ["allPublishers"],
                    "extensions": {
                        "type": "Query",
                        "field": "allPublishers",
                        "code": "UNKNOWN_ENTRY_POINT"
                    }
                }]
            })
        );
    }

    #[test]
    fn unknown_field_is_omitted_and_reported() {
        let response = run(&[Request::new(
            "book",
            id(4),
            vec![
                Selection::leaf("name"),
                Selection::leaf("publisher"),
                Selection::leaf("authorId"),
            ],
        )]);
        assert_eq!(
            response,
            json!({
                "data": { "book": { "name": "The Fellowship of the Ring", "authorId": 2 } },
                "errors": [{
                    "message": "Cannot query field \"publisher\" on type \"Book\".",
                    "path": ["book", "publisher"],
                    "extensions": { "type": "Book", "field": "publisher", "code": "UNKNOWN_FIELD" }
                }]
            })
        );
    }

    #[test]
    fn invalid_id_argument() {
        let response = run(&[Request::new(
            "author",
            json!({ "id": "three" }).as_object().unwrap().clone(),
            vec![Selection::leaf("name")],
        )]);
        assert_eq!(
            response,
            json!({
                "data": { "author": null },
                "errors": [{
                    "message": "Argument \"id\" of field \"author\" must be an Int, got \"three\".",
                    "path": ["author"],
                    "extensions": { "code": "INVALID_ARGUMENT" }
                }]
            })
        );
    }

    #[test]
    fn aliases_and_typename() {
        let response = run(&[
            Request::new(
                "quote",
                id(5),
                vec![
                    Selection::leaf("__typename"),
                    Selection::leaf("text").with_alias("line"),
                ],
            )
            .with_alias("favourite"),
            Request::new("__typename", Object::new(), vec![]),
        ]);
        assert_eq!(
            response,
            json!({
                "data": {
                    "favourite": {
                        "__typename": "Quote",
                        "line": "Faithless is he that says farewell when the road darkens."
                    },
                    "__typename": "Query"
                }
            })
        );
    }
}
