use super::ExecutionError;
use super::FieldError;
use super::Request;
use super::Selection;
use super::SelectionSet;
use crate::introspection;
use crate::introspection::IntrospectionRoot;
use crate::json_ext::Path;
use crate::json_ext::Value;
use crate::schema::Cardinality;
use crate::schema::EntryPoint;
use crate::schema::FieldKind;
use crate::schema::ObjectType;
use crate::schema::TYPENAME;
use crate::schema::TypeGraph;
use crate::store::EntityKind;
use crate::store::Id;

const TYPENAME_TYPE: &str = "String!";

/// What a root field resolves to, decided before the store is consulted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Resolution {
    Typename(&'static str),
    Introspection(IntrospectionRoot),
    All(EntityKind),
    ById(EntityKind, Id),
    Null,
}

/// A root field that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ValidRoot {
    pub(crate) response_key: String,
    /// `None` when the field is left out of the response.
    pub(crate) resolution: Option<Resolution>,
    pub(crate) selection_set: SelectionSet,
    pub(crate) errors: Vec<FieldError>,
}

/// Checks every root request, failing as a whole on unknown entry points.
pub(crate) fn validate(
    graph: &TypeGraph,
    requests: &[Request],
) -> Result<Vec<ValidRoot>, Vec<FieldError>> {
    let unknown: Vec<FieldError> = requests
        .iter()
        .filter(|request| {
            request.entry_point != TYPENAME
                && !introspection::is_root_field(&request.entry_point)
                && graph.root().entry_point(&request.entry_point).is_none()
        })
        .map(|request| {
            (
                ExecutionError::UnknownEntryPoint(request.entry_point.clone()),
                Path::empty().join(request.response_key()),
            )
        })
        .collect();
    if !unknown.is_empty() {
        return Err(unknown);
    }

    Ok(requests
        .iter()
        .map(|request| validate_root(graph, request))
        .collect())
}

fn validate_root(graph: &TypeGraph, request: &Request) -> ValidRoot {
    let path = Path::empty().join(request.response_key());
    let mut root = ValidRoot {
        response_key: request.response_key().to_string(),
        resolution: None,
        selection_set: SelectionSet::new(),
        errors: Vec::new(),
    };

    if introspection::is_root_field(&request.entry_point) {
        root.resolution = validate_introspection_root(graph, request, &path, &mut root.errors);
        root.selection_set = request.selection.clone();
        return root;
    }

    let Some(entry_point) = graph.root().entry_point(&request.entry_point) else {
        // __typename
        if request.selection.is_empty() {
            root.resolution = Some(Resolution::Typename(graph.root().name));
        } else {
            root.errors.push((
                ExecutionError::SubselectionNotAllowed {
                    field: TYPENAME.to_string(),
                    field_type: TYPENAME_TYPE.to_string(),
                },
                path,
            ));
        }
        return root;
    };

    let Some(object_type) = graph.object_type(entry_point.target) else {
        tracing::error!(
            entry_point = entry_point.name,
            "entry point targets a kind without an object type"
        );
        root.resolution = Some(Resolution::Null);
        return root;
    };

    if request.selection.is_empty() {
        let field_type = match entry_point.cardinality {
            Cardinality::One => object_type.name.to_string(),
            Cardinality::Many => format!("[{}]", object_type.name),
        };
        root.errors.push((
            ExecutionError::SubselectionRequired {
                field: entry_point.name.to_string(),
                field_type,
            },
            path,
        ));
        return root;
    }

    root.resolution = Some(resolve_arguments(
        graph,
        entry_point,
        request,
        &path,
        &mut root.errors,
    ));
    root.selection_set =
        validate_selection_set(graph, object_type, &request.selection, &path, &mut root.errors);
    root
}

fn resolve_arguments(
    graph: &TypeGraph,
    entry_point: &EntryPoint,
    request: &Request,
    path: &Path,
    errors: &mut Vec<FieldError>,
) -> Resolution {
    let mut valid = true;
    for argument in request.arguments.keys() {
        if !entry_point
            .arguments
            .iter()
            .any(|definition| definition.name == argument.as_str())
        {
            errors.push((
                ExecutionError::UnknownArgument {
                    argument: argument.as_str().to_string(),
                    field: entry_point.name.to_string(),
                    type_name: graph.root().name.to_string(),
                },
                path.clone(),
            ));
            valid = false;
        }
    }
    if !valid {
        return Resolution::Null;
    }

    match entry_point.cardinality {
        Cardinality::Many => Resolution::All(entry_point.target),
        Cardinality::One => match request.arguments.get("id") {
            None | Some(Value::Null) => Resolution::Null,
            Some(value) => match value.as_i64() {
                Some(id) => Resolution::ById(entry_point.target, id),
                None => {
                    errors.push((
                        ExecutionError::InvalidArgument {
                            argument: "id".to_string(),
                            field: entry_point.name.to_string(),
                            expected: "an Int",
                            value: value.to_string(),
                        },
                        path.clone(),
                    ));
                    Resolution::Null
                }
            },
        },
    }
}

/// Checks the arguments of `__schema` and `__type(name:)`. Their selections
/// are checked while they resolve.
fn validate_introspection_root(
    graph: &TypeGraph,
    request: &Request,
    path: &Path,
    errors: &mut Vec<FieldError>,
) -> Option<Resolution> {
    let field = request.entry_point.as_str();
    let (field_type, accepted) = if field == introspection::SCHEMA_FIELD {
        ("__Schema!", None)
    } else {
        ("__Type", Some("name"))
    };

    if request.selection.is_empty() {
        errors.push((
            ExecutionError::SubselectionRequired {
                field: field.to_string(),
                field_type: field_type.to_string(),
            },
            path.clone(),
        ));
        return None;
    }

    let mut valid = true;
    for argument in request.arguments.keys() {
        if accepted != Some(argument.as_str()) {
            errors.push((
                ExecutionError::UnknownArgument {
                    argument: argument.as_str().to_string(),
                    field: field.to_string(),
                    type_name: graph.root().name.to_string(),
                },
                path.clone(),
            ));
            valid = false;
        }
    }
    if !valid {
        return Some(Resolution::Null);
    }

    if accepted.is_none() {
        return Some(Resolution::Introspection(IntrospectionRoot::Schema));
    }
    match request.arguments.get("name") {
        Some(Value::String(name)) => Some(Resolution::Introspection(IntrospectionRoot::Type(
            name.as_str().to_string(),
        ))),
        value => {
            errors.push((
                ExecutionError::InvalidArgument {
                    argument: "name".to_string(),
                    field: field.to_string(),
                    expected: "a String",
                    value: value
                        .map(|value| value.to_string())
                        .unwrap_or_else(|| "null".to_string()),
                },
                path.clone(),
            ));
            Some(Resolution::Null)
        }
    }
}

/// Keeps the selections `object_type` can answer, reporting the others.
fn validate_selection_set(
    graph: &TypeGraph,
    object_type: &ObjectType,
    selection_set: &[Selection],
    path: &Path,
    errors: &mut Vec<FieldError>,
) -> SelectionSet {
    let mut valid = SelectionSet::with_capacity(selection_set.len());
    for selection in selection_set {
        let path = path.join(selection.response_key());

        if selection.name == TYPENAME {
            if selection.selection_set.is_empty() {
                valid.push(Selection {
                    arguments: Default::default(),
                    ..selection.clone()
                });
            } else {
                errors.push((
                    ExecutionError::SubselectionNotAllowed {
                        field: selection.name.clone(),
                        field_type: TYPENAME_TYPE.to_string(),
                    },
                    path,
                ));
            }
            continue;
        }

        let Some(field) = object_type.field(&selection.name) else {
            errors.push((
                ExecutionError::UnknownField {
                    field: selection.name.clone(),
                    type_name: object_type.name.to_string(),
                },
                path,
            ));
            continue;
        };

        if let Some(argument) = selection.arguments.keys().next() {
            errors.push((
                ExecutionError::UnknownArgument {
                    argument: argument.as_str().to_string(),
                    field: selection.name.clone(),
                    type_name: object_type.name.to_string(),
                },
                path,
            ));
            continue;
        }

        match field.kind {
            FieldKind::Scalar(_) => {
                if selection.selection_set.is_empty() {
                    valid.push(selection.clone());
                } else {
                    errors.push((
                        ExecutionError::SubselectionNotAllowed {
                            field: selection.name.clone(),
                            field_type: graph.type_of(field),
                        },
                        path,
                    ));
                }
            }
            FieldKind::Relationship(relationship) => {
                if selection.selection_set.is_empty() {
                    errors.push((
                        ExecutionError::SubselectionRequired {
                            field: selection.name.clone(),
                            field_type: graph.type_of(field),
                        },
                        path,
                    ));
                    continue;
                }
                let Some(target) = graph.object_type(relationship.target) else {
                    tracing::error!(
                        field = field.name,
                        "relationship targets a kind without an object type"
                    );
                    continue;
                };
                let selection_set = validate_selection_set(
                    graph,
                    target,
                    &selection.selection_set,
                    &path,
                    errors,
                );
                valid.push(Selection {
                    selection_set,
                    ..selection.clone()
                });
            }
        }
    }
    valid
}
