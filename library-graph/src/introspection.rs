//! Schema introspection.
//!
//! `__schema` and `__type(name:)` are answered from the [`TypeGraph`], so
//! tools such as GraphiQL can load the schema, its documentation and
//! completions. The `types` list holds the graph's own types and the scalars
//! it uses; the introspection types themselves are not listed.

use crate::execution::ExecutionError;
use crate::execution::FieldError;
use crate::execution::Selection;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::Value;
use crate::schema::Cardinality;
use crate::schema::FieldDefinition;
use crate::schema::FieldKind;
use crate::schema::ObjectType;
use crate::schema::RootQuery;
use crate::schema::TYPENAME;
use crate::schema::TypeGraph;
use crate::store::EntityKind;

pub(crate) const SCHEMA_FIELD: &str = "__schema";
pub(crate) const TYPE_FIELD: &str = "__type";

const INCLUDE_DEPRECATED: &str = "includeDeprecated";

/// A validated introspection root field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum IntrospectionRoot {
    Schema,
    Type(String),
}

pub(crate) fn is_root_field(name: &str) -> bool {
    name == SCHEMA_FIELD || name == TYPE_FIELD
}

/// Fields of each introspection type, with their GraphQL types.
const META_FIELDS: &[(&str, &[(&str, &str)])] = &[
    (
        "__Schema",
        &[
            ("description", "String"),
            ("types", "[__Type!]!"),
            ("queryType", "__Type!"),
            ("mutationType", "__Type"),
            ("subscriptionType", "__Type"),
            ("directives", "[__Directive!]!"),
        ],
    ),
    (
        "__Type",
        &[
            ("kind", "__TypeKind!"),
            ("name", "String"),
            ("description", "String"),
            ("specifiedByURL", "String"),
            ("fields", "[__Field!]"),
            ("interfaces", "[__Type!]"),
            ("possibleTypes", "[__Type!]"),
            ("enumValues", "[__EnumValue!]"),
            ("inputFields", "[__InputValue!]"),
            ("ofType", "__Type"),
            ("isOneOf", "Boolean"),
        ],
    ),
    (
        "__Field",
        &[
            ("name", "String!"),
            ("description", "String"),
            ("args", "[__InputValue!]!"),
            ("type", "__Type!"),
            ("isDeprecated", "Boolean!"),
            ("deprecationReason", "String"),
        ],
    ),
    (
        "__InputValue",
        &[
            ("name", "String!"),
            ("description", "String"),
            ("type", "__Type!"),
            ("defaultValue", "String"),
            ("isDeprecated", "Boolean!"),
            ("deprecationReason", "String"),
        ],
    ),
    (
        "__Directive",
        &[
            ("name", "String!"),
            ("description", "String"),
            ("isRepeatable", "Boolean!"),
            ("locations", "[__DirectiveLocation!]!"),
            ("args", "[__InputValue!]!"),
        ],
    ),
];

/// Fields accepting `includeDeprecated`. Nothing in the graph is deprecated.
const DEPRECATION_LISTS: [&str; 4] = ["fields", "args", "enumValues", "inputFields"];

static SCALARS: [(&str, &str); 3] = [
    (
        "Int",
        "The `Int` scalar type represents non-fractional signed whole numeric values. Int can represent values between -(2^31) and 2^31 - 1.",
    ),
    (
        "String",
        "The `String` scalar type represents textual data, represented as UTF-8 character sequences. The String type is most often used by GraphQL to represent free-form human-readable text.",
    ),
    (
        "Boolean",
        "The `Boolean` scalar type represents `true` or `false`.",
    ),
];

struct DirectiveDefinition {
    name: &'static str,
    description: &'static str,
    condition: &'static str,
}

static DIRECTIVES: [DirectiveDefinition; 2] = [
    DirectiveDefinition {
        name: "include",
        description: "Directs the executor to include this field or fragment only when the `if` argument is true.",
        condition: "Included when true.",
    },
    DirectiveDefinition {
        name: "skip",
        description: "Directs the executor to skip this field or fragment when the `if` argument is true.",
        condition: "Skipped when true.",
    },
];

const DIRECTIVE_LOCATIONS: [&str; 3] = ["FIELD", "FRAGMENT_SPREAD", "INLINE_FRAGMENT"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Wrapper {
    NonNull,
    List,
}

/// A type reference, wrappers outermost first.
#[derive(Clone, Debug, PartialEq, Eq)]
struct TypeRef {
    name: &'static str,
    wrappers: Vec<Wrapper>,
}

impl TypeRef {
    fn named(name: &'static str) -> Self {
        Self {
            name,
            wrappers: Vec::new(),
        }
    }

    fn wrap(mut self, wrapper: Wrapper) -> Self {
        self.wrappers.insert(0, wrapper);
        self
    }

    fn entry_point(graph: &TypeGraph, target: EntityKind, cardinality: Cardinality) -> Self {
        let named = Self::named(
            graph
                .object_type(target)
                .map(|object_type| object_type.name)
                .unwrap_or("Unknown"),
        );
        match cardinality {
            Cardinality::One => named,
            Cardinality::Many => named.wrap(Wrapper::List),
        }
    }

    fn field(graph: &TypeGraph, field: &FieldDefinition) -> Self {
        let ty = match field.kind {
            FieldKind::Scalar(scalar) => Self::named(scalar.name()),
            FieldKind::Relationship(relationship) => {
                Self::entry_point(graph, relationship.target, relationship.cardinality)
            }
        };
        if field.non_null {
            ty.wrap(Wrapper::NonNull)
        } else {
            ty
        }
    }
}

enum NamedType<'a> {
    Query(&'a RootQuery),
    Object(&'a ObjectType),
    Scalar(&'static str, &'static str),
}

impl<'a> NamedType<'a> {
    fn lookup(graph: &'a TypeGraph, name: &str) -> Option<Self> {
        if name == graph.root().name {
            return Some(NamedType::Query(graph.root()));
        }
        if let Some(object_type) = graph.object_type_by_name(name) {
            return Some(NamedType::Object(object_type));
        }
        SCALARS
            .iter()
            .find(|(scalar, _)| *scalar == name)
            .map(|&(name, description)| NamedType::Scalar(name, description))
    }

    fn all(graph: &'a TypeGraph) -> impl Iterator<Item = Self> {
        std::iter::once(NamedType::Query(graph.root()))
            .chain(graph.object_types().map(NamedType::Object))
            .chain(
                SCALARS
                    .iter()
                    .map(|&(name, description)| NamedType::Scalar(name, description)),
            )
    }

    fn name(&self) -> &'static str {
        match self {
            NamedType::Query(root) => root.name,
            NamedType::Object(object_type) => object_type.name,
            NamedType::Scalar(name, _) => name,
        }
    }
}

#[derive(Clone, Debug)]
struct MetaInputValue {
    name: &'static str,
    description: Option<&'static str>,
    ty: TypeRef,
}

#[derive(Clone, Debug)]
struct MetaField {
    name: &'static str,
    description: Option<&'static str>,
    args: Vec<MetaInputValue>,
    ty: TypeRef,
}

/// An object of one of the introspection types.
enum Meta {
    Schema,
    Type(TypeRef),
    Field(MetaField),
    InputValue(MetaInputValue),
    Directive(&'static DirectiveDefinition),
}

enum Resolved {
    Leaf(Value),
    Object(Meta),
    List(Vec<Meta>),
}

impl Resolved {
    fn nullable(value: Option<&str>) -> Self {
        Resolved::Leaf(value.map(Value::from).unwrap_or(Value::Null))
    }
}

impl Meta {
    fn type_name(&self) -> &'static str {
        match self {
            Meta::Schema => "__Schema",
            Meta::Type(_) => "__Type",
            Meta::Field(_) => "__Field",
            Meta::InputValue(_) => "__InputValue",
            Meta::Directive(_) => "__Directive",
        }
    }

    /// GraphQL type of `field` on this introspection type.
    fn field_type(&self, field: &str) -> Option<&'static str> {
        META_FIELDS
            .iter()
            .find(|(type_name, _)| *type_name == self.type_name())
            .and_then(|(_, fields)| fields.iter().find(|(name, _)| *name == field))
            .map(|(_, ty)| *ty)
    }

    /// Value of `field`, which [`Meta::field_type`] declares.
    fn resolve(&self, graph: &TypeGraph, field: &str) -> Resolved {
        match self {
            Meta::Schema => match field {
                "types" => Resolved::List(
                    NamedType::all(graph)
                        .map(|named| Meta::Type(TypeRef::named(named.name())))
                        .collect(),
                ),
                "queryType" => Resolved::Object(Meta::Type(TypeRef::named(graph.root().name))),
                "directives" => Resolved::List(DIRECTIVES.iter().map(Meta::Directive).collect()),
                _ => Resolved::Leaf(Value::Null),
            },
            Meta::Type(ty) => match ty.wrappers.split_first() {
                Some((wrapper, inner)) => match field {
                    "kind" => Resolved::Leaf(
                        match wrapper {
                            Wrapper::NonNull => "NON_NULL",
                            Wrapper::List => "LIST",
                        }
                        .into(),
                    ),
                    "ofType" => Resolved::Object(Meta::Type(TypeRef {
                        name: ty.name,
                        wrappers: inner.to_vec(),
                    })),
                    _ => Resolved::Leaf(Value::Null),
                },
                None => resolve_named_type(graph, ty.name, field),
            },
            Meta::Field(meta_field) => match field {
                "name" => Resolved::Leaf(meta_field.name.into()),
                "description" => Resolved::nullable(meta_field.description),
                "args" => Resolved::List(
                    meta_field
                        .args
                        .iter()
                        .cloned()
                        .map(Meta::InputValue)
                        .collect(),
                ),
                "type" => Resolved::Object(Meta::Type(meta_field.ty.clone())),
                "isDeprecated" => Resolved::Leaf(Value::Bool(false)),
                _ => Resolved::Leaf(Value::Null),
            },
            Meta::InputValue(input_value) => match field {
                "name" => Resolved::Leaf(input_value.name.into()),
                "description" => Resolved::nullable(input_value.description),
                "type" => Resolved::Object(Meta::Type(input_value.ty.clone())),
                "isDeprecated" => Resolved::Leaf(Value::Bool(false)),
                _ => Resolved::Leaf(Value::Null),
            },
            Meta::Directive(directive) => match field {
                "name" => Resolved::Leaf(directive.name.into()),
                "description" => Resolved::Leaf(directive.description.into()),
                "isRepeatable" => Resolved::Leaf(Value::Bool(false)),
                "locations" => Resolved::Leaf(Value::Array(
                    DIRECTIVE_LOCATIONS.iter().map(|&location| location.into()).collect(),
                )),
                "args" => Resolved::List(vec![Meta::InputValue(MetaInputValue {
                    name: "if",
                    description: Some(directive.condition),
                    ty: TypeRef::named("Boolean").wrap(Wrapper::NonNull),
                })]),
                _ => Resolved::Leaf(Value::Null),
            },
        }
    }
}

fn resolve_named_type(graph: &TypeGraph, name: &'static str, field: &str) -> Resolved {
    let named = NamedType::lookup(graph, name);
    match (field, named) {
        ("name", _) => Resolved::Leaf(name.into()),
        ("kind", Some(NamedType::Query(_) | NamedType::Object(_))) => {
            Resolved::Leaf("OBJECT".into())
        }
        ("kind", Some(NamedType::Scalar(..))) => Resolved::Leaf("SCALAR".into()),
        ("description", Some(NamedType::Query(root))) => Resolved::nullable(root.description),
        ("description", Some(NamedType::Object(object_type))) => {
            Resolved::nullable(object_type.description)
        }
        ("description", Some(NamedType::Scalar(_, description))) => {
            Resolved::Leaf(description.into())
        }
        ("fields", Some(NamedType::Query(root))) => Resolved::List(
            root.entry_points()
                .map(|entry_point| {
                    Meta::Field(MetaField {
                        name: entry_point.name,
                        description: Some(entry_point.description),
                        args: entry_point
                            .arguments
                            .iter()
                            .map(|argument| MetaInputValue {
                                name: argument.name,
                                description: None,
                                ty: TypeRef::named(argument.ty.name()),
                            })
                            .collect(),
                        ty: TypeRef::entry_point(graph, entry_point.target, entry_point.cardinality),
                    })
                })
                .collect(),
        ),
        ("fields", Some(NamedType::Object(object_type))) => Resolved::List(
            object_type
                .fields()
                .map(|field| {
                    Meta::Field(MetaField {
                        name: field.name,
                        description: field.description,
                        args: Vec::new(),
                        ty: TypeRef::field(graph, field),
                    })
                })
                .collect(),
        ),
        ("interfaces", Some(NamedType::Query(_) | NamedType::Object(_))) => {
            Resolved::List(Vec::new())
        }
        _ => Resolved::Leaf(Value::Null),
    }
}

/// Resolves an introspection root field against `graph`.
///
/// Field errors are appended to `errors` once per path.
pub(crate) fn execute(
    graph: &TypeGraph,
    root: &IntrospectionRoot,
    selection_set: &[Selection],
    path: &Path,
    errors: &mut Vec<FieldError>,
) -> Value {
    let meta = match root {
        IntrospectionRoot::Schema => Meta::Schema,
        IntrospectionRoot::Type(name) => match NamedType::lookup(graph, name) {
            Some(named) => Meta::Type(TypeRef::named(named.name())),
            None => return Value::Null,
        },
    };
    Value::Object(execute_selection_set(graph, &meta, selection_set, path, errors))
}

fn execute_selection_set(
    graph: &TypeGraph,
    meta: &Meta,
    selection_set: &[Selection],
    path: &Path,
    errors: &mut Vec<FieldError>,
) -> Object {
    let mut object = Object::new();
    for selection in selection_set {
        let path = path.join(selection.response_key());
        let type_name = meta.type_name();

        if selection.name == TYPENAME {
            object.insert(selection.response_key(), type_name.into());
            continue;
        }

        let Some(field_type) = meta.field_type(&selection.name) else {
            report(
                errors,
                ExecutionError::UnknownField {
                    field: selection.name.clone(),
                    type_name: type_name.to_string(),
                },
                path,
            );
            continue;
        };

        if let Some(argument) = selection.arguments.keys().find(|argument| {
            argument.as_str() != INCLUDE_DEPRECATED
                || !DEPRECATION_LISTS.contains(&selection.name.as_str())
        }) {
            report(
                errors,
                ExecutionError::UnknownArgument {
                    argument: argument.as_str().to_string(),
                    field: selection.name.clone(),
                    type_name: type_name.to_string(),
                },
                path,
            );
            continue;
        }

        match (is_leaf_type(field_type), selection.selection_set.is_empty()) {
            (true, false) => {
                report(
                    errors,
                    ExecutionError::SubselectionNotAllowed {
                        field: selection.name.clone(),
                        field_type: field_type.to_string(),
                    },
                    path,
                );
                continue;
            }
            (false, true) => {
                report(
                    errors,
                    ExecutionError::SubselectionRequired {
                        field: selection.name.clone(),
                        field_type: field_type.to_string(),
                    },
                    path,
                );
                continue;
            }
            _ => {}
        }

        let value = match meta.resolve(graph, &selection.name) {
            Resolved::Leaf(value) => value,
            Resolved::Object(child) => Value::Object(execute_selection_set(
                graph,
                &child,
                &selection.selection_set,
                &path,
                errors,
            )),
            Resolved::List(children) => Value::Array(
                children
                    .iter()
                    .map(|child| {
                        Value::Object(execute_selection_set(
                            graph,
                            child,
                            &selection.selection_set,
                            &path,
                            errors,
                        ))
                    })
                    .collect(),
            ),
        };
        object.insert(selection.response_key(), value);
    }
    object
}

/// Scalars and enums take no sub-selection.
fn is_leaf_type(ty: &str) -> bool {
    let named = ty.trim_matches(|c| c == '[' || c == ']' || c == '!');
    !named.starts_with("__") || named == "__TypeKind" || named == "__DirectiveLocation"
}

fn report(errors: &mut Vec<FieldError>, error: ExecutionError, path: Path) {
    let error = (error, path);
    if !errors.contains(&error) {
        errors.push(error);
    }
}
