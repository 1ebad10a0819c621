use super::FieldError;
use super::Selection;
use super::validation::Resolution;
use crate::introspection;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::Value;
use crate::schema::FieldDefinition;
use crate::schema::FieldKind;
use crate::schema::TYPENAME;
use crate::schema::Traversal;
use crate::schema::TypeGraph;
use crate::store::Record;
use crate::store::RecordStore;

/// The value of a resolved field, before its sub-selection is applied.
pub(crate) enum ResolvedValue<'a> {
    /// A scalar, or null when nothing was found.
    Leaf(Value),
    Object(Record<'a>),
    List(Vec<Record<'a>>),
}

impl<'a> ResolvedValue<'a> {
    pub(crate) fn null() -> Self {
        Self::Leaf(Value::Null)
    }

    pub(crate) fn opt_object(record: Option<Record<'a>>) -> Self {
        match record {
            Some(record) => Self::Object(record),
            None => Self::null(),
        }
    }
}

/// Resolves a validated root field to its value in `data`.
///
/// Record selections were checked by validation. Introspection selections are
/// checked while they resolve, and their errors are appended to `errors`.
pub(crate) fn execute_root(
    graph: &TypeGraph,
    store: &dyn RecordStore,
    resolution: &Resolution,
    selection_set: &[Selection],
    path: &Path,
    errors: &mut Vec<FieldError>,
) -> Value {
    let resolved = match resolution {
        Resolution::Introspection(root) => {
            return introspection::execute(graph, root, selection_set, path, errors);
        }
        Resolution::Typename(name) => ResolvedValue::Leaf((*name).into()),
        Resolution::All(kind) => ResolvedValue::List(store.list_all(*kind)),
        Resolution::ById(kind, id) => ResolvedValue::opt_object(store.get_by_id(*kind, *id)),
        Resolution::Null => ResolvedValue::null(),
    };
    complete_value(graph, store, resolved, selection_set)
}

/// Follows one field of `record` through the store.
pub(crate) fn resolve_field<'a>(
    store: &'a dyn RecordStore,
    record: Record<'a>,
    field: &FieldDefinition,
) -> ResolvedValue<'a> {
    match field.kind {
        FieldKind::Scalar(_) => match record.scalar(field.name) {
            Some(value) => ResolvedValue::Leaf(value),
            None => {
                tracing::warn!(
                    kind = %record.kind(),
                    id = record.id(),
                    field = field.name,
                    "record has no value for declared field"
                );
                ResolvedValue::null()
            }
        },
        FieldKind::Relationship(relationship) => match relationship.traversal {
            Traversal::ById { foreign_key } => {
                let target = record
                    .foreign_key(foreign_key)
                    .and_then(|id| store.get_by_id(relationship.target, id));
                if target.is_none() {
                    tracing::trace!(
                        kind = %record.kind(),
                        id = record.id(),
                        field = field.name,
                        "dangling reference resolved to null"
                    );
                }
                ResolvedValue::opt_object(target)
            }
            Traversal::ByForeignKey { foreign_key } => ResolvedValue::List(
                store.get_by_foreign_key(relationship.target, foreign_key, record.id()),
            ),
        },
    }
}

fn complete_value<'a>(
    graph: &TypeGraph,
    store: &'a dyn RecordStore,
    resolved: ResolvedValue<'a>,
    selection_set: &[Selection],
) -> Value {
    match resolved {
        ResolvedValue::Leaf(value) => value,
        ResolvedValue::Object(record) => {
            Value::Object(execute_selection_set(graph, store, record, selection_set))
        }
        ResolvedValue::List(records) => Value::Array(
            records
                .into_iter()
                .map(|record| {
                    Value::Object(execute_selection_set(graph, store, record, selection_set))
                })
                .collect(),
        ),
    }
}

/// Builds the result object for one record, in selection order.
fn execute_selection_set<'a>(
    graph: &TypeGraph,
    store: &'a dyn RecordStore,
    record: Record<'a>,
    selection_set: &[Selection],
) -> Object {
    let mut object = Object::new();
    let Some(object_type) = graph.object_type(record.kind()) else {
        return object;
    };

    for selection in selection_set {
        let value = if selection.name == TYPENAME {
            Value::from(object_type.name)
        } else {
            // validation already reported fields the type doesn't declare
            let Some(field) = object_type.field(&selection.name) else {
                continue;
            };
            let resolved = resolve_field(store, record, field);
            complete_value(graph, store, resolved, &selection.selection_set)
        };
        object.insert(selection.response_key(), value);
    }
    object
}
