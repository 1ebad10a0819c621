use indexmap::IndexMap;

use super::Cardinality;
use super::ScalarType;
use crate::store::EntityKind;

/// An argument accepted by an entry point.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArgumentDefinition {
    pub name: &'static str,
    pub ty: ScalarType,
}

/// A root field of the `Query` type.
///
/// A `Many` entry point lists every record of its target kind. A `One` entry
/// point looks a single record up by its `id` argument.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntryPoint {
    pub name: &'static str,
    pub description: &'static str,
    pub target: EntityKind,
    pub cardinality: Cardinality,
    pub arguments: Vec<ArgumentDefinition>,
}

impl EntryPoint {
    pub fn list(name: &'static str, description: &'static str, target: EntityKind) -> Self {
        Self {
            name,
            description,
            target,
            cardinality: Cardinality::Many,
            arguments: Vec::new(),
        }
    }

    pub fn by_id(name: &'static str, description: &'static str, target: EntityKind) -> Self {
        Self {
            name,
            description,
            target,
            cardinality: Cardinality::One,
            arguments: vec![ArgumentDefinition {
                name: "id",
                ty: ScalarType::Int,
            }],
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RootQuery {
    pub name: &'static str,
    pub description: Option<&'static str>,
    entry_points: IndexMap<&'static str, EntryPoint>,
}

impl RootQuery {
    pub fn new(entry_points: impl IntoIterator<Item = EntryPoint>) -> Self {
        Self {
            name: "Query",
            description: Some("Root Query"),
            entry_points: entry_points
                .into_iter()
                .map(|entry_point| (entry_point.name, entry_point))
                .collect(),
        }
    }

    pub(crate) fn library() -> Self {
        Self::new([
            EntryPoint::list("allBooks", "List of All Books", EntityKind::Book),
            EntryPoint::by_id("book", "A single book", EntityKind::Book),
            EntryPoint::list("allAuthors", "List of All Authors", EntityKind::Author),
            EntryPoint::by_id("author", "A single author", EntityKind::Author),
            EntryPoint::list("allQuotes", "Some random quotations", EntityKind::Quotation),
            EntryPoint::by_id("quote", "A single quote", EntityKind::Quotation),
        ])
    }

    pub fn entry_point(&self, name: &str) -> Option<&EntryPoint> {
        self.entry_points.get(name)
    }

    pub fn entry_points(&self) -> impl Iterator<Item = &EntryPoint> {
        self.entry_points.values()
    }
}
