//! The type graph.
//!
//! Entity types, their scalar fields and the relationship fields that cross
//! between record collections are declared here as data. The resolution engine
//! interprets these declarations and never hard-codes which kind relates to
//! which.

mod root;

use std::fmt;
use std::fmt::Write;

use indexmap::IndexMap;
pub use root::ArgumentDefinition;
pub use root::EntryPoint;
pub use root::RootQuery;

use crate::store::EntityKind;

/// Name of the meta field every object type answers with its own type name.
pub(crate) const TYPENAME: &str = "__typename";

/// Built-in scalar types used by the graph.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScalarType {
    Int,
    String,
}

impl ScalarType {
    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Int => "Int",
            ScalarType::String => "String",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Cardinality {
    /// Exactly one target record, or null when it cannot be found.
    One,
    /// Zero or more target records.
    Many,
}

/// How a relationship field reaches its target records in the store.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Traversal {
    /// `get_by_id(target, parent.<foreign_key>)`
    ById { foreign_key: &'static str },
    /// `get_by_foreign_key(target, foreign_key, parent.id)`
    ByForeignKey { foreign_key: &'static str },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Relationship {
    pub target: EntityKind,
    pub cardinality: Cardinality,
    pub traversal: Traversal,
}

impl Relationship {
    /// A to-one relationship following `foreign_key` on the parent record.
    pub fn one(target: EntityKind, foreign_key: &'static str) -> Self {
        Self {
            target,
            cardinality: Cardinality::One,
            traversal: Traversal::ById { foreign_key },
        }
    }

    /// A to-many relationship collecting the target records whose
    /// `foreign_key` points back at the parent.
    pub fn many(target: EntityKind, foreign_key: &'static str) -> Self {
        Self {
            target,
            cardinality: Cardinality::Many,
            traversal: Traversal::ByForeignKey { foreign_key },
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarType),
    Relationship(Relationship),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldDefinition {
    pub name: &'static str,
    pub description: Option<&'static str>,
    pub kind: FieldKind,
    pub non_null: bool,
}

impl FieldDefinition {
    /// A non-null scalar field.
    pub fn scalar(name: &'static str, ty: ScalarType) -> Self {
        Self {
            name,
            description: None,
            kind: FieldKind::Scalar(ty),
            non_null: true,
        }
    }

    pub fn relationship(name: &'static str, relationship: Relationship) -> Self {
        Self {
            name,
            description: None,
            kind: FieldKind::Relationship(relationship),
            non_null: false,
        }
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, FieldKind::Scalar(_))
    }
}

/// The shape of one entity kind.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ObjectType {
    pub kind: EntityKind,
    pub name: &'static str,
    pub description: Option<&'static str>,
    fields: IndexMap<&'static str, FieldDefinition>,
}

impl ObjectType {
    pub fn new(kind: EntityKind, name: &'static str) -> Self {
        Self {
            kind,
            name,
            description: None,
            fields: IndexMap::new(),
        }
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.insert(field.name, field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.values()
    }
}

/// All object types of the graph plus its root query surface.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TypeGraph {
    types: IndexMap<EntityKind, ObjectType>,
    root: RootQuery,
}

impl TypeGraph {
    pub fn new(types: impl IntoIterator<Item = ObjectType>, root: RootQuery) -> Self {
        Self {
            types: types.into_iter().map(|ty| (ty.kind, ty)).collect(),
            root,
        }
    }

    /// The authors, books and quotations graph.
    pub fn library() -> Self {
        let author = ObjectType::new(EntityKind::Author, "Author")
            .with_description("This is an author of books")
            .with_field(FieldDefinition::scalar("id", ScalarType::Int))
            .with_field(FieldDefinition::scalar("name", ScalarType::String))
            .with_field(
                FieldDefinition::scalar("birth", ScalarType::Int).with_description("Birth year"),
            )
            .with_field(FieldDefinition::relationship(
                "books",
                Relationship::many(EntityKind::Book, "authorId"),
            ))
            .with_field(FieldDefinition::relationship(
                "quotations",
                Relationship::many(EntityKind::Quotation, "authorId"),
            ));

        let book = ObjectType::new(EntityKind::Book, "Book")
            .with_description("This represent a book written by an author")
            .with_field(FieldDefinition::scalar("id", ScalarType::Int))
            .with_field(FieldDefinition::scalar("name", ScalarType::String))
            .with_field(FieldDefinition::scalar("authorId", ScalarType::Int))
            .with_field(FieldDefinition::relationship(
                "author",
                Relationship::one(EntityKind::Author, "authorId"),
            ));

        let quote = ObjectType::new(EntityKind::Quotation, "Quote")
            .with_description("This is some quotes")
            .with_field(FieldDefinition::scalar("id", ScalarType::Int))
            .with_field(FieldDefinition::scalar("text", ScalarType::String))
            .with_field(FieldDefinition::scalar("authorId", ScalarType::Int))
            .with_field(FieldDefinition::relationship(
                "author",
                Relationship::one(EntityKind::Author, "authorId"),
            ));

        Self::new([book, author, quote], RootQuery::library())
    }

    pub fn object_type(&self, kind: EntityKind) -> Option<&ObjectType> {
        self.types.get(&kind)
    }

    pub fn object_type_by_name(&self, name: &str) -> Option<&ObjectType> {
        self.types.values().find(|object_type| object_type.name == name)
    }

    /// Object types in declaration order.
    pub fn object_types(&self) -> impl Iterator<Item = &ObjectType> {
        self.types.values()
    }

    pub fn root(&self) -> &RootQuery {
        &self.root
    }

    /// Renders the graph as GraphQL SDL.
    pub fn to_sdl(&self) -> String {
        self.to_string()
    }

    fn write_sdl(&self, out: &mut impl Write) -> fmt::Result {
        write_description(out, self.root.description, "")?;
        writeln!(out, "type {} {{", self.root.name)?;
        for entry_point in self.root.entry_points() {
            write_description(out, Some(entry_point.description), "  ")?;
            write!(out, "  {}", entry_point.name)?;
            if !entry_point.arguments.is_empty() {
                let arguments = entry_point
                    .arguments
                    .iter()
                    .map(|argument| format!("{}: {}", argument.name, argument.ty))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(out, "({arguments})")?;
            }
            writeln!(
                out,
                ": {}",
                self.type_reference(entry_point.target, entry_point.cardinality, false)
            )?;
        }
        writeln!(out, "}}")?;

        for object_type in self.object_types() {
            writeln!(out)?;
            write_description(out, object_type.description, "")?;
            writeln!(out, "type {} {{", object_type.name)?;
            for field in object_type.fields() {
                write_description(out, field.description, "  ")?;
                writeln!(out, "  {}: {}", field.name, self.type_of(field))?;
            }
            writeln!(out, "}}")?;
        }
        Ok(())
    }

    /// The GraphQL type of a field, as written in SDL.
    pub fn type_of(&self, field: &FieldDefinition) -> String {
        match field.kind {
            FieldKind::Scalar(scalar) => {
                let bang = if field.non_null { "!" } else { "" };
                format!("{scalar}{bang}")
            }
            FieldKind::Relationship(relationship) => self.type_reference(
                relationship.target,
                relationship.cardinality,
                field.non_null,
            ),
        }
    }

    fn type_reference(&self, target: EntityKind, cardinality: Cardinality, non_null: bool) -> String {
        let name = self
            .object_type(target)
            .map(|ty| ty.name)
            .unwrap_or("Unknown");
        let bang = if non_null { "!" } else { "" };
        match cardinality {
            Cardinality::One => format!("{name}{bang}"),
            Cardinality::Many => format!("[{name}]{bang}"),
        }
    }
}

impl fmt::Display for TypeGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_sdl(f)
    }
}

fn write_description(out: &mut impl Write, description: Option<&str>, indent: &str) -> fmt::Result {
    if let Some(description) = description {
        writeln!(out, "{indent}\"{description}\"")?;
    }
    Ok(())
}
