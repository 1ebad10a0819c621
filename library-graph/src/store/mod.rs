//! Read-only record storage.
//!
//! The store holds the three record collections the graph is built over and
//! answers the three lookups the resolution engine needs. Nothing in this
//! module mutates records after construction.

mod seed;

use std::fmt;

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
pub use seed::Seed;
pub use seed::StoreError;

use crate::json_ext::Value;

/// Identifier type shared by every entity kind.
pub type Id = i64;

/// A person who wrote books and said memorable things.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Author {
    pub id: Id,
    pub name: String,
    /// Birth year.
    pub birth: i64,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Book {
    pub id: Id,
    /// Title of the book.
    pub name: String,
    pub author_id: Id,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Quotation {
    pub id: Id,
    pub text: String,
    pub author_id: Id,
}

/// The kinds of records held by a [`RecordStore`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EntityKind {
    Author,
    Book,
    Quotation,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Author => f.write_str("author"),
            EntityKind::Book => f.write_str("book"),
            EntityKind::Quotation => f.write_str("quotation"),
        }
    }
}

/// A borrowed view over one record of any kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Record<'a> {
    Author(&'a Author),
    Book(&'a Book),
    Quotation(&'a Quotation),
}

impl<'a> Record<'a> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Author(_) => EntityKind::Author,
            Record::Book(_) => EntityKind::Book,
            Record::Quotation(_) => EntityKind::Quotation,
        }
    }

    pub fn id(&self) -> Id {
        match self {
            Record::Author(author) => author.id,
            Record::Book(book) => book.id,
            Record::Quotation(quotation) => quotation.id,
        }
    }

    /// The raw value of a stored scalar, by its GraphQL field name.
    ///
    /// Returns `None` when the record kind has no such stored value.
    pub fn scalar(&self, field: &str) -> Option<Value> {
        match (self, field) {
            (_, "id") => Some(self.id().into()),
            (Record::Author(author), "name") => Some(author.name.as_str().into()),
            (Record::Author(author), "birth") => Some(author.birth.into()),
            (Record::Book(book), "name") => Some(book.name.as_str().into()),
            (Record::Book(book), "authorId") => Some(book.author_id.into()),
            (Record::Quotation(quotation), "text") => Some(quotation.text.as_str().into()),
            (Record::Quotation(quotation), "authorId") => Some(quotation.author_id.into()),
            _ => None,
        }
    }

    /// The value of a foreign key field, by its GraphQL field name.
    pub fn foreign_key(&self, field: &str) -> Option<Id> {
        match (self, field) {
            (Record::Book(book), "authorId") => Some(book.author_id),
            (Record::Quotation(quotation), "authorId") => Some(quotation.author_id),
            _ => None,
        }
    }
}

/// The lookup capability the resolution engine consumes.
///
/// Implementations are read-only: every method borrows the store immutably, so
/// any number of requests may resolve against one store concurrently.
pub trait RecordStore: Send + Sync {
    /// All records of `kind`, in seed order.
    fn list_all(&self, kind: EntityKind) -> Vec<Record<'_>>;

    /// The first record of `kind` whose identifier is `id`.
    fn get_by_id(&self, kind: EntityKind, id: Id) -> Option<Record<'_>>;

    /// The records of `kind` whose `foreign_key` field equals `parent_id`, in
    /// seed order. No match is an empty list, not an error.
    fn get_by_foreign_key(
        &self,
        kind: EntityKind,
        foreign_key: &str,
        parent_id: Id,
    ) -> Vec<Record<'_>>;
}

/// A [`RecordStore`] over three in-memory vectors.
///
/// Every lookup is a linear scan (O(n) in the size of the collection). The
/// data set is small and static; an indexed store can implement
/// [`RecordStore`] without touching the engine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InMemoryStore {
    authors: Vec<Author>,
    books: Vec<Book>,
    quotations: Vec<Quotation>,
}

impl InMemoryStore {
    pub fn new(authors: Vec<Author>, books: Vec<Book>, quotations: Vec<Quotation>) -> Self {
        Self {
            authors,
            books,
            quotations,
        }
    }

    fn records(&self, kind: EntityKind) -> Box<dyn Iterator<Item = Record<'_>> + '_> {
        match kind {
            EntityKind::Author => Box::new(self.authors.iter().map(Record::Author)),
            EntityKind::Book => Box::new(self.books.iter().map(Record::Book)),
            EntityKind::Quotation => Box::new(self.quotations.iter().map(Record::Quotation)),
        }
    }
}

impl RecordStore for InMemoryStore {
    fn list_all(&self, kind: EntityKind) -> Vec<Record<'_>> {
        self.records(kind).collect()
    }

    fn get_by_id(&self, kind: EntityKind, id: Id) -> Option<Record<'_>> {
        self.records(kind).find(|record| record.id() == id)
    }

    fn get_by_foreign_key(
        &self,
        kind: EntityKind,
        foreign_key: &str,
        parent_id: Id,
    ) -> Vec<Record<'_>> {
        self.records(kind)
            .filter(|record| record.foreign_key(foreign_key) == Some(parent_id))
            .collect()
    }
}
