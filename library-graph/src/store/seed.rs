use std::collections::HashSet;
use std::path::Path;

use displaydoc::Display;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use super::Author;
use super::Book;
use super::Id;
use super::InMemoryStore;
use super::Quotation;

/// Error types for loading seed data.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// could not read seed file '{path}': {error}
    ReadSeed {
        path: String,
        #[source]
        error: std::io::Error,
    },
    /// could not parse seed file '{path}': {error}
    ParseSeed {
        path: String,
        #[source]
        error: serde_yaml::Error,
    },
}

/// The records a store is populated with at startup.
///
/// Seed files are YAML documents; JSON seed files work too as YAML is a superset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Seed {
    pub authors: Vec<Author>,
    pub books: Vec<Book>,
    pub quotations: Vec<Quotation>,
}

impl Seed {
    /// The data set the service ships with.
    pub fn builtin() -> Self {
        let authors = vec![
            author(1, "J. K. Rowling", 1965),
            author(2, "J. R. R. Tolkien", 1892),
            author(3, "Brent Weeks", 1977),
        ];
        let books = vec![
            book(1, "Harry Potter and the Chamber of Secrets", 1),
            book(2, "Harry Potter and the Prisoner of Azkaban", 1),
            book(3, "Harry Potter and the Goblet of Fire", 1),
            book(4, "The Fellowship of the Ring", 2),
            book(5, "The Two Towers", 2),
            book(6, "The Return of the King", 2),
            book(7, "The Way of Shadows", 3),
            book(8, "Beyond the Shadows", 3),
        ];
        let quotations = vec![
            quotation(
                1,
                "If you want to know what a man's like, take a good look at how he treats his inferiors, not his equals.",
                1,
            ),
            quotation(
                2,
                "It is our choices, Harry, that show what we truly are, far more than our abilities.",
                1,
            ),
            quotation(3, "It does not do to dwell on dreams and forget to live", 1),
            quotation(
                4,
                "If more of us valued food and cheer and song above hoarded gold, it would be a merrier world.",
                2,
            ),
            quotation(
                5,
                "Faithless is he that says farewell when the road darkens.",
                2,
            ),
            quotation(
                6,
                "Moments of beauty sustain us through hours of ugliness",
                3,
            ),
            quotation(
                7,
                "Delusional people tend to believe in what they're doing",
                3,
            ),
        ];

        Self {
            authors,
            books,
            quotations,
        }
    }

    /// Loads a seed from a YAML (or JSON) file.
    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|error| StoreError::ReadSeed {
            path: path.display().to_string(),
            error,
        })?;
        serde_yaml::from_str(&content).map_err(|error| StoreError::ParseSeed {
            path: path.display().to_string(),
            error,
        })
    }

    /// Reports data issues the engine tolerates at query time.
    ///
    /// Dangling author references resolve to `null`, duplicate identifiers
    /// resolve to the first record; both are kept and only logged.
    pub fn check(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let author_ids: HashSet<Id> = self.authors.iter().map(|author| author.id).collect();
        duplicates("author", self.authors.iter().map(|a| a.id), &mut warnings);
        duplicates("book", self.books.iter().map(|b| b.id), &mut warnings);
        duplicates(
            "quotation",
            self.quotations.iter().map(|q| q.id),
            &mut warnings,
        );

        for book in &self.books {
            if !author_ids.contains(&book.author_id) {
                warnings.push(format!(
                    "book {} references unknown author {}",
                    book.id, book.author_id
                ));
            }
        }
        for quotation in &self.quotations {
            if !author_ids.contains(&quotation.author_id) {
                warnings.push(format!(
                    "quotation {} references unknown author {}",
                    quotation.id, quotation.author_id
                ));
            }
        }

        warnings
    }

    /// Freezes the seed into a read-only store.
    pub fn into_store(self) -> InMemoryStore {
        for warning in self.check() {
            tracing::warn!("seed data: {warning}");
        }
        tracing::debug!(
            authors = self.authors.len(),
            books = self.books.len(),
            quotations = self.quotations.len(),
            "record store seeded"
        );
        InMemoryStore::new(self.authors, self.books, self.quotations)
    }
}

fn duplicates(kind: &str, ids: impl Iterator<Item = Id>, warnings: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            warnings.push(format!(
                "duplicate {kind} id {id}, lookups return the first one"
            ));
        }
    }
}

fn author(id: Id, name: &str, birth: i64) -> Author {
    Author {
        id,
        name: name.to_string(),
        birth,
    }
}

fn book(id: Id, name: &str, author_id: Id) -> Book {
    Book {
        id,
        name: name.to_string(),
        author_id,
    }
}

fn quotation(id: Id, text: &str, author_id: Id) -> Quotation {
    Quotation {
        id,
        text: text.to_string(),
        author_id,
    }
}
