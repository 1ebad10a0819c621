//! GraphQL document handling.
//!
//! Turns the text of a client request into the selection trees the resolution
//! engine works on.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

mod query;
mod selection;

use displaydoc::Display;
pub use query::Query;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::graphql::ErrorExtension;
use crate::json_ext::Object;

/// Maximum nesting the parser accepts before giving up on a document.
pub(crate) const PARSER_RECURSION_LIMIT: usize = 500;

/// Maximum number of fields an operation may select once fragments are
/// expanded and fields merged.
pub(crate) const MAX_FIELDS: usize = 2_000;

/// GraphQL parsing errors.
#[derive(Error, Debug, Display, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SpecError {
    /// parsing error: {0}
    ParsingError(String),
    /// Unknown operation named "{0}"
    UnknownOperation(String),
    /// Must provide operation name if query contains multiple operations.
    MissingOperationName,
    /// Must provide an operation.
    NoOperation,
    /// Unknown fragment "{0}".
    UnknownFragment(String),
    /// Cannot spread fragment "{0}" within itself.
    FragmentCycle(String),
    /// Fields "{0}" conflict because they have differing names or arguments.
    FieldConflict(String),
    /// Maximum field count limit ({0}) exceeded in this operation
    MaxFieldsLimit(usize),
    /// mutation operation is not supported
    MutationNotSupported,
    /// subscription operation is not supported
    SubscriptionNotSupported,
}

impl ErrorExtension for SpecError {
    fn extension_code(&self) -> String {
        match self {
            SpecError::ParsingError(_) => "PARSING_ERROR",
            SpecError::UnknownOperation(_)
            | SpecError::MissingOperationName
            | SpecError::NoOperation
            | SpecError::UnknownFragment(_)
            | SpecError::FragmentCycle(_)
            | SpecError::FieldConflict(_) => "GRAPHQL_VALIDATION_FAILED",
            SpecError::MaxFieldsLimit(_) => "MAX_FIELDS_LIMIT",
            SpecError::MutationNotSupported => "MUTATION_NOT_SUPPORTED",
            SpecError::SubscriptionNotSupported => "SUBSCRIPTION_NOT_SUPPORTED",
        }
        .to_string()
    }

    fn custom_extension_details(&self) -> Option<Object> {
        let mut obj = Object::new();
        match self {
            SpecError::UnknownOperation(name) => {
                obj.insert("operationName", name.clone().into());
            }
            SpecError::UnknownFragment(name) | SpecError::FragmentCycle(name) => {
                obj.insert("fragment", name.clone().into());
            }
            _ => (),
        }

        (!obj.is_empty()).then_some(obj)
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn spec_errors_carry_codes() {
        let error = SpecError::UnknownOperation("nope".to_string()).to_graphql_error(None);
        assert_eq!(error.message, "Unknown operation named \"nope\"");
        assert_eq!(
            serde_json_bytes::to_value(&error.extensions).unwrap(),
            json!({ "operationName": "nope", "code": "GRAPHQL_VALIDATION_FAILED" })
        );

        let error = SpecError::MutationNotSupported.to_graphql_error(None);
        assert_eq!(error.extension_code().as_deref(), Some("MUTATION_NOT_SUPPORTED"));
    }
}
