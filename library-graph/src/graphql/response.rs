use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;

use crate::graphql::Error;
use crate::json_ext::Object;
use crate::json_ext::Value;

/// A GraphQL response.
///
/// `data` is absent when the request failed before execution started
/// (parse errors, unknown entry point). Both `data` and `errors` may be set at
/// the same time for a partially successful execution.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Response {
    /// The response data.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Value>,

    /// The optional graphql errors encountered.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<Error>,

    /// The optional graphql extensions.
    #[serde(skip_serializing_if = "Object::is_empty", default)]
    pub extensions: Object,
}

#[buildstructor::buildstructor]
impl Response {
    /// Constructor
    #[builder(visibility = "pub")]
    fn new(data: Option<Value>, errors: Vec<Error>, extensions: Map<ByteString, Value>) -> Self {
        Self {
            data,
            errors,
            extensions,
        }
    }

    /// A response carrying only request-level errors.
    pub fn from_errors(errors: Vec<Error>) -> Self {
        Self {
            data: None,
            errors,
            extensions: Object::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;
    use crate::json_ext::Path;

    #[test]
    fn partial_response_serializes_data_and_errors() {
        let response = Response::builder()
            .data(json!({ "book": { "name": "The Two Towers" } }))
            .error(
                Error::builder()
                    .message("Cannot query field \"publisher\" on type \"Book\".")
                    .path(Path::from("/book/publisher"))
                    .extension_code("UNKNOWN_FIELD")
                    .build(),
            )
            .build();

        assert_eq!(
            serde_json_bytes::to_value(&response).unwrap(),
            json!({
                "data": { "book": { "name": "The Two Towers" } },
                "errors": [{
                    "message": "Cannot query field \"publisher\" on type \"Book\".",
                    "path": ["book", "publisher"],
                    "extensions": { "code": "UNKNOWN_FIELD" }
                }]
            })
        );
    }

    #[test]
    fn null_data_is_kept_when_present() {
        let response = Response::builder().data(json!({ "book": null })).build();
        assert_eq!(
            serde_json_bytes::to_value(&response).unwrap(),
            json!({ "data": { "book": null } })
        );
    }

    #[test]
    fn response_deserializes_from_json() {
        let response: Response = serde_json_bytes::from_value(json!({
            "errors": [{ "message": "Unknown operation named \"nope\"" }]
        }))
        .unwrap();
        assert!(response.data.is_none());
        assert_eq!(response.errors.len(), 1);
    }
}
