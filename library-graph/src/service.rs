//! The GraphQL service: parse, validate, execute.

use std::sync::Arc;
use std::task::Poll;

use futures::future::Ready;
use futures::future::ready;
use http::StatusCode;
use tower::BoxError;
use tower::Service;

use crate::execution;
use crate::graphql;
use crate::graphql::ErrorExtension;
use crate::schema::TypeGraph;
use crate::spec::Query;
use crate::store::RecordStore;

/// Answers GraphQL requests over a shared, read-only record store.
///
/// Cloning is cheap and clones share the store and type graph.
#[derive(Clone)]
pub struct GraphService {
    graph: Arc<TypeGraph>,
    store: Arc<dyn RecordStore>,
}

impl GraphService {
    pub fn new(graph: Arc<TypeGraph>, store: Arc<dyn RecordStore>) -> Self {
        Self { graph, store }
    }

    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    /// Runs one request to completion.
    ///
    /// Requests that cannot be executed at all are answered with
    /// `400 Bad Request` and no `data`.
    pub fn execute(&self, request: graphql::Request) -> http::Response<graphql::Response> {
        let span = tracing::info_span!(
            "graphql_request",
            operation_name = request.operation_name.as_deref().unwrap_or_default()
        );
        let _guard = span.enter();

        let Some(query) = request.query.as_deref() else {
            tracing::debug!("request without query");
            return bad_request(vec![
                graphql::Error::builder()
                    .message("Must provide query string.")
                    .extension_code("MISSING_QUERY_STRING")
                    .build(),
            ]);
        };

        let requests = match Query::parse(query).and_then(|query| {
            query.to_requests(
                request.operation_name.as_deref(),
                &request.variables,
                &self.graph,
            )
        }) {
            Ok(requests) => requests,
            Err(error) => {
                tracing::debug!(%error, "invalid query");
                return bad_request(vec![error.to_graphql_error(None)]);
            }
        };

        let response = execution::execute(&self.graph, self.store.as_ref(), &requests);
        let status = if response.data.is_some() {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        };
        if !response.errors.is_empty() {
            tracing::debug!(errors = response.errors.len(), "request completed with errors");
        }
        http_response(status, response)
    }
}

impl Service<graphql::Request> for GraphService {
    type Response = http::Response<graphql::Response>;
    type Error = BoxError;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: graphql::Request) -> Self::Future {
        ready(Ok(self.execute(request)))
    }
}

fn bad_request(errors: Vec<graphql::Error>) -> http::Response<graphql::Response> {
    http_response(
        StatusCode::BAD_REQUEST,
        graphql::Response::from_errors(errors),
    )
}

fn http_response(
    status: StatusCode,
    response: graphql::Response,
) -> http::Response<graphql::Response> {
    let mut http_response = http::Response::new(response);
    *http_response.status_mut() = status;
    http_response
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::store::Seed;

    fn service() -> GraphService {
        GraphService::new(
            Arc::new(TypeGraph::library()),
            Arc::new(Seed::builtin().into_store()),
        )
    }

    async fn call(request: graphql::Request) -> (StatusCode, serde_json::Value) {
        let response = service().oneshot(request).await.unwrap();
        let status = response.status();
        (
            status,
            serde_json::to_value(response.into_body()).unwrap(),
        )
    }

    #[tokio::test]
    async fn it_executes_queries() {
        let (status, body) = call(
            graphql::Request::builder()
                .query("query BookById($id: Int) { book(id: $id) { name author { name } } }")
                .variable("id", 1)
                .build(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
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

    #[tokio::test]
    async fn field_errors_are_partial_successes() {
        let (status, body) = call(
            graphql::Request::builder()
                .query("{ book(id: 2) { name publisher } }")
                .build(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"],
            json!({ "book": { "name": "Harry Potter and the Prisoner of Azkaban" } })
        );
        assert_eq!(body["errors"][0]["path"], json!(["book", "publisher"]));
    }

    #[tokio::test]
    async fn request_level_failures_are_bad_requests() {
        let (status, body) = call(graphql::Request::builder().build()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "errors": [{
                    "message": "Must provide query string.",
                    "extensions": { "code": "MISSING_QUERY_STRING" }
                }]
            })
        );

        let (status, body) = call(
            graphql::Request::builder()
                .query("{ book(id: 1) { name }")
                .build(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["extensions"]["code"], json!("PARSING_ERROR"));
        assert!(body.get("data").is_none());

        let (status, body) = call(
            graphql::Request::builder()
                .query("{ allPublishers { name } }")
                .build(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["errors"][0]["extensions"]["code"],
            json!("UNKNOWN_ENTRY_POINT")
        );
    }

    #[tokio::test]
    async fn mutations_are_rejected() {
        let (status, body) = call(
            graphql::Request::builder()
                .query("mutation { addBook(name: \"Dune\") { id } }")
                .build(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["errors"][0]["message"],
            json!("mutation operation is not supported")
        );
    }
}
