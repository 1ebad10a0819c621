//! axum factory is useful to create an axum router serving the GraphQL service.

use std::future::Future;
use std::net::SocketAddr;

use axum::Extension;
use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::RawQuery;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use displaydoc::Display;
use http::HeaderMap;
use http::HeaderValue;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::configuration::Configuration;
use crate::graphql;
use crate::service::GraphService;

pub(crate) const HEALTH_CHECK_PATH: &str = "/health";

/// Error types for the HTTP server.
#[derive(Error, Debug, Display)]
#[non_exhaustive]
pub enum ServerError {
    /// failed to bind {addr}: {error}
    Bind {
        addr: SocketAddr,
        #[source]
        error: std::io::Error,
    },
    /// http server failed: {0}
    Serve(std::io::Error),
}

/// Static pages rendered once per router.
#[derive(Clone)]
struct Pages {
    sandbox: Option<String>,
    sdl: String,
}

/// Builds the axum [`Router`] for a configuration.
pub fn make_router(configuration: &Configuration, service: GraphService) -> Router {
    let path = configuration.server.path.as_str();
    let pages = Pages {
        sandbox: configuration
            .sandbox
            .enabled
            .then(|| sandbox_page_content(path)),
        sdl: service.graph().to_sdl(),
    };

    Router::new()
        .route(path, get(handle_get).post(handle_post))
        .route(&format!("{path}/schema"), get(handle_schema))
        .layer(TraceLayer::new_for_http())
        .route(HEALTH_CHECK_PATH, get(health_check))
        .layer(Extension(service))
        .layer(Extension(pages))
}

/// Binds the listen address of `configuration`.
pub async fn bind(configuration: &Configuration) -> Result<TcpListener, ServerError> {
    let addr = configuration.server.listen;
    TcpListener::bind(addr)
        .await
        .map_err(|error| ServerError::Bind { addr, error })
}

/// Serves `router` until `shutdown` completes, letting in-flight requests finish.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("GraphQL endpoint exposed at http://{addr}");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)
}

async fn handle_get(
    Extension(service): Extension<GraphService>,
    Extension(pages): Extension<Pages>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    if let Some(page) = pages.sandbox
        && headers
            .get_all(http::header::ACCEPT)
            .iter()
            .any(prefers_html)
    {
        return Html(page).into_response();
    }

    match graphql::Request::from_urlencoded_query(query.unwrap_or_default()) {
        Ok(request) => run_graphql_request(&service, request),
        Err(error) => invalid_graphql_request(format!("Invalid GraphQL request: {error}")),
    }
}

async fn handle_post(Extension(service): Extension<GraphService>, body: Bytes) -> Response {
    match serde_json::from_slice::<graphql::Request>(&body) {
        Ok(request) => run_graphql_request(&service, request),
        Err(error) => invalid_graphql_request(format!("Invalid GraphQL request: {error}")),
    }
}

async fn handle_schema(Extension(pages): Extension<Pages>) -> Response {
    (
        [(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))],
        pages.sdl,
    )
        .into_response()
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "UP" }))
}

fn run_graphql_request(service: &GraphService, request: graphql::Request) -> Response {
    let (parts, response) = service.execute(request).into_parts();
    (parts.status, Json(response)).into_response()
}

fn invalid_graphql_request(message: String) -> Response {
    tracing::debug!("{message}");
    let response = graphql::Response::from_errors(vec![
        graphql::Error::builder()
            .message(message)
            .extension_code("INVALID_GRAPHQL_REQUEST")
            .build(),
    ]);
    (StatusCode::BAD_REQUEST, Json(response)).into_response()
}

fn prefers_html(accept_header: &HeaderValue) -> bool {
    accept_header
        .to_str()
        .map(|accept_str| {
            accept_str
                .split(',')
                .map(|a| a.split(';').next().unwrap_or_default().trim())
                .any(|a| a == "text/html")
        })
        .unwrap_or_default()
}

fn sandbox_page_content(graphql_path: &str) -> String {
    const TEMPLATE: &str = include_str!("../../templates/graphiql_index.html");
    TEMPLATE
        .replace("{{LIBRARY_GRAPH_VERSION}}", std::env!("CARGO_PKG_VERSION"))
        .replace("{{GRAPHQL_PATH}}", graphql_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_detects_html_preference() {
        assert!(prefers_html(&HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
        )));
        assert!(prefers_html(&HeaderValue::from_static("text/html;q=0.9")));
        assert!(!prefers_html(&HeaderValue::from_static("application/json")));
        assert!(!prefers_html(&HeaderValue::from_static("*/*")));
    }

    #[test]
    fn sandbox_page_points_at_the_graphql_path() {
        let page = sandbox_page_content("/library");
        assert!(page.contains(r#"url: "/library""#));
        assert!(!page.contains("{{"));
    }
}
