use std::net::SocketAddr;

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_graphql_path() -> String {
    String::from("/graphql")
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Server {
    /// The socket address and port to listen on.
    /// Defaults to 127.0.0.1:5000
    pub listen: SocketAddr,

    /// The HTTP path on which GraphQL requests will be served.
    /// default: "/graphql"
    pub path: String,
}

#[buildstructor::buildstructor]
impl Server {
    #[builder]
    pub fn new(listen: Option<SocketAddr>, path: Option<String>) -> Self {
        Self {
            listen: listen.unwrap_or_else(default_listen),
            path: path.unwrap_or_else(default_graphql_path),
        }
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Configuration for the GraphiQL page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Sandbox {
    /// Serve GraphiQL to browsers that GET the GraphQL path. Defaults to true.
    pub enabled: bool,
}

#[buildstructor::buildstructor]
impl Sandbox {
    #[builder]
    pub fn new(enabled: Option<bool>) -> Self {
        Self {
            enabled: enabled.unwrap_or(true),
        }
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn it_builds_default_server_configuration() {
        let server = Server::builder().build();
        assert_eq!(server.listen, "127.0.0.1:5000".parse().unwrap());
        assert_eq!(server.path, "/graphql");
    }

    #[test]
    fn it_json_parses_partial_server_configuration() {
        let server: Server = serde_json::from_value(json!({ "listen": "0.0.0.0:4000" })).unwrap();
        assert_eq!(server.listen, "0.0.0.0:4000".parse().unwrap());
        assert_eq!(server.path, "/graphql");
    }

    #[test]
    fn it_rejects_unknown_server_fields() {
        let result = serde_json::from_value::<Server>(json!({ "port": 4000 }));
        assert!(result.is_err());
    }

    #[test]
    fn sandbox_is_enabled_by_default() {
        assert!(Sandbox::default().enabled);
        let sandbox: Sandbox = serde_json::from_value(json!({ "enabled": false })).unwrap();
        assert!(!sandbox.enabled);
    }
}
