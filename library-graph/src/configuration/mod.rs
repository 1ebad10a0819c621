//! Logic for loading configuration in to an object model

mod server;

use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use displaydoc::Display;
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use schemars::schema::RootSchema;
use serde::Deserialize;
use serde::Serialize;
pub use server::Sandbox;
pub use server::Server;
use thiserror::Error;

use crate::store;
use crate::store::StoreError;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not read configuration file '{path}': {error}
    ReadConfig {
        path: String,
        #[source]
        error: std::io::Error,
    },
    /// could not deserialize configuration: {0}
    DeserializeConfigError(serde_yaml::Error),
    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
}

/// The configuration of the service.
///
/// Can be created through `serde::Deserialize` from YAML or JSON, or inline in
/// Rust code with [`Configuration::builder`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Configuration options pertaining to the http server component.
    #[serde(default)]
    pub server: Server,

    /// GraphiQL configuration.
    #[serde(default)]
    pub sandbox: Sandbox,

    /// Where the record store is seeded from.
    #[serde(default)]
    pub seed: SeedSource,
}

/// Seed data location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct SeedSource {
    /// Path to a YAML or JSON seed file. The built-in library is used when unset.
    pub path: Option<PathBuf>,
}

impl SeedSource {
    /// Reads the configured seed, or the built-in one.
    pub fn load(&self) -> Result<store::Seed, StoreError> {
        match &self.path {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading seed file");
                store::Seed::from_path(path)
            }
            None => Ok(store::Seed::builtin()),
        }
    }
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder]
    pub fn new(
        server: Option<Server>,
        sandbox: Option<Sandbox>,
        seed_path: Option<PathBuf>,
    ) -> Result<Self, ConfigurationError> {
        Self {
            server: server.unwrap_or_default(),
            sandbox: sandbox.unwrap_or_default(),
            seed: SeedSource { path: seed_path },
        }
        .validate()
    }

    /// Reads and validates a YAML configuration file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigurationError> {
        let content =
            std::fs::read_to_string(path).map_err(|error| ConfigurationError::ReadConfig {
                path: path.display().to_string(),
                error,
            })?;
        content.parse()
    }

    pub(crate) fn validate(self) -> Result<Self, ConfigurationError> {
        let path = &self.server.path;
        if !path.starts_with('/') {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid 'server.path' configuration",
                error: format!("'{path}' is invalid, it must be an absolute path and start with '/'"),
            });
        }
        if path == "/" || path.ends_with('/') || path.contains(['*', ':', '{', '}']) {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid 'server.path' configuration",
                error: format!("'{path}' is invalid, it must name a single static route"),
            });
        }
        if path == crate::axum_factory::HEALTH_CHECK_PATH {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid 'server.path' configuration",
                error: format!("'{path}' is reserved for the health check"),
            });
        }
        Ok(self)
    }
}

impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let configuration: Configuration =
            serde_yaml::from_str(s).map_err(ConfigurationError::DeserializeConfigError)?;
        configuration.validate()
    }
}

/// The JSON schema of the configuration file.
pub fn generate_config_schema() -> RootSchema {
    let settings = SchemaSettings::draft07().with(|s| {
        s.option_nullable = true;
        s.option_add_null_type = false;
        s.inline_subschemas = true;
    });

    let generator = settings.into_generator();
    generator.into_root_schema_for::<Configuration>()
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::SocketAddr;

    use super::*;

    #[test]
    fn empty_configuration_uses_defaults() {
        let configuration: Configuration = "{}".parse().unwrap();
        assert_eq!(configuration, Configuration::default());
        assert_eq!(configuration.server.path, "/graphql");
        assert!(configuration.sandbox.enabled);
        assert!(configuration.seed.path.is_none());
    }

    #[test]
    fn full_configuration() {
        let configuration: Configuration = r#"
server:
  listen: 0.0.0.0:8080
  path: /library
sandbox:
  enabled: false
seed:
  path: ./seed.yaml
"#
        .parse()
        .unwrap();
        assert_eq!(
            configuration,
            Configuration::builder()
                .server(
                    Server::builder()
                        .listen("0.0.0.0:8080".parse::<SocketAddr>().unwrap())
                        .path("/library")
                        .build()
                )
                .sandbox(Sandbox::builder().enabled(false).build())
                .seed_path("./seed.yaml")
                .build()
                .unwrap()
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = "supergraph:\n  listen: 127.0.0.1:4000\n"
            .parse::<Configuration>()
            .unwrap_err();
        assert!(matches!(error, ConfigurationError::DeserializeConfigError(_)));
    }

    #[test]
    fn invalid_paths_are_rejected() {
        for path in [
            "graphql",
            "/",
            "/graphql/",
            "/:name",
            "/*rest",
            "/gra{phql",
            "/{name}",
            "/graphql}",
            "/health",
        ] {
            let result = Configuration::builder()
                .server(Server::builder().path(path).build())
                .build();
            assert!(
                matches!(result, Err(ConfigurationError::InvalidConfiguration { .. })),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn reads_configuration_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  path: /books").unwrap();
        let configuration = Configuration::from_path(file.path()).unwrap();
        assert_eq!(configuration.server.path, "/books");

        let error = Configuration::from_path(Path::new("/nonexistent/library-graph.yaml"))
            .unwrap_err();
        assert!(matches!(error, ConfigurationError::ReadConfig { .. }));
    }

    #[test]
    fn seed_source_loads_builtin_by_default() {
        let seed = SeedSource::default().load().unwrap();
        assert_eq!(seed, store::Seed::builtin());
    }

    #[test]
    fn schema_lists_top_level_sections() {
        let schema = serde_json::to_value(generate_config_schema()).unwrap();
        let properties = schema["properties"].as_object().unwrap();
        assert!(properties.contains_key("server"));
        assert!(properties.contains_key("sandbox"));
        assert!(properties.contains_key("seed"));
        assert_eq!(schema["additionalProperties"], serde_json::json!(false));
    }
}
