use std::path::Path;

use routebook_base::http::HttpServerConfig;
use routebook_base::{ErrorKind, ResultExt, RoutebookError, RoutebookResult, err};
use serde::Deserialize;
use tracing::{debug, instrument};

/// Settings for serving a routebook service, read from `routebook.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on. The OS picks one when absent.
    pub port: Option<u16>,
    /// Value of the `Server` response header.
    pub server_name: String,
    /// Root path of the served service.
    pub root: String,
}

impl Default for ServeConfig {
    fn default() -> Self {
        let server = HttpServerConfig::default();
        Self {
            host: server.host,
            port: server.port,
            server_name: server.server_name,
            root: "/".to_string(),
        }
    }
}

impl ServeConfig {
    pub fn server_config(&self) -> HttpServerConfig {
        HttpServerConfig {
            host: self.host.clone(),
            port: self.port,
            server_name: self.server_name.clone(),
        }
    }
}

/// Parses a [`ServeConfig`] from TOML text. Missing keys keep their defaults.
pub fn parse_config(text: &str) -> RoutebookResult<ServeConfig> {
    toml::from_str(text).map_err(|e| err!("Invalid configuration: {}", e))
}

/// Loads a [`ServeConfig`] from `path`, or the defaults if the file does not exist.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_config(path: impl AsRef<Path>) -> RoutebookResult<ServeConfig> {
    let path = path.as_ref();
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No configuration file, using defaults");
            return Ok(ServeConfig::default());
        }
        Err(source) => {
            return Err(Box::new(RoutebookError::new(ErrorKind::FileError {
                path: path.to_path_buf(),
                source,
            })));
        }
    };
    parse_config(&text).with_context(|| format!("Failed to load {}", path.display()))
}
