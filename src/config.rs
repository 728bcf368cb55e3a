//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/mcp-adapters/config.toml` (XDG) or platform config dir
//! 2. Project config: `.mcp-adapters.toml`
//! 3. Environment variables: `MCP_ADAPTERS_*` (nested keys separated by `__`)
//!
//! # Intended Usage
//!
//! ```toml
//! [server]
//! require_auth = false
//!
//! [crm]
//! base_url = "https://api.attio.com"
//! default_object = "people"
//! search_limit = 10
//!
//! [graphql]
//! default_url = "https://countries.trevorblades.com/graphql"
//!
//! [analytics]
//! database = ":memory:"
//!
//! [neo4j]
//! uri = "bolt://localhost:7687"
//! username = "neo4j"
//! password = "password"
//! database = "neo4j"
//! ```
//!
//! Every section is optional; missing values fall back to the defaults below.
//! For example `MCP_ADAPTERS_NEO4J__PASSWORD=secret` overrides the Neo4j password.

use std::ops::Deref;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub crm: CrmConfig,
    pub graphql: GraphqlConfig,
    pub analytics: AnalyticsConfig,
    pub neo4j: Neo4jConfig,
}

/// HTTP transport settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Reject HTTP requests that carry no bearer token.
    pub require_auth: bool,
}

/// CRM REST API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CrmConfig {
    /// Base URL of the CRM API.
    pub base_url: String,
    /// API key used when the caller supplies no bearer token.
    pub api_key: Option<String>,
    /// Object type assumed by notes, tasks and comments when none is given.
    pub default_object: String,
    /// Upper bound for the `limit` of paginated search tools.
    pub search_limit: u32,
}

/// Global cap on search page sizes for the CRM adapter.
pub const GLOBAL_SEARCH_LIMIT: u32 = 10;

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.attio.com".to_string(),
            api_key: None,
            default_object: "people".to_string(),
            search_limit: GLOBAL_SEARCH_LIMIT,
        }
    }
}

/// GraphQL adapter settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GraphqlConfig {
    /// Endpoint used when a request carries no `X-GraphQL-URL` header.
    pub default_url: Option<String>,
}

/// DuckDB / MotherDuck settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Local database path, or `:memory:`. Used when no MotherDuck token is available.
    pub database: String,
    /// MotherDuck database name opened as `md:<name>`. Empty selects the default database.
    pub motherduck_database: String,
    /// MotherDuck token used when the caller supplies no bearer token.
    pub motherduck_token: Option<String>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            database: ":memory:".to_string(),
            motherduck_database: String::new(),
            motherduck_token: None,
        }
    }
}

/// Neo4j connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Neo4jConfig {
    /// Bolt URI, e.g. `bolt://localhost:7687`.
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: String,
    /// HTTP endpoint used for EXPLAIN plans. Derived from `uri` when absent.
    pub http_uri: Option<String>,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            username: "neo4j".to_string(),
            password: "password".to_string(),
            database: "neo4j".to_string(),
            http_uri: None,
        }
    }
}

impl Neo4jConfig {
    /// Returns the HTTP base URL, deriving `http://<host>:7474` from the Bolt URI if needed.
    pub fn http_base(&self) -> String {
        if let Some(uri) = &self.http_uri {
            return uri.trim_end_matches('/').to_string();
        }

        let host = self
            .uri
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.uri);
        let host = host.split(['/', ':']).next().unwrap_or("localhost");
        format!("http://{}:7474", host)
    }
}

impl Config {
    /// Load config with layered resolution (defaults → user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        let user_config = Self::user_config_path();

        Self::figment(user_config, ".mcp-adapters.toml")
            .extract()
            .map_err(ConfigError::from)
    }

    fn figment(user_config: std::path::PathBuf, project_config: &str) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(user_config))
            // Layer 2: Project config
            .merge(Toml::file(project_config))
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed("MCP_ADAPTERS_").split("__"))
    }

    /// User config path: ~/.config/mcp-adapters/config.toml (XDG) or platform config dir.
    fn user_config_path() -> std::path::PathBuf {
        // Prefer XDG config location (~/.config) on all platforms
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("mcp-adapters").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        // Fall back to platform-specific config dir
        dirs::config_dir()
            .map(|p| p.join("mcp-adapters").join("config.toml"))
            .unwrap_or_default()
    }
}
