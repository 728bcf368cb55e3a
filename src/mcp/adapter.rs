//! Adapter selection and per-process runtime.
//!
//! An [`AdapterRuntime`] owns the tool registry of one adapter together with
//! the external resources its handlers share, so the transports can tear
//! them down on exit.

use std::sync::Arc;

use clap::ValueEnum;
use serde::Serialize;

use crate::config::Config;
use crate::context::GRAPHQL_URL_HEADER;
use crate::error::AppError;
use crate::graph::Neo4jClient;
use crate::mcp::tools;
use crate::services::{AnalyticsConnector, CrmClient, GraphqlClient};
use crate::tools::{ToolListing, ToolRegistry};

/// The external service an MCP server instance fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Adapter {
    /// CRM REST API.
    Crm,
    /// Any GraphQL endpoint.
    Graphql,
    /// DuckDB / MotherDuck.
    Analytics,
    /// Neo4j.
    Graph,
}

/// A request header an adapter reads, as advertised in the discovery listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderRequirement {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

/// Discovery document: the catalog of one adapter plus the headers it reads.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDiscovery {
    pub adapter: Adapter,
    pub tools: Vec<ToolListing>,
    pub headers: Vec<HeaderRequirement>,
}

impl Adapter {
    pub fn name(self) -> &'static str {
        match self {
            Self::Crm => "crm",
            Self::Graphql => "graphql",
            Self::Analytics => "analytics",
            Self::Graph => "graph",
        }
    }

    /// Server instructions shown to MCP clients.
    pub fn instructions(self) -> &'static str {
        match self {
            Self::Crm => {
                "CRM adapter. Start with describe_workspace to see objects, lists and members. \
                 Search tools require a limit between 1 and 10. Authenticate with \
                 `Authorization: Bearer <api key>`."
            }
            Self::Graphql => {
                "GraphQL adapter. Send the target endpoint in the `X-GraphQL-URL` header. \
                 Use introspect_schema and describe_type before writing queries; \
                 mutations go through mutate_graphql."
            }
            Self::Analytics => {
                "Analytics adapter over DuckDB. A bearer token is used as the MotherDuck \
                 token. Use list_tables and describe_table before writing SQL."
            }
            Self::Graph => {
                "Graph adapter over Neo4j. Call get_schema first. read_cypher refuses \
                 queries that modify the graph; use write_cypher for those."
            }
        }
    }

    /// Headers the adapter reads from each request.
    pub fn headers(self) -> Vec<HeaderRequirement> {
        let authorization = |description| HeaderRequirement {
            name: "Authorization",
            description,
            required: false,
        };

        match self {
            Self::Crm => vec![authorization(
                "Bearer CRM API key; falls back to crm.api_key",
            )],
            Self::Graphql => vec![
                HeaderRequirement {
                    name: GRAPHQL_URL_HEADER,
                    description: "GraphQL endpoint URL; falls back to graphql.default_url",
                    required: true,
                },
                authorization("Bearer token forwarded to the GraphQL endpoint"),
            ],
            Self::Analytics => vec![authorization(
                "Bearer MotherDuck token; falls back to analytics.motherduck_token",
            )],
            Self::Graph => Vec::new(),
        }
    }
}

impl std::fmt::Display for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// External resources owned by a runtime that need explicit teardown.
enum Resource {
    None,
    Analytics(Arc<AnalyticsConnector>),
    Graph(Arc<Neo4jClient>),
}

/// Registry plus shared resources for one adapter.
pub struct AdapterRuntime {
    adapter: Adapter,
    registry: ToolRegistry,
    resource: Resource,
}

impl AdapterRuntime {
    /// Builds the registry and clients for `adapter` from configuration.
    ///
    /// No network connection is opened here; drivers connect on first use.
    pub fn new(adapter: Adapter, config: &Config) -> Result<Self, AppError> {
        let (registry, resource) = match adapter {
            Adapter::Crm => {
                let crm = Arc::new(CrmClient::new(&config.crm)?);
                (tools::crm::registry(crm)?, Resource::None)
            }
            Adapter::Graphql => {
                let client = Arc::new(GraphqlClient::new(&config.graphql));
                (tools::graphql::registry(client)?, Resource::None)
            }
            Adapter::Analytics => {
                let analytics = Arc::new(AnalyticsConnector::new(&config.analytics));
                (
                    tools::analytics::registry(analytics.clone())?,
                    Resource::Analytics(analytics),
                )
            }
            Adapter::Graph => {
                let neo4j = Arc::new(Neo4jClient::new(&config.neo4j));
                (
                    tools::graph::registry(neo4j.clone())?,
                    Resource::Graph(neo4j),
                )
            }
        };

        for (name, description) in registry.catalog().manifest() {
            tracing::debug!(adapter = %adapter, tool = %name, %description, "Registered tool");
        }
        tracing::info!(
            adapter = %adapter,
            tools = registry.catalog().iter().count(),
            "Tool registry ready"
        );

        Ok(Self {
            adapter,
            registry,
            resource,
        })
    }

    pub fn adapter(&self) -> Adapter {
        self.adapter
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// The discovery / export document for this adapter.
    pub fn discovery(&self) -> ToolDiscovery {
        ToolDiscovery {
            adapter: self.adapter,
            tools: self
                .registry
                .catalog()
                .iter()
                .map(|d| d.to_listing())
                .collect(),
            headers: self.adapter.headers(),
        }
    }

    /// Releases memoized connections.
    pub async fn shutdown(&self) {
        match &self.resource {
            Resource::None => {}
            Resource::Analytics(analytics) => analytics.shutdown(),
            Resource::Graph(neo4j) => neo4j.shutdown().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_adapter_builds_from_defaults() {
        let config = Config::default();
        let expected = [
            (Adapter::Crm, 25),
            (Adapter::Graphql, 4),
            (Adapter::Analytics, 5),
            (Adapter::Graph, 4),
        ];

        for (adapter, count) in expected {
            let runtime = AdapterRuntime::new(adapter, &config).unwrap();
            assert_eq!(runtime.registry().catalog().iter().count(), count, "{}", adapter);
        }
    }

    #[test]
    fn test_discovery_lists_required_headers() {
        let runtime = AdapterRuntime::new(Adapter::Graphql, &Config::default()).unwrap();
        let discovery = serde_json::to_value(runtime.discovery()).unwrap();

        assert_eq!(discovery["adapter"], "graphql");
        assert_eq!(discovery["tools"].as_array().unwrap().len(), 4);
        assert_eq!(discovery["headers"][0]["name"], "x-graphql-url");
        assert_eq!(discovery["headers"][0]["required"], true);
        assert!(discovery["tools"][0]["inputSchema"].is_object());
    }

    #[test]
    fn test_adapter_value_names() {
        assert_eq!(
            Adapter::from_str("analytics", true).unwrap(),
            Adapter::Analytics
        );
        assert_eq!(Adapter::Graph.to_string(), "graph");
    }
}
