//! Clients for the external services behind each adapter.
//!
//! - [`CrmClient`] - CRM REST API
//! - [`GraphqlClient`] - user-supplied GraphQL endpoints
//! - [`AnalyticsConnector`] - memoized DuckDB / MotherDuck connection

pub mod analytics;
pub mod crm;
pub mod graphql;

pub use analytics::AnalyticsConnector;
pub use crm::CrmClient;
pub use graphql::GraphqlClient;
