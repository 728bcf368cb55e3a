//! CLI module for mcp-adapters.
//!
//! Subcommands:
//! - `mcp`: Run one adapter as an MCP server (stdio transport)
//! - `serve`: Run one adapter as an MCP server (HTTP transports)
//! - `export-tools`: Write an adapter's tool listing as JSON

mod export;
mod mcp;
mod serve;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::mcp::{Adapter, AdapterRuntime};

pub use serve::router;

/// MCP servers for a CRM API, GraphQL endpoints, DuckDB and Neo4j
#[derive(Parser)]
#[command(name = "mcp-adapters")]
#[command(about = "MCP servers exposing external services as tools")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the MCP server (stdio transport for local use)
    Mcp {
        /// Adapter to serve
        #[arg(long, value_enum)]
        adapter: Adapter,
    },

    /// Run the MCP server (HTTP transport for remote access)
    Serve {
        /// Adapter to serve
        #[arg(long, value_enum)]
        adapter: Adapter,

        /// Host address to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(long, default_value = "3000")]
        port: u16,
    },

    /// Export the tool listing of an adapter as JSON
    ExportTools {
        /// Adapter whose tools to export
        #[arg(long, value_enum)]
        adapter: Adapter,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> color_eyre::Result<()> {
        match self.command {
            Command::Mcp { adapter } => self.run_mcp(adapter).await,
            Command::Serve {
                adapter,
                ref host,
                port,
            } => self.run_serve(adapter, host, port).await,
            Command::ExportTools {
                adapter,
                ref output,
            } => self.run_export(adapter, output.as_deref()),
        }
    }
}

/// Loads configuration and builds the runtime for `adapter`.
fn runtime(adapter: Adapter) -> color_eyre::Result<(Config, Arc<AdapterRuntime>)> {
    let config = Config::load()?;
    let runtime = AdapterRuntime::new(adapter, &config)?;
    Ok((config, Arc::new(runtime)))
}
