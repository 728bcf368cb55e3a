//! Offline tool listing export.

use std::path::Path;

use color_eyre::Result;

use crate::config::Config;
use crate::mcp::{Adapter, AdapterRuntime};

use super::App;

impl App {
    /// Write the discovery document of an adapter to a file or stdout.
    ///
    /// Nothing is connected; only the catalog is built.
    pub fn run_export(&self, adapter: Adapter, output: Option<&Path>) -> Result<()> {
        let runtime = AdapterRuntime::new(adapter, &Config::default())?;
        let json = serde_json::to_string_pretty(&runtime.discovery())?;

        match output {
            Some(path) => {
                std::fs::write(path, json + "\n")?;
                tracing::info!(%adapter, path = %path.display(), "Exported tool listing");
            }
            None => println!("{}", json),
        }
        Ok(())
    }
}
