//! Version command implementation.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::{SyncConfig, config_path};
use crate::error::Result;

#[derive(Serialize)]
struct VersionOutput<'a> {
    version: &'a str,
    build: &'a str,
    api_base_url: &'a str,
    config_file: Option<PathBuf>,
}

/// Print the version plus the API endpoint and config file in effect.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(config: &SyncConfig, json: bool) -> Result<()> {
    let output = VersionOutput {
        version: env!("CARGO_PKG_VERSION"),
        build: if cfg!(debug_assertions) { "dev" } else { "release" },
        api_base_url: &config.api_base_url,
        config_file: config_path().filter(|p| p.is_file()),
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("cms-sync {} ({})", output.version, output.build);
    println!("  API:    {}", output.api_base_url);
    match &output.config_file {
        Some(path) => println!("  Config: {}", path.display()),
        None => println!("  Config: defaults (no config file)"),
    }
    Ok(())
}
