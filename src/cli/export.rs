use std::path::Path;

use anyhow::{Context, Result};

use super::open_vault;
use crate::config::VaultConfig;

/// Export the whole vault as JSON to `output`, or to stdout.
pub fn export(config: &VaultConfig, output: Option<&Path>) -> Result<()> {
    let vault = open_vault(config)?;
    let data = vault.export()?;
    let json = serde_json::to_string_pretty(&data)?;

    match output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("failed to write export file: {}", path.display()))?,
        None => println!("{json}"),
    }

    eprintln!(
        "Exported {} entries, {} relationships and {} permissions.",
        data.entries.len(),
        data.relationships.len(),
        data.permissions.len()
    );
    Ok(())
}
