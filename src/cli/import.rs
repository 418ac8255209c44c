use std::path::Path;

use anyhow::{Context, Result};

use super::open_vault;
use crate::config::VaultConfig;
use crate::vault::VaultExport;

/// Import a vault export. Entries keep their ids; ids already present are skipped.
pub fn import(config: &VaultConfig, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;
    let data: VaultExport = serde_json::from_str(&json).context("failed to parse import JSON")?;

    println!(
        "Importing {} entries and {} relationships...",
        data.entries.len(),
        data.relationships.len()
    );
    let vault = open_vault(config)?;
    let summary = vault.import(data)?;

    println!("Import complete:");
    println!("  Entries imported:       {}", summary.entries_imported);
    println!("  Entries skipped:        {} (already exist)", summary.entries_skipped);
    println!("  Relationships imported: {}", summary.relationships_imported);
    if summary.relationships_skipped > 0 {
        println!("  Relationships skipped:  {}", summary.relationships_skipped);
    }
    println!("  Permissions imported:   {}", summary.permissions_imported);
    Ok(())
}
