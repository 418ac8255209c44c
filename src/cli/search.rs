use anyhow::Result;

use super::{open_vault, preview};
use crate::config::VaultConfig;

/// Similarity search from the terminal. Does not count as an access.
pub fn search(config: &VaultConfig, query: &str, limit: usize) -> Result<()> {
    let vault = open_vault(config)?;
    let hits = vault.search_entries(query, limit)?;

    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        println!(
            "  {}. [{}] {} (confidence: {:.2}, similarity: {:.4})",
            i + 1,
            hit.entry.category,
            hit.entry.id,
            hit.entry.confidence,
            hit.similarity,
        );
        println!("     {}", preview(&hit.entry.content, 120));
        println!();
    }
    Ok(())
}
