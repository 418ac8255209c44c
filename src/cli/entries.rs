//! CLI entry commands: `add`, `list`, `show`, `confirm`.

use anyhow::Result;
use std::collections::BTreeSet;

use super::{open_vault, preview};
use crate::config::VaultConfig;
use crate::vault::types::{Category, ContextEntry, EntryFilter, EntrySource};
use crate::vault::AddEntry;

pub fn add(
    config: &VaultConfig,
    content: &str,
    category: Option<Category>,
    tags: Vec<String>,
    confidence: Option<f64>,
) -> Result<()> {
    let vault = open_vault(config)?;
    let outcome = vault.add_entry(AddEntry {
        content: content.to_string(),
        category,
        tags: tags.into_iter().collect::<BTreeSet<_>>(),
        confidence,
    })?;

    if outcome.deduplicated {
        println!("Already stored as {}", outcome.entry.id);
        return Ok(());
    }

    println!("Added {} [{}]", outcome.entry.id, outcome.entry.category);
    for rel in &outcome.relationships {
        println!("  contradicts {}", rel.to_id);
    }
    if outcome.entry.superseded_by.is_some() {
        println!("  note: an existing entry outranks this one; it was stored as superseded");
    }
    Ok(())
}

pub fn list(
    config: &VaultConfig,
    category: Option<Category>,
    source: Option<EntrySource>,
    tag: Option<String>,
    include_superseded: bool,
    limit: usize,
) -> Result<()> {
    let vault = open_vault(config)?;
    let entries = vault.list_entries(&EntryFilter {
        category,
        source,
        tag,
        include_superseded,
        limit: Some(limit),
    })?;

    if entries.is_empty() {
        println!("No entries.");
        return Ok(());
    }
    for entry in &entries {
        print_row(entry);
    }
    println!("\n{} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
    Ok(())
}

fn print_row(entry: &ContextEntry) {
    let marker = if entry.is_active() { ' ' } else { '~' };
    println!(
        "{marker} {}  {:<12} {:<7} {:.2}  {}",
        entry.id,
        entry.category.as_str(),
        entry.source.as_str(),
        entry.confidence,
        preview(&entry.content, 80),
    );
}

/// Full details for a single entry.
pub fn show(config: &VaultConfig, id: &str) -> Result<()> {
    let vault = open_vault(config)?;
    let e = vault.get_entry(id)?;

    println!("Entry: {}", e.id);
    println!("{}", "=".repeat(50));
    println!("  Category:       {}", e.category);
    println!("  Source:         {}", e.source.as_str());
    println!("  Confidence:     {:.2}", e.confidence);
    println!("  Access count:   {}", e.access_count);
    if let Some(ref at) = e.last_accessed_at {
        println!("  Last accessed:  {}", at.to_rfc3339());
    }
    println!("  Created:        {}", e.created_at.to_rfc3339());
    println!("  Updated:        {}", e.updated_at.to_rfc3339());
    if !e.tags.is_empty() {
        let tags: Vec<&str> = e.tags.iter().map(String::as_str).collect();
        println!("  Tags:           {}", tags.join(", "));
    }
    if let Some(ref by) = e.superseded_by {
        println!("  Superseded by:  {by}");
    }
    println!();
    println!("Content:");
    println!("  {}", e.content);

    let relationships = vault.relationships_for(id)?;
    if !relationships.is_empty() {
        println!();
        println!("Relationships:");
        for rel in relationships {
            let other = if rel.from_id == e.id { &rel.to_id } else { &rel.from_id };
            println!("  --[{}]-- {other}", rel.kind.as_str());
        }
    }
    Ok(())
}

pub fn confirm(config: &VaultConfig, id: &str) -> Result<()> {
    let vault = open_vault(config)?;
    let entry = vault.confirm_entry(id)?;
    println!("Confirmed {} (confidence {:.2})", entry.id, entry.confidence);
    Ok(())
}
