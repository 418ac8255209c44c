use anyhow::Result;

use super::open_vault;
use crate::config::VaultConfig;

/// Display vault statistics in the terminal.
pub fn stats(config: &VaultConfig) -> Result<()> {
    let vault = open_vault(config)?;
    let s = vault.stats()?;

    println!("Vault Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total entries:       {}", s.total_entries);
    println!("  Active:              {}", s.active_entries);
    println!("  Superseded:          {}", s.superseded_entries);
    println!();

    println!("By Category (active):");
    for (category, count) in &s.by_category {
        println!("  {category:<14} {count}");
    }
    println!();

    println!("By Source (active):");
    for (source, count) in &s.by_source {
        println!("  {source:<14} {count}");
    }
    println!();

    println!("Relationships:         {}", s.relationships);
    println!("  Contradictions:      {}", s.contradictions);
    println!("Audit log entries:     {}", s.audit_log_entries);
    println!("Database size:         {} bytes", s.db_size_bytes);

    if let Some(ref oldest) = s.oldest_entry {
        println!("Oldest entry:          {oldest}");
    }
    if let Some(ref newest) = s.newest_entry {
        println!("Newest entry:          {newest}");
    }
    Ok(())
}
