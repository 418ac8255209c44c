//! CLI `permit` and `permissions` commands.

use anyhow::{bail, Result};

use super::open_vault;
use crate::config::VaultConfig;
use crate::vault::types::{Category, CategoryScope};

/// Scope from the `permit` flags. Exactly one form must be given.
pub fn scope_from_flags(all: bool, none: bool, categories: Vec<Category>) -> Result<CategoryScope> {
    match (all, none, categories.is_empty()) {
        (true, false, true) => Ok(CategoryScope::AllowAll),
        (false, true, true) => Ok(CategoryScope::DenyAll),
        (false, false, false) => Ok(CategoryScope::Categories(categories.into_iter().collect())),
        (false, false, true) => bail!("give one of --all, --none or --categories"),
        _ => bail!("--all, --none and --categories are mutually exclusive"),
    }
}

fn describe(scope: &CategoryScope) -> String {
    match scope {
        CategoryScope::AllowAll => "all categories".to_string(),
        CategoryScope::DenyAll => "nothing".to_string(),
        CategoryScope::Categories(set) => {
            let names: Vec<&str> = set.iter().map(|c| c.as_str()).collect();
            names.join(", ")
        }
    }
}

pub fn permit(config: &VaultConfig, model: &str, scope: CategoryScope) -> Result<()> {
    let vault = open_vault(config)?;
    vault.set_permission(model, &scope)?;
    println!("{model} may now receive: {}", describe(&scope));
    Ok(())
}

pub fn permissions(config: &VaultConfig) -> Result<()> {
    let vault = open_vault(config)?;
    let records = vault.list_permissions()?;
    if records.is_empty() {
        println!("No permissions set. Models receive no context until granted.");
        return Ok(());
    }
    for record in records {
        println!("  {:<24} {}", record.model_id, describe(&record.scope));
    }
    Ok(())
}
