//! CLI `doctor` command: database and model diagnostics.

use anyhow::{Context, Result};

use crate::config::VaultConfig;
use crate::db;
use crate::embedding::{local::model_dir, MODEL_FILES};

pub fn doctor(config: &VaultConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `contextvault serve` or `contextvault add` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
    let report = db::check_database_health(&conn).context("failed to run health check")?;
    let stored_backend = db::migrations::get_index_backend(&conn)?;

    println!("ContextVault Health Report");
    println!("==========================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Similarity backend:");
    println!("  Last used:       {}", stored_backend.as_deref().unwrap_or("(not set)"));
    println!("  Configured:      {}", config.similarity.backend);
    if config.similarity.backend == "dense" {
        let dir = model_dir(&config.similarity);
        let missing: Vec<&str> = MODEL_FILES
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| !dir.join(name).exists())
            .collect();
        if missing.is_empty() {
            println!("  Model:           OK ({})", dir.display());
        } else {
            println!("  Model:           MISSING {}", missing.join(", "));
            println!("  Run `contextvault model download` to fetch it.");
        }
    }
    println!();
    println!("Row counts:");
    println!("  Entries:         {}", report.entry_count);
    println!("  Relationships:   {}", report.relationship_count);
    println!("  Permissions:     {}", report.permission_count);
    println!("  Audit log:       {}", report.log_count);
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery: restore {} from a backup copy.", db_path.display());
    }
    if report.permission_count == 0 {
        println!();
        println!("No model permissions set; no context will be injected.");
        println!("Grant access with `contextvault permit <model> --all`.");
    }
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
