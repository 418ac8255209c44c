pub mod doctor;
pub mod entries;
pub mod export;
pub mod import;
pub mod permissions;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use crate::config::{SimilarityConfig, VaultConfig};
use crate::embedding::{local::model_dir, MODEL_FILES};
use crate::vault::Vault;

/// Open the configured vault for a one-shot command.
pub fn open_vault(config: &VaultConfig) -> Result<Vault> {
    Vault::open(Arc::new(config.clone()))
        .with_context(|| format!("failed to open vault at {}", config.resolved_db_path().display()))
}

/// Shorten text for one-line listings.
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

/// Download the ONNX embedding model and tokenizer to the model cache.
pub async fn model_download(config: &SimilarityConfig) -> Result<()> {
    let dir = model_dir(config);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create model dir: {}", dir.display()))?;

    for (name, url) in MODEL_FILES {
        let dest = dir.join(name);
        if dest.exists() {
            println!("{name} already exists at {}", dest.display());
            continue;
        }
        println!("Downloading {name}...");
        download_file(url, &dest).await?;
        println!("{name} saved to {}", dest.display());
    }

    println!("Model download complete. Set `similarity.backend = \"dense\"` to use it.");
    Ok(())
}

/// Download a file with a progress bar. Writes to a temp file, then renames.
async fn download_file(url: &str, dest: &Path) -> Result<()> {
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?;

    anyhow::ensure!(
        response.status().is_success(),
        "download failed with HTTP {}",
        response.status()
    );

    let pb = match response.content_length() {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
                    .context("invalid progress template")?
                    .progress_chars("##-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let tmp_path = dest.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;

    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.context("error reading response")?;
        file.write_all(&chunk).await.context("error writing to file")?;
        pb.inc(chunk.len() as u64);
    }

    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, dest)
        .await
        .context("failed to rename temp file")?;

    pb.finish_and_clear();
    Ok(())
}
