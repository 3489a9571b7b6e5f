//! Backup export and import handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use quette_core::backup::{self, ImportMode};
use quette_core::Store;

use crate::output::{Output, OutputFormat};
use crate::prompt::confirm;

/// Write a backup file into `dir` (current directory by default)
pub fn export(store: &Store, dir: Option<PathBuf>, output: &Output) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    let path = backup::write_backup(store, &dir)
        .with_context(|| format!("Failed to write backup to {:?}", dir))?;

    match output.format {
        OutputFormat::Quiet => println!("{}", path.display()),
        _ => output.success(&format!(
            "Exported {} ratings and {} collections to {}",
            store.ratings().len(),
            store.collections().len(),
            path.display()
        )),
    }
    Ok(())
}

/// Import a backup file
pub async fn import(
    store: &mut Store,
    file: PathBuf,
    mode: ImportMode,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let text = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read backup file: {:?}", file))?;

    if mode == ImportMode::Replace && !store.is_empty() && output.should_prompt() && !yes {
        println!(
            "Replace {} ratings and {} collections with the contents of {}?",
            store.ratings().len(),
            store.collections().len(),
            file.display()
        );
        if !confirm("Existing data will be lost. Continue?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let report = backup::import_str(store, &text, mode).context("Import failed")?;

    match output.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "status": "success",
                "mode": report.mode,
                "ratings_added": report.ratings_added,
                "collections_added": report.collections_added,
                "message": report.status_message()
            })
        ),
        _ => output.success(&report.status_message()),
    }

    let dangling = store.dangling_references();
    if !dangling.is_empty() {
        output.warn(&format!(
            "{} collection entries refer to ratings that are not in this backup",
            dangling.len()
        ));
    }
    Ok(())
}
