//! Status command handler

use anyhow::Result;

use quette_core::{Backend, Config, RecordKey, Store};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(store: &Store, config: &Config, output: &Output) -> Result<()> {
    let dangling = store.dangling_references();
    let memberships: usize = store.collections().iter().map(|c| c.len()).sum();

    match output.format {
        OutputFormat::Json => {
            let records: Vec<_> = RecordKey::ALL
                .iter()
                .map(|key| {
                    let path = config.record_path(*key);
                    serde_json::json!({
                        "key": key.as_str(),
                        "path": path,
                        "exists": path.exists()
                    })
                })
                .collect();
            println!(
                "{}",
                serde_json::json!({
                    "location": store.backend().location(),
                    "watching": store.is_watching(),
                    "records": records,
                    "counts": {
                        "ratings": store.ratings().len(),
                        "collections": store.collections().len(),
                        "memberships": memberships
                    },
                    "dangling_references": dangling.len()
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", store.ratings().len());
        }
        OutputFormat::Human => {
            println!("Quette Status");
            println!("=============");
            println!();
            println!("Storage:");
            println!("  Location: {}", store.backend().location());
            for key in RecordKey::ALL {
                let path = config.record_path(key);
                println!(
                    "  {:<19} {}",
                    key.as_str(),
                    if path.exists() { "present" } else { "not written yet" }
                );
            }
            println!(
                "  Watching: {}",
                if store.is_watching() { "yes" } else { "no" }
            );
            println!();
            println!("Contents:");
            println!("  Ratings:     {}", store.ratings().len());
            println!("  Collections: {}", store.collections().len());
            println!("  Memberships: {}", memberships);
            if !dangling.is_empty() {
                println!();
                println!("Collection entries without a rating:");
                for reference in &dangling {
                    println!("  {} -> {}", reference.collection_id, reference.rating_id);
                }
            }
        }
    }

    Ok(())
}
