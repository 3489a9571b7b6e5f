//! Follow changes made by other processes

use std::time::Duration;

use anyhow::{bail, Result};
use tracing::debug;

use quette_core::{Backend, Store, SyncReport};

use crate::output::{Output, OutputFormat};

/// Poll for external changes until Ctrl-C
pub async fn run(store: &mut Store, interval_ms: u64, output: &Output) -> Result<()> {
    if !store.is_watching() {
        bail!("Change notifications are unavailable for this data directory");
    }

    output.message(&format!(
        "Watching {} for changes (Ctrl-C to stop)",
        store.backend().location()
    ));

    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(50)));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = store.sync_external();
                if report.changed() {
                    print_change(store, report, output);
                }
            }
            _ = &mut ctrl_c => {
                debug!("Watch interrupted");
                break;
            }
        }
    }

    Ok(())
}

fn print_change(store: &Store, report: SyncReport, output: &Output) {
    match output.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "ratings_replaced": report.ratings_replaced,
                "collections_replaced": report.collections_replaced,
                "ratings": store.ratings().len(),
                "collections": store.collections().len()
            })
        ),
        OutputFormat::Quiet => {}
        OutputFormat::Human => {
            let mut changed = Vec::new();
            if report.ratings_replaced {
                changed.push(format!("{} ratings", store.ratings().len()));
            }
            if report.collections_replaced {
                changed.push(format!("{} collections", store.collections().len()));
            }
            println!(
                "[{}] Updated from another process: {}",
                chrono::Local::now().format("%H:%M:%S"),
                changed.join(", ")
            );
        }
    }
}
