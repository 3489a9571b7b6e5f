//! Collection command handlers

use anyhow::{Context, Result};

use quette_core::query;
use quette_core::Store;

use super::rating::resolve_rating;
use super::resolve_id;
use crate::output::{short_id, Output};
use crate::prompt::confirm;

/// Resolve a collection id or unique prefix
pub(crate) fn resolve_collection(store: &Store, input: &str) -> Result<String> {
    resolve_id(
        "collection",
        input,
        store
            .collections()
            .iter()
            .map(|c| (c.id.as_str(), c.name.as_str())),
    )
}

/// Create an empty collection
pub fn create(store: &mut Store, name: String, output: &Output) -> Result<()> {
    let collection = store
        .add_collection(&name)
        .context("Failed to create collection")?;

    if output.is_quiet() {
        println!("{}", collection.id);
    }
    output.success(&format!(
        "Created collection: {} ({})",
        collection.name, collection.id
    ));
    Ok(())
}

/// List all collections
pub fn list(store: &Store, output: &Output) -> Result<()> {
    output.print_collections(store.collections());
    Ok(())
}

/// Show a collection and its ratings
pub fn show(store: &Store, id: String, output: &Output) -> Result<()> {
    let id = resolve_collection(store, &id)?;
    let collection = store
        .collection(&id)
        .ok_or_else(|| anyhow::anyhow!("Collection not found: {}", id))?;

    let members = query::collection_ratings(store.ratings(), collection);
    output.print_collection(collection, &members);
    Ok(())
}

/// Rename a collection
pub fn rename(store: &mut Store, id: String, name: String, output: &Output) -> Result<()> {
    let id = resolve_collection(store, &id)?;

    if !store
        .rename_collection(&id, &name)
        .context("Failed to rename collection")?
    {
        anyhow::bail!("Collection not found: {}", id);
    }

    output.success(&format!("Renamed collection to: {}", name.trim()));
    Ok(())
}

/// Delete a collection (its ratings are kept)
pub fn delete(store: &mut Store, id: String, yes: bool, output: &Output) -> Result<()> {
    let id = resolve_collection(store, &id)?;
    let collection = store
        .collection(&id)
        .ok_or_else(|| anyhow::anyhow!("Collection not found: {}", id))?;

    if output.should_prompt() && !yes {
        println!(
            "Delete collection: {} - {} ({} ratings are kept)",
            short_id(&collection.id),
            collection.name,
            collection.len()
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store
        .delete_collection(&id)
        .context("Failed to delete collection")?;

    output.success(&format!("Deleted collection: {}", id));
    Ok(())
}

/// A member id already in the collection is taken as-is, even with no
/// matching rating, so dangling entries can be removed
fn resolve_member(store: &Store, collection_id: &str, input: &str) -> Result<String> {
    if store
        .collection(collection_id)
        .is_some_and(|c| c.contains(input))
    {
        return Ok(input.to_string());
    }
    resolve_rating(store, input)
}

/// Add a rating to a collection, or remove it if already there
pub fn toggle(
    store: &mut Store,
    collection_id: String,
    rating_id: String,
    output: &Output,
) -> Result<()> {
    let collection_id = resolve_collection(store, &collection_id)?;
    let rating_id = resolve_member(store, &collection_id, &rating_id)?;

    let added = store
        .toggle_membership(&collection_id, &rating_id)
        .context("Failed to update collection")?
        .ok_or_else(|| anyhow::anyhow!("Collection not found: {}", collection_id))?;

    let name = store
        .collection(&collection_id)
        .map(|c| c.name.clone())
        .unwrap_or_default();
    if added {
        output.success(&format!("Added {} to {}", short_id(&rating_id), name));
    } else {
        output.success(&format!("Removed {} from {}", short_id(&rating_id), name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use quette_core::{FileBackend, RatingDraft};
    use tempfile::TempDir;

    fn open_store(temp_dir: &TempDir) -> Store {
        Store::open_with_backend(FileBackend::open(temp_dir.path()).unwrap())
    }

    #[test]
    fn test_toggle_by_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let output = Output::new(OutputFormat::Quiet);
        let rating = store
            .add_rating(
                &RatingDraft::new()
                    .with_title("Dune")
                    .with_flavor("Spice")
                    .with_ingredients(["sabbia"]),
            )
            .unwrap();
        let collection = store.add_collection("Sci-fi").unwrap();

        toggle(&mut store, collection.id.clone(), rating.id[..8].to_string(), &output).unwrap();
        assert!(store.collection(&collection.id).unwrap().contains(&rating.id));
    }

    #[test]
    fn test_toggle_removes_dangling_member() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let output = Output::new(OutputFormat::Quiet);
        let collection = store.add_collection("Lost").unwrap();
        store.toggle_membership(&collection.id, "gone-rating").unwrap();
        assert_eq!(store.dangling_references().len(), 1);

        toggle(&mut store, collection.id.clone(), "gone-rating".to_string(), &output).unwrap();
        assert!(store.dangling_references().is_empty());
        assert!(!store.collection(&collection.id).unwrap().contains("gone-rating"));
    }

    #[test]
    fn test_toggle_unknown_rating_fails() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open_store(&temp_dir);
        let output = Output::new(OutputFormat::Quiet);
        let collection = store.add_collection("Empty").unwrap();

        assert!(toggle(&mut store, collection.id.clone(), "nope".to_string(), &output).is_err());
        assert!(store.collection(&collection.id).unwrap().is_empty());
    }
}
