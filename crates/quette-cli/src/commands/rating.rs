//! Rating command handlers

use anyhow::{Context, Result};

use quette_core::query::{self, RatingQuery, SortKey};
use quette_core::{MediaType, RatingDraft, Store};

use super::collection::resolve_collection;
use super::resolve_id;
use crate::output::{short_id, Output};
use crate::prompt::confirm;

/// Field values given on the command line
#[derive(Debug, Default)]
pub struct RatingFields {
    pub title: Option<String>,
    pub media_type: Option<MediaType>,
    pub slices: Option<u8>,
    pub flavor: Option<String>,
    pub ingredients: Vec<String>,
}

impl RatingFields {
    /// Overlay the given fields onto `draft`
    ///
    /// Ingredients replace the draft's list only when at least one is given.
    fn apply_to(self, mut draft: RatingDraft) -> RatingDraft {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(media_type) = self.media_type {
            draft.media_type = media_type;
        }
        if let Some(slices) = self.slices {
            draft.slices = slices;
        }
        if let Some(flavor) = self.flavor {
            draft.flavor = flavor;
        }
        if !self.ingredients.is_empty() {
            draft.ingredients.clear();
            for tag in &self.ingredients {
                draft.add_ingredient(tag);
            }
        }
        draft
    }
}

/// Resolve a rating id or unique prefix
pub(crate) fn resolve_rating(store: &Store, input: &str) -> Result<String> {
    resolve_id(
        "rating",
        input,
        store
            .ratings()
            .iter()
            .map(|r| (r.id.as_str(), r.title.as_str())),
    )
}

/// Create a new rating
pub fn add(
    store: &mut Store,
    fields: RatingFields,
    collections: Vec<String>,
    output: &Output,
) -> Result<()> {
    let collection_ids = collections
        .iter()
        .map(|c| resolve_collection(store, c))
        .collect::<Result<Vec<_>>>()?;

    let draft = fields.apply_to(RatingDraft::new());
    let rating = store
        .add_rating_to_collections(&draft, &collection_ids)
        .context("Failed to create rating")?;

    output.success(&format!("Created rating: {}", rating.id));
    output.print_rating(&rating, &store.collections_containing(&rating.id));

    Ok(())
}

/// List ratings with optional filters
pub fn list(
    store: &Store,
    media_type: Option<MediaType>,
    search: Option<String>,
    sort: &str,
    output: &Output,
) -> Result<()> {
    let sort_key = SortKey::parse_or_default(sort);
    if sort_key.as_str() != sort.trim().to_lowercase() {
        output.warn(&format!("Unknown sort order '{}', using newest", sort));
    }

    let query = RatingQuery {
        media_type,
        search,
        sort: sort_key,
    };
    output.print_ratings(&query::filter_and_sort(store.ratings(), &query));
    Ok(())
}

/// List the most recently created ratings
pub fn recent(store: &Store, limit: usize, output: &Output) -> Result<()> {
    output.print_ratings(&query::recent(store.ratings(), limit));
    Ok(())
}

/// Show a single rating
pub fn show(store: &Store, id: String, output: &Output) -> Result<()> {
    let id = resolve_rating(store, &id)?;
    let rating = store
        .rating(&id)
        .ok_or_else(|| anyhow::anyhow!("Rating not found: {}", id))?;

    output.print_rating(rating, &store.collections_containing(&id));
    Ok(())
}

/// Edit a rating's fields
pub fn edit(
    store: &mut Store,
    id: String,
    fields: RatingFields,
    add_ingredients: Vec<String>,
    remove_ingredients: Vec<String>,
    output: &Output,
) -> Result<()> {
    let id = resolve_rating(store, &id)?;
    let current = store
        .rating(&id)
        .ok_or_else(|| anyhow::anyhow!("Rating not found: {}", id))?;

    let mut draft = fields.apply_to(RatingDraft::from_rating(current));
    for tag in &add_ingredients {
        if !draft.add_ingredient(tag) {
            output.warn(&format!("Ingredient already present: {}", tag.trim()));
        }
    }
    for tag in &remove_ingredients {
        if !draft.remove_ingredient(tag) {
            output.warn(&format!("Ingredient not on this rating: {}", tag.trim()));
        }
    }

    let rating = store
        .update_rating(&id, &draft)
        .context("Failed to update rating")?;

    output.success("Rating updated");
    output.print_rating(&rating, &store.collections_containing(&id));

    Ok(())
}

/// Delete a rating
pub fn delete(store: &mut Store, id: String, yes: bool, output: &Output) -> Result<()> {
    let id = resolve_rating(store, &id)?;
    let rating = store
        .rating(&id)
        .ok_or_else(|| anyhow::anyhow!("Rating not found: {}", id))?;

    if output.should_prompt() && !yes {
        let memberships = store.collections_containing(&id).len();
        println!("Delete rating: {} - {}", short_id(&rating.id), rating.title);
        if memberships > 0 {
            println!("It will also be removed from {} collection(s).", memberships);
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.delete_rating(&id).context("Failed to delete rating")?;

    output.success(&format!("Deleted rating: {}", id));

    Ok(())
}
