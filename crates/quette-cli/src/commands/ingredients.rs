//! Ingredient listing

use std::collections::HashMap;

use anyhow::Result;

use quette_core::models::{normalize, STANDARD_INGREDIENTS};
use quette_core::{Rating, Store};

use crate::output::{IngredientUsage, Output};

/// List the standard ingredients followed by custom ones in use
pub fn list(store: &Store, output: &Output) -> Result<()> {
    output.print_ingredients(&usage(store.ratings()));
    Ok(())
}

/// Usage counts: standard ingredients in their usual order, then custom
/// ingredients alphabetically under the first spelling seen
fn usage(ratings: &[Rating]) -> Vec<IngredientUsage> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut spelling: HashMap<String, String> = HashMap::new();
    for tag in ratings.iter().flat_map(|r| &r.ingredients) {
        let key = normalize(tag);
        *counts.entry(key.clone()).or_default() += 1;
        spelling.entry(key).or_insert_with(|| tag.trim().to_string());
    }

    let mut result: Vec<IngredientUsage> = STANDARD_INGREDIENTS
        .iter()
        .map(|name| IngredientUsage {
            name: name.to_string(),
            count: counts.get(*name).copied().unwrap_or(0),
            standard: true,
        })
        .collect();

    let mut custom: Vec<IngredientUsage> = spelling
        .into_iter()
        .filter(|(key, _)| !STANDARD_INGREDIENTS.contains(&key.as_str()))
        .map(|(key, name)| IngredientUsage {
            count: counts.get(&key).copied().unwrap_or(0),
            name,
            standard: false,
        })
        .collect();
    custom.sort_by_key(|u| normalize(&u.name));

    result.extend(custom);
    result
}
