//! Data models for Quette
//!
//! Defines the core data structures: Rating, Collection and the
//! RatingDraft used to create or edit a rating. Records serialize with
//! camelCase field names and millisecond timestamps so that persisted
//! records and backup files stay readable by every client.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::error::{Field, ValidationError};

/// Highest score on the slices scale
pub const MAX_SLICES: u8 = 10;

/// Slices preselected on a fresh draft
pub const DEFAULT_SLICES: u8 = 6;

/// Ingredients offered as one-tap choices
pub const STANDARD_INGREDIENTS: [&str; 15] = [
    "pomodoro",
    "mozzarella",
    "basilico",
    "funghi",
    "olive",
    "cipolla",
    "salame",
    "prosciutto",
    "peperoni",
    "carciofi",
    "ananas",
    "tonno",
    "rucola",
    "gorgonzola",
    "wurstel",
];

/// Normalize an ingredient for comparison
///
/// Only used to decide whether two tags are the same; the stored tag keeps
/// its original casing and spacing.
pub fn normalize(tag: &str) -> String {
    tag.trim().to_lowercase()
}

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique identifier
///
/// Random UUID v4 from the OS random source. If the random source is
/// unavailable, falls back to [`fallback_id`].
pub fn new_id() -> String {
    let mut bytes = [0u8; 16];
    match getrandom::fill(&mut bytes) {
        Ok(()) => uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string(),
        Err(err) => {
            warn!("OS random source unavailable ({}), using timestamp id", err);
            fallback_id(Utc::now())
        }
    }
}

/// Timestamp-based identifier: `id-<millis>-<hex suffix>`
///
/// The suffix mixes a process-wide counter with the sub-millisecond part of
/// the clock, so two calls in the same session never produce the same id.
pub fn fallback_id(now: DateTime<Utc>) -> String {
    let count = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = u64::from(now.timestamp_subsec_nanos());
    let suffix = (count << 32) ^ nanos.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    format!("id-{}-{:x}", now.timestamp_millis(), suffix)
}

/// Current time truncated to whole milliseconds (the persisted precision)
pub(crate) fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Kind of media item being rated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Film,
    #[serde(alias = "serie tv")]
    Series,
    #[serde(alias = "videogiochi")]
    Game,
    #[serde(alias = "libri")]
    Book,
}

impl MediaType {
    pub const ALL: [MediaType; 4] = [
        MediaType::Film,
        MediaType::Series,
        MediaType::Game,
        MediaType::Book,
    ];

    /// Value stored in records
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Film => "film",
            MediaType::Series => "series",
            MediaType::Game => "game",
            MediaType::Book => "book",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Film => "Film",
            MediaType::Series => "TV series",
            MediaType::Game => "Video game",
            MediaType::Book => "Book",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown media type '{0}'. Expected one of: film, series, game, book")]
pub struct UnknownMediaType(pub String);

impl FromStr for MediaType {
    type Err = UnknownMediaType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "film" => Ok(MediaType::Film),
            "series" | "serie tv" => Ok(MediaType::Series),
            "game" | "videogiochi" => Ok(MediaType::Game),
            "book" | "libri" => Ok(MediaType::Book),
            _ => Err(UnknownMediaType(s.to_string())),
        }
    }
}

/// A rating of one media item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    /// Unique identifier, never changes
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    /// Score on the 0-10 scale
    pub slices: u8,
    /// Free-form flavor label
    pub flavor: String,
    pub ingredients: Vec<String>,
    /// When this rating was created, never changes
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Rating {
    pub(crate) fn create(draft: ValidDraft) -> Self {
        Self {
            id: new_id(),
            title: draft.title,
            media_type: draft.media_type,
            slices: draft.slices,
            flavor: draft.flavor,
            ingredients: draft.ingredients,
            created_at: now_millis(),
        }
    }

    /// Replace every mutable field, keeping id and creation time
    pub(crate) fn apply(&mut self, draft: ValidDraft) {
        self.title = draft.title;
        self.media_type = draft.media_type;
        self.slices = draft.slices;
        self.flavor = draft.flavor;
        self.ingredients = draft.ingredients;
    }

    /// Check whether an ingredient is present (normalized comparison)
    pub fn has_ingredient(&self, tag: &str) -> bool {
        let wanted = normalize(tag);
        self.ingredients.iter().any(|i| normalize(i) == wanted)
    }
}

/// A named group of ratings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    /// Member rating ids in insertion order, no duplicates
    pub rating_ids: Vec<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Collection {
    pub(crate) fn create(name: String) -> Self {
        Self {
            id: new_id(),
            name,
            rating_ids: Vec::new(),
            created_at: now_millis(),
        }
    }

    pub fn contains(&self, rating_id: &str) -> bool {
        self.rating_ids.iter().any(|id| id == rating_id)
    }

    pub fn len(&self) -> usize {
        self.rating_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rating_ids.is_empty()
    }

    /// Add the rating if absent, remove it if present
    ///
    /// Returns true when the rating is a member afterwards.
    pub(crate) fn toggle(&mut self, rating_id: &str) -> bool {
        if self.remove(rating_id) {
            false
        } else {
            self.rating_ids.push(rating_id.to_string());
            true
        }
    }

    /// Append the rating unless it is already a member
    pub(crate) fn insert(&mut self, rating_id: &str) -> bool {
        if self.contains(rating_id) {
            return false;
        }
        self.rating_ids.push(rating_id.to_string());
        true
    }

    pub(crate) fn remove(&mut self, rating_id: &str) -> bool {
        let before = self.rating_ids.len();
        self.rating_ids.retain(|id| id != rating_id);
        self.rating_ids.len() != before
    }
}

/// Validate a collection name, returning it trimmed
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::new(Field::Name));
    }
    Ok(name.to_string())
}

/// Editable form state for a rating
///
/// Ingredients added through the draft's methods are kept unique by their
/// normalized form. Fields are public so callers can also fill them
/// directly; [`RatingDraft::validate`] cleans up whatever ends up here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingDraft {
    pub title: String,
    pub media_type: MediaType,
    pub slices: u8,
    pub flavor: String,
    pub ingredients: Vec<String>,
}

impl Default for RatingDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            media_type: MediaType::Film,
            slices: DEFAULT_SLICES,
            flavor: String::new(),
            ingredients: Vec::new(),
        }
    }
}

impl RatingDraft {
    /// Create an empty draft
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefill a draft from an existing rating for editing
    pub fn from_rating(rating: &Rating) -> Self {
        Self {
            title: rating.title.clone(),
            media_type: rating.media_type,
            slices: rating.slices,
            flavor: rating.flavor.clone(),
            ingredients: rating.ingredients.clone(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }

    pub fn with_slices(mut self, slices: u8) -> Self {
        self.slices = slices;
        self
    }

    pub fn with_flavor(mut self, flavor: impl Into<String>) -> Self {
        self.flavor = flavor.into();
        self
    }

    pub fn with_ingredients<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            self.add_ingredient(tag.as_ref());
        }
        self
    }

    pub fn has_ingredient(&self, tag: &str) -> bool {
        let wanted = normalize(tag);
        self.ingredients.iter().any(|i| normalize(i) == wanted)
    }

    /// Add a custom ingredient
    ///
    /// The input is trimmed. Returns false if it was blank or already
    /// present in another casing or spacing.
    pub fn add_ingredient(&mut self, tag: &str) -> bool {
        let cleaned = tag.trim();
        if cleaned.is_empty() || self.has_ingredient(cleaned) {
            return false;
        }
        self.ingredients.push(cleaned.to_string());
        true
    }

    /// Toggle a standard ingredient on or off
    pub fn toggle_ingredient(&mut self, tag: &str) {
        if !self.remove_ingredient(tag) {
            self.ingredients.push(tag.to_string());
        }
    }

    /// Remove every ingredient matching `tag`; returns true if any was removed
    pub fn remove_ingredient(&mut self, tag: &str) -> bool {
        let wanted = normalize(tag);
        let before = self.ingredients.len();
        self.ingredients.retain(|i| normalize(i) != wanted);
        self.ingredients.len() != before
    }

    /// Check the draft and produce the cleaned values
    ///
    /// Checks run in order: title, flavor, ingredients, slices.
    pub fn validate(&self) -> Result<ValidDraft, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::new(Field::Title));
        }
        let flavor = self.flavor.trim();
        if flavor.is_empty() {
            return Err(ValidationError::new(Field::Flavor));
        }

        let mut seen: Vec<String> = Vec::with_capacity(self.ingredients.len());
        let mut ingredients = Vec::with_capacity(self.ingredients.len());
        for tag in &self.ingredients {
            let key = normalize(tag);
            if key.is_empty() || seen.contains(&key) {
                continue;
            }
            seen.push(key);
            ingredients.push(tag.clone());
        }
        if ingredients.is_empty() {
            return Err(ValidationError::new(Field::Ingredients));
        }

        if self.slices > MAX_SLICES {
            return Err(ValidationError::new(Field::Slices));
        }

        Ok(ValidDraft {
            title: title.to_string(),
            media_type: self.media_type,
            slices: self.slices,
            flavor: flavor.to_string(),
            ingredients,
        })
    }
}

/// A draft that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDraft {
    title: String,
    media_type: MediaType,
    slices: u8,
    flavor: String,
    ingredients: Vec<String>,
}
