//! Read-only views over ratings
//!
//! Every function here takes a slice and returns owned clones; nothing
//! borrows from or mutates the store.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::{Collection, MediaType, Rating};

/// Ordering applied by [`filter_and_sort`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    Highest,
    Lowest,
    TitleAsc,
    TitleDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::Newest,
        SortKey::Oldest,
        SortKey::Highest,
        SortKey::Lowest,
        SortKey::TitleAsc,
        SortKey::TitleDesc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::Oldest => "oldest",
            SortKey::Highest => "highest",
            SortKey::Lowest => "lowest",
            SortKey::TitleAsc => "az",
            SortKey::TitleDesc => "za",
        }
    }

    /// Parse a sort key, treating anything unknown as newest first
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    fn compare(&self, a: &Rating, b: &Rating) -> Ordering {
        match self {
            SortKey::Newest => b.created_at.cmp(&a.created_at),
            SortKey::Oldest => a.created_at.cmp(&b.created_at),
            SortKey::Highest => b.slices.cmp(&a.slices),
            SortKey::Lowest => a.slices.cmp(&b.slices),
            SortKey::TitleAsc => compare_titles(&a.title, &b.title),
            SortKey::TitleDesc => compare_titles(&b.title, &a.title),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown sort order '{0}' (expected newest, oldest, highest, lowest, az or za)")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownSortKey(s.to_string()))
    }
}

/// Filters and ordering for a rating listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingQuery {
    /// Keep only this media type
    pub media_type: Option<MediaType>,
    /// Case-insensitive title substring
    pub search: Option<String>,
    pub sort: SortKey,
}

impl RatingQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = Some(media_type);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }
}

/// The `n` most recently created ratings
pub fn recent(ratings: &[Rating], n: usize) -> Vec<Rating> {
    let mut sorted = ratings.to_vec();
    sorted.sort_by(|a, b| SortKey::Newest.compare(a, b));
    sorted.truncate(n);
    sorted
}

/// Apply type and title filters, then sort
///
/// The sort is stable, so ratings that compare equal keep their storage
/// order.
pub fn filter_and_sort(ratings: &[Rating], query: &RatingQuery) -> Vec<Rating> {
    let term = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut result: Vec<Rating> = ratings
        .iter()
        .filter(|r| query.media_type.map_or(true, |t| r.media_type == t))
        .filter(|r| {
            term.as_deref()
                .map_or(true, |t| r.title.to_lowercase().contains(t))
        })
        .cloned()
        .collect();

    result.sort_by(|a, b| query.sort.compare(a, b));
    result
}

/// Members of `collection`, in rating storage order
///
/// Member ids without a matching rating are skipped.
pub fn collection_ratings(ratings: &[Rating], collection: &Collection) -> Vec<Rating> {
    ratings
        .iter()
        .filter(|r| collection.contains(&r.id))
        .cloned()
        .collect()
}

/// Sort key for titles: accents stripped, lowercased
pub fn title_sort_key(title: &str) -> String {
    title
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Titles that differ only in case put lowercase first
fn compare_titles(a: &str, b: &str) -> Ordering {
    title_sort_key(a)
        .cmp(&title_sort_key(b))
        .then_with(|| case_tiebreak(a).cmp(case_tiebreak(b)))
}

fn case_tiebreak(title: &str) -> impl Iterator<Item = (bool, char)> + '_ {
    title.chars().map(|c| (c.is_uppercase(), c))
}
