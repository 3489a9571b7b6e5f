//! Unified storage interface
//!
//! The `Store` is the only mutable owner of ratings and collections. It
//! keeps them in memory, enforces referential integrity between the two,
//! and writes the affected record through to the backend after every
//! mutation.
//!
//! ## Persistence failures
//!
//! If a write fails the operation returns [`Error::Persistence`], but the
//! in-memory state keeps the mutation. Memory stays authoritative; the next
//! successful save brings the durable copy back in line.
//!
//! ## Other processes
//!
//! Each process has its own copy. [`Store::sync_external`] applies the
//! latest record written by another process, replacing the local copy
//! (last writer wins, no merge).
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open()?;
//!
//! let draft = RatingDraft::new()
//!     .with_title("Dune")
//!     .with_flavor("Spice")
//!     .with_ingredients(["sabbia"]);
//! let rating = store.add_rating(&draft)?;
//!
//! let favourites = store.add_collection("Favourites")?;
//! store.toggle_membership(&favourites.id, &rating.id)?;
//! ```

use std::collections::HashSet;

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{validate_name, Collection, Rating, RatingDraft};
use crate::storage::{Backend, FileBackend, Persistence, RecordKey, Subscription};

/// What [`Store::sync_external`] replaced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub ratings_replaced: bool,
    pub collections_replaced: bool,
}

impl SyncReport {
    pub fn changed(&self) -> bool {
        self.ratings_replaced || self.collections_replaced
    }
}

/// A collection member id with no matching rating
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub collection_id: String,
    pub rating_id: String,
}

/// Ratings and collections for one process
pub struct Store<B: Backend = FileBackend> {
    ratings: Vec<Rating>,
    collections: Vec<Collection>,
    persistence: Persistence<B>,
    rating_updates: Option<Subscription<Rating>>,
    collection_updates: Option<Subscription<Collection>>,
}

impl Store<FileBackend> {
    /// Open the store in the configured data directory
    pub fn open() -> anyhow::Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(&config).context("Failed to open data directory")
    }

    /// Open the store with a specific configuration
    pub fn open_with_config(config: &Config) -> Result<Self> {
        let backend = FileBackend::open(&config.data_dir)?;
        Ok(Self::open_with_backend(backend))
    }
}

impl<B: Backend> Store<B> {
    /// Load both records from `backend` and subscribe to their changes
    ///
    /// Missing or corrupt records start empty. If change notifications
    /// cannot be set up the store still works, it just won't see other
    /// processes' writes.
    pub fn open_with_backend(backend: B) -> Self {
        let persistence = Persistence::new(backend);
        let ratings = persistence.load(RecordKey::Ratings);
        let collections = persistence.load(RecordKey::Collections);

        let rating_updates = subscribe_or_warn(&persistence, RecordKey::Ratings);
        let collection_updates = subscribe_or_warn(&persistence, RecordKey::Collections);

        debug!(
            "Opened store at {} ({} ratings, {} collections)",
            persistence.backend().location(),
            ratings.len(),
            collections.len()
        );

        Self {
            ratings,
            collections,
            persistence,
            rating_updates,
            collection_updates,
        }
    }

    pub fn backend(&self) -> &B {
        self.persistence.backend()
    }

    /// Whether other processes' writes will be picked up
    pub fn is_watching(&self) -> bool {
        self.rating_updates.is_some() && self.collection_updates.is_some()
    }

    // ==================== Reads ====================

    /// All ratings in storage order (newest inserted first)
    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    /// All collections in storage order (newest created first)
    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn rating(&self, id: &str) -> Option<&Rating> {
        self.ratings.iter().find(|r| r.id == id)
    }

    pub fn collection(&self, id: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id == id)
    }

    /// Collections that list `rating_id` as a member
    pub fn collections_containing(&self, rating_id: &str) -> Vec<&Collection> {
        self.collections
            .iter()
            .filter(|c| c.contains(rating_id))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty() && self.collections.is_empty()
    }

    /// Membership entries that point at no rating
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let known: HashSet<&str> = self.ratings.iter().map(|r| r.id.as_str()).collect();
        self.collections
            .iter()
            .flat_map(|c| {
                c.rating_ids
                    .iter()
                    .filter(|id| !known.contains(id.as_str()))
                    .map(|id| DanglingReference {
                        collection_id: c.id.clone(),
                        rating_id: id.clone(),
                    })
            })
            .collect()
    }

    // ==================== Rating Operations ====================

    /// Create a rating from a draft and put it first
    pub fn add_rating(&mut self, draft: &RatingDraft) -> Result<Rating> {
        self.add_rating_to_collections(draft, &[])
    }

    /// Create a rating and add it to the given collections
    ///
    /// Unknown collection ids are ignored.
    pub fn add_rating_to_collections(
        &mut self,
        draft: &RatingDraft,
        collection_ids: &[String],
    ) -> Result<Rating> {
        let rating = Rating::create(draft.validate()?);
        self.ratings.insert(0, rating.clone());

        let mut touched = false;
        for collection in self
            .collections
            .iter_mut()
            .filter(|c| collection_ids.contains(&c.id))
        {
            touched |= collection.insert(&rating.id);
        }

        debug!("Added rating {} ({})", rating.id, rating.title);
        let ratings_saved = self.save_ratings();
        let collections_saved = if touched {
            self.save_collections()
        } else {
            Ok(())
        };
        ratings_saved.and(collections_saved)?;
        Ok(rating)
    }

    /// Replace the editable fields of a rating
    pub fn update_rating(&mut self, id: &str, draft: &RatingDraft) -> Result<Rating> {
        let valid = draft.validate()?;
        let rating = self
            .ratings
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::rating_not_found(id))?;

        rating.apply(valid);
        let updated = rating.clone();

        debug!("Updated rating {}", id);
        self.save_ratings()?;
        Ok(updated)
    }

    /// Delete a rating and remove it from every collection
    ///
    /// Returns false if there was no such rating.
    pub fn delete_rating(&mut self, id: &str) -> Result<bool> {
        let before = self.ratings.len();
        self.ratings.retain(|r| r.id != id);
        if self.ratings.len() == before {
            return Ok(false);
        }

        let mut touched = false;
        for collection in &mut self.collections {
            touched |= collection.remove(id);
        }

        debug!("Deleted rating {}", id);
        let ratings_saved = self.save_ratings();
        let collections_saved = if touched {
            self.save_collections()
        } else {
            Ok(())
        };
        ratings_saved.and(collections_saved)?;
        Ok(true)
    }

    // ==================== Collection Operations ====================

    /// Create an empty collection and put it first
    pub fn add_collection(&mut self, name: &str) -> Result<Collection> {
        let collection = Collection::create(validate_name(name)?);
        self.collections.insert(0, collection.clone());

        debug!("Added collection {} ({})", collection.id, collection.name);
        self.save_collections()?;
        Ok(collection)
    }

    /// Rename a collection; false if there is no such collection
    pub fn rename_collection(&mut self, id: &str, name: &str) -> Result<bool> {
        let name = validate_name(name)?;
        let Some(collection) = self.collections.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };

        collection.name = name;
        self.save_collections()?;
        Ok(true)
    }

    /// Delete a collection; its ratings are left alone
    pub fn delete_collection(&mut self, id: &str) -> Result<bool> {
        let before = self.collections.len();
        self.collections.retain(|c| c.id != id);
        if self.collections.len() == before {
            return Ok(false);
        }

        debug!("Deleted collection {}", id);
        self.save_collections()?;
        Ok(true)
    }

    /// Add the rating to the collection, or remove it if already a member
    ///
    /// Returns `Some(true)` when added, `Some(false)` when removed and
    /// `None` when the collection does not exist. The rating id is not
    /// checked against the ratings: callers pick it from existing ratings,
    /// and deleting a rating always clears it from every collection.
    pub fn toggle_membership(&mut self, collection_id: &str, rating_id: &str) -> Result<Option<bool>> {
        let Some(collection) = self.collections.iter_mut().find(|c| c.id == collection_id) else {
            return Ok(None);
        };

        let member = collection.toggle(rating_id);
        self.save_collections()?;
        Ok(Some(member))
    }

    // ==================== Sync ====================

    /// Apply records written by other processes since the last call
    ///
    /// A foreign record replaces the local copy wholesale. Nothing is
    /// written back.
    pub fn sync_external(&mut self) -> SyncReport {
        let mut report = SyncReport::default();

        if let Some(ratings) = self.rating_updates.as_ref().and_then(|s| s.try_latest()) {
            info!("Ratings changed externally ({} entries)", ratings.len());
            self.ratings = ratings;
            report.ratings_replaced = true;
        }

        if let Some(collections) = self
            .collection_updates
            .as_ref()
            .and_then(|s| s.try_latest())
        {
            info!("Collections changed externally ({} entries)", collections.len());
            self.collections = collections;
            report.collections_replaced = true;
        }

        report
    }

    // ==================== Bulk ====================

    /// Overwrite both records
    pub(crate) fn replace_all(&mut self, ratings: Vec<Rating>, collections: Vec<Collection>) -> Result<()> {
        self.ratings = ratings;
        self.collections = collections;
        let ratings_saved = self.save_ratings();
        let collections_saved = self.save_collections();
        ratings_saved.and(collections_saved)
    }

    /// Append entities after the existing ones
    pub(crate) fn append(&mut self, ratings: Vec<Rating>, collections: Vec<Collection>) -> Result<()> {
        let ratings_changed = !ratings.is_empty();
        let collections_changed = !collections.is_empty();
        self.ratings.extend(ratings);
        self.collections.extend(collections);

        let ratings_saved = if ratings_changed {
            self.save_ratings()
        } else {
            Ok(())
        };
        let collections_saved = if collections_changed {
            self.save_collections()
        } else {
            Ok(())
        };
        ratings_saved.and(collections_saved)
    }

    // ==================== Persistence ====================

    fn save_ratings(&self) -> Result<()> {
        save_record(&self.persistence, RecordKey::Ratings, &self.ratings)
    }

    fn save_collections(&self) -> Result<()> {
        save_record(&self.persistence, RecordKey::Collections, &self.collections)
    }
}

fn save_record<B: Backend, T: Serialize>(
    persistence: &Persistence<B>,
    key: RecordKey,
    items: &[T],
) -> Result<()> {
    persistence.save(key, items).map_err(|e| {
        warn!("Failed to save {}: {} (change kept in memory)", key, e);
        Error::Persistence(e)
    })
}

fn subscribe_or_warn<B: Backend, T: serde::de::DeserializeOwned>(
    persistence: &Persistence<B>,
    key: RecordKey,
) -> Option<Subscription<T>> {
    match persistence.subscribe(key) {
        Ok(sub) => Some(sub),
        Err(e) => {
            warn!("External changes to {} will not be seen: {}", key, e);
            None
        }
    }
}
