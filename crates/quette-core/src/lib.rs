//! Quette Core Library
//!
//! This crate provides the core functionality for Quette, a personal log of
//! films, series, games and books rated in pizza slices (0-10), tagged with
//! ingredients and grouped into collections.
//!
//! # Architecture
//!
//! - **Store**: sole owner of ratings and collections, keeps membership
//!   consistent and writes every change through to storage
//! - **Storage**: two JSON records in a data directory, watched for writes
//!   made by other processes
//!
//! # Quick Start
//!
//! ```text
//! let mut store = Store::open()?;
//!
//! // Rate something
//! let draft = RatingDraft::new()
//!     .with_title("Arrival")
//!     .with_slices(9)
//!     .with_flavor("Quattro stagioni")
//!     .with_ingredients(["basilico", "olive"]);
//! store.add_rating(&draft)?;
//!
//! // Query ratings
//! let best = filter_and_sort(store.ratings(), &RatingQuery::new().with_sort(SortKey::Highest));
//! ```
//!
//! # Modules
//!
//! - `store`: Unified storage interface (main entry point)
//! - `models`: Ratings, collections, drafts and validation
//! - `query`: Sorted and filtered views of ratings
//! - `backup`: Snapshot export and import
//! - `storage`: Record backends and persistence
//! - `config`: Application configuration

pub mod backup;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod storage;
pub mod store;

pub use backup::{ImportMode, ImportReport, Snapshot};
pub use config::Config;
pub use error::{EntityKind, Error, Field, Result, ValidationError};
pub use models::{Collection, MediaType, Rating, RatingDraft};
pub use query::{filter_and_sort, recent, RatingQuery, SortKey};
pub use storage::{Backend, FileBackend, MemoryBackend, RecordKey, StorageError};
pub use store::{DanglingReference, Store, SyncReport};
