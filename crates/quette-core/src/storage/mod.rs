//! Storage layer
//!
//! Keeps the two records (ratings and collections) in a durable key/value
//! backend and reports changes made by other processes.
//!
//! ## Architecture
//!
//! - **Backend**: raw bytes per record ([`FileBackend`] on disk,
//!   [`MemoryBackend`] in process)
//! - **Persistence**: JSON sequences on top of a backend, plus
//!   subscriptions to foreign changes

pub mod backend;
pub mod error;
pub mod file;
pub mod persistence;

pub use backend::{Backend, MemoryBackend, RecordKey};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use persistence::{Persistence, Subscription};
