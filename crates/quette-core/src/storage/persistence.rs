//! Record persistence
//!
//! Serializes entity sequences into a [`Backend`] and reads them back.
//! Loading never fails: a missing record, an unreadable file or a payload
//! that is not a JSON array all degrade to "no data". The adapter does not
//! merge or validate entities.

use std::marker::PhantomData;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::backend::{Backend, RecordKey};
use super::error::StorageResult;

/// Persistence layer over a record backend
pub struct Persistence<B> {
    backend: B,
}

impl<B: Backend> Persistence<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Load the sequence stored under `key`
    ///
    /// Returns an empty Vec when the record is absent or is not a sequence.
    /// Elements that do not decode are skipped.
    pub fn load<T: DeserializeOwned>(&self, key: RecordKey) -> Vec<T> {
        let bytes = match self.backend.read(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("No stored record for {}", key);
                return Vec::new();
            }
            Err(e) => {
                warn!("Could not read {}: {}", key, e);
                return Vec::new();
            }
        };

        match decode_sequence(key, &bytes) {
            Some(items) => {
                debug!("Loaded {} entries from {}", items.len(), key);
                items
            }
            None => {
                warn!("Stored record {} is not a sequence, starting empty", key);
                Vec::new()
            }
        }
    }

    /// Overwrite the record under `key` with `items`
    pub fn save<T: Serialize>(&self, key: RecordKey, items: &[T]) -> StorageResult<()> {
        let bytes = serde_json::to_vec(items)?;
        self.backend.write(key, &bytes)?;
        debug!("Saved {} entries to {}", items.len(), key);
        Ok(())
    }

    /// Subscribe to changes of `key` made by other contexts
    pub fn subscribe<T: DeserializeOwned>(&self, key: RecordKey) -> StorageResult<Subscription<T>> {
        let rx = self.backend.watch(key)?;
        Ok(Subscription {
            key,
            rx,
            _marker: PhantomData,
        })
    }
}

/// Foreign updates to one record
pub struct Subscription<T> {
    key: RecordKey,
    rx: Receiver<Vec<u8>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Subscription<T> {
    pub fn key(&self) -> RecordKey {
        self.key
    }

    /// Drain pending updates and return the most recent valid one
    ///
    /// Payloads that do not parse as a sequence are ignored.
    pub fn try_latest(&self) -> Option<Vec<T>> {
        let mut latest = None;
        for bytes in self.rx.try_iter() {
            if let Some(items) = self.decode(&bytes) {
                latest = Some(items);
            }
        }
        latest
    }

    /// Wait up to `timeout` for the next valid update
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Vec<T>> {
        let deadline = Instant::now() + timeout;
        loop {
            let bytes = self.rx.recv_deadline(deadline).ok()?;
            if let Some(items) = self.decode(&bytes) {
                return Some(items);
            }
        }
    }

    fn decode(&self, bytes: &[u8]) -> Option<Vec<T>> {
        let items = decode_sequence(self.key, bytes);
        if items.is_none() {
            debug!("Ignoring malformed external update to {}", self.key);
        }
        items
    }
}

/// Parse `bytes` as a JSON array of `T`
///
/// `None` if the payload is not an array at all; undecodable elements are
/// dropped individually.
fn decode_sequence<T: DeserializeOwned>(key: RecordKey, bytes: &[u8]) -> Option<Vec<T>> {
    let Ok(Value::Array(values)) = serde_json::from_slice::<Value>(bytes) else {
        return None;
    };

    let total = values.len();
    let items: Vec<T> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping entry {} of {}: {}", index, key, e);
                None
            }
        })
        .collect();

    if items.len() < total {
        warn!("Dropped {} undecodable entries from {}", total - items.len(), key);
    }
    Some(items)
}
