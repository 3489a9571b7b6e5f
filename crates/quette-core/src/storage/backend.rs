//! Durable key/value backends
//!
//! A backend stores the raw bytes of the two named records and tells each
//! execution context when *another* context has rewritten one of them. It
//! knows nothing about ratings or collections.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::error::{StorageError, StorageResult};

/// The two records kept in the durable store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Ratings,
    Collections,
}

impl RecordKey {
    pub const ALL: [RecordKey; 2] = [RecordKey::Ratings, RecordKey::Collections];

    /// Record name shared by every client of the store
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKey::Ratings => "quette.pizzaVotes",
            RecordKey::Collections => "quette.collections",
        }
    }

    /// File name used by [`FileBackend`](super::FileBackend)
    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte-level storage for named records
pub trait Backend {
    /// Read a record; `Ok(None)` when it has never been written
    fn read(&self, key: RecordKey) -> StorageResult<Option<Vec<u8>>>;

    /// Overwrite a record
    fn write(&self, key: RecordKey, bytes: &[u8]) -> StorageResult<()>;

    /// Receive payloads written to `key` by other contexts
    ///
    /// Writes made through this backend instance are never delivered back
    /// to it.
    fn watch(&self, key: RecordKey) -> StorageResult<Receiver<Vec<u8>>>;

    /// Where the records live, for status output
    fn location(&self) -> String;
}

struct MemoryWatcher {
    context: u64,
    key: RecordKey,
    tx: Sender<Vec<u8>>,
}

#[derive(Default)]
struct MemoryShared {
    records: HashMap<RecordKey, Vec<u8>>,
    watchers: Vec<MemoryWatcher>,
    next_context: u64,
}

/// In-process backend shared between simulated contexts
///
/// Each [`MemoryBackend::connect`] call yields a new context attached to the
/// same records, the way several windows share one browser store.
pub struct MemoryBackend {
    context: u64,
    shared: Arc<Mutex<MemoryShared>>,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::attach(Arc::new(Mutex::new(MemoryShared::default())))
    }

    /// Open another context on the same records
    pub fn connect(&self) -> Self {
        Self::attach(Arc::clone(&self.shared))
    }

    fn attach(shared: Arc<Mutex<MemoryShared>>) -> Self {
        let context = {
            let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
            guard.next_context += 1;
            guard.next_context
        };
        Self {
            context,
            shared,
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write from this context fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn read(&self, key: RecordKey) -> StorageResult<Option<Vec<u8>>> {
        let guard = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.records.get(&key).cloned())
    }

    fn write(&self, key: RecordKey, bytes: &[u8]) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!(
                "quota exceeded while writing '{}'",
                key
            )));
        }

        let mut guard = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        let unchanged = guard.records.get(&key).is_some_and(|old| old == bytes);
        guard.records.insert(key, bytes.to_vec());
        if unchanged {
            return Ok(());
        }

        let context = self.context;
        guard.watchers.retain(|w| {
            if w.context == context || w.key != key {
                return true;
            }
            w.tx.send(bytes.to_vec()).is_ok()
        });
        Ok(())
    }

    fn watch(&self, key: RecordKey) -> StorageResult<Receiver<Vec<u8>>> {
        let (tx, rx) = unbounded();
        let mut guard = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        guard.watchers.push(MemoryWatcher {
            context: self.context,
            key,
            tx,
        });
        Ok(rx)
    }

    fn location(&self) -> String {
        format!("memory (context {})", self.context)
    }
}
