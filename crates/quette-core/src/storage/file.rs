//! Directory-backed record storage
//!
//! Each record is a JSON file in the data directory:
//!
//! - `quette.pizzaVotes.json` - the ratings
//! - `quette.collections.json` - the collections
//!
//! Writes are atomic (write to temp file, then rename) so a reader never
//! sees a partially-written record. Other processes pointed at the same
//! directory are detected through a filesystem watcher.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{unbounded, Receiver, Sender};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::backend::{Backend, RecordKey};
use super::error::{StorageError, StorageResult};

/// Last payload seen per record, written by us or delivered to us
type Seen = Arc<Mutex<HashMap<RecordKey, Vec<u8>>>>;

type Subscribers = Arc<Mutex<Vec<(RecordKey, Sender<Vec<u8>>)>>>;

struct DirWatch {
    _watcher: RecommendedWatcher,
    subscribers: Subscribers,
}

/// Record storage in a data directory
pub struct FileBackend {
    dir: PathBuf,
    seen: Seen,
    watch: Mutex<Option<DirWatch>>,
}

impl FileBackend {
    /// Open (and create if needed) the data directory
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDirectory {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            seen: Arc::new(Mutex::new(HashMap::new())),
            watch: Mutex::new(None),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`
    pub fn record_path(&self, key: RecordKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Record `bytes` as the last payload for `key`, returning the previous one
    fn remember(&self, key: RecordKey, bytes: &[u8]) -> Option<Vec<u8>> {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        seen.insert(key, bytes.to_vec())
    }

    fn forget(&self, key: RecordKey, previous: Option<Vec<u8>>) {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        match previous {
            Some(bytes) => seen.insert(key, bytes),
            None => seen.remove(&key),
        };
    }

    fn start_watch(&self) -> StorageResult<DirWatch> {
        let subscribers: Subscribers = Arc::new(Mutex::new(Vec::new()));
        let handler = ChangeHandler {
            dir: self.dir.clone(),
            seen: Arc::clone(&self.seen),
            subscribers: Arc::clone(&subscribers),
        };

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => handler.handle(&event),
                Err(e) => warn!("Watch error: {}", e),
            }
        })?;
        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;
        debug!("Watching {:?} for external changes", self.dir);

        Ok(DirWatch {
            _watcher: watcher,
            subscribers,
        })
    }
}

impl Backend for FileBackend {
    fn read(&self, key: RecordKey) -> StorageResult<Option<Vec<u8>>> {
        let path = self.record_path(key);
        match fs::read(&path) {
            Ok(bytes) => {
                self.remember(key, &bytes);
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::ReadError { path, source }),
        }
    }

    fn write(&self, key: RecordKey, bytes: &[u8]) -> StorageResult<()> {
        // Recorded first so the watcher recognises our own rename
        let previous = self.remember(key, bytes);
        let result = atomic_write(&self.record_path(key), bytes);
        if result.is_err() {
            self.forget(key, previous);
        }
        result
    }

    fn watch(&self, key: RecordKey) -> StorageResult<Receiver<Vec<u8>>> {
        let mut guard = self.watch.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            *guard = Some(self.start_watch()?);
        }

        let (tx, rx) = unbounded();
        if let Some(watch) = guard.as_ref() {
            watch
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((key, tx));
        }
        Ok(rx)
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Runs on the watcher thread; forwards foreign record changes
struct ChangeHandler {
    dir: PathBuf,
    seen: Seen,
    subscribers: Subscribers,
}

impl ChangeHandler {
    fn handle(&self, event: &Event) {
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_)
        ) {
            return;
        }

        for key in RecordKey::ALL {
            let file_name = key.file_name();
            let touched = event
                .paths
                .iter()
                .any(|p| p.file_name().is_some_and(|name| name == file_name.as_str()));
            if touched {
                self.forward(key);
            }
        }
    }

    fn forward(&self, key: RecordKey) {
        let Ok(bytes) = fs::read(self.dir.join(key.file_name())) else {
            return;
        };

        {
            let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
            if seen.get(&key).is_some_and(|last| *last == bytes) {
                return;
            }
            seen.insert(key, bytes.clone());
        }

        debug!("External change to {}", key);
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|(k, tx)| *k != key || tx.send(bytes.clone()).is_ok());
    }
}

/// Write data to a file atomically
///
/// 1. Write to a uniquely named temp file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// Concurrent writers each get their own temp file; the last rename wins.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
        path: parent.to_path_buf(),
        source,
    })?;

    let mut temp =
        NamedTempFile::new_in(parent).map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;
    let temp_path = temp.path().to_path_buf();

    temp.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    temp.persist(path)
        .map_err(|e| StorageError::AtomicWriteFailed {
            from: temp_path,
            to: path.to_path_buf(),
            source: e.error,
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::open(temp_dir.path()).unwrap();

        assert!(backend.read(RecordKey::Ratings).unwrap().is_none());

        backend.write(RecordKey::Ratings, b"[1,2]").unwrap();
        assert_eq!(backend.read(RecordKey::Ratings).unwrap().unwrap(), b"[1,2]");
        assert!(backend.record_path(RecordKey::Ratings).exists());
        assert!(!backend.record_path(RecordKey::Ratings).with_extension("tmp").exists());
    }

    #[test]
    fn test_concurrent_writers_never_fail() {
        let temp_dir = TempDir::new().unwrap();
        let first = FileBackend::open(temp_dir.path()).unwrap();
        let second = FileBackend::open(temp_dir.path()).unwrap();
        let a = vec![b'a'; 64 * 1024];
        let b = vec![b'b'; 64 * 1024];

        std::thread::scope(|scope| {
            let writers = [(&first, &a), (&second, &b)].map(|(backend, payload)| {
                scope.spawn(move || {
                    (0..100)
                        .filter(|_| backend.write(RecordKey::Ratings, payload).is_err())
                        .count()
                })
            });
            for writer in writers {
                assert_eq!(writer.join().unwrap(), 0);
            }
        });

        let on_disk = first.read(RecordKey::Ratings).unwrap().unwrap();
        assert!(on_disk == a || on_disk == b);

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name.to_str() != Some(RecordKey::Ratings.file_name().as_str()))
            .collect();
        assert!(leftovers.is_empty(), "stray files: {:?}", leftovers);
    }

    #[test]
    fn test_failed_write_keeps_last_seen() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::open(temp_dir.path()).unwrap();
        backend.write(RecordKey::Ratings, b"[1]").unwrap();

        // A directory in place of the record makes the rename fail
        let path = backend.record_path(RecordKey::Ratings);
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(backend.write(RecordKey::Ratings, b"[2]").is_err());
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.get(&RecordKey::Ratings).map(Vec::as_slice), Some(&b"[1]"[..]));
    }

    #[test]
    fn test_open_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");

        let backend = FileBackend::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(backend.dir(), nested.as_path());
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("x").join("y").join("file.json");

        atomic_write(&nested_path, b"test data").unwrap();

        let content = fs::read_to_string(&nested_path).unwrap();
        assert_eq!(content, "test data");
    }

    #[test]
    fn test_second_process_sees_same_files() {
        let temp_dir = TempDir::new().unwrap();
        let first = FileBackend::open(temp_dir.path()).unwrap();
        let second = FileBackend::open(temp_dir.path()).unwrap();

        first.write(RecordKey::Collections, b"[]").unwrap();
        assert_eq!(second.read(RecordKey::Collections).unwrap().unwrap(), b"[]");
    }

    #[test]
    fn test_watch_ignores_own_writes() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::open(temp_dir.path()).unwrap();
        let rx = backend.watch(RecordKey::Ratings).unwrap();

        backend.write(RecordKey::Ratings, b"[]").unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[test]
    fn test_watch_delivers_foreign_write() {
        let temp_dir = TempDir::new().unwrap();
        let ours = FileBackend::open(temp_dir.path()).unwrap();
        let theirs = FileBackend::open(temp_dir.path()).unwrap();
        let rx = ours.watch(RecordKey::Ratings).unwrap();

        theirs.write(RecordKey::Ratings, b"[42]").unwrap();

        let payload = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(payload, b"[42]");
    }
}
