//! Backup export and import
//!
//! A backup is a single JSON object holding every rating and collection:
//!
//! ```json
//! { "version": 1, "exportedAt": 1700000000000, "ratings": [], "collections": [] }
//! ```
//!
//! Importing either replaces the store's contents or merges the snapshot
//! into them by id. Neither mode repairs membership ids that point at
//! ratings the snapshot does not contain.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{now_millis, Collection, Rating};
use crate::storage::file::atomic_write;
use crate::storage::{Backend, StorageResult};
use crate::store::Store;

/// Schema version written into every export
pub const SNAPSHOT_VERSION: u64 = 1;

/// How an import combines the snapshot with existing data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Keep everything and add entities with unknown ids
    #[default]
    Merge,
    /// Discard existing data
    Replace,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Merge => "merge",
            ImportMode::Replace => "replace",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown import mode '{0}' (expected 'merge' or 'replace')")]
pub struct UnknownImportMode(pub String);

impl FromStr for ImportMode {
    type Err = UnknownImportMode;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "merge" => Ok(ImportMode::Merge),
            "replace" => Ok(ImportMode::Replace),
            _ => Err(UnknownImportMode(s.to_string())),
        }
    }
}

/// Portable copy of all data
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub exported_at: DateTime<Utc>,
    pub ratings: Vec<Rating>,
    pub collections: Vec<Collection>,
}

impl Snapshot {
    /// Parse a backup file's contents
    ///
    /// Only `version` and `ratings` are required. A missing `exportedAt`
    /// reads as the epoch; a missing or null `collections` as empty.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| Error::format(format!("not JSON ({})", e)))?;
        let Value::Object(object) = value else {
            return Err(Error::format("expected a JSON object"));
        };

        let version = match object.get("version") {
            Some(v) if is_truthy(v) => v.as_u64().unwrap_or(SNAPSHOT_VERSION),
            _ => return Err(Error::format("missing version")),
        };

        let ratings = match object.get("ratings") {
            Some(Value::Array(items)) => decode_all::<Rating>("rating", items)?,
            _ => return Err(Error::format("ratings must be a list")),
        };

        let collections = match object.get("collections") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => decode_all::<Collection>("collection", items)?,
            Some(_) => return Err(Error::format("collections must be a list")),
        };

        Ok(Self {
            version,
            exported_at: exported_at(&object),
            ratings,
            collections,
        })
    }

    /// JSON with two-space indentation, as written to backup files
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Name of the backup file for this snapshot's export date
    pub fn file_name(&self) -> String {
        backup_file_name(self.exported_at.date_naive())
    }
}

/// Parse a backup file's contents
pub fn parse_snapshot(text: &str) -> Result<Snapshot> {
    Snapshot::parse(text)
}

/// JavaScript-style truthiness of a JSON value
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn exported_at(object: &Map<String, Value>) -> DateTime<Utc> {
    object
        .get("exportedAt")
        .and_then(Value::as_i64)
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or(DateTime::UNIX_EPOCH)
}

fn decode_all<T: DeserializeOwned>(what: &str, items: &[Value]) -> Result<Vec<T>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            T::deserialize(item)
                .map_err(|e| Error::format(format!("{} {} is invalid: {}", what, index + 1, e)))
        })
        .collect()
}

/// Capture the store's current contents
pub fn export<B: Backend>(store: &Store<B>) -> Snapshot {
    Snapshot {
        version: SNAPSHOT_VERSION,
        exported_at: now_millis(),
        ratings: store.ratings().to_vec(),
        collections: store.collections().to_vec(),
    }
}

/// `quette-backup-YYYY-MM-DD.json`
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("quette-backup-{}.json", date.format("%Y-%m-%d"))
}

/// Export the store into `dir` and return the written file's path
pub fn write_backup<B: Backend>(store: &Store<B>, dir: &Path) -> StorageResult<PathBuf> {
    let snapshot = export(store);
    let path = dir.join(snapshot.file_name());
    let json = snapshot.to_json_pretty()?;
    atomic_write(&path, json.as_bytes())?;

    info!(
        "Exported {} ratings and {} collections to {:?}",
        snapshot.ratings.len(),
        snapshot.collections.len(),
        path
    );
    Ok(path)
}

/// Outcome of an import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub mode: ImportMode,
    /// New ratings for a merge; the total held after a replace
    pub ratings_added: usize,
    /// New collections for a merge; the total held after a replace
    pub collections_added: usize,
}

impl ImportReport {
    /// One-line summary for the user
    pub fn status_message(&self) -> String {
        match self.mode {
            ImportMode::Merge => format!(
                "Merged {} ratings and {} collections.",
                self.ratings_added, self.collections_added
            ),
            ImportMode::Replace => "Data replaced.".to_string(),
        }
    }
}

/// Apply a parsed snapshot to the store
pub fn import<B: Backend>(
    store: &mut Store<B>,
    snapshot: Snapshot,
    mode: ImportMode,
) -> Result<ImportReport> {
    let (ratings_added, collections_added) = match mode {
        ImportMode::Replace => {
            let counts = (snapshot.ratings.len(), snapshot.collections.len());
            store.replace_all(snapshot.ratings, snapshot.collections)?;
            counts
        }
        ImportMode::Merge => {
            let ratings = unseen(
                store.ratings().iter().map(|r| r.id.as_str()),
                snapshot.ratings,
                |r| &r.id,
            );
            let collections = unseen(
                store.collections().iter().map(|c| c.id.as_str()),
                snapshot.collections,
                |c| &c.id,
            );
            let counts = (ratings.len(), collections.len());
            store.append(ratings, collections)?;
            counts
        }
    };

    let report = ImportReport {
        mode,
        ratings_added,
        collections_added,
    };
    info!("Import ({}): {}", mode, report.status_message());
    Ok(report)
}

/// Parse `text` and import it; a malformed file leaves the store untouched
pub fn import_str<B: Backend>(
    store: &mut Store<B>,
    text: &str,
    mode: ImportMode,
) -> Result<ImportReport> {
    let snapshot = Snapshot::parse(text)?;
    debug!(
        "Parsed backup v{} with {} ratings and {} collections",
        snapshot.version,
        snapshot.ratings.len(),
        snapshot.collections.len()
    );
    import(store, snapshot, mode)
}

/// Entities whose id is neither in `existing` nor earlier in `incoming`
fn unseen<'a, T>(
    existing: impl Iterator<Item = &'a str>,
    incoming: Vec<T>,
    id: impl Fn(&T) -> &String,
) -> Vec<T> {
    let mut seen: HashSet<String> = existing.map(str::to_string).collect();
    incoming
        .into_iter()
        .filter(|item| seen.insert(id(item).clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaType, RatingDraft};
    use crate::storage::MemoryBackend;
    use rstest::rstest;
    use tempfile::TempDir;

    fn store() -> Store<MemoryBackend> {
        Store::open_with_backend(MemoryBackend::new())
    }

    fn draft(title: &str) -> RatingDraft {
        RatingDraft::new()
            .with_title(title)
            .with_flavor("Diavola")
            .with_ingredients(["salame"])
    }

    fn rating_json(id: &str, title: &str) -> String {
        format!(
            r#"{{"id":"{id}","title":"{title}","type":"film","slices":7,"flavor":"Capricciosa","ingredients":["funghi"],"createdAt":1700000000000}}"#
        )
    }

    fn backup_json(ratings: &[String], collections: &str) -> String {
        format!(
            r#"{{"version":1,"exportedAt":1700000000000,"ratings":[{}],"collections":{}}}"#,
            ratings.join(","),
            collections
        )
    }

    #[test]
    fn test_import_mode_parse() {
        assert_eq!("merge".parse::<ImportMode>().unwrap(), ImportMode::Merge);
        assert_eq!(" Replace ".parse::<ImportMode>().unwrap(), ImportMode::Replace);
        assert!("overwrite".parse::<ImportMode>().is_err());
        assert_eq!(ImportMode::default(), ImportMode::Merge);
    }

    #[test]
    fn test_export_shape() {
        let mut store = store();
        store.add_rating(&draft("Heat")).unwrap();
        store.add_collection("Crime").unwrap();

        let snapshot = export(&store);
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.ratings, store.ratings());
        assert_eq!(snapshot.collections, store.collections());

        let json = snapshot.to_json_pretty().unwrap();
        assert!(json.starts_with("{\n  \"version\": 1,\n  \"exportedAt\": "));
        let value: Value = serde_json::from_str(&json).unwrap();
        assert!(value["exportedAt"].is_i64());
        assert_eq!(value["ratings"][0]["title"], "Heat");
        assert_eq!(value["collections"][0]["ratingIds"], Value::Array(vec![]));
    }

    #[test]
    fn test_backup_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(backup_file_name(date), "quette-backup-2024-03-09.json");
    }

    #[test]
    fn test_write_backup() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store();
        store.add_rating(&draft("Ronin")).unwrap();

        let path = write_backup(&store, temp_dir.path()).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("quette-backup-"));
        assert!(name.ends_with(".json"));

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed = Snapshot::parse(&text).unwrap();
        assert_eq!(parsed.ratings, store.ratings());
    }

    #[rstest]
    #[case::array("[]")]
    #[case::string("\"backup\"")]
    #[case::not_json("{oops")]
    #[case::missing_version(r#"{"ratings":[]}"#)]
    #[case::null_version(r#"{"version":null,"ratings":[]}"#)]
    #[case::zero_version(r#"{"version":0,"ratings":[]}"#)]
    #[case::false_version(r#"{"version":false,"ratings":[]}"#)]
    #[case::empty_string_version(r#"{"version":"","ratings":[]}"#)]
    #[case::missing_ratings(r#"{"version":1}"#)]
    #[case::object_ratings(r#"{"version":1,"ratings":{}}"#)]
    #[case::object_collections(r#"{"version":1,"ratings":[],"collections":{}}"#)]
    #[case::bad_rating(r#"{"version":1,"ratings":[{"id":"x"}]}"#)]
    #[case::bad_type(r#"{"version":1,"ratings":[{"id":"x","title":"t","type":"podcast","slices":1,"flavor":"f","ingredients":["a"],"createdAt":1}]}"#)]
    fn test_parse_rejects(#[case] text: &str) {
        let err = Snapshot::parse(text).unwrap_err();
        assert!(matches!(err, Error::Format(_)), "{text}: {err}");
    }

    #[rstest]
    #[case::number("1")]
    #[case::future_number("2")]
    #[case::string("\"1\"")]
    #[case::boolean("true")]
    #[case::object("{}")]
    fn test_parse_accepts_truthy_version(#[case] version: &str) {
        let text = format!(r#"{{"version":{version},"ratings":[]}}"#);
        let snapshot = Snapshot::parse(&text).unwrap();
        assert!(snapshot.ratings.is_empty());
        assert!(snapshot.collections.is_empty());
        assert_eq!(snapshot.exported_at, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_parse_legacy_type_names() {
        let text = r#"{"version":1,"ratings":[{"id":"a","title":"Halo","type":"videogiochi","slices":8,"flavor":"f","ingredients":["x"],"createdAt":5}],"collections":null}"#;
        let snapshot = Snapshot::parse(text).unwrap();
        assert_eq!(snapshot.ratings[0].media_type, MediaType::Game);
    }

    #[test]
    fn test_replace() {
        let mut store = store();
        store.add_rating(&draft("Old")).unwrap();
        store.add_collection("Old").unwrap();

        let text = backup_json(&[rating_json("n1", "New")], "[]");
        let report = import_str(&mut store, &text, ImportMode::Replace).unwrap();

        assert_eq!(report.status_message(), "Data replaced.");
        assert_eq!(store.ratings().len(), 1);
        assert_eq!(store.ratings()[0].id, "n1");
        assert!(store.collections().is_empty());
    }

    #[test]
    fn test_replace_without_collections_clears_them() {
        let mut store = store();
        store.add_collection("Gone").unwrap();

        let text = r#"{"version":1,"ratings":[]}"#;
        import_str(&mut store, text, ImportMode::Replace).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_merge_keeps_existing_on_collision() {
        let mut store = store();
        let existing = store.add_rating(&draft("Mine")).unwrap();

        let text = backup_json(
            &[rating_json(&existing.id, "Theirs"), rating_json("new", "Fresh")],
            r#"[{"id":"c1","name":"Imported","ratingIds":["new"],"createdAt":1}]"#,
        );
        let report = import_str(&mut store, &text, ImportMode::Merge).unwrap();

        assert_eq!(report.ratings_added, 1);
        assert_eq!(report.collections_added, 1);
        assert_eq!(report.status_message(), "Merged 1 ratings and 1 collections.");
        assert_eq!(store.rating(&existing.id).unwrap().title, "Mine");
        assert_eq!(store.ratings()[0].id, existing.id);
        assert_eq!(store.ratings()[1].id, "new");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut store = store();
        let text = backup_json(&[rating_json("a", "A"), rating_json("b", "B")], "[]");

        import_str(&mut store, &text, ImportMode::Merge).unwrap();
        let report = import_str(&mut store, &text, ImportMode::Merge).unwrap();

        assert_eq!(report.ratings_added, 0);
        assert_eq!(store.ratings().len(), 2);
    }

    #[test]
    fn test_merge_dedups_within_snapshot() {
        let mut store = store();
        let text = backup_json(&[rating_json("a", "First"), rating_json("a", "Second")], "[]");

        let report = import_str(&mut store, &text, ImportMode::Merge).unwrap();
        assert_eq!(report.ratings_added, 1);
        assert_eq!(store.rating("a").unwrap().title, "First");
    }

    #[test]
    fn test_merge_keeps_dangling_membership() {
        let mut store = store();
        let text = backup_json(
            &[],
            r#"[{"id":"c1","name":"Partial","ratingIds":["missing"],"createdAt":1}]"#,
        );

        import_str(&mut store, &text, ImportMode::Merge).unwrap();
        assert_eq!(store.dangling_references().len(), 1);
    }

    #[test]
    fn test_format_error_leaves_store_unchanged() {
        let mut store = store();
        let rating = store.add_rating(&draft("Safe")).unwrap();

        let err = import_str(&mut store, r#"{"version":1,"ratings":"x"}"#, ImportMode::Replace)
            .unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        assert_eq!(store.ratings(), &[rating]);
    }

    #[test]
    fn test_import_persists() {
        let mut store = store();
        let text = backup_json(&[rating_json("a", "A")], "[]");
        import_str(&mut store, &text, ImportMode::Merge).unwrap();

        let reopened = Store::open_with_backend(store.backend().connect());
        assert_eq!(reopened.ratings(), store.ratings());
    }
}
