//! End-to-end behaviour of the store, backups and queries

use std::thread;
use std::time::{Duration, Instant};

use quette_core::backup::{self, ImportMode};
use quette_core::models::RatingDraft;
use quette_core::query::{self, RatingQuery, SortKey};
use quette_core::{Config, Error, MediaType, MemoryBackend, Store};
use tempfile::TempDir;

fn memory_store() -> Store<MemoryBackend> {
    Store::open_with_backend(MemoryBackend::new())
}

fn draft(title: &str, slices: u8) -> RatingDraft {
    RatingDraft::new()
        .with_title(title)
        .with_slices(slices)
        .with_flavor("Bufalina")
        .with_ingredients(["mozzarella", "basilico"])
}

#[test]
fn add_rating_scenario() {
    let mut store = memory_store();
    let draft = RatingDraft::new()
        .with_title("Dune")
        .with_media_type(MediaType::Film)
        .with_slices(8)
        .with_flavor("Spice")
        .with_ingredients(["sabbia"]);

    let rating = store.add_rating(&draft).unwrap();

    assert!(!rating.id.is_empty());
    assert_eq!(rating.slices, 8);
    assert_eq!(rating.ingredients, vec!["sabbia".to_string()]);
    assert_eq!(store.ratings().len(), 1);
}

#[test]
fn storage_order_is_newest_first_and_views_sort_independently() {
    let mut store = memory_store();
    let titles = ["b", "d", "a", "c", "e"];
    let mut created = Vec::new();
    for (i, title) in titles.iter().enumerate() {
        created.push(store.add_rating(&draft(title, (i * 3 % 11) as u8)).unwrap());
    }

    let stored: Vec<_> = store.ratings().iter().map(|r| r.id.clone()).collect();
    let expected: Vec<_> = created.iter().rev().map(|r| r.id.clone()).collect();
    assert_eq!(stored, expected);

    // Views must not depend on storage order
    let mut shuffled = store.ratings().to_vec();
    shuffled.swap(0, 4);
    shuffled.swap(1, 3);

    let recent = query::recent(&shuffled, 3);
    assert!(recent
        .windows(2)
        .all(|w| w[0].created_at >= w[1].created_at));
    assert_eq!(recent.len(), 3);

    let oldest = query::filter_and_sort(&shuffled, &RatingQuery::new().with_sort(SortKey::Oldest));
    assert!(oldest.windows(2).all(|w| w[0].created_at <= w[1].created_at));

    let by_title =
        query::filter_and_sort(&shuffled, &RatingQuery::new().with_sort(SortKey::TitleAsc));
    let sorted_titles: Vec<_> = by_title.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(sorted_titles, vec!["a", "b", "c", "d", "e"]);
}

#[test]
fn deleting_a_rating_clears_every_membership() {
    let mut store = memory_store();
    let ratings: Vec<_> = (0..4)
        .map(|i| store.add_rating(&draft(&format!("R{i}"), 5)).unwrap())
        .collect();
    let collections: Vec<_> = (0..3)
        .map(|i| store.add_collection(&format!("C{i}")).unwrap())
        .collect();

    // Every combination of memberships across the collections
    for (ci, collection) in collections.iter().enumerate() {
        for (ri, rating) in ratings.iter().enumerate() {
            if (ci + ri) % 2 == 0 || ri == 0 {
                store.toggle_membership(&collection.id, &rating.id).unwrap();
            }
        }
    }

    for rating in &ratings {
        store.delete_rating(&rating.id).unwrap();
        assert!(store.rating(&rating.id).is_none());
        for collection in store.collections() {
            assert!(!collection.contains(&rating.id));
        }
        assert!(store.dangling_references().is_empty());
    }
}

#[test]
fn delete_rating_scenario() {
    let mut store = memory_store();
    let r1 = store.add_rating(&draft("R1", 4)).unwrap();
    let c1 = store.add_collection("C1").unwrap();
    store.toggle_membership(&c1.id, &r1.id).unwrap();

    store.delete_rating(&r1.id).unwrap();

    assert!(!store.collection(&c1.id).unwrap().contains(&r1.id));
    assert!(store.ratings().iter().all(|r| r.id != r1.id));
}

#[test]
fn export_then_replace_round_trips() {
    let mut original = memory_store();
    let a = original.add_rating(&draft("Arrival", 9)).unwrap();
    let b = original.add_rating(&draft("Blade Runner", 10)).unwrap();
    let c = original.add_collection("Sci-fi").unwrap();
    original.toggle_membership(&c.id, &a.id).unwrap();
    original.toggle_membership(&c.id, &b.id).unwrap();
    original.add_collection("Empty").unwrap();

    let json = backup::export(&original).to_json_pretty().unwrap();

    let mut fresh = memory_store();
    backup::import_str(&mut fresh, &json, ImportMode::Replace).unwrap();

    assert_eq!(fresh.ratings(), original.ratings());
    assert_eq!(fresh.collections(), original.collections());
}

#[test]
fn merge_twice_equals_merge_once() {
    let mut source = memory_store();
    source.add_rating(&draft("One", 1)).unwrap();
    source.add_rating(&draft("Two", 2)).unwrap();
    source.add_collection("Both").unwrap();
    let snapshot = backup::export(&source);

    let mut target = memory_store();
    target.add_rating(&draft("Local", 7)).unwrap();

    backup::import(&mut target, snapshot.clone(), ImportMode::Merge).unwrap();
    let once = (target.ratings().to_vec(), target.collections().to_vec());

    let report = backup::import(&mut target, snapshot, ImportMode::Merge).unwrap();
    assert_eq!(report.ratings_added, 0);
    assert_eq!(report.collections_added, 0);
    assert_eq!(target.ratings(), once.0.as_slice());
    assert_eq!(target.collections(), once.1.as_slice());
}

#[test]
fn merge_collision_keeps_existing_entry() {
    let mut store = memory_store();
    let existing = store.add_rating(&draft("Existing", 3)).unwrap();

    let text = format!(
        r#"{{"version":1,"ratings":[{{"id":"{}","title":"Other","type":"book","slices":1,"flavor":"x","ingredients":["y"],"createdAt":1}}]}}"#,
        existing.id
    );
    let report = backup::import_str(&mut store, &text, ImportMode::Merge).unwrap();

    assert_eq!(report.ratings_added, 0);
    assert_eq!(store.rating(&existing.id).unwrap(), &existing);
}

#[test]
fn malformed_import_fails_without_changes() {
    let mut store = memory_store();
    store.add_rating(&draft("Kept", 6)).unwrap();
    let before = store.ratings().to_vec();

    let err = backup::import_str(
        &mut store,
        r#"{"version":1,"ratings":"not-an-array"}"#,
        ImportMode::Replace,
    )
    .unwrap_err();

    assert!(matches!(err, Error::Format(_)));
    assert_eq!(store.ratings(), before.as_slice());
}

#[test]
fn draft_ingredient_dedup() {
    let mut draft = RatingDraft::new();
    draft.add_ingredient("Funghi");
    draft.add_ingredient("funghi ");
    assert_eq!(draft.ingredients, vec!["Funghi".to_string()]);
}

#[test]
fn file_store_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config {
        data_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };

    {
        let mut store = Store::open_with_config(&config).unwrap();
        let rating = store.add_rating(&draft("Heat", 8)).unwrap();
        let collection = store.add_collection("Mann").unwrap();
        store.toggle_membership(&collection.id, &rating.id).unwrap();
    }

    let store = Store::open_with_config(&config).unwrap();
    assert_eq!(store.ratings().len(), 1);
    assert_eq!(store.collections()[0].rating_ids, vec![store.ratings()[0].id.clone()]);
}

#[test]
fn corrupt_file_opens_empty() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config {
        data_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    std::fs::write(
        config.record_path(quette_core::RecordKey::Ratings),
        "{\"not\":\"a list\"}",
    )
    .unwrap();

    let mut store = Store::open_with_config(&config).unwrap();
    assert!(store.ratings().is_empty());

    // The store stays usable and overwrites the bad record
    store.add_rating(&draft("Fresh", 5)).unwrap();
    let reopened = Store::open_with_config(&config).unwrap();
    assert_eq!(reopened.ratings().len(), 1);
}

#[test]
fn file_stores_see_each_others_writes() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config {
        data_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };

    let mut ours = Store::open_with_config(&config).unwrap();
    let mut theirs = Store::open_with_config(&config).unwrap();

    let rating = theirs.add_rating(&draft("Elsewhere", 7)).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while !ours.sync_external().ratings_replaced {
        assert!(Instant::now() < deadline, "external write never arrived");
        thread::sleep(Duration::from_millis(20));
    }

    assert_eq!(ours.ratings(), &[rating]);
}

#[test]
fn memory_contexts_follow_last_writer() {
    let mut first = memory_store();
    let mut second = Store::open_with_backend(first.backend().connect());

    first.add_rating(&draft("First", 1)).unwrap();
    second.add_rating(&draft("Second", 2)).unwrap();

    // `second` never saw `first`'s write, so its record wins wholesale
    first.sync_external();
    assert_eq!(first.ratings().len(), 1);
    assert_eq!(first.ratings()[0].title, "Second");
}
