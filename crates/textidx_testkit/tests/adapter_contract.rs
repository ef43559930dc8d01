//! Contract tests for the full-text index adapter.

use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use textidx_core::{
    CollectionId, FullTextIndex, IndexDefinition, IndexError, IndexKey, MemorySearchEngine,
    MultiValueIndex, NoopProgress, RecordId, RecordSet, SearchEngine,
};
use textidx_testkit::prelude::*;

fn rid() -> RecordId {
    RecordId::random(CollectionId::new(7))
}

fn recording_index(engine: RecordingEngine) -> FullTextIndex<RecordingEngine> {
    init_tracing();
    scenarios::title_index(engine, scenarios::articles(0), false)
}

#[test]
fn metadata_is_the_first_engine_call() {
    let index = recording_index(RecordingEngine::new());
    let events = index.engine().events();
    assert_eq!(
        events.first(),
        Some(&EngineEvent::MetadataSet(scenarios::standard_metadata()))
    );
}

#[test]
fn managed_index_is_set_before_storage_is_created() {
    let index = recording_index(RecordingEngine::new());
    let events = index.engine().events();

    let managed = events
        .iter()
        .position(|e| matches!(e, EngineEvent::ManagedIndexSet { .. }))
        .expect("managed index never set");
    let created = events
        .iter()
        .position(|e| matches!(e, EngineEvent::Created { .. }))
        .expect("storage never created");
    assert!(managed < created);

    assert_eq!(
        events[managed],
        EngineEvent::ManagedIndexSet {
            id: index.base().id(),
            name: scenarios::TITLE_INDEX.to_string(),
        }
    );
}

#[test]
fn absent_key_put_does_not_reach_engine() {
    let index = recording_index(RecordingEngine::new());
    let before = index.engine().events().len();

    let returned = index.put(None, rid()).unwrap();

    assert!(std::ptr::eq(returned, &index));
    assert_eq!(index.engine().events().len(), before);
    assert_eq!(index.base().modification_lock().active_writers(), 0);
}

#[test]
fn put_sends_one_singleton_set() {
    let index = recording_index(RecordingEngine::new());
    let r = rid();

    index.put(Some("Rust".into()), r).unwrap();

    let puts = index.engine().puts();
    assert_eq!(puts, vec![(IndexKey::from("rust"), RecordSet::from([r]))]);
}

#[test]
fn repeated_puts_each_send_a_fresh_set() {
    let index = recording_index(RecordingEngine::new());
    let (a, b) = (rid(), rid());

    index
        .put(Some("lock".into()), a)
        .unwrap()
        .put(Some("LOCK".into()), b)
        .unwrap();

    let puts = index.engine().puts();
    assert_eq!(puts.len(), 2);
    assert!(puts.iter().all(|(_, refs)| refs.len() == 1));
    assert_eq!(index.engine().stored(&"lock".into()), RecordSet::from([a, b]));
}

#[test]
fn remove_reports_engine_result() {
    let index = recording_index(RecordingEngine::new());
    let r = rid();
    index.put(Some("Token".into()), r).unwrap();

    assert!(index.remove(Some("TOKEN".into()), r).unwrap());
    assert!(!index.remove(Some("token".into()), r).unwrap());
    assert!(!index.remove(None, r).unwrap());
}

#[test]
fn remove_without_targeted_support_is_false() {
    let index = recording_index(RecordingEngine::new().without_targeted_remove());
    let r = rid();
    index.put(Some("query".into()), r).unwrap();

    assert!(!index.remove(Some("query".into()), r).unwrap());
    assert!(!index
        .engine()
        .events()
        .iter()
        .any(|e| matches!(e, EngineEvent::Removed { .. })));
    assert_eq!(index.engine().stored(&"query".into()), RecordSet::from([r]));
}

#[test]
fn put_failure_propagates_and_releases_locks() {
    let index = recording_index(RecordingEngine::new());
    index.engine().fail_puts();

    let err = index.put(Some("broken".into()), rid()).unwrap_err();
    assert!(matches!(err, IndexError::Storage { .. }));

    let lock = index.base().modification_lock();
    assert_eq!(lock.active_writers(), 0);
    assert!(!lock.is_prohibited());

    index.engine().heal();
    index.put(Some("fixed".into()), rid()).unwrap();
}

#[test]
fn capability_constants() {
    let index = recording_index(RecordingEngine::new());
    assert!(!index.supports_ordered_iterations());
    assert!(index.can_be_used_in_equality_operators());
}

#[test]
fn hello_scenario_on_memory_engine() {
    init_tracing();
    let index = FullTextIndex::new(
        FullTextIndex::<MemorySearchEngine>::TYPE_ID,
        "MEMORY",
        MemorySearchEngine::new(),
        "NONE",
        json!({"analyzer": "standard"}),
    );
    index
        .create(
            scenarios::articles(0),
            "Doc.body",
            IndexDefinition::new("Doc", "body").with_collate("ci"),
            "Doc.body",
            ["docs"],
            false,
            &NoopProgress,
        )
        .unwrap();
    let r1 = rid();

    index.put(Some("Hello".into()), r1).unwrap();
    assert_eq!(index.engine().search("hello"), vec![r1]);
    assert_eq!(index.engine().search("HELLO"), vec![r1]);

    assert!(index.remove(Some("HELLO".into()), r1).unwrap());
    assert!(index.engine().search("hello").is_empty());
}

#[test]
fn create_twice_is_rejected() {
    let index = recording_index(RecordingEngine::new());
    let again = index.create(
        scenarios::articles(0),
        "Again",
        scenarios::title_definition(),
        "Again",
        [scenarios::ARTICLES],
        false,
        &NoopProgress,
    );
    assert!(matches!(again, Err(IndexError::InvalidOperation { .. })));

    let created = index
        .engine()
        .events()
        .iter()
        .filter(|e| matches!(e, EngineEvent::Created { .. }))
        .count();
    assert_eq!(created, 1);
}

#[test]
fn unknown_collate_fails_create() {
    let index = FullTextIndex::new(
        FullTextIndex::<RecordingEngine>::TYPE_ID,
        "TEST",
        RecordingEngine::new(),
        "NONE",
        scenarios::standard_metadata(),
    );
    let result = index.create(
        scenarios::articles(0),
        "Bad",
        IndexDefinition::new("Article", "title").with_collate("klingon"),
        "Bad",
        [scenarios::ARTICLES],
        false,
        &NoopProgress,
    );
    assert!(matches!(result, Err(IndexError::InvalidDefinition { .. })));
    assert!(!index.base().is_created());
    assert_eq!(index.engine().managed_name(), None);
}

#[test]
fn racing_creates_leave_engine_attached_to_the_winner() {
    let index = Arc::new(FullTextIndex::new(
        FullTextIndex::<RecordingEngine>::TYPE_ID,
        "TEST",
        RecordingEngine::new().with_attach_delay(Duration::from_millis(80)),
        "NONE",
        scenarios::standard_metadata(),
    ));

    let spawn_create = |name: &'static str, collate: &'static str| {
        let index = Arc::clone(&index);
        thread::spawn(move || {
            index
                .create(
                    scenarios::articles(0),
                    name,
                    IndexDefinition::new("Article", "title").with_collate(collate),
                    name,
                    [scenarios::ARTICLES],
                    false,
                    &NoopProgress,
                )
                .is_ok()
        })
    };

    let first = spawn_create("A", "ci");
    thread::sleep(Duration::from_millis(20));
    let second = spawn_create("B", "default");
    let (a, b) = (first.join().unwrap(), second.join().unwrap());

    assert!(a ^ b);
    let winner = index.base().name();
    assert_eq!(index.engine().managed_name(), winner);
    let attached = index
        .engine()
        .events()
        .iter()
        .filter(|e| matches!(e, EngineEvent::ManagedIndexSet { .. }))
        .count();
    assert_eq!(attached, 1);
}

#[test]
fn remove_failure_propagates_and_releases_locks() {
    let index = recording_index(RecordingEngine::new());
    let r = rid();
    index.put(Some("kept".into()), r).unwrap();
    index.engine().fail_removes();

    let err = index.remove(Some("kept".into()), r).unwrap_err();
    assert!(matches!(err, IndexError::Storage { .. }));

    let lock = index.base().modification_lock();
    assert_eq!(lock.active_writers(), 0);
    assert!(!lock.is_prohibited());

    index.put(Some("next".into()), rid()).unwrap();
    assert_eq!(index.engine().stored(&"kept".into()), RecordSet::from([r]));

    index.engine().heal();
    assert!(index.remove(Some("KEPT".into()), r).unwrap());
}

#[test]
fn engine_shared_through_arc_stays_usable() {
    let index = Arc::new(recording_index(RecordingEngine::new()));
    let r = rid();
    let clone = Arc::clone(&index);
    std::thread::spawn(move || {
        clone.put(Some("Search".into()), r).unwrap();
    })
    .join()
    .unwrap();
    assert_eq!(index.get("SEARCH".into()).unwrap(), vec![r]);
    assert!(!index.engine().is_rebuilding());
}
