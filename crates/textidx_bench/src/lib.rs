//! Benchmark utilities.

use rand::Rng;
use std::sync::Arc;
use textidx_core::{CollectionId, EntityId, RecordId};
use textidx_testkit::MemoryDatabase;

/// Generate a random lowercase word of 3 to 10 letters.
pub fn random_word<R: Rng>(rng: &mut R) -> String {
    let len = rng.gen_range(3..=10);
    (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}

/// Generate a title of `words` random words.
pub fn random_title(words: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..words)
        .map(|_| random_word(&mut rng))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Generate a batch of record references in one collection.
pub fn generate_rids(count: usize) -> Vec<RecordId> {
    let collection = CollectionId::new(1);
    (0..count)
        .map(|_| RecordId::new(collection, EntityId::new()))
        .collect()
}

/// Database with `count` documents whose titles have `words` random words.
pub fn random_articles(count: usize, words: usize) -> Arc<MemoryDatabase> {
    let db = MemoryDatabase::new();
    for _ in 0..count {
        db.insert(
            textidx_testkit::scenarios::ARTICLES,
            serde_json::json!({ "title": random_title(words) }),
        );
    }
    Arc::new(db)
}
