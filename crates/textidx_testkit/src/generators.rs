//! Property-based test generators using proptest.
//!
//! Provides strategies for keys, words and record references.

use proptest::prelude::*;
use textidx_core::{CollectionId, EntityId, IndexKey, RecordId};

/// Strategy for generating entity IDs.
pub fn entity_id_strategy() -> impl Strategy<Value = EntityId> {
    prop::array::uniform16(any::<u8>()).prop_map(EntityId::from_bytes)
}

/// Strategy for generating record references in a small set of collections.
pub fn record_id_strategy() -> impl Strategy<Value = RecordId> {
    (1u32..8, entity_id_strategy())
        .prop_map(|(collection, entity)| RecordId::new(CollectionId::new(collection), entity))
}

/// Strategy for lowercase words.
pub fn word_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,12}").expect("Invalid regex")
}

/// Strategy for a word and a re-cased copy of it.
pub fn case_variants_strategy() -> impl Strategy<Value = (String, String)> {
    (word_strategy(), prop::collection::vec(any::<bool>(), 12)).prop_map(|(word, upper)| {
        let variant = word
            .chars()
            .zip(upper.iter().cycle())
            .map(|(c, &up)| if up { c.to_ascii_uppercase() } else { c })
            .collect();
        (word, variant)
    })
}

/// Strategy for index keys of every variant.
pub fn index_key_strategy() -> impl Strategy<Value = IndexKey> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(IndexKey::Bool),
        any::<i64>().prop_map(IndexKey::Integer),
        prop::string::string_regex("[a-zA-Z ]{0,16}")
            .expect("Invalid regex")
            .prop_map(IndexKey::Text),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(IndexKey::Bytes),
    ];
    leaf.prop_recursive(2, 8, 3, |inner| {
        prop::collection::vec(inner, 1..3).prop_map(IndexKey::Composite)
    })
}

/// Strategy for a batch of (word, record) pairs.
pub fn put_batch_strategy(max: usize) -> impl Strategy<Value = Vec<(String, RecordId)>> {
    prop::collection::vec((word_strategy(), record_id_strategy()), 1..=max)
}
