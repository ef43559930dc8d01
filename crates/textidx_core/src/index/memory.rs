//! In-memory search engine.
//!
//! `MemorySearchEngine` keeps:
//! - Inverted index: token → set of record IDs
//! - Forward index: record ID → set of tokens (for removals)
//! - A tokenizer configured from the index metadata
//!
//! Every mutation outside rebuilding mode commits on its own. In rebuilding
//! mode mutations accumulate and are committed once, when the mode ends.
//! Token-based exact match only; no ranking or fuzzy matching.

use crate::error::{IndexError, IndexResult};
use crate::index::{
    IndexDefinition, IndexEngine, IndexKey, IndexMetadata, ManagedIndex, SearchEngine,
};
use crate::record::{RecordId, RecordSet};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, warn};

/// How text is split into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Analyzer {
    /// Split on whitespace and ASCII punctuation.
    #[default]
    Standard,
    /// Split on whitespace only.
    Whitespace,
    /// The whole text is a single token.
    Keyword,
}

/// Configuration for the tokenizer, read from index metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Splitting strategy.
    pub analyzer: Analyzer,
    /// Minimum token length (in characters) to index.
    pub min_token_length: usize,
    /// Maximum token length (in characters) to index.
    pub max_token_length: usize,
    /// Whether to perform case-insensitive matching.
    pub case_insensitive: bool,
    /// Additional characters to treat as separators.
    pub separators: Vec<char>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            analyzer: Analyzer::Standard,
            min_token_length: 1,
            max_token_length: 256,
            case_insensitive: true,
            separators: vec![],
        }
    }
}

impl TokenizerConfig {
    /// Creates a new tokenizer configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the tokenizer settings out of an index metadata document.
    ///
    /// `null` means defaults. Unknown fields are ignored.
    pub fn from_metadata(metadata: &IndexMetadata) -> IndexResult<Self> {
        match metadata {
            IndexMetadata::Null => Ok(Self::default()),
            IndexMetadata::Object(_) => serde_json::from_value(metadata.clone())
                .map_err(|e| IndexError::invalid_metadata(e.to_string())),
            other => Err(IndexError::invalid_metadata(format!(
                "expected an object, got {other}"
            ))),
        }
    }

    /// Sets the analyzer.
    #[must_use]
    pub fn analyzer(mut self, analyzer: Analyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Sets minimum token length.
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_token_length = len;
        self
    }

    /// Sets maximum token length.
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_token_length = len;
        self
    }

    /// Sets case sensitivity.
    #[must_use]
    pub fn case_sensitive(mut self) -> Self {
        self.case_insensitive = false;
        self
    }

    /// Adds extra separator characters.
    #[must_use]
    pub fn with_separators(mut self, chars: &[char]) -> Self {
        self.separators.extend_from_slice(chars);
        self
    }

    /// Tokenizes text according to the configuration.
    #[must_use]
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        match self.analyzer {
            Analyzer::Keyword => self.accept(text.trim()).into_iter().collect(),
            Analyzer::Whitespace | Analyzer::Standard => text
                .split(|c: char| self.is_separator(c))
                .filter_map(|token| self.accept(token))
                .collect(),
        }
    }

    fn is_separator(&self, c: char) -> bool {
        c.is_whitespace()
            || (self.analyzer == Analyzer::Standard && c.is_ascii_punctuation())
            || self.separators.contains(&c)
    }

    fn accept(&self, token: &str) -> Option<String> {
        let len = token.chars().count();
        if token.is_empty() || len < self.min_token_length || len > self.max_token_length {
            return None;
        }
        Some(if self.case_insensitive {
            token.to_lowercase()
        } else {
            token.to_string()
        })
    }
}

#[derive(Debug, Default)]
struct Postings {
    /// Inverted index: token → set of record IDs.
    inverted: HashMap<String, HashSet<RecordId>>,
    /// Forward index: record ID → keys and tokens indexed for it.
    forward: HashMap<RecordId, RecordTerms>,
}

impl Postings {
    /// Associates `rid` with an analyzed key. Returns `false` if it already
    /// was.
    fn add_key(&mut self, rid: RecordId, key_id: &str, tokens: &HashSet<String>) -> bool {
        let terms = self.forward.entry(rid).or_default();
        if !terms.keys.insert(key_id.to_string()) {
            return false;
        }
        for token in tokens {
            *terms.tokens.entry(token.clone()).or_insert(0) += 1;
            self.inverted.entry(token.clone()).or_default().insert(rid);
        }
        true
    }

    /// Dissociates `rid` from an analyzed key. Postings go away only once no
    /// remaining key of the record produces their token.
    fn remove_key(&mut self, rid: RecordId, key_id: &str, tokens: &HashSet<String>) -> bool {
        let Some(terms) = self.forward.get_mut(&rid) else {
            return false;
        };
        if !terms.keys.remove(key_id) {
            return false;
        }

        for token in tokens {
            let Some(count) = terms.tokens.get_mut(token) else {
                continue;
            };
            *count -= 1;
            if *count > 0 {
                continue;
            }
            terms.tokens.remove(token);
            if let Some(records) = self.inverted.get_mut(token) {
                records.remove(&rid);
                if records.is_empty() {
                    self.inverted.remove(token);
                }
            }
        }

        if terms.keys.is_empty() {
            self.forward.remove(&rid);
        }
        true
    }
}

/// What one record contributes to the inverted index.
#[derive(Debug, Default)]
struct RecordTerms {
    /// Analyzed form of every key associated with the record.
    keys: HashSet<String>,
    /// Token → number of those keys producing it.
    tokens: HashMap<String, usize>,
}

/// Analyzed identity of a key and its distinct tokens.
fn analyze(tokens: Vec<String>) -> (String, HashSet<String>) {
    let key_id = tokens.join("\u{1f}");
    (key_id, tokens.into_iter().collect())
}

/// Search engine holding its inverted index in memory.
#[derive(Default)]
pub struct MemorySearchEngine {
    name: RwLock<Option<String>>,
    metadata: RwLock<IndexMetadata>,
    tokenizer: RwLock<TokenizerConfig>,
    managed: RwLock<Option<ManagedIndex>>,
    postings: RwLock<Postings>,
    rebuilding: AtomicBool,
    /// Mutations waiting for the end of rebuilding mode.
    pending: AtomicU64,
    commits: AtomicU64,
}

impl MemorySearchEngine {
    /// Creates an empty engine with default tokenizer settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Name given at `create`, if any.
    pub fn name(&self) -> Option<String> {
        self.name.read().clone()
    }

    /// The metadata document last applied.
    pub fn metadata(&self) -> IndexMetadata {
        self.metadata.read().clone()
    }

    /// Active tokenizer settings.
    pub fn tokenizer(&self) -> TokenizerConfig {
        self.tokenizer.read().clone()
    }

    /// The index managing this engine, if set.
    pub fn managed_index(&self) -> Option<ManagedIndex> {
        self.managed.read().clone()
    }

    /// Number of commits performed so far.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of mutations not yet committed.
    pub fn pending_changes(&self) -> u64 {
        self.pending.load(Ordering::SeqCst)
    }

    /// Returns the number of unique tokens in the index.
    pub fn unique_token_count(&self) -> usize {
        self.postings.read().inverted.len()
    }

    /// Returns the number of indexed records.
    pub fn entity_count(&self) -> usize {
        self.postings.read().forward.len()
    }

    /// Returns all tokens indexed for a record.
    pub fn tokens_for(&self, rid: RecordId) -> HashSet<String> {
        self.postings
            .read()
            .forward
            .get(&rid)
            .map(|terms| terms.tokens.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the count of records containing a token.
    pub fn token_frequency(&self, token: &str) -> usize {
        let normalized = self.normalize_query(token);
        self.postings
            .read()
            .inverted
            .get(&normalized)
            .map_or(0, HashSet::len)
    }

    /// Searches for records matching all tokens in the query (AND semantics).
    ///
    /// The query is collated like the managing index's keys, then tokenized
    /// the same way as indexed text.
    pub fn search(&self, query: &str) -> Vec<RecordId> {
        let tokens = self.query_tokens(query);
        let Some((first, rest)) = tokens.split_first() else {
            return Vec::new();
        };

        let postings = self.postings.read();
        let mut results: HashSet<RecordId> = match postings.inverted.get(first) {
            Some(records) => records.clone(),
            None => return Vec::new(),
        };

        for token in rest {
            match postings.inverted.get(token) {
                Some(records) => {
                    results.retain(|rid| records.contains(rid));
                    if results.is_empty() {
                        return Vec::new();
                    }
                }
                None => return Vec::new(),
            }
        }

        results.into_iter().collect()
    }

    /// Searches with OR semantics (returns records matching any token).
    pub fn search_any(&self, query: &str) -> Vec<RecordId> {
        let postings = self.postings.read();
        let mut results = HashSet::new();
        for token in self.query_tokens(query) {
            if let Some(records) = postings.inverted.get(&token) {
                results.extend(records.iter().copied());
            }
        }
        results.into_iter().collect()
    }

    /// Returns records containing any token that starts with `prefix`.
    pub fn search_prefix(&self, prefix: &str) -> Vec<RecordId> {
        let normalized = self.normalize_query(prefix);
        let postings = self.postings.read();
        let mut results = HashSet::new();
        for (token, records) in &postings.inverted {
            if token.starts_with(&normalized) {
                results.extend(records.iter().copied());
            }
        }
        results.into_iter().collect()
    }

    fn query_tokens(&self, query: &str) -> Vec<String> {
        let collated = match self.managed.read().as_ref() {
            Some(index) => index.collate(IndexKey::from(query)).text().into_owned(),
            None => query.to_string(),
        };
        self.tokenizer.read().tokenize(&collated)
    }

    fn normalize_query(&self, token: &str) -> String {
        let token = match self.managed.read().as_ref() {
            Some(index) => index.collate(IndexKey::from(token)).text().into_owned(),
            None => token.to_string(),
        };
        if self.tokenizer.read().case_insensitive {
            token.to_lowercase()
        } else {
            token
        }
    }

    fn record_change(&self) {
        if self.rebuilding.load(Ordering::SeqCst) {
            self.pending.fetch_add(1, Ordering::SeqCst);
        } else {
            self.commits.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn commit_pending(&self) {
        let changes = self.pending.swap(0, Ordering::SeqCst);
        if changes > 0 {
            self.commits.fetch_add(1, Ordering::SeqCst);
            debug!(changes, "committed bulk changes");
        }
    }
}

impl IndexEngine for MemorySearchEngine {
    fn create(
        &self,
        name: &str,
        definition: &IndexDefinition,
        _cluster_index_name: &str,
        _value_container_algorithm: &str,
    ) -> IndexResult<()> {
        debug!(index = name, field = ?definition.field_path, "memory engine created");
        *self.name.write() = Some(name.to_string());
        Ok(())
    }

    fn put(&self, key: &IndexKey, refs: RecordSet) -> IndexResult<()> {
        let tokens = self.tokenizer.read().tokenize(&key.text());
        if tokens.is_empty() || refs.is_empty() {
            return Ok(());
        }
        let (key_id, distinct) = analyze(tokens);

        let mut changed = false;
        {
            let mut postings = self.postings.write();
            for rid in refs {
                changed |= postings.add_key(rid, &key_id, &distinct);
            }
        }

        if changed {
            self.record_change();
        }
        Ok(())
    }

    fn get(&self, key: &IndexKey) -> IndexResult<Vec<RecordId>> {
        Ok(self.search(&key.text()))
    }

    fn clear(&self) -> IndexResult<()> {
        {
            let mut postings = self.postings.write();
            postings.inverted.clear();
            postings.forward.clear();
        }
        self.record_change();
        Ok(())
    }

    fn size(&self) -> usize {
        self.unique_token_count()
    }
}

impl SearchEngine for MemorySearchEngine {
    fn set_index_metadata(&self, metadata: IndexMetadata) {
        match TokenizerConfig::from_metadata(&metadata) {
            Ok(config) => *self.tokenizer.write() = config,
            Err(e) => warn!(error = %e, "ignoring tokenizer settings in index metadata"),
        }
        *self.metadata.write() = metadata;
    }

    fn set_managed_index(&self, index: ManagedIndex) {
        let mut slot = self.managed.write();
        if let Some(previous) = slot.as_ref() {
            if previous.id() != index.id() {
                warn!(
                    previous = %previous.id(),
                    next = %index.id(),
                    "search engine handed to a different index"
                );
            }
        }
        *slot = Some(index);
    }

    fn remove(&self, key: &IndexKey, rid: RecordId) -> IndexResult<bool> {
        let (key_id, distinct) = analyze(self.tokenizer.read().tokenize(&key.text()));

        let removed = self.postings.write().remove_key(rid, &key_id, &distinct);

        if removed {
            self.record_change();
        }
        Ok(removed)
    }

    fn set_rebuilding(&self, rebuilding: bool) {
        let was = self.rebuilding.swap(rebuilding, Ordering::SeqCst);
        if was && !rebuilding {
            self.commit_pending();
        }
    }

    fn is_rebuilding(&self) -> bool {
        self.rebuilding.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MemorySearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySearchEngine")
            .field("name", &self.name())
            .field("entity_count", &self.entity_count())
            .field("unique_tokens", &self.unique_token_count())
            .field("rebuilding", &self.is_rebuilding())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::CaseInsensitiveCollate;
    use crate::types::{CollectionId, IndexId};
    use serde_json::json;
    use std::sync::Arc;

    fn rid(n: u8) -> RecordId {
        RecordId::new(CollectionId::new(1), crate::EntityId::from_bytes([n; 16]))
    }

    fn index_text(engine: &MemorySearchEngine, n: u8, text: &str) {
        engine.put(&IndexKey::from(text), RecordSet::from([rid(n)])).unwrap();
    }

    #[test]
    fn tokenize_basic() {
        let tokens = TokenizerConfig::new().tokenize("Hello World");
        assert_eq!(tokens, vec!["hello", "world"]);
    }

    #[test]
    fn tokenize_with_punctuation() {
        let tokens = TokenizerConfig::new().tokenize("Hello, World! How are you?");
        assert_eq!(tokens, vec!["hello", "world", "how", "are", "you"]);
    }

    #[test]
    fn tokenize_case_sensitive() {
        let tokens = TokenizerConfig::new()
            .case_sensitive()
            .tokenize("Hello World HELLO");
        assert_eq!(tokens, vec!["Hello", "World", "HELLO"]);
    }

    #[test]
    fn tokenize_min_length() {
        let tokens = TokenizerConfig::new().min_length(3).tokenize("I am a robot");
        assert_eq!(tokens, vec!["robot"]);
    }

    #[test]
    fn tokenize_whitespace_keeps_punctuation() {
        let tokens = TokenizerConfig::new()
            .analyzer(Analyzer::Whitespace)
            .tokenize("e-mail me, now");
        assert_eq!(tokens, vec!["e-mail", "me,", "now"]);
    }

    #[test]
    fn tokenize_keyword_is_whole_text() {
        let tokens = TokenizerConfig::new()
            .analyzer(Analyzer::Keyword)
            .tokenize("  New York  ");
        assert_eq!(tokens, vec!["new york"]);
    }

    #[test]
    fn tokenize_extra_separators() {
        let tokens = TokenizerConfig::new()
            .analyzer(Analyzer::Whitespace)
            .with_separators(&['|'])
            .tokenize("a|b c");
        assert_eq!(tokens, vec!["a", "b", "c"]);
    }

    #[test]
    fn metadata_configures_tokenizer() {
        let engine = MemorySearchEngine::new();
        engine.set_index_metadata(json!({
            "analyzer": "keyword",
            "case_insensitive": false,
            "boost": 2
        }));

        let config = engine.tokenizer();
        assert_eq!(config.analyzer, Analyzer::Keyword);
        assert!(!config.case_insensitive);
        assert_eq!(engine.metadata()["boost"], json!(2));
    }

    #[test]
    fn invalid_metadata_keeps_defaults() {
        assert!(TokenizerConfig::from_metadata(&json!({"analyzer": "klingon"})).is_err());
        assert!(TokenizerConfig::from_metadata(&json!([1])).is_err());

        let engine = MemorySearchEngine::new();
        engine.set_index_metadata(json!({"analyzer": "klingon"}));
        assert_eq!(engine.tokenizer().analyzer, Analyzer::Standard);
    }

    #[test]
    fn index_and_search() {
        let engine = MemorySearchEngine::new();
        index_text(&engine, 1, "Hello world");
        index_text(&engine, 2, "World of rust");
        index_text(&engine, 3, "Rust is great");

        let results = engine.search("world");
        assert_eq!(results.len(), 2);
        assert!(results.contains(&rid(1)));
        assert!(results.contains(&rid(2)));
    }

    #[test]
    fn search_multi_token() {
        let engine = MemorySearchEngine::new();
        index_text(&engine, 1, "Hello world");
        index_text(&engine, 2, "World of rust");
        index_text(&engine, 3, "Hello rust");

        assert_eq!(engine.search("hello rust"), vec![rid(3)]);
        assert_eq!(engine.search_any("hello rust").len(), 3);
    }

    #[test]
    fn search_prefix() {
        let engine = MemorySearchEngine::new();
        index_text(&engine, 1, "rust");
        index_text(&engine, 2, "rusty");
        index_text(&engine, 3, "ruby");

        let results = engine.search_prefix("rus");
        assert_eq!(results.len(), 2);
        assert!(!results.contains(&rid(3)));
    }

    #[test]
    fn remove_only_touches_given_record() {
        let engine = MemorySearchEngine::new();
        index_text(&engine, 1, "Hello world");
        index_text(&engine, 2, "World of rust");

        assert!(engine.remove(&IndexKey::from("Hello world"), rid(1)).unwrap());
        assert!(engine.search("hello").is_empty());
        assert_eq!(engine.search("world"), vec![rid(2)]);
        assert!(engine.tokens_for(rid(1)).is_empty());

        assert!(!engine.remove(&IndexKey::from("Hello world"), rid(1)).unwrap());
    }

    #[test]
    fn remove_keeps_tokens_shared_with_other_keys() {
        let engine = MemorySearchEngine::new();
        index_text(&engine, 1, "hello world");
        index_text(&engine, 1, "hello there");

        assert!(engine.remove(&IndexKey::from("hello there"), rid(1)).unwrap());

        assert_eq!(engine.get(&IndexKey::from("hello world")).unwrap(), vec![rid(1)]);
        assert!(engine.search("there").is_empty());
        assert_eq!(
            engine.tokens_for(rid(1)),
            HashSet::from(["hello".to_string(), "world".to_string()])
        );
        assert_eq!(engine.entity_count(), 1);
    }

    #[test]
    fn remove_requires_the_key_not_just_its_tokens() {
        let engine = MemorySearchEngine::new();
        index_text(&engine, 1, "hello world");

        assert!(!engine.remove(&IndexKey::from("hello"), rid(1)).unwrap());
        assert!(engine.remove(&IndexKey::from("HELLO, World"), rid(1)).unwrap());
        assert_eq!(engine.entity_count(), 0);
        assert_eq!(engine.unique_token_count(), 0);
    }

    #[test]
    fn repeated_put_of_same_key_is_idempotent() {
        let engine = MemorySearchEngine::new();
        index_text(&engine, 1, "rust");
        index_text(&engine, 1, "Rust");
        assert_eq!(engine.commit_count(), 1);

        assert!(engine.remove(&IndexKey::from("rust"), rid(1)).unwrap());
        assert!(engine.search("rust").is_empty());
    }

    #[test]
    fn token_frequency() {
        let engine = MemorySearchEngine::new();
        index_text(&engine, 1, "rust rust rust");
        index_text(&engine, 2, "rust is great");
        index_text(&engine, 3, "rust programming");

        assert_eq!(engine.token_frequency("rust"), 3);
        assert_eq!(engine.token_frequency("great"), 1);
        assert_eq!(engine.token_frequency("python"), 0);
    }

    #[test]
    fn unicode_text() {
        let engine = MemorySearchEngine::new();
        index_text(&engine, 1, "こんにちは世界");
        index_text(&engine, 2, "Привет мир");

        assert_eq!(engine.search("こんにちは世界"), vec![rid(1)]);
        assert_eq!(engine.search("ПРИВЕТ"), vec![rid(2)]);
    }

    #[test]
    fn empty_query() {
        let engine = MemorySearchEngine::new();
        index_text(&engine, 1, "Hello world");
        assert!(engine.search("").is_empty());
        assert!(engine.search("   ").is_empty());
    }

    #[test]
    fn commits_per_mutation_outside_rebuild() {
        let engine = MemorySearchEngine::new();
        index_text(&engine, 1, "a");
        index_text(&engine, 2, "b");
        assert_eq!(engine.commit_count(), 2);
        assert_eq!(engine.pending_changes(), 0);
    }

    #[test]
    fn rebuilding_batches_commits() {
        let engine = MemorySearchEngine::new();
        engine.set_rebuilding(true);
        index_text(&engine, 1, "a");
        index_text(&engine, 2, "b");
        assert_eq!(engine.commit_count(), 0);
        assert_eq!(engine.pending_changes(), 2);

        engine.set_rebuilding(false);
        assert_eq!(engine.commit_count(), 1);
        assert_eq!(engine.pending_changes(), 0);
        assert!(!engine.is_rebuilding());
    }

    #[test]
    fn managed_index_collates_queries() {
        let engine = MemorySearchEngine::new();
        engine.set_index_metadata(json!({"case_insensitive": false}));
        engine.set_managed_index(ManagedIndex::new(
            IndexId::next(),
            "Doc.body",
            Arc::new(CaseInsensitiveCollate),
        ));

        index_text(&engine, 1, "hello");
        assert_eq!(engine.search("HELLO"), vec![rid(1)]);
        assert_eq!(engine.managed_index().unwrap().name(), "Doc.body");
    }
}
