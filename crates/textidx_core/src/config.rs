//! Index configuration.

use serde::Deserialize;

/// Configuration for an index instance.
///
/// Can be built in code or loaded from JSON; missing fields take their
/// defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Report rebuild progress every this many documents (0 = only at the end).
    pub progress_interval: u64,

    /// Whether a rebuild clears the engine before repopulating it.
    pub clear_before_rebuild: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            progress_interval: 10_000,
            clear_before_rebuild: true,
        }
    }
}

impl IndexConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from a JSON document.
    pub fn from_json(json: &str) -> crate::IndexResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the progress reporting interval.
    #[must_use]
    pub const fn progress_interval(mut self, documents: u64) -> Self {
        self.progress_interval = documents;
        self
    }

    /// Sets whether rebuilds clear the engine first.
    #[must_use]
    pub const fn clear_before_rebuild(mut self, value: bool) -> Self {
        self.clear_before_rebuild = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = IndexConfig::default();
        assert_eq!(config.progress_interval, 10_000);
        assert!(config.clear_before_rebuild);
    }

    #[test]
    fn builder_pattern() {
        let config = IndexConfig::new()
            .progress_interval(5)
            .clear_before_rebuild(false);

        assert_eq!(config.progress_interval, 5);
        assert!(!config.clear_before_rebuild);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = IndexConfig::from_json(r#"{"progress_interval": 3}"#).unwrap();
        assert_eq!(config.progress_interval, 3);
        assert!(config.clear_before_rebuild);
    }
}
