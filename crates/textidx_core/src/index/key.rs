//! Index key values.

use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// A key that can be indexed.
///
/// Keys are opaque to the index adapter: it only collates and forwards them.
/// Search engines read them through [`IndexKey::text`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Ordered tuple of keys (multi-field definitions).
    Composite(Vec<IndexKey>),
}

impl IndexKey {
    /// Converts a document value into a key.
    ///
    /// Returns `None` for values that cannot be indexed (null, objects,
    /// arrays). Non-integral numbers are keyed by their textual form.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Text(n.to_string()),
            }),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Returns the textual form of the key, as analyzed by search engines.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s),
            Self::Bool(b) => Cow::Owned(b.to_string()),
            Self::Integer(i) => Cow::Owned(i.to_string()),
            Self::Bytes(bytes) => String::from_utf8_lossy(bytes),
            Self::Composite(parts) => Cow::Owned(
                parts
                    .iter()
                    .map(|p| p.text().into_owned())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        }
    }

    /// Returns the text if this is a text key.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl From<&str> for IndexKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for IndexKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for IndexKey {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for IndexKey {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<u8>> for IndexKey {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}
