//! Ordered multi-valued query mapping.

use std::fmt;

/// Ordered mapping from key to values.
///
/// Keys keep their first-appearance order and values keep their append order, so the
/// rendered query string is deterministic. Adding to an existing key appends; nothing is
/// ever overwritten.
///
/// # Example
///
/// ```
/// use hitch_core::EncodedValues;
///
/// let mut values = EncodedValues::new();
/// values.add("b", "1");
/// values.add("a", "x y");
/// values.add("b", "2");
///
/// assert_eq!(values.get_all("b"), ["1", "2"]);
/// assert_eq!(values.to_query_string(), "b=1&b=2&a=x+y");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedValues {
    entries: Vec<(String, Vec<String>)>,
}

impl EncodedValues {
    /// Creates an empty mapping.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Parse an `application/x-www-form-urlencoded` query string.
    ///
    /// Pairs sharing a key are grouped under that key, in order.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let mut values = Self::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            values.add(key, value);
        }
        values
    }

    /// Append a value under `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Append every value of `other`, key by key.
    pub fn extend(&mut self, other: Self) {
        for (key, values) in other.entries {
            for value in values {
                self.add(key.clone(), value);
            }
        }
    }

    /// First value under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }

    /// All values under `key`; empty when the key is absent.
    #[must_use]
    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, values)| values.as_slice())
            .unwrap_or_default()
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == key)
    }

    /// Keys in first-appearance order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// `(key, value)` pairs, grouped by key.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| (key.as_str(), value.as_str()))
        })
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as an `application/x-www-form-urlencoded` string.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        serializer.extend_pairs(self.pairs());
        serializer.finish()
    }
}

impl fmt::Display for EncodedValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EncodedValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (key, value) in iter {
            values.add(key, value);
        }
        values
    }
}

impl IntoIterator for EncodedValues {
    type Item = (String, Vec<String>);
    type IntoIter = std::vec::IntoIter<(String, Vec<String>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
