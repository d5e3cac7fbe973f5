//! The named values a path is mapped to and assembled from.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use serde::Serialize;

/// A set of named path characteristics: route parameters plus any dispatch
/// metadata a [`Mapper`](super::Mapper) attached to the matching rule.
///
/// Keys iterate in sorted order, which is also the order extra
/// characteristics are rendered into a query string on assembly.
///
/// ```rust
/// use aurora::mapping::Characteristics;
///
/// let chars = Characteristics::new()
///     .with("id", 2)
///     .with("name", "r2");
/// assert_eq!(chars.get("id"), Some("2"));
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Characteristics(BTreeMap<String, String>);

impl Characteristics {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds `key = value` and returns `self` for chaining.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts `key = value`, returning the value it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) -> Option<String> {
        self.0.insert(key.into(), value.to_string())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlays every entry of `other` onto `self`. `other` wins on collision.
    pub fn merge(&mut self, other: &Characteristics) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// `k=v` pairs joined by `&`, in key order. Values are emitted verbatim.
    pub(crate) fn to_query(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl fmt::Debug for Characteristics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Characteristics {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut chars = Self::new();
        for (k, v) in iter {
            chars.insert(k, v);
        }
        chars
    }
}

impl<K: Into<String>, V: ToString, const N: usize> From<[(K, V); N]> for Characteristics {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl Extend<(String, String)> for Characteristics {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Characteristics {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_stringified() {
        let chars = Characteristics::new().with("id", 2).with("flag", true);
        assert_eq!(chars.get("id"), Some("2"));
        assert_eq!(chars.get("flag"), Some("true"));
    }

    #[test]
    fn merge_overrides_existing_keys() {
        let mut base = Characteristics::from([("id", "1"), ("name", "a")]);
        base.merge(&Characteristics::from([("name", "b"), ("_name", "r1")]));
        assert_eq!(base, Characteristics::from([("id", "1"), ("name", "b"), ("_name", "r1")]));
    }

    #[test]
    fn query_is_rendered_in_key_order() {
        let chars = Characteristics::from([("b", "2"), ("a", "1")]);
        assert_eq!(chars.to_query(), "a=1&b=2");
    }
}
