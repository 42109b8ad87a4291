//! Attribute lists attached to groups and datasets.
//!
//! An attribute is a name bound to an ordered list of string values. Both the
//! single-value and the multi-value declaration forms end up in the same
//! shape here.

use smallvec::SmallVec;
use std::fmt;

type Values = SmallVec<[String; 1]>;

/// Ordered mapping from attribute name to string values.
///
/// Insertion order is preserved. Merging is first-wins: once a name is
/// present, later contributions for that name are dropped.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: SmallVec<[(String, Values); 4]>,
}

impl Attributes {
    /// Create an empty attribute list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single-valued attribute unless the name is already bound.
    ///
    /// Returns `true` if the entry was inserted.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        let mut values = Values::new();
        values.push(value.into());
        self.entries.push((name, values));
        true
    }

    /// Add a multi-valued attribute unless the name is already bound.
    pub fn insert_many<I, S>(&mut self, name: impl Into<String>, values: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.entries
            .push((name, values.into_iter().map(Into::into).collect()));
        true
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Builder form of [`insert_many`](Self::insert_many).
    pub fn with_many<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert_many(name, values);
        self
    }

    /// Merge `other` into `self`, keeping existing names untouched.
    pub fn merge_first_wins(&mut self, other: &Attributes) {
        for (name, values) in &other.entries {
            if !self.contains(name) {
                self.entries.push((name.clone(), values.clone()));
            }
        }
    }

    /// Values bound to a name.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_slice())
    }

    /// First value bound to a name.
    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.first()).map(String::as_str)
    }

    /// Check if a name is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Attribute names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut attrs = Self::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut attrs = Attributes::new();
        assert!(attrs.insert("unit", "V"));
        assert!(attrs.insert_many("tags", ["a", "b"]));

        assert_eq!(attrs.get_first("unit"), Some("V"));
        assert_eq!(attrs.get("tags"), Some(&["a".to_string(), "b".to_string()][..]));
        assert_eq!(attrs.get("missing"), None);
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_first_wins_on_insert() {
        let mut attrs = Attributes::new();
        attrs.insert("unit", "V");
        assert!(!attrs.insert("unit", "mV"));
        assert!(!attrs.insert_many("unit", ["A", "B"]));

        assert_eq!(attrs.get("unit"), Some(&["V".to_string()][..]));
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn test_merge_first_wins_keeps_order() {
        let mut first = Attributes::new().with("b", "1").with("a", "1");
        let second = Attributes::new().with("a", "2").with("c", "2");
        first.merge_first_wins(&second);

        let names: Vec<&str> = first.names().collect();
        assert_eq!(names, ["b", "a", "c"]);
        assert_eq!(first.get_first("a"), Some("1"));
        assert_eq!(first.get_first("c"), Some("2"));
    }

    #[test]
    fn test_merge_disjoint_is_commutative_in_content() {
        let x = Attributes::new().with("x", "1");
        let y = Attributes::new().with("y", "2");

        let mut xy = x.clone();
        xy.merge_first_wins(&y);
        let mut yx = y.clone();
        yx.merge_first_wins(&x);

        assert_eq!(xy.get_first("x"), yx.get_first("x"));
        assert_eq!(xy.get_first("y"), yx.get_first("y"));
    }

    #[test]
    fn test_from_iter() {
        let attrs: Attributes = [("k", "v"), ("k", "w")].into_iter().collect();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.get_first("k"), Some("v"));
    }
}
