//! Case-insensitive, multi-valued header staging used to build outbound requests.

use std::collections::{BTreeMap, btree_map};
use std::fmt;

use http::header::{HeaderName, HeaderValue};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::HeaderError;

/// Ordered multi-map from header name to header values.
///
/// Names are stored in canonical MIME form (`x-user-id` becomes `X-User-Id`),
/// so every lookup is case-insensitive. Values of a single name keep the order
/// in which they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeaderMap {
    entries: BTreeMap<String, Vec<String>>,
}

impl HeaderMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` under `name`, keeping any values already stored for it.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .entry(canonical_name(name))
            .or_default()
            .push(value.into());
    }

    /// Replace every value stored under `name` with `value`.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.entries.insert(canonical_name(name), vec![value.into()]);
    }

    /// Most recently added value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).last().map(String::as_str)
    }

    /// Oldest value for `name`.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// All values for `name`, in insertion order. Empty when the name is absent.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&canonical_name(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&canonical_name(name))
    }

    /// Remove `name` and return the values it held.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.entries.remove(&canonical_name(name))
    }

    /// Number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Names with their values, names in sorted order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    /// Convert the staged headers into an `http::HeaderMap`.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError`] if a name is not a valid HTTP token or a value
    /// contains bytes that are not allowed in a header value.
    pub fn to_http(&self) -> Result<http::HeaderMap, HeaderError> {
        let mut out = http::HeaderMap::with_capacity(self.entries.len());
        for (name, values) in &self.entries {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|source| {
                HeaderError::InvalidName {
                    name: name.clone(),
                    source,
                }
            })?;
            for value in values {
                let header_value =
                    HeaderValue::from_str(value).map_err(|source| HeaderError::InvalidValue {
                        name: name.clone(),
                        source,
                    })?;
                out.append(header_name.clone(), header_value);
            }
        }
        Ok(out)
    }

    /// Write the staged headers onto an outbound request's headers.
    ///
    /// Each staged name replaces whatever the target already holds for it.
    /// Names that are not staged are left alone. On error the target is not
    /// modified.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError`] under the same conditions as [`HeaderMap::to_http`].
    pub fn apply_to(&self, target: &mut http::HeaderMap) -> Result<(), HeaderError> {
        let staged = self.to_http()?;
        for name in staged.keys() {
            target.remove(name);
            for value in staged.get_all(name) {
                target.append(name.clone(), value.clone());
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a HeaderMap {
    type Item = (&'a str, &'a [String]);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the names and values of a [`HeaderMap`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    inner: btree_map::Iter<'a, String, Vec<String>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a [String]);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'de> Deserialize<'de> for HeaderMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(HeaderMapVisitor)
    }
}

struct HeaderMapVisitor;

impl<'de> Visitor<'de> for HeaderMapVisitor {
    type Value = HeaderMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping header names to arrays of strings")
    }

    // Names that collide after canonicalization are merged in document order.
    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut headers = HeaderMap::new();
        while let Some((name, values)) = access.next_entry::<String, Vec<String>>()? {
            headers
                .entries
                .entry(canonical_name(&name))
                .or_default()
                .extend(values);
        }
        Ok(headers)
    }
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Canonical MIME form of a header name.
///
/// The first letter and every letter following a hyphen are upper-cased, the
/// rest lower-cased. Names containing bytes outside the HTTP token set are
/// returned unchanged.
#[must_use]
pub fn canonical_name(name: &str) -> String {
    if !name.bytes().all(is_token_byte) {
        return name.to_owned();
    }
    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn canonical_name_title_cases_segments() {
        assert_eq!(canonical_name("x-user-id"), "X-User-Id");
        assert_eq!(canonical_name("CONTENT-TYPE"), "Content-Type");
        assert_eq!(canonical_name("foo"), "Foo");
        assert_eq!(canonical_name(""), "");
    }

    #[test]
    fn canonical_name_leaves_non_token_names_alone() {
        assert_eq!(canonical_name("bad name"), "bad name");
        assert_eq!(canonical_name("x:y"), "x:y");
    }

    #[test]
    fn append_keeps_values_in_order() {
        let mut headers = HeaderMap::new();
        headers.append("x-forwarded-for", "10.0.0.1");
        headers.append("X-Forwarded-For", "10.0.0.2");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get_all("x-FORWARDED-for"), ["10.0.0.1", "10.0.0.2"]);
        assert_eq!(headers.get("x-forwarded-for"), Some("10.0.0.2"));
        assert_eq!(headers.first("x-forwarded-for"), Some("10.0.0.1"));
    }

    #[test]
    fn set_replaces_existing_values() {
        let mut headers = HeaderMap::new();
        headers.append("x-role", "reader");
        headers.append("x-role", "writer");
        headers.set("X-Role", "admin");

        assert_eq!(headers.get_all("x-role"), ["admin"]);
    }

    #[test]
    fn missing_name_yields_nothing() {
        let headers = HeaderMap::new();

        assert!(headers.get("x-none").is_none());
        assert!(headers.get_all("x-none").is_empty());
        assert!(!headers.contains("x-none"));
    }

    #[test]
    fn remove_returns_values() {
        let mut headers = HeaderMap::new();
        headers.append("x-a", "1");
        headers.append("x-b", "2");

        assert_eq!(headers.remove("X-A"), Some(vec!["1".to_owned()]));
        assert!(!headers.contains("x-a"));
        assert_eq!(headers.names().collect::<Vec<_>>(), ["X-B"]);
    }

    #[test]
    fn iter_visits_names_in_sorted_order() {
        let mut headers = HeaderMap::new();
        headers.append("x-b", "2");
        headers.append("x-a", "1");
        headers.append("x-a", "1b");

        let seen: Vec<_> = (&headers).into_iter().collect();
        assert_eq!(
            seen,
            [
                ("X-A", &["1".to_owned(), "1b".to_owned()][..]),
                ("X-B", &["2".to_owned()][..]),
            ]
        );
    }

    #[test]
    fn deserialize_merges_colliding_names() {
        let headers: HeaderMap =
            serde_json::from_str(r#"{"x-id": ["a"], "X-Id": ["b", "c"], "accept": []}"#).unwrap();

        assert_eq!(headers.get_all("x-id"), ["a", "b", "c"]);
        assert!(headers.contains("Accept"));
        assert!(headers.get("accept").is_none());
    }

    #[test]
    fn deserialize_rejects_non_array_values() {
        let result = serde_json::from_str::<HeaderMap>(r#"{"x-id": "a"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn serialize_uses_canonical_names() {
        let mut headers = HeaderMap::new();
        headers.append("x-user", "alice");
        headers.append("x-user", "bob");

        let json = serde_json::to_value(&headers).unwrap();
        assert_eq!(json, serde_json::json!({"X-User": ["alice", "bob"]}));
    }

    #[test]
    fn to_http_preserves_multiple_values() {
        let mut headers = HeaderMap::new();
        headers.append("x-group", "admins");
        headers.append("x-group", "ops");

        let out = headers.to_http().unwrap();
        let values: Vec<_> = out
            .get_all("x-group")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, ["admins", "ops"]);
    }

    #[test]
    fn to_http_rejects_invalid_name() {
        let mut headers = HeaderMap::new();
        headers.append("bad name", "v");

        match headers.to_http() {
            Err(HeaderError::InvalidName { name, .. }) => assert_eq!(name, "bad name"),
            other => panic!("Expected InvalidName, got: {other:?}"),
        }
    }

    #[test]
    fn to_http_rejects_invalid_value() {
        let mut headers = HeaderMap::new();
        headers.append("x-user", "line\nbreak");

        match headers.to_http() {
            Err(HeaderError::InvalidValue { name, .. }) => assert_eq!(name, "X-User"),
            other => panic!("Expected InvalidValue, got: {other:?}"),
        }
    }

    #[test]
    fn apply_to_replaces_staged_names_only() {
        let mut target = http::HeaderMap::new();
        target.insert("x-user", HeaderValue::from_static("spoofed"));
        target.insert("accept", HeaderValue::from_static("text/html"));

        let mut headers = HeaderMap::new();
        headers.append("x-user", "alice");

        headers.apply_to(&mut target).unwrap();

        assert_eq!(target.get_all("x-user").iter().count(), 1);
        assert_eq!(target.get("x-user").unwrap(), "alice");
        assert_eq!(target.get("accept").unwrap(), "text/html");
    }

    #[test]
    fn apply_to_leaves_target_untouched_on_error() {
        let mut target = http::HeaderMap::new();
        target.insert("x-user", HeaderValue::from_static("original"));

        let mut headers = HeaderMap::new();
        headers.append("x-user", "alice");
        headers.append("x-bad", "a\rb");

        assert!(headers.apply_to(&mut target).is_err());
        assert_eq!(target.get("x-user").unwrap(), "original");
    }
}
