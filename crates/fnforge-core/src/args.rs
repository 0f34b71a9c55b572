//! `key=value` argument parsing and the resolved build-argument map.
//!
//! Two merge rules live here:
//!
//! - [`parse_map`] is last-wins: a repeated key on the command line
//!   replaces the earlier value.
//! - [`BuildArgMap::extend`] is additive: a key that already exists gets
//!   the new value appended after a single space. Build options rely on
//!   this so that `--build-option dev` adds packages to a user-supplied
//!   `--build-arg ADDITIONAL_PACKAGE=...` instead of replacing it.

use std::collections::BTreeMap;

/// Label used for `--build-arg` values in error messages.
pub const BUILD_ARG: &str = "build-arg";

/// Parse `key=value` entries into a map.
///
/// Only the first `=` separates key from value. `kind` names the flag in
/// error messages (e.g. `"build-arg"`).
///
/// # Examples
///
/// ```
/// use fnforge_core::args::parse_map;
///
/// let map = parse_map(&["k=v=z".to_owned()], "build-arg").unwrap();
/// assert_eq!(map["k"], "v=z");
/// ```
pub fn parse_map<S: AsRef<str>>(entries: &[S], kind: &str) -> crate::Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();

    for entry in entries {
        let (key, value) =
            entry
                .as_ref()
                .split_once('=')
                .ok_or_else(|| crate::Error::MalformedArgument {
                    kind: kind.to_owned(),
                })?;

        if key.is_empty() {
            return Err(crate::Error::EmptyKey {
                kind: kind.to_owned(),
            });
        }

        if let Some(previous) = map.insert(key.to_owned(), value.to_owned()) {
            tracing::warn!(
                key,
                previous = %previous,
                value,
                "{kind} given more than once; the last value wins"
            );
        }
    }

    Ok(map)
}

/// Docker build arguments resolved from `--build-arg` flags and build options.
///
/// Keys are kept sorted so the `--build-arg` flags handed to docker come
/// out in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildArgMap {
    entries: BTreeMap<String, String>,
}

impl BuildArgMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw `--build-arg` tokens (last-wins on duplicate keys).
    pub fn from_entries<S: AsRef<str>>(entries: &[S]) -> crate::Result<Self> {
        Ok(Self {
            entries: parse_map(entries, BUILD_ARG)?,
        })
    }

    /// Merge `key=value` tokens into the map.
    ///
    /// An existing key keeps its value and gets the new one appended after
    /// a space; a new key is inserted as is. Nothing is merged if any token
    /// is malformed.
    pub fn extend<S: AsRef<str>>(&mut self, new_entries: &[S]) -> crate::Result<()> {
        let parsed = parse_map(new_entries, BUILD_ARG)?;

        for (key, value) in parsed {
            match self.entries.get_mut(&key) {
                Some(existing) => {
                    existing.push(' ');
                    existing.push_str(&value);
                }
                None => {
                    self.entries.insert(key, value);
                }
            }
        }

        Ok(())
    }

    /// Copy of this map with `defaults` filled in for keys it does not set.
    pub fn with_defaults(&self, defaults: &BTreeMap<String, String>) -> Self {
        let mut entries = defaults.clone();
        entries.extend(
            self.entries
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for BuildArgMap {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_pair() {
        let map = parse_map(&["k=v"], "build-arg").unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["k"], "v");
    }

    #[test]
    fn parse_rejects_missing_separator() {
        let err = parse_map(&["kv"], "build-arg").unwrap_err();
        assert_eq!(err.to_string(), "each build-arg must take the form key=value");
    }

    #[test]
    fn parse_rejects_empty_key() {
        let err = parse_map(&["=v"], "build-arg").unwrap_err();
        assert_eq!(err.to_string(), "build-arg must have a non-empty key");
    }

    #[test]
    fn parse_splits_on_first_separator_only() {
        let map = parse_map(&["k=v=z"], "build-arg").unwrap();
        assert_eq!(map["k"], "v=z");
    }

    #[test]
    fn parse_allows_empty_value() {
        let map = parse_map(&["k="], "build-arg").unwrap();
        assert_eq!(map["k"], "");
    }

    #[test]
    fn parse_duplicate_key_last_wins() {
        let map = parse_map(&["k=first", "k=second"], "build-arg").unwrap();
        assert_eq!(map["k"], "second");
    }

    #[test]
    fn parse_uses_kind_in_messages() {
        let err = parse_map(&["nope"], "label").unwrap_err();
        assert_eq!(err.to_string(), "each label must take the form key=value");
    }

    #[test]
    fn extend_appends_to_existing_key() {
        let mut map = BuildArgMap::from_entries(&["ARG=x"]).unwrap();
        map.extend(&["ARG=p1 p2"]).unwrap();
        assert_eq!(map.get("ARG"), Some("x p1 p2"));
    }

    #[test]
    fn extend_inserts_missing_key() {
        let mut map = BuildArgMap::new();
        map.extend(&["ARG=p1 p2"]).unwrap();
        assert_eq!(map.get("ARG"), Some("p1 p2"));
    }

    #[test]
    fn extend_leaves_map_untouched_on_malformed_entry() {
        let mut map = BuildArgMap::from_entries(&["ARG=x"]).unwrap();
        let result = map.extend(&["OTHER=y", "broken"]);
        assert!(result.is_err());
        assert_eq!(map.get("OTHER"), None);
        assert_eq!(map.get("ARG"), Some("x"));
    }

    #[test]
    fn with_defaults_prefers_existing_values() {
        let map = BuildArgMap::from_entries(&["A=cli"]).unwrap();
        let defaults = BTreeMap::from([
            ("A".to_owned(), "manifest".to_owned()),
            ("B".to_owned(), "manifest".to_owned()),
        ]);

        let merged = map.with_defaults(&defaults);
        assert_eq!(merged.get("A"), Some("cli"));
        assert_eq!(merged.get("B"), Some("manifest"));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_never_panics(entries in proptest::collection::vec("\\PC*", 0..8)) {
                let _ = parse_map(&entries, "build-arg");
            }

            #[test]
            fn value_keeps_everything_after_first_separator(
                key in "[A-Z_][A-Z0-9_]{0,15}",
                value in "[a-z0-9= ]{0,30}",
            ) {
                let entry = format!("{key}={value}");
                let map = parse_map(&[entry], "build-arg").unwrap();
                prop_assert_eq!(&map[&key], &value);
            }

            #[test]
            fn extend_on_existing_key_preserves_prefix(
                key in "[A-Z][A-Z0-9_]{0,10}",
                first in "[a-z0-9]{1,10}",
                second in "[a-z0-9]{1,10}",
            ) {
                let mut map = BuildArgMap::from_entries(&[format!("{key}={first}")]).unwrap();
                map.extend(&[format!("{key}={second}")]).unwrap();
                let expected = format!("{first} {second}");
                prop_assert_eq!(map.get(&key), Some(expected.as_str()));
            }
        }
    }
}
