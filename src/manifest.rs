//! Build manifest types: resource fingerprints and the application shell.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::key::ROOT_KEY;

/// Mapping from resource key to content fingerprint.
///
/// Serializes as a flat JSON object, the same shape that is persisted in the
/// manifest snapshot store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(BTreeMap<String, String>);

impl Manifest {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the fingerprint recorded for `key`, if any.
    #[must_use]
    pub fn fingerprint(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterates resource keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `key` is in both manifests with the same fingerprint.
    #[must_use]
    pub fn unchanged_since(&self, previous: &Self, key: &str) -> bool {
        match (self.fingerprint(key), previous.fingerprint(key)) {
            (Some(current), Some(old)) => current == old,
            _ => false,
        }
    }

    /// Serializes the manifest for the snapshot store.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses a manifest previously written with [`Manifest::to_json`].
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not a JSON object of strings.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Ordered list of resource keys that must be cached before activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShellSet(Vec<String>);

impl ShellSet {
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|k| k == key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks that every shell key has an entry in `manifest`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Manifest`] naming the first key that is missing.
    pub fn validate(&self, manifest: &Manifest) -> Result<()> {
        match self.0.iter().find(|key| !manifest.contains(key)) {
            Some(key) => Err(Error::Manifest(format!(
                "shell resource {key} is not listed in the manifest"
            ))),
            None => Ok(()),
        }
    }
}

impl<S: Into<String>> FromIterator<S> for ShellSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// The manifest file emitted by a build pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildManifest {
    pub resources: Manifest,
    #[serde(default)]
    pub shell: ShellSet,
}

impl BuildManifest {
    /// Parses and validates a build manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, the manifest is empty, or
    /// the shell references unknown resources.
    pub fn parse(json: &str) -> Result<Self> {
        let parsed: Self = serde_json::from_str(json)?;
        if parsed.resources.is_empty() {
            return Err(Error::Manifest("manifest lists no resources".to_string()));
        }
        if parsed.resources.keys().any(str::is_empty) {
            return Err(Error::Manifest(format!(
                "empty resource key (use {ROOT_KEY} for the entry page)"
            )));
        }
        parsed.shell.validate(&parsed.resources)?;
        Ok(parsed)
    }

    /// Loads a build manifest from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails [`BuildManifest::parse`].
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(pairs: &[(&str, &str)]) -> Manifest {
        pairs.iter().copied().collect()
    }

    #[test]
    fn fingerprint_lookup() {
        let m = manifest(&[("a.js", "h1"), ("/", "h0")]);
        assert_eq!(m.fingerprint("a.js"), Some("h1"));
        assert_eq!(m.fingerprint("b.js"), None);
        assert!(m.contains("/"));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn unchanged_requires_equal_fingerprints() {
        let old = manifest(&[("a.js", "h1"), ("b.js", "old")]);
        let new = manifest(&[("a.js", "h1"), ("b.js", "h2"), ("c.js", "h3")]);
        assert!(new.unchanged_since(&old, "a.js"));
        assert!(!new.unchanged_since(&old, "b.js"));
        assert!(!new.unchanged_since(&old, "c.js"));
        assert!(!new.unchanged_since(&old, "gone.js"));
    }

    #[test]
    fn snapshot_json_is_flat_object() {
        let m = manifest(&[("a.js", "h1")]);
        let json = m.to_json().unwrap();
        assert_eq!(std::str::from_utf8(&json).unwrap(), r#"{"a.js":"h1"}"#);
        assert_eq!(Manifest::from_json(&json).unwrap(), m);
    }

    #[test]
    fn snapshot_rejects_garbage() {
        assert!(Manifest::from_json(b"not json").is_err());
        assert!(Manifest::from_json(b"[1,2]").is_err());
    }

    #[test]
    fn build_manifest_parses_shell() {
        let parsed = BuildManifest::parse(
            r#"{"resources": {"main.js": "h1", "index.html": "h2", "/": "h2"},
                "shell": ["main.js", "index.html"]}"#,
        )
        .unwrap();
        assert_eq!(parsed.resources.len(), 3);
        assert_eq!(parsed.shell.keys(), ["main.js", "index.html"]);
        assert!(parsed.shell.contains("index.html"));
    }

    #[test]
    fn build_manifest_shell_defaults_to_empty() {
        let parsed = BuildManifest::parse(r#"{"resources": {"a.js": "h1"}}"#).unwrap();
        assert!(parsed.shell.is_empty());
    }

    #[test]
    fn build_manifest_rejects_unknown_shell_key() {
        let err = BuildManifest::parse(r#"{"resources": {"a.js": "h1"}, "shell": ["b.js"]}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Manifest(msg) if msg.contains("b.js")));
    }

    #[test]
    fn build_manifest_rejects_empty() {
        assert!(BuildManifest::parse(r#"{"resources": {}}"#).is_err());
        assert!(BuildManifest::parse(r#"{"resources": {"": "h"}}"#).is_err());
    }
}
