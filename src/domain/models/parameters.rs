//! Key-value parameters handed to a dispatched build.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters for a downstream build.
///
/// Ordered so that logs and environment exports are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildParameters(BTreeMap<String, String>);

impl BuildParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge parameter layers; later layers override earlier ones.
    ///
    /// Callers pass job defaults first, then the triggering build's own
    /// parameters, then the bisection parameters.
    pub fn layered<'a>(layers: impl IntoIterator<Item = &'a Self>) -> Self {
        let mut merged = BTreeMap::new();
        for layer in layers {
            for (key, value) in &layer.0 {
                merged.insert(key.clone(), value.clone());
            }
        }
        Self(merged)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse a `KEY=VALUE` pair as given on the command line.
    pub fn parse_pair(raw: &str) -> Result<(String, String), String> {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("empty parameter name in '{raw}'"));
        }
        Ok((key.to_string(), value.to_string()))
    }
}

impl From<BTreeMap<String, String>> for BuildParameters {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BuildParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
