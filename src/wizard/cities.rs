//! City catalog: display name to station code

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

const BUILTIN_CITIES: &str = include_str!("../../data/cities.json");

#[derive(Debug, Clone, Default)]
pub struct CityCatalog {
    cities: BTreeMap<String, String>,
}

impl CityCatalog {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cities: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Load a JSON object of `"City": "code"` pairs
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read city catalog {:?}", path))?;
        let catalog = Self::from_json(&raw)
            .with_context(|| format!("Failed to parse city catalog {:?}", path))?;
        info!("Loaded {} cities from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let cities: BTreeMap<String, String> = serde_json::from_str(raw)?;
        Ok(Self { cities })
    }

    /// Catalog compiled into the binary, used when no file is configured
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CITIES).context("Built-in city catalog is malformed")
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cities.contains_key(name)
    }

    pub fn code(&self, name: &str) -> Option<&str> {
        self.cities.get(name).map(String::as_str)
    }

    /// Cities whose name starts with `prefix`, ignoring case, in name order
    pub fn search(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return Vec::new();
        }
        self.cities
            .keys()
            .filter(|name| name.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect()
    }
}
