use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::model::composer::ProviderToggle;

// Extra names as pip accepts them: alphanumeric ends, dots/underscores/
// hyphens inside.
static EXTRA_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9._-]*[A-Za-z0-9])?$").expect("valid extra name regex")
});

/// One `[[providers]]` entry from the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEntry {
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub checked: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("provider catalog is empty")]
    Empty,
    #[error("duplicate provider value `{0}`")]
    Duplicate(String),
    #[error("invalid provider value `{0}` (must be a valid extra name)")]
    InvalidValue(String),
}

/// The validated, ordered provider list injected into the composer.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<ProviderEntry>,
}

impl Catalog {
    /// Validate config entries into a catalog. Order is preserved.
    pub fn from_entries(entries: Vec<ProviderEntry>) -> Result<Self, CatalogError> {
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for entry in &entries {
            if !EXTRA_NAME_RE.is_match(&entry.value) {
                return Err(CatalogError::InvalidValue(entry.value.clone()));
            }
            if !seen.insert(entry.value.as_str()) {
                return Err(CatalogError::Duplicate(entry.value.clone()));
            }
        }

        Ok(Self { entries })
    }

    /// Toggle list for the composer, in catalog order. Entries without a
    /// label display their value.
    pub fn toggles(&self) -> Vec<ProviderToggle> {
        self.entries
            .iter()
            .map(|e| {
                ProviderToggle::new(
                    e.value.clone(),
                    e.label.clone().unwrap_or_else(|| e.value.clone()),
                    e.checked,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(value: &str) -> ProviderEntry {
        ProviderEntry {
            value: value.to_string(),
            label: None,
            checked: false,
        }
    }

    #[test]
    fn accepts_wellformed_values_in_order() {
        let catalog =
            Catalog::from_entries(vec![entry("openai"), entry("huggingface-hub")]).unwrap();
        let toggles = catalog.toggles();
        assert_eq!(toggles.len(), 2);
        assert_eq!(toggles[0].value, "openai");
        assert_eq!(toggles[1].value, "huggingface-hub");
        // Missing label falls back to the value.
        assert_eq!(toggles[1].label, "huggingface-hub");
    }

    #[test]
    fn rejects_empty_catalog() {
        let err = Catalog::from_entries(Vec::new()).unwrap_err();
        assert_eq!(err, CatalogError::Empty);
    }

    #[test]
    fn rejects_duplicate_values() {
        let err = Catalog::from_entries(vec![entry("openai"), entry("openai")]).unwrap_err();
        assert_eq!(err, CatalogError::Duplicate("openai".to_string()));
    }

    #[test]
    fn rejects_malformed_values() {
        for bad in ["", "-openai", "openai-", "open ai", "open[ai]"] {
            let err = Catalog::from_entries(vec![entry(bad)]).unwrap_err();
            assert_eq!(err, CatalogError::InvalidValue(bad.to_string()));
        }
    }
}
