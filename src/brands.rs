use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

const DEFAULT_BRANDS: &str = include_str!("../data/brand_misspellings.json");

/// Hand-curated misspellings keyed by the exact brand label they target.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct BrandDictionary {
    entries: HashMap<String, Vec<String>>,
}

impl BrandDictionary {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| Error::BrandDictionaryIo {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&data).map_err(|source| Error::BrandDictionaryParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn misspellings(&self, label: &str) -> &[String] {
        self.entries.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for BrandDictionary {
    fn default() -> Self {
        serde_json::from_str(DEFAULT_BRANDS).expect("brand_misspellings.json must be valid JSON")
    }
}

impl FromIterator<(String, Vec<String>)> for BrandDictionary {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_dictionary_covers_known_brands() {
        let brands = BrandDictionary::default();
        assert_eq!(brands.len(), 10);
        assert_eq!(brands.misspellings("example"), ["exmaple", "examle", "exampel"]);
        assert_eq!(brands.misspellings("github").len(), 3);
    }

    #[test]
    fn lookup_is_exact_match_only() {
        let brands = BrandDictionary::default();
        assert!(brands.misspellings("googles").is_empty());
        assert!(brands.misspellings("Google").is_empty());
    }

    #[test]
    fn loads_dictionary_from_file() {
        let path = std::env::temp_dir().join(format!("typoguard-brands-{}.json", std::process::id()));
        fs::write(&path, r#"{"acme": ["acmee", "acne"]}"#).unwrap();

        let brands = BrandDictionary::from_path(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(brands.misspellings("acme"), ["acmee", "acne"]);
        assert!(brands.misspellings("example").is_empty());
    }

    #[test]
    fn reports_missing_and_malformed_files() {
        let missing = BrandDictionary::from_path("/nonexistent/typoguard/brands.json");
        assert!(matches!(missing, Err(Error::BrandDictionaryIo { .. })));

        let path = std::env::temp_dir().join(format!("typoguard-bad-{}.json", std::process::id()));
        fs::write(&path, "[1, 2, 3]").unwrap();
        let malformed = BrandDictionary::from_path(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(malformed, Err(Error::BrandDictionaryParse { .. })));
    }
}
