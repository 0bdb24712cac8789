//! Gazetteer name finder
//!
//! Dictionary model over token sequences. Terms may span several tokens and
//! match case-insensitively; at each position the longest term wins.
//!
//! Model file format (TOML):
//!
//! ```toml
//! name = "en-people"
//!
//! [[entry]]
//! term = "Barack Obama"
//! category = "person"
//! aliases = ["Obama"]
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use lif_core::{LifError, Result};

use crate::model::{TokenNameFinder, TokenSpan};

/// Dictionary entry for entity matching
#[derive(Debug, Clone, Deserialize)]
pub struct GazetteerEntry {
    pub term: String,
    /// Model-native category label
    pub category: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GazetteerFile {
    name: Option<String>,
    #[serde(default, rename = "entry")]
    entries: Vec<GazetteerEntry>,
}

/// Name finder matching known terms
#[derive(Debug, Clone)]
pub struct GazetteerNameFinder {
    name: String,
    /// Lowercased token sequence -> category
    lookup: HashMap<Vec<String>, String>,
    /// Longest term, in tokens
    max_tokens: usize,
}

impl GazetteerNameFinder {
    /// Create an empty gazetteer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lookup: HashMap::new(),
            max_tokens: 0,
        }
    }

    /// Parse a TOML model; `default_name` is used when the file has no `name`
    pub fn from_toml_str(default_name: &str, content: &str) -> Result<Self> {
        let file: GazetteerFile = toml::from_str(content)
            .map_err(|e| LifError::model(format!("invalid gazetteer {default_name}: {e}")))?;

        let mut gazetteer = Self::new(file.name.unwrap_or_else(|| default_name.to_string()));
        for entry in file.entries {
            gazetteer.add_entry(entry);
        }
        Ok(gazetteer)
    }

    /// Load a TOML model file, named after the file stem unless it sets `name`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "gazetteer".to_string());

        let gazetteer = Self::from_toml_str(&stem, &content)?;
        tracing::info!(
            model = %gazetteer.name,
            terms = gazetteer.len(),
            path = %path.display(),
            "Loaded gazetteer"
        );
        Ok(gazetteer)
    }

    /// Add a term and its aliases
    pub fn add_term(&mut self, term: &str, category: &str, aliases: &[&str]) {
        self.add_entry(GazetteerEntry {
            term: term.to_string(),
            category: category.to_string(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
        });
    }

    fn add_entry(&mut self, entry: GazetteerEntry) {
        for surface in std::iter::once(&entry.term).chain(&entry.aliases) {
            let key = normalize(surface.split_whitespace());
            if key.is_empty() {
                continue;
            }
            self.max_tokens = self.max_tokens.max(key.len());
            self.lookup.insert(key, entry.category.clone());
        }
    }

    /// Number of surface forms (terms and aliases)
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}

fn normalize<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    tokens.into_iter().map(str::to_lowercase).collect()
}

impl TokenNameFinder for GazetteerNameFinder {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self, tokens: &[&str]) -> Result<Vec<TokenSpan>> {
        let lowered = normalize(tokens.iter().copied());
        let mut spans = Vec::new();

        let mut i = 0;
        while i < lowered.len() {
            let longest = self.max_tokens.min(lowered.len() - i);
            let hit = (1..=longest)
                .rev()
                .find_map(|len| self.lookup.get(&lowered[i..i + len]).map(|c| (len, c)));

            match hit {
                Some((len, category)) => {
                    spans.push(TokenSpan::new(i, i + len - 1, category.clone()));
                    i += len;
                }
                None => i += 1,
            }
        }

        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people_and_places() -> GazetteerNameFinder {
        let mut gazetteer = GazetteerNameFinder::new("test");
        gazetteer.add_term("John", "person", &["Johnny"]);
        gazetteer.add_term("New York", "location", &["NYC"]);
        gazetteer.add_term("New York Times", "organization", &[]);
        gazetteer.add_term("Boston", "location", &[]);
        gazetteer
    }

    #[test]
    fn test_single_token_terms_and_aliases() {
        let gazetteer = people_and_places();
        let spans = gazetteer.find(&["johnny", "lives", "in", "Boston"]).unwrap();

        assert_eq!(
            spans,
            vec![
                TokenSpan::new(0, 0, "person"),
                TokenSpan::new(3, 3, "location")
            ]
        );
    }

    #[test]
    fn test_longest_match_wins() {
        let gazetteer = people_and_places();
        let spans = gazetteer
            .find(&["The", "New", "York", "Times", "in", "New", "York"])
            .unwrap();

        assert_eq!(
            spans,
            vec![
                TokenSpan::new(1, 3, "organization"),
                TokenSpan::new(5, 6, "location")
            ]
        );
    }

    #[test]
    fn test_no_tokens() {
        let gazetteer = people_and_places();
        assert!(gazetteer.find(&[]).unwrap().is_empty());
        assert!(GazetteerNameFinder::new("empty").find(&["John"]).unwrap().is_empty());
    }

    #[test]
    fn test_from_toml() {
        let content = r#"
name = "en-people"

[[entry]]
term = "Barack Obama"
category = "person"
aliases = ["Obama"]

[[entry]]
term = "Acme"
category = "company"
"#;
        let gazetteer = GazetteerNameFinder::from_toml_str("fallback", content).unwrap();
        assert_eq!(gazetteer.name(), "en-people");
        assert_eq!(gazetteer.len(), 3);
        assert_eq!(
            gazetteer.find(&["Obama", "visited", "Acme"]).unwrap(),
            vec![
                TokenSpan::new(0, 0, "person"),
                TokenSpan::new(2, 2, "company")
            ]
        );
    }

    #[test]
    fn test_from_toml_defaults_and_errors() {
        let gazetteer = GazetteerNameFinder::from_toml_str("fallback", "").unwrap();
        assert_eq!(gazetteer.name(), "fallback");
        assert!(gazetteer.is_empty());

        assert!(matches!(
            GazetteerNameFinder::from_toml_str("bad", "[[entry]]\nterm = 1"),
            Err(LifError::Model(_))
        ));
    }

    #[test]
    fn test_from_file_uses_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("places.toml");
        std::fs::write(&path, "[[entry]]\nterm = \"Boston\"\ncategory = \"location\"\n").unwrap();

        let gazetteer = GazetteerNameFinder::from_file(&path).unwrap();
        assert_eq!(gazetteer.name(), "places");
        assert_eq!(gazetteer.len(), 1);

        assert!(matches!(
            GazetteerNameFinder::from_file(dir.path().join("missing.toml")),
            Err(LifError::Io(_))
        ));
    }
}
