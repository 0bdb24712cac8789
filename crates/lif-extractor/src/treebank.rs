//! Treebank-backed constituency parser
//!
//! Serves pre-computed best parses. The file holds one bracketed tree per
//! line; blank lines and lines starting with `#` are ignored. A sentence is
//! matched against a tree's terminals with all whitespace removed, so
//! tokenization differences ("sleeps ." vs "sleeps.") do not matter.

use std::collections::HashMap;
use std::path::Path;

use lif_core::{LifError, Result};

use crate::model::ConstituencyParser;
use crate::tree::ParseTree;

/// Bracket escapes used for terminals in treebank files
const BRACKET_ESCAPES: &[(&str, &str)] = &[
    ("-LRB-", "("),
    ("-RRB-", ")"),
    ("-LCB-", "{"),
    ("-RCB-", "}"),
    ("-LSB-", "["),
    ("-RSB-", "]"),
];

#[derive(Debug, Clone)]
pub struct TreebankParser {
    name: String,
    trees: HashMap<String, ParseTree>,
}

impl TreebankParser {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            trees: HashMap::new(),
        }
    }

    /// Read trees from treebank text
    pub fn from_treebank_str(name: impl Into<String>, content: &str) -> Result<Self> {
        let mut parser = Self::new(name);
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let tree = ParseTree::from_penn(line).map_err(|e| {
                LifError::MalformedTree(format!("line {}: {e}", line_no + 1))
            })?;
            parser.insert(tree);
        }
        Ok(parser)
    }

    /// Load a treebank file, named after its file stem
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "treebank".to_string());

        let parser = Self::from_treebank_str(name, &content)?;
        tracing::info!(
            model = %parser.name,
            trees = parser.len(),
            path = %path.display(),
            "Loaded treebank"
        );
        Ok(parser)
    }

    /// Add a tree; a later tree for the same sentence replaces the earlier one
    pub fn insert(&mut self, tree: ParseTree) {
        let key: String = tree
            .terminals()
            .into_iter()
            .map(unescape)
            .flat_map(|word| word.chars().filter(|c| !c.is_whitespace()))
            .collect();
        self.trees.insert(key, tree);
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

fn unescape(word: &str) -> &str {
    BRACKET_ESCAPES
        .iter()
        .find(|(escaped, _)| *escaped == word)
        .map(|(_, raw)| *raw)
        .unwrap_or(word)
}

fn sentence_key(sentence: &str) -> String {
    sentence.chars().filter(|c| !c.is_whitespace()).collect()
}

impl ConstituencyParser for TreebankParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(&self, sentence: &str) -> Result<ParseTree> {
        self.trees
            .get(&sentence_key(sentence))
            .cloned()
            .ok_or_else(|| {
                LifError::model(format!(
                    "treebank {} has no parse for sentence {sentence:?}",
                    self.name
                ))
            })
    }
}
