//! Model capabilities and the shared model registry
//!
//! Statistical models are opaque: a name finder maps a token sequence to
//! token-index spans, a parser maps sentence text to its best tree. Models are
//! loaded once into a `ModelRegistry`, which is immutable after `build()` and
//! shared across requests behind an `Arc`.

use std::sync::{Arc, Mutex};

use lif_core::{LifError, Result};

use crate::tree::ParseTree;

// ============================================================================
// Model outputs
// ============================================================================

/// A name-finder hit: inclusive token-index range plus model-native category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpan {
    /// Index of the first token
    pub first: usize,
    /// Index of the last token (inclusive)
    pub last: usize,
    /// Category label as the model reports it
    pub category: String,
}

impl TokenSpan {
    pub fn new(first: usize, last: usize, category: impl Into<String>) -> Self {
        Self {
            first,
            last,
            category: category.into(),
        }
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// Name finder safe for concurrent invocation
pub trait TokenNameFinder: Send + Sync {
    /// Model name for logging and metadata
    fn name(&self) -> &str;

    /// Find names in a token sequence
    fn find(&self, tokens: &[&str]) -> Result<Vec<TokenSpan>>;
}

/// Constituency parser safe for concurrent invocation
pub trait ConstituencyParser: Send + Sync {
    /// Model name for logging and metadata
    fn name(&self) -> &str;

    /// Single best parse for a sentence
    fn parse(&self, sentence: &str) -> Result<ParseTree>;
}

/// Name finder that mutates internal state while decoding
pub trait StatefulNameFinder: Send {
    fn find(&mut self, tokens: &[&str]) -> Result<Vec<TokenSpan>>;
}

/// Parser that mutates internal state while decoding
pub trait StatefulParser: Send {
    fn parse(&mut self, sentence: &str) -> Result<ParseTree>;
}

/// Serializes every invocation of a stateful model behind a mutex
pub struct Exclusive<M> {
    name: String,
    inner: Mutex<M>,
}

impl<M> Exclusive<M> {
    pub fn new(name: impl Into<String>, model: M) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(model),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, M>> {
        self.inner
            .lock()
            .map_err(|_| LifError::model(format!("model {} is poisoned", self.name)))
    }
}

impl<M: StatefulNameFinder> TokenNameFinder for Exclusive<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self, tokens: &[&str]) -> Result<Vec<TokenSpan>> {
        self.lock()?.find(tokens)
    }
}

impl<M: StatefulParser> ConstituencyParser for Exclusive<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(&self, sentence: &str) -> Result<ParseTree> {
        self.lock()?.parse(sentence)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Loaded models, read-only once built
#[derive(Default)]
pub struct ModelRegistry {
    name_finders: Vec<Arc<dyn TokenNameFinder>>,
    parser: Option<Arc<dyn ConstituencyParser>>,
}

impl ModelRegistry {
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::default()
    }

    /// Name finders in registration order
    pub fn name_finders(&self) -> &[Arc<dyn TokenNameFinder>] {
        &self.name_finders
    }

    pub fn name_finder_names(&self) -> Vec<&str> {
        self.name_finders.iter().map(|m| m.name()).collect()
    }

    pub fn parser(&self) -> Option<&dyn ConstituencyParser> {
        self.parser.as_deref()
    }

    pub fn has_parser(&self) -> bool {
        self.parser.is_some()
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("name_finders", &self.name_finder_names())
            .field("parser", &self.parser.as_ref().map(|p| p.name()))
            .finish()
    }
}

/// Collects models before freezing them into a `ModelRegistry`
#[derive(Default)]
pub struct ModelRegistryBuilder {
    name_finders: Vec<Arc<dyn TokenNameFinder>>,
    parser: Option<Arc<dyn ConstituencyParser>>,
}

impl ModelRegistryBuilder {
    /// Add a name finder; finders run in the order they are added
    pub fn with_name_finder(mut self, model: impl TokenNameFinder + 'static) -> Self {
        self.name_finders.push(Arc::new(model));
        self
    }

    /// Set the parser, replacing any previous one
    pub fn with_parser(mut self, model: impl ConstituencyParser + 'static) -> Self {
        self.parser = Some(Arc::new(model));
        self
    }

    pub fn build(self) -> Arc<ModelRegistry> {
        Arc::new(ModelRegistry {
            name_finders: self.name_finders,
            parser: self.parser,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    /// Reports every token and counts how often it was called
    struct CountingFinder {
        calls: usize,
    }

    impl StatefulNameFinder for CountingFinder {
        fn find(&mut self, tokens: &[&str]) -> Result<Vec<TokenSpan>> {
            self.calls += 1;
            Ok((0..tokens.len())
                .map(|i| TokenSpan::new(i, i, format!("call{}", self.calls)))
                .collect())
        }
    }

    struct EchoParser;

    impl StatefulParser for EchoParser {
        fn parse(&mut self, sentence: &str) -> Result<ParseTree> {
            Ok(ParseTree::phrase("S", vec![ParseTree::terminal(sentence)]))
        }
    }

    #[test]
    fn test_registry_keeps_order() {
        let registry = ModelRegistry::builder()
            .with_name_finder(Exclusive::new("first", CountingFinder { calls: 0 }))
            .with_name_finder(Exclusive::new("second", CountingFinder { calls: 0 }))
            .build();

        assert_eq!(registry.name_finder_names(), vec!["first", "second"]);
        assert!(!registry.has_parser());
        assert!(registry.parser().is_none());
    }

    #[test]
    fn test_exclusive_serializes_concurrent_calls() {
        let registry = ModelRegistry::builder()
            .with_name_finder(Exclusive::new("counter", CountingFinder { calls: 0 }))
            .build();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let finder = &registry.name_finders()[0];
                    finder.find(&["a", "b"]).unwrap()
                })
            })
            .collect();

        let mut seen: Vec<String> = handles
            .into_iter()
            .map(|h| h.join().unwrap()[0].category.clone())
            .collect();
        seen.sort();
        seen.dedup();

        // Every call observed a distinct counter value
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn test_exclusive_parser() {
        let registry = ModelRegistry::builder()
            .with_parser(Exclusive::new("echo", EchoParser))
            .build();

        let parser = registry.parser().unwrap();
        assert_eq!(parser.name(), "echo");
        assert_eq!(parser.parse("hi").unwrap().to_penn(), "(S hi)");
    }

    #[test]
    fn test_registry_debug_lists_models() {
        let registry = ModelRegistry::builder()
            .with_parser(Exclusive::new("echo", EchoParser))
            .build();
        let debug = format!("{registry:?}");
        assert!(debug.contains("echo"));
    }
}
