//! Named Entity Recognition producer
//!
//! Runs every registered name finder over the most recent token layer and
//! writes one `NamedEntity` view. Without a token layer, a text made of a
//! single alphabetic word is treated as one token.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use lif_core::vocabulary::{features, types};
use lif_core::{Annotation, Container, LifError, Producer, Result, View};

use crate::category::EntityCategory;
use crate::model::{ModelRegistry, TokenNameFinder};
use crate::offsets::TokenOffsets;

const COMPONENT: &str = concat!(module_path!(), "::NamedEntityRecognizer");

static SINGLE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]+$").expect("valid regex"));

/// Producer of named-entity annotations
#[derive(Debug, Clone)]
pub struct NamedEntityRecognizer {
    models: Arc<ModelRegistry>,
}

impl NamedEntityRecognizer {
    /// Create a recognizer over the registry's name finders
    ///
    /// Fails when the registry holds no name finder.
    pub fn new(models: Arc<ModelRegistry>) -> Result<Self> {
        if models.name_finders().is_empty() {
            return Err(LifError::model("no name finder registered"));
        }
        Ok(Self { models })
    }

    /// Tagset descriptor recorded next to the producer tag
    fn kind(&self) -> String {
        format!("ner:{}", self.models.name_finder_names().join("+"))
    }

    /// Token-aware mode: resolve every span of every model
    fn annotate_tokens(
        &self,
        container: &Container,
        tokens: &[&Annotation],
        entities: &mut EntityWriter,
    ) -> Result<()> {
        let text = container.text_index();
        let offsets = TokenOffsets::from_annotations(tokens.iter().copied())?;
        let words = tokens
            .iter()
            .map(|token| text.annotation_text(token))
            .collect::<Result<Vec<_>>>()?;

        for model in self.models.name_finders() {
            let spans = model.find(&words)?;
            tracing::debug!(model = model.name(), spans = spans.len(), "Name finder finished");

            for span in spans {
                let range = offsets.resolve(span.first, span.last)?;
                let Some(category) = map_category(model.as_ref(), &span.category) else {
                    continue;
                };
                let word = text.slice(range.start, range.end).ok_or_else(|| {
                    LifError::InvalidSpan {
                        id: entities.peek_id(),
                        start: range.start as i64,
                        end: range.end as i64,
                    }
                })?;
                entities.push(range.start, range.end, word, category);
            }
        }
        Ok(())
    }

    /// Fallback mode: the whole text is one token
    fn annotate_single_word(&self, container: &Container, entities: &mut EntityWriter) -> Result<()> {
        let text = container.text();
        if !SINGLE_WORD.is_match(text) {
            return Err(LifError::missing(types::TOKEN));
        }

        let end = container.char_len();
        for model in self.models.name_finders() {
            let spans = model.find(&[text])?;
            tracing::debug!(model = model.name(), spans = spans.len(), "Name finder finished");

            // At most one entity per model: the first hit with a known category
            let category = spans
                .iter()
                .find_map(|span| map_category(model.as_ref(), &span.category));
            if let Some(category) = category {
                entities.push(0, end, text, category);
            }
        }
        Ok(())
    }
}

impl Producer for NamedEntityRecognizer {
    fn name(&self) -> &str {
        COMPONENT
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn annotate(&self, container: &Container) -> Result<View> {
        tracing::info!("Execute named entity recognition ...");

        let tokens: Vec<&Annotation> = container
            .last_view_containing(types::TOKEN)
            .map(|view| view.annotations_of_type(types::TOKEN).collect())
            .unwrap_or_default();

        let mut view = View::new(container.next_view_id());
        view.add_contains(types::NAMED_ENTITY, self.producer_tag(), Some(self.kind()));
        let mut entities = EntityWriter::new(view);

        if tokens.is_empty() {
            tracing::debug!("No token layer, trying single-word input");
            self.annotate_single_word(container, &mut entities)?;
        } else {
            self.annotate_tokens(container, &tokens, &mut entities)?;
        }

        let view = entities.finish();
        tracing::info!(entities = view.len(), "Named entity recognition finished");
        Ok(view)
    }
}

/// Map a model label, logging labels outside the vocabulary
fn map_category(model: &dyn TokenNameFinder, label: &str) -> Option<EntityCategory> {
    let category = EntityCategory::from_model_label(label);
    if category.is_none() {
        tracing::warn!(
            model = model.name(),
            category = label,
            "Skipping entity with unmapped category"
        );
    }
    category
}

/// Appends `ne{n}` annotations with a monotonic counter
struct EntityWriter {
    view: View,
    next: usize,
}

impl EntityWriter {
    fn new(view: View) -> Self {
        Self { view, next: 0 }
    }

    fn peek_id(&self) -> String {
        format!("ne{}", self.next)
    }

    fn push(&mut self, start: usize, end: usize, word: &str, category: EntityCategory) {
        let id = self.peek_id();
        self.next += 1;
        self.view.push(
            Annotation::new(id, types::NAMED_ENTITY, start, end)
                .with_feature(features::WORD, word)
                .with_feature(features::CATEGORY, category.as_str()),
        );
    }

    fn finish(self) -> View {
        self.view
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TokenSpan;

    /// Returns a fixed list of spans regardless of input
    struct FixedFinder {
        name: &'static str,
        spans: Vec<TokenSpan>,
    }

    impl TokenNameFinder for FixedFinder {
        fn name(&self) -> &str {
            self.name
        }

        fn find(&self, _tokens: &[&str]) -> Result<Vec<TokenSpan>> {
            Ok(self.spans.clone())
        }
    }

    fn finder(name: &'static str, spans: Vec<TokenSpan>) -> FixedFinder {
        FixedFinder { name, spans }
    }

    fn tokenized(text: &str) -> Container {
        let mut container = Container::new(text);
        let mut view = View::new(container.next_view_id());
        view.add_contains(types::TOKEN, "whitespace-tokenizer:1.0", None);
        let mut offset = 0;
        for (i, word) in text.split(' ').enumerate() {
            let len = word.chars().count();
            view.push(Annotation::new(format!("tok{i}"), types::TOKEN, offset, offset + len));
            offset += len + 1;
        }
        container.append_view(view).unwrap();
        container
    }

    fn recognizer(finders: Vec<FixedFinder>) -> NamedEntityRecognizer {
        let mut builder = ModelRegistry::builder();
        for f in finders {
            builder = builder.with_name_finder(f);
        }
        NamedEntityRecognizer::new(builder.build()).unwrap()
    }

    fn text_feature<'a>(annotation: &'a Annotation, name: &str) -> &'a str {
        annotation.feature(name).and_then(|v| v.as_text()).unwrap()
    }

    #[test]
    fn test_john_lives_in_boston() {
        let mut container = tokenized("John lives in Boston");
        let ner = recognizer(vec![finder(
            "en-ner",
            vec![TokenSpan::new(0, 0, "person"), TokenSpan::new(3, 3, "location")],
        )]);

        let view = ner.produce(&mut container).unwrap();

        assert_eq!(view.id, "v1");
        assert!(view.contains(types::NAMED_ENTITY));
        assert_eq!(view.len(), 2);

        let john = &view.annotations[0];
        assert_eq!(john.id, "ne0");
        assert_eq!(john.annotation_type, types::NAMED_ENTITY);
        assert_eq!((john.start, john.end), (0, 4));
        assert_eq!(text_feature(john, features::WORD), "John");
        assert_eq!(text_feature(john, features::CATEGORY), "PERSON");

        let boston = &view.annotations[1];
        assert_eq!(boston.id, "ne1");
        assert_eq!((boston.start, boston.end), (14, 20));
        assert_eq!(text_feature(boston, features::WORD), "Boston");
        assert_eq!(text_feature(boston, features::CATEGORY), "LOCATION");
    }

    #[test]
    fn test_multi_token_span_and_unicode_offsets() {
        let mut container = tokenized("Zoë moved to New York");
        let ner = recognizer(vec![finder("m", vec![TokenSpan::new(3, 4, "LOCATION")])]);

        let view = ner.produce(&mut container).unwrap();
        let entity = &view.annotations[0];
        assert_eq!((entity.start, entity.end), (13, 21));
        assert_eq!(text_feature(entity, features::WORD), "New York");
    }

    #[test]
    fn test_order_is_by_model_then_span() {
        let mut container = tokenized("John met Mary in Paris");
        let ner = recognizer(vec![
            finder("places", vec![TokenSpan::new(4, 4, "location")]),
            finder(
                "people",
                vec![TokenSpan::new(2, 2, "person"), TokenSpan::new(0, 0, "person")],
            ),
        ]);

        let view = ner.produce(&mut container).unwrap();
        let words: Vec<&str> = view
            .annotations
            .iter()
            .map(|a| text_feature(a, features::WORD))
            .collect();
        let ids: Vec<&str> = view.annotations.iter().map(|a| a.id.as_str()).collect();

        assert_eq!(words, vec!["Paris", "Mary", "John"]);
        assert_eq!(ids, vec!["ne0", "ne1", "ne2"]);
        assert_eq!(
            view.metadata.contains[types::NAMED_ENTITY].kind.as_deref(),
            Some("ner:places+people")
        );
    }

    #[test]
    fn test_unmapped_category_is_skipped_without_consuming_id() {
        let mut container = tokenized("Pay John 5 dollars");
        let ner = recognizer(vec![finder(
            "m",
            vec![
                TokenSpan::new(2, 3, "money"),
                TokenSpan::new(1, 1, "Person"),
            ],
        )]);

        let view = ner.produce(&mut container).unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view.annotations[0].id, "ne0");
        assert_eq!(text_feature(&view.annotations[0], features::WORD), "John");
    }

    #[test]
    fn test_out_of_range_span_fails_without_view() {
        let mut container = tokenized("John lives here");
        let ner = recognizer(vec![finder("m", vec![TokenSpan::new(2, 3, "person")])]);

        let err = ner.produce(&mut container).unwrap_err();
        assert!(matches!(err, LifError::Index { len: 3, .. }));
        assert_eq!(container.views().len(), 1);
    }

    #[test]
    fn test_single_word_fallback() {
        let mut container = Container::new("Obama");
        let ner = recognizer(vec![
            finder(
                "people",
                vec![TokenSpan::new(0, 0, "person"), TokenSpan::new(0, 0, "person")],
            ),
            finder("places", vec![]),
            finder("odd", vec![TokenSpan::new(0, 0, "misc"), TokenSpan::new(0, 0, "date")]),
        ]);

        let view = ner.produce(&mut container).unwrap();
        assert_eq!(view.len(), 2);

        let obama = &view.annotations[0];
        assert_eq!((obama.start, obama.end), (0, 5));
        assert_eq!(text_feature(obama, features::WORD), "Obama");
        assert_eq!(text_feature(obama, features::CATEGORY), "PERSON");

        let second = &view.annotations[1];
        assert_eq!(second.id, "ne1");
        assert_eq!(text_feature(second, features::CATEGORY), "DATE");
    }

    #[test]
    fn test_empty_token_layer_uses_fallback() {
        let mut container = Container::new("Boston");
        let mut empty = View::new("v0");
        empty.add_contains(types::TOKEN, "tok:1", None);
        container.append_view(empty).unwrap();

        let ner = recognizer(vec![finder("m", vec![TokenSpan::new(0, 0, "location")])]);
        let view = ner.produce(&mut container).unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!((view.annotations[0].start, view.annotations[0].end), (0, 6));
    }

    #[test]
    fn test_missing_token_layer() {
        for text in ["John lives in Boston", "", "R2D2"] {
            let mut container = Container::new(text);
            let ner = recognizer(vec![finder("m", vec![TokenSpan::new(0, 0, "person")])]);

            let err = ner.produce(&mut container).unwrap_err();
            assert!(
                matches!(err, LifError::MissingAnnotation { ref annotation_type } if annotation_type == "Token"),
                "unexpected error for {text:?}: {err}"
            );
            assert!(container.views().is_empty());
        }
    }

    /// Tags every token equal to `word`
    struct WordFinder {
        word: &'static str,
        category: &'static str,
    }

    impl TokenNameFinder for WordFinder {
        fn name(&self) -> &str {
            "word"
        }

        fn find(&self, tokens: &[&str]) -> Result<Vec<TokenSpan>> {
            Ok(tokens
                .iter()
                .enumerate()
                .filter(|(_, token)| **token == self.word)
                .map(|(i, _)| TokenSpan::new(i, i, self.category))
                .collect())
        }
    }

    #[test]
    fn test_large_non_ascii_token_layer() {
        let text = ["Zoë", "John"].repeat(10_000).join(" ");
        let mut container = tokenized(&text);
        let ner = NamedEntityRecognizer::new(
            ModelRegistry::builder()
                .with_name_finder(WordFinder {
                    word: "Zoë",
                    category: "person",
                })
                .build(),
        )
        .unwrap();

        let view = ner.produce(&mut container).unwrap();
        assert_eq!(view.len(), 10_000);

        // Each "Zoë John " pair is nine characters
        let last = &view.annotations[9_999];
        assert_eq!(last.id, "ne9999");
        assert_eq!((last.start, last.end), (89_991, 89_994));
        assert_eq!(text_feature(last, features::WORD), "Zoë");
    }

    #[test]
    fn test_upstream_view_ids_out_of_sequence() {
        let mut container = Container::new("John lives in Boston");
        let mut view = View::new("v1");
        view.add_contains(types::TOKEN, "whitespace-tokenizer:1.0", None);
        for (i, (start, end)) in [(0, 4), (5, 10), (11, 13), (14, 20)].into_iter().enumerate() {
            view.push(Annotation::new(format!("tok{i}"), types::TOKEN, start, end));
        }
        container.append_view(view).unwrap();

        let ner = recognizer(vec![finder("m", vec![TokenSpan::new(0, 0, "person")])]);
        let view = ner.produce(&mut container).unwrap();

        assert_eq!(view.id, "v2");
        assert_eq!(text_feature(&view.annotations[0], features::WORD), "John");
        assert_eq!(container.views().len(), 2);
    }

    #[test]
    fn test_uses_most_recent_token_layer() {
        let mut container = tokenized("New York City");
        // A later tokenizer keeps "New York" together
        let mut merged = View::new(container.next_view_id());
        merged.add_contains(types::TOKEN, "mwe-tokenizer:1.0", None);
        merged.push(Annotation::new("t0", types::TOKEN, 0, 8));
        merged.push(Annotation::new("t1", types::TOKEN, 9, 13));
        container.append_view(merged).unwrap();

        let ner = recognizer(vec![finder("m", vec![TokenSpan::new(1, 1, "location")])]);
        let view = ner.produce(&mut container).unwrap();
        assert_eq!(text_feature(&view.annotations[0], features::WORD), "City");
    }

    #[test]
    fn test_requires_a_name_finder() {
        let registry = ModelRegistry::builder().build();
        assert!(NamedEntityRecognizer::new(registry).is_err());
    }

    #[test]
    fn test_producer_tag() {
        let ner = recognizer(vec![finder("m", vec![])]);
        assert_eq!(
            ner.producer_tag(),
            format!("lif_extractor::ner::NamedEntityRecognizer:{}", env!("CARGO_PKG_VERSION"))
        );
    }
}
