//! Syntactic parse producer
//!
//! Parses every sentence of the most recent sentence layer and writes one
//! `PhraseStructure` node per sentence plus the flattened `Constituent` nodes
//! of its tree.

use std::sync::Arc;

use lif_core::vocabulary::{features, types};
use lif_core::{Annotation, Container, LifError, Producer, Result, View};

use crate::model::{ConstituencyParser, ModelRegistry};
use crate::tree::ParseTree;

const COMPONENT: &str = concat!(module_path!(), "::SyntacticParser");

// ============================================================================
// Tree flattening
// ============================================================================

/// One flattened tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatConstituent {
    /// `constituent_{sid}_{n}`
    pub id: String,
    /// Token text for terminals, syntactic category otherwise
    pub label: String,
    /// Ids of the immediate children, left to right; `None` for leaves
    pub children: Option<Vec<String>>,
}

impl FlatConstituent {
    /// Convert to a graph node; constituent spans stay unresolved
    pub fn into_annotation(self) -> Annotation {
        let annotation = Annotation::unresolved(self.id, types::CONSTITUENT).with_label(self.label);
        match self.children {
            Some(children) => annotation.with_feature(features::CHILDREN, children),
            None => annotation,
        }
    }
}

pub fn constituent_id(sid: usize, n: usize) -> String {
    format!("constituent_{sid}_{n}")
}

/// Flatten a tree in pre-order, left to right
///
/// Node `n` (in visiting order) gets id `constituent_{sid}_{n}`, so a parent's
/// id always precedes its descendants'. The root is the first element.
pub fn flatten(tree: &ParseTree, sid: usize) -> Vec<FlatConstituent> {
    let mut arena: Vec<FlatConstituent> = Vec::new();
    // (node, index of its parent in the arena)
    let mut pending: Vec<(&ParseTree, Option<usize>)> = vec![(tree, None)];

    while let Some((node, parent)) = pending.pop() {
        let index = arena.len();
        let id = constituent_id(sid, index);

        if let Some(p) = parent {
            arena[p].children.get_or_insert_with(Vec::new).push(id.clone());
        }

        let children = node.children();
        arena.push(FlatConstituent {
            id,
            label: node.label().to_string(),
            children: (!children.is_empty()).then(|| Vec::with_capacity(children.len())),
        });

        // Reversed so the leftmost child is visited next
        pending.extend(children.iter().rev().map(|child| (child, Some(index))));
    }

    arena
}

// ============================================================================
// Producer
// ============================================================================

/// Producer of phrase-structure and constituent annotations
#[derive(Debug, Clone)]
pub struct SyntacticParser {
    models: Arc<ModelRegistry>,
}

impl SyntacticParser {
    /// Create a parse producer over the registry's parser
    ///
    /// Fails when the registry holds no parser.
    pub fn new(models: Arc<ModelRegistry>) -> Result<Self> {
        if !models.has_parser() {
            return Err(LifError::model("no constituency parser registered"));
        }
        Ok(Self { models })
    }

    fn parser(&self) -> Result<&dyn ConstituencyParser> {
        self.models
            .parser()
            .ok_or_else(|| LifError::model("no constituency parser registered"))
    }
}

impl Producer for SyntacticParser {
    fn name(&self) -> &str {
        COMPONENT
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn annotate(&self, container: &Container) -> Result<View> {
        tracing::info!("Execute constituency parsing ...");

        let sentences: Vec<&Annotation> = container
            .last_view_containing(types::SENTENCE)
            .ok_or_else(|| LifError::missing(types::SENTENCE))?
            .annotations_of_type(types::SENTENCE)
            .collect();
        let parser = self.parser()?;

        let mut view = View::new(container.next_view_id());
        let producer = self.producer_tag();
        let kind = format!("parser:{}", parser.name());
        view.add_contains(types::PHRASE_STRUCTURE, producer.clone(), Some(kind.clone()));
        view.add_contains(types::CONSTITUENT, producer, Some(kind));

        let index = container.text_index();
        for (sid, sentence) in sentences.iter().enumerate() {
            let span = sentence.resolved_span()?;
            let text = index.annotation_text(sentence)?;
            let tree = parser.parse(text)?;

            let constituents = flatten(&tree, sid);
            tracing::debug!(
                sentence = sid,
                constituents = constituents.len(),
                "Sentence parsed"
            );

            let ids: Vec<String> = constituents.iter().map(|c| c.id.clone()).collect();
            view.push(
                Annotation::new(format!("ps{sid}"), types::PHRASE_STRUCTURE, span.start, span.end)
                    .with_feature(features::SENTENCE, text)
                    .with_feature(features::PENNTREE, format!("{}\n", tree.to_penn()))
                    .with_feature(features::CONSTITUENTS, ids),
            );
            for constituent in constituents {
                view.push(constituent.into_annotation());
            }
        }

        tracing::info!(sentences = sentences.len(), "Constituency parsing finished");
        Ok(view)
    }
}

// ============================================================================
// Tests
// ============================================================================
