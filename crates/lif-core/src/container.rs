//! Annotation graph: containers, views and annotations
//!
//! A `Container` owns the source text and an append-only list of `View`s.
//! Each view is one annotation layer written by one pipeline stage. Offsets
//! are character (Unicode scalar value) offsets into the container text.

use std::collections::{BTreeMap, HashSet};
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::vocabulary::ID_LIST_FEATURES;
use crate::{LifError, Result};

/// Offset value marking an annotation whose span is not assigned
pub const UNRESOLVED: i64 = -1;

fn unresolved() -> i64 {
    UNRESOLVED
}

// ============================================================================
// Annotation
// ============================================================================

/// Value of an annotation feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Text(String),
    /// Ordered list of annotation ids
    Ids(Vec<String>),
    /// Anything else written by another stage, kept verbatim
    Other(serde_json::Value),
}

impl FeatureValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ids(&self) -> Option<&[String]> {
        match self {
            Self::Ids(ids) => Some(ids),
            _ => None,
        }
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<String>> for FeatureValue {
    fn from(value: Vec<String>) -> Self {
        Self::Ids(value)
    }
}

/// A node in the annotation graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Identifier, unique within the owning view
    pub id: String,

    /// Vocabulary type identifier
    #[serde(rename = "type")]
    pub annotation_type: String,

    /// Start offset, or -1 when unresolved
    #[serde(default = "unresolved")]
    pub start: i64,

    /// End offset (exclusive), or -1 when unresolved
    #[serde(default = "unresolved")]
    pub end: i64,

    /// Human-readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default)]
    pub features: BTreeMap<String, FeatureValue>,

    /// Fields this crate does not interpret, kept verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Annotation {
    /// Create an annotation over a resolved character span
    pub fn new(
        id: impl Into<String>,
        annotation_type: impl Into<String>,
        start: usize,
        end: usize,
    ) -> Self {
        Self {
            id: id.into(),
            annotation_type: annotation_type.into(),
            start: start as i64,
            end: end as i64,
            label: None,
            features: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Create an annotation carrying the `(-1, -1)` sentinel span
    pub fn unresolved(id: impl Into<String>, annotation_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            annotation_type: annotation_type.into(),
            start: UNRESOLVED,
            end: UNRESOLVED,
            label: None,
            features: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Set the label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Add a feature value
    pub fn with_feature(mut self, name: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.features.insert(name.into(), value.into());
        self
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureValue> {
        self.features.get(name)
    }

    /// Whether both offsets are assigned
    pub fn is_resolved(&self) -> bool {
        self.start >= 0 && self.end >= 0
    }

    /// The character span, if resolved
    pub fn span(&self) -> Option<Range<usize>> {
        if self.is_resolved() {
            Some(self.start as usize..self.end as usize)
        } else {
            None
        }
    }

    /// The character span, or an `InvalidSpan` error when unresolved
    pub fn resolved_span(&self) -> Result<Range<usize>> {
        self.span().ok_or_else(|| self.invalid_span())
    }

    fn invalid_span(&self) -> LifError {
        LifError::InvalidSpan {
            id: self.id.clone(),
            start: self.start,
            end: self.end,
        }
    }
}

// ============================================================================
// View
// ============================================================================

/// What a view contributes for one annotation type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    /// `<component-name>:<version>` of the producing stage
    pub producer: String,

    /// Tagset or model family descriptor
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// View-level metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewMetadata {
    /// Annotation types this view contributes, keyed by vocabulary id
    #[serde(default)]
    pub contains: BTreeMap<String, Contribution>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One annotation layer produced by one pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub id: String,

    #[serde(default)]
    pub metadata: ViewMetadata,

    #[serde(default)]
    pub annotations: Vec<Annotation>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl View {
    /// Create an empty view
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata: ViewMetadata::default(),
            annotations: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Declare that this view contributes annotations of `annotation_type`
    pub fn add_contains(
        &mut self,
        annotation_type: impl Into<String>,
        producer: impl Into<String>,
        kind: Option<String>,
    ) {
        self.metadata.contains.insert(
            annotation_type.into(),
            Contribution {
                producer: producer.into(),
                kind,
                extra: BTreeMap::new(),
            },
        );
    }

    /// Whether the view declares `annotation_type`
    pub fn contains(&self, annotation_type: &str) -> bool {
        self.metadata.contains.contains_key(annotation_type)
    }

    /// Append an annotation, returning a handle for further edits
    pub fn push(&mut self, annotation: Annotation) -> &mut Annotation {
        self.annotations.push(annotation);
        let last = self.annotations.len() - 1;
        &mut self.annotations[last]
    }

    /// Annotations of one type, in insertion order
    pub fn annotations_of_type<'a>(
        &'a self,
        annotation_type: &'a str,
    ) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.annotations
            .iter()
            .filter(move |a| a.annotation_type == annotation_type)
    }

    /// Look up an annotation by id
    pub fn get(&self, id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Check the graph invariants against a text of `text_len` characters
    ///
    /// - ids are unique within the view
    /// - every annotation type is declared in `contains`
    /// - resolved spans satisfy `0 <= start <= end <= text_len`
    /// - id-list features only reference ids in this view
    pub fn validate(&self, text_len: usize) -> Result<()> {
        let mut ids: HashSet<&str> = HashSet::with_capacity(self.annotations.len());

        for annotation in &self.annotations {
            if !ids.insert(annotation.id.as_str()) {
                return Err(LifError::InvalidView(format!(
                    "view {}: duplicate annotation id {}",
                    self.id, annotation.id
                )));
            }

            if !self.contains(&annotation.annotation_type) {
                return Err(LifError::InvalidView(format!(
                    "view {}: annotation {} has undeclared type {}",
                    self.id, annotation.id, annotation.annotation_type
                )));
            }

            let sentinel = annotation.start == UNRESOLVED && annotation.end == UNRESOLVED;
            if !sentinel {
                let in_bounds = annotation.start >= 0
                    && annotation.start <= annotation.end
                    && annotation.end <= text_len as i64;
                if !in_bounds {
                    return Err(annotation.invalid_span());
                }
            }
        }

        for annotation in &self.annotations {
            for name in ID_LIST_FEATURES {
                let Some(referenced) = annotation.feature(name).and_then(FeatureValue::as_ids)
                else {
                    continue;
                };
                if let Some(dangling) = referenced.iter().find(|id| !ids.contains(id.as_str())) {
                    return Err(LifError::InvalidView(format!(
                        "view {}: annotation {} references unknown id {} in {}",
                        self.id, annotation.id, dangling, name
                    )));
                }
            }
        }

        Ok(())
    }
}

// ============================================================================
// Container
// ============================================================================

/// Source text plus every annotation layer produced for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    text: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    views: Vec<View>,

    /// Top-level fields such as `@context`, kept verbatim
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

impl Container {
    /// Create a container with no views
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: BTreeMap::new(),
            views: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    /// Length of the text in characters
    pub fn char_len(&self) -> usize {
        if self.text.is_ascii() {
            self.text.len()
        } else {
            self.text.chars().count()
        }
    }

    /// Text covered by the character span `[start, end)`
    pub fn slice(&self, start: usize, end: usize) -> Option<&str> {
        if start > end {
            return None;
        }
        if self.text.is_ascii() {
            return self.text.get(start..end);
        }

        let mut offsets = self
            .text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(self.text.len()));
        let from = offsets.nth(start)?;
        let to = if end == start {
            from
        } else {
            offsets.nth(end - start - 1)?
        };
        Some(&self.text[from..to])
    }

    /// Text covered by an annotation's resolved span
    pub fn annotation_text(&self, annotation: &Annotation) -> Result<&str> {
        let span = annotation.resolved_span()?;
        self.slice(span.start, span.end)
            .ok_or_else(|| annotation.invalid_span())
    }

    /// Offset table for slicing many spans of the text
    pub fn text_index(&self) -> TextIndex<'_> {
        TextIndex::new(&self.text)
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// Views declaring `annotation_type`, oldest first
    pub fn views_containing<'a>(
        &'a self,
        annotation_type: &'a str,
    ) -> impl Iterator<Item = &'a View> + 'a {
        self.views.iter().filter(move |v| v.contains(annotation_type))
    }

    /// The canonical source of `annotation_type`: the most recent view declaring it
    pub fn last_view_containing(&self, annotation_type: &str) -> Option<&View> {
        self.views.iter().rev().find(|v| v.contains(annotation_type))
    }

    /// Id for the next view: the first free `v{k}` with `k >= views().len()`
    pub fn next_view_id(&self) -> String {
        let mut k = self.views.len();
        loop {
            let id = format!("v{k}");
            if !self.views.iter().any(|v| v.id == id) {
                return id;
            }
            k += 1;
        }
    }

    /// Check every view, plus view id uniqueness, e.g. after `from_json`
    pub fn validate(&self) -> Result<()> {
        let text_len = self.char_len();
        let mut seen = HashSet::with_capacity(self.views.len());
        for view in &self.views {
            if !seen.insert(view.id.as_str()) {
                return Err(LifError::InvalidView(format!(
                    "container already holds a view with id {}",
                    view.id
                )));
            }
            view.validate(text_len)?;
        }
        Ok(())
    }

    /// Validate and append a view
    ///
    /// Nothing is appended when validation fails.
    pub fn append_view(&mut self, view: View) -> Result<&View> {
        view.validate(self.char_len())?;
        if self.views.iter().any(|v| v.id == view.id) {
            return Err(LifError::InvalidView(format!(
                "container already holds a view with id {}",
                view.id
            )));
        }
        self.views.push(view);
        let last = self.views.len() - 1;
        Ok(&self.views[last])
    }
}

/// Character offsets to byte offsets, computed once per text
///
/// `Container::slice` walks the text on every call; slicing through an index
/// is constant time per span.
#[derive(Debug, Clone)]
pub struct TextIndex<'a> {
    text: &'a str,
    /// Byte offset of every char boundary, end included; `None` for ASCII
    boundaries: Option<Vec<usize>>,
}

impl<'a> TextIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let boundaries = (!text.is_ascii()).then(|| {
            text.char_indices()
                .map(|(i, _)| i)
                .chain(std::iter::once(text.len()))
                .collect()
        });
        Self { text, boundaries }
    }

    /// Length of the text in characters
    pub fn char_len(&self) -> usize {
        match &self.boundaries {
            Some(boundaries) => boundaries.len() - 1,
            None => self.text.len(),
        }
    }

    /// Text covered by the character span `[start, end)`
    pub fn slice(&self, start: usize, end: usize) -> Option<&'a str> {
        if start > end {
            return None;
        }
        match &self.boundaries {
            None => self.text.get(start..end),
            Some(boundaries) => {
                let from = *boundaries.get(start)?;
                let to = *boundaries.get(end)?;
                Some(&self.text[from..to])
            }
        }
    }

    /// Text covered by an annotation's resolved span
    pub fn annotation_text(&self, annotation: &Annotation) -> Result<&'a str> {
        let span = annotation.resolved_span()?;
        self.slice(span.start, span.end)
            .ok_or_else(|| annotation.invalid_span())
    }
}

// ============================================================================
// Tests
// ============================================================================
