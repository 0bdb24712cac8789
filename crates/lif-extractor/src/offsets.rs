//! Token-index to character-offset resolution

use std::ops::Range;

use lif_core::{Annotation, LifError, Result};

/// Character spans of an ordered token layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenOffsets {
    spans: Vec<Range<usize>>,
}

impl TokenOffsets {
    /// Collect the spans of token annotations, in order
    ///
    /// Every token must carry a resolved span.
    pub fn from_annotations<'a>(tokens: impl IntoIterator<Item = &'a Annotation>) -> Result<Self> {
        let spans = tokens
            .into_iter()
            .map(Annotation::resolved_span)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { spans })
    }

    pub fn from_spans(spans: Vec<Range<usize>>) -> Self {
        Self { spans }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Resolve the inclusive token span `[first, last]` to `[start(first), end(last))`
    pub fn resolve(&self, first: usize, last: usize) -> Result<Range<usize>> {
        if first > last || last >= self.spans.len() {
            return Err(LifError::Index {
                first,
                last,
                len: self.spans.len(),
            });
        }
        Ok(self.spans[first].start..self.spans[last].end)
    }
}
