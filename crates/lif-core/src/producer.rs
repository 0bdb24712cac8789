//! Producer capability interface
//!
//! Every processing component has the same lifecycle: read the container,
//! build exactly one new view, append it.

use crate::{Container, Result, View};

/// A pipeline stage that contributes one annotation layer
pub trait Producer: Send + Sync {
    /// Component name recorded in view metadata
    fn name(&self) -> &str;

    /// Component version recorded in view metadata
    fn version(&self) -> &str;

    /// `<component-name>:<version>`
    fn producer_tag(&self) -> String {
        format!("{}:{}", self.name(), self.version())
    }

    /// Build the new view without touching the container
    fn annotate(&self, container: &Container) -> Result<View>;

    /// Build the new view and append it to the container
    ///
    /// Either the complete view is appended or, on error, nothing is.
    fn produce<'c>(&self, container: &'c mut Container) -> Result<&'c View> {
        let view = self.annotate(container)?;
        tracing::debug!(
            producer = self.name(),
            view = %view.id,
            annotations = view.len(),
            "Appending view"
        );
        container.append_view(view)
    }
}
