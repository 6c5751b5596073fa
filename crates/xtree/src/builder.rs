//! Event-driven tree construction

use tracing::{debug, trace};

use crate::content::ContentAccumulator;
use crate::error::{Error, Result};
use crate::event::EventHandler;
use crate::tree::{Attributes, Content, Document, NodeId};

/// Builds a [`Document`] from parse events.
///
/// One builder serves one parse. It keeps two cursors: `current_parent`,
/// where the next element is attached, and `current_element`, the element
/// whose content is being collected. Ascent follows parent links, so end tag
/// names never need to match.
#[derive(Debug)]
pub struct TreeBuilder {
    document: Document,
    current_parent: NodeId,
    current_element: Option<NodeId>,
    content: ContentAccumulator,
    trim_whitespace: bool,
    error: Option<Error>,
}

impl TreeBuilder {
    pub fn new(trim_whitespace: bool) -> Self {
        Self {
            document: Document::new(),
            current_parent: NodeId::ROOT,
            current_element: None,
            content: ContentAccumulator::new(),
            trim_whitespace,
            error: None,
        }
    }

    /// Node new elements are attached to
    pub const fn current_parent(&self) -> NodeId {
        self.current_parent
    }

    /// Element still open for content, if any
    pub const fn current_element(&self) -> Option<NodeId> {
        self.current_element
    }

    pub const fn document(&self) -> &Document {
        &self.document
    }

    pub fn recorded_error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Resolve the parse once the source has stopped. `success` is the
    /// source's own completion signal.
    pub fn finish(self, success: bool) -> Result<Document> {
        if success {
            return Ok(self.document);
        }
        Err(self.error.unwrap_or_else(Error::parsing_failed))
    }

    fn apply(&mut self, content: Option<Content>) {
        if let Some(element) = self
            .current_element
            .and_then(|id| self.document.get_mut(id))
        {
            element.set_content(content);
        }
    }
}

impl EventHandler for TreeBuilder {
    fn on_element_start(&mut self, name: &str, attributes: Attributes) {
        self.content.reset();
        let id = self
            .document
            .add_child(self.current_parent, name, attributes);
        trace!(element = name, parent = self.current_parent.index(), "open element");
        self.current_element = Some(id);
        self.current_parent = id;
    }

    fn on_characters(&mut self, chunk: &str) {
        let content = self.content.push_text(chunk);
        self.apply(content);
    }

    fn on_cdata(&mut self, bytes: &[u8]) {
        match self.content.push_cdata(bytes) {
            Ok(content) => self.apply(content),
            Err(err) => debug!(len = bytes.len(), %err, "dropping undecodable CDATA block"),
        }
    }

    fn on_element_end(&mut self, name: &str) {
        if self.trim_whitespace {
            if let Some(content) = self
                .current_element
                .and_then(|id| self.document.get_mut(id))
                .and_then(|element| element.content_mut())
            {
                content.trim();
            }
        }
        trace!(element = name, "close element");
        if let Some(parent) = self.document.parent(self.current_parent) {
            self.current_parent = parent;
        }
        self.current_element = None;
    }

    fn on_fatal_error(&mut self, error: Error) {
        debug!(%error, "event source reported fatal error");
        self.error = Some(error);
    }
}
