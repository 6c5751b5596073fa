//! Arena-backed XML tree
//!
//! Every node lives in a single `Vec` owned by the [`Document`]. Children are
//! owned through the parent's `children` list; the `parent` field is a plain
//! index back into the arena and never implies ownership.

use indexmap::IndexMap;

use crate::error::{Error, ErrorKind, Result, Span};

/// Attribute map, insertion ordered
pub type Attributes = IndexMap<String, String>;

/// Handle to a node inside a [`Document`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The document root, present in every document
    pub const ROOT: Self = Self(0);

    pub const fn index(self) -> usize {
        self.0
    }
}

/// Where an element's value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    /// Parsed character data
    Text,
    /// A CDATA section
    CData,
}

/// Element text together with its provenance
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Content {
    pub text: String,
    pub kind: ContentKind,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: ContentKind::Text,
        }
    }

    pub fn cdata(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: ContentKind::CData,
        }
    }

    pub const fn is_cdata(&self) -> bool {
        matches!(self.kind, ContentKind::CData)
    }

    /// Trim surrounding whitespace in place. An all-whitespace value becomes
    /// the empty string, not `None`.
    pub fn trim(&mut self) {
        let trimmed = self.text.trim();
        if trimmed.len() != self.text.len() {
            self.text = trimmed.to_string();
        }
    }
}

/// One element of the tree (or the nameless document root)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    name: String,
    attributes: Attributes,
    content: Option<Content>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl Element {
    fn new(name: String, attributes: Attributes, parent: Option<NodeId>) -> Self {
        Self {
            name,
            attributes,
            content: None,
            children: Vec::new(),
            parent,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Text value, if any
    pub fn value(&self) -> Option<&str> {
        self.content.as_ref().map(|content| content.text.as_str())
    }

    /// `None` when there is no value, otherwise whether it came from CDATA
    pub fn is_cdata(&self) -> Option<bool> {
        self.content.as_ref().map(Content::is_cdata)
    }

    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    pub fn content_mut(&mut self) -> Option<&mut Content> {
        self.content.as_mut()
    }

    /// Replace value and provenance together
    pub fn set_content(&mut self, content: Option<Content>) {
        self.content = content;
    }

    /// Set a character-data value
    pub fn set_value(&mut self, value: Option<String>) {
        self.content = value.map(Content::text);
    }

    /// Set a CDATA value
    pub fn set_cdata_value(&mut self, value: Option<String>) {
        self.content = value.map(Content::cdata);
    }

    pub fn clear_value(&mut self) {
        self.content = None;
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// A parsed document: the root node and everything below it
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    nodes: Vec<Element>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding only the root node
    pub fn new() -> Self {
        Self {
            nodes: vec![Element::default()],
        }
    }

    pub const fn root_node(&self) -> NodeId {
        NodeId::ROOT
    }

    /// First element below the document root
    pub fn root(&self) -> Result<NodeId> {
        self.get(NodeId::ROOT)
            .and_then(|root| root.children.first().copied())
            .ok_or_else(|| Error::new(ErrorKind::RootElementMissing, Span::empty()))
    }

    pub fn get(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.nodes.get_mut(id.0)
    }

    /// Append a new element as the last child of `parent`
    ///
    /// `parent` must come from this document; an unknown id leaves the new
    /// node detached.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        attributes: Attributes,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(Element::new(name.into(), attributes, Some(parent)));
        if let Some(parent) = self.nodes.get_mut(parent.0) {
            parent.children.push(id);
        }
        id
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Element::parent)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Element)> + '_ {
        self.get(id)
            .map(|element| element.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |&child| self.get(child).map(|element| (child, element)))
    }

    /// First child of `id` whose name equals `name`
    pub fn first_child_named(&self, id: NodeId, name: &str) -> Result<NodeId> {
        self.children(id)
            .find(|(_, element)| element.name == name)
            .map(|(child, _)| child)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::ElementNotFound {
                        name: name.to_string(),
                    },
                    Span::empty(),
                )
            })
    }

    /// Number of nodes, the document root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing but the document root exists
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }
}

#[cfg(feature = "serde")]
mod serialize {
    use serde::ser::{SerializeStruct, Serializer};
    use serde::Serialize;

    use super::{Document, NodeId};

    struct NodeRef<'a> {
        doc: &'a Document,
        id: NodeId,
    }

    struct Children<'a> {
        doc: &'a Document,
        ids: &'a [NodeId],
    }

    impl Serialize for NodeRef<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let Some(element) = self.doc.get(self.id) else {
                return serializer.serialize_none();
            };
            let mut state = serializer.serialize_struct("Element", 5)?;
            state.serialize_field("name", element.name())?;
            state.serialize_field("attributes", element.attributes())?;
            state.serialize_field("value", &element.value())?;
            state.serialize_field("cdata", &element.is_cdata())?;
            state.serialize_field(
                "children",
                &Children {
                    doc: self.doc,
                    ids: element.children(),
                },
            )?;
            state.end()
        }
    }

    impl Serialize for Children<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(self.ids.iter().map(|&id| NodeRef { doc: self.doc, id }))
        }
    }

    impl Serialize for Document {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let root = self.get(NodeId::ROOT).map(|root| root.children()).unwrap_or_default();
            Children { doc: self, ids: root }.serialize(serializer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_has_only_root() {
        let doc = Document::new();
        assert_eq!(doc.len(), 1);
        assert!(doc.is_empty());
        assert_eq!(doc.root_node(), NodeId::ROOT);
        assert_eq!(doc.parent(NodeId::ROOT), None);
    }

    #[test]
    fn test_root_missing() {
        let doc = Document::new();
        let kind = doc.root().map_err(|err| err.kind().clone());
        assert_eq!(kind, Err(ErrorKind::RootElementMissing));
    }

    #[test]
    fn test_add_child_links_parent_and_order() {
        let mut doc = Document::new();
        let a = doc.add_child(NodeId::ROOT, "a", Attributes::new());
        let b = doc.add_child(a, "b", Attributes::new());
        let c = doc.add_child(a, "c", Attributes::new());

        assert_eq!(doc.root().ok(), Some(a));
        assert_eq!(doc.parent(b), Some(a));
        assert_eq!(doc.parent(a), Some(NodeId::ROOT));
        let names: Vec<&str> = doc.children(a).map(|(_, el)| el.name()).collect();
        assert_eq!(names, ["b", "c"]);
        assert_eq!(doc.first_child_named(a, "c").ok(), Some(c));
    }

    #[test]
    fn test_first_child_named_missing() {
        let mut doc = Document::new();
        let a = doc.add_child(NodeId::ROOT, "a", Attributes::new());
        let kind = doc
            .first_child_named(a, "nope")
            .map_err(|err| err.kind().clone());
        assert_eq!(
            kind,
            Err(ErrorKind::ElementNotFound {
                name: "nope".to_string()
            })
        );
    }

    #[test]
    fn test_value_and_flag_move_together() {
        let mut el = Element::default();
        assert_eq!((el.value(), el.is_cdata()), (None, None));

        el.set_value(Some("x".to_string()));
        assert_eq!((el.value(), el.is_cdata()), (Some("x"), Some(false)));

        el.set_cdata_value(Some("y".to_string()));
        assert_eq!((el.value(), el.is_cdata()), (Some("y"), Some(true)));

        el.clear_value();
        assert_eq!((el.value(), el.is_cdata()), (None, None));
    }

    #[test]
    fn test_trim_keeps_empty_string() {
        let mut content = Content::text(" \n\t ");
        content.trim();
        assert_eq!(content.text, "");

        let mut content = Content::cdata("  hi  ");
        content.trim();
        assert_eq!(content, Content::cdata("hi"));
    }

    #[test]
    fn test_attribute_lookup() {
        let mut attrs = Attributes::new();
        attrs.insert("id".to_string(), "1".to_string());
        let mut doc = Document::new();
        let a = doc.add_child(NodeId::ROOT, "a", attrs);
        assert_eq!(doc.get(a).and_then(|el| el.attribute("id")), Some("1"));
    }
}
