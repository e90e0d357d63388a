//! Element tree backing the in-memory UI.

use std::collections::BTreeMap;

use crate::driver::{BoundingBox, ElementSnapshot};
use crate::selector::css::{Element, SelectorList};

/// Index of a node in a [`Document`]
pub type NodeId = usize;

/// Declarative element used to build or replace parts of a [`Document`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct El {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    children: Vec<El>,
    focused: bool,
}

impl El {
    /// Element with the given tag
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Append a class
    #[must_use]
    pub fn class(mut self, class: impl AsRef<str>) -> Self {
        let entry = self.attributes.entry("class".to_string()).or_default();
        if !entry.is_empty() {
            entry.push(' ');
        }
        entry.push_str(class.as_ref());
        self
    }

    /// Set the id
    #[must_use]
    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the `disabled` attribute
    #[must_use]
    pub fn disabled(self) -> Self {
        self.attr("disabled", "")
    }

    /// Set own text (rendered before children)
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Append a child
    #[must_use]
    pub fn child(mut self, child: El) -> Self {
        self.children.push(child);
        self
    }

    /// Append several children
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = El>) -> Self {
        self.children.extend(children);
        self
    }

    /// Give this element focus once mounted
    #[must_use]
    pub fn focused(mut self) -> Self {
        self.focused = true;
        self
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Mutable element tree.
///
/// Removed nodes leave a hole so previously issued ids never alias.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<Node>>,
    root: NodeId,
    focus: Option<NodeId>,
    closed: bool,
}

impl Document {
    /// Build a document from its root element
    #[must_use]
    pub fn new(root: El) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: 0,
            focus: None,
            closed: false,
        };
        doc.root = doc.mount(root, None);
        doc
    }

    fn mount(&mut self, el: El, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(Node {
            tag: el.tag,
            attributes: el.attributes,
            text: el.text,
            parent,
            children: Vec::new(),
        }));
        if el.focused {
            self.focus = Some(id);
        }
        let children: Vec<NodeId> = el
            .children
            .into_iter()
            .map(|child| self.mount(child, Some(id)))
            .collect();
        if let Some(node) = self.node_mut(id) {
            node.children = children;
        }
        id
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id).and_then(Option::as_mut)
    }

    /// Root node
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Whether `id` is still attached
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Tear the surface down; every later driver call fails
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Whether [`close`](Self::close) was called
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// All attached nodes in document (pre-)order
    #[must_use]
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.node(id) {
                out.push(id);
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// Nodes matching a parsed selector list, in document order
    #[must_use]
    pub fn query(&self, selector: &SelectorList) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|id| selector.matches(NodeRef { doc: self, id: *id }))
            .collect()
    }

    /// Nodes matching a CSS selector; an unparsable selector matches nothing
    #[must_use]
    pub fn select(&self, css: &str) -> Vec<NodeId> {
        SelectorList::parse(css)
            .map(|list| self.query(&list))
            .unwrap_or_default()
    }

    /// First node matching a CSS selector
    #[must_use]
    pub fn first(&self, css: &str) -> Option<NodeId> {
        self.select(css).into_iter().next()
    }

    /// Whether `ancestor` strictly contains `id`
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cursor = self.node(id).and_then(|n| n.parent);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.node(current).and_then(|n| n.parent);
        }
        false
    }

    /// Tag name
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.tag.as_str())
    }

    /// Own text followed by the text of all descendants
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if let Some(node) = self.node(id) {
            out.push_str(&node.text);
            for child in &node.children {
                self.collect_text(*child, out);
            }
        }
    }

    /// Replace text content, dropping children
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.clear_children(id);
        if let Some(node) = self.node_mut(id) {
            node.text = text.into();
        }
    }

    /// Append to own text
    pub fn push_text(&mut self, id: NodeId, text: &str) {
        if let Some(node) = self.node_mut(id) {
            node.text.push_str(text);
        }
    }

    /// Attribute value
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)
            .and_then(|n| n.attributes.get(name))
            .map(String::as_str)
    }

    /// Set an attribute
    pub fn set_attr(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        if let Some(node) = self.node_mut(id) {
            node.attributes.insert(name.into(), value.into());
        }
    }

    /// Remove an attribute
    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(node) = self.node_mut(id) {
            node.attributes.remove(name);
        }
    }

    /// Whether the node carries `class`
    #[must_use]
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attribute(id, "class")
            .is_some_and(|v| v.split_whitespace().any(|c| c == class))
    }

    /// Add a class if missing
    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        if let Some(node) = self.node_mut(id) {
            let entry = node.attributes.entry("class".to_string()).or_default();
            if !entry.is_empty() {
                entry.push(' ');
            }
            entry.push_str(class);
        }
    }

    /// Remove a class if present
    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.node_mut(id) {
            if let Some(value) = node.attributes.get_mut("class") {
                *value = value
                    .split_whitespace()
                    .filter(|c| *c != class)
                    .collect::<Vec<_>>()
                    .join(" ");
            }
        }
    }

    /// Whether clicks on the node are ignored
    #[must_use]
    pub fn is_disabled(&self, id: NodeId) -> bool {
        self.attribute(id, "disabled").is_some()
            || self.attribute(id, "aria-disabled") == Some("true")
    }

    /// Mount `el` as the last child of `parent`
    pub fn append(&mut self, parent: NodeId, el: El) -> Option<NodeId> {
        if !self.contains(parent) {
            return None;
        }
        let id = self.mount(el, Some(parent));
        if let Some(node) = self.node_mut(parent) {
            node.children.push(id);
        }
        Some(id)
    }

    /// Detach a node and its subtree. The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        let parent = self.node(id).and_then(|n| n.parent);
        if let Some(parent) = parent.and_then(|p| self.node_mut(p)) {
            parent.children.retain(|c| *c != id);
        }
        self.drop_subtree(id);
    }

    fn drop_subtree(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id).and_then(Option::take) else {
            return;
        };
        if self.focus == Some(id) {
            self.focus = None;
        }
        for child in node.children {
            self.drop_subtree(child);
        }
    }

    fn clear_children(&mut self, id: NodeId) {
        let children = self
            .node_mut(id)
            .map(|n| std::mem::take(&mut n.children))
            .unwrap_or_default();
        for child in children {
            self.drop_subtree(child);
        }
    }

    /// Replace all children of `id`
    pub fn replace_children(&mut self, id: NodeId, children: impl IntoIterator<Item = El>) {
        self.clear_children(id);
        for child in children {
            self.append(id, child);
        }
    }

    /// Move focus
    pub fn focus(&mut self, id: NodeId) {
        if self.contains(id) {
            self.focus = Some(id);
        }
    }

    /// Focused node
    #[must_use]
    pub const fn focused(&self) -> Option<NodeId> {
        self.focus
    }

    /// Snapshot a node as a driver would report it
    #[must_use]
    pub fn snapshot(&self, id: NodeId, index: usize) -> Option<ElementSnapshot> {
        let node = self.node(id)?;
        let hidden = node.attributes.contains_key("hidden");
        let order = self.preorder().iter().position(|n| *n == id).unwrap_or(0);
        Some(ElementSnapshot {
            index,
            handle: handle_for(id),
            tag: node.tag.clone(),
            text: self.text_content(id),
            attributes: node.attributes.clone(),
            disabled: self.is_disabled(id),
            bounds: (!hidden).then(|| BoundingBox::new(0.0, 24.0 * order as f64, 320.0, 24.0)),
        })
    }
}

/// Driver handle for a node
#[must_use]
pub fn handle_for(id: NodeId) -> String {
    format!("node-{id}")
}

/// Node id behind a handle produced by [`handle_for`]
#[must_use]
pub fn node_for(handle: &str) -> Option<NodeId> {
    handle.strip_prefix("node-")?.parse().ok()
}

#[derive(Clone, Copy)]
struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl Element for NodeRef<'_> {
    fn tag(&self) -> &str {
        self.doc.tag(self.id).unwrap_or_default()
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.doc.attribute(self.id, name)
    }

    fn parent(&self) -> Option<Self> {
        self.doc
            .node(self.id)
            .and_then(|n| n.parent)
            .map(|id| NodeRef { doc: self.doc, id })
    }

    fn position(&self) -> (usize, usize) {
        let siblings = self
            .doc
            .node(self.id)
            .and_then(|n| n.parent)
            .and_then(|p| self.doc.node(p))
            .map(|p| p.children.as_slice())
            .unwrap_or_default();
        match siblings.iter().position(|c| *c == self.id) {
            Some(i) => (i + 1, siblings.len()),
            None => (1, 1),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new(El::new("body").children([
            El::new("div").class("layout").child(El::new("p").class("block").text("Hello")),
            El::new("div").class("inserter").child(El::new("button").text("+")),
        ]))
    }

    #[test]
    fn test_preorder_is_document_order() {
        let d = doc();
        let tags: Vec<_> = d.preorder().iter().map(|id| d.tag(*id).unwrap()).collect();
        assert_eq!(tags, vec!["body", "div", "p", "div", "button"]);
    }

    #[test]
    fn test_text_content_concatenates_descendants() {
        let d = doc();
        assert_eq!(d.text_content(d.root()), "Hello+");
    }

    #[test]
    fn test_remove_detaches_subtree() {
        let mut d = doc();
        let layout = d.first(".layout").unwrap();
        let p = d.first("p").unwrap();
        d.remove(layout);
        assert!(!d.contains(layout));
        assert!(!d.contains(p));
        assert!(d.select(".block").is_empty());
    }

    #[test]
    fn test_ids_not_reused_after_replace() {
        let mut d = doc();
        let old = d.first("p").unwrap();
        let layout = d.first(".layout").unwrap();
        d.replace_children(layout, [El::new("textarea").text("<p>Hello</p>")]);
        let new = d.first("textarea").unwrap();
        assert_ne!(old, new);
        assert!(!d.contains(old));
    }

    #[test]
    fn test_class_edits() {
        let mut d = doc();
        let p = d.first("p").unwrap();
        d.add_class(p, "is-selected");
        d.add_class(p, "is-selected");
        assert_eq!(d.attribute(p, "class"), Some("block is-selected"));
        d.remove_class(p, "block");
        assert_eq!(d.attribute(p, "class"), Some("is-selected"));
    }

    #[test]
    fn test_disabled_via_aria() {
        let mut d = doc();
        let button = d.first("button").unwrap();
        assert!(!d.is_disabled(button));
        d.set_attr(button, "aria-disabled", "true");
        assert!(d.is_disabled(button));
        assert!(d.snapshot(button, 0).unwrap().disabled);
    }

    #[test]
    fn test_handle_round_trip() {
        assert_eq!(node_for(&handle_for(42)), Some(42));
        assert_eq!(node_for("0"), None);
    }

    #[test]
    fn test_focus_cleared_when_node_removed() {
        let mut d = Document::new(El::new("body").child(El::new("p").focused()));
        let p = d.first("p").unwrap();
        assert_eq!(d.focused(), Some(p));
        d.remove(p);
        assert_eq!(d.focused(), None);
    }
}
