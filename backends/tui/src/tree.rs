//! Arena-backed host tree.
//!
//! [`TerminalTree`] is the node store the reconciler patches. The renderer
//! reads it back to produce frames, and the app reads bound handlers from it
//! to dispatch input.

use std::collections::BTreeMap;

use ripple_core::{Handler, Host, HostError, PropValue};

/// Identifier for a node stored inside the [`TerminalTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Creates a new [`NodeId`] from the raw index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the raw index backing this identifier.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Element state mirrored from props.
#[derive(Debug, Default)]
pub struct ElementData {
    tag: String,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    handlers: BTreeMap<String, Handler>,
}

impl ElementData {
    /// Returns the tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Looks up an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Looks up a style property.
    #[must_use]
    pub fn style(&self, property: &str) -> Option<&str> {
        self.style.get(property).map(String::as_str)
    }

    /// Returns `true` if a handler is bound for `event`.
    #[must_use]
    pub fn handles(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }
}

/// Content of a node.
#[derive(Debug)]
pub enum NodeKind {
    /// An element.
    Element(ElementData),
    /// A text leaf.
    Text(String),
}

#[derive(Debug)]
struct NodeEntry {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

impl NodeEntry {
    const fn new(kind: NodeKind) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            kind,
        }
    }
}

/// Arena of terminal nodes implementing [`Host`].
#[derive(Debug)]
pub struct TerminalTree {
    nodes: Vec<Option<NodeEntry>>,
    /// Freed slots, reused by the next created node.
    free: Vec<NodeId>,
    root: NodeId,
    dirty: bool,
}

impl Default for TerminalTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalTree {
    /// Creates a tree holding only the `screen` container.
    #[must_use]
    pub fn new() -> Self {
        let screen = NodeEntry::new(NodeKind::Element(ElementData {
            tag: "screen".into(),
            ..ElementData::default()
        }));
        Self {
            nodes: vec![Some(screen)],
            free: Vec::new(),
            root: NodeId(0),
            dirty: true,
        }
    }

    /// Returns the container every root renders into.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, the container included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Number of allocated slots, live or free.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when only the container is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Returns `true` if `id` refers to a live node.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.entry(id).is_some()
    }

    /// Returns the content of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.entry(id).map(|entry| &entry.kind)
    }

    /// Returns the element data of a node.
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.kind(id) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    /// Returns the child identifiers for the provided node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.entry(id).map_or(&[], |entry| entry.children.as_slice())
    }

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entry(id).and_then(|entry| entry.parent)
    }

    /// Concatenated text of a subtree.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(NodeKind::Element(_)) => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
            None => {}
        }
    }

    /// Returns the handler bound on `id` for `event`.
    #[must_use]
    pub fn handler(&self, id: NodeId, event: &str) -> Option<Handler> {
        self.element(id)
            .and_then(|element| element.handlers.get(event).cloned())
    }

    /// Finds the first attached element whose `id` attribute equals `dom_id`.
    #[must_use]
    pub fn find_by_id(&self, dom_id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|id| self.element(*id).and_then(|e| e.attribute("id")) == Some(dom_id))
    }

    /// Elements that accept focus, in document order.
    ///
    /// An element is focusable when it handles `click` or `input`.
    #[must_use]
    pub fn focusable(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| {
                self.element(*id)
                    .is_some_and(|element| element.handles("click") || element.handles("input"))
            })
            .collect()
    }

    /// Returns and clears the "changed since last draw" flag.
    pub fn take_dirty(&mut self) -> bool {
        core::mem::take(&mut self.dirty)
    }

    fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    fn entry(&self, id: NodeId) -> Option<&NodeEntry> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn entry_mut(&mut self, id: NodeId) -> Result<&mut NodeEntry, HostError> {
        self.dirty = true;
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| HostError::new(format!("node {} is not live", id.index())))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, HostError> {
        match &mut self.entry_mut(id)?.kind {
            NodeKind::Element(element) => Ok(element),
            NodeKind::Text(_) => Err(HostError::new(format!(
                "node {} is a text node",
                id.index()
            ))),
        }
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let entry = Some(NodeEntry::new(kind));
        if let Some(id) = self.free.pop() {
            self.nodes[id.index()] = entry;
            return id;
        }
        self.nodes.push(entry);
        NodeId(self.nodes.len() - 1)
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(entry) = self.nodes.get_mut(next.index()).and_then(Option::take) {
                stack.extend(entry.children);
                self.free.push(next);
            }
        }
    }
}

impl Host for TerminalTree {
    type Node = NodeId;

    fn create_node(&mut self, tag: &str) -> Result<NodeId, HostError> {
        self.dirty = true;
        Ok(self.push(NodeKind::Element(ElementData {
            tag: tag.into(),
            ..ElementData::default()
        })))
    }

    fn create_text_node(&mut self, content: &str) -> Result<NodeId, HostError> {
        self.dirty = true;
        Ok(self.push(NodeKind::Text(content.into())))
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &PropValue) -> Result<(), HostError> {
        let value = value
            .to_attribute()
            .ok_or_else(|| HostError::new(format!("`{name}` is not a plain attribute")))?;
        self.element_mut(*node)?.attributes.insert(name.into(), value);
        Ok(())
    }

    fn remove_attribute(&mut self, node: &NodeId, name: &str) -> Result<(), HostError> {
        self.element_mut(*node)?.attributes.remove(name);
        Ok(())
    }

    fn set_style(&mut self, node: &NodeId, property: &str, value: Option<&str>) -> Result<(), HostError> {
        let style = &mut self.element_mut(*node)?.style;
        match value {
            Some(value) => {
                style.insert(property.into(), value.into());
            }
            None => {
                style.remove(property);
            }
        }
        Ok(())
    }

    fn bind_handler(&mut self, node: &NodeId, event: &str, handler: &Handler) -> Result<(), HostError> {
        self.element_mut(*node)?
            .handlers
            .insert(event.into(), handler.clone());
        Ok(())
    }

    fn unbind_handler(&mut self, node: &NodeId, event: &str, handler: &Handler) -> Result<(), HostError> {
        let handlers = &mut self.element_mut(*node)?.handlers;
        if handlers.get(event).is_some_and(|bound| bound.ptr_eq(handler)) {
            handlers.remove(event);
        }
        Ok(())
    }

    fn insert_child(&mut self, parent: &NodeId, child: &NodeId, index: usize) -> Result<(), HostError> {
        if parent == child {
            return Err(HostError::new("a node cannot contain itself"));
        }
        if let Some(previous) = self.entry_mut(*child)?.parent {
            self.entry_mut(previous)?.children.retain(|id| id != child);
        }
        let siblings = &mut self.entry_mut(*parent)?.children;
        let index = index.min(siblings.len());
        siblings.insert(index, *child);
        self.entry_mut(*child)?.parent = Some(*parent);
        Ok(())
    }

    fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
        let siblings = &mut self.entry_mut(*parent)?.children;
        let Some(position) = siblings.iter().position(|id| id == child) else {
            return Err(HostError::new(format!(
                "node {} is not a child of node {}",
                child.index(),
                parent.index()
            )));
        };
        siblings.remove(position);
        self.free_subtree(*child);
        Ok(())
    }

    fn set_text_content(&mut self, node: &NodeId, content: &str) -> Result<(), HostError> {
        match &mut self.entry_mut(*node)?.kind {
            NodeKind::Text(text) => {
                content.clone_into(text);
                Ok(())
            }
            NodeKind::Element(_) => Err(HostError::new(format!(
                "node {} is not a text node",
                node.index()
            ))),
        }
    }

    fn child_at(&self, parent: &NodeId, index: usize) -> Option<NodeId> {
        self.children(*parent).get(index).copied()
    }

    fn is_text_node(&self, node: &NodeId) -> bool {
        matches!(self.kind(*node), Some(NodeKind::Text(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(tree: &mut TerminalTree, parent: NodeId, content: &str) -> NodeId {
        let node = tree.create_text_node(content).expect("create should succeed");
        let index = tree.children(parent).len();
        tree.insert_child(&parent, &node, index)
            .expect("insert should succeed");
        node
    }

    #[test]
    fn inserting_an_attached_child_moves_it() {
        let mut tree = TerminalTree::new();
        let root = tree.root();
        let a = text(&mut tree, root, "a");
        let b = text(&mut tree, root, "b");
        let c = text(&mut tree, root, "c");

        tree.insert_child(&root, &c, 0).expect("move should succeed");
        assert_eq!(tree.children(root), [c, a, b]);
        assert_eq!(tree.text_content(root), "cab");
    }

    #[test]
    fn removing_frees_the_subtree() {
        let mut tree = TerminalTree::new();
        let root = tree.root();
        let list = tree.create_node("ul").expect("create should succeed");
        tree.insert_child(&root, &list, 0).expect("insert should succeed");
        let item = text(&mut tree, list, "item");
        assert_eq!(tree.len(), 3);

        tree.remove_child(&root, &list).expect("remove should succeed");
        assert!(!tree.contains(list));
        assert!(!tree.contains(item));
        assert!(tree.is_empty());
        assert!(tree.remove_child(&root, &list).is_err());
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut tree = TerminalTree::new();
        let root = tree.root();
        for round in 0..10 {
            let list = tree.create_node("ul").expect("create should succeed");
            tree.insert_child(&root, &list, 0).expect("insert should succeed");
            text(&mut tree, list, "item");
            assert_eq!(tree.len(), 3, "round {round}");
            tree.remove_child(&root, &list).expect("remove should succeed");
        }
        assert_eq!(tree.capacity(), 3);
    }

    #[test]
    fn focusable_elements_follow_document_order() {
        let mut tree = TerminalTree::new();
        let root = tree.root();
        let form = tree.create_node("form").expect("create should succeed");
        let input = tree.create_node("input").expect("create should succeed");
        let button = tree.create_node("button").expect("create should succeed");
        tree.insert_child(&root, &form, 0).expect("insert should succeed");
        tree.insert_child(&form, &input, 0).expect("insert should succeed");
        tree.insert_child(&root, &button, 1).expect("insert should succeed");

        let handler = Handler::new(|_| {});
        tree.bind_handler(&button, "click", &handler)
            .expect("bind should succeed");
        tree.bind_handler(&input, "input", &handler)
            .expect("bind should succeed");
        assert_eq!(tree.focusable(), [input, button]);

        tree.unbind_handler(&button, "click", &Handler::new(|_| {}))
            .expect("unbind should succeed");
        assert!(tree.handler(button, "click").is_some());
        tree.unbind_handler(&button, "click", &handler)
            .expect("unbind should succeed");
        assert_eq!(tree.focusable(), [input]);
    }

    #[test]
    fn text_operations_reject_elements() {
        let mut tree = TerminalTree::new();
        let root = tree.root();
        assert!(tree.set_text_content(&root, "nope").is_err());
        let node = text(&mut tree, root, "old");
        tree.set_text_content(&node, "new").expect("update should succeed");
        assert_eq!(tree.text_content(root), "new");
        assert!(tree.is_text_node(&node));
    }
}
