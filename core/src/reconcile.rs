//! Tree diffing and patch application.
//!
//! The reconciler walks the previous and the next description trees side by
//! side and applies the difference to the host directly. It keeps no state
//! between calls: host handles are read back from the host with
//! [`Host::child_at`] whenever a level is visited.

use alloc::{format, string::String, vec, vec::Vec};
use core::fmt;
use std::collections::HashMap;

use crate::{
    element::{Node, PropValue, Props, Style},
    error::RenderError,
    host::Host,
};

/// Host operations issued by one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    /// Nodes created, element and text alike.
    pub created: usize,
    /// Newly created subtrees attached to a parent.
    pub inserted: usize,
    /// Existing nodes moved to another index.
    pub moved: usize,
    /// Subtrees detached from their parent.
    pub removed: usize,
    /// Attribute and style writes or resets.
    pub attributes: usize,
    /// Handler binds and unbinds.
    pub handlers: usize,
    /// Text content updates.
    pub texts: usize,
}

impl PatchStats {
    /// Total number of host operations.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.created
            + self.inserted
            + self.moved
            + self.removed
            + self.attributes
            + self.handlers
            + self.texts
    }

    /// Returns `true` if the host was not touched.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for PatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} inserted, {} moved, {} removed, {} attributes, {} handlers, {} texts",
            self.created,
            self.inserted,
            self.moved,
            self.removed,
            self.attributes,
            self.handlers,
            self.texts
        )
    }
}

/// Applies the difference between two description trees to a host.
pub struct Reconciler<'h, H: Host> {
    host: &'h mut H,
    stats: PatchStats,
}

impl<H: Host> fmt::Debug for Reconciler<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<'h, H: Host> Reconciler<'h, H> {
    /// Creates a reconciler driving `host`.
    pub const fn new(host: &'h mut H) -> Self {
        Self {
            host,
            stats: PatchStats {
                created: 0,
                inserted: 0,
                moved: 0,
                removed: 0,
                attributes: 0,
                handlers: 0,
                texts: 0,
            },
        }
    }

    /// Returns the operations issued so far.
    #[must_use]
    pub const fn stats(&self) -> PatchStats {
        self.stats
    }

    /// Reconciles the child of `parent` at `index`.
    ///
    /// `prev` must describe what is currently rendered at that position.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ReconciliationMismatch`] when the host tree does
    /// not match `prev`, and [`RenderError::Host`] when a host operation fails.
    pub fn reconcile(
        &mut self,
        parent: &H::Node,
        prev: Option<&Node>,
        next: Option<&Node>,
        index: usize,
    ) -> Result<(), RenderError> {
        match (prev, next) {
            (_, None) => {
                if let Some(existing) = self.host.child_at(parent, index) {
                    self.remove(parent, &existing)?;
                }
                Ok(())
            }
            (None, Some(next)) => {
                let created = self.create(next)?;
                self.insert(parent, &created, index)
            }
            (Some(prev), Some(next)) => {
                let existing = self.existing(parent, index)?;
                self.patch(parent, &existing, prev, next, index)
            }
        }
    }

    fn patch(
        &mut self,
        parent: &H::Node,
        handle: &H::Node,
        prev: &Node,
        next: &Node,
        index: usize,
    ) -> Result<(), RenderError> {
        match (prev, next) {
            (_, Node::Text(text)) => {
                if !self.host.is_text_node(handle) {
                    return self.replace(parent, handle, next, index);
                }
                if prev.as_text() != Some(&**text) {
                    self.host.set_text_content(handle, text)?;
                    self.stats.texts += 1;
                }
                Ok(())
            }
            (Node::Element(old), Node::Element(new)) => {
                if old.tag() != new.tag() || old.key() != new.key() {
                    return self.replace(parent, handle, next, index);
                }
                self.diff_props(handle, old.props(), new.props())?;
                self.diff_children(handle, old.children(), new.children())
            }
            (Node::Text(_), Node::Element(_)) => self.replace(parent, handle, next, index),
        }
    }

    fn replace(
        &mut self,
        parent: &H::Node,
        old: &H::Node,
        next: &Node,
        index: usize,
    ) -> Result<(), RenderError> {
        let created = self.create(next)?;
        self.insert(parent, &created, index)?;
        self.remove(parent, old)
    }

    /// Builds the full host subtree for `node`, detached.
    fn create(&mut self, node: &Node) -> Result<H::Node, RenderError> {
        match node {
            Node::Text(text) => {
                let handle = self.host.create_text_node(text)?;
                self.stats.created += 1;
                Ok(handle)
            }
            Node::Element(element) => {
                let handle = self.host.create_node(element.tag())?;
                self.stats.created += 1;
                self.diff_props(&handle, &Props::new(), element.props())?;
                for (index, child) in element.children().iter().enumerate() {
                    let child_handle = self.create(child)?;
                    self.host.insert_child(&handle, &child_handle, index)?;
                }
                Ok(handle)
            }
        }
    }

    fn diff_children(
        &mut self,
        parent: &H::Node,
        old: &[Node],
        new: &[Node],
    ) -> Result<(), RenderError> {
        if old.is_empty() && new.is_empty() {
            return Ok(());
        }

        let handles = (0..old.len())
            .map(|index| self.existing(parent, index))
            .collect::<Result<Vec<_>, _>>()?;
        let lookup: HashMap<_, _> = old
            .iter()
            .enumerate()
            .map(|(index, node)| (node.identity(index), index))
            .collect();
        let mut consumed = vec![false; old.len()];

        for (index, next) in new.iter().enumerate() {
            let matched = lookup
                .get(&next.identity(index))
                .copied()
                .filter(|&previous| !consumed[previous] && same_shape(&old[previous], next));

            if let Some(previous) = matched {
                consumed[previous] = true;
                let handle = &handles[previous];
                self.place(parent, handle, index)?;
                self.patch(parent, handle, &old[previous], next, index)?;
            } else {
                let created = self.create(next)?;
                self.insert(parent, &created, index)?;
            }
        }

        for (handle, _) in handles.iter().zip(&consumed).filter(|(_, used)| !**used) {
            self.remove(parent, handle)?;
        }
        Ok(())
    }

    /// Moves a reused child to `index` unless it is already there.
    fn place(&mut self, parent: &H::Node, handle: &H::Node, index: usize) -> Result<(), RenderError> {
        if self.host.child_at(parent, index).as_ref() == Some(handle) {
            return Ok(());
        }
        self.host.insert_child(parent, handle, index)?;
        self.stats.moved += 1;
        Ok(())
    }

    fn insert(&mut self, parent: &H::Node, child: &H::Node, index: usize) -> Result<(), RenderError> {
        self.host.insert_child(parent, child, index)?;
        self.stats.inserted += 1;
        Ok(())
    }

    fn remove(&mut self, parent: &H::Node, child: &H::Node) -> Result<(), RenderError> {
        self.host.remove_child(parent, child)?;
        self.stats.removed += 1;
        Ok(())
    }

    fn existing(&self, parent: &H::Node, index: usize) -> Result<H::Node, RenderError> {
        self.host.child_at(parent, index).ok_or_else(|| {
            RenderError::mismatch(format!("no host node at index {index} under {parent:?}"))
        })
    }

    fn diff_props(&mut self, handle: &H::Node, old: &Props, new: &Props) -> Result<(), RenderError> {
        for (name, value) in old.attrs() {
            if new.get(name).is_none() {
                self.clear_prop(handle, name, value)?;
            }
        }
        for (name, value) in new.attrs() {
            let previous = old.get(name);
            if previous == Some(value) {
                continue;
            }
            self.apply_prop(handle, name, previous, value)?;
        }
        Ok(())
    }

    fn apply_prop(
        &mut self,
        handle: &H::Node,
        name: &str,
        previous: Option<&PropValue>,
        value: &PropValue,
    ) -> Result<(), RenderError> {
        match value {
            PropValue::Style(style) => {
                let empty = Style::new();
                let old_style = match previous {
                    Some(PropValue::Style(old)) => old,
                    Some(other) => {
                        self.clear_prop(handle, name, other)?;
                        &empty
                    }
                    None => &empty,
                };
                self.diff_style(handle, old_style, style)
            }
            PropValue::Handler(handler) => {
                if let Some(previous) = previous {
                    self.clear_prop(handle, name, previous)?;
                }
                self.host.bind_handler(handle, &event_name(name), handler)?;
                self.stats.handlers += 1;
                Ok(())
            }
            plain => {
                if let Some(previous) = previous.filter(|previous| !previous.is_plain()) {
                    self.clear_prop(handle, name, previous)?;
                }
                self.host.set_attribute(handle, name, plain)?;
                self.stats.attributes += 1;
                Ok(())
            }
        }
    }

    fn clear_prop(&mut self, handle: &H::Node, name: &str, value: &PropValue) -> Result<(), RenderError> {
        match value {
            PropValue::Style(style) => self.diff_style(handle, style, &Style::new()),
            PropValue::Handler(handler) => {
                self.host.unbind_handler(handle, &event_name(name), handler)?;
                self.stats.handlers += 1;
                Ok(())
            }
            _ => {
                self.host.remove_attribute(handle, name)?;
                self.stats.attributes += 1;
                Ok(())
            }
        }
    }

    fn diff_style(&mut self, handle: &H::Node, old: &Style, new: &Style) -> Result<(), RenderError> {
        for (property, _) in old.iter() {
            if new.get(property).is_none() {
                self.host.set_style(handle, property, None)?;
                self.stats.attributes += 1;
            }
        }
        for (property, value) in new.iter() {
            if old.get(property) != Some(value) {
                self.host.set_style(handle, property, Some(value))?;
                self.stats.attributes += 1;
            }
        }
        Ok(())
    }
}

/// Whether an old child may be patched in place into `next`.
fn same_shape(old: &Node, next: &Node) -> bool {
    match (old, next) {
        (Node::Text(_), Node::Text(_)) => true,
        (Node::Element(old), Node::Element(next)) => old.tag() == next.tag() && old.key() == next.key(),
        _ => false,
    }
}

/// Maps a handler prop to the host event it binds: `onClick` becomes `click`.
#[must_use]
pub fn event_name(prop: &str) -> String {
    prop.strip_prefix("on")
        .filter(|rest| !rest.is_empty())
        .unwrap_or(prop)
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_props_map_to_event_names() {
        assert_eq!(event_name("onClick"), "click");
        assert_eq!(event_name("onInput"), "input");
        assert_eq!(event_name("submit"), "submit");
        assert_eq!(event_name("on"), "on");
    }

    #[test]
    fn stats_total_counts_every_operation() {
        let stats = PatchStats {
            created: 2,
            inserted: 1,
            moved: 1,
            texts: 1,
            ..PatchStats::default()
        };
        assert_eq!(stats.total(), 5);
        assert!(!stats.is_empty());
        assert!(PatchStats::default().is_empty());
    }
}
