//! The contract between the reconciler and a concrete host tree.
//!
//! The engine never touches real nodes. Everything it needs from a browser
//! document, a widget toolkit or a terminal buffer goes through [`Host`]:
//!
//! ```text
//! ┌──────────────┐   create / set / bind / insert / remove   ┌──────────────┐
//! │  Reconciler  │ ────────────────────────────────────────▶ │     Host     │
//! └──────────────┘ ◀──────────── child_at / is_text ──────── └──────────────┘
//! ```
//!
//! Handles are cheap clones owned by the host. The reconciler keeps them only
//! for the duration of one patch.

use core::fmt::Debug;

use crate::{
    element::{Handler, PropValue},
    error::HostError,
};

/// Operations a host tree backend provides to the reconciler.
pub trait Host {
    /// Opaque handle to a node owned by the host.
    type Node: Clone + PartialEq + Debug;

    /// Creates a detached element node for `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error when the host cannot allocate the node.
    fn create_node(&mut self, tag: &str) -> Result<Self::Node, HostError>;

    /// Creates a detached text node.
    ///
    /// # Errors
    ///
    /// Returns an error when the host cannot allocate the node.
    fn create_text_node(&mut self, content: &str) -> Result<Self::Node, HostError>;

    /// Sets a plain attribute. `value` is never a style map or a handler.
    ///
    /// # Errors
    ///
    /// Returns an error when `node` is not a live element.
    fn set_attribute(
        &mut self,
        node: &Self::Node,
        name: &str,
        value: &PropValue,
    ) -> Result<(), HostError>;

    /// Removes or resets an attribute.
    ///
    /// # Errors
    ///
    /// Returns an error when `node` is not a live element.
    fn remove_attribute(&mut self, node: &Self::Node, name: &str) -> Result<(), HostError>;

    /// Sets one style property, or resets it when `value` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error when `node` is not a live element.
    fn set_style(
        &mut self,
        node: &Self::Node,
        property: &str,
        value: Option<&str>,
    ) -> Result<(), HostError>;

    /// Attaches `handler` for `event` (`"click"`, `"input"`, ...).
    ///
    /// # Errors
    ///
    /// Returns an error when `node` is not a live element.
    fn bind_handler(
        &mut self,
        node: &Self::Node,
        event: &str,
        handler: &Handler,
    ) -> Result<(), HostError>;

    /// Detaches a handler previously passed to [`Host::bind_handler`].
    ///
    /// # Errors
    ///
    /// Returns an error when `node` is not a live element.
    fn unbind_handler(
        &mut self,
        node: &Self::Node,
        event: &str,
        handler: &Handler,
    ) -> Result<(), HostError>;

    /// Inserts `child` under `parent` so that it ends up at `index`.
    ///
    /// If `child` is already attached to `parent` it is moved; the index is
    /// interpreted after the child has been detached from its old position.
    ///
    /// # Errors
    ///
    /// Returns an error when either handle is not live.
    fn insert_child(
        &mut self,
        parent: &Self::Node,
        child: &Self::Node,
        index: usize,
    ) -> Result<(), HostError>;

    /// Detaches `child` (and its subtree) from `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error when `child` is not a child of `parent`.
    fn remove_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), HostError>;

    /// Replaces the content of a text node.
    ///
    /// # Errors
    ///
    /// Returns an error when `node` is not a live text node.
    fn set_text_content(&mut self, node: &Self::Node, content: &str) -> Result<(), HostError>;

    /// Returns the child of `parent` at `index`, if any.
    fn child_at(&self, parent: &Self::Node, index: usize) -> Option<Self::Node>;

    /// Returns `true` if `node` is a text node.
    fn is_text_node(&self, node: &Self::Node) -> bool;
}
