//! The immutable description tree.
//!
//! A render pass produces a tree of [`Node`]s: host elements and text leaves.
//! Component invocations never survive construction; [`Cx::build_element`]
//! expands them on the spot, so the reconciler only ever walks host elements
//! and primitives.
//!
//! [`Cx::build_element`]: crate::Cx::build_element

use alloc::{collections::BTreeMap, rc::Rc, string::String, vec::Vec};
use core::{any::type_name, fmt};

use crate::{error::RenderError, hooks::Cx};

/// Shared immutable string used for tags, keys, attribute names and text.
pub type Str = Rc<str>;

/// Signature of a component render function.
pub type RenderFn = fn(&mut Cx<'_>, &Props) -> Result<Node, RenderError>;

/// A named component function.
///
/// Identity is the address of the render function, so two `Component` values
/// built from the same function are the same component.
#[derive(Clone, Copy)]
pub struct Component {
    name: &'static str,
    render: RenderFn,
}

impl Component {
    /// Wraps a render function under a display name.
    #[must_use]
    pub const fn new(name: &'static str, render: RenderFn) -> Self {
        Self { name, render }
    }

    /// Returns the display name used in logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the identity of the render function.
    #[must_use]
    pub fn id(&self) -> usize {
        self.render as usize
    }

    pub(crate) fn render(&self, cx: &mut Cx<'_>, props: &Props) -> Result<Node, RenderError> {
        (self.render)(cx, props)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Component {}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Component").field(&self.name).finish()
    }
}

/// What an element is built from: a host tag or a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    /// A primitive node understood by the host (`"div"`, `"button"`, ...).
    Host(Str),
    /// A component expanded during construction.
    Component(Component),
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Self::Host(Str::from(value))
    }
}

impl From<Str> for Tag {
    fn from(value: Str) -> Self {
        Self::Host(value)
    }
}

impl From<Component> for Tag {
    fn from(value: Component) -> Self {
        Self::Component(value)
    }
}

/// Identity token used to match children across renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Key {
    /// Key supplied by the caller.
    Explicit(Str),
    /// Positional fallback for children without an explicit key.
    Index(usize),
}

impl Key {
    /// Returns `true` for a caller-supplied key.
    #[must_use]
    pub const fn is_explicit(&self) -> bool {
        matches!(self, Self::Explicit(_))
    }
}

/// Payload delivered to event handlers by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event name, such as `"click"` or `"input"`.
    pub name: Str,
    /// Optional value carried by the event (the text of an input, for example).
    pub value: Option<Str>,
}

impl Event {
    /// Creates an event without a value.
    #[must_use]
    pub fn new(name: impl Into<Str>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Attaches a value to the event.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<Str>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Shared event callback. Two handlers are equal only if they are the same allocation.
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(&Event)>);

impl Handler {
    /// Wraps a closure as a handler.
    pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    /// Invokes the handler.
    pub fn call(&self, event: &Event) {
        (self.0)(event);
    }

    /// Returns `true` if both handlers share the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(type_name::<Self>())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Handler {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("<handler>")
    }
}

/// Structured `style` value, diffed per property.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Style(BTreeMap<Str, Str>);

impl Style {
    /// Creates an empty style.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds or replaces a property.
    #[must_use]
    pub fn set(mut self, property: impl Into<Str>, value: impl Into<Str>) -> Self {
        self.0.insert(property.into(), value.into());
        self
    }

    /// Looks up a property.
    #[must_use]
    pub fn get(&self, property: &str) -> Option<&Str> {
        self.0.get(property)
    }

    /// Iterates over the properties in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&Str, &Str)> {
        self.0.iter()
    }

    /// Returns `true` if no property is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Value of a single prop.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
pub enum PropValue {
    /// Text attribute.
    Str(Str),
    /// Integer attribute.
    Int(i64),
    /// Floating point attribute.
    Float(f64),
    /// Boolean attribute.
    Bool(bool),
    /// Structured style, diffed per property.
    Style(Style),
    /// Event handler, rebound when the reference changes.
    Handler(Handler),
}

impl PropValue {
    /// Renders a plain attribute value as text. Styles and handlers yield `None`.
    #[must_use]
    pub fn to_attribute(&self) -> Option<String> {
        match self {
            Self::Str(value) => Some(String::from(&**value)),
            Self::Int(value) => Some(value.to_string()),
            Self::Float(value) => Some(value.to_string()),
            Self::Bool(value) => Some(value.to_string()),
            Self::Style(_) | Self::Handler(_) => None,
        }
    }

    /// Borrows the text of a [`PropValue::Str`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub(crate) const fn is_plain(&self) -> bool {
        !matches!(self, Self::Style(_) | Self::Handler(_))
    }
}

macro_rules! impl_prop_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for PropValue {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

impl_prop_from!(
    &str => |v| Self::Str(Str::from(v)),
    String => |v| Self::Str(Str::from(v)),
    Str => |v| Self::Str(v),
    i32 => |v| Self::Int(i64::from(v)),
    i64 => |v| Self::Int(v),
    u32 => |v| Self::Int(i64::from(v)),
    f64 => |v| Self::Float(v),
    bool => |v| Self::Bool(v),
    Style => |v| Self::Style(v),
    Handler => |v| Self::Handler(v),
);

/// Ordered props of an element, plus its normalised children.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Props {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    key: Option<Str>,
    attrs: BTreeMap<Str, PropValue>,
    children: Vec<Node>,
}

impl Props {
    /// Creates empty props.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            key: None,
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Sets the explicit identity key.
    #[must_use]
    pub fn key(mut self, key: impl Into<Str>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets an attribute.
    #[must_use]
    pub fn attr(mut self, name: impl Into<Str>, value: impl Into<PropValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Sets an event handler prop such as `"onClick"`.
    #[must_use]
    pub fn on(self, name: impl Into<Str>, handler: impl Fn(&Event) + 'static) -> Self {
        self.attr(name, Handler::new(handler))
    }

    /// Sets the `style` prop.
    #[must_use]
    pub fn style(self, style: Style) -> Self {
        self.attr("style", style)
    }

    /// Returns the explicit key, if any.
    #[must_use]
    pub const fn explicit_key(&self) -> Option<&Str> {
        self.key.as_ref()
    }

    /// Looks up a prop.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.attrs.get(name)
    }

    /// Looks up a text prop.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropValue::as_str)
    }

    /// Looks up a handler prop.
    #[must_use]
    pub fn handler(&self, name: &str) -> Option<Handler> {
        match self.get(name) {
            Some(PropValue::Handler(handler)) => Some(handler.clone()),
            _ => None,
        }
    }

    /// Iterates over the attributes in name order.
    pub fn attrs(&self) -> impl Iterator<Item = (&Str, &PropValue)> {
        self.attrs.iter()
    }

    /// Returns the normalised children.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Normalises `children` and stores them as this element's children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<Child>) -> Self {
        self.children = normalize_children(children);
        self
    }

    pub(crate) fn set_children(&mut self, children: Vec<Child>) {
        self.children = normalize_children(children);
    }
}

/// An immutable host element.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Element {
    tag: Str,
    key: Key,
    props: Props,
}

impl Element {
    fn new(tag: Str, mut props: Props) -> Self {
        let key = props.key.take().map_or(Key::Index(0), Key::Explicit);
        Self { tag, key, props }
    }

    /// Returns the host tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the identity key.
    #[must_use]
    pub const fn key(&self) -> &Key {
        &self.key
    }

    /// Returns the props.
    #[must_use]
    pub const fn props(&self) -> &Props {
        &self.props
    }

    /// Returns the children.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        self.props.children()
    }
}

/// A node of the description tree.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
pub enum Node {
    /// A host element.
    Element(Rc<Element>),
    /// Raw text content, compared by value.
    Text(Str),
}

impl Node {
    /// Creates a text node.
    #[must_use]
    pub fn text(content: impl Into<Str>) -> Self {
        Self::Text(content.into())
    }

    /// Borrows the element, if this node is one.
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) => None,
        }
    }

    /// Borrows the text, if this node is a text leaf.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Element(_) => None,
        }
    }

    /// Identity of this node when it sits at `position` among its siblings.
    #[must_use]
    pub fn identity(&self, position: usize) -> Key {
        match self {
            Self::Element(element) if element.key.is_explicit() => element.key.clone(),
            Self::Element(_) | Self::Text(_) => Key::Index(position),
        }
    }

    /// Applies an explicit key to an element that has none.
    pub(crate) fn adopt_key(&mut self, key: &Str) {
        if let Self::Element(element) = self {
            if !element.key.is_explicit() {
                Rc::make_mut(element).key = Key::Explicit(key.clone());
            }
        }
    }

    fn set_position(&mut self, position: usize) {
        if let Self::Element(element) = self {
            if !element.key.is_explicit() && element.key != Key::Index(position) {
                Rc::make_mut(element).key = Key::Index(position);
            }
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }
}

macro_rules! impl_node_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Node {
                fn from(value: $ty) -> Self {
                    Self::Text(Str::from(value.to_string()))
                }
            }
        )*
    };
}

impl_node_from_display!(i32, i64, u32, u64, usize, f64);

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::Text(Str::from(value))
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Self::Text(Str::from(value))
    }
}

impl From<Str> for Node {
    fn from(value: Str) -> Self {
        Self::Text(value)
    }
}

impl From<Element> for Node {
    fn from(value: Element) -> Self {
        Self::Element(Rc::new(value))
    }
}

/// A child as written by the caller, before normalisation.
///
/// `Many` holds a single level of nesting; it cannot contain another `Many`.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    /// A single node.
    Node(Node),
    /// A sequence spliced into the parent's children.
    Many(Vec<Option<Node>>),
    /// Renders as nothing (`null`, `false`, `true`).
    Empty,
}

impl From<Node> for Child {
    fn from(value: Node) -> Self {
        Self::Node(value)
    }
}

impl From<bool> for Child {
    fn from(_: bool) -> Self {
        Self::Empty
    }
}

impl<T: Into<Node>> From<Option<T>> for Child {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, |node| Self::Node(node.into()))
    }
}

impl<T: Into<Node>> From<Vec<T>> for Child {
    fn from(value: Vec<T>) -> Self {
        Self::Many(value.into_iter().map(|node| Some(node.into())).collect())
    }
}

macro_rules! impl_child_from_node {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Child {
                fn from(value: $ty) -> Self {
                    Self::Node(Node::from(value))
                }
            }
        )*
    };
}

impl_child_from_node!(&str, String, Str, Element, i32, i64, u32, u64, usize, f64);

impl Child {
    /// Collects an iterator of nodes into a spliced sequence.
    pub fn many<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Node>,
    {
        Self::Many(items.into_iter().map(|node| Some(node.into())).collect())
    }
}

/// Flattens one level, drops empty children and assigns positional keys.
#[must_use]
pub fn normalize_children(children: Vec<Child>) -> Vec<Node> {
    let mut nodes = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Child::Node(node) => nodes.push(node),
            Child::Many(items) => nodes.extend(items.into_iter().flatten()),
            Child::Empty => {}
        }
    }
    nodes.retain(|node| !node.is_blank());
    for (position, node) in nodes.iter_mut().enumerate() {
        node.set_position(position);
    }
    nodes
}

/// Builds a host element. Components go through [`Cx::build_element`].
///
/// [`Cx::build_element`]: crate::Cx::build_element
#[must_use]
pub fn element(tag: impl Into<Str>, props: Props, children: Vec<Child>) -> Node {
    Node::from(Element::new(tag.into(), props.with_children(children)))
}

pub(crate) fn host_element(tag: Str, props: Props) -> Node {
    Node::from(Element::new(tag, props))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn normalization_strips_empty_children() {
        let children = vec![
            Child::from("a"),
            Child::from(false),
            Child::from(""),
            Child::from(None::<Node>),
            Child::from(true),
            Child::from(7_i32),
        ];
        let nodes = normalize_children(children);
        assert_eq!(nodes, vec![Node::text("a"), Node::text("7")]);
    }

    #[test]
    fn normalization_flattens_one_level() {
        let items = Child::many(["x", "y"]);
        let nodes = normalize_children(vec![Child::from("head"), items, Child::from("tail")]);
        let texts: Vec<_> = nodes.iter().filter_map(Node::as_text).collect();
        assert_eq!(texts, ["head", "x", "y", "tail"]);
    }

    #[test]
    fn fallback_keys_follow_position() {
        let nodes = normalize_children(vec![
            Child::from(element("li", Props::new(), vec![])),
            Child::from(element("li", Props::new().key("k"), vec![])),
            Child::from(element("li", Props::new(), vec![])),
        ]);
        let keys: Vec<_> = nodes
            .iter()
            .filter_map(Node::as_element)
            .map(|element| element.key().clone())
            .collect();
        assert_eq!(
            keys,
            vec![Key::Index(0), Key::Explicit(Str::from("k")), Key::Index(2)]
        );
    }

    #[test]
    fn handlers_compare_by_reference() {
        let a = Handler::new(|_| {});
        let b = Handler::new(|_| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn key_is_not_an_attribute() {
        let node = element("div", Props::new().key("x").attr("id", "main"), vec![]);
        let element = node.as_element().expect("node should be an element");
        assert_eq!(element.key(), &Key::Explicit(Str::from("x")));
        assert!(element.props().get("key").is_none());
        assert_eq!(element.props().get_str("id"), Some("main"));
    }
}
