use crossterm::style::{Attribute, Color as TermColor, ContentStyle};
use unicode_width::UnicodeWidthStr;

use crate::tree::{ElementData, NodeId, NodeKind, TerminalTree};

/// Represents a fully resolved frame ready to be drawn to the terminal.
#[derive(Debug, Default, Clone)]
pub struct RenderFrame {
    lines: Vec<RenderLine>,
}

impl RenderFrame {
    /// Pushes a new line with the provided indentation level.
    pub fn push_line(&mut self, indent: usize) -> &mut RenderLine {
        let index = self.lines.len();
        self.lines.push(RenderLine::new(indent));
        &mut self.lines[index]
    }

    /// Returns the set of lines recorded in this frame.
    #[must_use]
    pub fn lines(&self) -> &[RenderLine] {
        &self.lines
    }

    /// The frame without styling, one line per row.
    #[must_use]
    pub fn to_plain_string(&self) -> String {
        self.lines
            .iter()
            .map(RenderLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn last_line(&mut self) -> Option<&mut RenderLine> {
        self.lines.last_mut()
    }
}

/// Representation of a single line in the terminal output.
#[derive(Debug, Default, Clone)]
pub struct RenderLine {
    segments: Vec<RenderSegment>,
}

impl RenderLine {
    fn new(indent: usize) -> Self {
        let mut segments = Vec::new();
        if indent > 0 {
            segments.push(RenderSegment::plain(" ".repeat(indent * 2)));
        }
        Self { segments }
    }

    /// Pushes a new segment onto the line.
    pub fn push(&mut self, segment: RenderSegment) {
        self.segments.push(segment);
    }

    /// Returns the list of segments contained in this line.
    #[must_use]
    pub fn segments(&self) -> &[RenderSegment] {
        &self.segments
    }

    /// Display width in terminal cells.
    #[must_use]
    pub fn width(&self) -> usize {
        self.segments
            .iter()
            .map(|segment| segment.content.width())
            .sum()
    }

    /// Concatenated segment content.
    #[must_use]
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(RenderSegment::content)
            .collect()
    }
}

/// Atomic piece of content rendered on a line.
#[derive(Debug, Clone)]
pub struct RenderSegment {
    content: String,
    style: ContentStyle,
}

impl RenderSegment {
    /// Creates a plain (unstyled) segment.
    pub fn plain(content: impl Into<String>) -> Self {
        Self::styled(content, ContentStyle::new())
    }

    /// Creates a segment with custom styling.
    pub fn styled(content: impl Into<String>, style: ContentStyle) -> Self {
        Self {
            content: content.into(),
            style,
        }
    }

    /// Borrows the raw text stored in this segment.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The style applied when printing.
    #[must_use]
    pub const fn style(&self) -> &ContentStyle {
        &self.style
    }
}

/// Tags that start on a fresh line.
const BLOCK_TAGS: &[&str] = &[
    "div", "section", "main", "header", "footer", "ul", "ol", "li", "p", "h1", "h2", "h3", "h4",
    "h5", "h6", "form", "article", "nav",
];

/// Walks a [`TerminalTree`] and produces terminal friendly frames.
#[derive(Debug, Default)]
pub struct Renderer;

impl Renderer {
    /// Creates a new renderer instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Renders the attached part of `tree` into a [`RenderFrame`], drawing
    /// `focus` reversed.
    #[must_use]
    pub fn render(&self, tree: &TerminalTree, focus: Option<NodeId>) -> RenderFrame {
        let mut walk = Walk {
            tree,
            focus,
            frame: RenderFrame::default(),
            open: false,
        };
        for child in tree.children(tree.root()) {
            walk.node(*child, 0, ContentStyle::new());
        }
        walk.frame
    }
}

struct Walk<'a> {
    tree: &'a TerminalTree,
    focus: Option<NodeId>,
    frame: RenderFrame,
    open: bool,
}

impl Walk<'_> {
    fn node(&mut self, id: NodeId, indent: usize, inherited: ContentStyle) {
        let tree = self.tree;
        match tree.kind(id) {
            Some(NodeKind::Text(text)) => {
                if !text.is_empty() {
                    self.inline(indent, RenderSegment::styled(text.clone(), inherited));
                }
            }
            Some(NodeKind::Element(element)) => self.element(id, element, indent, inherited),
            None => {}
        }
    }

    fn element(&mut self, id: NodeId, element: &ElementData, indent: usize, inherited: ContentStyle) {
        if is_hidden(element) {
            return;
        }
        let tree = self.tree;
        let mut style = element_style(element, inherited);
        if self.focus == Some(id) {
            style.attributes.set(Attribute::Reverse);
        }

        match element.tag() {
            "button" => {
                let label = format!("[{}]", tree.text_content(id));
                self.inline(indent, RenderSegment::styled(label, style));
            }
            "input" => {
                let value = element
                    .attribute("value")
                    .filter(|value| !value.is_empty())
                    .or_else(|| element.attribute("placeholder"))
                    .unwrap_or_default();
                let cursor = if self.focus == Some(id) { "_" } else { "" };
                let field = format!("[{value}{cursor}]");
                self.inline(indent, RenderSegment::styled(field, style));
            }
            "br" => self.open = false,
            tag if BLOCK_TAGS.contains(&tag) => {
                self.open = false;
                let nested = if matches!(tag, "ul" | "ol") { indent + 1 } else { indent };
                if tag == "li" {
                    self.frame.push_line(indent).push(RenderSegment::plain("• "));
                    self.open = true;
                }
                for child in tree.children(id) {
                    self.node(*child, nested, style);
                }
                self.open = false;
            }
            _ => {
                for child in tree.children(id) {
                    self.node(*child, indent, style);
                }
            }
        }
    }

    fn inline(&mut self, indent: usize, segment: RenderSegment) {
        if !self.open {
            self.frame.push_line(indent);
            self.open = true;
        }
        if let Some(line) = self.frame.last_line() {
            line.push(segment);
        }
    }
}

fn is_hidden(element: &ElementData) -> bool {
    element
        .attribute("hidden")
        .is_some_and(|value| value != "false")
}

fn element_style(element: &ElementData, inherited: ContentStyle) -> ContentStyle {
    let mut style = inherited;
    match element.tag() {
        "b" | "strong" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            style.attributes.set(Attribute::Bold);
        }
        "em" | "i" => style.attributes.set(Attribute::Italic),
        "u" => style.attributes.set(Attribute::Underlined),
        _ => {}
    }

    if let Some(color) = element.style("color").and_then(parse_color) {
        style.foreground_color = Some(color);
    }
    if let Some(color) = element.style("backgroundColor").and_then(parse_color) {
        style.background_color = Some(color);
    }
    if element.style("fontWeight").is_some_and(is_bold_weight) {
        style.attributes.set(Attribute::Bold);
    }
    if element.style("fontStyle") == Some("italic") {
        style.attributes.set(Attribute::Italic);
    }
    if let Some(decoration) = element.style("textDecoration") {
        if decoration.contains("underline") {
            style.attributes.set(Attribute::Underlined);
        }
        if decoration.contains("line-through") {
            style.attributes.set(Attribute::CrossedOut);
        }
    }
    style
}

fn is_bold_weight(weight: &str) -> bool {
    match weight.trim() {
        "bold" | "bolder" => true,
        numeric => numeric.parse::<u16>().is_ok_and(|value| value >= 600),
    }
}

/// Parses a named color or `#rrggbb`.
fn parse_color(value: &str) -> Option<TermColor> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: core::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        return Some(TermColor::Rgb {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        });
    }
    let color = match value.to_ascii_lowercase().as_str() {
        "black" => TermColor::Black,
        "red" => TermColor::Red,
        "green" => TermColor::Green,
        "yellow" => TermColor::Yellow,
        "blue" => TermColor::Blue,
        "magenta" | "purple" => TermColor::Magenta,
        "cyan" => TermColor::Cyan,
        "white" => TermColor::White,
        "gray" | "grey" => TermColor::Grey,
        "darkgray" | "darkgrey" => TermColor::DarkGrey,
        _ => return None,
    };
    Some(color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_core::{Handler, Host, PropValue};

    fn element(tree: &mut TerminalTree, parent: NodeId, tag: &str) -> NodeId {
        let node = tree.create_node(tag).expect("create should succeed");
        let index = tree.children(parent).len();
        tree.insert_child(&parent, &node, index)
            .expect("insert should succeed");
        node
    }

    fn text(tree: &mut TerminalTree, parent: NodeId, content: &str) {
        let node = tree.create_text_node(content).expect("create should succeed");
        let index = tree.children(parent).len();
        tree.insert_child(&parent, &node, index)
            .expect("insert should succeed");
    }

    #[test]
    fn blocks_break_lines_and_inline_flows() {
        let mut tree = TerminalTree::new();
        let root = tree.root();
        let main = element(&mut tree, root, "main");
        let h1 = element(&mut tree, main, "h1");
        text(&mut tree, h1, "Title");
        let p = element(&mut tree, main, "p");
        text(&mut tree, p, "Hello, ");
        let strong = element(&mut tree, p, "strong");
        text(&mut tree, strong, "world");
        let ul = element(&mut tree, main, "ul");
        for label in ["one", "two"] {
            let li = element(&mut tree, ul, "li");
            text(&mut tree, li, label);
        }

        let frame = Renderer::new().render(&tree, None);
        assert_eq!(frame.to_plain_string(), "Title\nHello, world\n  • one\n  • two");

        let title = &frame.lines()[0].segments()[0];
        assert!(title.style().attributes.has(Attribute::Bold));
        assert_eq!(frame.lines()[2].width(), 7);
    }

    #[test]
    fn controls_render_as_brackets_and_focus_reverses() {
        let mut tree = TerminalTree::new();
        let root = tree.root();
        let button = element(&mut tree, root, "button");
        text(&mut tree, button, "Save");
        tree.bind_handler(&button, "click", &Handler::new(|_| {}))
            .expect("bind should succeed");
        let input = element(&mut tree, root, "input");
        tree.set_attribute(&input, "value", &PropValue::from("abc"))
            .expect("set should succeed");

        let frame = Renderer::new().render(&tree, Some(input));
        assert_eq!(frame.to_plain_string(), "[Save][abc_]");
        let segments = frame.lines()[0].segments();
        assert!(!segments[0].style().attributes.has(Attribute::Reverse));
        assert!(segments[1].style().attributes.has(Attribute::Reverse));
    }

    #[test]
    fn hidden_elements_are_skipped() {
        let mut tree = TerminalTree::new();
        let root = tree.root();
        let shown = element(&mut tree, root, "p");
        text(&mut tree, shown, "visible");
        let hidden = element(&mut tree, root, "p");
        tree.set_attribute(&hidden, "hidden", &PropValue::from(true))
            .expect("set should succeed");
        text(&mut tree, hidden, "secret");

        assert_eq!(Renderer::new().render(&tree, None).to_plain_string(), "visible");
    }

    #[test]
    fn style_properties_map_to_terminal_styles() {
        let mut tree = TerminalTree::new();
        let root = tree.root();
        let span = element(&mut tree, root, "span");
        tree.set_style(&span, "color", Some("#ff8000"))
            .expect("style should succeed");
        tree.set_style(&span, "fontWeight", Some("700"))
            .expect("style should succeed");
        tree.set_style(&span, "textDecoration", Some("underline"))
            .expect("style should succeed");
        text(&mut tree, span, "warm");

        let frame = Renderer::new().render(&tree, None);
        let style = frame.lines()[0].segments()[0].style();
        assert_eq!(
            style.foreground_color,
            Some(TermColor::Rgb { r: 255, g: 128, b: 0 })
        );
        assert!(style.attributes.has(Attribute::Bold));
        assert!(style.attributes.has(Attribute::Underlined));
    }

    #[test]
    fn colors_parse_names_and_hex() {
        assert_eq!(parse_color("Red"), Some(TermColor::Red));
        assert_eq!(parse_color("#000000"), Some(TermColor::Rgb { r: 0, g: 0, b: 0 }));
        assert_eq!(parse_color("#12"), None);
        assert_eq!(parse_color("chartreuse"), None);
    }
}
