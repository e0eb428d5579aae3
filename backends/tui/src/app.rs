use futures::executor::LocalPool;
use ripple_core::{Component, Event, Root, RootBuilder, RootConfig};

use crate::{
    error::TuiError,
    input::Input,
    renderer::{RenderFrame, Renderer},
    terminal::Terminal,
    tree::{NodeId, TerminalTree},
};

/// A mounted component driven by terminal input.
///
/// Updates requested by handlers are spawned onto a [`LocalPool`] and drained
/// after every input, so each key press produces at most one render pass.
#[derive(Debug)]
pub struct TuiApp {
    root: Root<TerminalTree>,
    pool: LocalPool,
    terminal: Terminal,
    renderer: Renderer,
    focus: Option<NodeId>,
    running: bool,
}

impl TuiApp {
    /// Handles one input and redraws if anything changed.
    ///
    /// Returns `false` once the app has been asked to quit.
    ///
    /// # Errors
    ///
    /// Returns an error when the terminal cannot be written to.
    pub fn step(&mut self, input: Input) -> Result<bool, TuiError> {
        let previous_focus = self.focus;
        tracing::trace!(?input, "terminal input");

        match input {
            Input::Escape => self.running = false,
            Input::Tab => self.move_focus(true),
            Input::BackTab => self.move_focus(false),
            Input::Enter => {
                if let Some(focus) = self.focus {
                    self.dispatch(focus, &Event::new("click"));
                }
            }
            Input::Char(c) => match self.focused_input_value() {
                Some((focus, mut value)) => {
                    value.push(c);
                    self.dispatch(focus, &Event::new("input").with_value(value));
                }
                None if c == 'q' => self.running = false,
                None => {}
            },
            Input::Backspace => {
                if let Some((focus, mut value)) = self.focused_input_value() {
                    value.pop();
                    self.dispatch(focus, &Event::new("input").with_value(value));
                }
            }
        }

        self.pool.run_until_stalled();
        self.settle_focus();
        let dirty = self.root.with_host(TerminalTree::take_dirty);
        if dirty || self.focus != previous_focus {
            self.draw()?;
        }
        Ok(self.running)
    }

    /// Reads inputs until the app quits or the terminal runs out of input,
    /// then unmounts the component.
    ///
    /// # Errors
    ///
    /// Returns an error when terminal I/O fails or unmounting fails.
    pub fn run(mut self) -> Result<(), TuiError> {
        while self.running {
            let Some(input) = self.terminal.read_input()? else {
                break;
            };
            self.step(input)?;
        }
        self.root.unmount()?;
        tracing::debug!(passes = self.root.passes(), "terminal app finished");
        Ok(())
    }

    /// Renders the current tree without drawing it.
    #[must_use]
    pub fn frame(&self) -> RenderFrame {
        self.renderer.render(&self.root.host(), self.focus)
    }

    /// The mounted root.
    #[must_use]
    pub const fn root(&self) -> &Root<TerminalTree> {
        &self.root
    }

    /// Provides immutable access to the terminal handle.
    #[must_use]
    pub const fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    /// The focused node, if any element accepts focus.
    #[must_use]
    pub const fn focus(&self) -> Option<NodeId> {
        self.focus
    }

    /// Returns `false` after the app has been asked to quit.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    fn draw(&mut self) -> Result<(), TuiError> {
        let frame = self.frame();
        self.terminal.render(&frame)
    }

    fn dispatch(&self, target: NodeId, event: &Event) {
        // The host borrow must end before the handler runs.
        let handler = self.root.host().handler(target, &event.name);
        match handler {
            Some(handler) => handler.call(event),
            None => tracing::trace!(node = target.index(), event = %event.name, "no handler bound"),
        }
    }

    fn focused_input_value(&self) -> Option<(NodeId, String)> {
        let focus = self.focus?;
        let host = self.root.host();
        let element = host.element(focus).filter(|element| element.tag() == "input")?;
        Some((focus, element.attribute("value").unwrap_or_default().to_owned()))
    }

    fn move_focus(&mut self, forward: bool) {
        let focusable = self.root.host().focusable();
        if focusable.is_empty() {
            self.focus = None;
            return;
        }
        let len = focusable.len();
        let next = match self.focus.and_then(|focus| focusable.iter().position(|id| *id == focus)) {
            Some(position) if forward => (position + 1) % len,
            Some(position) => (position + len - 1) % len,
            None if forward => 0,
            None => len - 1,
        };
        self.focus = Some(focusable[next]);
    }

    /// Keeps focus on a node that is still focusable, falling back to the first one.
    fn settle_focus(&mut self) {
        let focusable = self.root.host().focusable();
        if self.focus.is_some_and(|focus| focusable.contains(&focus)) {
            return;
        }
        self.focus = focusable.first().copied();
    }
}

/// Builder for [`TuiApp`] instances.
#[derive(Debug, Default)]
pub struct TuiAppBuilder {
    terminal: Option<Terminal>,
    config: RootConfig,
}

impl TuiAppBuilder {
    /// Creates a new builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the terminal handle used by the application.
    #[must_use]
    pub fn terminal(mut self, terminal: Terminal) -> Self {
        self.terminal = Some(terminal);
        self
    }

    /// Replaces the root configuration.
    #[must_use]
    pub const fn config(mut self, config: RootConfig) -> Self {
        self.config = config;
        self
    }

    /// Mounts `component` and draws the first frame.
    ///
    /// Without an explicit terminal the process `stdout` is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be initialised or the first
    /// render pass fails.
    pub fn mount(self, component: Component) -> Result<TuiApp, TuiError> {
        let terminal = match self.terminal {
            Some(terminal) => terminal,
            None => Terminal::stdout()?,
        };

        let pool = LocalPool::new();
        let tree = TerminalTree::new();
        let container = tree.root();
        let root = RootBuilder::new(component)
            .config(self.config)
            .defer(pool.spawner())
            .mount(tree, container)?;
        tracing::debug!(component = component.name(), "mounted terminal app");

        let mut app = TuiApp {
            root,
            pool,
            terminal,
            renderer: Renderer::new(),
            focus: None,
            running: true,
        };
        app.pool.run_until_stalled();
        app.settle_focus();
        app.root.with_host(TerminalTree::take_dirty);
        app.draw()?;
        Ok(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_core::{Cx, Node, Props, RenderError, children, component, element};

    fn counter(cx: &mut Cx<'_>, _props: &Props) -> Result<Node, RenderError> {
        let (count, set_count) = cx.use_state(0_i32)?;
        let increment = cx.use_callback((), move |_| set_count.update(|n| n + 1))?;
        Ok(element(
            "div",
            Props::new(),
            children![
                element("p", Props::new(), children!["Count: ", count]),
                element("button", Props::new().attr("onClick", increment), children!["+1"]),
            ],
        ))
    }

    fn form(cx: &mut Cx<'_>, _props: &Props) -> Result<Node, RenderError> {
        let (name, set_name) = cx.use_state(String::new())?;
        let on_input = cx.use_callback((), move |event: &Event| {
            set_name.set(event.value.as_deref().unwrap_or_default().to_owned());
        })?;
        let greeting = (!name.is_empty()).then(|| format!("Hello, {name}!"));
        Ok(element(
            "form",
            Props::new(),
            children![
                element(
                    "input",
                    Props::new().attr("value", name.as_str()).attr("onInput", on_input),
                    children![],
                ),
                element("p", Props::new(), children![greeting]),
            ],
        ))
    }

    fn app(component: Component, inputs: impl IntoIterator<Item = Input>) -> TuiApp {
        TuiAppBuilder::new()
            .terminal(Terminal::scripted(inputs))
            .mount(component)
            .expect("mount should succeed")
    }

    #[test]
    fn mounting_draws_the_first_frame_with_focus() {
        let app = app(component!(counter), []);
        assert!(app.focus().is_some());
        assert_eq!(app.terminal().snapshot(), Some("Count: 0\n[+1]"));
    }

    #[test]
    fn enter_clicks_the_focused_button() {
        let mut app = app(component!(counter), []);
        assert!(app.step(Input::Enter).expect("step should succeed"));
        assert!(app.step(Input::Enter).expect("step should succeed"));

        assert_eq!(app.terminal().snapshot(), Some("Count: 2\n[+1]"));
        assert_eq!(app.root().passes(), 3);
    }

    #[test]
    fn typing_updates_the_focused_input() {
        let mut app = app(component!(form), []);
        for c in "Ada".chars() {
            app.step(Input::Char(c)).expect("step should succeed");
        }
        app.step(Input::Backspace).expect("step should succeed");
        app.step(Input::Char('a')).expect("step should succeed");

        assert_eq!(app.terminal().snapshot(), Some("[Ada_]\nHello, Ada!"));
        // 'q' is text while an input has focus.
        assert!(app.step(Input::Char('q')).expect("step should succeed"));
    }

    #[test]
    fn run_stops_on_quit_and_unmounts() {
        let app = app(
            component!(counter),
            [Input::Enter, Input::Char('q'), Input::Enter],
        );
        let root = app.root().clone();
        app.run().expect("run should succeed");

        assert!(!root.is_mounted());
        assert_eq!(root.passes(), 2);
    }

    #[test]
    fn tab_cycles_focus_in_both_directions() {
        fn pair(_cx: &mut Cx<'_>, _props: &Props) -> Result<Node, RenderError> {
            let noop = ripple_core::Handler::new(|_| {});
            Ok(element(
                "div",
                Props::new(),
                children![
                    element("button", Props::new().attr("onClick", noop.clone()), children!["a"]),
                    element("button", Props::new().attr("onClick", noop), children!["b"]),
                ],
            ))
        }

        let mut app = app(component!(pair), []);
        let first = app.focus();
        app.step(Input::Tab).expect("step should succeed");
        let second = app.focus();
        assert_ne!(first, second);
        app.step(Input::Tab).expect("step should succeed");
        assert_eq!(app.focus(), first);
        app.step(Input::BackTab).expect("step should succeed");
        assert_eq!(app.focus(), second);
    }
}
