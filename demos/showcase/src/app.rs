//! Components of the showcase.

use ripple::prelude::*;

use crate::hooks::use_toggle;

/// Colour scheme shared through context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    const fn label(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    const fn accent(self) -> &'static str {
        match self {
            Self::Light => "blue",
            Self::Dark => "yellow",
        }
    }

    const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

thread_local! {
    static THEME: Context<Theme> = create_context(Theme::Light);
}

fn theme() -> Context<Theme> {
    THEME.with(Clone::clone)
}

const INITIAL_TODOS: [&str; 3] = ["Write docs", "Review patch", "Ship release"];

/// Root of the showcase.
pub fn showcase(cx: &mut Cx<'_>, _props: &Props) -> Result<Node, RenderError> {
    let (current, set_theme) = cx.use_state(Theme::Light)?;
    let toggle_theme = cx.use_callback((), move |_| set_theme.update(|theme| theme.toggled()))?;

    cx.provide(&theme(), current, |cx| {
        let header = cx.component(component!(header), Props::new())?;
        let counter = cx.component(component!(counter), Props::new())?;
        let message = cx.component(component!(message), Props::new())?;
        let todos = cx.component(component!(todo_list), Props::new())?;
        let form = cx.component(component!(name_form), Props::new())?;
        let theme_button = cx.build_element(
            component!(button),
            Props::new().attr("onClick", toggle_theme),
            children!["Toggle theme"],
        )?;
        Ok(element(
            "main",
            Props::new().attr("id", "content"),
            children![
                header,
                counter,
                message,
                todos,
                form,
                element("footer", Props::new(), children![theme_button]),
            ],
        ))
    })
}

/// A button forwarding its click handler, style and children.
fn button(_cx: &mut Cx<'_>, props: &Props) -> Result<Node, RenderError> {
    let mut attrs = Props::new();
    if let Some(on_click) = props.handler("onClick") {
        attrs = attrs.attr("onClick", on_click);
    }
    if let Some(style) = props.get("style") {
        attrs = attrs.attr("style", style.clone());
    }
    Ok(element("button", attrs, children![props.children().to_vec()]))
}

fn header(cx: &mut Cx<'_>, _props: &Props) -> Result<Node, RenderError> {
    let theme = cx.use_context(&theme())?;
    Ok(element(
        "header",
        Props::new().attr("id", "main-header"),
        children![
            element(
                "h1",
                Props::new().style(Style::new().set("color", theme.accent())),
                children!["Ripple showcase"],
            ),
            element("p", Props::new(), children!["Theme: ", theme.label()]),
        ],
    ))
}

fn counter(cx: &mut Cx<'_>, _props: &Props) -> Result<Node, RenderError> {
    let (count, set_count) = cx.use_state(0_i64)?;
    let reset_count = set_count.clone();
    let increment = cx.use_callback((), move |_| set_count.update(|count| count + 1))?;
    let reset = cx.use_callback((), move |_| reset_count.set(0))?;

    let plus = cx.build_element(
        component!(button),
        Props::new().attr("onClick", increment),
        children!["+1"],
    )?;
    let zero = cx.build_element(
        component!(button),
        Props::new().attr("onClick", reset),
        children!["Reset"],
    )?;
    Ok(element(
        "section",
        Props::new(),
        children![
            element("h2", Props::new(), children!["Count: ", count]),
            element("div", Props::new(), children![plus, " ", zero]),
        ],
    ))
}

fn message(cx: &mut Cx<'_>, _props: &Props) -> Result<Node, RenderError> {
    let (visible, toggle) = use_toggle(cx, false)?;
    let label = if visible { "Hide message" } else { "Show message" };
    let toggle_button = cx.build_element(
        component!(button),
        Props::new().attr("onClick", toggle),
        children![label],
    )?;
    Ok(element(
        "section",
        Props::new(),
        children![
            toggle_button,
            visible.then(|| element("p", Props::new(), children!["Now you see me."])),
        ],
    ))
}

fn todo_list(cx: &mut Cx<'_>, _props: &Props) -> Result<Node, RenderError> {
    let (todos, set_todos) = cx.use_state(INITIAL_TODOS.map(String::from).to_vec())?;
    let add_todos = set_todos.clone();
    let rotate = cx.use_callback((), move |_| {
        set_todos.update(|todos| {
            let mut todos = todos.clone();
            if !todos.is_empty() {
                todos.rotate_left(1);
            }
            todos
        });
    })?;
    let add = cx.use_callback((), move |_| {
        add_todos.update(|todos| {
            let mut todos = todos.clone();
            todos.push(format!("Task {}", todos.len() + 1));
            todos
        });
    })?;

    let mut items = Vec::with_capacity(todos.len());
    for todo in &todos {
        items.push(cx.component(
            component!(todo_item),
            Props::new().key(todo.as_str()).attr("label", todo.as_str()),
        )?);
    }
    let rotate_button = cx.build_element(
        component!(button),
        Props::new().attr("onClick", rotate),
        children!["Rotate"],
    )?;
    let add_button = cx.build_element(
        component!(button),
        Props::new().attr("onClick", add),
        children!["Add"],
    )?;
    Ok(element(
        "section",
        Props::new(),
        children![
            element("h2", Props::new(), children!["Todos"]),
            element("ul", Props::new(), children![items]),
            element("div", Props::new(), children![rotate_button, " ", add_button]),
        ],
    ))
}

fn todo_item(cx: &mut Cx<'_>, props: &Props) -> Result<Node, RenderError> {
    let label = props.get_str("label").unwrap_or_default().to_owned();
    let logged = label.clone();
    cx.use_effect(label.clone(), move || {
        tracing::debug!(todo = %logged, "todo mounted");
        Some(Cleanup::new(move || tracing::debug!(todo = %logged, "todo unmounted")))
    })?;
    Ok(element("li", Props::new(), children![label]))
}

fn name_form(cx: &mut Cx<'_>, _props: &Props) -> Result<Node, RenderError> {
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
                Props::new()
                    .attr("type", "text")
                    .attr("value", name.as_str())
                    .attr("placeholder", "Your name")
                    .attr("onInput", on_input),
                children![],
            ),
            element("p", Props::new(), children![greeting]),
        ],
    ))
}

#[cfg(test)]
mod tests {
    use ripple::tui::{Input, Terminal, TuiApp, TuiAppBuilder};

    use super::*;

    fn app() -> TuiApp {
        TuiAppBuilder::new()
            .terminal(Terminal::buffered())
            .mount(component!(showcase))
            .expect("mount should succeed")
    }

    fn press(app: &mut TuiApp, inputs: &[Input]) -> String {
        for input in inputs {
            assert!(app.step(*input).expect("step should succeed"));
        }
        app.frame().to_plain_string()
    }

    #[test]
    fn first_frame_shows_every_section() {
        let app = app();
        let screen = app.frame().to_plain_string();
        assert!(screen.starts_with("Ripple showcase\nTheme: light\nCount: 0\n[+1] [Reset]"));
        assert!(screen.contains("[Show message]"));
        assert!(screen.contains("• Write docs\n  • Review patch\n  • Ship release"));
        assert!(screen.contains("[Your name_]") || screen.contains("[Your name]"));
        assert!(screen.ends_with("[Toggle theme]"));
    }

    #[test]
    fn counter_increments_and_resets() {
        let mut app = app();
        let screen = press(&mut app, &[Input::Enter, Input::Enter]);
        assert!(screen.contains("Count: 2"));

        let screen = press(&mut app, &[Input::Tab, Input::Enter]);
        assert!(screen.contains("Count: 0"));
    }

    #[test]
    fn custom_toggle_hook_shows_the_message() {
        let mut app = app();
        let screen = press(&mut app, &[Input::Tab, Input::Tab, Input::Enter]);
        assert!(screen.contains("[Hide message]\nNow you see me."));

        let screen = press(&mut app, &[Input::Enter]);
        assert!(!screen.contains("Now you see me."));
    }

    #[test]
    fn rotating_todos_reorders_the_list() {
        let mut app = app();
        let screen = press(&mut app, &[Input::Tab, Input::Tab, Input::Tab, Input::Enter]);
        assert!(screen.contains("• Review patch\n  • Ship release\n  • Write docs"));

        let screen = press(&mut app, &[Input::Tab, Input::Enter]);
        assert!(screen.contains("• Write docs\n  • Task 4"));
    }

    #[test]
    fn typing_greets_by_name() {
        let mut app = app();
        let mut inputs = vec![Input::Tab; 5];
        inputs.extend("Bo".chars().map(Input::Char));
        let screen = press(&mut app, &inputs);
        assert!(screen.contains("[Bo_]\nHello, Bo!"));
    }

    #[test]
    fn theme_flows_through_context() {
        let mut app = app();
        let screen = press(&mut app, &[Input::BackTab, Input::Enter]);
        assert!(screen.contains("Theme: dark"));
        assert_eq!(app.root().passes(), 2);
    }
}
