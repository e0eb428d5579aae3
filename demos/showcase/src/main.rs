//! Terminal showcase for Ripple.
//!
//! Tab moves focus, Enter presses buttons, typing edits the focused input and
//! `q` or Esc quits.

mod app;
mod hooks;

use ripple::{component, tui::TuiAppBuilder};

fn main() -> Result<(), ripple::tui::TuiError> {
    ripple::log::init();
    TuiAppBuilder::new()
        .mount(component!(app::showcase))?
        .run()
}
