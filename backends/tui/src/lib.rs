//! Terminal backend for Ripple.
//!
//! [`TerminalTree`] implements the engine's host contract as an arena of
//! nodes, [`Renderer`] turns the attached tree into styled lines, and
//! [`TuiApp`] ties both to a terminal, routing key presses to bound handlers.

pub use crate::app::{TuiApp, TuiAppBuilder};
pub use crate::input::Input;
pub use crate::renderer::{RenderFrame, RenderLine, RenderSegment, Renderer};
pub use crate::terminal::Terminal;
pub use crate::tree::{ElementData, NodeId, NodeKind, TerminalTree};

mod app;
mod error;
mod input;
mod renderer;
mod terminal;
mod tree;

pub use error::TuiError;
