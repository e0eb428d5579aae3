#![doc = include_str!("../README.md")]

#[doc(inline)]
pub use ripple_core::*;

/// Terminal backend.
#[cfg(feature = "tui")]
pub use ripple_tui as tui;

pub mod log;

/// Everything needed to write components.
pub mod prelude {
    pub use ripple_core::{
        Child, Cleanup, Component, Context, Cx, Event, Handler, Node, Props, RenderError, Root,
        RootConfig, Setter, Style, children, component, create_context, element, mount,
    };
}
