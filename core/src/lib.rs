//! # Ripple core
//!
//! The engine behind Ripple: an immutable element model, a hook runtime that
//! gives plain render functions persistent per-instance state, a keyed
//! reconciler that patches a host tree with the minimal set of operations,
//! a scheduler that coalesces state changes into a single pass, and a context
//! store for data that should not be threaded through props.
//!
//! Concrete host trees live outside this crate. Anything implementing
//! [`Host`] can be driven, from a test double recording operations to a
//! terminal buffer.
//!
//! ```ignore
//! use ripple_core::{children, component, element, mount, Cx, Node, Props, RenderError, TickQueue};
//!
//! fn app(cx: &mut Cx<'_>, _props: &Props) -> Result<Node, RenderError> {
//!     let (count, set_count) = cx.use_state(0)?;
//!     Ok(element(
//!         "button",
//!         Props::new().on("onClick", move |_| set_count.update(|n| n + 1)),
//!         children!["Count: ", count],
//!     ))
//! }
//!
//! let ticks = TickQueue::new();
//! let root = mount(component!(app), host, container, ticks.clone())?;
//! ticks.run_pending();
//! ```

extern crate alloc;

#[macro_use]
mod macros;

pub mod config;
pub mod context;
pub mod element;
pub mod error;
pub mod hooks;
pub mod host;
pub mod reconcile;
pub mod root;
mod runtime;
pub mod scheduler;


#[doc(inline)]
pub use config::{RootConfig, SetStatePolicy};
#[doc(inline)]
pub use context::{Context, ContextId, create_context};
#[doc(inline)]
pub use element::{
    Child, Component, Element, Event, Handler, Key, Node, PropValue, Props, RenderFn, Str, Style,
    element, normalize_children,
};
#[doc(inline)]
pub use error::{HostError, RenderError};
#[doc(inline)]
pub use hooks::{Cleanup, Cx, HookKind, Setter};
#[doc(inline)]
pub use host::Host;
#[doc(inline)]
pub use reconcile::{PatchStats, Reconciler, event_name};
#[doc(inline)]
pub use root::{Root, RootBuilder, mount};
pub use runtime::{InstanceId, Phase};
#[doc(inline)]
pub use scheduler::{Defer, Task, TickQueue};
