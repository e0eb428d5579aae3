//! Hooks built from the engine's primitives.

use ripple::prelude::*;

/// A boolean flag plus a stable handler that flips it.
pub fn use_toggle(cx: &mut Cx<'_>, initial: bool) -> Result<(bool, Handler), RenderError> {
    let (value, set_value) = cx.use_state(initial)?;
    let toggle = cx.use_callback((), move |_| set_value.update(|value| !value))?;
    Ok((value, toggle))
}
