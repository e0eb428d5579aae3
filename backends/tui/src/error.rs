use std::io;

use ripple_core::RenderError;

/// Errors that can occur while building or running a [`TuiApp`](crate::TuiApp).
#[derive(Debug, thiserror::Error)]
pub enum TuiError {
    /// Low level terminal I/O failure.
    #[error("terminal I/O error: {0}")]
    Io(#[from] io::Error),
    /// A render pass of the mounted tree failed.
    #[error("rendering error: {0}")]
    Render(#[from] RenderError),
}
