//! Error types shared by the render pipeline.

use alloc::string::String;
use thiserror::Error;

/// Errors that abort a render pass.
///
/// A failed pass never commits: the previously rendered tree stays the visible
/// state of the host and becomes the baseline for the next attempt.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A hook was invoked while no render pass was active.
    #[error("hook `{hook}` called outside an active render pass")]
    HookMisuse {
        /// Name of the offending hook.
        hook: &'static str,
    },
    /// The hook calls of a component changed count, kind or type between renders.
    #[error("hook order changed in `{component}` at slot {slot}: {detail}")]
    HookOrder {
        /// Name of the component whose hook sequence diverged.
        component: &'static str,
        /// Slot position where the divergence was detected.
        slot: usize,
        /// Human readable description of the divergence.
        detail: String,
    },
    /// The host tree no longer matches the retained snapshot.
    #[error("reconciliation mismatch: {0}")]
    ReconciliationMismatch(String),
    /// A host operation failed.
    #[error(transparent)]
    Host(#[from] HostError),
    /// A component reported a failure while rendering.
    #[error("component `{component}` failed: {message}")]
    Component {
        /// Name of the failing component.
        component: &'static str,
        /// Failure description.
        message: String,
    },
    /// A synchronous pass was requested while another one was running.
    #[error("a render pass is already running")]
    Reentrant,
    /// The root was unmounted and can no longer render.
    #[error("root has been unmounted")]
    Unmounted,
}

impl RenderError {
    /// Creates a [`RenderError::Component`] for the named component.
    #[must_use]
    pub fn component(component: &'static str, message: impl Into<String>) -> Self {
        Self::Component {
            component,
            message: message.into(),
        }
    }

    pub(crate) fn mismatch(message: impl Into<String>) -> Self {
        Self::ReconciliationMismatch(message.into())
    }
}

/// Failure reported by a [`Host`](crate::Host) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("host operation failed: {message}")]
pub struct HostError {
    message: String,
}

impl HostError {
    /// Creates a new host error with the provided message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
