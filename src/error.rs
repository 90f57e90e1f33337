//! Error types for the fiber runtime.
//!
//! Every failure aborts the flush it happens in. Nothing is rolled back
//! because nothing visible has been touched yet: the commit engine builds
//! into a detached staging root and only splices at the very end.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FiberError>;

/// Errors raised while rendering or committing a fiber tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FiberError {
    /// A flush was requested on a scheduler that has no root mounted.
    #[error("no root mounted: call render() before scheduling work")]
    NotMounted,

    /// The host backend refused to produce a node for a fiber.
    #[error("host backend failed to create node for `{tag}`: {reason}")]
    HostNodeCreation { tag: String, reason: String },

    /// A nested property path the host node does not support.
    #[error("invalid property assignment on host node: {path}")]
    InvalidProperty { path: String },

    /// A hook was called while no component was rendering.
    #[error("hooks can only be called while a function component renders")]
    HookOutsideRender,

    /// The number of hooks changed between renders of one instance.
    #[error("hook order changed for {instance}: expected {expected} hook(s), found {found}")]
    HookOrder {
        instance: String,
        expected: usize,
        found: usize,
    },

    /// The hook at a position holds a different value type than requested.
    #[error("hook #{index} of {instance} was registered with a different state type")]
    HookTypeMismatch { instance: String, index: usize },

    /// A fallible component returned an error.
    #[error("component `{component}` failed: {message}")]
    ComponentFailed { component: String, message: String },

    /// State updates requested during flushes kept scheduling new flushes.
    #[error("too many nested flushes (limit {limit}); a component probably sets state on every render")]
    FlushLimitExceeded { limit: usize },

    /// Writing the committed tree to an output failed.
    #[error("output error: {0}")]
    Output(String),
}

impl From<std::io::Error> for FiberError {
    fn from(err: std::io::Error) -> Self {
        FiberError::Output(err.to_string())
    }
}

impl FiberError {
    /// Convenience constructor for component failures.
    pub fn component(component: impl Into<String>, message: impl Into<String>) -> Self {
        FiberError::ComponentFailed {
            component: component.into(),
            message: message.into(),
        }
    }
}
