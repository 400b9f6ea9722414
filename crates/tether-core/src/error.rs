//! Error types shared across the workspace.

use thiserror::Error;

/// Default failure payload carried by a source's error event.
///
/// Cheap to clone so a multicast channel can hand the same failure to every
/// subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// A producer failed with a plain message.
    #[error("{0}")]
    Message(String),

    /// A transform applied to an emitted value failed.
    #[error("transform failed: {0}")]
    Transform(String),
}

impl StreamError {
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    #[must_use]
    pub fn transform(message: impl Into<String>) -> Self {
        Self::Transform(message.into())
    }
}

/// Returned by [`CancelToken::check`](crate::cancel::CancelToken::check)
/// once the owning subscription has been cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("subscription cancelled")]
pub struct Cancelled;
