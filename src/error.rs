//! Error taxonomy for the chat and signaling layer.

use thiserror::Error;

/// Everything the chat/presence/call layer can fail with.
///
/// Validation errors (`InvalidParticipants`, `EmptyMessage`) are resolved at
/// the call site with a one-line user notice. `StoreUnavailable` is surfaced
/// only after the HTTP client gave up; there is no retry loop on top of it.
/// `DispatchFailed` must never fail an already-durable message send.
#[derive(Debug, Error)]
pub enum ChatError {
    /// A participant cannot open a room with itself, and ids must be non-empty.
    #[error("invalid participant pair: a user cannot chat with themselves")]
    InvalidParticipants,

    /// Message body is empty after trimming.
    #[error("message body is empty")]
    EmptyMessage,

    /// The document store rejected or never answered a request.
    #[error("document store unavailable: {0}")]
    StoreUnavailable(String),

    /// The push provider rejected or never answered a dispatch.
    #[error("push dispatch failed: {0}")]
    DispatchFailed(String),

    /// A required local media device is missing. Checked before any call
    /// session record is written.
    #[error("{0}")]
    DeviceUnavailable(String),
}
