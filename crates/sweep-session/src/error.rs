//! Error types for sessions and transports

use thiserror::Error;

/// Errors raised by a transport
///
/// Connect failures revert the session to `Disconnected` and are never
/// retried automatically; runtime stream failures surface as
/// [`SessionEvent::Error`](crate::events::SessionEvent) instead of
/// propagating as faults.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The requested channel cannot exist on this system
    #[error("transport not supported: {0}")]
    NotSupported(String),

    /// The operating system refused access to the device
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The device or endpoint exists but cannot be claimed right now
    #[error("device busy: {0}")]
    DeviceBusy(String),

    /// A send was attempted while the transport is not open
    #[error("transport is not open")]
    NotOpen,

    /// The transport closed underneath the session
    #[error("transport closed")]
    Closed,

    /// The remote endpoint never completed its capability announcement
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by [`SweepSession`](crate::session::SweepSession) methods
#[derive(Debug, Error)]
pub enum SessionError {
    /// Transport-level failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The session's processing task is no longer running
    #[error("session task is gone")]
    ChannelClosed,
}
