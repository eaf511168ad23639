//! Error types for protocol parsing

use thiserror::Error;

/// Errors that can occur while decoding a frame body
///
/// Decode failures are never fatal to the stream: the frame has already
/// been consumed by the accumulator, so the caller logs and moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Frame structure does not match its type
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Config body is not the expected fixed-width ASCII decimal layout
    #[error("invalid config body: {0}")]
    InvalidConfig(String),
}
