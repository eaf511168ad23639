//! Unified event stream from the processing context
//!
//! Everything the session produces crosses to its owner through a single
//! tagged [`SessionEvent`] channel: snapshots, threshold log entries,
//! connection transitions, config changes, delta frames, and errors. The
//! owner never shares memory with the processing task.

use serde::{Deserialize, Serialize};
use sweep_analysis::{DeltaFrame, LogEvent, SpectrumSnapshot};
use sweep_protocol::SweepConfig;

/// Lifecycle of the one transport a session owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No transport; the resting and terminal state
    Disconnected,
    /// Channel negotiation in progress
    Connecting,
    /// Duplex traffic flowing
    Open,
    /// Teardown in progress; sends are refused
    Closing,
}

impl ConnectionState {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Open => "Open",
            ConnectionState::Closing => "Closing",
        }
    }
}

/// One message from the processing context to the session owner
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A freshly processed sweep
    Snapshot(SpectrumSnapshot),
    /// A threshold crossing was logged
    Log(LogEvent),
    /// The connection state changed
    Connection(ConnectionState),
    /// The active sweep configuration changed
    Config(SweepConfig),
    /// A delta-encoded sweep (only when delta encoding is enabled)
    Delta(DeltaFrame),
    /// A recoverable failure the owner should surface
    Error {
        /// Where the failure happened, e.g. "transport"
        source: String,
        /// What went wrong
        message: String,
    },
}

impl SessionEvent {
    /// Whether this event carries spectrum data
    pub fn is_data(&self) -> bool {
        matches!(self, SessionEvent::Snapshot(_) | SessionEvent::Delta(_))
    }

    /// Whether this event is a connection transition
    pub fn is_connection(&self) -> bool {
        matches!(self, SessionEvent::Connection(_))
    }
}
