//! Snapshot of the processed spectrum state

use serde::{Deserialize, Serialize};
use sweep_protocol::SpectrumSample;

/// One processed view of the spectrum, produced once per decoded sweep
///
/// `max_hold` and `average` are aligned with `samples` index-for-index and
/// carry forward across snapshots; they are `None` until a first sweep has
/// seeded them, and reset on an explicit clear or when the bin count
/// changes. Aggregates are always replaced as whole arrays, never patched
/// in place, so a snapshot can cross a channel boundary safely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumSnapshot {
    /// The current trace, exactly one sample per bin, ascending by frequency
    pub samples: Vec<SpectrumSample>,
    /// Per-bin running maximum in dBm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_hold: Option<Vec<f32>>,
    /// Per-bin moving average in dBm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average: Option<Vec<f32>>,
    /// Strongest local maxima, amplitude descending, at most five
    pub peaks: Vec<SpectrumSample>,
    /// Capture time, milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}
