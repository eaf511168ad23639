//! Spectrum Sweep Analysis
//!
//! This crate turns the stream of decoded sweeps into continuously
//! updated aggregate views:
//!
//! - **Current trace**: the latest sweep, replacing the one before it
//! - **Max-hold**: per-bin running maximum until explicitly cleared
//! - **Average**: exponentially weighted moving average per bin
//! - **Peaks**: top signals above a fixed floor, at most five
//! - **Threshold events**: a capped, append-only log of critical and
//!   warning crossings
//! - **Delta encoding**: sparse change sets against a baseline for
//!   bandwidth-constrained links
//!
//! [`SpectrumProcessor`] is a pure incremental function over sweeps: it
//! holds its own state, takes one assembled sweep at a time, and never
//! touches I/O, so it runs in the processing context without locking.

pub mod delta;
pub mod events;
pub mod processor;
pub mod snapshot;

pub use delta::{
    DeltaBaseline, DeltaConfig, DeltaEncoder, DeltaFrame, DeltaSample,
    DEFAULT_BASELINE_REFRESH_MS, DEFAULT_DELTA_THRESHOLD_DB,
};
pub use events::{EventKind, EventLog, LogEvent, Thresholds, EVENT_LOG_CAP};
pub use processor::SpectrumProcessor;
pub use snapshot::SpectrumSnapshot;
