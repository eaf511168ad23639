//! Threshold event log
//!
//! Threshold crossings produce [`LogEvent`]s into an append-only log
//! capped at the most recent [`EVENT_LOG_CAP`] entries; the oldest entry
//! is evicted first. Event ids and timestamps are monotonic.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Maximum number of retained log entries
pub const EVENT_LOG_CAP: usize = 500;

/// Severity of a threshold crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Amplitude exceeded the critical threshold
    Critical,
    /// Amplitude exceeded the warning threshold
    Warning,
}

impl EventKind {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Critical => "Critical",
            EventKind::Warning => "Warning",
        }
    }
}

/// Amplitude thresholds that trigger log events
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Above this, a warning may be logged (rate limited)
    pub warning_dbm: f32,
    /// Above this, a critical event is always logged
    pub critical_dbm: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warning_dbm: -45.0,
            critical_dbm: -30.0,
        }
    }
}

/// One recorded threshold crossing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Monotonic event id
    pub id: u64,
    /// Event time, milliseconds since the Unix epoch
    pub timestamp_ms: u64,
    /// Severity
    pub kind: EventKind,
    /// Frequency bin where the crossing occurred, in MHz
    pub frequency_mhz: f64,
    /// Measured amplitude in dBm
    pub amplitude_dbm: f32,
    /// Human-readable description
    pub message: String,
}

/// Append-only event log with bounded retention
#[derive(Debug, Default)]
pub struct EventLog {
    entries: VecDeque<LogEvent>,
    next_id: u64,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(64),
            next_id: 0,
        }
    }

    /// Record a crossing and return the stored event
    pub fn record(
        &mut self,
        timestamp_ms: u64,
        kind: EventKind,
        frequency_mhz: f64,
        amplitude_dbm: f32,
    ) -> LogEvent {
        let event = LogEvent {
            id: self.next_id,
            timestamp_ms,
            kind,
            frequency_mhz,
            amplitude_dbm,
            message: format!(
                "{} signal at {:.3} MHz: {:.1} dBm",
                kind.name(),
                frequency_mhz,
                amplitude_dbm
            ),
        };
        self.next_id += 1;

        if self.entries.len() == EVENT_LOG_CAP {
            self.entries.pop_front();
        }
        self.entries.push_back(event.clone());

        event
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over retained entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &LogEvent> {
        self.entries.iter()
    }

    /// Drop all retained entries (ids keep counting)
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_assigns_monotonic_ids() {
        let mut log = EventLog::new();
        let a = log.record(1, EventKind::Warning, 2400.0, -40.0);
        let b = log.record(2, EventKind::Critical, 2450.0, -20.0);

        assert!(b.id > a.id);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_cap_evicts_oldest_first() {
        let mut log = EventLog::new();
        for i in 0..(EVENT_LOG_CAP as u64 + 10) {
            log.record(i, EventKind::Warning, 1000.0, -40.0);
        }

        assert_eq!(log.len(), EVENT_LOG_CAP);
        // The first ten entries are gone
        assert_eq!(log.iter().next().unwrap().id, 10);
    }

    #[test]
    fn test_message_describes_the_crossing() {
        let mut log = EventLog::new();
        let event = log.record(0, EventKind::Critical, 2450.125, -25.5);
        assert_eq!(event.message, "Critical signal at 2450.125 MHz: -25.5 dBm");
    }

    #[test]
    fn test_clear_keeps_id_counter() {
        let mut log = EventLog::new();
        log.record(0, EventKind::Warning, 1000.0, -40.0);
        log.clear();
        assert!(log.is_empty());

        let next = log.record(1, EventKind::Warning, 1000.0, -40.0);
        assert_eq!(next.id, 1);
    }
}
