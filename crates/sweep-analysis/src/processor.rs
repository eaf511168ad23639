//! Incremental spectrum processing
//!
//! [`SpectrumProcessor`] consumes one assembled sweep at a time and
//! maintains the derived views. It has no I/O and no interior locking;
//! exactly one owner (the session's processing task) drives it to
//! completion per sweep.

use sweep_protocol::SpectrumSample;
use tracing::debug;

use crate::events::{EventKind, EventLog, LogEvent, Thresholds};
use crate::snapshot::SpectrumSnapshot;

/// Peaks below this floor are ignored so noisy bands do not flood the list
const PEAK_FLOOR_DBM: f32 = -70.0;

/// Maximum number of reported peaks
const MAX_PEAKS: usize = 5;

/// Weight of the newest sweep in the moving average; 0.1 gives roughly a
/// ten-sweep effective window with O(1) memory
const AVERAGE_NEW_WEIGHT: f32 = 0.1;

/// Fraction of warning-threshold crossings that actually get logged.
/// Sampling, not debouncing: under sustained marginal signals the log
/// still fills, just 20x slower.
const WARNING_SAMPLE_RATE: f64 = 0.05;

/// Stateful processor over the stream of decoded sweeps
#[derive(Debug)]
pub struct SpectrumProcessor {
    thresholds: Thresholds,
    max_hold: Option<Vec<f32>>,
    average: Option<Vec<f32>>,
    event_log: EventLog,
    fresh_events: Vec<LogEvent>,
    rng: SampleRng,
}

impl SpectrumProcessor {
    /// Create a processor with the given thresholds
    pub fn new(thresholds: Thresholds) -> Self {
        Self::with_seed(thresholds, SampleRng::entropy_seed())
    }

    /// Create a processor with a fixed sampling seed (deterministic tests)
    pub fn with_seed(thresholds: Thresholds, seed: u64) -> Self {
        Self {
            thresholds,
            max_hold: None,
            average: None,
            event_log: EventLog::new(),
            fresh_events: Vec::new(),
            rng: SampleRng::new(seed),
        }
    }

    /// Current thresholds
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Replace the thresholds
    pub fn set_thresholds(&mut self, thresholds: Thresholds) {
        self.thresholds = thresholds;
    }

    /// Process one assembled sweep and produce a snapshot.
    ///
    /// Aggregates whose length no longer matches the sweep are discarded
    /// first; max-hold and average values are never mixed across differing
    /// bin counts.
    pub fn process(&mut self, samples: Vec<SpectrumSample>, timestamp_ms: u64) -> SpectrumSnapshot {
        let bins = samples.len();

        if self.max_hold.as_ref().is_some_and(|h| h.len() != bins) {
            debug!(bins, "bin count changed, resetting aggregates");
            self.max_hold = None;
            self.average = None;
        }

        let current: Vec<f32> = samples.iter().map(|s| s.amplitude_dbm).collect();

        let max_hold = match self.max_hold.take() {
            Some(prev) => prev
                .iter()
                .zip(&current)
                .map(|(&held, &cur)| held.max(cur))
                .collect(),
            None => current.clone(),
        };
        self.max_hold = Some(max_hold);

        let average = match self.average.take() {
            Some(prev) => prev
                .iter()
                .zip(&current)
                .map(|(&avg, &cur)| avg * (1.0 - AVERAGE_NEW_WEIGHT) + cur * AVERAGE_NEW_WEIGHT)
                .collect(),
            None => current.clone(),
        };
        self.average = Some(average);

        self.scan_thresholds(&samples, timestamp_ms);

        SpectrumSnapshot {
            peaks: find_peaks(&samples),
            max_hold: self.max_hold.clone(),
            average: self.average.clone(),
            samples,
            timestamp_ms,
        }
    }

    /// Take the events generated since the last drain
    pub fn drain_events(&mut self) -> Vec<LogEvent> {
        std::mem::take(&mut self.fresh_events)
    }

    /// The capped historical event log
    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    /// Clear max-hold and average; the next sweep reseeds them
    pub fn reset_hold(&mut self) {
        self.max_hold = None;
        self.average = None;
    }

    /// Drop the retained event history
    pub fn clear_events(&mut self) {
        self.event_log.clear();
    }

    fn scan_thresholds(&mut self, samples: &[SpectrumSample], timestamp_ms: u64) {
        for sample in samples {
            let kind = if sample.amplitude_dbm > self.thresholds.critical_dbm {
                EventKind::Critical
            } else if sample.amplitude_dbm > self.thresholds.warning_dbm {
                // Rate limit warnings by sampling so a sustained marginal
                // signal cannot flood the log
                if self.rng.next_f64() >= WARNING_SAMPLE_RATE {
                    continue;
                }
                EventKind::Warning
            } else {
                continue;
            };

            let event = self.event_log.record(
                timestamp_ms,
                kind,
                sample.frequency_mhz,
                sample.amplitude_dbm,
            );
            self.fresh_events.push(event);
        }
    }
}

/// Local maxima above the fixed floor, strongest first, at most five
fn find_peaks(samples: &[SpectrumSample]) -> Vec<SpectrumSample> {
    let mut peaks: Vec<SpectrumSample> = samples
        .windows(3)
        .filter_map(|w| {
            let (left, mid, right) = (w[0].amplitude_dbm, w[1], w[2].amplitude_dbm);
            (mid.amplitude_dbm > left
                && mid.amplitude_dbm > right
                && mid.amplitude_dbm > PEAK_FLOOR_DBM)
                .then_some(mid)
        })
        .collect();

    peaks.sort_by(|a, b| b.amplitude_dbm.total_cmp(&a.amplitude_dbm));
    peaks.truncate(MAX_PEAKS);
    peaks
}

/// xorshift64* generator for the warning sampling policy
///
/// Not cryptographic and does not need to be; it only has to be cheap and
/// seedable so tests are repeatable.
#[derive(Debug)]
struct SampleRng(u64);

impl SampleRng {
    fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    fn entropy_seed() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9E37_79B9_7F4A_7C15)
    }

    fn next_f64(&mut self) -> f64 {
        let mut x = self.0;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0 = x;
        let bits = x.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 11;
        bits as f64 / (1u64 << 53) as f64
    }
}
