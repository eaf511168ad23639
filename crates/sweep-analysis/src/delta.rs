//! Delta encoding of sweeps against a baseline
//!
//! On bandwidth-constrained remote links, retransmitting every bin of
//! every sweep is wasteful when most of the spectrum is static noise
//! floor. [`DeltaEncoder`] keeps a baseline sweep and emits only the
//! samples that moved by more than a threshold, plus a periodic full
//! refresh so a client can always resynchronize.

use serde::{Deserialize, Serialize};
use sweep_protocol::SpectrumSample;
use tracing::debug;

/// Default minimum amplitude change worth transmitting, in dB
pub const DEFAULT_DELTA_THRESHOLD_DB: f32 = 1.0;

/// Default baseline lifetime before a forced full refresh
pub const DEFAULT_BASELINE_REFRESH_MS: u64 = 60_000;

/// Delta encoder settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaConfig {
    /// Minimum amplitude change worth transmitting, in dB
    pub threshold_db: f32,
    /// Baseline lifetime before a forced full refresh, in milliseconds
    pub refresh_interval_ms: u64,
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self {
            threshold_db: DEFAULT_DELTA_THRESHOLD_DB,
            refresh_interval_ms: DEFAULT_BASELINE_REFRESH_MS,
        }
    }
}

/// The sweep against which differences are computed
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaBaseline {
    /// Baseline samples, one per bin
    pub samples: Vec<SpectrumSample>,
    /// When the baseline was captured, milliseconds since the Unix epoch
    pub captured_at_ms: u64,
}

/// One bin that changed materially since the baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaSample {
    /// Bin index into the full sweep
    pub index: usize,
    /// Bin center frequency in MHz (carried for validation)
    #[serde(rename = "frequency")]
    pub frequency_mhz: f64,
    /// New amplitude in dBm
    #[serde(rename = "amplitude")]
    pub amplitude_dbm: f32,
}

/// Encoded output for one sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "encoding", rename_all = "snake_case")]
pub enum DeltaFrame {
    /// A complete sweep; also establishes the new baseline
    Full {
        /// All samples
        samples: Vec<SpectrumSample>,
    },
    /// Only the bins that changed since the baseline
    Delta {
        /// Changed bins
        changes: Vec<DeltaSample>,
        /// `1 - changed/total`; 1.0 means nothing had to be sent
        compression_ratio: f32,
        /// Age of the baseline at encode time, in milliseconds
        baseline_age_ms: u64,
    },
}

/// Stateful encoder producing [`DeltaFrame`]s from successive sweeps
#[derive(Debug)]
pub struct DeltaEncoder {
    config: DeltaConfig,
    baseline: Option<DeltaBaseline>,
}

impl DeltaEncoder {
    /// Create an encoder with the given settings
    pub fn new(config: DeltaConfig) -> Self {
        Self {
            config,
            baseline: None,
        }
    }

    /// Current settings
    pub fn config(&self) -> DeltaConfig {
        self.config
    }

    /// Change the amplitude threshold
    pub fn set_threshold(&mut self, threshold_db: f32) {
        self.config.threshold_db = threshold_db;
    }

    /// Drop the baseline; the next sweep encodes as a full refresh
    pub fn reset(&mut self) {
        self.baseline = None;
    }

    /// Encode one sweep against the baseline.
    ///
    /// A missing, expired, or differently sized baseline (span change)
    /// forces a full frame that also becomes the new baseline. Otherwise
    /// only bins whose amplitude moved by more than the threshold are
    /// emitted, and those bins update the baseline in place.
    pub fn encode(&mut self, samples: &[SpectrumSample], now_ms: u64) -> DeltaFrame {
        let refresh_due = match &self.baseline {
            None => true,
            Some(base) => {
                base.samples.len() != samples.len()
                    || now_ms.saturating_sub(base.captured_at_ms) > self.config.refresh_interval_ms
            }
        };

        if refresh_due {
            self.baseline = Some(DeltaBaseline {
                samples: samples.to_vec(),
                captured_at_ms: now_ms,
            });
            return DeltaFrame::Full {
                samples: samples.to_vec(),
            };
        }

        let mut changes = Vec::new();
        let mut baseline_age_ms = 0;
        if let Some(base) = self.baseline.as_mut() {
            for (index, sample) in samples.iter().enumerate() {
                let moved = (sample.amplitude_dbm - base.samples[index].amplitude_dbm).abs()
                    > self.config.threshold_db;
                if moved {
                    changes.push(DeltaSample {
                        index,
                        frequency_mhz: sample.frequency_mhz,
                        amplitude_dbm: sample.amplitude_dbm,
                    });
                    base.samples[index].amplitude_dbm = sample.amplitude_dbm;
                }
            }
            baseline_age_ms = now_ms.saturating_sub(base.captured_at_ms);
        }

        let total = samples.len().max(1);
        let compression_ratio = 1.0 - changes.len() as f32 / total as f32;
        debug!(
            changed = changes.len(),
            total,
            compression_ratio,
            "delta-encoded sweep"
        );

        DeltaFrame::Delta {
            changes,
            compression_ratio,
            baseline_age_ms,
        }
    }
}

impl Default for DeltaEncoder {
    fn default() -> Self {
        Self::new(DeltaConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep(amplitudes: &[f32]) -> Vec<SpectrumSample> {
        amplitudes
            .iter()
            .enumerate()
            .map(|(i, &amplitude_dbm)| SpectrumSample {
                frequency_mhz: 2400.0 + i as f64,
                amplitude_dbm,
            })
            .collect()
    }

    #[test]
    fn test_first_sweep_is_full_refresh() {
        let mut enc = DeltaEncoder::default();
        let frame = enc.encode(&sweep(&[-60.0, -70.0]), 0);

        assert!(matches!(frame, DeltaFrame::Full { ref samples } if samples.len() == 2));
    }

    #[test]
    fn test_changes_below_threshold_are_suppressed() {
        let mut enc = DeltaEncoder::default();
        enc.encode(&sweep(&[-60.0, -70.0, -80.0]), 0);

        // Everything moves by 0.5 dB, under the 1 dB threshold
        let frame = enc.encode(&sweep(&[-60.5, -69.5, -80.5]), 100);

        match frame {
            DeltaFrame::Delta {
                changes,
                compression_ratio,
                ..
            } => {
                assert!(changes.is_empty());
                assert_eq!(compression_ratio, 1.0);
            }
            other => panic!("expected delta frame, got {:?}", other),
        }
    }

    #[test]
    fn test_material_change_is_emitted_and_updates_baseline() {
        let mut enc = DeltaEncoder::default();
        enc.encode(&sweep(&[-60.0, -70.0]), 0);

        let frame = enc.encode(&sweep(&[-40.0, -70.0]), 100);
        match frame {
            DeltaFrame::Delta { changes, .. } => {
                assert_eq!(changes.len(), 1);
                assert_eq!(changes[0].index, 0);
                assert_eq!(changes[0].amplitude_dbm, -40.0);
            }
            other => panic!("expected delta frame, got {:?}", other),
        }

        // The changed bin is now the baseline, so repeating it is silent
        let frame = enc.encode(&sweep(&[-40.0, -70.0]), 200);
        assert!(matches!(frame, DeltaFrame::Delta { ref changes, .. } if changes.is_empty()));
    }

    #[test]
    fn test_span_change_forces_full_refresh() {
        let mut enc = DeltaEncoder::default();
        enc.encode(&sweep(&[-60.0, -70.0]), 0);

        let frame = enc.encode(&sweep(&[-60.0, -70.0, -80.0]), 100);
        assert!(matches!(frame, DeltaFrame::Full { .. }));
    }

    #[test]
    fn test_expired_baseline_forces_full_refresh() {
        let mut enc = DeltaEncoder::new(DeltaConfig {
            threshold_db: 1.0,
            refresh_interval_ms: 1_000,
        });
        enc.encode(&sweep(&[-60.0]), 0);

        let frame = enc.encode(&sweep(&[-60.0]), 2_000);
        assert!(matches!(frame, DeltaFrame::Full { .. }));
    }

    #[test]
    fn test_reset_drops_baseline() {
        let mut enc = DeltaEncoder::default();
        enc.encode(&sweep(&[-60.0]), 0);
        enc.reset();

        let frame = enc.encode(&sweep(&[-60.0]), 1);
        assert!(matches!(frame, DeltaFrame::Full { .. }));
    }

    #[test]
    fn test_compression_ratio_counts_changed_bins() {
        let mut enc = DeltaEncoder::default();
        enc.encode(&sweep(&[-60.0, -60.0, -60.0, -60.0]), 0);

        let frame = enc.encode(&sweep(&[-40.0, -60.0, -60.0, -60.0]), 100);
        match frame {
            DeltaFrame::Delta {
                compression_ratio, ..
            } => assert_eq!(compression_ratio, 0.75),
            other => panic!("expected delta frame, got {:?}", other),
        }
    }
}
