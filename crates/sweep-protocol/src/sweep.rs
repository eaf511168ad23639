//! Sweep configuration and sample assembly

use serde::{Deserialize, Serialize};

use crate::message::ConfigUpdate;

/// Active sweep configuration
///
/// Session-owned and mutable: a config frame from the device or a
/// set-frequency command updates it, and sample assembly reads it to map
/// bin indices onto frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Sweep start frequency in MHz
    pub start_freq_mhz: f64,
    /// Sweep end frequency in MHz
    pub end_freq_mhz: f64,
    /// Expected number of amplitude bins per sweep
    pub step_count: u16,
    /// Device-side resolution bandwidth in kHz (reported, never computed)
    pub rbw_khz: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            start_freq_mhz: 1990.0,
            end_freq_mhz: 6000.0,
            step_count: 112,
            rbw_khz: 600.0,
        }
    }
}

impl SweepConfig {
    /// Width of the configured span in MHz
    pub fn span_mhz(&self) -> f64 {
        self.end_freq_mhz - self.start_freq_mhz
    }

    /// Apply a device config report
    pub fn apply(&mut self, update: ConfigUpdate) {
        self.start_freq_mhz = update.start_freq_mhz;
        self.end_freq_mhz = update.end_freq_mhz;
    }

    /// Record a locally requested frequency range
    pub fn set_range(&mut self, start_mhz: f64, end_mhz: f64) {
        self.start_freq_mhz = start_mhz;
        self.end_freq_mhz = end_mhz;
    }
}

/// One point of a sweep: a frequency bin and its measured amplitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumSample {
    /// Bin center frequency in MHz
    #[serde(rename = "frequency")]
    pub frequency_mhz: f64,
    /// Measured amplitude in dBm
    #[serde(rename = "amplitude")]
    pub amplitude_dbm: f32,
}

/// Map a sweep's amplitude bins onto the configured frequency range.
///
/// Bins divide the span evenly with the first bin at the start frequency
/// and the last at the end, so samples come out ascending by frequency.
pub fn assemble_sweep(frame: &crate::message::SweepFrame, config: &SweepConfig) -> Vec<SpectrumSample> {
    let steps = frame.amplitudes_dbm.len();
    let freq_step = if steps > 1 {
        config.span_mhz() / (steps as f64 - 1.0)
    } else {
        0.0
    };

    frame
        .amplitudes_dbm
        .iter()
        .enumerate()
        .map(|(i, &amplitude_dbm)| SpectrumSample {
            frequency_mhz: config.start_freq_mhz + i as f64 * freq_step,
            amplitude_dbm,
        })
        .collect()
}
