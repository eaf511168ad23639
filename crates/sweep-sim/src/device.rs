//! Simulated analyzer state machine
//!
//! [`SimAnalyzer`] holds the device-side state (configuration, sweeping
//! flag, amplitude profile) and produces wire-accurate output: `$C`
//! config frames in response to commands and `$S` sweep frames while
//! sweeping. It is synchronous; [`crate::task`] drives it over a stream.

use std::collections::VecDeque;

use tracing::debug;

use sweep_protocol::SweepConfig;

/// A simulated spectrum analyzer
#[derive(Debug)]
pub struct SimAnalyzer {
    config: SweepConfig,
    sweeping: bool,
    /// Raw amplitude bytes transmitted for every sweep
    profile: Vec<u8>,
    pending_output: VecDeque<Vec<u8>>,
}

impl SimAnalyzer {
    /// Create an analyzer with a flat noise-floor profile (-100 dBm)
    pub fn new(config: SweepConfig) -> Self {
        let profile = vec![200; config.step_count as usize];
        Self::with_profile(config, profile)
    }

    /// Create an analyzer that repeats the given raw amplitude bytes
    pub fn with_profile(config: SweepConfig, profile: Vec<u8>) -> Self {
        Self {
            config,
            sweeping: false,
            profile,
            pending_output: VecDeque::new(),
        }
    }

    /// Current device configuration
    pub fn config(&self) -> SweepConfig {
        self.config
    }

    /// Whether continuous sweep mode is active
    pub fn is_sweeping(&self) -> bool {
        self.sweeping
    }

    /// Replace the amplitude profile used for subsequent sweeps
    pub fn set_profile(&mut self, profile: Vec<u8>) {
        self.profile = profile;
    }

    /// Raise one bin of the profile to simulate a carrier appearing
    pub fn inject_signal(&mut self, bin: usize, raw_amplitude: u8) {
        if let Some(slot) = self.profile.get_mut(bin) {
            *slot = raw_amplitude;
        }
    }

    /// Process one ASCII command line (no CR-LF)
    pub fn handle_line(&mut self, line: &str) {
        match line {
            "#0C0" => {
                debug!("sim: config requested");
                let frame = self.config_frame();
                self.pending_output.push_back(frame);
            }
            "#0C3" => {
                debug!("sim: sweep started");
                self.sweeping = true;
            }
            "#0CH" => {
                debug!("sim: sweep held");
                self.sweeping = false;
            }
            _ => {
                if let Some(fields) = line.strip_prefix("#0C2-F:") {
                    self.set_range(fields);
                } else {
                    debug!("sim: ignoring unknown command {:?}", line);
                }
            }
        }
    }

    fn set_range(&mut self, fields: &str) {
        let Some((start, span)) = fields.split_once(',') else {
            debug!("sim: malformed set-frequency command");
            return;
        };
        let (Ok(start_khz), Ok(span_khz)) = (start.parse::<u32>(), span.parse::<u32>()) else {
            debug!("sim: non-numeric set-frequency fields");
            return;
        };

        self.config.start_freq_mhz = start_khz as f64 / 1000.0;
        self.config.end_freq_mhz = self.config.start_freq_mhz + span_khz as f64 / 1000.0;
        debug!(
            "sim: range set to {:.3}-{:.3} MHz",
            self.config.start_freq_mhz, self.config.end_freq_mhz
        );

        // The device acknowledges a range change with a config report
        let frame = self.config_frame();
        self.pending_output.push_back(frame);
    }

    /// Encode the current configuration as a `$C` frame
    pub fn config_frame(&self) -> Vec<u8> {
        let start_khz = (self.config.start_freq_mhz * 1000.0).round() as u32;
        let span_khz = (self.config.span_mhz() * 1000.0).round() as u32;
        format!("$C{:07}{:07}\r\n", start_khz, span_khz).into_bytes()
    }

    /// Encode one sweep of the current profile as a `$S` frame
    pub fn sweep_frame(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(4 + self.profile.len());
        frame.push(b'$');
        frame.push(b'S');
        frame.push(self.profile.len() as u8);
        frame.extend_from_slice(&self.profile);
        frame.push(b'\r');
        frame
    }

    /// Take the next queued output frame
    pub fn take_output(&mut self) -> Option<Vec<u8>> {
        self.pending_output.pop_front()
    }

    /// Whether output frames are queued
    pub fn has_output(&self) -> bool {
        !self.pending_output.is_empty()
    }
}
