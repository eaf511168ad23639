//! Property-based tests for the spectrum processor

use proptest::prelude::*;

use sweep_analysis::{SpectrumProcessor, Thresholds, EVENT_LOG_CAP};
use sweep_protocol::SpectrumSample;

fn sweep_from(amps: &[f32]) -> Vec<SpectrumSample> {
    amps.iter()
        .enumerate()
        .map(|(i, &amplitude_dbm)| SpectrumSample {
            frequency_mhz: 1000.0 + i as f64,
            amplitude_dbm,
        })
        .collect()
}

/// Amplitudes on the device's half-dB grid
fn amplitude() -> impl Strategy<Value = f32> {
    (0u16..=255).prop_map(|raw| -(raw as f32) / 2.0)
}

fn quiet_thresholds() -> Thresholds {
    Thresholds {
        warning_dbm: 10.0,
        critical_dbm: 20.0,
    }
}

proptest! {
    #[test]
    fn max_hold_never_decreases(
        sweeps in prop::collection::vec(prop::collection::vec(amplitude(), 8), 2..12),
    ) {
        let mut proc = SpectrumProcessor::with_seed(quiet_thresholds(), 1);
        let mut prev: Option<Vec<f32>> = None;

        for amps in &sweeps {
            let snap = proc.process(sweep_from(amps), 0);
            let hold = snap.max_hold.clone().unwrap();

            if let Some(prev) = &prev {
                for (p, h) in prev.iter().zip(&hold) {
                    prop_assert!(h >= p);
                }
            }
            // The hold always dominates the current trace
            for (s, h) in snap.samples.iter().zip(&hold) {
                prop_assert!(*h >= s.amplitude_dbm);
            }
            prev = Some(hold);
        }
    }

    #[test]
    fn peaks_bounded_sorted_and_above_floor(
        amps in prop::collection::vec(amplitude(), 0..64),
    ) {
        let mut proc = SpectrumProcessor::with_seed(quiet_thresholds(), 2);
        let snap = proc.process(sweep_from(&amps), 0);

        prop_assert!(snap.peaks.len() <= 5);
        prop_assert!(snap
            .peaks
            .windows(2)
            .all(|w| w[0].amplitude_dbm >= w[1].amplitude_dbm));
        for peak in &snap.peaks {
            prop_assert!(peak.amplitude_dbm > -70.0);
        }
    }

    #[test]
    fn event_log_never_exceeds_cap(rounds in 1usize..800) {
        let mut proc = SpectrumProcessor::with_seed(Thresholds::default(), 9);

        // Every bin is above the critical threshold, so four events per sweep
        for t in 0..rounds as u64 {
            proc.process(sweep_from(&[-10.0; 4]), t);
            prop_assert!(proc.event_log().len() <= EVENT_LOG_CAP);
        }
    }
}
