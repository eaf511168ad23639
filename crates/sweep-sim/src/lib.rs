//! Simulated Spectrum Analyzer
//!
//! A protocol-accurate stand-in for the hardware: it answers the ASCII
//! command grammar and streams binary sweep frames, so the full session
//! pipeline can be exercised over an in-memory duplex stream with no
//! device attached.

pub mod device;
pub mod task;

pub use device::SimAnalyzer;
pub use task::{run_sim_analyzer, spawn_sim, SimCommand};
