//! Spectrum Analyzer Wire Protocol
//!
//! This crate provides parsing and encoding for the binary telemetry
//! protocol spoken by handheld spectrum analyzers over a serial link
//! (or a socket relaying the same byte stream):
//!
//! - **Framing**: a streaming accumulator that reassembles frames from
//!   arbitrarily split byte chunks
//! - **Decoding**: sweep frames to dBm amplitudes, config frames to a
//!   frequency range, response frames to diagnostic text
//! - **Assembly**: amplitude vectors plus the active [`SweepConfig`]
//!   into ordered `(frequency, amplitude)` samples
//! - **Commands**: the ASCII command grammar the device accepts
//!
//! # Frame Format
//! ```text
//! '$' <type> <body> <terminator>
//! ```
//!
//! - `'$'` (0x24): start marker
//! - `type`: `'S'` sweep, `'C'` config, `'#'` response
//! - Sweep body: 1 step-count byte, then that many amplitude bytes
//!   (each raw byte `r` decodes to `-r/2` dBm), one trailing EOL byte
//! - Config/response bodies: ASCII, CR/LF terminated
//!
//! # Example
//!
//! ```rust
//! use sweep_protocol::{decode_frame, DeviceMessage, FrameAccumulator};
//!
//! let mut acc = FrameAccumulator::new();
//! // Chunk boundaries never align with frame boundaries
//! assert!(acc.feed(b"$S\x02").is_empty());
//! let frames = acc.feed(&[200, 100, b'\n']);
//! assert_eq!(frames.len(), 1);
//!
//! if let DeviceMessage::Sweep(sweep) = decode_frame(&frames[0]).unwrap() {
//!     assert_eq!(sweep.amplitudes_dbm, vec![-100.0, -50.0]);
//! }
//! ```

pub mod command;
pub mod control;
pub mod error;
pub mod frame;
pub mod message;
pub mod sweep;

pub use command::DeviceCommand;
pub use control::ControlMessage;
pub use error::ParseError;
pub use frame::{scan_frame, FrameAccumulator, FrameKind, RawFrame, ScanStep};
pub use message::{decode_amplitude, decode_frame, ConfigUpdate, DeviceMessage, SweepFrame};
pub use sweep::{assemble_sweep, SpectrumSample, SweepConfig};
