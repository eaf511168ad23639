//! Analyzer Session Management
//!
//! This crate owns the live side of the telemetry pipeline: the duplex
//! transports (local serial port, remote socket), the session lifecycle,
//! and the processing task that turns raw chunks into snapshots and
//! events.
//!
//! # Architecture
//!
//! Two execution contexts exist per session. The caller (typically an
//! interactive surface) holds a [`SweepSession`] and an event receiver;
//! a spawned processing task owns the frame accumulator, decoder, sweep
//! assembler, and spectrum processor. The two sides share no mutable
//! memory - chunks and [`SessionEvent`]s cross on bounded mpsc channels,
//! in order, with nothing dropped.
//!
//! # Example
//!
//! ```rust,no_run
//! use sweep_session::{SessionConfig, SessionEvent, SweepSession};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let (session, mut events) =
//!     SweepSession::connect_serial("/dev/ttyUSB0", SessionConfig::default()).await?;
//!
//! session.start_sweep().await?;
//!
//! while let Some(event) = events.recv().await {
//!     if let SessionEvent::Snapshot(snapshot) = event {
//!         println!("{} bins", snapshot.samples.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod events;
pub mod ports;
pub mod session;

mod pipeline;
mod remote;
mod transport;

pub use error::{SessionError, TransportError};
pub use events::{ConnectionState, SessionEvent};
pub use ports::{list_ports, PortInfo};
pub use session::{SessionConfig, SweepSession};
pub use transport::BAUD_RATE;
