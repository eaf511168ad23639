//! Transport I/O task
//!
//! One task owns the duplex stream, whichever concrete channel backs it:
//! a serial port, a TCP socket, or an in-memory duplex for tests. It
//! pushes inbound chunks (and, for remote sessions, demultiplexed control
//! messages) to the processing pipeline and drains a write queue the
//! other way. Chunk sizes are whatever the transport hands us; nothing
//! downstream may assume they align with frame boundaries.

use std::io::ErrorKind;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::remote::RemoteDemux;
use sweep_protocol::ControlMessage;

/// Fixed line rate for the local serial channel
pub const BAUD_RATE: u32 = 500_000;

/// Writes queued for the device
#[derive(Debug)]
pub(crate) enum IoCommand {
    /// Write these bytes and flush
    Write(Vec<u8>),
    /// Tear the stream down; all errors are swallowed
    Shutdown,
}

/// Inbound traffic pushed to the pipeline
#[derive(Debug)]
pub(crate) enum IoUpdate {
    /// Raw device bytes, arbitrary size and split point
    Chunk(Vec<u8>),
    /// A JSON control message (remote sessions only)
    Control(ControlMessage),
    /// The stream ended; `reason` is `None` for an orderly EOF
    Closed { reason: Option<String> },
}

/// Open the local serial channel with the analyzer's fixed settings:
/// 500000 baud, 8 data bits, 1 stop bit, no parity.
pub(crate) fn open_serial(port: &str) -> Result<SerialStream, TransportError> {
    tokio_serial::new(port, BAUD_RATE)
        .data_bits(DataBits::Eight)
        .stop_bits(StopBits::One)
        .parity(Parity::None)
        .timeout(Duration::from_millis(100))
        .open_native_async()
        .map_err(|e| map_serial_error(port, e))
}

/// Map serial-port failures onto the session's error taxonomy
pub(crate) fn map_serial_error(port: &str, e: tokio_serial::Error) -> TransportError {
    match e.kind() {
        serialport::ErrorKind::NoDevice => {
            TransportError::NotSupported(format!("{}: {}", port, e.description))
        }
        serialport::ErrorKind::Io(ErrorKind::PermissionDenied) => {
            TransportError::PermissionDenied(port.to_string())
        }
        _ => TransportError::DeviceBusy(format!("{}: {}", port, e.description)),
    }
}

/// Run the I/O loop until shutdown, stream end, or a fatal error.
///
/// Remote sessions pass a [`RemoteDemux`] so JSON control lines are
/// peeled off the byte stream before it reaches the frame accumulator.
pub(crate) async fn run_io_task<S>(
    mut io: S,
    mut cmd_rx: mpsc::Receiver<IoCommand>,
    update_tx: mpsc::Sender<IoUpdate>,
    mut demux: Option<RemoteDemux>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut buf = vec![0u8; 1024];

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(IoCommand::Write(bytes)) => {
                    debug!("writing {} bytes: {:02X?}", bytes.len(), bytes);
                    if let Err(e) = io.write_all(&bytes).await {
                        warn!("write failed: {}", e);
                        let _ = update_tx
                            .send(IoUpdate::Closed { reason: Some(e.to_string()) })
                            .await;
                        break;
                    }
                    let _ = io.flush().await;
                }
                Some(IoCommand::Shutdown) | None => {
                    // Teardown failures are swallowed so disconnect always completes
                    let _ = io.shutdown().await;
                    break;
                }
            },

            result = io.read(&mut buf) => match result {
                Ok(0) => {
                    debug!("transport stream ended");
                    let _ = update_tx.send(IoUpdate::Closed { reason: None }).await;
                    break;
                }
                Ok(n) => {
                    let data = &buf[..n];
                    if !forward_inbound(data, &update_tx, demux.as_mut()).await {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                Err(e) => {
                    warn!("read error: {}", e);
                    let _ = update_tx
                        .send(IoUpdate::Closed { reason: Some(e.to_string()) })
                        .await;
                    break;
                }
            }
        }
    }

    debug!("transport I/O task ended");
}

/// Forward one inbound chunk; returns false once the pipeline is gone
async fn forward_inbound(
    data: &[u8],
    update_tx: &mpsc::Sender<IoUpdate>,
    demux: Option<&mut RemoteDemux>,
) -> bool {
    match demux {
        Some(demux) => {
            let (controls, binary) = demux.feed(data);
            for msg in controls {
                if update_tx.send(IoUpdate::Control(msg)).await.is_err() {
                    return false;
                }
            }
            if !binary.is_empty() && update_tx.send(IoUpdate::Chunk(binary)).await.is_err() {
                return false;
            }
            true
        }
        None => update_tx.send(IoUpdate::Chunk(data.to_vec())).await.is_ok(),
    }
}
