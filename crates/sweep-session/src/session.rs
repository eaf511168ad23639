//! The sweep session object
//!
//! A [`SweepSession`] is an explicit, caller-owned handle to one analyzer
//! connection: open it, drive it, drop or disconnect it. No global
//! connection state exists anywhere. The session spawns two tasks - the
//! transport I/O loop and the processing pipeline - and talks to them
//! only through channels, so the caller's thread never blocks on device
//! I/O.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::info;

use crate::error::{SessionError, TransportError};
use crate::events::{ConnectionState, SessionEvent};
use crate::pipeline::{run_pipeline, PipelineSettings};
use crate::remote::{self, HANDSHAKE_TIMEOUT};
use crate::transport::{self, run_io_task, IoUpdate};
use sweep_analysis::{DeltaConfig, Thresholds};
use sweep_protocol::control::FEATURE_DELTA_ENCODING;
use sweep_protocol::{DeviceCommand, SweepConfig};

/// Settings for a new session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Initial sweep configuration, replaced once the device reports its own
    pub sweep: SweepConfig,
    /// Amplitude thresholds for the event log
    pub thresholds: Thresholds,
    /// Delta encoder settings
    pub delta: DeltaConfig,
    /// Bound for every internal channel
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sweep: SweepConfig::default(),
            thresholds: Thresholds::default(),
            delta: DeltaConfig::default(),
            channel_capacity: 256,
        }
    }
}

/// Requests from the session handle to the pipeline
#[derive(Debug)]
pub(crate) enum SessionRequest {
    /// Encode and send a device command
    Command(DeviceCommand),
    /// Toggle delta encoding (local or forwarded upstream)
    EnableDelta {
        enabled: bool,
        threshold: Option<f32>,
    },
    /// Recapture the delta baseline
    ResetBaseline,
    /// Clear max-hold and average
    ClearHold,
    /// Drop the retained event history
    ClearEvents,
    /// Tear down; answered once the state is Disconnected
    Disconnect { done: oneshot::Sender<()> },
}

struct SpawnOptions {
    demux: Option<remote::RemoteDemux>,
    features: Vec<String>,
    initial_controls: Vec<sweep_protocol::ControlMessage>,
    initial_chunk: Option<Vec<u8>>,
    request_config: bool,
    forward_delta_upstream: bool,
}

/// A live connection to one spectrum analyzer
pub struct SweepSession {
    request_tx: mpsc::Sender<SessionRequest>,
    state_rx: watch::Receiver<ConnectionState>,
    features: Vec<String>,
}

impl SweepSession {
    /// Open the local serial channel.
    ///
    /// Fixed settings (500000 baud, 8N1); the device's current
    /// configuration is requested as soon as the port opens. On failure
    /// the session never leaves `Disconnected`.
    pub async fn connect_serial(
        port: &str,
        config: SessionConfig,
    ) -> Result<(Self, mpsc::Receiver<SessionEvent>), TransportError> {
        info!("opening serial session on {}", port);
        let stream = transport::open_serial(port)?;

        Ok(Self::spawn(
            stream,
            SpawnOptions {
                demux: None,
                features: Vec::new(),
                initial_controls: Vec::new(),
                initial_chunk: None,
                request_config: true,
                forward_delta_upstream: false,
            },
            config,
        ))
    }

    /// Open a remote socket session.
    ///
    /// Connects over TCP and waits for the server's capability
    /// announcement before the session is considered open. If the server
    /// advertises delta encoding, delta requests are forwarded to it
    /// rather than computed locally.
    pub async fn connect_remote(
        addr: &str,
        mut config: SessionConfig,
    ) -> Result<(Self, mpsc::Receiver<SessionEvent>), TransportError> {
        info!("opening remote session to {}", addr);
        let mut stream = TcpStream::connect(addr)
            .await
            .map_err(|e| map_connect_error(addr, e))?;

        let handshake = remote::await_announcement(&mut stream, HANDSHAKE_TIMEOUT).await?;
        if let Some(sweep) = handshake.config {
            config.sweep = sweep;
        }
        let forward_delta_upstream = handshake
            .features
            .iter()
            .any(|f| f == FEATURE_DELTA_ENCODING);

        Ok(Self::spawn(
            stream,
            SpawnOptions {
                demux: Some(handshake.demux),
                features: handshake.features,
                initial_controls: handshake.pending,
                initial_chunk: Some(handshake.leftover),
                request_config: false,
                forward_delta_upstream,
            },
            config,
        ))
    }

    /// Open a session over an arbitrary duplex stream.
    ///
    /// Used with in-memory duplex pairs for testing against a simulated
    /// device; behaves like the serial channel (no control-message demux).
    pub fn connect_stream<S>(
        io: S,
        config: SessionConfig,
    ) -> (Self, mpsc::Receiver<SessionEvent>)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Self::spawn(
            io,
            SpawnOptions {
                demux: None,
                features: Vec::new(),
                initial_controls: Vec::new(),
                initial_chunk: None,
                request_config: false,
                forward_delta_upstream: false,
            },
            config,
        )
    }

    fn spawn<S>(io: S, opts: SpawnOptions, config: SessionConfig) -> (Self, mpsc::Receiver<SessionEvent>)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let capacity = config.channel_capacity.max(4);

        let (event_tx, event_rx) = mpsc::channel(capacity);
        let (io_tx, io_rx) = mpsc::channel(capacity);
        let (update_tx, update_rx) = mpsc::channel(capacity);
        let (request_tx, request_rx) = mpsc::channel(capacity);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        // The channel is negotiated by the time we get here; record the
        // transitions in order for the caller's event log
        let _ = event_tx.try_send(SessionEvent::Connection(ConnectionState::Connecting));
        let _ = state_tx.send(ConnectionState::Open);
        let _ = event_tx.try_send(SessionEvent::Connection(ConnectionState::Open));

        for msg in opts.initial_controls {
            let _ = update_tx.try_send(IoUpdate::Control(msg));
        }
        if let Some(chunk) = opts.initial_chunk.filter(|c| !c.is_empty()) {
            let _ = update_tx.try_send(IoUpdate::Chunk(chunk));
        }

        tokio::spawn(run_io_task(io, io_rx, update_tx, opts.demux));
        tokio::spawn(run_pipeline(
            update_rx,
            request_rx,
            io_tx,
            event_tx,
            state_tx,
            PipelineSettings {
                sweep: config.sweep,
                thresholds: config.thresholds,
                delta: config.delta,
                forward_delta_upstream: opts.forward_delta_upstream,
            },
        ));

        if opts.request_config {
            let _ = request_tx.try_send(SessionRequest::Command(DeviceCommand::RequestConfig));
        }

        (
            Self {
                request_tx,
                state_rx,
                features: opts.features,
            },
            event_rx,
        )
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Features the remote endpoint advertised (empty for serial sessions)
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Encode and send a device command.
    ///
    /// Fails with [`TransportError::NotOpen`] unless the session is open.
    pub async fn send_command(&self, command: DeviceCommand) -> Result<(), SessionError> {
        if self.state() != ConnectionState::Open {
            return Err(TransportError::NotOpen.into());
        }
        self.request(SessionRequest::Command(command)).await
    }

    /// Ask the device for its current configuration
    pub async fn request_config(&self) -> Result<(), SessionError> {
        self.send_command(DeviceCommand::RequestConfig).await
    }

    /// Set the sweep frequency range
    pub async fn set_frequency_range(
        &self,
        start_mhz: f64,
        end_mhz: f64,
    ) -> Result<(), SessionError> {
        self.send_command(DeviceCommand::SetFrequencyRange { start_mhz, end_mhz })
            .await
    }

    /// Start continuous sweeping
    pub async fn start_sweep(&self) -> Result<(), SessionError> {
        self.send_command(DeviceCommand::StartSweep).await
    }

    /// Stop sweeping (hold)
    pub async fn stop_sweep(&self) -> Result<(), SessionError> {
        self.send_command(DeviceCommand::StopSweep).await
    }

    /// Enable or disable delta-encoded sweep delivery
    pub async fn enable_delta_encoding(
        &self,
        enabled: bool,
        threshold: Option<f32>,
    ) -> Result<(), SessionError> {
        self.request(SessionRequest::EnableDelta { enabled, threshold })
            .await
    }

    /// Recapture the delta baseline
    pub async fn reset_baseline(&self) -> Result<(), SessionError> {
        self.request(SessionRequest::ResetBaseline).await
    }

    /// Clear max-hold and average; the next sweep reseeds them
    pub async fn clear_hold(&self) -> Result<(), SessionError> {
        self.request(SessionRequest::ClearHold).await
    }

    /// Drop the retained threshold-event history
    pub async fn clear_events(&self) -> Result<(), SessionError> {
        self.request(SessionRequest::ClearEvents).await
    }

    /// Disconnect and wait for teardown to finish.
    ///
    /// Safe to call at any time, including mid-decode, and idempotent:
    /// the session always ends in `Disconnected`, with every teardown
    /// failure swallowed along the way.
    pub async fn disconnect(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self
            .request_tx
            .send(SessionRequest::Disconnect { done: done_tx })
            .await
            .is_ok()
        {
            let _ = done_rx.await;
        }
    }

    async fn request(&self, request: SessionRequest) -> Result<(), SessionError> {
        self.request_tx
            .send(request)
            .await
            .map_err(|_| SessionError::ChannelClosed)
    }
}

fn map_connect_error(addr: &str, e: std::io::Error) -> TransportError {
    use std::io::ErrorKind;
    match e.kind() {
        ErrorKind::PermissionDenied => TransportError::PermissionDenied(addr.to_string()),
        ErrorKind::AddrNotAvailable | ErrorKind::InvalidInput => {
            TransportError::NotSupported(format!("{}: {}", addr, e))
        }
        _ => TransportError::DeviceBusy(format!("{}: {}", addr, e)),
    }
}
