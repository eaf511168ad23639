//! The processing pipeline task
//!
//! Owns the frame accumulator, decoder, assembler, processor, and delta
//! encoder for one session. Single-threaded and run-to-completion per
//! message: exactly one writer touches this state, so no locking exists
//! anywhere in the pipeline. Inbound chunks and session requests arrive
//! on channels; snapshots and events leave on another. Snapshots go out
//! in decode order and none are dropped.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::events::{ConnectionState, SessionEvent};
use crate::remote::control_line;
use crate::session::SessionRequest;
use crate::transport::{IoCommand, IoUpdate};
use sweep_analysis::{
    DeltaConfig, DeltaEncoder, SpectrumProcessor, Thresholds, DEFAULT_DELTA_THRESHOLD_DB,
};
use sweep_protocol::{
    assemble_sweep, decode_frame, ControlMessage, DeviceCommand, DeviceMessage, FrameAccumulator,
    SpectrumSample, SweepConfig,
};

/// Initial pipeline state, fixed at connect time
pub(crate) struct PipelineSettings {
    pub sweep: SweepConfig,
    pub thresholds: Thresholds,
    pub delta: DeltaConfig,
    /// When true, delta requests are forwarded to the remote peer
    /// instead of toggling the local encoder
    pub forward_delta_upstream: bool,
}

pub(crate) async fn run_pipeline(
    mut update_rx: mpsc::Receiver<IoUpdate>,
    mut request_rx: mpsc::Receiver<SessionRequest>,
    io_tx: mpsc::Sender<IoCommand>,
    event_tx: mpsc::Sender<SessionEvent>,
    state_tx: watch::Sender<ConnectionState>,
    settings: PipelineSettings,
) {
    let mut pipeline = Pipeline {
        accumulator: FrameAccumulator::new(),
        config: settings.sweep,
        processor: SpectrumProcessor::new(settings.thresholds),
        delta: DeltaEncoder::new(settings.delta),
        delta_enabled: false,
        forward_delta_upstream: settings.forward_delta_upstream,
        io_tx,
        event_tx,
        state_tx,
    };

    loop {
        tokio::select! {
            update = update_rx.recv() => match update {
                Some(IoUpdate::Chunk(data)) => pipeline.handle_chunk(&data).await,
                Some(IoUpdate::Control(msg)) => pipeline.handle_control(msg).await,
                Some(IoUpdate::Closed { reason }) => {
                    if let Some(message) = reason {
                        let _ = pipeline.event_tx.send(SessionEvent::Error {
                            source: "transport".into(),
                            message,
                        }).await;
                    }
                    pipeline.teardown().await;
                    break;
                }
                None => {
                    pipeline.teardown().await;
                    break;
                }
            },

            request = request_rx.recv() => match request {
                Some(request) => {
                    if !pipeline.handle_request(request).await {
                        break;
                    }
                }
                None => {
                    // Session handle dropped; treat as a disconnect
                    let _ = pipeline.io_tx.send(IoCommand::Shutdown).await;
                    pipeline.teardown().await;
                    break;
                }
            }
        }
    }

    debug!("processing pipeline ended");
}

struct Pipeline {
    accumulator: FrameAccumulator,
    config: SweepConfig,
    processor: SpectrumProcessor,
    delta: DeltaEncoder,
    delta_enabled: bool,
    forward_delta_upstream: bool,
    io_tx: mpsc::Sender<IoCommand>,
    event_tx: mpsc::Sender<SessionEvent>,
    state_tx: watch::Sender<ConnectionState>,
}

impl Pipeline {
    async fn set_state(&mut self, state: ConnectionState) {
        if *self.state_tx.borrow() == state {
            return;
        }
        let _ = self.state_tx.send(state);
        let _ = self
            .event_tx
            .send(SessionEvent::Connection(state))
            .await;
    }

    /// The accumulator belongs to exactly one transport; clear it so a
    /// reconnect never sees stale bytes
    async fn teardown(&mut self) {
        self.accumulator.clear();
        self.set_state(ConnectionState::Disconnected).await;
    }

    async fn handle_chunk(&mut self, data: &[u8]) {
        for frame in self.accumulator.feed(data) {
            match decode_frame(&frame) {
                Ok(DeviceMessage::Sweep(sweep)) => {
                    let samples = assemble_sweep(&sweep, &self.config);
                    self.process_samples(samples).await;
                }
                Ok(DeviceMessage::Config(update)) => {
                    let before = self.config;
                    self.config.apply(update);
                    if self.config != before {
                        self.range_changed().await;
                    }
                }
                Ok(DeviceMessage::Response(text)) => debug!("device response: {}", text),
                // One bad frame must never halt continuous monitoring
                Err(e) => warn!("dropping undecodable frame: {}", e),
            }
        }
    }

    async fn process_samples(&mut self, samples: Vec<SpectrumSample>) {
        if samples.is_empty() {
            return;
        }

        let timestamp_ms = now_ms();
        let snapshot = self.processor.process(samples, timestamp_ms);
        let delta_frame = self
            .delta_enabled
            .then(|| self.delta.encode(&snapshot.samples, timestamp_ms));

        let _ = self.event_tx.send(SessionEvent::Snapshot(snapshot)).await;
        for event in self.processor.drain_events() {
            let _ = self.event_tx.send(SessionEvent::Log(event)).await;
        }
        if let Some(frame) = delta_frame {
            let _ = self.event_tx.send(SessionEvent::Delta(frame)).await;
        }
    }

    async fn range_changed(&mut self) {
        info!(
            "sweep range now {:.3}-{:.3} MHz",
            self.config.start_freq_mhz, self.config.end_freq_mhz
        );
        self.delta.reset();
        let _ = self.event_tx.send(SessionEvent::Config(self.config)).await;
    }

    async fn handle_control(&mut self, msg: ControlMessage) {
        match msg {
            ControlMessage::Connection { features, config } => {
                debug!(?features, "capability announcement");
                if let Some(sweep) = config {
                    if sweep != self.config {
                        self.config = sweep;
                        self.range_changed().await;
                    }
                }
            }
            // Pre-decoded convenience path: samples skip the assembler
            ControlMessage::Sweep { data } => self.process_samples(data).await,
            ControlMessage::DeltaEncodingStatus { enabled } => {
                info!(
                    "remote delta encoding {}",
                    if enabled { "enabled" } else { "disabled" }
                );
            }
            // The far end asked us to encode (bridge/server role)
            ControlMessage::EnableDeltaEncoding { enabled, threshold } => {
                self.delta_enabled = enabled;
                self.delta.set_threshold(threshold);
                self.delta.reset();
                self.send_io(control_line(&ControlMessage::DeltaEncodingStatus {
                    enabled,
                }))
                .await;
            }
            ControlMessage::RequestBaseline => self.delta.reset(),
            ControlMessage::Command { command } => {
                self.send_io(DeviceCommand::Raw(command).encode()).await;
            }
        }
    }

    async fn handle_request(&mut self, request: SessionRequest) -> bool {
        match request {
            SessionRequest::Command(cmd) => {
                if let DeviceCommand::SetFrequencyRange { start_mhz, end_mhz } = &cmd {
                    self.config.set_range(*start_mhz, *end_mhz);
                    self.range_changed().await;
                }
                self.send_io(cmd.encode()).await;
                true
            }
            SessionRequest::EnableDelta { enabled, threshold } => {
                if self.forward_delta_upstream {
                    let msg = ControlMessage::EnableDeltaEncoding {
                        enabled,
                        threshold: threshold.unwrap_or(DEFAULT_DELTA_THRESHOLD_DB),
                    };
                    self.send_io(control_line(&msg)).await;
                } else {
                    self.delta_enabled = enabled;
                    if let Some(threshold) = threshold {
                        self.delta.set_threshold(threshold);
                    }
                    self.delta.reset();
                }
                true
            }
            SessionRequest::ResetBaseline => {
                if self.forward_delta_upstream {
                    self.send_io(control_line(&ControlMessage::RequestBaseline))
                        .await;
                } else {
                    self.delta.reset();
                }
                true
            }
            SessionRequest::ClearHold => {
                self.processor.reset_hold();
                true
            }
            SessionRequest::ClearEvents => {
                self.processor.clear_events();
                true
            }
            SessionRequest::Disconnect { done } => {
                self.set_state(ConnectionState::Closing).await;
                let _ = self.io_tx.send(IoCommand::Shutdown).await;
                self.teardown().await;
                let _ = done.send(());
                false
            }
        }
    }

    async fn send_io(&mut self, bytes: Vec<u8>) {
        if bytes.is_empty() {
            return;
        }
        if self.io_tx.send(IoCommand::Write(bytes)).await.is_err() {
            let _ = self
                .event_tx
                .send(SessionEvent::Error {
                    source: "transport".into(),
                    message: "write channel closed".into(),
                })
                .await;
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
