//! Remote socket session support
//!
//! A remote session carries the same binary frame stream as the serial
//! channel, with JSON control messages riding alongside as
//! newline-terminated text lines. [`RemoteDemux`] splits the two apart:
//! a complete line starting with `{` that parses as a known control
//! message is consumed as control traffic, everything else passes through
//! to the frame accumulator untouched and in order.
//!
//! The server opens every connection with a capability announcement
//! (`{"type":"connection",...}`); [`await_announcement`] blocks the
//! connect until it arrives so a session is never `Open` without knowing
//! what the far end supports.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

use crate::error::TransportError;
use sweep_protocol::{ControlMessage, SweepConfig};

/// A control line longer than this is assumed to be binary that merely
/// started with a brace byte, and is released to the frame stream
const MAX_CONTROL_LINE: usize = 4096;

/// How long the server gets to announce itself after TCP connect
pub(crate) const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Splits a remote byte stream into control messages and device bytes
#[derive(Debug, Default)]
pub(crate) struct RemoteDemux {
    pending: Vec<u8>,
}

impl RemoteDemux {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns parsed control messages and passthrough
    /// binary bytes, each in arrival order
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> (Vec<ControlMessage>, Vec<u8>) {
        self.pending.extend_from_slice(chunk);

        let mut controls = Vec::new();
        let mut binary = Vec::new();

        loop {
            let Some(&first) = self.pending.first() else {
                break;
            };

            if first != b'{' {
                // Everything up to the next brace is device bytes
                let run = self
                    .pending
                    .iter()
                    .position(|&b| b == b'{')
                    .unwrap_or(self.pending.len());
                binary.extend(self.pending.drain(..run));
                continue;
            }

            match self.pending.iter().position(|&b| b == b'\n') {
                Some(eol) => {
                    let line: Vec<u8> = self.pending.drain(..=eol).collect();
                    match serde_json::from_slice::<ControlMessage>(&line) {
                        Ok(msg) => controls.push(msg),
                        Err(e) => {
                            // A brace that was never a control line; let the
                            // frame scanner deal with it
                            debug!("non-control line passed through: {}", e);
                            binary.extend(line);
                        }
                    }
                }
                None if self.pending.len() > MAX_CONTROL_LINE => {
                    binary.append(&mut self.pending);
                }
                None => break,
            }
        }

        (controls, binary)
    }
}

/// Encode a control message as one JSON line
pub(crate) fn control_line(msg: &ControlMessage) -> Vec<u8> {
    match serde_json::to_vec(msg) {
        Ok(mut line) => {
            line.push(b'\n');
            line
        }
        Err(e) => {
            warn!("failed to encode control message: {}", e);
            Vec::new()
        }
    }
}

/// What the server told us during the handshake
pub(crate) struct Handshake {
    /// Advertised optional features
    pub features: Vec<String>,
    /// Device configuration, if the server already knows it
    pub config: Option<SweepConfig>,
    /// Device bytes that arrived before or with the announcement
    pub leftover: Vec<u8>,
    /// Control messages that followed the announcement in the same read
    pub pending: Vec<ControlMessage>,
    /// The demux, retaining any partially received line
    pub demux: RemoteDemux,
}

/// Read from the stream until the capability announcement arrives
pub(crate) async fn await_announcement<S>(
    stream: &mut S,
    timeout: Duration,
) -> Result<Handshake, TransportError>
where
    S: AsyncRead + Unpin,
{
    let mut demux = RemoteDemux::new();
    let mut leftover = Vec::new();
    let deadline = tokio::time::Instant::now() + timeout;
    let mut buf = [0u8; 1024];

    loop {
        let n = tokio::time::timeout_at(deadline, stream.read(&mut buf))
            .await
            .map_err(|_| {
                TransportError::Handshake("timed out waiting for capability announcement".into())
            })?
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        if n == 0 {
            return Err(TransportError::Handshake(
                "connection closed during handshake".into(),
            ));
        }

        let (controls, binary) = demux.feed(&buf[..n]);
        leftover.extend(binary);

        let mut controls = controls.into_iter();
        for msg in controls.by_ref() {
            if let ControlMessage::Connection { features, config } = msg {
                info!(?features, "remote session established");
                return Ok(Handshake {
                    features,
                    config,
                    leftover,
                    pending: controls.collect(),
                    demux,
                });
            }
            debug!("ignoring pre-handshake control message: {:?}", msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_line_is_extracted() {
        let mut demux = RemoteDemux::new();
        let (controls, binary) =
            demux.feed(b"{\"type\":\"delta_encoding_status\",\"enabled\":true}\n");

        assert_eq!(
            controls,
            vec![ControlMessage::DeltaEncodingStatus { enabled: true }]
        );
        assert!(binary.is_empty());
    }

    #[test]
    fn test_binary_passes_through_untouched() {
        let mut demux = RemoteDemux::new();
        let (controls, binary) = demux.feed(b"$S\x02\x10\x20\n");

        assert!(controls.is_empty());
        assert_eq!(binary, b"$S\x02\x10\x20\n");
    }

    #[test]
    fn test_control_line_split_across_chunks() {
        let mut demux = RemoteDemux::new();

        let (controls, binary) = demux.feed(b"{\"type\":\"request_");
        assert!(controls.is_empty());
        assert!(binary.is_empty());

        let (controls, binary) = demux.feed(b"baseline\"}\n$S");
        assert_eq!(controls, vec![ControlMessage::RequestBaseline]);
        assert_eq!(binary, b"$S");
    }

    #[test]
    fn test_interleaved_binary_and_control() {
        let mut demux = RemoteDemux::new();
        let mut stream = Vec::new();
        stream.extend_from_slice(b"$S\x01\x42\n");
        stream.extend_from_slice(b"{\"type\":\"delta_encoding_status\",\"enabled\":false}\n");
        stream.extend_from_slice(b"$S\x01\x43\n");

        let (controls, binary) = demux.feed(&stream);
        assert_eq!(controls.len(), 1);
        assert_eq!(binary, b"$S\x01\x42\n$S\x01\x43\n");
    }

    #[test]
    fn test_unparseable_line_is_released_as_binary() {
        let mut demux = RemoteDemux::new();
        let (controls, binary) = demux.feed(b"{not json at all\n");

        assert!(controls.is_empty());
        assert_eq!(binary, b"{not json at all\n");
    }

    #[tokio::test]
    async fn test_handshake_finds_announcement() {
        let mut stream = std::io::Cursor::new(
            b"{\"type\":\"connection\",\"features\":[\"delta_encoding\"]}\n$S\x01\x42\n".to_vec(),
        );

        let handshake = await_announcement(&mut stream, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(handshake.features, vec!["delta_encoding".to_string()]);
        assert_eq!(handshake.leftover, b"$S\x01\x42\n");
    }

    #[tokio::test]
    async fn test_handshake_fails_on_eof() {
        let mut stream = std::io::Cursor::new(Vec::new());
        let result = await_announcement(&mut stream, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(TransportError::Handshake(_))));
    }
}
