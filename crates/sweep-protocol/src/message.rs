//! Frame body decoding
//!
//! Maps a [`RawFrame`] to its decoded message. Sweep amplitudes use the
//! device's 0.5 dB encoding: an unsigned byte `r` is `-r/2` dBm, covering
//! 0 to -127.5 dBm. Config bodies are fixed-width ASCII decimals giving
//! start and span in kHz.

use crate::error::ParseError;
use crate::frame::{FrameKind, RawFrame};

/// A decoded device frame
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceMessage {
    /// One full sweep of amplitude readings
    Sweep(SweepFrame),
    /// Device configuration report
    Config(ConfigUpdate),
    /// Free-form diagnostic text
    Response(String),
}

/// Amplitude readings from a single sweep, in dBm, ascending bin order
#[derive(Debug, Clone, PartialEq)]
pub struct SweepFrame {
    /// One amplitude per frequency bin
    pub amplitudes_dbm: Vec<f32>,
}

/// Frequency range reported by a config frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfigUpdate {
    /// Sweep start frequency in MHz
    pub start_freq_mhz: f64,
    /// Sweep end frequency in MHz
    pub end_freq_mhz: f64,
}

/// Decode one raw amplitude byte to dBm
pub fn decode_amplitude(raw: u8) -> f32 {
    -(raw as f32) / 2.0
}

/// Decode a complete frame into its message
pub fn decode_frame(frame: &RawFrame) -> Result<DeviceMessage, ParseError> {
    match frame.kind {
        FrameKind::Sweep => decode_sweep(&frame.bytes).map(DeviceMessage::Sweep),
        FrameKind::Config => decode_config(&frame.bytes).map(DeviceMessage::Config),
        FrameKind::Response => Ok(DeviceMessage::Response(body_text(&frame.bytes))),
    }
}

fn decode_sweep(bytes: &[u8]) -> Result<SweepFrame, ParseError> {
    if bytes.len() < 3 {
        return Err(ParseError::InvalidFrame("sweep frame too short".into()));
    }

    let steps = bytes[2] as usize;
    if bytes.len() < 3 + steps {
        return Err(ParseError::InvalidFrame(format!(
            "sweep frame truncated: {} of {} amplitude bytes",
            bytes.len().saturating_sub(3),
            steps
        )));
    }

    let amplitudes_dbm = bytes[3..3 + steps].iter().map(|&r| decode_amplitude(r)).collect();

    Ok(SweepFrame { amplitudes_dbm })
}

fn decode_config(bytes: &[u8]) -> Result<ConfigUpdate, ParseError> {
    let body = trim_eol(&bytes[2..]);

    // Layout: 7-digit start kHz, 7-digit span kHz (format varies by
    // firmware past that point; we only need the range)
    if body.len() < 14 {
        return Err(ParseError::InvalidConfig(format!(
            "config body too short: {} bytes",
            body.len()
        )));
    }

    let start_khz = ascii_decimal(&body[0..7])?;
    let span_khz = ascii_decimal(&body[7..14])?;

    let start_freq_mhz = start_khz as f64 / 1000.0;
    Ok(ConfigUpdate {
        start_freq_mhz,
        end_freq_mhz: start_freq_mhz + span_khz as f64 / 1000.0,
    })
}

fn ascii_decimal(bytes: &[u8]) -> Result<u32, ParseError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| ParseError::InvalidConfig("non-ASCII config field".into()))?;
    text.parse::<u32>()
        .map_err(|_| ParseError::InvalidConfig(text.into()))
}

fn body_text(bytes: &[u8]) -> String {
    let body = bytes.get(2..).unwrap_or(&[]);
    String::from_utf8_lossy(trim_eol(body)).into_owned()
}

fn trim_eol(mut body: &[u8]) -> &[u8] {
    while let [rest @ .., b'\r' | b'\n'] = body {
        body = rest;
    }
    body
}
