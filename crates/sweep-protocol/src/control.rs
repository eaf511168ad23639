//! Remote-channel control messages
//!
//! A socket session carries JSON text messages alongside the binary frame
//! stream, one object per line, discriminated by a `"type"` field:
//!
//! - `{"type":"enable_delta_encoding","enabled":true,"threshold":1.0}`
//! - `{"type":"sweep","data":[{"frequency":...,"amplitude":...},...]}`
//! - `{"type":"connection","features":["delta_encoding"]}`
//! - `{"type":"delta_encoding_status","enabled":true}`
//! - `{"type":"request_baseline"}`
//! - `{"type":"command","command":"#0C0"}`

use serde::{Deserialize, Serialize};

use crate::sweep::{SpectrumSample, SweepConfig};

/// Name advertised by peers that can delta-encode sweeps
pub const FEATURE_DELTA_ENCODING: &str = "delta_encoding";

fn default_delta_threshold() -> f32 {
    1.0
}

/// A JSON control message on the remote channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Client asks the server to switch sweep delivery to sparse deltas
    EnableDeltaEncoding {
        /// Turn delta encoding on or off
        enabled: bool,
        /// Minimum amplitude change worth transmitting, in dB
        #[serde(default = "default_delta_threshold")]
        threshold: f32,
    },

    /// Pre-decoded sweep pushed by the server as a convenience path
    Sweep {
        /// Fully assembled samples, ascending by frequency
        data: Vec<SpectrumSample>,
    },

    /// Capability announcement the server sends once on connect
    Connection {
        /// Supported optional features
        features: Vec<String>,
        /// Active device configuration, when the server knows it
        #[serde(default, skip_serializing_if = "Option::is_none")]
        config: Option<SweepConfig>,
    },

    /// Acknowledgement for [`ControlMessage::EnableDeltaEncoding`]
    DeltaEncodingStatus {
        /// Whether delta encoding is now active
        enabled: bool,
    },

    /// Client asks the server to recapture its delta baseline
    RequestBaseline,

    /// Raw device command forwarded verbatim by the server
    Command {
        /// Command string without the CR-LF terminator
        command: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_delta_round_trip() {
        let msg = ControlMessage::EnableDeltaEncoding {
            enabled: true,
            threshold: 2.5,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"enable_delta_encoding\""));

        let back: ControlMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_enable_delta_threshold_defaults() {
        let msg: ControlMessage =
            serde_json::from_str(r#"{"type":"enable_delta_encoding","enabled":false}"#).unwrap();
        assert_eq!(
            msg,
            ControlMessage::EnableDeltaEncoding {
                enabled: false,
                threshold: 1.0,
            }
        );
    }

    #[test]
    fn test_connection_announcement() {
        let msg: ControlMessage = serde_json::from_str(
            r#"{"type":"connection","features":["delta_encoding"]}"#,
        )
        .unwrap();

        match msg {
            ControlMessage::Connection { features, config } => {
                assert_eq!(features, vec![FEATURE_DELTA_ENCODING.to_string()]);
                assert!(config.is_none());
            }
            other => panic!("expected connection, got {:?}", other),
        }
    }

    #[test]
    fn test_sweep_data_field_names() {
        let msg = ControlMessage::Sweep {
            data: vec![SpectrumSample {
                frequency_mhz: 2450.0,
                amplitude_dbm: -61.5,
            }],
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"frequency\":2450.0"));
        assert!(json.contains("\"amplitude\":-61.5"));
    }

    #[test]
    fn test_request_baseline_is_bare() {
        let json = serde_json::to_string(&ControlMessage::RequestBaseline).unwrap();
        assert_eq!(json, r#"{"type":"request_baseline"}"#);
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let result: Result<ControlMessage, _> =
            serde_json::from_str(r#"{"type":"geolocate","lat":0}"#);
        assert!(result.is_err());
    }
}
