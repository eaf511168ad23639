//! Device command encoding
//!
//! The device accepts ASCII commands terminated by CR-LF. Frequency
//! ranges travel as a 7-digit zero-padded start and span, both in kHz.
//! Encoding is pure string construction; no state is involved.

/// A control operation for the analyzer
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// Ask the device to report its current configuration: `#0C0`
    RequestConfig,
    /// Set the sweep range: `#0C2-F:SSSSSSS,WWWWWWW` (start/span kHz)
    SetFrequencyRange {
        /// New start frequency in MHz
        start_mhz: f64,
        /// New end frequency in MHz
        end_mhz: f64,
    },
    /// Enter continuous sweep mode: `#0C3`
    StartSweep,
    /// Hold (stop sweeping): `#0CH`
    StopSweep,
    /// Pass an already formed command string through unchanged
    Raw(String),
}

impl DeviceCommand {
    /// Encode this command to its wire bytes, CR-LF included
    pub fn encode(&self) -> Vec<u8> {
        let cmd = match self {
            DeviceCommand::RequestConfig => "#0C0".to_string(),
            DeviceCommand::SetFrequencyRange { start_mhz, end_mhz } => {
                let start_khz = (start_mhz * 1000.0).round() as u32;
                let span_khz = ((end_mhz - start_mhz) * 1000.0).round() as u32;
                format!("#0C2-F:{:07},{:07}", start_khz, span_khz)
            }
            DeviceCommand::StartSweep => "#0C3".to_string(),
            DeviceCommand::StopSweep => "#0CH".to_string(),
            DeviceCommand::Raw(s) => s.clone(),
        };
        format!("{}\r\n", cmd).into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_request_config() {
        assert_eq!(DeviceCommand::RequestConfig.encode(), b"#0C0\r\n");
    }

    #[test]
    fn test_encode_start_stop() {
        assert_eq!(DeviceCommand::StartSweep.encode(), b"#0C3\r\n");
        assert_eq!(DeviceCommand::StopSweep.encode(), b"#0CH\r\n");
    }

    #[test]
    fn test_encode_frequency_range() {
        let cmd = DeviceCommand::SetFrequencyRange {
            start_mhz: 1990.0,
            end_mhz: 6000.0,
        };
        assert_eq!(cmd.encode(), b"#0C2-F:1990000,4010000\r\n");
    }

    #[test]
    fn test_encode_zero_pads_khz_fields() {
        let cmd = DeviceCommand::SetFrequencyRange {
            start_mhz: 88.0,
            end_mhz: 108.0,
        };
        assert_eq!(cmd.encode(), b"#0C2-F:0088000,0020000\r\n");
    }

    #[test]
    fn test_encode_rounds_fractional_khz() {
        let cmd = DeviceCommand::SetFrequencyRange {
            start_mhz: 433.92,
            end_mhz: 434.79,
        };
        assert_eq!(cmd.encode(), b"#0C2-F:0433920,0000870\r\n");
    }

    #[test]
    fn test_encode_raw_passthrough() {
        assert_eq!(DeviceCommand::Raw("#0C0".into()).encode(), b"#0C0\r\n");
    }
}
