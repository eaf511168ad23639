//! Serial port enumeration
//!
//! Lists candidate ports so a caller can offer a device picker without
//! opening anything.

use serialport::{available_ports, SerialPortType};
use tracing::debug;

use crate::error::TransportError;

/// One candidate serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// OS device name, e.g. `/dev/ttyUSB0` or `COM3`
    pub name: String,
    /// USB manufacturer string, when known
    pub manufacturer: Option<String>,
    /// USB product string, when known
    pub product: Option<String>,
}

/// Enumerate serial ports visible to this process
pub fn list_ports() -> Result<Vec<PortInfo>, TransportError> {
    let ports = available_ports().map_err(|e| TransportError::NotSupported(e.description))?;

    let infos: Vec<PortInfo> = ports
        .into_iter()
        .map(|port| {
            let (manufacturer, product) = match port.port_type {
                SerialPortType::UsbPort(usb) => (usb.manufacturer, usb.product),
                _ => (None, None),
            };
            PortInfo {
                name: port.port_name,
                manufacturer,
                product,
            }
        })
        .collect();

    debug!("found {} serial ports", infos.len());
    Ok(infos)
}
