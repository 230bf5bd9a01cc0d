//! Locate the meter among the serial ports of the host.
//!
//! The XDM1041 shows up as a plain USB-serial bridge, so the only thing
//! to match on is the bridge's USB description.

use tokio_serial::{SerialPortInfo, SerialPortType};
use tracing::debug;

use crate::proto::Result;

/// USB-serial chip used by the XDM1041/XDM1241.
pub const DEFAULT_HINT: &str = "CH340";

/// Human readable description of a port (USB product and manufacturer).
pub fn describe(info: &SerialPortInfo) -> String {
    match &info.port_type {
        SerialPortType::UsbPort(usb) => [usb.product.as_deref(), usb.manufacturer.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

/// Pick the first port whose description contains `hint`.
pub fn select_port<'a>(
    candidates: impl IntoIterator<Item = (&'a str, &'a str)>,
    hint: &str,
) -> Option<&'a str> {
    candidates
        .into_iter()
        .find(|(_, description)| description.contains(hint))
        .map(|(name, _)| name)
}

/// Search the host's serial ports for one matching `hint`.
pub fn find_port(hint: &str) -> Result<Option<String>> {
    let ports = tokio_serial::available_ports()?;
    let described: Vec<(String, String)> = ports
        .iter()
        .map(|p| (p.port_name.clone(), describe(p)))
        .collect();
    for (name, description) in &described {
        debug!(port = %name, %description, "found serial port");
    }
    Ok(select_port(
        described.iter().map(|(n, d)| (n.as_str(), d.as_str())),
        hint,
    )
    .map(str::to_string))
}

/// Port of the meter, or `fallback` when no port matches.
pub fn resolve_port(hint: &str, fallback: &str) -> Result<String> {
    match find_port(hint)? {
        Some(port) => Ok(port),
        None => {
            debug!(hint, fallback, "meter not found, using fallback port");
            Ok(fallback.to_string())
        }
    }
}
