//! PCI device lookup
//!
//! Finds the BC_EMU carrier card by its configured vendor:device pair,
//! scanning PCIe sysfs at runtime.

use crate::error::{FeederError, Result};
use std::path::Path;

/// A vendor:device pair, e.g. `10ee:903f`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PciId {
    /// PCI vendor ID
    pub vendor: u16,
    /// PCI device ID
    pub device: u16,
}

impl PciId {
    /// Parse a `vendor:device` hex pair.
    ///
    /// # Errors
    ///
    /// Returns `FeederError::Config` if the string is not two hex values
    /// separated by a colon.
    pub fn parse(s: &str) -> Result<Self> {
        let (vendor, device) = s
            .split_once(':')
            .ok_or_else(|| FeederError::config(format!("invalid pci_device \"{s}\" (expected vendor:device)")))?;

        let parse_hex = |v: &str| {
            u16::from_str_radix(v.trim().trim_start_matches("0x"), 16)
                .map_err(|e| FeederError::config(format!("invalid pci_device \"{s}\": {e}")))
        };

        Ok(Self {
            vendor: parse_hex(vendor)?,
            device: parse_hex(device)?,
        })
    }
}

impl std::fmt::Display for PciId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor, self.device)
    }
}

/// Find the PCIe address of the first device matching `id`.
///
/// Scans `/sys/bus/pci/devices`, sorting matches for a stable pick when
/// more than one card is present.
///
/// # Errors
///
/// Returns `FeederError::DeviceNotFound` if no device matches, or a
/// hardware error if sysfs cannot be read.
pub fn find_device(id: PciId) -> Result<String> {
    let pci_devices_path = Path::new("/sys/bus/pci/devices");

    let entries = std::fs::read_dir(pci_devices_path)
        .map_err(|e| FeederError::hardware(format!("cannot read PCIe devices: {e}")))?;

    let mut matches = Vec::new();

    for entry in entries.flatten() {
        let path = entry.path();

        let vendor = read_hex_sysfs(&path.join("vendor")).ok();
        let device = read_hex_sysfs(&path.join("device")).ok();

        if vendor == Some(id.vendor) && device == Some(id.device) {
            matches.push(entry.file_name().to_string_lossy().to_string());
        }
    }

    matches.sort();

    match matches.first() {
        Some(addr) => {
            tracing::info!("Found {id} at {addr}");
            Ok(addr.clone())
        }
        None => Err(FeederError::DeviceNotFound {
            device: id.to_string(),
        }),
    }
}

/// Ensure the device's memory space is enabled before mapping a BAR.
///
/// # Errors
///
/// Returns a hardware error if the enable state cannot be read, or the
/// device is disabled and cannot be enabled (usually a permissions issue).
pub fn ensure_enabled(pcie_address: &str) -> Result<()> {
    let enable_path = format!("/sys/bus/pci/devices/{pcie_address}/enable");

    match std::fs::read_to_string(&enable_path) {
        Ok(content) if content.trim() != "0" => {
            tracing::debug!("Device {pcie_address} already enabled");
            Ok(())
        }
        Ok(_) => match std::fs::write(&enable_path, "1") {
            Ok(()) => {
                tracing::info!("Enabled device {pcie_address}");
                Ok(())
            }
            Err(e) => Err(FeederError::hardware(format!(
                "device {pcie_address} not enabled and cannot enable (need root?): {e}"
            ))),
        },
        Err(e) => Err(FeederError::hardware(format!(
            "cannot check enable state of {pcie_address}: {e}"
        ))),
    }
}

fn read_hex_sysfs(path: &Path) -> Result<u16> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| FeederError::hardware(format!("cannot read {}: {e}", path.display())))?;

    let trimmed = content.trim().trim_start_matches("0x");

    u16::from_str_radix(trimmed, 16)
        .map_err(|e| FeederError::hardware(format!("invalid hex in {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pci_id_parses_plain_and_prefixed_hex() {
        let id = PciId::parse("10ee:903f").unwrap();
        assert_eq!(id, PciId { vendor: 0x10ee, device: 0x903f });

        let id = PciId::parse("0x10ee:0x903f").unwrap();
        assert_eq!(id.vendor, 0x10ee);
        assert_eq!(id.to_string(), "10ee:903f");
    }

    #[test]
    fn pci_id_rejects_garbage() {
        assert!(PciId::parse("10ee903f").is_err());
        assert!(PciId::parse("xx:yy").is_err());
        assert!(PciId::parse("").is_err());
    }
}
