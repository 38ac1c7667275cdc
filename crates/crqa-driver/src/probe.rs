//! Probe order: enable device, reserve region, register character device,
//! create device node, then (mapping face only) enable MSI and install the
//! handler. This crate models only the identity check and ordering
//! contract; the surrounding bus/VFS machinery belongs to the OS.

use devices::pci::{ConfigSpace, COMMAND_MEMORY_SPACE};
use thiserror::Error;

use crqa_protocol::constants::{DEVICE_ID, VENDOR_ID};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("vendor/device id mismatch: expected {0:04x}:{1:04x}, got {2:04x}:{3:04x}")]
    IdentityMismatch(u16, u16, u16, u16),
}

/// Binds to a device only if its (vendor, device) identity matches, then
/// enables Memory Space so subsequent region access (reserve region) is
/// valid.
pub fn probe(config: &mut ConfigSpace) -> Result<(), ProbeError> {
    if config.vendor_id() != VENDOR_ID || config.device_id() != DEVICE_ID {
        return Err(ProbeError::IdentityMismatch(
            VENDOR_ID,
            DEVICE_ID,
            config.vendor_id(),
            config.device_id(),
        ));
    }
    config.set_command(config.command() | COMMAND_MEMORY_SPACE);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_rejects_foreign_identity() {
        let mut cfg = ConfigSpace::new(0xffff, 0xffff, 0, 0x40);
        assert!(probe(&mut cfg).is_err());
    }

    #[test]
    fn probe_enables_memory_space_on_match() {
        let mut cfg = ConfigSpace::new(VENDOR_ID, DEVICE_ID, 0, 0x40);
        probe(&mut cfg).unwrap();
        assert_eq!(cfg.command() & COMMAND_MEMORY_SPACE, COMMAND_MEMORY_SPACE);
    }
}
