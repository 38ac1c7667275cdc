pub mod config;
pub mod msi;

pub use config::ConfigSpace;
pub use msi::MsiCapability;

use platform::interrupts::msi::MsiMessage;

/// Command register bit 1: Memory Space Enable. BAR decoding — both the
/// register window and the shared buffer — is gated on this bit, mirroring
/// real PCI hardware.
pub const COMMAND_MEMORY_SPACE: u16 = 0x0002;

/// A conventional PCI function exposing exactly one memory BAR.
///
/// Implementors provide the BAR0 region's own read/write; this trait
/// supplies the Memory Space Enable gate that sits in front of it: with
/// decoding disabled, 4-byte reads return `0xFFFF_FFFF` and 8-byte reads
/// return `u64::MAX`; writes are dropped silently.
pub trait PciDevice {
    fn config(&self) -> &ConfigSpace;
    fn config_mut(&mut self) -> &mut ConfigSpace;

    /// BAR0-relative read; only called when Memory Space Enable is set.
    fn bar0_read(&mut self, offset: u64, size: u32) -> u64;

    /// BAR0-relative write; only called when Memory Space Enable is set.
    fn bar0_write(&mut self, offset: u64, size: u32, val: u64);

    fn read(&mut self, addr: u64, size: u32) -> u64 {
        if self.config().command() & COMMAND_MEMORY_SPACE == 0 {
            return floating_high(size);
        }
        self.bar0_read(addr, size)
    }

    fn write(&mut self, addr: u64, size: u32, val: u64) {
        if self.config().command() & COMMAND_MEMORY_SPACE == 0 {
            return;
        }
        self.bar0_write(addr, size, val);
    }
}

fn floating_high(size: u32) -> u64 {
    match size {
        1 => 0xFF,
        2 => 0xFFFF,
        4 => 0xFFFF_FFFF,
        _ => u64::MAX,
    }
}

/// Builds the MSI message a device should deliver for `vector`, given its
/// MSI capability state. Returns `None` if MSI is not enabled.
pub fn msi_message(cfg: &ConfigSpace, cap: &MsiCapability, vector: u8) -> Option<MsiMessage> {
    if !cap.is_enabled(cfg) {
        return None;
    }
    Some(cap.message(cfg, vector))
}
