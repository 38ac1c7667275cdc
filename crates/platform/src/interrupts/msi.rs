//! Message-signalled interrupt types.

/// A fully-resolved MSI: an address to write `data` to. Vector 0 is the only
/// vector this accelerator ever uses (§4.3.2 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsiMessage {
    address: u64,
    data: u32,
    vector: u8,
}

impl MsiMessage {
    pub fn new(address: u64, data: u32, vector: u8) -> Self {
        Self {
            address,
            data,
            vector,
        }
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn data(&self) -> u32 {
        self.data
    }

    pub fn vector(&self) -> u8 {
        self.vector
    }
}

/// Implemented by whatever actually owns the bus and can deliver an MSI
/// (in a real emulator: a write to guest physical memory at `address`
/// carrying `data`; in tests: a recorder).
pub trait MsiTrigger {
    fn trigger_msi(&mut self, message: MsiMessage);
}
