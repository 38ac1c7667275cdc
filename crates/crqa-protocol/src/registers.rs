//! Register-mode (per-field programming) MMIO offsets, byte-addressed,
//! little-endian, relative to the start of the device's register window.

/// Magic identity word, read-only.
pub const OFFSET_MAGIC: u64 = 0x00;
/// `R` as raw f64 bits, write-only.
pub const OFFSET_R: u64 = 0x08;
/// `sig1_index`, write-only; values `>= 512` are silently dropped.
pub const OFFSET_SIG1_INDEX: u64 = 0x18;
/// `sig1[sig1_index]` as raw f64 bits, write-only; non-finite values ignored.
pub const OFFSET_SIG1_VALUE: u64 = 0x20;
/// `sig2_index`, write-only.
pub const OFFSET_SIG2_INDEX: u64 = 0x28;
/// `sig2[sig2_index]` as raw f64 bits, write-only.
pub const OFFSET_SIG2_VALUE: u64 = 0x30;
/// `opcode`, write-only; recomputes `data_ready` on write.
pub const OFFSET_OPCODE: u64 = 0x38;
/// Compute trigger, read-only; returns `epsilon`.
pub const OFFSET_TRIGGER: u64 = 0x40;

/// The seven metrics beyond `epsilon`, each an 8-byte read-only register,
/// in §3 order starting at `recurrence_rate`.
pub const OFFSET_RECURRENCE_RATE: u64 = 0x48;
pub const OFFSET_DETERMINISM: u64 = 0x50;
pub const OFFSET_LAMINARITY: u64 = 0x58;
pub const OFFSET_TRAPPING_TIME: u64 = 0x60;
pub const OFFSET_MAX_DIAG_LINE: u64 = 0x68;
pub const OFFSET_DIVERGENCE: u64 = 0x70;
pub const OFFSET_ENTROPY: u64 = 0x78;

/// Samples at or beyond this index are out of range for the register path.
pub const SIGNAL_LEN: u32 = 512;
/// Index whose write marks a signal `filled` (the last valid sample slot).
pub const FILL_INDEX: u32 = SIGNAL_LEN - 1;
