//! Register face: an `ioctl`-style command surface over the register
//! window, one command per offset in §4.3.1.

use devices::pci::PciDevice;
use crqa_protocol::registers;

use crqa_device::CrqaDevice;

/// Mirrors the driver's `IOCTL_SET_*`/`IOCTL_GET_*` command set; each
/// command transfers exactly one `i32` or `f64` payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IoctlCommand {
    SetR(f64),
    SetSig1Index(u32),
    SetSig1Value(f64),
    SetSig2Index(u32),
    SetSig2Value(f64),
    SetOpcode(u32),
    GetEpsilon,
    GetRecurrenceRate,
    GetDeterminism,
    GetLaminarity,
    GetTrappingTime,
    GetMaxDiagLine,
    GetDivergence,
    GetEntropy,
}

/// Wraps a bound device, exposing the ioctl-style surface. Every `Get*`
/// command beyond `GetEpsilon` reads the last stored value with no
/// re-trigger; `GetEpsilon` is the trigger itself.
pub struct RegisterFace<'a> {
    device: &'a mut CrqaDevice,
}

impl<'a> RegisterFace<'a> {
    pub fn new(device: &'a mut CrqaDevice) -> Self {
        Self { device }
    }

    pub fn dispatch(&mut self, command: IoctlCommand) -> f64 {
        match command {
            IoctlCommand::SetR(r) => {
                self.device.write(registers::OFFSET_R, 8, r.to_bits());
                0.0
            }
            IoctlCommand::SetSig1Index(idx) => {
                self.device
                    .write(registers::OFFSET_SIG1_INDEX, 4, idx as u64);
                0.0
            }
            IoctlCommand::SetSig1Value(v) => {
                self.device
                    .write(registers::OFFSET_SIG1_VALUE, 8, v.to_bits());
                0.0
            }
            IoctlCommand::SetSig2Index(idx) => {
                self.device
                    .write(registers::OFFSET_SIG2_INDEX, 4, idx as u64);
                0.0
            }
            IoctlCommand::SetSig2Value(v) => {
                self.device
                    .write(registers::OFFSET_SIG2_VALUE, 8, v.to_bits());
                0.0
            }
            IoctlCommand::SetOpcode(opcode) => {
                self.device
                    .write(registers::OFFSET_OPCODE, 4, opcode as u64);
                0.0
            }
            IoctlCommand::GetEpsilon => {
                f64::from_bits(self.device.read(registers::OFFSET_TRIGGER, 8))
            }
            IoctlCommand::GetRecurrenceRate => self.read_metric(registers::OFFSET_RECURRENCE_RATE),
            IoctlCommand::GetDeterminism => self.read_metric(registers::OFFSET_DETERMINISM),
            IoctlCommand::GetLaminarity => self.read_metric(registers::OFFSET_LAMINARITY),
            IoctlCommand::GetTrappingTime => self.read_metric(registers::OFFSET_TRAPPING_TIME),
            IoctlCommand::GetMaxDiagLine => self.read_metric(registers::OFFSET_MAX_DIAG_LINE),
            IoctlCommand::GetDivergence => self.read_metric(registers::OFFSET_DIVERGENCE),
            IoctlCommand::GetEntropy => self.read_metric(registers::OFFSET_ENTROPY),
        }
    }

    fn read_metric(&mut self, offset: u64) -> f64 {
        f64::from_bits(self.device.read(offset, 8))
    }
}
