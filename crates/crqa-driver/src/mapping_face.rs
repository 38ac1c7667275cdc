//! Mapping face: memory-mapped access to the shared buffer plus a
//! readiness event source (poll/select) that becomes readable when the
//! Device Model asserts its completion interrupt.
//!
//! Mapping doesn't own the device the way `RegisterFace` does — this
//! models an actual mmap, which is a view onto device memory the caller
//! still drives through its own event loop. Each method therefore takes
//! the device explicitly; `MappingFace` itself only tracks readiness.

use devices::pci::PciDevice;
use platform::interrupts::msi::{MsiMessage, MsiTrigger};

use crqa_protocol::shared_buffer::{BUFFER_OFFSET, REL_ID, REL_OPCODE, REL_R, REL_SIG1, REL_SIG2};
use crqa_protocol::{shared_buffer as layout, MetricBundle, Signal, SIGNAL_LEN};

use crqa_device::CrqaDevice;

/// A mapping of the device's shared buffer into a calling process. A fresh
/// mapping always observes `ready = false` until the next interrupt.
pub struct MappingFace {
    ready: bool,
}

impl MappingFace {
    pub fn map() -> Self {
        Self { ready: false }
    }

    pub fn poll_ready(&self) -> bool {
        self.ready
    }

    /// Copies `R`, `opcode`, `id`, and both signals into the shared buffer.
    /// Must happen before the trigger write (§5 ordering guarantee); callers
    /// crossing a real memory mapping need a barrier here too, which this
    /// in-process model doesn't need to express.
    pub fn write_request(
        &mut self,
        device: &mut CrqaDevice,
        r: f64,
        opcode: u32,
        id: u64,
        sig1: &Signal,
        sig2: &Signal,
    ) {
        device.write(BUFFER_OFFSET + REL_R as u64, 8, r.to_bits());
        device.write(BUFFER_OFFSET + REL_OPCODE as u64, 4, opcode as u64);
        device.write(BUFFER_OFFSET + REL_ID as u64, 8, id);
        for (i, sample) in sig1.iter().enumerate() {
            device.write(
                BUFFER_OFFSET + (REL_SIG1 + i * 8) as u64,
                8,
                sample.to_bits(),
            );
        }
        for (i, sample) in sig2.iter().enumerate() {
            device.write(
                BUFFER_OFFSET + (REL_SIG2 + i * 8) as u64,
                8,
                sample.to_bits(),
            );
        }
        self.ready = false;
    }

    pub fn trigger(&mut self, device: &mut CrqaDevice) {
        device.write(
            layout::TRIGGER_REG_OFFSET,
            layout::TRIGGER_REG_WIDTH,
            layout::TRIGGER_MAGIC,
        );
    }

    pub fn read_id(&self, device: &mut CrqaDevice) -> u64 {
        device.read(BUFFER_OFFSET + REL_ID as u64, 8)
    }

    pub fn read_metrics(&self, device: &mut CrqaDevice) -> MetricBundle {
        let mut values = [0.0; 8];
        for (i, slot) in values.iter_mut().enumerate() {
            let off = BUFFER_OFFSET + (layout::REL_METRICS + i * 8) as u64;
            *slot = f64::from_bits(device.read(off, 8));
        }
        MetricBundle::from_array(values)
    }
}

impl MsiTrigger for MappingFace {
    fn trigger_msi(&mut self, _message: MsiMessage) {
        self.ready = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devices::pci::COMMAND_MEMORY_SPACE;

    #[test]
    fn fresh_mapping_is_never_ready() {
        let mapping = MappingFace::map();
        assert!(!mapping.poll_ready());
    }

    #[test]
    fn stale_trigger_leaves_buffer_unobserved_as_ready() {
        let mut device = CrqaDevice::new("/tmp/crqa-mapping-face-tests.sock");
        device.config_mut().set_command(COMMAND_MEMORY_SPACE);
        let mut mapping = MappingFace::map();

        let sig = [0.0; SIGNAL_LEN];
        mapping.write_request(&mut device, 0.15, 1, 999, &sig, &sig);
        mapping.trigger(&mut device);

        assert!(!mapping.poll_ready());
        device.pump_interrupts(&mut mapping);
        assert!(!mapping.poll_ready());
    }
}
