pub mod msi;

use std::collections::VecDeque;

use msi::{MsiMessage, MsiTrigger};

/// How a device model is configured to raise its completion interrupt.
///
/// The accelerator only ever uses `Msi`, but the enum exists so the delivery
/// mode reads as a property of the platform, not something a device
/// branches on per-interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformInterruptMode {
    Msi,
}

/// Defers interrupt delivery off the thread that observed completion.
///
/// §9 "Deferred interrupt delivery": MSI assertion must not happen on the
/// thread that processed the bus write or drained the wake counter — it is
/// scheduled onto the actor that owns the bus, and delivered the next time
/// that actor pumps its event loop. This queue is that scheduling point.
#[derive(Default)]
pub struct InterruptController {
    pending: VecDeque<MsiMessage>,
}

impl InterruptController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an MSI for later delivery. Does not call into `target`.
    pub fn schedule(&mut self, message: MsiMessage) {
        self.pending.push_back(message);
    }

    /// Deliver every pending MSI to `target`, in FIFO order. Called from the
    /// actor that owns the bus (the emulator's main loop, in spec terms).
    pub fn pump(&mut self, target: &mut dyn MsiTrigger) {
        while let Some(msg) = self.pending.pop_front() {
            target.trigger_msi(msg);
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<MsiMessage>>);

    impl MsiTrigger for Recorder {
        fn trigger_msi(&mut self, message: MsiMessage) {
            self.0.borrow_mut().push(message);
        }
    }

    #[test]
    fn pump_delivers_in_order_and_drains() {
        let mut ctrl = InterruptController::new();
        ctrl.schedule(MsiMessage::new(0xFEE0_0000, 0x31, 0));
        ctrl.schedule(MsiMessage::new(0xFEE0_0000, 0x31, 0));
        assert!(ctrl.has_pending());

        let mut target = Recorder::default();
        ctrl.pump(&mut target);

        assert!(!ctrl.has_pending());
        assert_eq!(target.0.borrow().len(), 2);
    }
}
