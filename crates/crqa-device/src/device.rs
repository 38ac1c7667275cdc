//! The emulated accelerator: one PCI function whose BAR0 hosts the
//! register window, the shared buffer, and the trigger register described
//! by `crqa_protocol`.

use std::thread;
use std::time::Duration;

use devices::pci::{ConfigSpace, MsiCapability, PciDevice};
use platform::interrupts::msi::MsiTrigger;
use platform::interrupts::InterruptController;

use crqa_protocol::{constants, registers, shared_buffer as buf_layout, RequestFrame};

use crate::compute_link::ComputeLink;
use crate::notify_link::NotificationLink;
use crate::shared_buffer::SharedBuffer;
use crate::state::CrqaDeviceState;

/// Config-space offset of this device's single MSI capability. Distinct
/// address space from the MMIO register offsets in `crqa_protocol`, so the
/// numeric overlap with the register trigger (`0x40`) is coincidental and
/// harmless.
const MSI_CAP_OFFSET: u8 = 0x60;

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Tracks the shared-buffer dispatch's last outcome, for the state machine
/// in §4.3.4. In the synchronous variant, a dispatch completes a full
/// `ARMED -> DISPATCHED -> SUCCESS|FAIL -> IDLE` cycle within one bus
/// write, so `Armed`/`Dispatched` are never externally observable there. In
/// the notification variant the bus write only gets as far as `Dispatched`;
/// `Success`/`Fail` land later, once [`CrqaDevice::pump_notifications`]
/// observes the wake counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPhase {
    Idle,
    Armed,
    Dispatched,
    Success,
    Fail,
    Stale,
}

/// The shared-buffer path's two coexisting, mutually exclusive transports
/// (§4.3.3): chosen once, at construction, as a static property of the
/// Device Model instance.
enum SharedDispatch {
    /// Request and response both happen inline with the triggering bus
    /// write.
    Synchronous { link: ComputeLink },
    /// The bus write only sends the request; the response is collected out
    /// of band by [`CrqaDevice::pump_notifications`].
    Notification { link: NotificationLink },
}

pub struct CrqaDevice {
    config: ConfigSpace,
    msi_cap: MsiCapability,
    interrupts: InterruptController,
    state: CrqaDeviceState,
    buffer: SharedBuffer,
    register_link: ComputeLink,
    shared: SharedDispatch,
    last_phase: TriggerPhase,
}

impl CrqaDevice {
    /// Both MMIO faces run in synchronous mode: the triggering bus access
    /// (a register-mode read of `0x40`, or a shared-buffer trigger write)
    /// blocks on the Compute Server exchange before returning.
    pub fn new(socket_path: impl AsRef<std::path::Path>) -> Self {
        let path = socket_path.as_ref();
        Self {
            config: ConfigSpace::new(constants::VENDOR_ID, constants::DEVICE_ID, 0, MSI_CAP_OFFSET),
            msi_cap: MsiCapability::at(MSI_CAP_OFFSET),
            interrupts: InterruptController::new(),
            state: CrqaDeviceState::new(),
            buffer: SharedBuffer::new(),
            register_link: ComputeLink::transient(path),
            shared: SharedDispatch::Synchronous {
                link: ComputeLink::persistent(path),
            },
            last_phase: TriggerPhase::Idle,
        }
    }

    /// The shared-buffer path runs in notification mode: a trigger write
    /// sends the Request frame and returns immediately; the response is
    /// collected later by [`CrqaDevice::pump_notifications`], driven off
    /// the wake counter (§4.3.3). The register path is unaffected — it has
    /// no notification variant in the reference implementation.
    pub fn new_with_notification(socket_path: impl AsRef<std::path::Path>) -> nix::Result<Self> {
        let path = socket_path.as_ref();
        Ok(Self {
            config: ConfigSpace::new(constants::VENDOR_ID, constants::DEVICE_ID, 0, MSI_CAP_OFFSET),
            msi_cap: MsiCapability::at(MSI_CAP_OFFSET),
            interrupts: InterruptController::new(),
            state: CrqaDeviceState::new(),
            buffer: SharedBuffer::new(),
            register_link: ComputeLink::transient(path),
            shared: SharedDispatch::Notification {
                link: NotificationLink::new(path)?,
            },
            last_phase: TriggerPhase::Idle,
        })
    }

    pub fn trigger_counter(&self) -> u64 {
        self.state.trigger_counter
    }

    pub fn last_phase(&self) -> TriggerPhase {
        self.last_phase
    }

    pub fn metrics(&self) -> crqa_protocol::MetricBundle {
        self.state.metrics
    }

    /// Drains any MSI scheduled by a completed dispatch, delivering it
    /// through `target`. Must be called from the actor that owns the bus,
    /// never inline with the bus access that scheduled it.
    pub fn pump_interrupts(&mut self, target: &mut dyn MsiTrigger) {
        self.interrupts.pump(target);
    }

    fn register_read(&mut self, offset: u64) -> u64 {
        match offset {
            registers::OFFSET_MAGIC => constants::DEVICE_MAGIC as u64,
            registers::OFFSET_TRIGGER => self.register_trigger(),
            registers::OFFSET_RECURRENCE_RATE => self.state.metrics.recurrence_rate.to_bits(),
            registers::OFFSET_DETERMINISM => self.state.metrics.determinism.to_bits(),
            registers::OFFSET_LAMINARITY => self.state.metrics.laminarity.to_bits(),
            registers::OFFSET_TRAPPING_TIME => self.state.metrics.trapping_time.to_bits(),
            registers::OFFSET_MAX_DIAG_LINE => self.state.metrics.max_diag_line.to_bits(),
            registers::OFFSET_DIVERGENCE => self.state.metrics.divergence.to_bits(),
            registers::OFFSET_ENTROPY => self.state.metrics.entropy.to_bits(),
            _ => 0,
        }
    }

    fn register_write(&mut self, offset: u64, size: u32, val: u64) {
        match offset {
            registers::OFFSET_R => self.state.r = f64::from_bits(val),
            registers::OFFSET_SIG1_INDEX => self.state.write_sig1_index(val as u32),
            registers::OFFSET_SIG1_VALUE => self.state.write_sig1_value(f64::from_bits(val)),
            registers::OFFSET_SIG2_INDEX => self.state.write_sig2_index(val as u32),
            registers::OFFSET_SIG2_VALUE => self.state.write_sig2_value(f64::from_bits(val)),
            registers::OFFSET_OPCODE => self.state.opcode = val as u32,
            _ => {
                let _ = size;
            }
        }
    }

    /// `0x40` register read: runs one synchronous exchange (no retry — the
    /// register path's historical predecessor never retried) and returns
    /// `epsilon`'s raw bits, or `0` on failure. Always sends `ready = true`:
    /// §4.3.1 says reading `0x40` always triggers an exchange, regardless of
    /// `data_ready` — the Compute Server computes on whatever `sig2` holds
    /// if the guest triggers before filling it (§8 #6). `data_ready` gates
    /// nothing on this path; it exists for the guest to poll before
    /// bothering to trigger at all.
    fn register_trigger(&mut self) -> u64 {
        let frame = RequestFrame::new(
            self.state.r,
            self.state.sig1,
            self.state.sig2,
            self.state.opcode as i32,
            true,
        );
        match self.register_link.exchange(&frame) {
            Ok(response) => {
                self.state.metrics = response.into();
                self.state.metrics.epsilon.to_bits()
            }
            Err(err) => {
                tracing::warn!(error = %err, "register-mode compute exchange failed");
                0
            }
        }
    }

    fn shared_buffer_dispatch(&mut self) {
        if self.buffer.id() != self.state.trigger_counter {
            self.last_phase = TriggerPhase::Stale;
            return;
        }

        self.last_phase = TriggerPhase::Armed;
        self.state.r = self.buffer.r();
        self.state.opcode = self.buffer.opcode();
        self.state.sig1 = self.buffer.sig1();
        self.state.sig2 = self.buffer.sig2();

        let frame = RequestFrame::new(
            self.state.r,
            self.state.sig1,
            self.state.sig2,
            self.state.opcode as i32,
            true,
        );

        match &mut self.shared {
            SharedDispatch::Synchronous { .. } => self.shared_buffer_dispatch_sync(&frame),
            SharedDispatch::Notification { .. } => self.shared_buffer_dispatch_notify(&frame),
        }
    }

    /// Synchronous variant: retries inline with the triggering bus write,
    /// up to three times, before giving up.
    fn shared_buffer_dispatch_sync(&mut self, frame: &RequestFrame) {
        let SharedDispatch::Synchronous { link } = &mut self.shared else {
            unreachable!("dispatch_sync only called in Synchronous mode");
        };

        for attempt in 0..RETRY_ATTEMPTS {
            match link.exchange(frame) {
                Ok(response) => {
                    self.state.metrics = response.into();
                    self.buffer.set_metrics(self.state.metrics.as_array());
                    self.state.trigger_counter += 1;
                    self.buffer.set_id(self.state.trigger_counter);
                    self.last_phase = TriggerPhase::Success;
                    if let Some(message) = devices::pci::msi_message(&self.config, &self.msi_cap, 0) {
                        self.interrupts.schedule(message);
                    }
                    return;
                }
                Err(err) => {
                    tracing::warn!(error = %err, attempt, "shared-buffer compute exchange failed");
                    if attempt + 1 < RETRY_ATTEMPTS {
                        thread::sleep(RETRY_DELAY);
                    }
                }
            }
        }

        self.state.trigger_counter += 1;
        self.buffer.set_id(self.state.trigger_counter);
        self.last_phase = TriggerPhase::Fail;
    }

    /// Notification variant: sends the request and returns. There is no
    /// inline retry here — retrying would mean blocking the bus write the
    /// whole point of this mode is to avoid blocking. A send failure is
    /// terminal for this request, same as an exhausted retry budget in the
    /// synchronous variant: the counter still advances so the guest never
    /// deadlocks, but `metrics` is left untouched.
    fn shared_buffer_dispatch_notify(&mut self, frame: &RequestFrame) {
        let SharedDispatch::Notification { link } = &mut self.shared else {
            unreachable!("dispatch_notify only called in Notification mode");
        };

        match link.dispatch(frame) {
            Ok(()) => self.last_phase = TriggerPhase::Dispatched,
            Err(err) => {
                tracing::warn!(error = %err, "shared-buffer notify dispatch failed");
                self.state.trigger_counter += 1;
                self.buffer.set_id(self.state.trigger_counter);
                self.last_phase = TriggerPhase::Fail;
            }
        }
    }

    /// Drains the notification-mode wake counter and, if the Compute Server
    /// has finished, completes the `DISPATCHED -> SUCCESS|FAIL -> IDLE`
    /// transition: copies the response into the shared buffer, bumps
    /// `trigger_counter`/`id`, and schedules an MSI. A no-op in synchronous
    /// mode. Must be called from the actor that owns the bus, same as
    /// [`CrqaDevice::pump_interrupts`] — it only schedules the MSI here, it
    /// never delivers it inline.
    pub fn pump_notifications(&mut self) {
        let SharedDispatch::Notification { link } = &mut self.shared else {
            return;
        };

        match link.poll_response() {
            Ok(None) => {}
            Ok(Some(response)) => {
                self.state.metrics = response.into();
                self.buffer.set_metrics(self.state.metrics.as_array());
                self.state.trigger_counter += 1;
                self.buffer.set_id(self.state.trigger_counter);
                self.last_phase = TriggerPhase::Success;
                if let Some(message) = devices::pci::msi_message(&self.config, &self.msi_cap, 0) {
                    self.interrupts.schedule(message);
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "shared-buffer notify response failed");
                self.state.trigger_counter += 1;
                self.buffer.set_id(self.state.trigger_counter);
                self.last_phase = TriggerPhase::Fail;
            }
        }
    }
}

impl PciDevice for CrqaDevice {
    fn config(&self) -> &ConfigSpace {
        &self.config
    }

    fn config_mut(&mut self) -> &mut ConfigSpace {
        &mut self.config
    }

    fn bar0_read(&mut self, offset: u64, size: u32) -> u64 {
        if offset >= buf_layout::BUFFER_OFFSET
            && offset < buf_layout::BUFFER_OFFSET + buf_layout::BUFFER_SIZE as u64
        {
            let relative = (offset - buf_layout::BUFFER_OFFSET) as usize;
            return self.buffer.read(relative, size);
        }
        self.register_read(offset)
    }

    fn bar0_write(&mut self, offset: u64, size: u32, val: u64) {
        if offset == buf_layout::TRIGGER_REG_OFFSET
            && size == buf_layout::TRIGGER_REG_WIDTH
            && val == buf_layout::TRIGGER_MAGIC
        {
            self.shared_buffer_dispatch();
            return;
        }

        if offset >= buf_layout::BUFFER_OFFSET
            && offset < buf_layout::BUFFER_OFFSET + buf_layout::BUFFER_SIZE as u64
        {
            let relative = (offset - buf_layout::BUFFER_OFFSET) as usize;
            self.buffer.write(relative, size, val);
            return;
        }

        self.register_write(offset, size, val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devices::pci::COMMAND_MEMORY_SPACE;

    fn enabled_device() -> CrqaDevice {
        let mut dev = CrqaDevice::new("/tmp/crqa-device-tests-should-not-connect.sock");
        dev.config_mut().set_command(COMMAND_MEMORY_SPACE);
        dev
    }

    #[test]
    fn magic_word_is_readable_at_offset_zero() {
        let mut dev = enabled_device();
        assert_eq!(dev.read(registers::OFFSET_MAGIC, 4), constants::DEVICE_MAGIC as u64);
    }

    #[test]
    fn register_path_out_of_range_index_is_dropped() {
        let mut dev = enabled_device();
        dev.write(registers::OFFSET_SIG1_INDEX, 4, registers::SIGNAL_LEN as u64);
        dev.write(registers::OFFSET_SIG1_VALUE, 8, 42.0f64.to_bits());
        assert_eq!(dev.state.sig1, [0.0; 512]);
    }

    #[test]
    fn register_trigger_elicits_a_response_with_sig2_unfilled() {
        use std::io::{Read, Write};
        use std::os::unix::net::UnixListener;
        use std::thread;

        // §8 #6: sig1 filled, sig2_filled still false, opcode set. The
        // trigger must still run a full exchange rather than sending
        // `ready = 0`, which the Compute Server would silently drop,
        // leaving `register_link.exchange` blocked on a response that never
        // comes.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crqa.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut req = vec![0u8; std::mem::size_of::<RequestFrame>()];
            stream.read_exact(&mut req).unwrap();
            let frame = RequestFrame::from_bytes(&req).unwrap();
            assert!(frame.is_ready(), "register trigger must always set ready");
            let response = crqa_protocol::ResponseFrame {
                epsilon: 0.5,
                recurrence_rate: 0.5,
                determinism: 0.5,
                laminarity: 0.5,
                trapping_time: 0.5,
                max_diag_line: 4.0,
                divergence: 0.25,
                entropy: 0.5,
            };
            stream.write_all(&response.to_bytes()).unwrap();
        });

        let mut dev = CrqaDevice::new(&path);
        dev.config_mut().set_command(COMMAND_MEMORY_SPACE);
        dev.write(registers::OFFSET_SIG1_INDEX, 4, registers::SIGNAL_LEN as u64 - 1);
        dev.write(registers::OFFSET_SIG1_VALUE, 8, 1.0f64.to_bits());
        dev.write(registers::OFFSET_OPCODE, 4, 1);

        assert!(!dev.state.data_ready(), "sig2 was never filled");
        let epsilon = dev.read(registers::OFFSET_TRIGGER, 8);
        assert_eq!(f64::from_bits(epsilon), 0.5);

        server.join().unwrap();
    }

    #[test]
    fn stale_shared_buffer_trigger_leaves_state_unchanged() {
        let mut dev = enabled_device();
        dev.buffer.set_id(dev.state.trigger_counter + 1);
        dev.write(
            buf_layout::TRIGGER_REG_OFFSET,
            buf_layout::TRIGGER_REG_WIDTH,
            buf_layout::TRIGGER_MAGIC,
        );
        assert_eq!(dev.trigger_counter(), 0);
        assert_eq!(dev.last_phase(), TriggerPhase::Stale);
    }

    #[test]
    fn shared_buffer_trigger_with_no_server_still_advances_counter() {
        let mut dev = enabled_device();
        dev.write(
            buf_layout::TRIGGER_REG_OFFSET,
            buf_layout::TRIGGER_REG_WIDTH,
            buf_layout::TRIGGER_MAGIC,
        );
        assert_eq!(dev.trigger_counter(), 1);
        assert_eq!(dev.last_phase(), TriggerPhase::Fail);
        assert_eq!(dev.metrics(), crqa_protocol::MetricBundle::ZERO);
    }

    #[test]
    fn memory_space_disabled_floats_high() {
        let mut dev = CrqaDevice::new("/tmp/crqa-device-tests-should-not-connect.sock");
        assert_eq!(dev.read(registers::OFFSET_MAGIC, 4), 0xFFFF_FFFF);
    }

    #[test]
    fn notification_mode_stale_trigger_never_dispatches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crqa.sock");
        let mut dev = CrqaDevice::new_with_notification(&path).unwrap();
        dev.config_mut().set_command(COMMAND_MEMORY_SPACE);

        dev.buffer.set_id(dev.state.trigger_counter + 1);
        dev.write(
            buf_layout::TRIGGER_REG_OFFSET,
            buf_layout::TRIGGER_REG_WIDTH,
            buf_layout::TRIGGER_MAGIC,
        );
        assert_eq!(dev.last_phase(), TriggerPhase::Stale);
        assert_eq!(dev.trigger_counter(), 0);
    }

    #[test]
    fn notification_mode_completes_via_pump() {
        use std::io::{Read, Write};
        use std::os::fd::AsRawFd;
        use std::os::unix::net::UnixListener;
        use std::thread;
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crqa.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let handle = crate::wake::recv_wake_handle(stream.as_raw_fd()).unwrap();
            let mut req = vec![0u8; std::mem::size_of::<RequestFrame>()];
            stream.read_exact(&mut req).unwrap();
            RequestFrame::from_bytes(&req).unwrap();
            let response = crqa_protocol::ResponseFrame {
                epsilon: 0.9,
                recurrence_rate: 0.5,
                determinism: 0.9,
                laminarity: 0.4,
                trapping_time: 2.0,
                max_diag_line: 10.0,
                divergence: 0.1,
                entropy: 1.0,
            };
            stream.write_all(&response.to_bytes()).unwrap();
            crate::wake::notify(&handle).unwrap();
        });

        let mut dev = CrqaDevice::new_with_notification(&path).unwrap();
        dev.config_mut().set_command(COMMAND_MEMORY_SPACE);
        dev.write(
            buf_layout::TRIGGER_REG_OFFSET,
            buf_layout::TRIGGER_REG_WIDTH,
            buf_layout::TRIGGER_MAGIC,
        );
        assert_eq!(dev.last_phase(), TriggerPhase::Dispatched);
        assert_eq!(dev.trigger_counter(), 0, "counter only bumps once the response lands");

        let mut completed = false;
        for _ in 0..200 {
            dev.pump_notifications();
            if dev.last_phase() == TriggerPhase::Success {
                completed = true;
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(completed, "notification should have completed by now");
        assert_eq!(dev.trigger_counter(), 1);
        assert!(dev.metrics().max_diag_line > 0.0);

        server.join().unwrap();
    }
}
