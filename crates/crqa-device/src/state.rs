//! Device-side state shared by both MMIO faces. Register-mode writes and
//! shared-buffer writes update the same owning storage; there is exactly
//! one `sig1`/`sig2`, not two parallel copies.

use crqa_protocol::{MetricBundle, Signal, SIGNAL_LEN};

#[derive(Debug, Clone)]
pub struct CrqaDeviceState {
    pub r: f64,
    pub opcode: u32,
    pub sig1: Signal,
    pub sig2: Signal,

    /// Scratch cursors used only by the register-mode per-field path.
    pub sig1_index: u32,
    pub sig2_index: u32,
    pub sig1_filled: bool,
    pub sig2_filled: bool,

    pub metrics: MetricBundle,

    /// Monotone identifier stamping each completed shared-buffer request.
    pub trigger_counter: u64,
}

impl Default for CrqaDeviceState {
    fn default() -> Self {
        Self {
            r: 0.0,
            opcode: 0,
            sig1: [0.0; SIGNAL_LEN],
            sig2: [0.0; SIGNAL_LEN],
            sig1_index: 0,
            sig2_index: 0,
            sig1_filled: false,
            sig2_filled: false,
            metrics: MetricBundle::ZERO,
            trigger_counter: 0,
        }
    }
}

impl CrqaDeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// `data_ready = opcode != 0 && sig1_filled && sig2_filled`, recomputed
    /// whenever `opcode` or either `filled` flag changes.
    pub fn data_ready(&self) -> bool {
        self.opcode != 0 && self.sig1_filled && self.sig2_filled
    }

    pub fn write_sig1_index(&mut self, idx: u32) {
        if (idx as usize) < SIGNAL_LEN {
            self.sig1_index = idx;
        }
    }

    pub fn write_sig1_value(&mut self, value: f64) {
        if value.is_finite() && (self.sig1_index as usize) < SIGNAL_LEN {
            self.sig1[self.sig1_index as usize] = value;
            if self.sig1_index as usize == SIGNAL_LEN - 1 {
                self.sig1_filled = true;
            }
        }
    }

    pub fn write_sig2_index(&mut self, idx: u32) {
        if (idx as usize) < SIGNAL_LEN {
            self.sig2_index = idx;
        }
    }

    pub fn write_sig2_value(&mut self, value: f64) {
        if value.is_finite() && (self.sig2_index as usize) < SIGNAL_LEN {
            self.sig2[self.sig2_index as usize] = value;
            if self.sig2_index as usize == SIGNAL_LEN - 1 {
                self.sig2_filled = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_index_leaves_signal_unchanged() {
        let mut state = CrqaDeviceState::new();
        state.write_sig1_index(SIGNAL_LEN as u32);
        state.write_sig1_value(42.0);
        assert_eq!(state.sig1, [0.0; SIGNAL_LEN]);
        assert!(!state.sig1_filled);
    }

    #[test]
    fn non_finite_sample_is_ignored() {
        let mut state = CrqaDeviceState::new();
        state.write_sig1_index(3);
        state.write_sig1_value(f64::NAN);
        assert_eq!(state.sig1[3], 0.0);
    }

    #[test]
    fn filling_last_index_sets_filled_flag() {
        let mut state = CrqaDeviceState::new();
        state.write_sig1_index(SIGNAL_LEN as u32 - 1);
        state.write_sig1_value(1.0);
        assert!(state.sig1_filled);
    }

    #[test]
    fn data_ready_requires_opcode_and_both_filled() {
        let mut state = CrqaDeviceState::new();
        assert!(!state.data_ready());
        state.sig1_filled = true;
        state.sig2_filled = true;
        assert!(!state.data_ready());
        state.opcode = 7;
        assert!(state.data_ready());
    }
}
