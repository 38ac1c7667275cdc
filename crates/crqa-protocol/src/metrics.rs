/// The eight-metric CRQA result, always in this order. `epsilon` is
/// aliased to `determinism` by the reference Kernel; this struct does not
/// enforce that, it just carries whatever the Kernel produced.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricBundle {
    pub epsilon: f64,
    pub recurrence_rate: f64,
    pub determinism: f64,
    pub laminarity: f64,
    pub trapping_time: f64,
    pub max_diag_line: f64,
    pub divergence: f64,
    pub entropy: f64,
}

impl MetricBundle {
    pub const ZERO: Self = Self {
        epsilon: 0.0,
        recurrence_rate: 0.0,
        determinism: 0.0,
        laminarity: 0.0,
        trapping_time: 0.0,
        max_diag_line: 0.0,
        divergence: 0.0,
        entropy: 0.0,
    };

    /// Flattens the bundle to the eight-element array order used by the
    /// register-mode metric window and the shared-buffer `metrics` region.
    pub fn as_array(&self) -> [f64; 8] {
        [
            self.epsilon,
            self.recurrence_rate,
            self.determinism,
            self.laminarity,
            self.trapping_time,
            self.max_diag_line,
            self.divergence,
            self.entropy,
        ]
    }

    pub fn from_array(values: [f64; 8]) -> Self {
        Self {
            epsilon: values[0],
            recurrence_rate: values[1],
            determinism: values[2],
            laminarity: values[3],
            trapping_time: values[4],
            max_diag_line: values[5],
            divergence: values[6],
            entropy: values[7],
        }
    }
}
