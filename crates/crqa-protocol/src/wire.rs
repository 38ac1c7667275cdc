//! The Request/Response frames exchanged between the Device Model and the
//! Compute Server. Both are `#[repr(C)]`, tightly packed (no implicit
//! padding falls between same-alignment `f64`/`i32` fields on any platform
//! this targets), and decoded with `bytemuck` rather than a hand-rolled
//! parser.

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

pub const SIGNAL_LEN: usize = 512;

pub type Signal = [f64; SIGNAL_LEN];

/// One full CRQA request: the recurrence threshold, both signals, the
/// opaque opcode, and the `ready` gate the Compute Server checks before
/// invoking the Kernel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct RequestFrame {
    pub r: f64,
    pub sig1: Signal,
    pub sig2: Signal,
    pub opcode: i32,
    pub ready: i32,
}

pub const REQUEST_FRAME_SIZE: usize = std::mem::size_of::<RequestFrame>();

impl RequestFrame {
    pub fn new(r: f64, sig1: Signal, sig2: Signal, opcode: i32, ready: bool) -> Self {
        Self {
            r,
            sig1,
            sig2,
            opcode,
            ready: ready as i32,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready != 0
    }

    pub fn to_bytes(&self) -> [u8; REQUEST_FRAME_SIZE] {
        let mut out = [0u8; REQUEST_FRAME_SIZE];
        out.copy_from_slice(bytemuck::bytes_of(self));
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != REQUEST_FRAME_SIZE {
            return Err(DecodeError::WrongLength {
                expected: REQUEST_FRAME_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(*bytemuck::from_bytes(bytes))
    }
}

/// The eight-metric response, in the fixed order defined by the Metric
/// Bundle: `epsilon, recurrence_rate, determinism, laminarity,
/// trapping_time, max_diag_line, divergence, entropy`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ResponseFrame {
    pub epsilon: f64,
    pub recurrence_rate: f64,
    pub determinism: f64,
    pub laminarity: f64,
    pub trapping_time: f64,
    pub max_diag_line: f64,
    pub divergence: f64,
    pub entropy: f64,
}

pub const RESPONSE_FRAME_SIZE: usize = std::mem::size_of::<ResponseFrame>();

impl ResponseFrame {
    pub fn to_bytes(&self) -> [u8; RESPONSE_FRAME_SIZE] {
        let mut out = [0u8; RESPONSE_FRAME_SIZE];
        out.copy_from_slice(bytemuck::bytes_of(self));
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != RESPONSE_FRAME_SIZE {
            return Err(DecodeError::WrongLength {
                expected: RESPONSE_FRAME_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(*bytemuck::from_bytes(bytes))
    }
}

impl From<ResponseFrame> for super::metrics::MetricBundle {
    fn from(f: ResponseFrame) -> Self {
        Self {
            epsilon: f.epsilon,
            recurrence_rate: f.recurrence_rate,
            determinism: f.determinism,
            laminarity: f.laminarity,
            trapping_time: f.trapping_time,
            max_diag_line: f.max_diag_line,
            divergence: f.divergence,
            entropy: f.entropy,
        }
    }
}

impl From<super::metrics::MetricBundle> for ResponseFrame {
    fn from(m: super::metrics::MetricBundle) -> Self {
        Self {
            epsilon: m.epsilon,
            recurrence_rate: m.recurrence_rate,
            determinism: m.determinism,
            laminarity: m.laminarity,
            trapping_time: m.trapping_time,
            max_diag_line: m.max_diag_line,
            divergence: m.divergence,
            entropy: m.entropy,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("frame of wrong length: expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}
