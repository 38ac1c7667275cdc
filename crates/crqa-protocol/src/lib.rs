//! Wire types and fixed addresses shared by the Device Model, the Compute
//! Server, and the Driver/Client contract: the Request/Response frames
//! exchanged with the Compute Server, the register-mode offsets, and the
//! shared-buffer layout.
//!
//! Generalized from `aero-ipc`'s tagged-enum wire codec, narrowed to this
//! accelerator's single fixed-size request and response shape.

pub mod constants;
pub mod metrics;
pub mod registers;
pub mod shared_buffer;
pub mod wire;

pub use metrics::MetricBundle;
pub use wire::{
    DecodeError, RequestFrame, ResponseFrame, Signal, REQUEST_FRAME_SIZE, RESPONSE_FRAME_SIZE,
    SIGNAL_LEN,
};
