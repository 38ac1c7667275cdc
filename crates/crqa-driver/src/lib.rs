//! The Driver contract: two faces of the same character device, as
//! described in §4.4. Everything outside this interface — node creation,
//! real kernel-space mapping, interrupt registration — is the OS's
//! problem; this crate models only the user-facing surface both faces
//! expose over a bound Device Model instance.

pub mod mapping_face;
pub mod probe;
pub mod register_face;

pub use mapping_face::MappingFace;
pub use probe::{probe, ProbeError};
pub use register_face::RegisterFace;

/// The character device node name a bound instance appears under.
pub const DEVICE_NODE_NAME: &str = crqa_protocol::constants::DEVICE_NODE_NAME;
