//! The Device Model: an emulated PCI accelerator exposing a register
//! window, a shared buffer, and a trigger register over one BAR, backed by
//! a single owning state shared between both access modes.

pub mod compute_link;
pub mod device;
pub mod notify_link;
pub mod shared_buffer;
pub mod state;
pub mod wake;

pub use compute_link::{ComputeLink, ComputeLinkError};
pub use device::{CrqaDevice, TriggerPhase};
pub use notify_link::{NotificationLink, NotificationLinkError};
pub use state::CrqaDeviceState;
