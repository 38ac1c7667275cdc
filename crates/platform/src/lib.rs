//! Minimal interrupt-delivery plumbing shared by device models.
//!
//! A full platform crate routes INTx, MSI, and MSI-X across an interrupt
//! controller topology. This accelerator only ever raises one
//! message-signalled interrupt on one vector, so the surface here is pared
//! down to exactly that: a message type, a trait a bus-owning actor
//! implements to actually deliver it, and a deferred-delivery queue a device
//! model can schedule onto without delivering inline.

pub mod interrupts;
