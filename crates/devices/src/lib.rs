//! PCI device plumbing shared by concrete device models.
//!
//! Generalized from `aero-devices`'s `pci` module, pared down to what a
//! single conventional-PCI, single-BAR, single-MSI-vector accelerator needs:
//! a configuration space with a command register and one capability
//! (MSI), Memory Space Enable gating on BAR access, and the `PciDevice`
//! trait concrete device models implement.

pub mod pci;
