//! Fixed identifiers every layer must agree on: the emulated bus identity,
//! the device ID word, and the default Compute Server endpoint.

/// Emulated PCI vendor ID.
pub const VENDOR_ID: u16 = 0x1234;
/// Emulated PCI device ID.
pub const DEVICE_ID: u16 = 0xdada;

/// Magic word readable at register offset `0x00`, identifying the device
/// independent of PCI config space.
pub const DEVICE_MAGIC: u32 = 0x1122_3344;

/// Default filesystem path for the Compute Server's Unix domain socket.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/crqa_socket";

/// Character device node name (`cpcidev_pci`, one instance per bound bus
/// device).
pub const DEVICE_NODE_NAME: &str = "cpcidev_pci";
