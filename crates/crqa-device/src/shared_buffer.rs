//! Raw byte storage for the shared-buffer MMIO window, with little-endian
//! field accessors matching `crqa_protocol::shared_buffer`'s layout.

use crqa_protocol::shared_buffer::{BUFFER_SIZE, REL_ID, REL_METRICS, REL_OPCODE, REL_R, REL_SIG1, REL_SIG2};
use crqa_protocol::{Signal, SIGNAL_LEN};

#[derive(Debug, Clone)]
pub struct SharedBuffer {
    bytes: Vec<u8>,
}

impl Default for SharedBuffer {
    fn default() -> Self {
        Self {
            bytes: vec![0u8; BUFFER_SIZE],
        }
    }
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, relative: usize, size: u32) -> u64 {
        let n = (size.min(8) as usize).min(BUFFER_SIZE.saturating_sub(relative));
        let mut buf = [0u8; 8];
        if relative < BUFFER_SIZE {
            buf[..n].copy_from_slice(&self.bytes[relative..relative + n]);
        }
        u64::from_le_bytes(buf)
    }

    pub fn write(&mut self, relative: usize, size: u32, val: u64) {
        let n = (size.min(8) as usize).min(BUFFER_SIZE.saturating_sub(relative));
        if relative < BUFFER_SIZE {
            self.bytes[relative..relative + n].copy_from_slice(&val.to_le_bytes()[..n]);
        }
    }

    pub fn r(&self) -> f64 {
        f64::from_le_bytes(self.bytes[REL_R..REL_R + 8].try_into().unwrap())
    }

    pub fn opcode(&self) -> u32 {
        u32::from_le_bytes(self.bytes[REL_OPCODE..REL_OPCODE + 4].try_into().unwrap())
    }

    pub fn id(&self) -> u64 {
        u64::from_le_bytes(self.bytes[REL_ID..REL_ID + 8].try_into().unwrap())
    }

    pub fn set_id(&mut self, id: u64) {
        self.bytes[REL_ID..REL_ID + 8].copy_from_slice(&id.to_le_bytes());
    }

    pub fn sig1(&self) -> Signal {
        read_signal(&self.bytes, REL_SIG1)
    }

    pub fn sig2(&self) -> Signal {
        read_signal(&self.bytes, REL_SIG2)
    }

    pub fn set_metrics(&mut self, values: [f64; 8]) {
        for (i, v) in values.iter().enumerate() {
            let off = REL_METRICS + i * 8;
            self.bytes[off..off + 8].copy_from_slice(&v.to_le_bytes());
        }
    }

    pub fn metrics(&self) -> [f64; 8] {
        let mut out = [0.0; 8];
        for (i, slot) in out.iter_mut().enumerate() {
            let off = REL_METRICS + i * 8;
            *slot = f64::from_le_bytes(self.bytes[off..off + 8].try_into().unwrap());
        }
        out
    }
}

fn read_signal(bytes: &[u8], start: usize) -> Signal {
    let mut out = [0.0; SIGNAL_LEN];
    for (i, slot) in out.iter_mut().enumerate() {
        let off = start + i * 8;
        *slot = f64::from_le_bytes(bytes[off..off + 8].try_into().unwrap());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_write_then_read_round_trips() {
        let mut buf = SharedBuffer::new();
        buf.write(crqa_protocol::shared_buffer::REL_R, 8, 0.15f64.to_bits());
        assert_eq!(buf.r(), 0.15);
    }

    #[test]
    fn id_and_metrics_round_trip() {
        let mut buf = SharedBuffer::new();
        buf.set_id(7);
        assert_eq!(buf.id(), 7);
        buf.set_metrics([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(buf.metrics(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }
}
