//! Packet header overhead added to chunk transfers.

use serde::{Deserialize, Serialize};

/// Packetization model: each packet carries `mtu_bytes`, of which
/// `header_bytes` are transport and network headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkOverhead {
    pub mtu_bytes: u64,
    pub header_bytes: u64,
}

impl Default for NetworkOverhead {
    fn default() -> Self {
        Self {
            mtu_bytes: 1500,
            header_bytes: 60,
        }
    }
}

impl NetworkOverhead {
    /// Usable payload per packet, in bits.
    pub fn payload_bits_per_packet(&self) -> u64 {
        self.mtu_bytes.saturating_sub(self.header_bytes) * 8
    }

    /// Number of packets needed to carry `payload_bits`.
    pub fn packets_for(&self, payload_bits: u64) -> u64 {
        let per_packet = self.payload_bits_per_packet();
        if per_packet == 0 {
            return 0;
        }
        payload_bits.div_ceil(per_packet)
    }

    /// Header bits spent on carrying `payload_bits`.
    pub fn header_bits(&self, payload_bits: u64) -> u64 {
        self.packets_for(payload_bits) * self.header_bytes * 8
    }

    /// Total bits on the wire for `payload_bits` of chunk data.
    pub fn inflate(&self, payload_bits: u64) -> u64 {
        payload_bits + self.header_bits(payload_bits)
    }
}
