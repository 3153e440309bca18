//! Optional sink for raw frames
//!
//! A [`Connection`](crate::Connection) hands every frame it writes and every
//! complete frame it reads to the configured sink, if there is one.

use tracing::trace;

/// Receives raw frames as they cross the wire
pub trait PacketTrace: Send + Sync {
    fn outbound(&self, frame: &[u8]);

    fn inbound(&self, frame: &[u8]);
}

/// Logs frames as hex at `trace` level
#[derive(Debug, Clone, Copy, Default)]
pub struct HexTrace;

impl PacketTrace for HexTrace {
    fn outbound(&self, frame: &[u8]) {
        trace!(len = frame.len(), "REQ {}", hex::encode_upper(frame));
    }

    fn inbound(&self, frame: &[u8]) {
        trace!(len = frame.len(), "RES {}", hex::encode_upper(frame));
    }
}
