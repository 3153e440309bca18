//! Chunk planning for bulk downloads
//!
//! After `start_buff_stream` the device announces the total size. The client
//! then asks for the data one `buff_stream` range at a time, at most
//! [`CHUNK_SIZE`] bytes per range, and advances by the size the device says
//! it is about to send.

use crate::constants::CHUNK_SIZE;

/// One `buff_stream` range request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRequest {
    pub offset: u32,
    pub length: u32,
}

impl ChunkRequest {
    /// `buff_stream` payload: offset and length, both LE u32
    pub fn to_payload(self) -> [u8; 8] {
        let mut payload = [0u8; 8];
        payload[..4].copy_from_slice(&self.offset.to_le_bytes());
        payload[4..].copy_from_slice(&self.length.to_le_bytes());
        payload
    }
}

/// Progress through a download of `total` bytes
///
/// # Examples
///
/// ```
/// use zkbio_core::stream::{ChunkPlan, ChunkRequest};
///
/// let mut plan = ChunkPlan::new(70_000);
/// assert_eq!(plan.chunk_count(), 2);
///
/// let first = plan.next_request().unwrap();
/// assert_eq!(first, ChunkRequest { offset: 0, length: 0xFFC0 });
/// plan.advance(first.length);
///
/// let second = plan.next_request().unwrap();
/// assert_eq!(second, ChunkRequest { offset: 0xFFC0, length: 70_000 - 0xFFC0 });
/// plan.advance(second.length);
///
/// assert!(plan.is_done());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    total: u32,
    remaining: u32,
    chunk_size: u32,
}

impl ChunkPlan {
    pub fn new(total: u32) -> Self {
        Self::with_chunk_size(total, CHUNK_SIZE)
    }

    /// A zero `chunk_size` is treated as 1
    pub fn with_chunk_size(total: u32, chunk_size: u32) -> Self {
        Self {
            total,
            remaining: total,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_done(&self) -> bool {
        self.remaining == 0
    }

    /// Number of round trips if every chunk arrives in full
    pub fn chunk_count(&self) -> u32 {
        self.total.div_ceil(self.chunk_size)
    }

    /// The next range to ask for, `None` once everything has arrived
    pub fn next_request(&self) -> Option<ChunkRequest> {
        if self.is_done() {
            return None;
        }
        Some(ChunkRequest {
            offset: self.total - self.remaining,
            length: self.remaining.min(self.chunk_size),
        })
    }

    /// Record that the device delivered `received` bytes
    pub fn advance(&mut self, received: u32) {
        self.remaining = self.remaining.saturating_sub(received);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_large_download_plan() {
        let mut plan = ChunkPlan::new(200_000);
        assert_eq!(plan.chunk_count(), 4);

        let mut requests = Vec::new();
        while let Some(request) = plan.next_request() {
            requests.push(request);
            plan.advance(request.length);
        }

        assert_eq!(
            requests,
            vec![
                ChunkRequest { offset: 0, length: 65_472 },
                ChunkRequest { offset: 65_472, length: 65_472 },
                ChunkRequest { offset: 130_944, length: 65_472 },
                ChunkRequest { offset: 196_416, length: 3_584 },
            ]
        );
    }

    #[test]
    fn test_short_delivery_rerequests_rest() {
        let mut plan = ChunkPlan::new(100);
        plan.advance(60);
        assert_eq!(plan.next_request(), Some(ChunkRequest { offset: 60, length: 40 }));
    }

    #[test]
    fn test_over_delivery_finishes() {
        let mut plan = ChunkPlan::new(10);
        plan.advance(50);
        assert!(plan.is_done());
        assert_eq!(plan.next_request(), None);
    }

    #[test]
    fn test_empty_download() {
        let plan = ChunkPlan::new(0);
        assert_eq!(plan.chunk_count(), 0);
        assert_eq!(plan.next_request(), None);
    }

    #[test]
    fn test_request_payload() {
        let request = ChunkRequest { offset: 0xFFC0, length: 0x10 };
        assert_eq!(request.to_payload(), [0xC0, 0xFF, 0, 0, 0x10, 0, 0, 0]);
    }
}
