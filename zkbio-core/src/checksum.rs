//! Frame checksum
//!
//! A ones'-complement sum of little-endian 16-bit words, taken over the
//! serialized frame from offset 8 (the command field) to the end. The
//! checksum field itself (offsets 10..12) is skipped. Carries are folded
//! inside the loop only once bit 31 of the running sum is set, then folded
//! fully at the end. Devices verify with exactly these fold points.

use tracing::trace;

/// Offset of the first summed word
const START: usize = 8;

/// Offset of the checksum field
const CHECKSUM_OFFSET: usize = 10;

/// Calculate the checksum of a serialized frame
///
/// Bytes `10..12` are ignored, so the frame may carry any checksum value.
///
/// # Examples
///
/// ```
/// use zkbio_core::checksum;
///
/// let frame = [0x50, 0x50, 0x82, 0x7D, 0x08, 0, 0, 0, 0xE8, 0x03, 0, 0, 0, 0, 0, 0];
/// assert_eq!(checksum::calculate(&frame), 0xFC17);
/// ```
pub fn calculate(frame: &[u8]) -> u16 {
    let even_end = frame.len() / 2 * 2;
    let mut sum: u32 = 0;

    let mut i = START;
    while i < even_end {
        if i != CHECKSUM_OFFSET {
            sum = sum.wrapping_add(u32::from(u16::from_le_bytes([frame[i], frame[i + 1]])));
            if sum & 0x8000_0000 != 0 {
                sum = (sum & 0xFFFF) + (sum >> 16);
            }
        }
        i += 2;
    }

    if frame.len() % 2 == 1 && frame.len() > START {
        sum = sum.wrapping_add(u32::from(frame[frame.len() - 1]));
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    let checksum = !sum as u16;

    trace!(
        frame_len = frame.len(),
        checksum = format!("0x{:04X}", checksum),
        "Calculated checksum"
    );

    checksum
}

/// Verify the checksum stored at offsets `10..12`
pub fn verify(frame: &[u8]) -> bool {
    if frame.len() < CHECKSUM_OFFSET + 2 {
        return false;
    }
    let stored = u16::from_le_bytes([frame[CHECKSUM_OFFSET], frame[CHECKSUM_OFFSET + 1]]);
    calculate(frame) == stored
}
