//! Fingerprint template record

use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// A fingerprint template bound to a user slot
///
/// Variable length: a 4-byte header (user id, finger index, enabled flag)
/// followed by the raw template.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FingerprintRecord {
    pub user_id: u16,
    /// Finger index, 0..=9 on most terminals
    pub finger_index: u8,
    pub enabled: bool,
    pub template: Bytes,
}

impl FingerprintRecord {
    pub const HEADER_SIZE: usize = 4;

    pub fn new(user_id: u16, finger_index: u8, template: impl Into<Bytes>) -> Self {
        Self {
            user_id,
            finger_index,
            enabled: true,
            template: template.into(),
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::HEADER_SIZE {
            return Err(Error::truncated("fingerprint", Self::HEADER_SIZE, data.len()));
        }

        Ok(Self {
            user_id: LittleEndian::read_u16(&data[0..2]),
            finger_index: data[2],
            enabled: data[3] != 0,
            template: Bytes::copy_from_slice(&data[Self::HEADER_SIZE..]),
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u16_le(self.user_id);
        buf.put_u8(self.finger_index);
        buf.put_u8(u8::from(self.enabled));
        buf.put_slice(&self.template);
        buf.freeze()
    }

    pub fn encoded_len(&self) -> usize {
        Self::HEADER_SIZE + self.template.len()
    }
}
