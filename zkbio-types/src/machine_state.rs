//! Machine state counters
//!
//! The device answers a free-space query with a mostly empty block of
//! little-endian `u32` counters at fixed offsets:
//!
//! ```text
//! 16 users        24 fingerprints   32 records      40 op records
//! 48 admins       52 passwords      56 finger max   60 user max
//! 64 record max   68 finger rem     72 user rem     76 record rem
//! 80 faces        84 face rem       88 face max
//! ```

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MachineStateRecord {
    pub user_count: u32,
    pub fingerprint_count: u32,
    pub record_count: u32,
    pub op_record_count: u32,
    pub admin_count: u32,
    pub password_count: u32,
    pub fingerprint_capacity: u32,
    pub user_capacity: u32,
    pub record_capacity: u32,
    pub fingerprint_remaining: u32,
    pub user_remaining: u32,
    pub record_remaining: u32,
    pub face_count: u32,
    pub face_remaining: u32,
    pub face_capacity: u32,
}

impl MachineStateRecord {
    /// Shortest block that still carries every counter
    pub const MIN_SIZE: usize = 92;

    /// Size of the block as the device sends it
    pub const SIZE: usize = 112;

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE {
            return Err(Error::truncated("machine state", Self::MIN_SIZE, data.len()));
        }

        let at = |offset: usize| LittleEndian::read_u32(&data[offset..offset + 4]);

        Ok(Self {
            user_count: at(16),
            fingerprint_count: at(24),
            record_count: at(32),
            op_record_count: at(40),
            admin_count: at(48),
            password_count: at(52),
            fingerprint_capacity: at(56),
            user_capacity: at(60),
            record_capacity: at(64),
            fingerprint_remaining: at(68),
            user_remaining: at(72),
            record_remaining: at(76),
            face_count: at(80),
            face_remaining: at(84),
            face_capacity: at(88),
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut out = [0u8; Self::SIZE];

        for (offset, value) in [
            (16, self.user_count),
            (24, self.fingerprint_count),
            (32, self.record_count),
            (40, self.op_record_count),
            (48, self.admin_count),
            (52, self.password_count),
            (56, self.fingerprint_capacity),
            (60, self.user_capacity),
            (64, self.record_capacity),
            (68, self.fingerprint_remaining),
            (72, self.user_remaining),
            (76, self.record_remaining),
            (80, self.face_count),
            (84, self.face_remaining),
            (88, self.face_capacity),
        ] {
            LittleEndian::write_u32(&mut out[offset..offset + 4], value);
        }

        Bytes::copy_from_slice(&out)
    }
}
