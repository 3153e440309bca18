//! Attendance log record (40 bytes)
//!
//! ```text
//! offset  size  field
//! 0       2     sequence number (LE u16)
//! 2       24    person id (null-terminated)
//! 26      1     verify mode
//! 27      4     timestamp (LE u32, device encoding)
//! 31      1     in/out direction
//! 32      2     work code (LE u16)
//! 34      6     reserved
//! ```

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use crate::error::{Error, Result};
use crate::text::{TextEncoding, read_cstr, write_cstr};
use crate::timestamp::DeviceTime;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttendanceLogRecord {
    pub sequence: u16,
    pub person_id: String,
    /// How the user was verified (password, fingerprint, card, face, ...)
    pub verify_mode: u8,
    pub timestamp: DeviceTime,
    /// Punch direction (check-in, check-out, overtime, ...)
    pub direction: u8,
    pub work_code: u16,
}

impl AttendanceLogRecord {
    pub const SIZE: usize = 40;

    pub fn decode(data: &[u8], encoding: TextEncoding) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::truncated("attendance log", Self::SIZE, data.len()));
        }

        Ok(Self {
            sequence: LittleEndian::read_u16(&data[0..2]),
            person_id: read_cstr(&data[2..26], encoding)?,
            verify_mode: data[26],
            timestamp: DeviceTime::decode(LittleEndian::read_u32(&data[27..31])),
            direction: data[31],
            work_code: LittleEndian::read_u16(&data[32..34]),
        })
    }

    pub fn encode(&self, encoding: TextEncoding) -> Result<Bytes> {
        let mut out = [0u8; Self::SIZE];

        LittleEndian::write_u16(&mut out[0..2], self.sequence);
        write_cstr(&mut out[2..26], "person_id", &self.person_id, encoding)?;
        out[26] = self.verify_mode;
        LittleEndian::write_u32(&mut out[27..31], self.timestamp.encode());
        out[31] = self.direction;
        LittleEndian::write_u16(&mut out[32..34], self.work_code);

        Ok(Bytes::copy_from_slice(&out))
    }
}
