//! Operation log record (16 bytes)

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use crate::error::{Error, Result};
use crate::timestamp::DeviceTime;

/// An administrative operation recorded by the device
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OperationLogRecord {
    pub admin_id: u16,
    pub operation_id: u16,
    pub timestamp: DeviceTime,
    /// Operation-specific arguments
    pub params: [u16; 4],
}

impl OperationLogRecord {
    pub const SIZE: usize = 16;

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::truncated("operation log", Self::SIZE, data.len()));
        }

        let mut params = [0u16; 4];
        LittleEndian::read_u16_into(&data[8..16], &mut params);

        Ok(Self {
            admin_id: LittleEndian::read_u16(&data[0..2]),
            operation_id: LittleEndian::read_u16(&data[2..4]),
            timestamp: DeviceTime::decode(LittleEndian::read_u32(&data[4..8])),
            params,
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut out = [0u8; Self::SIZE];
        LittleEndian::write_u16(&mut out[0..2], self.admin_id);
        LittleEndian::write_u16(&mut out[2..4], self.operation_id);
        LittleEndian::write_u32(&mut out[4..8], self.timestamp.encode());
        LittleEndian::write_u16_into(&self.params, &mut out[8..16]);
        Bytes::copy_from_slice(&out)
    }
}
