//! Accumulator for multi-packet transfers

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};
use zkbio_types::{
    AttendanceLogRecord, FingerprintRecord, OperationLogRecord, TextEncoding, UserRecord,
};

use crate::error::{Error, Result};
use crate::hash::rolling_hash;

/// Growable byte buffer for bulk transfers
///
/// Downloads append chunk after chunk and decode the result as a batch of
/// records; uploads build the blob, optionally prefix its length and hash
/// it for the integrity check.
///
/// # Examples
///
/// ```
/// use zkbio_core::SegmentedBuffer;
/// use zkbio_types::TextEncoding;
///
/// let mut buffer = SegmentedBuffer::new(TextEncoding::Latin1);
/// buffer.append(&[1, 2, 3]);
/// buffer.add_leading_length(4).unwrap();
/// assert_eq!(buffer.as_bytes(), &[3, 0, 0, 0, 1, 2, 3]);
///
/// buffer.remove_leading(4);
/// assert_eq!(buffer.as_bytes(), &[1, 2, 3]);
/// ```
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SegmentedBuffer {
    data: BytesMut,
    encoding: TextEncoding,
}

impl SegmentedBuffer {
    pub fn new(encoding: TextEncoding) -> Self {
        Self {
            data: BytesMut::new(),
            encoding,
        }
    }

    /// Wrap a complete blob
    pub fn from_bytes(data: impl AsRef<[u8]>, encoding: TextEncoding) -> Self {
        Self {
            data: BytesMut::from(data.as_ref()),
            encoding,
        }
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data.freeze()
    }

    pub fn append(&mut self, part: &[u8]) {
        self.data.extend_from_slice(part);
    }

    /// Prefix the current length as a little-endian integer of `width` bytes
    pub fn add_leading_length(&mut self, width: usize) -> Result<()> {
        let len = self.data.len();
        let value = u32::try_from(len).map_err(|_| Error::PayloadTooLarge {
            size: len,
            max: u32::MAX as usize,
        })?;
        self.add_leading(value, width)
    }

    /// Prefix `value` as a little-endian integer of `width` bytes
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedWidth`] unless `width` is 1, 2 or 4, and
    /// [`Error::PayloadTooLarge`] if `value` does not fit in `width` bytes.
    pub fn add_leading(&mut self, value: u32, width: usize) -> Result<()> {
        let max = match width {
            1 => u32::from(u8::MAX),
            2 => u32::from(u16::MAX),
            4 => u32::MAX,
            other => return Err(Error::UnsupportedWidth(other)),
        };
        if value > max {
            return Err(Error::PayloadTooLarge {
                size: value as usize,
                max: max as usize,
            });
        }

        let mut prefixed = BytesMut::with_capacity(width + self.data.len());
        prefixed.put_slice(&value.to_le_bytes()[..width]);
        prefixed.put_slice(&self.data);
        self.data = prefixed;
        Ok(())
    }

    /// Drop the first `width` bytes
    ///
    /// A buffer of `width` bytes or fewer is left untouched: it cannot hold
    /// a prefix followed by data.
    pub fn remove_leading(&mut self, width: usize) {
        if self.data.len() > width {
            let _ = self.data.split_to(width);
        }
    }

    /// Range slice clamped to the buffer, never padded
    pub fn segment(&self, offset: usize, length: usize) -> &[u8] {
        let start = offset.min(self.data.len());
        let end = offset.saturating_add(length).min(self.data.len());
        &self.data[start..end]
    }

    /// Integrity hash of the current contents
    pub fn rolling_hash(&self) -> u32 {
        rolling_hash(&self.data)
    }

    /// Decode as user records; `None` unless the length is a multiple of 72
    pub fn as_user_records(&self) -> Result<Option<Vec<UserRecord>>> {
        self.fixed_batch(UserRecord::SIZE, |chunk, encoding| {
            UserRecord::decode(chunk, encoding)
        })
    }

    /// Decode as attendance logs; `None` unless the length is a multiple of 40
    pub fn as_attendance_logs(&self) -> Result<Option<Vec<AttendanceLogRecord>>> {
        self.fixed_batch(AttendanceLogRecord::SIZE, |chunk, encoding| {
            AttendanceLogRecord::decode(chunk, encoding)
        })
    }

    /// Decode as operation logs; `None` unless the length is a multiple of 16
    pub fn as_operation_logs(&self) -> Result<Option<Vec<OperationLogRecord>>> {
        self.fixed_batch(OperationLogRecord::SIZE, |chunk, _| {
            OperationLogRecord::decode(chunk)
        })
    }

    fn fixed_batch<T>(
        &self,
        record_size: usize,
        decode: impl Fn(&[u8], TextEncoding) -> zkbio_types::Result<T>,
    ) -> Result<Option<Vec<T>>> {
        if self.data.len() % record_size != 0 {
            return Ok(None);
        }

        let records = self
            .data
            .chunks_exact(record_size)
            .map(|chunk| decode(chunk, self.encoding))
            .collect::<zkbio_types::Result<Vec<T>>>()?;

        Ok(Some(records))
    }

    /// Decode a sequence of length-prefixed fingerprint templates
    ///
    /// Each segment starts with a `u16` length that counts its own two bytes.
    pub fn as_fingerprint_records(&self) -> Result<Vec<FingerprintRecord>> {
        let data = &self.data[..];
        let mut records = Vec::new();
        let mut index = 0;

        while index < data.len() {
            if data.len() - index < 2 {
                return Err(zkbio_types::Error::TruncatedRecord {
                    record: "fingerprint segment length",
                    expected: 2,
                    actual: data.len() - index,
                }
                .into());
            }

            let segment_len = usize::from(LittleEndian::read_u16(&data[index..index + 2]));
            index += 2;

            let body_len = segment_len.saturating_sub(2);
            if data.len() - index < body_len {
                return Err(zkbio_types::Error::TruncatedRecord {
                    record: "fingerprint segment",
                    expected: body_len,
                    actual: data.len() - index,
                }
                .into());
            }

            records.push(FingerprintRecord::decode(&data[index..index + body_len])?);
            index += body_len;
        }

        Ok(records)
    }
}

impl fmt::Debug for SegmentedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentedBuffer")
            .field("len", &self.data.len())
            .field("encoding", &self.encoding.name())
            .finish()
    }
}

impl AsRef<[u8]> for SegmentedBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use zkbio_types::DeviceTime;

    fn latin1(data: &[u8]) -> SegmentedBuffer {
        SegmentedBuffer::from_bytes(data, TextEncoding::Latin1)
    }

    #[test]
    fn test_append() {
        let mut buffer = SegmentedBuffer::new(TextEncoding::Latin1);
        buffer.append(b"ab");
        buffer.append(b"");
        buffer.append(b"cd");
        assert_eq!(buffer.as_bytes(), b"abcd");
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_leading_length_widths() {
        let mut one = latin1(&[9; 3]);
        one.add_leading_length(1).unwrap();
        assert_eq!(one.as_bytes(), &[3, 9, 9, 9]);

        let mut two = latin1(&[9; 3]);
        two.add_leading_length(2).unwrap();
        assert_eq!(two.as_bytes(), &[3, 0, 9, 9, 9]);

        let mut bad = latin1(&[9; 3]);
        assert!(matches!(bad.add_leading_length(3), Err(Error::UnsupportedWidth(3))));
        assert_eq!(bad.len(), 3);
    }

    #[test]
    fn test_leading_length_overflow() {
        let mut buffer = latin1(&[0; 300]);
        assert!(matches!(
            buffer.add_leading_length(1),
            Err(Error::PayloadTooLarge { size: 300, max: 255 })
        ));
    }

    #[test]
    fn test_add_leading_value() {
        let mut buffer = latin1(&[0xAA]);
        buffer.add_leading(0x0102, 2).unwrap();
        assert_eq!(buffer.as_bytes(), &[0x02, 0x01, 0xAA]);
    }

    #[test]
    fn test_remove_leading_keeps_short_buffers() {
        let mut buffer = latin1(&[1, 2, 3, 4]);
        buffer.remove_leading(4);
        assert_eq!(buffer.as_bytes(), &[1, 2, 3, 4]);

        let mut buffer = latin1(&[1, 2, 3, 4, 5]);
        buffer.remove_leading(4);
        assert_eq!(buffer.as_bytes(), &[5]);
    }

    #[test]
    fn test_segment_is_not_padded() {
        let buffer = latin1(&[0, 1, 2, 3, 4, 5]);
        assert_eq!(buffer.segment(2, 3), &[2, 3, 4]);
        assert_eq!(buffer.segment(4, 10), &[4, 5]);
        assert!(buffer.segment(10, 2).is_empty());
    }

    #[test]
    fn test_user_batch() {
        let mut buffer = SegmentedBuffer::new(TextEncoding::Latin1);
        for id in 1..=3u16 {
            let user = UserRecord::new(id, id.to_string(), format!("user{id}"));
            buffer.append(&user.encode(TextEncoding::Latin1).unwrap());
        }

        let users = buffer.as_user_records().unwrap().unwrap();
        assert_eq!(users.len(), 3);
        assert_eq!(users[2].name, "user3");
        assert_eq!(users[2].person_id, "3");

        buffer.append(&[0]);
        assert_eq!(buffer.as_user_records().unwrap(), None);
    }

    #[test]
    fn test_empty_batch() {
        let buffer = SegmentedBuffer::new(TextEncoding::Latin1);
        assert_eq!(buffer.as_attendance_logs().unwrap(), Some(vec![]));
        assert_eq!(buffer.as_fingerprint_records().unwrap(), vec![]);
    }

    #[test]
    fn test_attendance_and_oplog_batches() {
        let log = AttendanceLogRecord {
            sequence: 1,
            person_id: "42".into(),
            timestamp: DeviceTime::new(2021, 1, 2, 3, 4, 5),
            ..Default::default()
        };
        let bytes = log.encode(TextEncoding::Latin1).unwrap();
        let mut buffer = latin1(&bytes);
        buffer.append(&bytes);
        assert_eq!(buffer.as_attendance_logs().unwrap(), Some(vec![log.clone(), log]));
        assert_eq!(buffer.as_operation_logs().unwrap().map(|l| l.len()), Some(5));
        assert_eq!(buffer.as_user_records().unwrap(), None);
    }

    #[test]
    fn test_fingerprint_walk() {
        let first = FingerprintRecord::new(1, 0, vec![0xA1, 0xA2, 0xA3]);
        let second = FingerprintRecord::new(2, 5, vec![0xB1]);

        let mut buffer = SegmentedBuffer::new(TextEncoding::Latin1);
        for fp in [&first, &second] {
            let body = fp.encode();
            buffer.append(&((body.len() + 2) as u16).to_le_bytes());
            buffer.append(&body);
        }

        assert_eq!(buffer.as_fingerprint_records().unwrap(), vec![first, second]);
    }

    #[test]
    fn test_fingerprint_walk_truncated() {
        let buffer = latin1(&[20, 0, 1, 0, 0, 1]);
        assert!(matches!(
            buffer.as_fingerprint_records(),
            Err(Error::Record(zkbio_types::Error::TruncatedRecord { .. }))
        ));
    }

    #[test]
    fn test_rolling_hash_of_contents() {
        assert_eq!(latin1(b"abc").rolling_hash(), 0x6783);
        assert_eq!(SegmentedBuffer::default().rolling_hash(), 0);
    }
}
