//! Protocol packet structure and encoding/decoding

use bytes::{BufMut, Bytes, BytesMut};
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

use crate::{
    checksum,
    command::Command,
    constants::MAGIC,
    error::{Error, Result},
};

/// Protocol packet
///
/// # Packet Structure
///
/// ```text
/// ┌──────────┬──────────┬──────────┬──────────┬─────────────┬──────────┬─────────┐
/// │  Magic   │   Size   │ Command  │ Checksum │ Session key │ Sequence │ Payload │
/// │ 4 bytes  │ LE u32   │ LE u16   │ LE u16   │   LE u16    │  LE u16  │ N bytes │
/// └──────────┴──────────┴──────────┴──────────┴─────────────┴──────────┴─────────┘
/// ```
///
/// `size` counts the bytes after itself (`payload.len() + 8`). It is
/// recomputed on every [`Packet::encode`]; a parsed value is kept only so
/// that [`Packet::is_valid`] can check it.
///
/// `command` stays a raw `u16` so that codes outside the [`Command`]
/// catalog still parse; use [`Packet::kind`] or [`Packet::is`] to match.
///
/// # Examples
///
/// ```
/// use zkbio_core::{Command, Packet};
///
/// let packet = Packet::new(Command::Connect, 0, 0);
/// let encoded = packet.encode();
/// assert_eq!(&encoded[..], &[
///     0x50, 0x50, 0x82, 0x7D, 0x08, 0x00, 0x00, 0x00,
///     0xE8, 0x03, 0x17, 0xFC, 0x00, 0x00, 0x00, 0x00,
/// ]);
///
/// let decoded = Packet::decode(&encoded).unwrap();
/// assert!(decoded.is(Command::Connect));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    /// Frame signature as received; may be shorter than four bytes after a
    /// partial parse
    pub magic: Bytes,

    pub size: u32,

    pub command: u16,

    /// Checksum as received, or as computed by the constructor
    pub checksum: u16,

    /// Per-connection key assigned by the device on connect
    pub session_key: u16,

    /// Request counter, echoed back by the device
    pub sequence: u16,

    pub payload: Bytes,
}

impl Default for Packet {
    fn default() -> Self {
        Self {
            magic: Bytes::new(),
            size: 0,
            command: 0,
            checksum: 0,
            session_key: 0,
            sequence: 0,
            payload: Bytes::new(),
        }
    }
}

impl Packet {
    /// Magic plus size field
    pub const PREFIX_SIZE: usize = 8;

    /// Full header size in bytes
    pub const HEADER_SIZE: usize = 16;

    /// Create a new packet with empty payload
    pub fn new(command: Command, session_key: u16, sequence: u16) -> Self {
        Self::with_payload(command, session_key, sequence, Bytes::new())
    }

    /// Create a packet with payload
    ///
    /// # Examples
    ///
    /// ```
    /// use zkbio_core::{Command, Packet};
    ///
    /// let packet = Packet::with_payload(Command::GetData, 0x1234, 3, &b"DeviceID\0"[..]);
    /// assert_eq!(packet.size, 17);
    /// assert!(packet.is_valid(true, true));
    /// ```
    pub fn with_payload(
        command: Command,
        session_key: u16,
        sequence: u16,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self::from_raw(command.code(), session_key, sequence, payload.into())
    }

    /// Build a packet from a raw command code
    pub fn from_raw(command: u16, session_key: u16, sequence: u16, payload: Bytes) -> Self {
        let mut packet = Self {
            magic: Bytes::from_static(&MAGIC),
            size: (payload.len() + 8) as u32,
            command,
            checksum: 0,
            session_key,
            sequence,
            payload,
        };
        packet.checksum = packet.compute_checksum();
        packet
    }

    /// Checksum of this packet as it would be serialized
    pub fn compute_checksum(&self) -> u16 {
        checksum::calculate(&self.encode_with_checksum(0))
    }

    /// Encode packet to bytes
    ///
    /// Magic is always the protocol signature, `size` is recomputed from the
    /// payload and the checksum is recomputed over the result.
    pub fn encode(&self) -> BytesMut {
        let mut buf = self.encode_with_checksum(0);
        let checksum = checksum::calculate(&buf);
        LittleEndian::write_u16(&mut buf[10..12], checksum);
        buf
    }

    fn encode_with_checksum(&self, checksum: u16) -> BytesMut {
        let mut buf = BytesMut::with_capacity(Self::HEADER_SIZE + self.payload.len());

        buf.put_slice(&MAGIC);
        buf.put_u32_le((self.payload.len() + 8) as u32);
        buf.put_u16_le(self.command);
        buf.put_u16_le(checksum);
        buf.put_u16_le(self.session_key);
        buf.put_u16_le(self.sequence);
        buf.put_slice(&self.payload);

        buf
    }

    /// Parse whatever part of a frame is present
    ///
    /// Never fails. Fewer than 8 bytes fill only `magic`; 8 to 15 bytes fill
    /// `magic` and `size`; 16 or more fill the whole header and the rest is
    /// payload. This lets a reader parse the 8-byte prefix first and the
    /// complete frame later.
    ///
    /// Short input keeps the magic bytes it has, so a truncated prefix fails
    /// `is_valid` on the magic check rather than looking like a default frame.
    pub fn parse(data: &[u8]) -> Self {
        let mut packet = Self {
            magic: Bytes::copy_from_slice(&data[..data.len().min(4)]),
            ..Default::default()
        };

        if data.len() >= Self::PREFIX_SIZE {
            packet.size = LittleEndian::read_u32(&data[4..8]);
        }

        if data.len() >= Self::HEADER_SIZE {
            packet.command = LittleEndian::read_u16(&data[8..10]);
            packet.checksum = LittleEndian::read_u16(&data[10..12]);
            packet.session_key = LittleEndian::read_u16(&data[12..14]);
            packet.sequence = LittleEndian::read_u16(&data[14..16]);
            packet.payload = Bytes::copy_from_slice(&data[Self::HEADER_SIZE..]);
        }

        packet
    }

    /// Strict parse: a complete frame with matching magic and checksum
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPacket`] if the frame is shorter than a
    /// header, the magic is wrong or the checksum does not match.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::HEADER_SIZE {
            return Err(Error::InvalidPacket(format!(
                "expected at least {} bytes, got {}",
                Self::HEADER_SIZE,
                data.len()
            )));
        }

        let packet = Self::parse(data);

        if !packet.has_magic() {
            return Err(Error::InvalidPacket(format!(
                "bad magic {:02X?}",
                packet.magic.as_ref()
            )));
        }

        let expected = packet.compute_checksum();
        if expected != packet.checksum {
            return Err(Error::InvalidPacket(format!(
                "checksum mismatch: expected 0x{:04X}, received 0x{:04X}",
                expected, packet.checksum
            )));
        }

        Ok(packet)
    }

    /// Check the magic, and optionally the checksum and the size field
    pub fn is_valid(&self, check_checksum: bool, check_size: bool) -> bool {
        self.has_magic()
            && (!check_size || self.size as usize == self.payload.len() + 8)
            && (!check_checksum || self.compute_checksum() == self.checksum)
    }

    fn has_magic(&self) -> bool {
        self.magic.as_ref() == &MAGIC[..]
    }

    /// Command as a catalog entry, `None` for unknown codes
    pub fn kind(&self) -> Option<Command> {
        Command::try_from(self.command).ok()
    }

    /// Check the command code
    pub fn is(&self, command: Command) -> bool {
        self.command == command.code()
    }

    /// Get total frame size
    pub fn frame_len(&self) -> usize {
        Self::HEADER_SIZE + self.payload.len()
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("command", &CommandCode(self.command))
            .field("size", &self.size)
            .field("checksum", &format!("0x{:04X}", self.checksum))
            .field("session_key", &format!("0x{:04X}", self.session_key))
            .field("sequence", &self.sequence)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packet[{}](session=0x{:04X}, seq={}, len={})",
            CommandCode(self.command),
            self.session_key,
            self.sequence,
            self.payload.len()
        )
    }
}

/// Renders a raw code by name when the catalog knows it
struct CommandCode(u16);

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Command::try_from(self.0) {
            Ok(command) => write!(f, "{command}"),
            Err(_) => write!(f, "unknown(0x{:04X})", self.0),
        }
    }
}

impl fmt::Debug for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
