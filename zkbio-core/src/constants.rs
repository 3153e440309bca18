//! Protocol constants

/// Frame signature, the first four bytes of every packet
pub const MAGIC: [u8; 4] = [0x50, 0x50, 0x82, 0x7D];

/// Default connection timeout (seconds)
pub const DEFAULT_TIMEOUT: u64 = 20;

/// Default read timeout (seconds)
pub const DEFAULT_READ_TIMEOUT: u64 = 20;

/// Largest chunk requested per `buff_stream` round trip during a bulk download
pub const CHUNK_SIZE: u32 = 0xFFC0;

/// Largest frame body accepted from the wire
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Tag sent ahead of the file name in `send_file`
pub const FILE_SEND_TAG: u32 = 0x06A4;

/// Face slot used when the caller does not pick one
pub const DEFAULT_FACE_ID: u8 = 50;

/// Width of person-id fields in command payloads
pub const PERSON_ID_WIDTH: usize = 24;

/// Width of file names in upload commands
pub const FILE_NAME_WIDTH: usize = 39;

/// Data ids for `start_buff_stream`
pub mod data_ids {
    /// All user records
    pub const USERS: u32 = 0x0500_0901;

    /// Attendance logs
    pub const ATT_LOGS: u32 = 0x0D01;

    /// Operation logs
    pub const OP_LOGS: u32 = 0x2201;

    /// All fingerprint templates
    pub const FINGERPRINTS: u32 = 0x0200_0701;
}

/// Table ids for `cls_data`
pub mod table_ids {
    /// Fingerprint templates
    pub const FINGERPRINTS: u8 = 0x02;

    /// User records
    pub const USERS: u8 = 0x05;
}
