//! Error types for zkbio-core

/// Result type alias for core protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Frame failed magic, size or checksum validation
    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    /// Unknown command code
    #[error("Unknown command code: 0x{0:04X}")]
    UnknownCommand(u16),

    /// Invalid session state
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),

    /// Length prefix width other than 1, 2 or 4
    #[error("Unsupported length prefix width: {0} (expected 1, 2 or 4)")]
    UnsupportedWidth(usize),

    /// Payload too large for the frame or the prefix width
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge { size: usize, max: usize },

    /// Record decode/encode failure
    #[error(transparent)]
    Record(#[from] zkbio_types::Error),
}
