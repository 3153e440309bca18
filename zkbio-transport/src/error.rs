//! Link-level failures

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a [`Transport`](crate::Transport)
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Link to terminal is not open")]
    NotConnected,

    #[error("Link to terminal is already open")]
    AlreadyConnected,

    #[error("Terminal did not accept the connection in time")]
    ConnectionTimeout,

    #[error("Terminal did not answer in time")]
    ReadTimeout,

    /// The peer closed the stream before the requested bytes arrived
    #[error("Terminal closed the connection")]
    ConnectionClosed,

    #[error("Socket error: {0}")]
    Io(#[from] io::Error),

    #[error("Cannot resolve terminal address {0}")]
    InvalidAddress(String),
}

impl Error {
    /// Whether the link is unusable after this failure
    ///
    /// Timeouts count: a late reply would otherwise be read as the answer to
    /// the next request.
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::ReadTimeout | Self::Io(_) | Self::NotConnected
        )
    }
}
