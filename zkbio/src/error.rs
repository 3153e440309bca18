//! High-level error types

use zkbio_core::Command;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] zkbio_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] zkbio_transport::Error),

    #[error("Record error: {0}")]
    Record(#[from] zkbio_types::Error),

    #[error("Device not connected")]
    NotConnected,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unexpected response: got {}, expected one of {}", describe(.received), list(.expected))]
    UnexpectedResponse {
        expected: Vec<Command>,
        received: u16,
    },

    #[error("Upload integrity check failed: local hash 0x{local:08X}, device hash 0x{remote:08X}")]
    IntegrityError { local: u32, remote: u32 },

    #[error("Size mismatch: announced {expected} bytes, received {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Operation rejected by device: {0}")]
    OperationRejected(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

fn describe(code: &u16) -> String {
    match Command::try_from(*code) {
        Ok(command) => command.to_string(),
        Err(_) => format!("0x{code:04X}"),
    }
}

fn list(commands: &[Command]) -> String {
    let names: Vec<&str> = commands.iter().map(|c| c.name()).collect();
    format!("[{}]", names.join(", "))
}

impl Error {
    /// Check if the failure came from the connection itself
    pub fn is_connection_lost(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connection_lost(),
            _ => false,
        }
    }

    /// Check if the caller must reconnect before sending more commands
    pub fn requires_reconnect(&self) -> bool {
        self.is_connection_lost() || matches!(self, Self::NotConnected)
    }
}
