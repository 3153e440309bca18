//! Transport layer for the terminal protocol
//!
//! The protocol needs only four things from the wire: open, write all
//! bytes, read exactly N bytes, close. [`Transport`] names those and
//! [`TcpTransport`] provides them over Tokio.

pub mod error;
pub mod tcp;

pub use error::{Error, Result};
pub use tcp::TcpTransport;

use async_trait::async_trait;
use bytes::BytesMut;

/// Byte stream to a device
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the connection
    async fn connect(&mut self) -> Result<()>;

    /// Close the connection; closing a closed transport is a no-op
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Write every byte of `data`
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Read exactly `len` bytes
    ///
    /// Partial reads are accumulated. Fails with [`Error::ConnectionClosed`]
    /// if the peer closes before `len` bytes arrive and with
    /// [`Error::ReadTimeout`] if they do not arrive in time.
    async fn receive_exact(&mut self, len: usize) -> Result<BytesMut>;

    /// Get remote address
    fn remote_addr(&self) -> String;
}
