//! Tokio TCP link to a terminal

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::Transport;
use crate::error::{Error, Result};

/// Connect and read timeout unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Bytes of each frame shown in trace output
const PEEK: usize = 16;

/// TCP link to one terminal
///
/// The host is resolved on every `connect`, so a terminal that changed
/// address is picked up on reconnect.
pub struct TcpTransport {
    host: String,
    port: u16,
    peer: Option<SocketAddr>,
    stream: Option<TcpStream>,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            peer: None,
            stream: None,
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set connection timeout, applied to each resolved address
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set read timeout, applied to each `receive_exact` as a whole
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    async fn resolve(&self) -> Result<Vec<SocketAddr>> {
        let target = format!("{}:{}", self.host, self.port);
        let addrs: Vec<SocketAddr> = lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| Error::InvalidAddress(format!("{target} ({e})")))?
            .collect();

        if addrs.is_empty() {
            return Err(Error::InvalidAddress(target));
        }
        Ok(addrs)
    }

    /// Try each address in turn, keeping the last failure
    async fn open(&self, addrs: &[SocketAddr]) -> Result<(TcpStream, SocketAddr)> {
        let mut last = Error::InvalidAddress(format!("{}:{}", self.host, self.port));

        for &addr in addrs {
            debug!("Opening link to {}", addr);
            match timeout(self.connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => return Ok((stream, addr)),
                Ok(Err(e)) => {
                    debug!("{} refused: {}", addr, e);
                    last = Error::Io(e);
                }
                Err(_) => {
                    debug!("{} timed out", addr);
                    last = Error::ConnectionTimeout;
                }
            }
        }

        Err(last)
    }
}

/// Fill `buf` to exactly `len` bytes without consuming anything past them
async fn fill(stream: &mut TcpStream, buf: &mut BytesMut, len: usize) -> Result<()> {
    let mut window = stream.take((len - buf.len()) as u64);
    while buf.len() < len {
        if window.read_buf(buf).await? == 0 {
            return Err(Error::ConnectionClosed);
        }
    }
    Ok(())
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::AlreadyConnected);
        }

        let addrs = self.resolve().await?;
        let (stream, peer) = self.open(&addrs).await?;

        // One small request at a time, each waiting on its reply
        stream.set_nodelay(true)?;

        debug!("Link open to {}", peer);
        self.peer = Some(peer);
        self.stream = Some(stream);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };

        debug!("Closing link to {}", self.remote_addr());
        if let Err(e) = stream.shutdown().await {
            debug!("Shutdown of {} failed: {}", self.remote_addr(), e);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        trace!("-> {} bytes {:02X?}", data.len(), &data[..data.len().min(PEEK)]);
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn receive_exact(&mut self, len: usize) -> Result<BytesMut> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        let mut buf = BytesMut::with_capacity(len);

        match timeout(self.read_timeout, fill(stream, &mut buf, len)).await {
            Ok(filled) => filled?,
            Err(_) => return Err(Error::ReadTimeout),
        }

        trace!("<- {} bytes {:02X?}", buf.len(), &buf[..buf.len().min(PEEK)]);
        Ok(buf)
    }

    fn remote_addr(&self) -> String {
        match self.peer {
            Some(addr) => addr.to_string(),
            None => format!("{}:{}", self.host, self.port),
        }
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.stream.is_some() {
            warn!("Link to {} dropped without disconnect", self.remote_addr());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn loopback() -> (TcpTransport, TcpListener) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let transport = TcpTransport::new("127.0.0.1", port)
            .with_read_timeout(Duration::from_millis(500));
        (transport, listener)
    }

    #[test]
    fn test_remote_addr_before_connect() {
        let transport = TcpTransport::new("192.168.1.201", 4370);
        assert!(!transport.is_connected());
        assert_eq!(transport.remote_addr(), "192.168.1.201:4370");
    }

    #[tokio::test]
    async fn test_unresolvable_host() {
        let mut transport = TcpTransport::new("invalid..address", 4370)
            .with_connect_timeout(Duration::from_millis(100));

        assert!(transport.connect().await.is_err());
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_connect_twice() {
        let (mut transport, listener) = loopback().await;
        let server = tokio::spawn(async move {
            let _socket = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        });

        transport.connect().await.unwrap();
        assert!(transport.remote_addr().starts_with("127.0.0.1:"));
        assert!(matches!(transport.connect().await, Err(Error::AlreadyConnected)));

        transport.disconnect().await.unwrap();
        transport.disconnect().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_not_connected() {
        let mut transport = TcpTransport::new("127.0.0.1", 4370);
        assert!(matches!(transport.send(&[1]).await, Err(Error::NotConnected)));
        assert!(matches!(transport.receive_exact(1).await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_receive_exact_accumulates_partial_writes() {
        let (mut transport, listener) = loopback().await;

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(&[1, 2, 3]).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            socket.write_all(&[4, 5, 6, 7]).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        });

        transport.connect().await.unwrap();
        let first = transport.receive_exact(5).await.unwrap();
        assert_eq!(&first[..], &[1, 2, 3, 4, 5]);
        let rest = transport.receive_exact(2).await.unwrap();
        assert_eq!(&rest[..], &[6, 7]);

        transport.disconnect().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_receive_exact_closed_early() {
        let (mut transport, listener) = loopback().await;

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(&[1, 2]).await.unwrap();
        });

        transport.connect().await.unwrap();
        server.await.unwrap();

        let result = transport.receive_exact(8).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
        transport.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_receive_exact_times_out() {
        let (mut transport, listener) = loopback().await;

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(socket);
        });

        transport.connect().await.unwrap();
        let result = transport.receive_exact(4).await;
        assert!(matches!(result, Err(Error::ReadTimeout)));
        transport.disconnect().await.unwrap();
        server.abort();
    }
}
