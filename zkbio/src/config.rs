//! Connection settings

use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use zkbio_core::constants::{DEFAULT_READ_TIMEOUT, DEFAULT_TIMEOUT};
use zkbio_core::{Command, DEFAULT_PORT};
use zkbio_types::TextEncoding;

use crate::error::{Error, Result};
use crate::trace::PacketTrace;

/// Firmware family, distinguished by how it acknowledges `connect`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectVariant {
    /// Replies `ack`
    #[default]
    Standard,

    /// Replies `accept_conn`
    AcceptConn,
}

impl ConnectVariant {
    /// Reply expected for `connect`
    pub fn expected_reply(self) -> Command {
        match self {
            Self::Standard => Command::Ack,
            Self::AcceptConn => Command::AcceptConn,
        }
    }
}

/// Settings for one device connection
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use zkbio::{ConnectVariant, DeviceConfig};
///
/// let config = DeviceConfig::new("192.168.1.201", 4370)
///     .with_comm_key(1234)
///     .with_variant(ConnectVariant::AcceptConn)
///     .with_read_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.comm_key, 1234);
/// ```
#[derive(Clone)]
pub struct DeviceConfig {
    pub host: String,
    pub port: u16,

    /// Communication key; 0 means the device has none and no login is sent
    pub comm_key: u32,

    /// Encoding of names, person ids and file names
    pub encoding: TextEncoding,

    pub variant: ConnectVariant,

    pub connect_timeout: Duration,
    pub read_timeout: Duration,

    pub trace: Option<Arc<dyn PacketTrace>>,
}

impl DeviceConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            comm_key: 0,
            encoding: TextEncoding::default(),
            variant: ConnectVariant::default(),
            connect_timeout: Duration::from_secs(DEFAULT_TIMEOUT),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT),
            trace: None,
        }
    }

    /// Read settings from the environment
    ///
    /// `ZKBIO_HOST` is required; `ZKBIO_PORT`, `ZKBIO_COMM_KEY` and
    /// `ZKBIO_ENCODING` are optional.
    pub fn from_env() -> Result<Self> {
        let host = env::var("ZKBIO_HOST")
            .map_err(|_| Error::InvalidArgument("ZKBIO_HOST is not set".into()))?;

        let mut config = Self::new(host, DEFAULT_PORT);

        if let Ok(port) = env::var("ZKBIO_PORT") {
            config.port = port
                .parse()
                .map_err(|e| Error::InvalidArgument(format!("ZKBIO_PORT={port}: {e}")))?;
        }

        if let Ok(key) = env::var("ZKBIO_COMM_KEY") {
            config.comm_key = key
                .parse()
                .map_err(|e| Error::InvalidArgument(format!("ZKBIO_COMM_KEY={key}: {e}")))?;
        }

        if let Ok(label) = env::var("ZKBIO_ENCODING") {
            config.encoding = TextEncoding::for_label(&label)?;
        }

        Ok(config)
    }

    pub fn with_comm_key(mut self, comm_key: u32) -> Self {
        self.comm_key = comm_key;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_variant(mut self, variant: ConnectVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_trace(mut self, trace: Arc<dyn PacketTrace>) -> Self {
        self.trace = Some(trace);
        self
    }
}

impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("comm_key", &if self.comm_key == 0 { "none" } else { "set" })
            .field("encoding", &self.encoding.name())
            .field("variant", &self.variant)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("trace", &self.trace.is_some())
            .finish()
    }
}
