//! # zkbio
//!
//! Client for the binary command protocol spoken by ZKTeco-style biometric
//! terminals on TCP port 4370.
//!
//! ## Features
//!
//! - Async/await API using Tokio
//! - Comm key login and session handling
//! - Chunked bulk downloads of users, fingerprints and logs
//! - Hash-verified uploads of fingerprint and face templates, photos and files
//! - Configurable text encoding for names and person ids
//!
//! ## Quick Start
//!
//! ```no_run
//! use zkbio::{Device, DeviceConfig};
//!
//! #[tokio::main]
//! async fn main() -> zkbio::Result<()> {
//!     // Connect to device
//!     let config = DeviceConfig::new("192.168.1.201", 4370).with_comm_key(0);
//!     let mut device = Device::from_config(config);
//!     device.connect().await?;
//!
//!     // Get device info
//!     let info = device.get_device_info().await?;
//!     println!("{}", info);
//!
//!     // Download attendance logs
//!     for log in device.get_att_logs().await? {
//!         println!("{} {}", log.person_id, log.timestamp);
//!     }
//!
//!     // Disconnect
//!     device.disconnect().await?;
//!
//!     Ok(())
//! }
//! ```

mod biometric;
pub mod config;
pub mod connection;
pub mod device;
pub mod error;
pub mod property;
pub mod trace;
pub mod transfer;

// Re-exports
pub use config::{ConnectVariant, DeviceConfig};
pub use connection::Connection;
pub use device::{DEFAULT_SYSTEM_QUERY, Device};
pub use error::{Error, Result};
pub use property::DeviceProperty;
pub use trace::{HexTrace, PacketTrace};
pub use transfer::StreamedReply;

// Re-export types
pub use zkbio_core::constants::DEFAULT_FACE_ID;
pub use zkbio_core::{Command, DEFAULT_PORT, Packet, SegmentedBuffer, Session, SessionState};
pub use zkbio_transport::{TcpTransport, Transport};
pub use zkbio_types::{
    AttendanceLogRecord, DeviceInfo, DeviceTime, FingerprintRecord, MachineStateRecord,
    OperationLogRecord, Privilege, TextEncoding, UserRecord,
};
