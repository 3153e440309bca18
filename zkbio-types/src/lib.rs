//! Record types and codecs for zkbio
//!
//! Every record the terminal stores has a fixed little-endian layout. The
//! types here are plain values: `decode` reads from a byte slice, `encode`
//! produces the exact wire bytes.

pub mod attendance;
pub mod device_info;
pub mod error;
pub mod fingerprint;
pub mod machine_state;
pub mod oplog;
pub mod text;
pub mod timestamp;
pub mod user;

pub use attendance::AttendanceLogRecord;
pub use device_info::DeviceInfo;
pub use error::{Error, Result};
pub use fingerprint::FingerprintRecord;
pub use machine_state::MachineStateRecord;
pub use oplog::OperationLogRecord;
pub use text::TextEncoding;
pub use timestamp::DeviceTime;
pub use user::{Privilege, UserRecord};
