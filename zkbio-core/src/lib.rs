//! # zkbio-core
//!
//! Core protocol implementation for biometric attendance terminals.
//!
//! This crate provides the low-level protocol primitives:
//! - Packet structure, encoding and tolerant parsing
//! - Checksum calculation
//! - Command catalog
//! - Segmented transfer buffer and rolling hash
//! - Chunk planning, login key derivation and session state

pub mod auth;
pub mod buffer;
pub mod checksum;
pub mod command;
pub mod constants;
pub mod error;
pub mod hash;
pub mod packet;
pub mod session;
pub mod stream;

pub use buffer::SegmentedBuffer;
pub use command::Command;
pub use error::{Error, Result};
pub use packet::Packet;
pub use session::{Session, SessionState};
pub use stream::{ChunkPlan, ChunkRequest};

/// Default device port
pub const DEFAULT_PORT: u16 = 4370;
