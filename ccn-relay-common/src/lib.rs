//! Common types and utilities for the CCN/NDN relay.
//!
//! This crate provides the name model, the packet envelope and the wire
//! codecs shared by the forwarding core, the relay daemon and the client tool.

pub mod codec;
pub mod error;
pub mod metrics;
pub mod packet;
pub mod prefix;
pub mod tlv;
pub mod types;

/// Reexport of common types
pub use error::Error;
pub use packet::{Packet, PacketKind};
pub use prefix::{MatchMode, Prefix, PrefixMatch};
pub use types::Suite;

pub type Result<T> = std::result::Result<T, Error>;
