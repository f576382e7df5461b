//! Identifiers, suites and limits shared by every relay component.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Maximum number of components in a name.
pub const MAX_NAME_COMPONENTS: usize = 64;

/// Maximum size of a packet accepted from or sent to a link.
pub const MAX_PACKET_SIZE: usize = 8800;

/// Default bound of the nonce de-duplication ring.
pub const MAX_NONCES: i64 = 256;

/// Maximum number of entries in the FIB table.
pub const MAX_FIB_ENTRIES: usize = 1024;

/// Maximum number of entries in the PIT table.
pub const MAX_PIT_ENTRIES: usize = 2048;

/// Maximum number of frames waiting in one interface queue.
pub const MAX_INTERFACE_QUEUE: usize = 64;

/// Seconds a non-static cache entry survives without being used.
pub const CONTENT_TIMEOUT_SECS: u64 = 300;

/// Interest lifetime applied when the packet does not carry one.
pub const INTEREST_TIMEOUT_SECS: u64 = 40;

/// Seconds a non-static face survives without traffic.
pub const FACE_TIMEOUT_SECS: u64 = 150;

/// Retransmissions of a pending Interest before it is given up.
pub const MAX_INTEREST_RETRANSMIT: u32 = 20;

/// UDP port used by the CCNx suites.
pub const CCN_UDP_PORT: u16 = 9695;

/// UDP port used by the NDN suite.
pub const NDN_UDP_PORT: u16 = 6363;

/// Unique identifier for a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FaceId(pub u32);

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FaceId({})", self.0)
    }
}

/// Unique identifier for a PIT entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PitId(pub u32);

impl fmt::Display for PitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PitId({})", self.0)
    }
}

/// Unique identifier for a content store entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentId(pub u32);

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

/// Wire encoding of names and packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Suite {
    /// CCNx 0.x binary XML.
    Ccnb,
    /// CCNx 1.0 (2015) fixed header plus 2-byte TLVs.
    CcnTlv,
    /// NDN packet format with variable-width TLVs.
    NdnTlv,
}

impl Suite {
    /// All suites known to the relay, in sniffing order.
    pub const ALL: [Suite; 3] = [Suite::Ccnb, Suite::CcnTlv, Suite::NdnTlv];

    /// The configuration string for this suite.
    pub fn as_str(&self) -> &'static str {
        match self {
            Suite::Ccnb => "ccnb",
            Suite::CcnTlv => "ccnx2015",
            Suite::NdnTlv => "ndn2013",
        }
    }

    /// Default UDP port for the suite.
    pub fn default_udp_port(&self) -> u16 {
        match self {
            Suite::Ccnb | Suite::CcnTlv => CCN_UDP_PORT,
            Suite::NdnTlv => NDN_UDP_PORT,
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Suite {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ccnb" => Ok(Suite::Ccnb),
            "ccnx2015" => Ok(Suite::CcnTlv),
            "ndn2013" => Ok(Suite::NdnTlv),
            other => Err(Error::Parse(format!("unknown suite '{}'", other))),
        }
    }
}

impl TryFrom<String> for Suite {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Suite> for String {
    fn from(suite: Suite) -> Self {
        suite.as_str().to_string()
    }
}
