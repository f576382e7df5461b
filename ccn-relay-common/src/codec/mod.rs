//! Wire codecs and suite detection.
//!
//! The forwarding engine only deals with [`Packet`]s. A [`Codec`] turns the
//! bytes of one suite into packets and builds the few frames the relay
//! originates itself (Interests, Content objects and Nacks). Frames are routed
//! to a codec by [`sniff`]ing their first bytes.

use bytes::Bytes;
use log::trace;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::Error;
use crate::packet::{interest_matches_content, Packet};
use crate::prefix::Prefix;
use crate::tlv;
use crate::types::Suite;
use crate::Result;

pub mod ccntlv;
pub mod ndntlv;

pub use ccntlv::CcnTlvCodec;
pub use ndntlv::NdnTlvCodec;

/// Encoding and decoding for one suite.
pub trait Codec: Send + Sync {
    /// The suite this codec speaks.
    fn suite(&self) -> Suite;

    /// Decodes one complete frame.
    fn decode(&self, frame: Bytes) -> Result<Packet>;

    /// Builds an Interest for `prefix`.
    fn encode_interest(
        &self,
        prefix: &Prefix,
        nonce: Option<u32>,
        lifetime: Option<Duration>,
    ) -> Result<Bytes>;

    /// Builds a Content object carrying `payload`.
    fn encode_content(
        &self,
        prefix: &Prefix,
        payload: &[u8],
        freshness: Option<Duration>,
    ) -> Result<Bytes>;

    /// Builds a "no route" Nack for `interest`; `None` when the suite has none.
    fn encode_nack(&self, interest: &Packet) -> Result<Option<Bytes>>;

    /// Whether `content` may satisfy `interest` from the content store.
    fn matches_content(&self, interest: &Packet, content: &Packet) -> bool {
        interest_matches_content(interest, content)
    }
}

/// Detects the suite of a frame from its leading bytes.
///
/// The order matters: a CCNB frame may start with `0x01` too, so CCNx 2015 is
/// only assumed when the second byte is a valid CCNx packet type.
pub fn sniff(frame: &[u8]) -> Option<Suite> {
    let first = *frame.first()?;
    let second = frame.get(1).copied();

    let suite = match first {
        0x04 => Some(Suite::Ccnb),
        0x01 => match second {
            Some(ptype) if ptype <= tlv::CCNX_PT_FRAGMENT => Some(Suite::CcnTlv),
            _ => Some(Suite::Ccnb),
        },
        b if b as u64 == tlv::NDN_TLV_INTEREST
            || b as u64 == tlv::NDN_TLV_DATA
            || b as u64 == tlv::NDN_TLV_LP_PACKET =>
        {
            Some(Suite::NdnTlv)
        }
        _ => None,
    };
    trace!("sniffed {:?} from leading byte 0x{:02x}", suite, first);
    suite
}

/// The set of codecs the relay can decode with, keyed by suite.
pub struct CodecRegistry {
    codecs: HashMap<Suite, Box<dyn Codec>>,
}

impl CodecRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Adds or replaces the codec for its suite.
    pub fn register(&mut self, codec: Box<dyn Codec>) {
        self.codecs.insert(codec.suite(), codec);
    }

    pub fn get(&self, suite: Suite) -> Result<&dyn Codec> {
        self.codecs
            .get(&suite)
            .map(|c| c.as_ref())
            .ok_or_else(|| Error::Parse(format!("no codec registered for suite {}", suite)))
    }

    pub fn supports(&self, suite: Suite) -> bool {
        self.codecs.contains_key(&suite)
    }

    /// Sniffs and decodes a frame.
    pub fn decode(&self, frame: Bytes) -> Result<Packet> {
        let suite = sniff(&frame).ok_or_else(|| {
            Error::Parse(format!(
                "unknown frame type 0x{:02x}",
                frame.first().copied().unwrap_or_default()
            ))
        })?;
        self.get(suite)?.decode(frame)
    }
}

impl Default for CodecRegistry {
    /// NDN and CCNx 2015 codecs.
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(NdnTlvCodec::new()));
        registry.register(Box::new(CcnTlvCodec::new()));
        registry
    }
}
