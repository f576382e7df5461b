//! Decoded packets as the forwarding engine sees them.
//!
//! A [`Packet`] keeps the original wire bytes next to the decoded name and the
//! suite-specific fields the tables need. The engine never re-encodes a packet
//! it forwards; it sends `buf` as received.

use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;

use crate::prefix::{MatchMode, Prefix};
use crate::types::{Suite, INTEREST_TIMEOUT_SECS, MAX_NAME_COMPONENTS};

/// Default NDN scope: forwardable.
pub const NDN_DEFAULT_SCOPE: u8 = 3;

/// Default NDN InterestLifetime in milliseconds.
pub const NDN_DEFAULT_LIFETIME_MS: u64 = INTEREST_TIMEOUT_SECS * 1000;

/// Default hop limit put into CCNx Interests we originate.
pub const CCNX_DEFAULT_HOP_LIMIT: u8 = 64;

/// What a packet is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Interest,
    Content,
    /// A negative acknowledgement for an Interest.
    Nack,
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketKind::Interest => write!(f, "interest"),
            PacketKind::Content => write!(f, "content"),
            PacketKind::Nack => write!(f, "nack"),
        }
    }
}

/// Suite-specific fields of a packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Details {
    Ccnb {
        min_suffix: u32,
        max_suffix: u32,
        /// `None` when absent (forwardable).
        scope: Option<u8>,
        nonce: Option<Bytes>,
        /// PublisherPublicKeyDigest.
        ppkd: Option<Bytes>,
    },
    CcnTlv {
        key_id: Option<Bytes>,
        hop_limit: u8,
        /// Chunk number of the last segment, from `EndChunk`.
        end_chunk: Option<u64>,
    },
    NdnTlv {
        min_suffix: u32,
        max_suffix: u32,
        scope: u8,
        must_be_fresh: bool,
        nonce: Option<Bytes>,
        /// Publisher locator (KeyLocator) from the selectors.
        ppkl: Option<Bytes>,
        interest_lifetime_ms: u64,
        freshness_period_ms: Option<u64>,
        final_block_id: Option<Bytes>,
    },
}

impl Details {
    /// Default NDN details: no selectors, scope 3, 40 s lifetime.
    pub fn ndn_default() -> Self {
        Details::NdnTlv {
            min_suffix: 0,
            max_suffix: MAX_NAME_COMPONENTS as u32,
            scope: NDN_DEFAULT_SCOPE,
            must_be_fresh: false,
            nonce: None,
            ppkl: None,
            interest_lifetime_ms: NDN_DEFAULT_LIFETIME_MS,
            freshness_period_ms: None,
            final_block_id: None,
        }
    }

    /// Default CCNx details.
    pub fn ccntlv_default() -> Self {
        Details::CcnTlv {
            key_id: None,
            hop_limit: CCNX_DEFAULT_HOP_LIMIT,
            end_chunk: None,
        }
    }

    pub fn suite(&self) -> Suite {
        match self {
            Details::Ccnb { .. } => Suite::Ccnb,
            Details::CcnTlv { .. } => Suite::CcnTlv,
            Details::NdnTlv { .. } => Suite::NdnTlv,
        }
    }
}

/// A decoded Interest, Content object or Nack.
#[derive(Debug, Clone)]
pub struct Packet {
    /// Wire bytes exactly as received or encoded.
    pub buf: Bytes,
    pub prefix: Prefix,
    pub kind: PacketKind,
    /// Payload of a Content object, a slice of `buf`.
    pub content: Option<Bytes>,
    pub details: Details,
}

impl Packet {
    pub fn new(buf: Bytes, prefix: Prefix, kind: PacketKind, details: Details) -> Self {
        Self {
            buf,
            prefix,
            kind,
            content: None,
            details,
        }
    }

    pub fn with_content(mut self, content: Bytes) -> Self {
        self.content = Some(content);
        self
    }

    pub fn suite(&self) -> Suite {
        self.prefix.suite()
    }

    pub fn is_interest(&self) -> bool {
        self.kind == PacketKind::Interest
    }

    pub fn is_content(&self) -> bool {
        self.kind == PacketKind::Content
    }

    /// Nonce carried by the packet, if any.
    pub fn nonce(&self) -> Option<&Bytes> {
        match &self.details {
            Details::Ccnb { nonce, .. } | Details::NdnTlv { nonce, .. } => nonce.as_ref(),
            Details::CcnTlv { .. } => None,
        }
    }

    /// `(min, max)` suffix component bounds; CCNx has none.
    pub fn suffix_bounds(&self) -> Option<(u32, u32)> {
        match &self.details {
            Details::Ccnb {
                min_suffix,
                max_suffix,
                ..
            }
            | Details::NdnTlv {
                min_suffix,
                max_suffix,
                ..
            } => Some((*min_suffix, *max_suffix)),
            Details::CcnTlv { .. } => None,
        }
    }

    /// Publisher digest (CCNB) or locator (NDN) constraint.
    pub fn publisher(&self) -> Option<&Bytes> {
        match &self.details {
            Details::Ccnb { ppkd, .. } => ppkd.as_ref(),
            Details::NdnTlv { ppkl, .. } => ppkl.as_ref(),
            Details::CcnTlv { key_id, .. } => key_id.as_ref(),
        }
    }

    /// How long a PIT entry for this Interest lives.
    pub fn interest_lifetime(&self) -> Duration {
        match &self.details {
            Details::NdnTlv {
                interest_lifetime_ms,
                ..
            } => Duration::from_millis(*interest_lifetime_ms),
            _ => Duration::from_secs(INTEREST_TIMEOUT_SECS),
        }
    }

    /// NDN FreshnessPeriod of a Data packet.
    pub fn freshness_period(&self) -> Option<Duration> {
        match &self.details {
            Details::NdnTlv {
                freshness_period_ms: Some(ms),
                ..
            } => Some(Duration::from_millis(*ms)),
            _ => None,
        }
    }

    pub fn must_be_fresh(&self) -> bool {
        matches!(
            self.details,
            Details::NdnTlv {
                must_be_fresh: true,
                ..
            }
        )
    }

    /// Whether the Interest may leave this node.
    pub fn forward_ok(&self) -> bool {
        match &self.details {
            Details::NdnTlv { scope, .. } => *scope > 2,
            Details::Ccnb { scope, .. } => scope.map_or(true, |s| s > 2),
            Details::CcnTlv { hop_limit, .. } => *hop_limit > 0,
        }
    }

    /// Interests that a single PIT entry can stand for.
    pub fn same_interest(&self, other: &Packet) -> bool {
        if self.suite() != other.suite()
            || !self.prefix.compare(0, &other.prefix, MatchMode::Exact).is_exact()
        {
            return false;
        }
        match self.suite() {
            Suite::CcnTlv => true,
            Suite::Ccnb | Suite::NdnTlv => {
                self.suffix_bounds() == other.suffix_bounds() && self.publisher() == other.publisher()
            }
        }
    }

    /// SHA-256 over the wire bytes, used as the implicit digest component.
    pub fn implicit_digest(&self) -> [u8; 32] {
        Sha256::digest(&self.buf).into()
    }
}

/// Whether `content` satisfies `interest`.
///
/// CCNx requires an exact name. NDN and CCNB accept any Content whose name
/// the Interest prefixes, within the suffix bounds; an Interest one component
/// longer than the Content name matches against the implicit digest.
pub fn interest_matches_content(interest: &Packet, content: &Packet) -> bool {
    if interest.suite() != content.suite() {
        return false;
    }
    match interest.suite() {
        Suite::CcnTlv => interest
            .prefix
            .compare(0, &content.prefix, MatchMode::Exact)
            .is_exact(),
        Suite::Ccnb | Suite::NdnTlv => {
            let (min, max) = interest
                .suffix_bounds()
                .unwrap_or((0, MAX_NAME_COMPONENTS as u32));
            i_prefix_of_c(&interest.prefix, min, max, content)
        }
    }
}

fn i_prefix_of_c(prefix: &Prefix, min_suffix: u32, max_suffix: u32, content: &Packet) -> bool {
    let plen = prefix.len();
    let clen = content.prefix.len() + 1;
    if plen + min_suffix as usize > clen || plen + (max_suffix as usize) < clen {
        return false;
    }

    let result = if plen == clen {
        let digest = content.implicit_digest();
        content
            .prefix
            .compare_with_digest(&digest, prefix, MatchMode::Match)
    } else {
        content.prefix.compare(0, prefix, MatchMode::Match)
    };
    result.leading() == Some(plen)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interest(uri: &str, min: u32, max: u32) -> Packet {
        let mut details = Details::ndn_default();
        if let Details::NdnTlv {
            min_suffix,
            max_suffix,
            ..
        } = &mut details
        {
            *min_suffix = min;
            *max_suffix = max;
        }
        Packet::new(
            Bytes::from_static(b"i"),
            Prefix::parse(uri, Suite::NdnTlv).unwrap(),
            PacketKind::Interest,
            details,
        )
    }

    fn content(uri: &str) -> Packet {
        Packet::new(
            Bytes::from(format!("wire:{}", uri)),
            Prefix::parse(uri, Suite::NdnTlv).unwrap(),
            PacketKind::Content,
            Details::ndn_default(),
        )
    }

    #[test]
    fn prefix_interest_matches_longer_content() {
        let c = content("/a/b/c");
        assert!(interest_matches_content(&interest("/a/b", 0, 64), &c));
        assert!(interest_matches_content(&interest("/a/b/c", 0, 64), &c));
        assert!(!interest_matches_content(&interest("/a/x", 0, 64), &c));
    }

    #[test]
    fn suffix_bounds_are_honoured() {
        let c = content("/a/b/c");
        // /a needs three more components to reach /a/b/c plus digest
        assert!(!interest_matches_content(&interest("/a", 0, 2), &c));
        assert!(interest_matches_content(&interest("/a", 0, 3), &c));
        assert!(!interest_matches_content(&interest("/a/b/c", 2, 64), &c));
    }

    #[test]
    fn implicit_digest_component() {
        let c = content("/a");
        let mut with_digest = interest("/a", 0, 64);
        with_digest
            .prefix
            .append_component(&c.implicit_digest())
            .unwrap();
        assert!(interest_matches_content(&with_digest, &c));

        let mut wrong = interest("/a", 0, 64);
        wrong.prefix.append_component(&[0u8; 32]).unwrap();
        assert!(!interest_matches_content(&wrong, &c));
    }

    #[test]
    fn ccnx_requires_exact_name() {
        let name = Prefix::parse("/a/b", Suite::CcnTlv).unwrap();
        let i = Packet::new(
            Bytes::new(),
            Prefix::parse("/a", Suite::CcnTlv).unwrap(),
            PacketKind::Interest,
            Details::ccntlv_default(),
        );
        let c = Packet::new(Bytes::new(), name.clone(), PacketKind::Content, Details::ccntlv_default());
        assert!(!interest_matches_content(&i, &c));

        let exact = Packet::new(Bytes::new(), name, PacketKind::Interest, Details::ccntlv_default());
        assert!(interest_matches_content(&exact, &c));
    }

    #[test]
    fn same_interest_checks_selectors() {
        assert!(interest("/a", 0, 64).same_interest(&interest("/a", 0, 64)));
        assert!(!interest("/a", 1, 64).same_interest(&interest("/a", 0, 64)));
        assert!(!interest("/a", 0, 64).same_interest(&interest("/a/b", 0, 64)));
    }

    #[test]
    fn default_scope_is_forwardable() {
        let mut i = interest("/a", 0, 64);
        assert!(i.forward_ok());
        assert_eq!(i.interest_lifetime(), Duration::from_secs(40));

        if let Details::NdnTlv { scope, .. } = &mut i.details {
            *scope = 2;
        }
        assert!(!i.forward_ok());
    }
}
