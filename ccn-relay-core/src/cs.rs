//! Content Store: an in-memory cache of Content objects.
//!
//! Entries are keyed by [`ContentId`]. The store is bounded by entry count;
//! `None` means unbounded. Eviction removes the least recently used entry
//! that is not static.

use ccn_relay_common::types::ContentId;
use ccn_relay_common::{Error, MatchMode, Packet, Prefix, Result};
use log::debug;
use std::collections::BTreeMap;
use std::time::Instant;

#[derive(Debug)]
pub struct ContentEntry {
    pub id: ContentId,
    pub packet: Packet,
    /// Never evicted nor aged out.
    pub is_static: bool,
    /// Past its NDN freshness period.
    pub stale: bool,
    pub last_used: Instant,
    pub served_count: u64,
}

/// What [`ContentStore::add`] did besides admitting the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub id: ContentId,
    pub evicted: Option<ContentId>,
}

#[derive(Debug)]
pub struct ContentStore {
    entries: BTreeMap<ContentId, ContentEntry>,
    max: Option<usize>,
    seq: u32,
}

impl ContentStore {
    /// `max == None` means unbounded.
    pub fn new(max: Option<usize>) -> Self {
        Self {
            entries: BTreeMap::new(),
            max,
            seq: 0,
        }
    }

    /// Builds a store from the relay's signed cache size: negative is
    /// unbounded, zero disables caching.
    pub fn with_cache_size(cache_size: i64) -> Self {
        Self::new(usize::try_from(cache_size).ok())
    }

    /// False when the bound is zero.
    pub fn enabled(&self) -> bool {
        self.max != Some(0)
    }

    pub fn max(&self) -> Option<usize> {
        self.max
    }

    /// Exact, suite-qualified lookup.
    pub fn lookup(&self, prefix: &Prefix) -> Option<ContentId> {
        self.entries
            .values()
            .find(|e| {
                e.packet.suite() == prefix.suite()
                    && e.packet.prefix.compare(0, prefix, MatchMode::Exact).is_exact()
            })
            .map(|e| e.id)
    }

    /// Lookup by display path, in any suite.
    pub fn lookup_path(&self, path: &str) -> Option<ContentId> {
        self.entries
            .values()
            .find(|e| e.packet.prefix.to_display_path() == path)
            .map(|e| e.id)
    }

    /// First entry satisfying `interest` under `matches`.
    ///
    /// MustBeFresh Interests skip stale entries, and a publisher constraint
    /// must equal the content's publisher.
    pub fn find_match<F>(&self, interest: &Packet, matches: F) -> Option<ContentId>
    where
        F: Fn(&Packet, &Packet) -> bool,
    {
        let fresh_only = interest.must_be_fresh();
        self.entries
            .values()
            .filter(|e| !(fresh_only && e.stale))
            .filter(|e| match interest.publisher() {
                Some(publisher) => e.packet.publisher() == Some(publisher),
                None => true,
            })
            .find(|e| matches(interest, &e.packet))
            .map(|e| e.id)
    }

    /// Admits `packet`, evicting the oldest non-static entry at the bound.
    pub fn add(&mut self, packet: Packet, is_static: bool, now: Instant) -> Result<Admission> {
        if !self.enabled() {
            return Err(Error::CapacityExceeded(format!(
                "caching is disabled, <{}> not stored",
                packet.prefix
            )));
        }
        if self.lookup(&packet.prefix).is_some() {
            return Err(Error::DuplicateSuppressed(format!(
                "content <{}> already cached",
                packet.prefix
            )));
        }

        let mut evicted = None;
        if let Some(max) = self.max {
            if self.entries.len() >= max {
                evicted = self.evict_oldest();
            }
        }

        if let Some(max) = self.max {
            if self.entries.len() > max {
                return Err(Error::CapacityExceeded(format!(
                    "content store holds {} entries",
                    self.entries.len()
                )));
            }
        }

        self.seq = self.seq.wrapping_add(1);
        let id = ContentId(self.seq);
        debug!(
            "  cs: add {} <{}> static={} (count={})",
            id,
            packet.prefix,
            is_static,
            self.entries.len() + 1
        );
        self.entries.insert(
            id,
            ContentEntry {
                id,
                packet,
                is_static,
                stale: false,
                last_used: now,
                served_count: 0,
            },
        );
        Ok(Admission { id, evicted })
    }

    fn evict_oldest(&mut self) -> Option<ContentId> {
        let oldest = self
            .entries
            .values()
            .filter(|e| !e.is_static)
            .min_by_key(|e| e.last_used)
            .map(|e| e.id)?;
        debug!("  cs: evicting {}", oldest);
        self.entries.remove(&oldest);
        Some(oldest)
    }

    pub fn remove(&mut self, id: ContentId) -> Option<ContentEntry> {
        self.entries.remove(&id)
    }

    pub fn get(&self, id: ContentId) -> Option<&ContentEntry> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: ContentId) -> Option<&mut ContentEntry> {
        self.entries.get_mut(&id)
    }

    pub fn ids(&self) -> Vec<ContentId> {
        self.entries.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use ccn_relay_common::packet::{interest_matches_content, Details};
    use ccn_relay_common::{PacketKind, Suite};
    use std::time::Duration;

    fn content(uri: &str) -> Packet {
        let prefix = Prefix::parse(uri, Suite::NdnTlv).unwrap();
        Packet::new(
            Bytes::from(uri.to_string()),
            prefix,
            PacketKind::Content,
            Details::ndn_default(),
        )
        .with_content(Bytes::from_static(b"payload"))
    }

    fn interest(uri: &str, must_be_fresh: bool) -> Packet {
        let mut details = Details::ndn_default();
        if let Details::NdnTlv {
            must_be_fresh: f, ..
        } = &mut details
        {
            *f = must_be_fresh;
        }
        let prefix = Prefix::parse(uri, Suite::NdnTlv).unwrap();
        Packet::new(Bytes::new(), prefix, PacketKind::Interest, details)
    }

    #[test]
    fn duplicate_is_suppressed() {
        let mut cs = ContentStore::new(None);
        cs.add(content("/a"), false, Instant::now()).unwrap();
        assert!(matches!(
            cs.add(content("/a"), false, Instant::now()),
            Err(Error::DuplicateSuppressed(_))
        ));
        assert_eq!(cs.lookup_path("/a"), cs.lookup(&content("/a").prefix));
    }

    #[test]
    fn path_lookup_tells_percent_from_escaped_byte() {
        let mut cs = ContentStore::new(None);
        let byte = cs.add(content("/%01"), false, Instant::now()).unwrap().id;
        let literal = cs.add(content("/%2501"), false, Instant::now()).unwrap().id;
        assert_eq!(cs.lookup_path("/%01"), Some(byte));
        assert_eq!(cs.lookup_path("/%2501"), Some(literal));
    }

    #[test]
    fn evicts_oldest_non_static() {
        let t0 = Instant::now();
        let mut cs = ContentStore::new(Some(2));
        let pinned = cs.add(content("/static"), true, t0).unwrap().id;
        let old = cs.add(content("/old"), false, t0 + Duration::from_secs(1)).unwrap().id;

        let admission = cs.add(content("/new"), false, t0 + Duration::from_secs(2)).unwrap();
        assert_eq!(admission.evicted, Some(old));
        assert!(cs.get(pinned).is_some());
        assert_eq!(cs.len(), 2);
    }

    #[test]
    fn static_only_store_overshoots_once() {
        let now = Instant::now();
        let mut cs = ContentStore::new(Some(1));
        cs.add(content("/s1"), true, now).unwrap();
        cs.add(content("/s2"), true, now).unwrap();
        assert_eq!(cs.len(), 2);
        assert!(matches!(
            cs.add(content("/s3"), true, now),
            Err(Error::CapacityExceeded(_))
        ));
    }

    #[test]
    fn cache_size_semantics() {
        assert_eq!(ContentStore::with_cache_size(-1).max(), None);
        assert!(!ContentStore::with_cache_size(0).enabled());
        assert_eq!(ContentStore::with_cache_size(10).max(), Some(10));
    }

    #[test]
    fn disabled_store_admits_nothing() {
        let mut cs = ContentStore::with_cache_size(0);
        for uri in ["/a", "/b"] {
            assert!(matches!(
                cs.add(content(uri), true, Instant::now()),
                Err(Error::CapacityExceeded(_))
            ));
        }
        assert!(cs.is_empty());
    }

    #[test]
    fn must_be_fresh_skips_stale() {
        let mut cs = ContentStore::new(None);
        let id = cs.add(content("/a/b"), false, Instant::now()).unwrap().id;

        assert_eq!(cs.find_match(&interest("/a", true), interest_matches_content), Some(id));
        cs.get_mut(id).unwrap().stale = true;
        assert_eq!(cs.find_match(&interest("/a", true), interest_matches_content), None);
        assert_eq!(cs.find_match(&interest("/a", false), interest_matches_content), Some(id));
        assert_eq!(cs.find_match(&interest("/z", false), interest_matches_content), None);
    }
}
