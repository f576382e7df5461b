//! Pending Interest Table and the nonce cache.

use bytes::Bytes;
use ccn_relay_common::types::{FaceId, PitId};
use ccn_relay_common::{Error, Packet, Result, Suite};
use log::debug;
use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

/// A face waiting for Content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingFace {
    pub face: FaceId,
    pub last_used: Instant,
}

#[derive(Debug)]
pub struct PitEntry {
    pub id: PitId,
    pub packet: Packet,
    /// Face the Interest arrived on; cleared when that face goes away.
    pub from: Option<FaceId>,
    pub last_used: Instant,
    pub lifetime: Duration,
    pub retries: u32,
    pub pending: Vec<PendingFace>,
}

impl PitEntry {
    pub fn is_pending(&self, face: FaceId) -> bool {
        self.pending.iter().any(|p| p.face == face)
    }

    pub fn expires_at(&self) -> Instant {
        self.last_used + self.lifetime
    }
}

#[derive(Debug)]
pub struct Pit {
    entries: BTreeMap<PitId, PitEntry>,
    max_entries: usize,
    /// Lifetime of Interests that do not carry one.
    default_lifetime: Duration,
    seq: u32,
}

impl Pit {
    pub fn new(max_entries: usize, default_lifetime: Duration) -> Self {
        Self {
            entries: BTreeMap::new(),
            max_entries,
            default_lifetime,
            seq: 0,
        }
    }

    /// Entry an Interest equal to `packet` would aggregate into.
    pub fn find_same(&self, packet: &Packet) -> Option<PitId> {
        self.entries
            .values()
            .find(|e| e.packet.same_interest(packet))
            .map(|e| e.id)
    }

    /// Creates a new entry; never merges.
    pub fn insert(&mut self, from: Option<FaceId>, packet: Packet, now: Instant) -> Result<PitId> {
        if self.entries.len() >= self.max_entries {
            return Err(Error::CapacityExceeded(format!(
                "PIT holds {} entries",
                self.max_entries
            )));
        }
        self.seq = self.seq.wrapping_add(1);
        let id = PitId(self.seq);
        let lifetime = match packet.suite() {
            Suite::NdnTlv => packet.interest_lifetime(),
            Suite::Ccnb | Suite::CcnTlv => self.default_lifetime,
        };
        debug!("  pit: new entry {} <{}> lifetime={:?}", id, packet.prefix, lifetime);
        self.entries.insert(
            id,
            PitEntry {
                id,
                packet,
                from,
                last_used: now,
                lifetime,
                retries: 0,
                pending: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Adds `face` as pending, or refreshes its time if already there.
    pub fn append_pending(&mut self, id: PitId, face: FaceId, now: Instant) -> Result<()> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("PIT entry {}", id)))?;
        match entry.pending.iter_mut().find(|p| p.face == face) {
            Some(pending) => pending.last_used = now,
            None => entry.pending.push(PendingFace {
                face,
                last_used: now,
            }),
        }
        Ok(())
    }

    pub fn remove(&mut self, id: PitId) -> Option<PitEntry> {
        self.entries.remove(&id)
    }

    /// Forgets `face` everywhere and drops entries left with nobody waiting.
    /// Returns how many entries went.
    pub fn purge_face(&mut self, face: FaceId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| {
            if e.from == Some(face) {
                e.from = None;
            }
            let had_pending = !e.pending.is_empty();
            e.pending.retain(|p| p.face != face);
            !(had_pending && e.pending.is_empty())
        });
        before - self.entries.len()
    }

    pub fn get(&self, id: PitId) -> Option<&PitEntry> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: PitId) -> Option<&mut PitEntry> {
        self.entries.get_mut(&id)
    }

    pub fn ids(&self) -> Vec<PitId> {
        self.entries.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PitEntry> {
        self.entries.values()
    }

    /// Whether any pending Interest carries `nonce`.
    pub fn has_nonce(&self, nonce: &Bytes) -> bool {
        self.entries.values().any(|e| e.packet.nonce() == Some(nonce))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Recently seen Interest nonces, newest first.
#[derive(Debug)]
pub struct NonceCache {
    ring: VecDeque<Bytes>,
    /// Negative: no ring, duplicates are detected against the PIT.
    max: i64,
}

impl NonceCache {
    pub fn new(max: i64) -> Self {
        let cap = usize::try_from(max).unwrap_or(0);
        Self {
            ring: VecDeque::with_capacity(cap),
            max,
        }
    }

    /// True if `packet` repeats a known nonce; otherwise remembers it.
    pub fn is_duplicate(&mut self, packet: &Packet, pit: &Pit) -> bool {
        let nonce = match packet.nonce() {
            Some(nonce) => nonce,
            None => return false,
        };

        if self.max < 0 {
            return pit.has_nonce(nonce);
        }
        if self.ring.iter().any(|n| n == nonce) {
            return true;
        }
        if self.max == 0 {
            return false;
        }
        if self.ring.len() as i64 >= self.max {
            self.ring.pop_back();
        }
        self.ring.push_front(nonce.clone());
        false
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}
