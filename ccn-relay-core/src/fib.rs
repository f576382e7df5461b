//! Forwarding Information Base.

use ccn_relay_common::types::FaceId;
use ccn_relay_common::{Error, MatchMode, Packet, Prefix, PrefixMatch, Result};
use log::{debug, trace};
use std::fmt;

use crate::hooks::Tap;

/// A route: prefix towards a face, an observer, or both.
pub struct FibEntry {
    pub prefix: Prefix,
    pub face: Option<FaceId>,
    pub tap: Option<Box<dyn Tap>>,
}

impl FibEntry {
    /// True when every component of the route prefix leads the Interest name.
    pub fn matches(&self, name: &Prefix) -> bool {
        if self.prefix.suite() != name.suite() {
            return false;
        }
        let result = self.prefix.compare(0, name, MatchMode::Longest);
        trace!("  fib <{}> vs <{}>: {:?}", self.prefix, name, result);
        match result {
            PrefixMatch::Leading(n) => n == self.prefix.len(),
            PrefixMatch::Exact => true,
            PrefixMatch::Mismatch => false,
        }
    }
}

impl fmt::Debug for FibEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FibEntry")
            .field("prefix", &self.prefix.to_string())
            .field("face", &self.face)
            .field("tap", &self.tap.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct Fib {
    entries: Vec<FibEntry>,
    max_entries: usize,
}

impl Fib {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
        }
    }

    fn position_exact(&self, prefix: &Prefix) -> Option<usize> {
        self.entries.iter().position(|e| {
            e.prefix.suite() == prefix.suite()
                && e.prefix.compare(0, prefix, MatchMode::Exact) == PrefixMatch::Exact
        })
    }

    fn push(&mut self, entry: FibEntry) -> Result<()> {
        if self.entries.len() >= self.max_entries {
            return Err(Error::CapacityExceeded(format!(
                "FIB holds {} entries",
                self.max_entries
            )));
        }
        debug!("  fib: adding route for <{}>", entry.prefix);
        self.entries.push(entry);
        Ok(())
    }

    /// Routes `prefix` towards `face`. An equal prefix keeps its tap and
    /// gets the new face.
    pub fn add(&mut self, prefix: Prefix, face: FaceId) -> Result<()> {
        if let Some(idx) = self.position_exact(&prefix) {
            debug!("  fib: route for <{}> now via {}", prefix, face);
            self.entries[idx].face = Some(face);
            return Ok(());
        }
        self.push(FibEntry {
            prefix,
            face: Some(face),
            tap: None,
        })
    }

    /// Registers an observer for Interests under `prefix`, next to any face
    /// already routed there.
    pub fn add_tap(&mut self, prefix: Prefix, tap: Box<dyn Tap>) -> Result<()> {
        if let Some(idx) = self.position_exact(&prefix) {
            debug!("  fib: tap set on <{}>", prefix);
            self.entries[idx].tap = Some(tap);
            return Ok(());
        }
        self.push(FibEntry {
            prefix,
            face: None,
            tap: Some(tap),
        })
    }

    /// Removes the first entry passing both optional filters.
    pub fn remove(&mut self, prefix: Option<&Prefix>, face: Option<FaceId>) -> Result<FibEntry> {
        let idx = self
            .entries
            .iter()
            .position(|e| {
                let prefix_ok = prefix.map_or(true, |p| {
                    e.prefix.suite() == p.suite()
                        && e.prefix.compare(0, p, MatchMode::Exact) == PrefixMatch::Exact
                });
                prefix_ok && face.map_or(true, |f| e.face == Some(f))
            })
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "no route for {} via {:?}",
                    prefix.map_or_else(|| "*".to_string(), |p| p.to_string()),
                    face
                ))
            })?;
        Ok(self.entries.remove(idx))
    }

    /// Deletes every route through `face`; returns how many went.
    ///
    /// A route that also carries a tap keeps the tap and loses the face.
    pub fn remove_face(&mut self, face: FaceId) -> usize {
        let mut removed = 0;
        self.entries.retain_mut(|e| {
            if e.face != Some(face) {
                return true;
            }
            removed += 1;
            e.face = None;
            e.tap.is_some()
        });
        removed
    }

    /// Indices of every entry matching the Interest.
    pub fn matching(&self, interest: &Packet) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.matches(&interest.prefix))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn entry(&self, idx: usize) -> Option<&FibEntry> {
        self.entries.get(idx)
    }

    pub(crate) fn entry_mut(&mut self, idx: usize) -> Option<&mut FibEntry> {
        self.entries.get_mut(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FibEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
