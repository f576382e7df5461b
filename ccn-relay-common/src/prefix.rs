//! Names (prefixes) and the comparison rules every table relies on.
//!
//! A [`Prefix`] keeps each component in the form it has on the wire for its
//! suite. For CCNx 2015 that includes the 4-byte type/length header of every
//! name segment, so components compare byte-for-byte and re-serialize without
//! a second pass. NDN and CCNB components hold the raw value bytes.

use bytes::{BufMut, Bytes, BytesMut};
use log::trace;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::Error;
use crate::tlv::{self, CCNX_TLV_N_CHUNK, CCNX_TLV_N_NAME_SEGMENT, NDN_MARKER_SEGMENT};
use crate::types::{Suite, MAX_NAME_COMPONENTS};
use crate::Result;

/// Component value that marks a name as a named-function expression.
pub const NFN_MARKER: &[u8] = b"NFN";

/// How two names are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Same suite, same components, same chunk number.
    Exact,
    /// Count of leading components the names share.
    Match,
    /// Same as [`MatchMode::Match`]; used for longest-prefix routing.
    Longest,
}

/// Result of [`Prefix::compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixMatch {
    /// Suites differ, or an exact comparison failed.
    Mismatch,
    /// Both names are identical.
    Exact,
    /// Number of leading components both names share.
    Leading(usize),
}

impl PrefixMatch {
    /// Number of shared leading components, if any comparison succeeded.
    pub fn leading(&self) -> Option<usize> {
        match self {
            PrefixMatch::Leading(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, PrefixMatch::Exact)
    }
}

/// A hierarchical name: suite tag, ordered components, optional chunk number.
#[derive(Debug, Clone)]
pub struct Prefix {
    suite: Suite,
    components: Vec<Bytes>,
    capacity: usize,
    chunknum: Option<u32>,
    nfn: bool,
}

impl Prefix {
    /// Creates an empty prefix with room for `capacity` components.
    pub fn new(suite: Suite, capacity: usize) -> Result<Self> {
        if capacity > MAX_NAME_COMPONENTS {
            return Err(Error::CapacityExceeded(format!(
                "prefix capacity {} exceeds the maximum of {} components",
                capacity, MAX_NAME_COMPONENTS
            )));
        }
        let mut components = Vec::new();
        components
            .try_reserve_exact(capacity)
            .map_err(|e| Error::Allocation(format!("prefix components: {}", e)))?;

        Ok(Self {
            suite,
            components,
            capacity,
            chunknum: None,
            nfn: false,
        })
    }

    /// Parses a `/`-separated, percent-escaped URI.
    ///
    /// A leading `/` is optional and a trailing one is ignored; empty inner
    /// components are kept, so `/ccnx//status` has three components. `extra`
    /// is appended as one more component and `chunknum` adds a chunk
    /// component in the suite's encoding.
    pub fn from_uri(
        uri: &str,
        suite: Suite,
        extra: Option<&[u8]>,
        chunknum: Option<u32>,
    ) -> Result<Self> {
        let path = uri.strip_prefix('/').unwrap_or(uri);
        let mut values = Vec::new();
        if !path.is_empty() {
            let path = path.strip_suffix('/').unwrap_or(path);
            for part in path.split('/') {
                values.push(unescape_component(part)?);
            }
        }
        if let Some(extra) = extra {
            values.push(extra.to_vec());
        }

        let needed = values.len() + usize::from(chunknum.is_some());
        if needed > MAX_NAME_COMPONENTS {
            return Err(Error::Parse(format!(
                "URI '{}' has {} components, at most {} are allowed",
                uri, needed, MAX_NAME_COMPONENTS
            )));
        }

        let mut prefix = Self::new(suite, MAX_NAME_COMPONENTS)?;
        for value in &values {
            prefix.append_component(value)?;
        }
        if let Some(chunk) = chunknum {
            prefix.add_chunk_num(chunk)?;
        }

        trace!("URI <{}> parsed as {} ({} components)", uri, prefix, prefix.len());
        Ok(prefix)
    }

    /// Shorthand for [`Prefix::from_uri`] without extras.
    pub fn parse(uri: &str, suite: Suite) -> Result<Self> {
        Self::from_uri(uri, suite, None, None)
    }

    /// Builds a prefix from components already framed for `suite`.
    pub fn from_wire_components(suite: Suite, components: Vec<Bytes>) -> Result<Self> {
        if components.len() > MAX_NAME_COMPONENTS {
            return Err(Error::Parse(format!(
                "name has {} components, at most {} are allowed",
                components.len(),
                MAX_NAME_COMPONENTS
            )));
        }
        Ok(Self {
            suite,
            components,
            capacity: MAX_NAME_COMPONENTS,
            chunknum: None,
            nfn: false,
        })
    }

    /// Deep copy: the result shares no byte storage with `self`.
    pub fn duplicate(&self) -> Self {
        Self {
            suite: self.suite,
            components: self
                .components
                .iter()
                .map(|c| Bytes::copy_from_slice(c))
                .collect(),
            capacity: self.capacity,
            chunknum: self.chunknum,
            nfn: self.nfn,
        }
    }

    /// Appends one component, framing `value` for the suite.
    pub fn append_component(&mut self, value: &[u8]) -> Result<()> {
        let framed = frame_component(self.suite, CCNX_TLV_N_NAME_SEGMENT, value)?;
        self.push_wire_component(framed)
    }

    /// Appends a component that is already in wire form.
    pub fn push_wire_component(&mut self, component: Bytes) -> Result<()> {
        if self.components.len() >= self.capacity {
            return Err(Error::CapacityExceeded(format!(
                "prefix {} already holds {} components",
                self, self.capacity
            )));
        }
        self.components.push(component);
        Ok(())
    }

    /// Appends a chunk component for `chunk` and records the chunk number.
    pub fn add_chunk_num(&mut self, chunk: u32) -> Result<()> {
        let component = match self.suite {
            Suite::CcnTlv => {
                frame_component(self.suite, CCNX_TLV_N_CHUNK, &tlv::minimal_be_bytes(chunk as u64))?
            }
            Suite::NdnTlv | Suite::Ccnb => {
                let mut value = BytesMut::with_capacity(5);
                value.put_u8(NDN_MARKER_SEGMENT);
                value.extend_from_slice(&tlv::minimal_be_bytes(chunk as u64));
                value.freeze()
            }
        };
        self.push_wire_component(component)?;
        self.chunknum = Some(chunk);
        Ok(())
    }

    /// Compares `self` (ignoring its first `skip` components) against `other`.
    pub fn compare(&self, skip: usize, other: &Prefix, mode: MatchMode) -> PrefixMatch {
        self.compare_parts(skip, None, other, mode)
    }

    /// Like [`Prefix::compare`], with `digest` appended to `self` as an
    /// implicit final component.
    pub fn compare_with_digest(&self, digest: &[u8], other: &Prefix, mode: MatchMode) -> PrefixMatch {
        self.compare_parts(0, Some(digest), other, mode)
    }

    fn compare_parts(
        &self,
        skip: usize,
        digest: Option<&[u8]>,
        other: &Prefix,
        mode: MatchMode,
    ) -> PrefixMatch {
        if self.suite != other.suite {
            trace!("prefix_cmp: suite mismatch ({} / {})", self.suite, other.suite);
            return PrefixMatch::Mismatch;
        }

        let own = &self.components[skip.min(self.components.len())..];
        let own_len = own.len() + usize::from(digest.is_some());

        if mode == MatchMode::Exact
            && (own_len != other.len() || self.chunknum != other.chunknum || self.nfn != other.nfn)
        {
            return PrefixMatch::Mismatch;
        }

        let mut ours = own.iter().map(|c| c.as_ref()).chain(digest);
        let mut matched = 0;
        for theirs in &other.components {
            match ours.next() {
                Some(mine) if mine == theirs.as_ref() => matched += 1,
                Some(_) => {
                    trace!("prefix_cmp: component mismatch at {}", matched);
                    return match mode {
                        MatchMode::Exact => PrefixMatch::Mismatch,
                        _ => PrefixMatch::Leading(matched),
                    };
                }
                None => break,
            }
        }

        trace!(
            "prefix_cmp(mode={:?}) prefix=<{}> name=<{}> matchlen={}",
            mode, self, other, matched
        );
        match mode {
            MatchMode::Exact => PrefixMatch::Exact,
            _ => PrefixMatch::Leading(matched),
        }
    }

    /// True when every component of `self` leads `other`.
    pub fn is_prefix_of(&self, other: &Prefix) -> bool {
        self.compare(0, other, MatchMode::Longest) == PrefixMatch::Leading(self.len())
    }

    /// Copy of the first `len` components, without chunk number.
    pub fn truncated(&self, len: usize) -> Self {
        Self {
            suite: self.suite,
            components: self.components.iter().take(len).cloned().collect(),
            capacity: self.capacity,
            chunknum: None,
            nfn: self.nfn,
        }
    }

    pub fn suite(&self) -> Suite {
        self.suite
    }

    /// Returns the number of components in the name.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns true if the name has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn chunknum(&self) -> Option<u32> {
        self.chunknum
    }

    pub fn set_chunknum(&mut self, chunknum: Option<u32>) {
        self.chunknum = chunknum;
    }

    /// Whether the name carries the NFN marker.
    pub fn is_nfn(&self) -> bool {
        self.nfn
    }

    pub fn set_nfn(&mut self, nfn: bool) {
        self.nfn = nfn;
    }

    /// Removes a trailing NFN marker component and sets the NFN flag instead.
    pub fn strip_nfn_marker(&mut self) -> bool {
        let marked = self
            .len()
            .checked_sub(1)
            .and_then(|last| self.component_value(last))
            .map_or(false, |v| v == NFN_MARKER);
        if marked {
            self.components.pop();
            self.nfn = true;
        }
        marked
    }

    /// Wire form of the component at `index`.
    pub fn component(&self, index: usize) -> Option<&Bytes> {
        self.components.get(index)
    }

    /// Returns an iterator over the wire-form components.
    pub fn components(&self) -> impl Iterator<Item = &Bytes> {
        self.components.iter()
    }

    /// Component at `index` with any suite framing removed.
    pub fn component_value(&self, index: usize) -> Option<&[u8]> {
        let component = self.components.get(index)?;
        Some(match self.suite {
            Suite::CcnTlv if component.len() >= tlv::CCNX_TL_LEN => &component[tlv::CCNX_TL_LEN..],
            _ => &component[..],
        })
    }

    /// Components as they go on the wire, NFN marker included.
    pub fn wire_components(&self) -> Result<Vec<Bytes>> {
        let mut components = self.components.clone();
        if self.nfn {
            components.push(frame_component(self.suite, CCNX_TLV_N_NAME_SEGMENT, NFN_MARKER)?);
        }
        Ok(components)
    }

    /// Human-readable, percent-escaped path. Never used for matching.
    pub fn to_display_path(&self) -> String {
        self.to_string()
    }
}

impl PartialEq for Prefix {
    fn eq(&self, other: &Self) -> bool {
        self.suite == other.suite
            && self.components == other.components
            && self.chunknum == other.chunknum
            && self.nfn == other.nfn
    }
}

impl Eq for Prefix {}

impl Hash for Prefix {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.suite.hash(state);
        self.components.hash(state);
        self.chunknum.hash(state);
        self.nfn.hash(state);
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return write!(f, "/");
        }

        for index in 0..self.components.len() {
            f.write_str("/")?;
            for &b in self.component_value(index).unwrap_or_default() {
                if b < 0x20 || b == 0x7f || b == b'/' || b == b'%' || !b.is_ascii() {
                    write!(f, "%{:02x}", b)?;
                } else {
                    write!(f, "{}", b as char)?;
                }
            }
        }
        Ok(())
    }
}

/// Wraps `value` in the suite's per-component framing.
fn frame_component(suite: Suite, ccnx_type: u16, value: &[u8]) -> Result<Bytes> {
    match suite {
        Suite::CcnTlv => {
            let mut buf = BytesMut::with_capacity(tlv::CCNX_TL_LEN + value.len());
            tlv::put_ccnx_tl(&mut buf, ccnx_type, value.len())?;
            buf.extend_from_slice(value);
            Ok(buf.freeze())
        }
        Suite::NdnTlv | Suite::Ccnb => Ok(Bytes::copy_from_slice(value)),
    }
}

/// Decodes `%xx` escapes in one URI component.
fn unescape_component(part: &str) -> Result<Vec<u8>> {
    let bytes = part.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 3 <= bytes.len() {
            let hex = part.get(i + 1..i + 3).ok_or_else(|| {
                Error::Parse(format!("invalid escape in component '{}'", part))
            })?;
            let value = u8::from_str_radix(hex, 16).map_err(|_| {
                Error::Parse(format!("invalid escape '%{}' in component '{}'", hex, part))
            })?;
            out.push(value);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}
