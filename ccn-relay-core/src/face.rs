//! Faces and the interfaces they transmit through.

use bytes::Bytes;
use ccn_relay_common::types::FaceId;
use log::debug;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

use crate::hooks::Scheduler;

/// Per-face flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaceFlags {
    /// Never aged out.
    pub is_static: bool,
    /// Interests may be forwarded back to this face (wireless media).
    pub reflect: bool,
    /// Propagate every Interest from this face, even aggregated ones.
    pub fwd_all: bool,
    /// Already received the Content being served this round.
    pub served: bool,
}

/// A neighbour, reached through one interface at one peer address, or the
/// local application when it has neither.
pub struct Face {
    pub id: FaceId,
    pub interface: Option<usize>,
    pub peer: Option<SocketAddr>,
    pub flags: FaceFlags,
    pub last_used: Instant,
    outq: VecDeque<Bytes>,
    scheduler: Option<Box<dyn Scheduler>>,
}

impl Face {
    fn new(id: FaceId, interface: Option<usize>, peer: Option<SocketAddr>) -> Self {
        Self {
            id,
            interface,
            peer,
            flags: FaceFlags::default(),
            last_used: Instant::now(),
            outq: VecDeque::new(),
            scheduler: None,
        }
    }

    /// True for the local application face.
    pub fn is_local(&self) -> bool {
        self.interface.is_none()
    }

    pub fn queue_len(&self) -> usize {
        self.outq.len()
    }

    pub fn has_scheduler(&self) -> bool {
        self.scheduler.is_some()
    }

    pub fn set_scheduler(&mut self, scheduler: Option<Box<dyn Scheduler>>) {
        self.scheduler = scheduler;
    }

    /// Appends `frame` unless a byte-identical frame is already queued.
    /// Returns whether it was queued.
    pub(crate) fn push(&mut self, frame: Bytes) -> bool {
        if self.outq.iter().any(|queued| queued == &frame) {
            debug!("[Face {}] not enqueued because already there", self.id.0);
            return false;
        }
        self.outq.push_back(frame);
        true
    }

    pub(crate) fn pop(&mut self) -> Option<Bytes> {
        self.outq.pop_front()
    }

    /// Asks the scheduler for a send slot. `false` when there is no
    /// scheduler and the caller must send immediately.
    pub(crate) fn request_to_send(&mut self, len: usize) -> bool {
        match self.scheduler.as_mut() {
            Some(scheduler) => {
                scheduler.request_to_send(self.id, 1, len);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Face")
            .field("id", &self.id)
            .field("interface", &self.interface)
            .field("peer", &self.peer)
            .field("flags", &self.flags)
            .field("queued", &self.outq.len())
            .field("scheduled", &self.scheduler.is_some())
            .finish()
    }
}

/// A transmit request waiting on an interface.
#[derive(Debug, Clone)]
pub struct TxRequest {
    pub peer: SocketAddr,
    pub frame: Bytes,
}

/// A local endpoint (socket) with its bounded transmit queue.
#[derive(Debug)]
pub struct Interface {
    pub bind: SocketAddr,
    /// Default reflect flag for faces created on this interface.
    pub reflect: bool,
    /// Default forward-all flag for faces created on this interface.
    pub fwd_all: bool,
    queue: VecDeque<TxRequest>,
    max_queue: usize,
}

impl Interface {
    pub fn new(bind: SocketAddr, reflect: bool, fwd_all: bool, max_queue: usize) -> Self {
        Self {
            bind,
            reflect,
            fwd_all,
            queue: VecDeque::with_capacity(max_queue),
            max_queue,
        }
    }

    /// Queues a frame; `false` when the queue is full and the frame dropped.
    pub(crate) fn enqueue(&mut self, peer: SocketAddr, frame: Bytes) -> bool {
        if self.queue.len() >= self.max_queue {
            debug!("  DROPPING {} bytes to {} (qlen={})", frame.len(), peer, self.queue.len());
            return false;
        }
        self.queue.push_back(TxRequest { peer, frame });
        true
    }

    pub(crate) fn front(&self) -> Option<&TxRequest> {
        self.queue.front()
    }

    pub(crate) fn pop_front(&mut self) -> Option<TxRequest> {
        self.queue.pop_front()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

/// All faces of a relay, keyed by id.
#[derive(Debug, Default)]
pub struct FaceTable {
    faces: BTreeMap<FaceId, Face>,
    seq: u32,
}

impl FaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds the face for `(interface, peer)`, refreshing its last-used
    /// time, or creates one. `peer == None` selects the local face.
    ///
    /// Returns the id and whether the face was created.
    pub fn get_or_create(
        &mut self,
        interface: Option<(usize, &Interface)>,
        peer: Option<SocketAddr>,
    ) -> (FaceId, bool) {
        let ifndx = interface.map(|(i, _)| i);
        let existing = self.faces.values_mut().find(|f| match peer {
            None => f.is_local(),
            Some(_) => f.peer == peer && f.interface == ifndx,
        });
        if let Some(face) = existing {
            face.last_used = Instant::now();
            return (face.id, false);
        }

        self.seq += 1;
        let id = FaceId(self.seq);
        let mut face = match peer {
            Some(_) => Face::new(id, ifndx, peer),
            None => Face::new(id, None, None),
        };
        if let (Some((_, ifc)), Some(_)) = (interface, peer) {
            face.flags.reflect = ifc.reflect;
            face.flags.fwd_all = ifc.fwd_all;
        }
        debug!(
            "[Face {}] created on interface {:?} for {}",
            id.0,
            face.interface,
            peer.map_or_else(|| "(local)".to_string(), |p| p.to_string())
        );
        self.faces.insert(id, face);
        (id, true)
    }

    pub fn get(&self, id: FaceId) -> Option<&Face> {
        self.faces.get(&id)
    }

    pub fn get_mut(&mut self, id: FaceId) -> Option<&mut Face> {
        self.faces.get_mut(&id)
    }

    pub fn contains(&self, id: FaceId) -> bool {
        self.faces.contains_key(&id)
    }

    /// Unlinks the face; its queue is dropped with it.
    pub fn remove(&mut self, id: FaceId) -> Option<Face> {
        self.faces.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Face> {
        self.faces.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Face> {
        self.faces.values_mut()
    }

    pub fn ids(&self) -> Vec<FaceId> {
        self.faces.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}
