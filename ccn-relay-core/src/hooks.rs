//! Extension points of the forwarding engine.
//!
//! The engine owns every hook as a boxed trait object and calls it inline,
//! so hooks must never block. None of them is required: a relay without
//! hooks forwards, aggregates and caches on its own.

use bytes::Bytes;
use ccn_relay_common::types::FaceId;
use ccn_relay_common::{Packet, Prefix, Result};
use std::net::SocketAddr;

/// Transport sink the engine writes frames to.
pub trait Link {
    /// Transmits `frame` to `peer` through interface `interface`.
    ///
    /// Returning [`Error::CapacityExceeded`](ccn_relay_common::Error) leaves
    /// the frame queued on the interface for a later flush; any other error
    /// drops it.
    fn send(&mut self, interface: usize, peer: SocketAddr, frame: &Bytes) -> Result<()>;

    /// Hands a frame to the local application face.
    fn deliver_local(&mut self, frame: &Bytes);
}

/// Per-face transmit pacing.
///
/// When a face has a scheduler, enqueueing a frame only requests a send slot.
/// The embedding loop later calls [`Relay::face_clear_to_send`] for the face.
///
/// [`Relay::face_clear_to_send`]: crate::Relay::face_clear_to_send
pub trait Scheduler {
    fn request_to_send(&mut self, face: FaceId, count: usize, len: usize);
}

/// Passive observer attached to a FIB prefix.
pub trait Tap {
    /// Called for every Interest propagated under the tap's prefix.
    fn observe(&mut self, origin: Option<FaceId>, interest: &Packet);
}

/// Answer of a [`LocalProducer`].
#[derive(Debug)]
pub enum ProducerReply {
    /// Not ours, continue with the normal pipeline.
    Pass,
    /// Consumed without a reply.
    Handled,
    /// Send this Content back to the requester.
    Reply(Packet),
}

/// In-process content producer consulted before the cache.
pub trait LocalProducer {
    fn produce(&mut self, face: FaceId, interest: &Packet) -> ProducerReply;
}

/// Handler for Interests under `/ccnx/` with an empty second component.
pub trait ManagementHandler {
    /// Returns a reply frame for the requesting face, if any.
    fn handle(&mut self, face: FaceId, frame: &Bytes, prefix: &Prefix) -> Option<Bytes>;
}

/// Resolver for names carrying the NFN marker.
pub trait NfnResolver {
    /// Offered every marked Interest. A returned Content object is sent back
    /// to the requester like a cache hit.
    fn on_interest(&mut self, face: FaceId, interest: &Packet) -> Option<Packet>;

    /// Offered every marked Content object. `None` consumes it; otherwise the
    /// returned packet (possibly the same) continues through the pipeline.
    fn on_content(&mut self, face: FaceId, content: Packet) -> Option<Packet>;
}

/// Veto point for Content entering (rx) or leaving (tx) the relay.
pub trait DataHook {
    /// `false` drops the Content for this face.
    fn allow(&mut self, face: FaceId, content: &Packet) -> bool;
}

/// The optional hooks of a relay.
#[derive(Default)]
pub struct Hooks {
    pub producer: Option<Box<dyn LocalProducer>>,
    pub management: Option<Box<dyn ManagementHandler>>,
    pub nfn: Option<Box<dyn NfnResolver>>,
    pub rx: Option<Box<dyn DataHook>>,
    pub tx: Option<Box<dyn DataHook>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Link that discards everything. Useful for embedding the engine without
/// any transport.
#[derive(Debug, Default)]
pub struct NullLink;

impl Link for NullLink {
    fn send(&mut self, _interface: usize, _peer: SocketAddr, _frame: &Bytes) -> Result<()> {
        Ok(())
    }

    fn deliver_local(&mut self, _frame: &Bytes) {}
}
