//! The forwarding engine.
//!
//! A [`Relay`] owns every table and processes one event at a time: a received
//! frame, a clear-to-send from a scheduler, or an ageing tick. Nothing in here
//! blocks; transmission goes through the [`Link`] the relay was built with.

use bytes::Bytes;
use ccn_relay_common::codec::CodecRegistry;
use ccn_relay_common::metrics::RelayMetrics;
use ccn_relay_common::packet::interest_matches_content;
use ccn_relay_common::types::{ContentId, FaceId, PitId};
use ccn_relay_common::{Error, Packet, PacketKind, Prefix, Result};
use log::{debug, info, trace, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{NoRoutePolicy, RelayConfig};
use crate::cs::ContentStore;
use crate::face::{FaceTable, Interface};
use crate::fib::Fib;
use crate::hooks::{Hooks, Link, ProducerReply, Scheduler, Tap};
use crate::pit::{NonceCache, Pit};

#[cfg(test)]
mod tests;

/// What became of an Interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterestResult {
    /// Nonce seen before; dropped.
    Duplicate,
    /// Answered or consumed by the local producer.
    Produced,
    /// Handed to the management handler.
    Management,
    /// Answered by the NFN resolver.
    Computed,
    /// Answered from the content store.
    SatisfiedByCs,
    /// Joined an existing PIT entry.
    Aggregated,
    /// New PIT entry, sent on `faces` faces.
    Forwarded { faces: usize },
    /// New PIT entry, but no route matched.
    Unroutable,
    /// Scope or hop limit forbids forwarding.
    NotForwardable,
}

/// What became of a Content object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentResult {
    /// Already in the content store.
    Duplicate,
    /// Vetoed or consumed by a hook.
    Intercepted,
    /// Nobody asked for it; discarded.
    Unsolicited,
    /// Sent to `served` faces, and admitted to the cache if `cached`.
    Delivered { served: usize, cached: bool },
}

/// Result of [`Relay::process_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Interest(InterestResult),
    Content(ContentResult),
    /// Nacks from neighbours are logged and dropped.
    Nack,
}

/// Outcome of serving one Content object to the PIT.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ServeReport {
    pub served: usize,
    /// A matching entry had nobody waiting: the content was requested for
    /// the cache and is pinned there.
    pub make_static: bool,
}

pub struct Relay {
    pub(crate) config: RelayConfig,
    pub(crate) interfaces: Vec<Interface>,
    pub(crate) faces: FaceTable,
    pub(crate) fib: Fib,
    pub(crate) pit: Pit,
    pub(crate) cs: ContentStore,
    nonces: NonceCache,
    codecs: CodecRegistry,
    hooks: Hooks,
    link: Box<dyn Link>,
    pub(crate) metrics: Arc<RelayMetrics>,
}

impl Relay {
    pub fn new(config: RelayConfig, link: Box<dyn Link>) -> Self {
        let fib = Fib::new(config.max_fib_entries);
        let pit = Pit::new(config.max_pit_entries, config.interest_timeout());
        let cs = ContentStore::with_cache_size(config.cache_size);
        let nonces = NonceCache::new(config.max_nonces);
        Self {
            config,
            interfaces: Vec::new(),
            faces: FaceTable::new(),
            fib,
            pit,
            cs,
            nonces,
            codecs: CodecRegistry::default(),
            hooks: Hooks::new(),
            link,
            metrics: Arc::new(RelayMetrics::new()),
        }
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn metrics(&self) -> Arc<RelayMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn faces(&self) -> &FaceTable {
        &self.faces
    }

    pub fn fib(&self) -> &Fib {
        &self.fib
    }

    pub fn pit(&self) -> &Pit {
        &self.pit
    }

    pub fn content_store(&self) -> &ContentStore {
        &self.cs
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub(crate) fn update_gauges(&self) {
        self.metrics.pit_size.set(self.pit.len() as u64);
        self.metrics.cs_size.set(self.cs.len() as u64);
        self.metrics.fib_size.set(self.fib.len() as u64);
        self.metrics.face_count.set(self.faces.len() as u64);
    }

    /* ---------------------------------------------------------------- *
     * Interfaces and faces
     * ---------------------------------------------------------------- */

    /// Registers an interface and returns its index.
    pub fn add_interface(&mut self, bind: SocketAddr, reflect: bool, fwd_all: bool) -> usize {
        self.interfaces.push(Interface::new(
            bind,
            reflect,
            fwd_all,
            self.config.max_interface_queue,
        ));
        let idx = self.interfaces.len() - 1;
        info!("interface {} bound to {}", idx, bind);
        idx
    }

    /// The face for `peer` on `interface`, created on first contact.
    /// Without a peer this is the local application face.
    pub fn face_get_or_create(
        &mut self,
        interface: Option<usize>,
        peer: Option<SocketAddr>,
    ) -> Result<FaceId> {
        let ifc = match (interface, peer) {
            (Some(idx), Some(_)) => Some((
                idx,
                self.interfaces
                    .get(idx)
                    .ok_or_else(|| Error::NotFound(format!("interface {}", idx)))?,
            )),
            (None, Some(peer)) => {
                return Err(Error::Other(format!("peer {} without an interface", peer)))
            }
            (_, None) => None,
        };
        let (id, created) = self.faces.get_or_create(ifc, peer);
        if created {
            self.metrics.faces_created.increment();
            self.update_gauges();
        }
        Ok(id)
    }

    pub fn face_set_static(&mut self, face: FaceId, is_static: bool) -> Result<()> {
        self.faces
            .get_mut(face)
            .ok_or_else(|| Error::NotFound(format!("face {}", face)))?
            .flags
            .is_static = is_static;
        Ok(())
    }

    pub fn face_set_scheduler(
        &mut self,
        face: FaceId,
        scheduler: Option<Box<dyn Scheduler>>,
    ) -> Result<()> {
        self.faces
            .get_mut(face)
            .ok_or_else(|| Error::NotFound(format!("face {}", face)))?
            .set_scheduler(scheduler);
        Ok(())
    }

    /// Queues a frame on a face.
    ///
    /// Fails with `DuplicateSuppressed` if an identical frame is already
    /// queued there. Without a scheduler the frame is sent right away.
    pub fn face_enqueue(&mut self, face: FaceId, frame: Bytes) -> Result<()> {
        let f = self
            .faces
            .get_mut(face)
            .ok_or_else(|| Error::NotFound(format!("face {}", face)))?;
        let len = frame.len();
        if !f.push(frame) {
            return Err(Error::DuplicateSuppressed(format!(
                "frame of {} bytes already queued on face {}",
                len, face
            )));
        }
        if f.request_to_send(len) {
            trace!("[Face {}] deferred {} bytes to its scheduler", face.0, len);
            return Ok(());
        }
        self.face_clear_to_send(face)
    }

    /// Moves one queued frame from the face to its interface, or to the
    /// local application for the local face.
    pub fn face_clear_to_send(&mut self, face: FaceId) -> Result<()> {
        let f = self
            .faces
            .get_mut(face)
            .ok_or_else(|| Error::NotFound(format!("face {}", face)))?;
        let frame = match f.pop() {
            Some(frame) => frame,
            None => return Ok(()),
        };

        match (f.interface, f.peer) {
            (Some(ifndx), Some(peer)) => {
                let ifc = self
                    .interfaces
                    .get_mut(ifndx)
                    .ok_or_else(|| Error::NotFound(format!("interface {}", ifndx)))?;
                if !ifc.enqueue(peer, frame) {
                    self.metrics.frames_dropped.increment();
                }
                self.flush_interface(ifndx);
            }
            _ => {
                debug!("[Face {}] local delivery of {} bytes", face.0, frame.len());
                self.link.deliver_local(&frame);
                self.metrics.frames_sent.increment();
                self.metrics.bytes_sent.add(frame.len() as u64);
            }
        }
        Ok(())
    }

    /// Hands queued frames of one interface to the link until it pushes back.
    fn flush_interface(&mut self, ifndx: usize) {
        let Some(ifc) = self.interfaces.get_mut(ifndx) else {
            return;
        };
        while let Some(req) = ifc.front() {
            match self.link.send(ifndx, req.peer, &req.frame) {
                Ok(()) => {
                    self.metrics.frames_sent.increment();
                    self.metrics.bytes_sent.add(req.frame.len() as u64);
                }
                Err(Error::CapacityExceeded(_)) => {
                    trace!("  interface {} busy, {} queued", ifndx, ifc.queue_len());
                    break;
                }
                Err(e) => {
                    warn!("sending to {} on interface {} failed: {}", req.peer, ifndx, e);
                    self.metrics.frames_dropped.increment();
                }
            }
            ifc.pop_front();
        }
    }

    /// Retries every interface queue.
    pub fn flush_interfaces(&mut self) {
        for ifndx in 0..self.interfaces.len() {
            self.flush_interface(ifndx);
        }
    }

    /// Removes a face along with its PIT and FIB references.
    pub fn face_remove(&mut self, face: FaceId) -> Result<()> {
        let removed = self
            .faces
            .remove(face)
            .ok_or_else(|| Error::NotFound(format!("face {}", face)))?;
        let pit_gone = self.pit.purge_face(face);
        let fib_gone = self.fib.remove_face(face);
        debug!(
            "[Face {}] removed ({} queued frames dropped, {} PIT entries, {} routes)",
            face.0,
            removed.queue_len(),
            pit_gone,
            fib_gone
        );
        self.metrics.faces_removed.increment();
        self.update_gauges();
        Ok(())
    }

    /// Enqueues, treating duplicates and vanished faces as "not sent".
    fn transmit(&mut self, face: FaceId, frame: Bytes) -> Result<bool> {
        match self.face_enqueue(face, frame) {
            Ok(()) => Ok(true),
            Err(e) if e.is_benign() => {
                debug!("[Face {}] not sent: {}", face.0, e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Sends Content to a face unless the outbound hook vetoes it.
    fn send_content(&mut self, face: FaceId, content: &Packet) -> Result<bool> {
        if let Some(tx) = self.hooks.tx.as_mut() {
            if !tx.allow(face, content) {
                debug!("[Face {}] outbound hook vetoed <{}>", face.0, content.prefix);
                return Ok(false);
            }
        }
        let sent = self.transmit(face, content.buf.clone())?;
        if sent {
            self.metrics.content_sent.increment();
        }
        Ok(sent)
    }

    /* ---------------------------------------------------------------- *
     * FIB
     * ---------------------------------------------------------------- */

    pub fn fib_add(&mut self, prefix: Prefix, face: FaceId) -> Result<()> {
        if !self.faces.contains(face) {
            return Err(Error::NotFound(format!("face {}", face)));
        }
        self.fib.add(prefix, face)?;
        self.update_gauges();
        Ok(())
    }

    pub fn fib_add_tap(&mut self, prefix: Prefix, tap: Box<dyn Tap>) -> Result<()> {
        self.fib.add_tap(prefix, tap)?;
        self.update_gauges();
        Ok(())
    }

    pub fn fib_remove(&mut self, prefix: Option<&Prefix>, face: Option<FaceId>) -> Result<()> {
        let entry = self.fib.remove(prefix, face)?;
        debug!("  fib: removed <{}>", entry.prefix);
        self.update_gauges();
        Ok(())
    }

    /* ---------------------------------------------------------------- *
     * Packet processing
     * ---------------------------------------------------------------- */

    /// Receives a frame from `peer` on `interface`.
    pub fn receive(&mut self, interface: usize, peer: SocketAddr, frame: Bytes) -> Result<FrameOutcome> {
        let face = self.face_get_or_create(Some(interface), Some(peer))?;
        self.process_frame(face, frame)
    }

    /// Decodes a frame from `face` and dispatches it.
    pub fn process_frame(&mut self, face: FaceId, frame: Bytes) -> Result<FrameOutcome> {
        self.metrics.frames_received.increment();
        self.metrics.bytes_received.add(frame.len() as u64);
        trace!("[Face {}] {} bytes", face.0, frame.len());

        let packet = self.codecs.decode(frame).map_err(|e| {
            self.metrics.parse_errors.increment();
            e
        })?;
        match packet.kind {
            PacketKind::Interest => self.handle_interest(face, packet).map(FrameOutcome::Interest),
            PacketKind::Content => self.handle_content(face, packet).map(FrameOutcome::Content),
            PacketKind::Nack => {
                debug!("[Face {}] nack for <{}> ignored", face.0, packet.prefix);
                Ok(FrameOutcome::Nack)
            }
        }
    }

    fn content_matches(&self, interest: &Packet, content: &Packet) -> bool {
        match self.codecs.get(interest.suite()) {
            Ok(codec) => codec.matches_content(interest, content),
            Err(_) => interest_matches_content(interest, content),
        }
    }

    pub fn handle_interest(&mut self, face: FaceId, packet: Packet) -> Result<InterestResult> {
        let started = Instant::now();
        let result = self.interest_pipeline(face, packet, started);
        self.metrics
            .interest_processing_time
            .observe_duration(started.elapsed());
        result
    }

    /// Holds an Interest on behalf of the relay itself. The PIT entry has
    /// no origin and no pending face; Content satisfying it is cached as
    /// static.
    pub fn express_interest(&mut self, packet: Packet) -> Result<PitId> {
        if !packet.is_interest() {
            return Err(Error::Parse(format!("<{}> is not an interest", packet.prefix)));
        }
        debug!("local interest=<{}> {}", packet.prefix, packet.suite());

        let id = match self.pit.find_same(&packet) {
            Some(id) => id,
            None => {
                let id = self.pit.insert(None, packet, Instant::now())?;
                self.metrics.pit_inserts.increment();
                self.update_gauges();
                id
            }
        };
        self.propagate(id)?;
        Ok(id)
    }

    fn interest_pipeline(
        &mut self,
        face: FaceId,
        packet: Packet,
        now: Instant,
    ) -> Result<InterestResult> {
        if !self.faces.contains(face) {
            return Err(Error::NotFound(format!("face {}", face)));
        }
        self.metrics.interests_received.increment();
        info!(
            "incoming interest=<{}> {} from face={}",
            packet.prefix,
            packet.suite(),
            face.0
        );

        if self.nonces.is_duplicate(&packet, &self.pit) {
            debug!("  dropped because of duplicate nonce");
            self.metrics.interests_duplicate.increment();
            return Ok(InterestResult::Duplicate);
        }

        if let Some(producer) = self.hooks.producer.as_mut() {
            match producer.produce(face, &packet) {
                ProducerReply::Pass => {}
                ProducerReply::Handled => return Ok(InterestResult::Produced),
                ProducerReply::Reply(content) => {
                    self.send_content(face, &content)?;
                    return Ok(InterestResult::Produced);
                }
            }
        }

        if is_management(&packet.prefix) {
            let reply = match self.hooks.management.as_mut() {
                Some(handler) => handler.handle(face, &packet.buf, &packet.prefix),
                None => {
                    debug!("  no management handler for <{}>", packet.prefix);
                    None
                }
            };
            if let Some(reply) = reply {
                self.transmit(face, reply)?;
            }
            return Ok(InterestResult::Management);
        }

        if packet.prefix.is_nfn() {
            if let Some(nfn) = self.hooks.nfn.as_mut() {
                if let Some(result) = nfn.on_interest(face, &packet) {
                    self.send_content(face, &result)?;
                    return Ok(InterestResult::Computed);
                }
            }
        }

        let hit = self
            .cs
            .find_match(&packet, |i, c| self.content_matches(i, c));
        if let Some(id) = hit {
            self.metrics.cs_hits.increment();
            let content = match self.cs.get_mut(id) {
                Some(entry) => {
                    entry.last_used = now;
                    entry.served_count += 1;
                    entry.packet.clone()
                }
                None => return Err(Error::NotFound(format!("content {}", id))),
            };
            debug!("  found matching content <{}>", content.prefix);
            self.send_content(face, &content)?;
            return Ok(InterestResult::SatisfiedByCs);
        }
        self.metrics.cs_misses.increment();

        let existing = self.pit.find_same(&packet);
        if !packet.forward_ok() {
            debug!("  not forwarding <{}>: scope or hop limit", packet.prefix);
            self.metrics.interests_not_forwardable.increment();
            return Ok(InterestResult::NotForwardable);
        }

        let (id, is_new) = match existing {
            Some(id) => (id, false),
            None => {
                let id = self.pit.insert(Some(face), packet, now)?;
                self.metrics.pit_inserts.increment();
                self.update_gauges();
                (id, true)
            }
        };
        self.pit.append_pending(id, face, now)?;

        let fwd_all = self.faces.get(face).map_or(false, |f| f.flags.fwd_all);
        if !is_new && !fwd_all {
            debug!("  aggregated into {}", id);
            self.metrics.interests_aggregated.increment();
            return Ok(InterestResult::Aggregated);
        }

        let (sent, routed) = self.forward(id)?;
        if !is_new {
            self.metrics.interests_aggregated.increment();
            return Ok(InterestResult::Aggregated);
        }
        Ok(if routed || sent > 0 {
            InterestResult::Forwarded { faces: sent }
        } else {
            InterestResult::Unroutable
        })
    }

    /// Sends a PIT entry's Interest on every matching route, or applies the
    /// no-route policy. Returns the number of faces it was enqueued on.
    pub fn propagate(&mut self, id: PitId) -> Result<usize> {
        self.forward(id).map(|(sent, _)| sent)
    }

    /// Like [`Relay::propagate`], also telling whether any route (a tap
    /// included) matched.
    fn forward(&mut self, id: PitId) -> Result<(usize, bool)> {
        let (packet, origin) = match self.pit.get(id) {
            Some(entry) => (entry.packet.clone(), entry.from),
            None => return Err(Error::NotFound(format!("PIT entry {}", id))),
        };
        let origin_reflects = origin
            .and_then(|f| self.faces.get(f))
            .map_or(false, |f| f.flags.reflect);

        let mut matched = false;
        let mut targets = Vec::new();
        for idx in self.fib.matching(&packet) {
            let Some(route) = self.fib.entry_mut(idx) else {
                continue;
            };
            if route.face.is_some() && route.face == origin && !origin_reflects {
                trace!("  not sending back to origin {:?}", origin);
                continue;
            }
            matched = true;
            if let Some(tap) = route.tap.as_mut() {
                tap.observe(origin, &packet);
            }
            if let Some(face) = route.face {
                targets.push(face);
            }
        }

        let mut sent = 0;
        for face in targets {
            debug!("[Face {}] forwarding interest <{}>", face.0, packet.prefix);
            if self.transmit(face, packet.buf.clone())? {
                sent += 1;
            }
        }

        if !matched {
            sent += self.no_route(id, &packet, origin)?;
        }
        self.metrics.interests_forwarded.add(sent as u64);
        Ok((sent, matched))
    }

    fn no_route(&mut self, id: PitId, packet: &Packet, origin: Option<FaceId>) -> Result<usize> {
        match self.config.no_route {
            NoRoutePolicy::Drop => {
                debug!("  no route for <{}>", packet.prefix);
                Ok(0)
            }
            NoRoutePolicy::Broadcast => {
                let targets: Vec<FaceId> = self
                    .faces
                    .iter()
                    .filter(|f| !f.is_local() && Some(f.id) != origin)
                    .map(|f| f.id)
                    .collect();
                let mut sent = 0;
                for face in targets {
                    if self.transmit(face, packet.buf.clone())? {
                        sent += 1;
                    }
                }
                debug!("  no route for <{}>, broadcast to {} faces", packet.prefix, sent);
                Ok(sent)
            }
            NoRoutePolicy::Nack => {
                if let Some(origin) = origin {
                    let nack = match self.codecs.get(packet.suite()) {
                        Ok(codec) => codec.encode_nack(packet)?,
                        Err(_) => None,
                    };
                    if let Some(nack) = nack {
                        debug!("[Face {}] nack for <{}>", origin.0, packet.prefix);
                        if self.transmit(origin, nack)? {
                            self.metrics.nacks_sent.increment();
                        }
                    }
                }
                self.pit.remove(id);
                self.update_gauges();
                Ok(0)
            }
        }
    }

    pub fn handle_content(&mut self, face: FaceId, packet: Packet) -> Result<ContentResult> {
        if !self.faces.contains(face) {
            return Err(Error::NotFound(format!("face {}", face)));
        }
        self.metrics.content_received.increment();
        info!(
            "incoming data=<{}> {} from face={}",
            packet.prefix,
            packet.suite(),
            face.0
        );

        if self.cs.lookup(&packet.prefix).is_some() {
            debug!("  content is dup, ignoring");
            self.metrics.content_duplicate.increment();
            return Ok(ContentResult::Duplicate);
        }

        if let Some(rx) = self.hooks.rx.as_mut() {
            if !rx.allow(face, &packet) {
                debug!("  inbound hook vetoed <{}>", packet.prefix);
                return Ok(ContentResult::Intercepted);
            }
        }

        let mut packet = packet;
        if packet.prefix.is_nfn() {
            if let Some(nfn) = self.hooks.nfn.as_mut() {
                packet = match nfn.on_content(face, packet) {
                    Some(packet) => packet,
                    None => return Ok(ContentResult::Intercepted),
                };
            }
        }

        let now = Instant::now();
        let report = self.serve_pending(&packet)?;
        if report.served == 0 {
            debug!("  removed because no matching interest");
            self.metrics.content_unsolicited.increment();
            return Ok(ContentResult::Unsolicited);
        }

        let name = packet.prefix.clone();
        let mut cached = false;
        if self.cs.enabled() {
            match self.cs_insert(packet, report.make_static, now) {
                Ok(id) => {
                    if let Some(entry) = self.cs.get_mut(id) {
                        entry.served_count = report.served as u64;
                    }
                    cached = true;
                }
                Err(e @ (Error::CapacityExceeded(_) | Error::DuplicateSuppressed(_))) => {
                    debug!("  not cached: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        if self.config.no_route == NoRoutePolicy::Broadcast && name.chunknum().is_some() {
            let route = name.truncated(name.len().saturating_sub(1));
            debug!("  learning route <{}> via face {}", route, face.0);
            if let Err(e) = self.fib_add(route, face) {
                debug!("  route not learned: {}", e);
            }
        }

        Ok(ContentResult::Delivered {
            served: report.served,
            cached,
        })
    }

    /// Delivers `content` to every PIT entry it satisfies, once per face,
    /// and removes those entries.
    pub(crate) fn serve_pending(&mut self, content: &Packet) -> Result<ServeReport> {
        for face in self.faces.iter_mut() {
            face.flags.served = false;
        }

        let mut report = ServeReport::default();
        for id in self.pit.ids() {
            let matches = self
                .pit
                .get(id)
                .map_or(false, |e| self.content_matches(&e.packet, content));
            if !matches {
                continue;
            }
            let Some(entry) = self.pit.remove(id) else {
                continue;
            };

            if entry.pending.is_empty() {
                debug!("  {} had no pending faces, pinning <{}>", id, content.prefix);
                report.make_static = true;
                report.served += 1;
                continue;
            }

            for pending in entry.pending {
                match self.faces.get_mut(pending.face) {
                    Some(f) if !f.flags.served => f.flags.served = true,
                    _ => continue,
                }
                debug!("[Face {}] forwarding content <{}>", pending.face.0, content.prefix);
                if self.send_content(pending.face, content)? {
                    report.served += 1;
                }
            }
        }
        trace!("  served <{}> to {} faces", content.prefix, report.served);
        self.update_gauges();
        Ok(report)
    }

    /* ---------------------------------------------------------------- *
     * Content store
     * ---------------------------------------------------------------- */

    fn cs_insert(&mut self, packet: Packet, is_static: bool, now: Instant) -> Result<ContentId> {
        let admission = self.cs.add(packet, is_static, now)?;
        self.metrics.cs_inserts.increment();
        if admission.evicted.is_some() {
            self.metrics.cs_evictions.increment();
        }
        self.update_gauges();
        Ok(admission.id)
    }

    /// Adds Content to the cache, then serves any Interests waiting for it.
    pub fn cs_add(&mut self, packet: Packet, is_static: bool) -> Result<ContentId> {
        if !packet.is_content() {
            return Err(Error::Parse(format!("<{}> is not a content object", packet.prefix)));
        }
        let now = Instant::now();
        let content = packet.clone();
        let id = self.cs_insert(packet, is_static, now)?;
        let report = self.serve_pending(&content)?;
        if let Some(entry) = self.cs.get_mut(id) {
            entry.served_count += report.served as u64;
            entry.is_static |= report.make_static;
        }
        Ok(id)
    }

    pub fn cs_remove(&mut self, id: ContentId) -> Result<Packet> {
        let entry = self
            .cs
            .remove(id)
            .ok_or_else(|| Error::NotFound(format!("content {}", id)))?;
        self.update_gauges();
        Ok(entry.packet)
    }

    /// Looks cached content up by display path.
    pub fn cs_lookup(&self, path: &str) -> Option<&Packet> {
        self.cs
            .lookup_path(path)
            .and_then(|id| self.cs.get(id))
            .map(|e| &e.packet)
    }
}

/// `/ccnx/` followed by an empty component and a command.
fn is_management(prefix: &Prefix) -> bool {
    prefix.len() >= 3
        && prefix.component_value(0) == Some(&b"ccnx"[..])
        && prefix.component_value(1) == Some(&b""[..])
}
