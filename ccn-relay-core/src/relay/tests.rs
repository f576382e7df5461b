use super::*;
use crate::hooks::{DataHook, LocalProducer, ManagementHandler, NfnResolver, NullLink};
use ccn_relay_common::codec::{Codec, NdnTlvCodec};
use ccn_relay_common::packet::Details;
use ccn_relay_common::Suite;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

/* ---------------------------------------------------------------- *
 * Test harness
 * ---------------------------------------------------------------- */

type Sent = Rc<RefCell<Vec<(usize, SocketAddr, Bytes)>>>;

#[derive(Default, Clone)]
struct RecordingLink {
    sent: Sent,
    local: Rc<RefCell<Vec<Bytes>>>,
    busy: Rc<Cell<bool>>,
}

impl Link for RecordingLink {
    fn send(&mut self, interface: usize, peer: SocketAddr, frame: &Bytes) -> Result<()> {
        if self.busy.get() {
            return Err(Error::CapacityExceeded("socket busy".into()));
        }
        self.sent.borrow_mut().push((interface, peer, frame.clone()));
        Ok(())
    }

    fn deliver_local(&mut self, frame: &Bytes) {
        self.local.borrow_mut().push(frame.clone());
    }
}

impl RecordingLink {
    fn frames_to(&self, peer: SocketAddr) -> Vec<Bytes> {
        self.sent
            .borrow()
            .iter()
            .filter(|(_, p, _)| *p == peer)
            .map(|(_, _, f)| f.clone())
            .collect()
    }

    fn total(&self) -> usize {
        self.sent.borrow().len()
    }
}

struct Harness {
    relay: Relay,
    link: RecordingLink,
    ifc: usize,
}

impl Harness {
    fn new(config: RelayConfig) -> Self {
        Self::with_interface(config, false)
    }

    fn with_interface(config: RelayConfig, reflect: bool) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let link = RecordingLink::default();
        let mut relay = Relay::new(config, Box::new(link.clone()));
        let ifc = relay.add_interface("127.0.0.1:6363".parse().unwrap(), reflect, false);
        Self { relay, link, ifc }
    }

    fn face(&mut self, port: u16) -> FaceId {
        self.relay
            .face_get_or_create(Some(self.ifc), Some(peer(port)))
            .unwrap()
    }

    fn receive(&mut self, port: u16, frame: Bytes) -> FrameOutcome {
        self.relay.receive(self.ifc, peer(port), frame).unwrap()
    }
}

fn peer(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

fn name(uri: &str) -> Prefix {
    Prefix::parse(uri, Suite::NdnTlv).unwrap()
}

fn interest_frame(uri: &str, nonce: u32) -> Bytes {
    NdnTlvCodec::new()
        .encode_interest(&name(uri), Some(nonce), None)
        .unwrap()
}

fn content_frame(uri: &str, payload: &[u8]) -> Bytes {
    NdnTlvCodec::new()
        .encode_content(&name(uri), payload, None)
        .unwrap()
}

fn content_packet(uri: &str, payload: &[u8], freshness: Option<Duration>) -> Packet {
    let codec = NdnTlvCodec::new();
    codec
        .decode(codec.encode_content(&name(uri), payload, freshness).unwrap())
        .unwrap()
}

/// An NDN Interest built without going through the codec.
fn interest_packet(prefix: Prefix, nonce: u32, tweak: impl FnOnce(&mut Details)) -> Packet {
    let mut details = Details::ndn_default();
    if let Details::NdnTlv { nonce: n, .. } = &mut details {
        *n = Some(Bytes::copy_from_slice(&nonce.to_be_bytes()));
    }
    tweak(&mut details);
    let buf = Bytes::from(format!("interest {} {}", prefix, nonce));
    Packet::new(buf, prefix, PacketKind::Interest, details)
}

const A: u16 = 1001;
const B: u16 = 1002;
const C: u16 = 1003;

/* ---------------------------------------------------------------- *
 * Forwarding
 * ---------------------------------------------------------------- */

#[test]
fn interest_forwarded_and_content_returned() {
    let mut h = Harness::new(RelayConfig::default());
    let _a = h.face(A);
    let b = h.face(B);
    h.relay.fib_add(name("/a"), b).unwrap();

    let interest = interest_frame("/a/b", 1);
    assert_eq!(
        h.receive(A, interest.clone()),
        FrameOutcome::Interest(InterestResult::Forwarded { faces: 1 })
    );
    assert_eq!(h.link.frames_to(peer(B)), vec![interest]);
    assert_eq!(h.relay.pit().len(), 1);

    let content = content_frame("/a/b", b"hello");
    assert_eq!(
        h.receive(B, content.clone()),
        FrameOutcome::Content(ContentResult::Delivered {
            served: 1,
            cached: true
        })
    );
    assert_eq!(h.link.frames_to(peer(A)), vec![content.clone()]);
    assert!(h.relay.pit().is_empty());
    assert!(h.relay.cs_lookup("/a/b").is_some());

    // a later request is answered from the cache
    assert_eq!(
        h.receive(C, interest_frame("/a/b", 2)),
        FrameOutcome::Interest(InterestResult::SatisfiedByCs)
    );
    assert_eq!(h.link.frames_to(peer(C)), vec![content]);

    let metrics = h.relay.metrics().snapshot();
    assert_eq!(metrics.cs_hits, 1);
    assert_eq!(metrics.content_sent, 2);
    assert_eq!(metrics.interests_forwarded, 1);
}

#[test]
fn duplicate_nonce_is_dropped() {
    let mut h = Harness::new(RelayConfig::default());
    let b = h.face(B);
    h.relay.fib_add(name("/a"), b).unwrap();

    let frame = interest_frame("/a/x", 42);
    h.receive(A, frame.clone());
    assert_eq!(
        h.receive(C, frame),
        FrameOutcome::Interest(InterestResult::Duplicate)
    );
    assert_eq!(h.relay.metrics().interests_duplicate.value(), 1);
    assert_eq!(h.link.frames_to(peer(B)).len(), 1);
}

#[test]
fn identical_interests_share_one_entry() {
    let mut h = Harness::new(RelayConfig::default());
    let a = h.face(A);
    let b = h.face(B);
    let c = h.face(C);
    h.relay.fib_add(name("/a"), b).unwrap();

    h.receive(A, interest_frame("/a/x", 1));
    assert_eq!(
        h.receive(C, interest_frame("/a/x", 2)),
        FrameOutcome::Interest(InterestResult::Aggregated)
    );
    assert_eq!(h.relay.pit().len(), 1);
    let entry = h.relay.pit().iter().next().unwrap();
    assert!(entry.is_pending(a) && entry.is_pending(c));
    assert_eq!(h.link.frames_to(peer(B)).len(), 1);

    assert_eq!(
        h.receive(B, content_frame("/a/x", b"v")),
        FrameOutcome::Content(ContentResult::Delivered {
            served: 2,
            cached: true
        })
    );
}

#[test]
fn forward_all_faces_repropagate() {
    let link = RecordingLink::default();
    let mut relay = Relay::new(RelayConfig::default(), Box::new(link.clone()));
    let ifc = relay.add_interface("127.0.0.1:6363".parse().unwrap(), false, true);
    let b = relay.face_get_or_create(Some(ifc), Some(peer(B))).unwrap();
    relay.fib_add(name("/a"), b).unwrap();

    relay.receive(ifc, peer(A), interest_frame("/a/x", 1)).unwrap();
    relay.receive(ifc, peer(C), interest_frame("/a/x", 2)).unwrap();
    // the second propagation re-sends the first requester's Interest
    assert_eq!(link.frames_to(peer(B)).len(), 2);
    assert_eq!(relay.pit().len(), 1);
}

#[test]
fn removed_route_stops_forwarding() {
    let mut h = Harness::new(RelayConfig::default());
    let b = h.face(B);
    let c = h.face(C);
    h.relay.fib_add(name("/a"), b).unwrap();
    h.relay.fib_add(name("/z"), c).unwrap();

    h.relay.fib_remove(Some(&name("/a")), None).unwrap();
    assert_eq!(h.relay.fib().len(), 1);
    assert_eq!(
        h.receive(A, interest_frame("/a/x", 1)),
        FrameOutcome::Interest(InterestResult::Unroutable)
    );

    h.relay.fib_remove(None, Some(c)).unwrap();
    assert!(h.relay.fib().is_empty());
    assert!(matches!(
        h.relay.fib_remove(Some(&name("/a")), None),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn origin_face_is_skipped_unless_reflect() {
    let mut h = Harness::new(RelayConfig::default());
    let a = h.face(A);
    h.relay.fib_add(name("/a"), a).unwrap();
    assert_eq!(
        h.receive(A, interest_frame("/a/x", 1)),
        FrameOutcome::Interest(InterestResult::Unroutable)
    );
    assert_eq!(h.link.total(), 0);

    let mut h = Harness::with_interface(RelayConfig::default(), true);
    let a = h.face(A);
    h.relay.fib_add(name("/a"), a).unwrap();
    assert_eq!(
        h.receive(A, interest_frame("/a/x", 1)),
        FrameOutcome::Interest(InterestResult::Forwarded { faces: 1 })
    );
    assert_eq!(h.link.frames_to(peer(A)).len(), 1);
}

#[test]
fn scope_limits_forwarding() {
    let mut h = Harness::new(RelayConfig::default());
    let a = h.face(A);
    let packet = interest_packet(name("/a"), 7, |d| {
        if let Details::NdnTlv { scope, .. } = d {
            *scope = 2;
        }
    });
    assert_eq!(
        h.relay.handle_interest(a, packet).unwrap(),
        InterestResult::NotForwardable
    );
    assert!(h.relay.pit().is_empty());
}

#[test]
fn unsolicited_content_is_discarded() {
    let mut h = Harness::new(RelayConfig::default());
    assert_eq!(
        h.receive(B, content_frame("/nobody/asked", b"x")),
        FrameOutcome::Content(ContentResult::Unsolicited)
    );
    assert!(h.relay.content_store().is_empty());
    assert_eq!(h.relay.metrics().content_unsolicited.value(), 1);
}

#[test]
fn cache_disabled_still_delivers() {
    let config = RelayConfig {
        cache_size: 0,
        ..RelayConfig::default()
    };
    let mut h = Harness::new(config);
    let b = h.face(B);
    h.relay.fib_add(name("/a"), b).unwrap();
    h.receive(A, interest_frame("/a", 1));

    assert_eq!(
        h.receive(B, content_frame("/a", b"x")),
        FrameOutcome::Content(ContentResult::Delivered {
            served: 1,
            cached: false
        })
    );
    assert!(h.relay.content_store().is_empty());
}

#[test]
fn cs_add_refused_when_caching_disabled() {
    let config = RelayConfig {
        cache_size: 0,
        ..RelayConfig::default()
    };
    let mut h = Harness::new(config);
    for uri in ["/first", "/second"] {
        assert!(matches!(
            h.relay.cs_add(content_packet(uri, b"x", None), true),
            Err(Error::CapacityExceeded(_))
        ));
    }
    assert!(h.relay.content_store().is_empty());
}

#[test]
fn local_face_gets_local_delivery() {
    let mut h = Harness::new(RelayConfig::default());
    let local = h.relay.face_get_or_create(None, None).unwrap();
    let b = h.face(B);
    h.relay.fib_add(name("/a"), b).unwrap();

    let interest = h.relay.codecs().decode(interest_frame("/a/z", 9)).unwrap();
    assert_eq!(
        h.relay.handle_interest(local, interest).unwrap(),
        InterestResult::Forwarded { faces: 1 }
    );

    let content = content_frame("/a/z", b"zz");
    h.receive(B, content.clone());
    assert_eq!(*h.link.local.borrow(), vec![content]);
}

/* ---------------------------------------------------------------- *
 * No-route policies
 * ---------------------------------------------------------------- */

#[test]
fn broadcast_policy_floods_other_faces() {
    let config = RelayConfig {
        no_route: NoRoutePolicy::Broadcast,
        ..RelayConfig::default()
    };
    let mut h = Harness::new(config);
    h.face(A);
    h.face(B);
    h.face(C);
    h.relay.face_get_or_create(None, None).unwrap();

    assert_eq!(
        h.receive(A, interest_frame("/x", 1)),
        FrameOutcome::Interest(InterestResult::Forwarded { faces: 2 })
    );
    assert!(h.link.frames_to(peer(A)).is_empty());
    assert_eq!(h.link.frames_to(peer(B)).len(), 1);
    assert_eq!(h.link.frames_to(peer(C)).len(), 1);
    assert!(h.link.local.borrow().is_empty());
}

#[test]
fn broadcast_policy_learns_chunk_routes() {
    let config = RelayConfig {
        no_route: NoRoutePolicy::Broadcast,
        ..RelayConfig::default()
    };
    let mut h = Harness::new(config);
    h.face(A);
    let b = h.face(B);

    let codec = NdnTlvCodec::new();
    let chunk = Prefix::from_uri("/video", Suite::NdnTlv, None, Some(0)).unwrap();
    h.receive(A, codec.encode_interest(&chunk, Some(3), None).unwrap());
    let outcome = h.receive(B, codec.encode_content(&chunk, b"c0", None).unwrap());
    assert!(matches!(
        outcome,
        FrameOutcome::Content(ContentResult::Delivered { served: 1, .. })
    ));

    let learned = h.relay.fib().iter().find(|e| e.prefix == name("/video"));
    assert_eq!(learned.and_then(|e| e.face), Some(b));
}

#[test]
fn nack_policy_answers_and_forgets() {
    let config = RelayConfig {
        no_route: NoRoutePolicy::Nack,
        ..RelayConfig::default()
    };
    let mut h = Harness::new(config);

    assert_eq!(
        h.receive(A, interest_frame("/nowhere", 5)),
        FrameOutcome::Interest(InterestResult::Unroutable)
    );
    assert!(h.relay.pit().is_empty());
    let replies = h.link.frames_to(peer(A));
    assert_eq!(replies.len(), 1);
    let nack = h.relay.codecs().decode(replies[0].clone()).unwrap();
    assert_eq!(nack.kind, PacketKind::Nack);
    assert_eq!(nack.prefix, name("/nowhere"));
    assert_eq!(h.relay.metrics().nacks_sent.value(), 1);
}

/* ---------------------------------------------------------------- *
 * Freshness
 * ---------------------------------------------------------------- */

#[test]
fn must_be_fresh_skips_stale_content() {
    let mut h = Harness::new(RelayConfig::default());
    let a = h.face(A);
    h.relay
        .cs_add(content_packet("/news", b"old", Some(Duration::from_millis(100))), false)
        .unwrap();
    h.relay.do_ageing_at(Instant::now() + Duration::from_secs(1));

    let fresh = interest_packet(name("/news"), 1, |d| {
        if let Details::NdnTlv { must_be_fresh, .. } = d {
            *must_be_fresh = true;
        }
    });
    assert_eq!(
        h.relay.handle_interest(a, fresh).unwrap(),
        InterestResult::Unroutable
    );

    let any = interest_packet(name("/news"), 2, |_| {});
    assert_eq!(
        h.relay.handle_interest(a, any).unwrap(),
        InterestResult::SatisfiedByCs
    );
}

/* ---------------------------------------------------------------- *
 * Ageing and retransmission
 * ---------------------------------------------------------------- */

#[test]
fn retransmission_budget_is_bounded() {
    let config = RelayConfig {
        max_interest_retransmit: 2,
        ..RelayConfig::default()
    };
    let mut h = Harness::new(config);
    let b = h.face(B);
    h.relay.fib_add(name("/a"), b).unwrap();
    h.receive(A, interest_frame("/a/slow", 1));

    let t0 = Instant::now();
    for i in 1..=2 {
        let report = h.relay.do_ageing_at(t0 + Duration::from_secs(i));
        assert_eq!(report.interests_retransmitted, 1);
    }
    assert_eq!(h.link.frames_to(peer(B)).len(), 3);

    let report = h.relay.do_ageing_at(t0 + Duration::from_secs(3));
    assert_eq!(report.interests_removed, 1);
    assert!(h.relay.pit().is_empty());
}

#[test]
fn interests_expire_after_their_lifetime() {
    let mut h = Harness::new(RelayConfig::default());
    h.face(A);
    h.receive(A, interest_frame("/a", 1));

    let report = h.relay.do_ageing_at(Instant::now() + Duration::from_secs(41));
    assert_eq!(report.interests_removed, 1);
    assert_eq!(h.relay.metrics().interests_timed_out.value(), 1);
}

/* ---------------------------------------------------------------- *
 * Faces and queues
 * ---------------------------------------------------------------- */

#[test]
fn face_removal_cascades() {
    let mut h = Harness::new(RelayConfig::default());
    let a = h.face(A);
    let b = h.face(B);
    h.relay.fib_add(name("/a"), b).unwrap();
    h.receive(A, interest_frame("/a/b", 1));

    h.relay.face_remove(b).unwrap();
    assert!(h.relay.fib().is_empty());
    assert_eq!(h.relay.pit().len(), 1);
    assert_eq!(h.relay.pit().iter().next().unwrap().from, Some(a));

    h.relay.face_remove(a).unwrap();
    assert!(h.relay.pit().is_empty());
    assert!(matches!(h.relay.face_remove(a), Err(Error::NotFound(_))));
}

#[derive(Default, Clone)]
struct RecordingScheduler {
    requests: Rc<RefCell<Vec<(FaceId, usize, usize)>>>,
}

impl Scheduler for RecordingScheduler {
    fn request_to_send(&mut self, face: FaceId, count: usize, len: usize) {
        self.requests.borrow_mut().push((face, count, len));
    }
}

#[test]
fn scheduler_defers_sending() {
    let mut h = Harness::new(RelayConfig::default());
    let b = h.face(B);
    let scheduler = RecordingScheduler::default();
    h.relay
        .face_set_scheduler(b, Some(Box::new(scheduler.clone())))
        .unwrap();
    assert!(h.relay.faces().get(b).unwrap().has_scheduler());
    h.relay.fib_add(name("/a"), b).unwrap();

    let frame = interest_frame("/a/x", 1);
    h.receive(A, frame.clone());
    assert!(h.link.frames_to(peer(B)).is_empty());
    assert_eq!(*scheduler.requests.borrow(), vec![(b, 1, frame.len())]);
    assert_eq!(h.relay.faces().get(b).unwrap().queue_len(), 1);

    // same bytes are not queued twice
    assert!(matches!(
        h.relay.face_enqueue(b, frame.clone()),
        Err(Error::DuplicateSuppressed(_))
    ));

    h.relay.face_clear_to_send(b).unwrap();
    assert_eq!(h.link.frames_to(peer(B)), vec![frame]);
    assert_eq!(h.relay.faces().get(b).unwrap().queue_len(), 0);
}

#[test]
fn busy_link_keeps_frames_queued() {
    let config = RelayConfig {
        max_interface_queue: 1,
        ..RelayConfig::default()
    };
    let mut h = Harness::new(config);
    let b = h.face(B);
    h.link.busy.set(true);

    h.relay.face_enqueue(b, Bytes::from_static(b"one")).unwrap();
    h.relay.face_enqueue(b, Bytes::from_static(b"two")).unwrap();
    assert_eq!(h.relay.interfaces()[h.ifc].queue_len(), 1);
    assert_eq!(h.relay.metrics().frames_dropped.value(), 1);

    h.link.busy.set(false);
    h.relay.flush_interfaces();
    assert_eq!(h.link.frames_to(peer(B)), vec![Bytes::from_static(b"one")]);
}

/* ---------------------------------------------------------------- *
 * Hooks
 * ---------------------------------------------------------------- */

struct Echo;

impl LocalProducer for Echo {
    fn produce(&mut self, _face: FaceId, interest: &Packet) -> ProducerReply {
        if interest.prefix.component_value(0) != Some(&b"local"[..]) {
            return ProducerReply::Pass;
        }
        ProducerReply::Reply(content_packet("/local/echo", b"pong", None))
    }
}

#[test]
fn local_producer_answers() {
    let mut h = Harness::new(RelayConfig::default());
    h.relay.hooks_mut().producer = Some(Box::new(Echo));

    assert_eq!(
        h.receive(A, interest_frame("/local/echo", 1)),
        FrameOutcome::Interest(InterestResult::Produced)
    );
    assert_eq!(h.link.frames_to(peer(A)).len(), 1);

    // everything else goes through the normal pipeline
    assert_eq!(
        h.receive(A, interest_frame("/other", 2)),
        FrameOutcome::Interest(InterestResult::Unroutable)
    );
}

#[test]
fn builder_installs_hooks_and_codecs() {
    let hooks = Hooks {
        producer: Some(Box::new(Echo)),
        ..Hooks::default()
    };
    let mut relay = Relay::new(RelayConfig::default(), Box::new(NullLink)).with_hooks(hooks);
    let ifc = relay.add_interface("127.0.0.1:6363".parse().unwrap(), false, false);
    assert_eq!(
        relay.receive(ifc, peer(A), interest_frame("/local/x", 1)).unwrap(),
        FrameOutcome::Interest(InterestResult::Produced)
    );

    let mut bare =
        Relay::new(RelayConfig::default(), Box::new(NullLink)).with_codecs(CodecRegistry::new());
    let ifc = bare.add_interface("127.0.0.1:6363".parse().unwrap(), false, false);
    assert!(matches!(
        bare.receive(ifc, peer(A), interest_frame("/local/x", 1)),
        Err(Error::Parse(_))
    ));
}

struct Status;

impl ManagementHandler for Status {
    fn handle(&mut self, _face: FaceId, _frame: &Bytes, prefix: &Prefix) -> Option<Bytes> {
        let command = prefix.component_value(2)?;
        Some(Bytes::from([&b"ok:"[..], command].concat()))
    }
}

#[test]
fn management_namespace_is_intercepted() {
    let mut h = Harness::new(RelayConfig::default());
    let a = h.face(A);
    let mgmt = interest_packet(name("/ccnx//status"), 1, |_| {});

    // without a handler the request is swallowed
    assert_eq!(
        h.relay.handle_interest(a, mgmt).unwrap(),
        InterestResult::Management
    );
    assert_eq!(h.link.total(), 0);

    h.relay.hooks_mut().management = Some(Box::new(Status));
    let mgmt = interest_packet(name("/ccnx//status"), 2, |_| {});
    assert_eq!(
        h.relay.handle_interest(a, mgmt).unwrap(),
        InterestResult::Management
    );
    assert_eq!(
        h.link.frames_to(peer(A)),
        vec![Bytes::from_static(b"ok:status")]
    );
    assert!(h.relay.pit().is_empty());
}

struct Calculator {
    seen_content: Rc<Cell<usize>>,
}

impl NfnResolver for Calculator {
    fn on_interest(&mut self, _face: FaceId, interest: &Packet) -> Option<Packet> {
        let mut result = content_packet("/add/1/2", b"3", None);
        result.prefix.set_nfn(interest.prefix.is_nfn());
        Some(result)
    }

    fn on_content(&mut self, _face: FaceId, _content: Packet) -> Option<Packet> {
        self.seen_content.set(self.seen_content.get() + 1);
        None
    }
}

#[test]
fn nfn_resolver_computes_and_consumes() {
    let mut h = Harness::new(RelayConfig::default());
    let a = h.face(A);
    let seen = Rc::new(Cell::new(0));
    h.relay.hooks_mut().nfn = Some(Box::new(Calculator {
        seen_content: seen.clone(),
    }));

    let mut expr = name("/add/1/2");
    expr.set_nfn(true);
    let interest = interest_packet(expr.clone(), 1, |_| {});
    assert_eq!(
        h.relay.handle_interest(a, interest).unwrap(),
        InterestResult::Computed
    );
    assert_eq!(h.link.frames_to(peer(A)).len(), 1);

    let mut content = content_packet("/add/1/2", b"3", None);
    content.prefix = expr;
    assert_eq!(
        h.relay.handle_content(a, content).unwrap(),
        ContentResult::Intercepted
    );
    assert_eq!(seen.get(), 1);

    // unmarked names bypass the resolver
    let plain = interest_packet(name("/add/1/2"), 2, |_| {});
    assert_eq!(
        h.relay.handle_interest(a, plain).unwrap(),
        InterestResult::Unroutable
    );
}

struct Deny;

impl DataHook for Deny {
    fn allow(&mut self, _face: FaceId, _content: &Packet) -> bool {
        false
    }
}

#[test]
fn inbound_hook_vetoes_content() {
    let mut h = Harness::new(RelayConfig::default());
    let b = h.face(B);
    h.relay.fib_add(name("/a"), b).unwrap();
    h.receive(A, interest_frame("/a", 1));
    h.relay.hooks_mut().rx = Some(Box::new(Deny));

    assert_eq!(
        h.receive(B, content_frame("/a", b"x")),
        FrameOutcome::Content(ContentResult::Intercepted)
    );
    assert_eq!(h.relay.pit().len(), 1);
    assert!(h.relay.content_store().is_empty());
}

#[test]
fn outbound_hook_vetoes_cache_hits() {
    let mut h = Harness::new(RelayConfig::default());
    h.relay
        .cs_add(content_packet("/secret", b"x", None), true)
        .unwrap();
    h.relay.hooks_mut().tx = Some(Box::new(Deny));

    assert_eq!(
        h.receive(A, interest_frame("/secret", 1)),
        FrameOutcome::Interest(InterestResult::SatisfiedByCs)
    );
    assert_eq!(h.link.total(), 0);
}

struct CountingTap(Rc<Cell<usize>>);

impl Tap for CountingTap {
    fn observe(&mut self, _origin: Option<FaceId>, _interest: &Packet) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn taps_observe_propagated_interests() {
    let mut h = Harness::new(RelayConfig::default());
    let count = Rc::new(Cell::new(0));
    h.relay
        .fib_add_tap(name("/watch"), Box::new(CountingTap(count.clone())))
        .unwrap();

    h.receive(A, interest_frame("/watch/this", 1));
    h.receive(A, interest_frame("/elsewhere", 2));
    assert_eq!(count.get(), 1);
}

#[test]
fn tap_keeps_existing_route() {
    let mut h = Harness::new(RelayConfig::default());
    let b = h.face(B);
    let count = Rc::new(Cell::new(0));
    h.relay.fib_add(name("/a"), b).unwrap();
    h.relay
        .fib_add_tap(name("/a"), Box::new(CountingTap(count.clone())))
        .unwrap();
    assert_eq!(h.relay.fib().len(), 1);

    assert_eq!(
        h.receive(A, interest_frame("/a/x", 1)),
        FrameOutcome::Interest(InterestResult::Forwarded { faces: 1 })
    );
    assert_eq!(count.get(), 1);
    assert_eq!(h.link.frames_to(peer(B)).len(), 1);
}

#[test]
fn tap_only_route_counts_as_routed() {
    let mut h = Harness::new(RelayConfig::default());
    let count = Rc::new(Cell::new(0));
    h.relay
        .fib_add_tap(name("/watch"), Box::new(CountingTap(count.clone())))
        .unwrap();

    assert_eq!(
        h.receive(A, interest_frame("/watch/this", 1)),
        FrameOutcome::Interest(InterestResult::Forwarded { faces: 0 })
    );
    assert_eq!(count.get(), 1);
    assert_eq!(h.link.total(), 0);
}

/* ---------------------------------------------------------------- *
 * Locally expressed Interests
 * ---------------------------------------------------------------- */

#[test]
fn local_interest_pins_returned_content() {
    let mut h = Harness::new(RelayConfig::default());
    let b = h.face(B);
    h.relay.fib_add(name("/prefetch"), b).unwrap();

    let interest = NdnTlvCodec::new()
        .decode(interest_frame("/prefetch/item", 9))
        .unwrap();
    let id = h.relay.express_interest(interest).unwrap();
    let entry = h.relay.pit().get(id).unwrap();
    assert_eq!(entry.from, None);
    assert!(entry.pending.is_empty());
    assert_eq!(h.link.frames_to(peer(B)).len(), 1);

    assert_eq!(
        h.receive(B, content_frame("/prefetch/item", b"warm")),
        FrameOutcome::Content(ContentResult::Delivered {
            served: 1,
            cached: true
        })
    );
    assert!(h.relay.pit().is_empty());
    let cached = h.relay.content_store().iter().next().unwrap();
    assert_eq!(cached.packet.prefix, name("/prefetch/item"));
    assert!(cached.is_static);
    // nothing goes back towards the producer
    assert_eq!(h.link.frames_to(peer(B)).len(), 1);
}

#[test]
fn express_interest_rejects_content() {
    let mut h = Harness::new(RelayConfig::default());
    assert!(matches!(
        h.relay
            .express_interest(content_packet("/x", b"no", None)),
        Err(Error::Parse(_))
    ));
    assert!(h.relay.pit().is_empty());
}

/* ---------------------------------------------------------------- *
 * Content store operations
 * ---------------------------------------------------------------- */

#[test]
fn cs_add_serves_pending_interests() {
    let mut h = Harness::new(RelayConfig::default());
    h.face(A);
    h.receive(A, interest_frame("/late", 1));
    assert_eq!(h.relay.pit().len(), 1);

    let id = h
        .relay
        .cs_add(content_packet("/late", b"finally", None), false)
        .unwrap();
    assert!(h.relay.pit().is_empty());
    assert_eq!(h.link.frames_to(peer(A)).len(), 1);
    assert_eq!(h.relay.content_store().get(id).unwrap().served_count, 1);

    let packet = h.relay.cs_remove(id).unwrap();
    assert_eq!(packet.content.as_deref(), Some(&b"finally"[..]));
    assert!(h.relay.cs_lookup("/late").is_none());
}

#[test]
fn duplicate_content_is_ignored() {
    let mut h = Harness::new(RelayConfig::default());
    h.relay
        .cs_add(content_packet("/dup", b"x", None), false)
        .unwrap();
    assert_eq!(
        h.receive(B, content_frame("/dup", b"x")),
        FrameOutcome::Content(ContentResult::Duplicate)
    );
}

#[test]
fn parse_errors_are_counted() {
    let mut h = Harness::new(RelayConfig::default());
    assert!(h
        .relay
        .receive(h.ifc, peer(A), Bytes::from_static(&[0xff, 0x00]))
        .is_err());
    assert_eq!(h.relay.metrics().parse_errors.value(), 1);
}
