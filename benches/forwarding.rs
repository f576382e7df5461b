//! Benchmarks for the forwarding hot path: name comparison, frame decoding
//! and a full Interest/Content exchange through the relay.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ccn_relay_common::codec::{Codec, NdnTlvCodec};
use ccn_relay_common::{MatchMode, Prefix, Suite};
use ccn_relay_core::{NullLink, Relay, RelayConfig};
use std::net::SocketAddr;

fn bench_prefix_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("prefix_compare");

    for depth in [2usize, 8, 32] {
        let path: String = (0..depth).map(|i| format!("/c{}", i)).collect();
        let long = Prefix::parse(&path, Suite::NdnTlv).unwrap();
        let short = long.truncated(depth / 2);

        group.bench_with_input(BenchmarkId::new("longest", depth), &depth, |b, _| {
            b.iter(|| black_box(short.compare(0, black_box(&long), MatchMode::Longest)))
        });
        group.bench_with_input(BenchmarkId::new("exact", depth), &depth, |b, _| {
            b.iter(|| black_box(long.compare(0, black_box(&long), MatchMode::Exact)))
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let codec = NdnTlvCodec::new();
    let name = Prefix::parse("/bench/video/segment", Suite::NdnTlv).unwrap();
    let interest = codec.encode_interest(&name, Some(7), None).unwrap();
    let content = codec
        .encode_content(&name, &[0x5a; 1024], None)
        .unwrap();

    c.bench_function("decode_interest", |b| {
        b.iter(|| black_box(codec.decode(interest.clone()).unwrap()))
    });
    c.bench_function("decode_content_1k", |b| {
        b.iter(|| black_box(codec.decode(content.clone()).unwrap()))
    });
}

fn bench_exchange(c: &mut Criterion) {
    let codec = NdnTlvCodec::new();
    let consumer: SocketAddr = "127.0.0.1:7001".parse().unwrap();
    let producer: SocketAddr = "127.0.0.1:7002".parse().unwrap();

    // No cache, so every Interest walks PIT and FIB.
    let config = RelayConfig {
        cache_size: 0,
        ..RelayConfig::default()
    };
    let mut relay = Relay::new(config, Box::new(NullLink));
    let ifc = relay.add_interface("127.0.0.1:6363".parse().unwrap(), false, false);
    let upstream = relay.face_get_or_create(Some(ifc), Some(producer)).unwrap();
    relay.face_set_static(upstream, true).unwrap();
    relay
        .fib_add(Prefix::parse("/bench", Suite::NdnTlv).unwrap(), upstream)
        .unwrap();

    let name = Prefix::parse("/bench/data/1", Suite::NdnTlv).unwrap();
    let content = codec.encode_content(&name, b"payload", None).unwrap();
    let mut nonce = 0u32;

    c.bench_function("interest_content_exchange", |b| {
        b.iter(|| {
            nonce = nonce.wrapping_add(1);
            let interest = codec.encode_interest(&name, Some(nonce), None).unwrap();
            black_box(relay.receive(ifc, consumer, interest).unwrap());
            black_box(relay.receive(ifc, producer, content.clone()).unwrap());
        })
    });
}

criterion_group!(benches, bench_prefix_compare, bench_decode, bench_exchange);
criterion_main!(benches);
