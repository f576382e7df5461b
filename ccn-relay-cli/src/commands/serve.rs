//! `serve` command: a minimal producer

use anyhow::{Context, Result};
use bytes::Bytes;
use ccn_relay_common::codec::CodecRegistry;
use ccn_relay_common::types::MAX_PACKET_SIZE;
use ccn_relay_common::{Prefix, Suite};
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

/// Answer every Interest under `prefix` until interrupted
pub async fn serve(
    prefix: &str,
    content: String,
    listen: SocketAddr,
    suite: Suite,
    freshness_ms: Option<u64>,
) -> Result<()> {
    let served_prefix =
        Prefix::parse(prefix, suite).with_context(|| format!("Invalid prefix '{}'", prefix))?;
    let freshness = freshness_ms.map(Duration::from_millis);

    let codecs = CodecRegistry::default();
    let codec = codecs.get(suite)?;

    let socket = UdpSocket::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {}", listen))?;
    println!(
        "Serving {} on udp/{} ({} bytes)",
        served_prefix,
        socket.local_addr()?,
        content.len()
    );

    let mut buf = vec![0u8; MAX_PACKET_SIZE];
    let mut answered = 0u64;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let (len, peer) = tokio::select! {
            received = socket.recv_from(&mut buf) => received.context("Receive failed")?,
            _ = &mut shutdown => break,
        };

        let interest = match codecs.decode(Bytes::copy_from_slice(&buf[..len])) {
            Ok(packet) if packet.is_interest() => packet,
            Ok(packet) => {
                debug!("Ignoring {} from {}", packet.kind, peer);
                continue;
            }
            Err(e) => {
                debug!("Ignoring frame from {}: {}", peer, e);
                continue;
            }
        };
        if !served_prefix.is_prefix_of(&interest.prefix) {
            debug!("Interest <{}> is outside {}", interest.prefix, served_prefix);
            continue;
        }

        let reply = codec.encode_content(&interest.prefix, content.as_bytes(), freshness)?;
        match socket.send_to(&reply, peer).await {
            Ok(_) => {
                answered += 1;
                info!("Answered <{}> for {}", interest.prefix, peer);
            }
            Err(e) => warn!("Failed to answer {}: {}", peer, e),
        }
    }

    println!("Answered {} Interests", answered);
    Ok(())
}
