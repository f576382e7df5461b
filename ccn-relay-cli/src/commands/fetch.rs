//! `fetch` command: one Interest, one Content object

use anyhow::{anyhow, bail, Context, Result};
use bytes::Bytes;
use ccn_relay_common::codec::CodecRegistry;
use ccn_relay_common::types::MAX_PACKET_SIZE;
use ccn_relay_common::{PacketKind, Prefix, Suite};
use log::{debug, info};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::utils::{format_bytes, format_duration, hexdump};

/// Interests are resent this often until the deadline.
const RETRANSMIT_INTERVAL: Duration = Duration::from_millis(500);

pub async fn fetch(
    uri: &str,
    relay: Option<SocketAddr>,
    suite: Suite,
    timeout_ms: u64,
    output: Option<PathBuf>,
) -> Result<()> {
    let relay = relay
        .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::LOCALHOST, suite.default_udp_port())));
    let prefix = Prefix::parse(uri, suite).with_context(|| format!("Invalid name '{}'", uri))?;

    let codecs = CodecRegistry::default();
    let codec = codecs.get(suite)?;

    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .context("Failed to bind client socket")?;
    info!("Fetching {} from {} ({})", prefix, relay, suite);

    let started = Instant::now();
    let deadline = started + Duration::from_millis(timeout_ms);
    let mut buf = vec![0u8; MAX_PACKET_SIZE];

    while Instant::now() < deadline {
        let nonce: u32 = rand::random();
        let frame = codec.encode_interest(&prefix, Some(nonce), None)?;
        let interest = codec.decode(frame.clone())?;
        socket
            .send_to(&frame, relay)
            .await
            .with_context(|| format!("Failed to send Interest to {}", relay))?;
        debug!("Interest sent, nonce={:08x}", nonce);

        let round_end = (Instant::now() + RETRANSMIT_INTERVAL).min(deadline);
        loop {
            let left = round_end.saturating_duration_since(Instant::now());
            let (len, from) = match timeout(left, socket.recv_from(&mut buf)).await {
                Ok(Ok(received)) => received,
                Ok(Err(e)) => {
                    debug!("Receive failed: {}", e);
                    tokio::time::sleep(left).await;
                    break;
                }
                Err(_) => break,
            };

            let packet = match codecs.decode(Bytes::copy_from_slice(&buf[..len])) {
                Ok(packet) => packet,
                Err(e) => {
                    debug!("Ignoring frame from {}: {}", from, e);
                    continue;
                }
            };
            match packet.kind {
                PacketKind::Nack if packet.prefix == interest.prefix => {
                    bail!("Relay has no route for {}", prefix)
                }
                PacketKind::Content if codec.matches_content(&interest, &packet) => {
                    let payload = packet.content.unwrap_or_default();
                    info!(
                        "Received {} for {} in {}",
                        format_bytes(payload.len()),
                        packet.prefix,
                        format_duration(started.elapsed())
                    );
                    return write_payload(&payload, output);
                }
                _ => debug!("Ignoring {} {} from {}", packet.kind, packet.prefix, from),
            }
        }
    }

    Err(anyhow!(
        "No content for {} after {}",
        prefix,
        format_duration(Duration::from_millis(timeout_ms))
    ))
}

fn write_payload(payload: &[u8], output: Option<PathBuf>) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(&path, payload)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote {} to {}", format_bytes(payload.len()), path.display());
        return Ok(());
    }

    match std::str::from_utf8(payload) {
        Ok(text) => println!("{}", text),
        Err(_) => print!("{}", hexdump(payload)),
    }
    Ok(())
}
