use anyhow::{Context, Result};
use bytes::Bytes;
use ccn_relay_common::metrics::RelayMetrics;
use ccn_relay_common::{Prefix, Suite};
use ccn_relay_core::{AgeingReport, InterfaceConfig, Relay, RelayConfig};
use clap::Parser;
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

mod udp;

use udp::UdpLink;

/// CCN/NDN forwarding relay
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Configuration file (TOML, JSON or YAML)
    #[clap(long)]
    config: Option<PathBuf>,

    /// Wire suite: ccnb, ccnx2015 or ndn2013
    #[clap(short, long)]
    suite: Option<Suite>,

    /// UDP port of the first interface
    #[clap(short, long)]
    udp_port: Option<u16>,

    /// Content store size (-1 unbounded, 0 disables caching)
    #[clap(short, long, allow_hyphen_values = true)]
    cache_size: Option<i64>,

    /// Load every file of this directory as static content
    #[clap(short = 'd', long)]
    populate: Option<PathBuf>,

    /// Seconds between metrics reports, 0 to disable
    #[clap(long, default_value = "0")]
    stats_interval: u64,

    /// Sets the level of verbosity
    #[clap(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if args.verbose { "debug" } else { "info" },
    ))
    .init();

    let config = load_config(&args)?;
    run(config, args.populate, args.stats_interval).await
}

/// File and environment first, then command-line overrides.
fn load_config(args: &Args) -> Result<RelayConfig> {
    let mut config =
        RelayConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(suite) = args.suite {
        config.suite = suite;
    }
    if let Some(cache_size) = args.cache_size {
        config.cache_size = cache_size;
    }
    if config.interfaces.is_empty() || args.udp_port.is_some() {
        let port = args
            .udp_port
            .unwrap_or_else(|| config.suite.default_udp_port());
        match config.interfaces.first_mut() {
            Some(first) => first.bind.set_port(port),
            None => config.interfaces.push(InterfaceConfig {
                bind: SocketAddr::from(([0, 0, 0, 0], port)),
                reflect: false,
                fwd_all: false,
            }),
        }
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn run(config: RelayConfig, populate: Option<PathBuf>, stats_interval: u64) -> Result<()> {
    let mut sockets = Vec::with_capacity(config.interfaces.len());
    for ifc in &config.interfaces {
        let socket = UdpSocket::bind(ifc.bind)
            .await
            .with_context(|| format!("Failed to bind {}", ifc.bind))?;
        info!("listening on udp/{}", socket.local_addr()?);
        sockets.push(Arc::new(socket));
    }

    let mut relay = Relay::new(config.clone(), Box::new(UdpLink::new(sockets.clone())));
    for ifc in &config.interfaces {
        relay.add_interface(ifc.bind, ifc.reflect, ifc.fwd_all);
    }
    install_routes(&mut relay, &config)?;
    if let Some(dir) = populate {
        populate_cache(&mut relay, &dir)?;
    }
    info!(
        "relay ready: suite={} cache_size={} no_route={:?}",
        config.suite, config.cache_size, config.no_route
    );

    let (tx, mut rx) = mpsc::channel(1024);
    for (idx, socket) in sockets.iter().enumerate() {
        udp::spawn_receiver(idx, Arc::clone(socket), tx.clone());
    }
    drop(tx);

    let metrics = relay.metrics();
    if stats_interval > 0 {
        tokio::spawn(report_stats(
            Arc::clone(&metrics),
            Duration::from_secs(stats_interval),
        ));
    }

    let mut ageing = tokio::time::interval(config.ageing_interval());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(datagram) = rx.recv() => {
                let peer = datagram.peer;
                match relay.receive(datagram.interface, peer, datagram.frame) {
                    Ok(outcome) => debug!("{} -> {:?}", peer, outcome),
                    Err(e) if e.is_benign() => debug!("{}: {}", peer, e),
                    Err(e) => warn!("frame from {} dropped: {}", peer, e),
                }
            }
            _ = ageing.tick() => {
                let report = relay.do_ageing();
                relay.flush_interfaces();
                if report != AgeingReport::default() {
                    debug!("ageing: {:?}", report);
                }
            }
            _ = &mut shutdown => {
                info!("shutting down");
                break;
            }
        }
    }

    let snapshot = serde_json::to_string_pretty(&metrics.snapshot())
        .context("Failed to serialize metrics")?;
    info!("final metrics:\n{}", snapshot);
    Ok(())
}

/// Static routes get static faces.
fn install_routes(relay: &mut Relay, config: &RelayConfig) -> Result<()> {
    for route in &config.routes {
        let prefix = Prefix::parse(&route.prefix, config.suite)
            .with_context(|| format!("Invalid route prefix {}", route.prefix))?;
        let face = relay.face_get_or_create(Some(route.interface), Some(route.peer))?;
        relay.face_set_static(face, true)?;
        relay
            .fib_add(prefix, face)
            .with_context(|| format!("Failed to add route {}", route.prefix))?;
        info!("route {} via {} ({})", route.prefix, route.peer, face);
    }
    Ok(())
}

/// Reads every regular file of `dir` as one encoded Content object.
fn populate_cache(relay: &mut Relay, dir: &Path) -> Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;

    let mut loaded = 0;
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let frame = Bytes::from(
            std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?,
        );
        let added = relay
            .codecs()
            .decode(frame)
            .and_then(|packet| relay.cs_add(packet, true));
        match added {
            Ok(_) => loaded += 1,
            Err(e) => warn!("skipping {}: {}", path.display(), e),
        }
    }
    info!("loaded {} content objects from {}", loaded, dir.display());
    Ok(())
}

async fn report_stats(metrics: Arc<RelayMetrics>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let s = metrics.snapshot();
        info!(
            "stats: interests={} (dup={} fwd={} agg={}) content={} (unsolicited={}) \
             cs={} hits={} pit={} faces={} avg={:.1}us",
            s.interests_received,
            s.interests_duplicate,
            s.interests_forwarded,
            s.interests_aggregated,
            s.content_received,
            s.content_unsolicited,
            s.cs_size,
            s.cs_hits,
            s.pit_size,
            s.face_count,
            s.interest_processing_avg_us
        );
    }
}
