//! Relay configuration.
//!
//! Values are layered: built-in defaults, then an optional file (format
//! chosen by extension), then `CCN_RELAY__*` environment variables. The
//! daemon applies its command-line overrides on top.

use ccn_relay_common::types::{
    CONTENT_TIMEOUT_SECS, FACE_TIMEOUT_SECS, INTEREST_TIMEOUT_SECS, MAX_FIB_ENTRIES,
    MAX_INTEREST_RETRANSMIT, MAX_INTERFACE_QUEUE, MAX_NONCES, MAX_PIT_ENTRIES,
};
use ccn_relay_common::{Error, Result, Suite};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Prefix of the environment variables read by [`RelayConfig::load`].
pub const ENV_PREFIX: &str = "CCN_RELAY";

/// What to do with an Interest no route matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoRoutePolicy {
    #[default]
    Drop,
    /// Send on every non-local face except the one it came from.
    Broadcast,
    /// Answer the requester with a suite NACK.
    Nack,
}

/// A UDP endpoint to listen and send on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    pub bind: SocketAddr,
    #[serde(default)]
    pub reflect: bool,
    #[serde(default)]
    pub fwd_all: bool,
}

/// A static route installed at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub prefix: String,
    pub peer: SocketAddr,
    /// Index into [`RelayConfig::interfaces`].
    #[serde(default)]
    pub interface: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub suite: Suite,
    /// Content store bound: -1 unbounded, 0 disabled.
    pub cache_size: i64,
    pub content_timeout_secs: u64,
    pub interest_timeout_secs: u64,
    pub face_timeout_secs: u64,
    pub max_interest_retransmit: u32,
    /// Nonce ring bound; negative checks the PIT instead.
    pub max_nonces: i64,
    pub max_pit_entries: usize,
    pub max_fib_entries: usize,
    pub max_interface_queue: usize,
    pub no_route: NoRoutePolicy,
    pub ageing_interval_ms: u64,
    pub interfaces: Vec<InterfaceConfig>,
    pub routes: Vec<RouteConfig>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            suite: Suite::NdnTlv,
            cache_size: -1,
            content_timeout_secs: CONTENT_TIMEOUT_SECS,
            interest_timeout_secs: INTEREST_TIMEOUT_SECS,
            face_timeout_secs: FACE_TIMEOUT_SECS,
            max_interest_retransmit: MAX_INTEREST_RETRANSMIT,
            max_nonces: MAX_NONCES,
            max_pit_entries: MAX_PIT_ENTRIES,
            max_fib_entries: MAX_FIB_ENTRIES,
            max_interface_queue: MAX_INTERFACE_QUEUE,
            no_route: NoRoutePolicy::Drop,
            ageing_interval_ms: 1000,
            interfaces: Vec::new(),
            routes: Vec::new(),
        }
    }
}

impl RelayConfig {
    /// Builds the configuration from defaults, `path` (if given) and the
    /// environment. Call [`RelayConfig::validate`] once any further
    /// overrides are applied.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: RelayConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(config)
    }

    /// Rejects values the relay cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_pit_entries == 0 {
            return Err(Error::Config("max_pit_entries must be positive".into()));
        }
        if self.max_interface_queue == 0 {
            return Err(Error::Config("max_interface_queue must be positive".into()));
        }
        if self.ageing_interval_ms == 0 {
            return Err(Error::Config("ageing_interval_ms must be positive".into()));
        }
        for route in &self.routes {
            if route.interface >= self.interfaces.len() {
                return Err(Error::Config(format!(
                    "route {} uses interface {} but only {} are configured",
                    route.prefix,
                    route.interface,
                    self.interfaces.len()
                )));
            }
        }
        Ok(())
    }

    pub fn content_timeout(&self) -> Duration {
        Duration::from_secs(self.content_timeout_secs)
    }

    pub fn interest_timeout(&self) -> Duration {
        Duration::from_secs(self.interest_timeout_secs)
    }

    pub fn face_timeout(&self) -> Duration {
        Duration::from_secs(self.face_timeout_secs)
    }

    pub fn ageing_interval(&self) -> Duration {
        Duration::from_millis(self.ageing_interval_ms)
    }
}
