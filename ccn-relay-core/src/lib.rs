//! Forwarding core of the CCN/NDN relay.
//!
//! This crate holds the relay's tables (faces, FIB, PIT, content store), the
//! forwarding engine that ties them together and the periodic ageing sweep.
//! It performs no I/O of its own: frames leave through a [`Link`] supplied
//! by the embedding program.

pub mod ageing;
pub mod config;
pub mod cs;
pub mod face;
pub mod fib;
pub mod hooks;
pub mod pit;
pub mod relay;

pub use ageing::AgeingReport;
pub use config::{InterfaceConfig, NoRoutePolicy, RelayConfig, RouteConfig};
pub use hooks::{
    DataHook, Hooks, Link, LocalProducer, ManagementHandler, NfnResolver, NullLink,
    ProducerReply, Scheduler, Tap,
};
pub use relay::{ContentResult, FrameOutcome, InterestResult, Relay};
