//! UDP transport for the relay daemon.
//!
//! Each interface gets one socket. A receive task per socket forwards
//! datagrams to the main loop; sends happen on the main loop through
//! [`UdpLink`], which never waits on a socket.

use bytes::Bytes;
use ccn_relay_common::types::MAX_PACKET_SIZE;
use ccn_relay_common::{Error, Result};
use ccn_relay_core::Link;
use log::{debug, trace, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A datagram received on one of the relay's interfaces.
#[derive(Debug)]
pub struct Datagram {
    pub interface: usize,
    pub peer: SocketAddr,
    pub frame: Bytes,
}

/// Reads `socket` until the main loop goes away.
pub fn spawn_receiver(
    interface: usize,
    socket: Arc<UdpSocket>,
    tx: mpsc::Sender<Datagram>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; MAX_PACKET_SIZE];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, peer)) => {
                    trace!("interface {}: {} bytes from {}", interface, len, peer);
                    let datagram = Datagram {
                        interface,
                        peer,
                        frame: Bytes::copy_from_slice(&buf[..len]),
                    };
                    if tx.send(datagram).await.is_err() {
                        debug!("interface {}: main loop closed, receiver exiting", interface);
                        break;
                    }
                }
                Err(e) => warn!("interface {}: recv failed: {}", interface, e),
            }
        }
    })
}

/// [`Link`] over the daemon's UDP sockets.
pub struct UdpLink {
    sockets: Vec<Arc<UdpSocket>>,
}

impl UdpLink {
    pub fn new(sockets: Vec<Arc<UdpSocket>>) -> Self {
        Self { sockets }
    }
}

impl Link for UdpLink {
    fn send(&mut self, interface: usize, peer: SocketAddr, frame: &Bytes) -> Result<()> {
        let socket = self
            .sockets
            .get(interface)
            .ok_or_else(|| Error::NotFound(format!("interface {}", interface)))?;
        match socket.try_send_to(frame, peer) {
            Ok(sent) => {
                trace!("interface {}: {} bytes to {}", interface, sent, peer);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(Error::CapacityExceeded(
                format!("send buffer of interface {} is full", interface),
            )),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn deliver_local(&mut self, frame: &Bytes) {
        debug!("no local application attached, dropping {} bytes", frame.len());
    }
}
