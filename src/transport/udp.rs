//! UDP transport
//!
//! Binds one datagram socket and drives the broker from a single task:
//! - inbound datagrams are decoded and routed by the broker
//! - a periodic tick evicts idle clients
//! - failed sends come back over a channel and evict the target client
//! - a second periodic tick logs how many clients and topics are tracked
//!
//! A receive error on the socket is fatal. Every known client gets an
//! `internal error` envelope and the error is returned to the caller, which
//! is expected to exit with a non-zero status.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use super::{SendFailure, Transport};
use crate::broker::{Broker, IdleReaper};
use crate::client::ClientKey;
use crate::config::Settings;
use crate::utils::error::{RelayError, Result};

/// Largest payload a single UDP datagram can carry.
const MAX_DATAGRAM: usize = 65_535;

const STATS_INTERVAL: Duration = Duration::from_secs(20);

/// `Transport` over a shared tokio `UdpSocket`.
///
/// Each send is a single non-blocking attempt. A full socket buffer drops
/// the datagram; any other error is reported on the failure channel rather
/// than to the caller.
#[derive(Debug)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    failures: mpsc::UnboundedSender<SendFailure>,
}

impl UdpTransport {
    pub fn new(socket: Arc<UdpSocket>, failures: mpsc::UnboundedSender<SendFailure>) -> Self {
        Self { socket, failures }
    }
}

impl Transport for UdpTransport {
    fn send_to(&self, to: &ClientKey, payload: &[u8]) {
        match self.socket.try_send_to(payload, to.addr()) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                debug!("<<< {to}: socket busy, datagram dropped");
            }
            Err(e) => {
                debug!("<<< {to}: send failed: {e}");
                let _ = self.failures.send(SendFailure { key: *to });
            }
        }
    }
}

/// A bound relay, ready to `run`.
#[derive(Debug)]
pub struct UdpRelay {
    socket: Arc<UdpSocket>,
    broker: Broker<UdpTransport>,
    failures: mpsc::UnboundedReceiver<SendFailure>,
    reaper: IdleReaper,
    sweep_interval: Duration,
}

impl UdpRelay {
    pub async fn bind(settings: &Settings) -> Result<Self> {
        let addr = settings.listen_addr();
        let socket = UdpSocket::bind(&addr)
            .await
            .map_err(|source| RelayError::Bind { addr, source })?;
        let socket = Arc::new(socket);

        let (tx, rx) = mpsc::unbounded_channel();
        let transport = UdpTransport::new(socket.clone(), tx);

        Ok(Self {
            socket,
            broker: Broker::new(transport),
            failures: rx,
            reaper: IdleReaper::new(settings.idle_timeout()),
            sweep_interval: settings.sweep_interval(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn broker(&self) -> &Broker<UdpTransport> {
        &self.broker
    }

    pub fn broker_mut(&mut self) -> &mut Broker<UdpTransport> {
        &mut self.broker
    }

    /// Evict the targets of every send failure reported so far.
    ///
    /// Returns the number of clients evicted.
    pub fn drain_send_failures(&mut self) -> usize {
        let mut dropped = 0;
        while let Ok(failure) = self.failures.try_recv() {
            if self.broker.handle_send_failure(failure) {
                dropped += 1;
            }
        }
        dropped
    }

    /// Decide what a receive error means for the relay.
    ///
    /// ICMP feedback about an earlier send is ignored. Anything else is a
    /// failure of the listening socket: every known client is sent an
    /// `internal error` envelope and the error is returned.
    pub fn on_receive_error(&self, err: io::Error) -> Result<()> {
        if is_peer_feedback(&err) {
            debug!("ignoring peer error on receive: {err}");
            return Ok(());
        }

        error!("server error: {err}");
        let notified = self.broker.broadcast_internal_error();
        info!("sent internal error notice to {notified} clients");
        Err(RelayError::Transport(err))
    }

    /// Process events until the socket fails.
    pub async fn run(mut self) -> Result<()> {
        let mut buf = vec![0u8; MAX_DATAGRAM];

        let mut sweep = time::interval_at(Instant::now() + self.sweep_interval, self.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stats = time::interval_at(Instant::now() + STATS_INTERVAL, STATS_INTERVAL);
        stats.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, from)) => self.broker.handle_datagram(from, &buf[..len]),
                    Err(e) => self.on_receive_error(e)?,
                },
                Some(failure) = self.failures.recv() => {
                    self.broker.handle_send_failure(failure);
                    self.drain_send_failures();
                }
                _ = sweep.tick() => {
                    let dropped = self.reaper.sweep(&mut self.broker, std::time::Instant::now());
                    if dropped > 0 {
                        debug!("dropped {dropped} idle clients");
                    }
                }
                _ = stats.tick() => {
                    info!(
                        "tracking {} clients, {} topics",
                        self.broker.clients().len(),
                        self.broker.topics().len()
                    );
                }
            }
        }
    }
}

// ICMP from an earlier send, not a socket failure
fn is_peer_feedback(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused
    )
}

/// Bind according to `settings` and run the relay until the socket fails.
pub async fn start_udp_server(settings: &Settings) -> Result<()> {
    let relay = UdpRelay::bind(settings).await?;
    info!("server listening {}", relay.local_addr()?);
    relay.run().await
}
