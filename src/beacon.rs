//! UDP discovery beacon broadcaster (spec.md §4.3).
//!
//! Runs independently of session state: it broadcasts whether or not a
//! mobile client is currently connected, so a second device can always
//! discover the host's TCP port.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::MissedTickBehavior;
use tracing::{debug, instrument, warn};

use crate::codec::{self, BeaconMessage, Message};
use crate::error::HostError;
use crate::metrics::HostMetrics;

/// Runs the beacon loop until `shutdown` resolves.
///
/// Broadcasts a `BEACON` message to `255.255.255.255:<beacon_port>` every
/// `interval`, advertising `tcp_port` and `service_name`. Shuts down within
/// one broadcast period of `shutdown` resolving (spec.md §4.3).
///
/// # Errors
///
/// Returns [`HostError::Bind`] if the UDP socket cannot be bound or have
/// `SO_BROADCAST` enabled.
#[instrument(skip(shutdown), fields(tcp_port, beacon_port))]
pub async fn run(
    service_name: String,
    tcp_port: u16,
    beacon_port: u16,
    interval: Duration,
    metrics: HostMetrics,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> Result<(), HostError> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .map_err(|source| HostError::Bind {
            kind: "beacon UDP",
            source,
        })?;
    socket.set_broadcast(true).map_err(|source| HostError::Bind {
        kind: "beacon UDP broadcast",
        source,
    })?;

    let destination = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, beacon_port));
    let payload = codec::encode(&Message::Beacon(BeaconMessage {
        port: tcp_port,
        name: service_name,
    }));

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match socket.send_to(&payload, destination).await {
                    Ok(_) => {
                        metrics.record_beacon_sent();
                        debug!(%destination, "beacon sent");
                    }
                    Err(err) => warn!(error = %err, "beacon send failed"),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("beacon shutting down");
                    return Ok(());
                }
            }
        }
    }
}
