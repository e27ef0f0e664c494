//! SSDP-style network discovery.
//!
//! [`NetworkDiscovery`] runs a cancellable background scan loop: it
//! broadcasts an SSDP `M-SEARCH` over UDP, listens for responses until a
//! per-cycle deadline, and records each responding address. Every newly
//! discovered address fires one event on the discovery channel; the full
//! set is queryable at any time.
//!
//! This is a sibling utility of the chain engine, not part of it: a single
//! broadcast/listen loop with no internal state machine.

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::AbortHandle;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const SSDP_MULTICAST_ADDR: &str = "239.255.255.250:1900";
const SSDP_M_SEARCH: &str = "M-SEARCH * HTTP/1.1\r\n\
    HOST: 239.255.255.250:1900\r\n\
    MAN: \"ssdp:discover\"\r\n\
    MX: 2\r\n\
    ST: ssdp:all\r\n\r\n";
const LISTEN_WINDOW: Duration = Duration::from_secs(3);
const SCAN_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("bind address must not be empty")]
    EmptyBindAddress,
    #[error("invalid bind address `{addr}`: {source}")]
    InvalidBindAddress {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Discovers devices on the local network via SSDP broadcast.
pub struct NetworkDiscovery {
    bind_addr: SocketAddr,
    discovered: Arc<Mutex<HashSet<String>>>,
    event_tx: mpsc::UnboundedSender<String>,
    event_rx: Option<mpsc::UnboundedReceiver<String>>,
}

impl NetworkDiscovery {
    /// Construct a discovery service bound to the given local IP and port.
    /// Fails immediately on an empty or unparsable address.
    pub fn new(bind_ip: &str, port: u16) -> Result<Self, DiscoveryError> {
        let bind_ip = bind_ip.trim();
        if bind_ip.is_empty() {
            return Err(DiscoveryError::EmptyBindAddress);
        }
        let ip: IpAddr = bind_ip
            .parse()
            .map_err(|source| DiscoveryError::InvalidBindAddress {
                addr: bind_ip.to_string(),
                source,
            })?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Ok(Self {
            bind_addr: SocketAddr::new(ip, port),
            discovered: Arc::new(Mutex::new(HashSet::new())),
            event_tx,
            event_rx: Some(event_rx),
        })
    }

    /// Take the discovery event stream. Each newly discovered address is
    /// delivered exactly once. Returns `None` after the first call.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<String>> {
        self.event_rx.take()
    }

    /// Snapshot of every address discovered so far.
    #[must_use]
    pub fn discovered(&self) -> HashSet<String> {
        self.discovered.lock().map(|set| set.clone()).unwrap_or_default()
    }

    /// Spawn the background scan loop. The loop checks the handle between
    /// cycles and stops promptly once it is aborted.
    #[must_use]
    pub fn spawn_scan(&self, cancel: AbortHandle) -> JoinHandle<()> {
        let bind_addr = self.bind_addr;
        let discovered = self.discovered.clone();
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            tracing::info!(%bind_addr, "starting discovery scan loop");
            while !cancel.is_aborted() {
                if let Err(error) = scan_cycle(bind_addr, &discovered, &event_tx).await {
                    tracing::warn!(%error, "discovery cycle failed");
                }
                tokio::time::sleep(SCAN_INTERVAL).await;
            }
            tracing::info!("discovery scan loop cancelled");
        })
    }
}

/// One broadcast/listen cycle: send an `M-SEARCH`, then record every sender
/// that responds before the listen window closes.
async fn scan_cycle(
    bind_addr: SocketAddr,
    discovered: &Arc<Mutex<HashSet<String>>>,
    event_tx: &mpsc::UnboundedSender<String>,
) -> std::io::Result<()> {
    let socket = UdpSocket::bind(bind_addr).await?;
    socket.send_to(SSDP_M_SEARCH.as_bytes(), SSDP_MULTICAST_ADDR).await?;

    let mut buf = [0u8; 2048];
    let deadline = tokio::time::Instant::now() + LISTEN_WINDOW;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await {
            Ok(Ok((_len, sender))) => {
                record_address(discovered, event_tx, sender.ip().to_string());
            }
            Ok(Err(error)) => return Err(error),
            // Listen window elapsed.
            Err(_) => break,
        }
    }
    Ok(())
}

/// Record an address, firing one event if it is new. Returns whether the
/// address had not been seen before.
fn record_address(
    discovered: &Arc<Mutex<HashSet<String>>>,
    event_tx: &mpsc::UnboundedSender<String>,
    address: String,
) -> bool {
    let newly_seen = discovered
        .lock()
        .map(|mut set| set.insert(address.clone()))
        .unwrap_or(false);
    if newly_seen {
        tracing::info!(%address, "discovered network address");
        // The receiver may have been dropped; discovery keeps running.
        let _ = event_tx.send(address);
    }
    newly_seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bind_address_is_rejected() {
        assert!(matches!(
            NetworkDiscovery::new("", 1900),
            Err(DiscoveryError::EmptyBindAddress)
        ));
        assert!(matches!(
            NetworkDiscovery::new("   ", 1900),
            Err(DiscoveryError::EmptyBindAddress)
        ));
    }

    #[test]
    fn unparsable_bind_address_is_rejected() {
        assert!(matches!(
            NetworkDiscovery::new("not-an-ip", 1900),
            Err(DiscoveryError::InvalidBindAddress { .. })
        ));
    }

    #[test]
    fn event_stream_can_only_be_taken_once() {
        let mut discovery = NetworkDiscovery::new("0.0.0.0", 0).unwrap();
        assert!(discovery.take_events().is_some());
        assert!(discovery.take_events().is_none());
    }

    #[tokio::test]
    async fn each_address_fires_exactly_one_event() {
        let mut discovery = NetworkDiscovery::new("0.0.0.0", 0).unwrap();
        let mut events = discovery.take_events().unwrap();

        assert!(record_address(
            &discovery.discovered,
            &discovery.event_tx,
            "192.168.1.10".to_string(),
        ));
        assert!(!record_address(
            &discovery.discovered,
            &discovery.event_tx,
            "192.168.1.10".to_string(),
        ));
        assert!(record_address(
            &discovery.discovered,
            &discovery.event_tx,
            "192.168.1.11".to_string(),
        ));

        assert_eq!(events.recv().await, Some("192.168.1.10".to_string()));
        assert_eq!(events.recv().await, Some("192.168.1.11".to_string()));
        assert_eq!(
            discovery.discovered(),
            HashSet::from(["192.168.1.10".to_string(), "192.168.1.11".to_string()])
        );
    }
}
