//! Controller address detection.
//!
//! The controller address is the source address the host would use to reach
//! a well-known external address, i.e. the primary outbound interface.

use std::net::IpAddr;
use tokio::net::UdpSocket;
use tokio::process::Command;

/// Address whose route selects the outbound interface
pub const ROUTE_PROBE_ADDR: &str = "8.8.8.8";

/// Detects the host's primary outbound address.
///
/// Asks the routing table first (`ip route get`), then falls back to the local
/// address of a connected UDP socket. Connecting a UDP socket performs a route
/// lookup without sending any packet.
pub async fn detect_controller_ip() -> Option<IpAddr> {
    if let Some(ip) = route_source_address().await {
        log::debug!("controller ip {} from routing table", ip);
        return Some(ip);
    }

    let ip = udp_source_address().await;
    if let Some(ip) = ip {
        log::debug!("controller ip {} from udp socket", ip);
    }
    ip
}

async fn route_source_address() -> Option<IpAddr> {
    let output = match Command::new("ip")
        .args(["-4", "route", "get", ROUTE_PROBE_ADDR])
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            log::debug!("cannot run 'ip route get': {}", e);
            return None;
        }
    };

    if !output.status.success() {
        log::debug!(
            "'ip route get {}' exited with {:?}: {}",
            ROUTE_PROBE_ADDR,
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return None;
    }

    parse_route_source(&String::from_utf8_lossy(&output.stdout))
}

async fn udp_source_address() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").await.ok()?;
    socket.connect((ROUTE_PROBE_ADDR, 53)).await.ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}

/// Extracts the `src` address from `ip route get` output.
pub fn parse_route_source(output: &str) -> Option<IpAddr> {
    let mut tokens = output.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == "src" {
            return tokens.next()?.parse().ok();
        }
    }
    None
}
