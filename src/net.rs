//! Discovery of the addresses other devices can use to reach the server.

use std::net::IpAddr;

use tracing::warn;

/// Fixed entries appended after the interface addresses.
const LOOPBACK_ENTRIES: [&str; 2] = ["127.0.0.1", "localhost"];

/// List the addresses the server can be reached at.
///
/// Non-loopback IPv4 addresses of the local interfaces come first, in
/// enumeration order, followed by `127.0.0.1` and `localhost`. Only meant for
/// display; the server binds independently of this list.
pub fn list_addresses() -> Vec<String> {
    let interface_ips = match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces.into_iter().map(|iface| iface.ip()).collect(),
        Err(e) => {
            warn!(error = %e, "Failed to enumerate network interfaces");
            Vec::new()
        }
    };

    collect_addresses(interface_ips)
}

/// Keep usable IPv4 addresses and append the loopback entries.
pub fn collect_addresses(ips: impl IntoIterator<Item = IpAddr>) -> Vec<String> {
    ips.into_iter()
        .filter_map(|ip| match ip {
            IpAddr::V4(v4) if !v4.is_loopback() => Some(v4.to_string()),
            _ => None,
        })
        .chain(LOOPBACK_ENTRIES.iter().map(|s| s.to_string()))
        .collect()
}

/// Format addresses as `http://<addr>:<port>` URLs.
pub fn server_urls(addresses: &[String], port: u16) -> Vec<String> {
    addresses
        .iter()
        .map(|addr| format!("http://{}:{}", addr, port))
        .collect()
}
