use actix_web::HttpRequest;
use std::net::{IpAddr, SocketAddr};

use crate::config::AppState;

/// Folds IPv4-mapped IPv6 addresses back to plain IPv4 so `::ffff:1.2.3.4`
/// and `1.2.3.4` compare equal.
pub fn canonical_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    }
}

fn parse_addr(text: &str) -> Option<IpAddr> {
    let text = text.trim();
    text.parse::<SocketAddr>()
        .map(|s| s.ip())
        .or_else(|_| text.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>())
        .ok()
}

pub fn client_address(req: &HttpRequest, trust_proxy: bool) -> Option<IpAddr> {
    let ip = if trust_proxy {
        req.connection_info().realip_remote_addr().and_then(parse_addr)
    } else {
        req.peer_addr().map(|s| s.ip())
    };
    ip.map(canonical_ip)
}

pub fn base_url(req: &HttpRequest, state: &AppState) -> String {
    match &state.public_url {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => {
            let info = req.connection_info();
            format!("{}://{}", info.scheme(), info.host())
        }
    }
}

/// The key goes in the fragment, which browsers never send back to us.
pub fn share_link(base: &str, note_id: &str, key: &str) -> String {
    format!("{}/notemail/{}#{}", base, note_id, key)
}
