// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Broker address parsing.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

pub const DEFAULT_BROKER_PORT: u16 = 7883;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub host: String,
    pub port: u16,
}

impl BrokerEndpoint {
    /// `host:port`, with IPv6 hosts bracketed.
    pub fn connect_addr(&self) -> String {
        match self.host.parse::<IpAddr>() {
            Ok(IpAddr::V6(_)) => format!("[{}]:{}", self.host, self.port),
            _ => format!("{}:{}", self.host, self.port),
        }
    }
}

impl fmt::Display for BrokerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.connect_addr())
    }
}

/// Parse a broker address.
///
/// Accepts `host`, `host:port`, IP literals (`[v6]:port`, bare `v6`), each
/// optionally prefixed with `tcp://`. The port defaults to
/// [`DEFAULT_BROKER_PORT`].
pub fn parse_broker_url(url: &str) -> Result<BrokerEndpoint, String> {
    let trimmed = url.trim();
    let addr = trimmed.strip_prefix("tcp://").unwrap_or(trimmed);
    if addr.is_empty() {
        return Err("broker url is empty".into());
    }

    if let Ok(sock) = addr.parse::<SocketAddr>() {
        return endpoint(sock.ip().to_string(), sock.port());
    }
    let literal = addr
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(addr);
    if let Ok(ip) = literal.parse::<IpAddr>() {
        return endpoint(ip.to_string(), DEFAULT_BROKER_PORT);
    }

    let (host, port) = match addr.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| format!("invalid broker port: '{port}'"))?;
            (host, port)
        }
        None => (addr, DEFAULT_BROKER_PORT),
    };
    if host.contains([':', '[', ']']) {
        return Err(format!(
            "invalid broker host '{host}': IPv6 hosts must be bracketed like [::1]:{DEFAULT_BROKER_PORT}"
        ));
    }
    endpoint(host.to_string(), port)
}

fn endpoint(host: String, port: u16) -> Result<BrokerEndpoint, String> {
    if host.is_empty() {
        return Err("invalid broker url: host is empty".into());
    }
    if port == 0 {
        return Err("invalid broker port: 0".into());
    }
    Ok(BrokerEndpoint { host, port })
}
