// skylink-rs - The Skylink Satellite Gateway Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Source-address selection for the gateway peer.
//!
//! The agent advertises its Via host as the local interface address that
//! shares a routing prefix with the device, so the device's replies land on
//! the socket we bound. DNS resolution is the only awaited operation; the
//! prefix arithmetic is pure and directly testable.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use trust_dns_resolver::{
    config::{ResolverConfig, ResolverOpts},
    TokioAsyncResolver,
};

/// Failure modes of source-address resolution; both are fatal to agent
/// startup and never retried here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Forward DNS lookup produced no usable A record.
    Resolution { host: String },
    /// No local interface block contains the destination.
    NoRoute { destination: Ipv4Addr },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolution { host } => {
                write!(f, "failed to resolve any IPv4 address for host {}", host)
            }
            Self::NoRoute { destination } => write!(
                f,
                "no local interface shares a routing prefix with {}",
                destination
            ),
        }
    }
}

impl std::error::Error for RouteError {}

/// An interface address together with its assigned netmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceBlock {
    pub addr: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

impl InterfaceBlock {
    pub fn new(addr: Ipv4Addr, netmask: Ipv4Addr) -> Self {
        Self { addr, netmask }
    }

    /// Builds a block from CIDR notation components, e.g. `10.0.0.5/24`.
    pub fn from_cidr(addr: Ipv4Addr, prefix_len: u8) -> Self {
        Self {
            addr,
            netmask: Ipv4Addr::from(mask_bits(prefix_len)),
        }
    }
}

/// Standard subnet containment: masked address equals masked base.
pub fn prefix_contains(addr: Ipv4Addr, base: Ipv4Addr, netmask: Ipv4Addr) -> bool {
    let mask = u32::from(netmask);
    u32::from(addr) & mask == u32::from(base) & mask
}

/// CIDR variant of [`prefix_contains`].
pub fn prefix_contains_cidr(addr: Ipv4Addr, base: Ipv4Addr, prefix_len: u8) -> bool {
    let mask = Ipv4Addr::from(mask_bits(prefix_len));
    prefix_contains(addr, base, mask)
}

fn mask_bits(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        len if len >= 32 => u32::MAX,
        len => u32::MAX << (32 - len),
    }
}

/// Picks the first interface whose prefix contains the destination.
pub fn select_source_addr(destination: Ipv4Addr, blocks: &[InterfaceBlock]) -> Option<Ipv4Addr> {
    blocks
        .iter()
        .find(|block| prefix_contains(destination, block.addr, block.netmask))
        .map(|block| block.addr)
}

/// Enumerates the machine's IPv4 interface blocks (loopback excluded).
pub fn system_interface_blocks() -> Vec<InterfaceBlock> {
    let Ok(interfaces) = if_addrs::get_if_addrs() else {
        return Vec::new();
    };
    interfaces
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .filter_map(|iface| match iface.addr {
            if_addrs::IfAddr::V4(v4) => Some(InterfaceBlock::new(v4.ip, v4.netmask)),
            if_addrs::IfAddr::V6(_) => None,
        })
        .collect()
}

/// Resolves the local source address to use toward `destination`.
///
/// A non-literal destination is resolved via forward DNS first (first A
/// record wins); the result is then matched against the local interface
/// blocks.
pub async fn resolve_source_addr(destination: &str) -> Result<Ipv4Addr, RouteError> {
    let dest_ip = match destination.parse::<Ipv4Addr>() {
        Ok(ip) => ip,
        Err(_) => resolve_first_a(destination).await?,
    };

    // Loopback destinations are reached from loopback; the enumeration
    // below deliberately excludes that interface.
    if dest_ip.is_loopback() {
        return Ok(dest_ip);
    }

    select_source_addr(dest_ip, &system_interface_blocks())
        .ok_or(RouteError::NoRoute {
            destination: dest_ip,
        })
}

async fn resolve_first_a(host: &str) -> Result<Ipv4Addr, RouteError> {
    let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
    let lookup = resolver
        .lookup_ip(host)
        .await
        .map_err(|_| RouteError::Resolution {
            host: host.to_owned(),
        })?;
    lookup
        .iter()
        .find_map(|ip| match ip {
            IpAddr::V4(addr) => Some(addr),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| RouteError::Resolution {
            host: host.to_owned(),
        })
}
