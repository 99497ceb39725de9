//! Address resolution for cluster members.
//!
//! IPv4 members are resolved by host lookup of their advertised address.
//! IPv6 members are taken from interface state, since the deployment system
//! only advertises IPv4 private addresses.

use async_trait::async_trait;
use hacluster_common::{AddressFamily, HaclusterError};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use crate::process::{CommandRunner, CommandSpec};

/// Capability to turn names and interfaces into addresses
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve a hostname or literal to an IPv4 address
    async fn host_ip(&self, host: &str) -> Result<Ipv4Addr, HaclusterError>;

    /// First usable global IPv6 address of this machine
    async fn ipv6_addr(&self) -> Result<Ipv6Addr, HaclusterError>;

    /// Network address of the IPv4 subnet configured on `iface`
    async fn network_address(&self, iface: &str) -> Result<Ipv4Addr, HaclusterError>;
}

fn unresolvable(target: &str, family: AddressFamily, reason: impl Into<String>) -> HaclusterError {
    HaclusterError::UnresolvableAddress {
        target: target.to_string(),
        family: family.to_string(),
        reason: reason.into(),
    }
}

/// Resolver using the system DNS and `ip` from iproute2
pub struct SystemResolver {
    runner: Arc<dyn CommandRunner>,
}

impl SystemResolver {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl AddressResolver for SystemResolver {
    async fn host_ip(&self, host: &str) -> Result<Ipv4Addr, HaclusterError> {
        match host.parse::<IpAddr>() {
            Ok(IpAddr::V4(addr)) => return Ok(addr),
            Ok(IpAddr::V6(_)) => {
                return Err(unresolvable(host, AddressFamily::Ipv4, "address is IPv6"));
            }
            Err(_) => {}
        }

        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| unresolvable(host, AddressFamily::Ipv4, e.to_string()))?;

        addrs
            .map(|sock| sock.ip())
            .find_map(|ip| match ip {
                IpAddr::V4(addr) => Some(addr),
                IpAddr::V6(_) => None,
            })
            .ok_or_else(|| unresolvable(host, AddressFamily::Ipv4, "no A record"))
    }

    async fn ipv6_addr(&self) -> Result<Ipv6Addr, HaclusterError> {
        let out = self
            .runner
            .check_output(&CommandSpec::new("ip").args(["-o", "-6", "addr", "show", "scope", "global"]))
            .await?;

        parse_global_ipv6(&out)
            .ok_or_else(|| unresolvable("local host", AddressFamily::Ipv6, "no global address configured"))
    }

    async fn network_address(&self, iface: &str) -> Result<Ipv4Addr, HaclusterError> {
        let out = self
            .runner
            .check_output(&CommandSpec::new("ip").args(["-o", "-4", "addr", "show", "dev", iface]))
            .await?;

        let (addr, prefix) = parse_ipv4_cidr(&out)
            .ok_or_else(|| unresolvable(iface, AddressFamily::Ipv4, "no address on interface"))?;
        network_of(addr, prefix)
            .ok_or_else(|| unresolvable(iface, AddressFamily::Ipv4, format!("invalid prefix /{}", prefix)))
    }
}

/// Flags marking addresses corosync must not bind to
const UNUSABLE_IPV6_FLAGS: &[&str] = &["temporary", "deprecated", "tentative", "dadfailed"];

/// First global, stable address from `ip -o -6 addr show` output
pub fn parse_global_ipv6(output: &str) -> Option<Ipv6Addr> {
    output.lines().find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.iter().any(|f| UNUSABLE_IPV6_FLAGS.contains(f)) {
            return None;
        }

        let cidr = fields
            .windows(2)
            .find(|pair| pair[0] == "inet6")
            .map(|pair| pair[1])?;
        let addr: Ipv6Addr = cidr.split('/').next()?.parse().ok()?;

        // fe80::/10
        let link_local = (addr.segments()[0] & 0xffc0) == 0xfe80;
        (!link_local && !addr.is_loopback()).then_some(addr)
    })
}

/// First `inet a.b.c.d/n` pair from `ip -o -4 addr show` output
pub fn parse_ipv4_cidr(output: &str) -> Option<(Ipv4Addr, u8)> {
    output.lines().find_map(|line| {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let cidr = fields
            .windows(2)
            .find(|pair| pair[0] == "inet")
            .map(|pair| pair[1])?;

        let (addr, prefix) = cidr.split_once('/')?;
        Some((addr.parse().ok()?, prefix.parse().ok()?))
    })
}

/// Mask `addr` down to its network address
pub fn network_of(addr: Ipv4Addr, prefix: u8) -> Option<Ipv4Addr> {
    if prefix > 32 {
        return None;
    }
    let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
    Some(Ipv4Addr::from(u32::from(addr) & mask))
}
