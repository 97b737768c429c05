// ── VPN subnet ──
//
// The address space handed out to clients. The network address, the
// broadcast address and the gateway (first host, owned by the server)
// are never usable.

use std::fmt;
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::str::FromStr;

use ipnet::Ipv4Net;

use crate::error::CoreError;

/// An IPv4 CIDR block, normalized to its network address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subnet(Ipv4Net);

impl Subnet {
    pub fn new(net: Ipv4Net) -> Self {
        Self(net.trunc())
    }

    pub fn network(&self) -> Ipv4Addr {
        self.0.network()
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        self.0.broadcast()
    }

    pub fn netmask(&self) -> Ipv4Addr {
        self.0.netmask()
    }

    pub fn prefix_len(&self) -> u8 {
        self.0.prefix_len()
    }

    /// The first host address, reserved for the VPN server itself.
    ///
    /// `None` for /32, which has no host beyond the network address.
    pub fn gateway(&self) -> Option<Ipv4Addr> {
        if self.prefix_len() >= 32 {
            return None;
        }
        self.network().to_bits().checked_add(1).map(Ipv4Addr::from_bits)
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.0.contains(&addr)
    }

    /// Usable client addresses in ascending order.
    pub fn usable_hosts(&self) -> impl Iterator<Item = Ipv4Addr> + use<> {
        self.usable_bits()
            .into_iter()
            .flatten()
            .map(Ipv4Addr::from_bits)
    }

    pub fn usable_count(&self) -> u64 {
        self.usable_bits()
            .map_or(0, |range| u64::from(range.end() - range.start()) + 1)
    }

    fn usable_bits(&self) -> Option<RangeInclusive<u32>> {
        // /31 and /32 leave nothing once network, gateway and broadcast are gone.
        if self.prefix_len() >= 31 {
            return None;
        }
        let first = self.network().to_bits() + 2;
        let last = self.broadcast().to_bits() - 1;
        Some(first..=last)
    }
}

impl FromStr for Subnet {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let net: Ipv4Net = s.trim().parse().map_err(|e| CoreError::Subnet {
            subnet: s.into(),
            reason: format!("{e}"),
        })?;
        Ok(Self::new(net))
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
