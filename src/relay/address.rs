//! IPv6 prefix parsing and prefix + suffix composition.
//!
//! Routers with a delegated IPv6 prefix report it as `2001:db8:1::/56`.
//! Hosts behind the router are addressed by OR-ing a fixed interface
//! suffix into that prefix.

use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

/// An IPv6 network, normalized to its network address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Prefix {
    network: Ipv6Addr,
    len: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrefixParseError {
    #[error("invalid address")]
    Address,
    #[error("invalid prefix length")]
    Length,
}

impl Ipv6Prefix {
    /// Build a prefix, clearing any host bits set in `addr`.
    pub fn new(addr: Ipv6Addr, len: u8) -> Result<Self, PrefixParseError> {
        if len > 128 {
            return Err(PrefixParseError::Length);
        }
        let mask = if len == 0 {
            0
        } else {
            u128::MAX << (128 - u32::from(len))
        };
        Ok(Self {
            network: Ipv6Addr::from(u128::from(addr) & mask),
            len,
        })
    }

    #[must_use]
    pub const fn network(&self) -> Ipv6Addr {
        self.network
    }

    #[must_use]
    pub const fn prefix_len(&self) -> u8 {
        self.len
    }

    /// Address made of this prefix's network bits OR-ed with `suffix`.
    ///
    /// Overlap between prefix and suffix bits is not checked; the caller
    /// configures a suffix that fits inside the host part.
    #[must_use]
    pub fn with_suffix(&self, suffix: Ipv6Addr) -> Ipv6Addr {
        Ipv6Addr::from(u128::from(self.network) | u128::from(suffix))
    }
}

impl FromStr for Ipv6Prefix {
    type Err = PrefixParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = match s.split_once('/') {
            Some((addr, len)) => (addr, len.parse::<u8>().map_err(|_| PrefixParseError::Length)?),
            None => (s, 128),
        };
        let addr = addr.parse::<Ipv6Addr>().map_err(|_| PrefixParseError::Address)?;
        Self::new(addr, len)
    }
}

impl fmt::Display for Ipv6Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.len)
    }
}
