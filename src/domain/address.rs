//! Public address value
//!
//! The echo service's answer, parsed once and rendered as a single-host CIDR
//! everywhere it is written.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::PublicIpError;

/// The caller's externally observed IPv4 address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicIp(Ipv4Addr);

impl PublicIp {
    pub fn new(addr: Ipv4Addr) -> Self {
        Self(addr)
    }

    /// Parse the plain-text body returned by the echo service
    pub fn parse_response(body: &str) -> Result<Self, PublicIpError> {
        Ipv4Addr::from_str(body.trim())
            .map(Self::new)
            .map_err(|_| PublicIpError::InvalidAddress {
                body: body.to_string(),
            })
    }

    /// Single-host CIDR, e.g. `5.6.7.8/32`
    pub fn host_cidr(&self) -> String {
        format!("{}/32", self.0)
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.0
    }
}

impl fmt::Display for PublicIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.addr().fmt(f)
    }
}
