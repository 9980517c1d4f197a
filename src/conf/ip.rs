//! IP allow-list entries
//!
//! An entry is either a single address (`10.0.0.5`) or a CIDR range
//! (`192.168.0.0/16`, `fd00::/8`).

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use super::error::ConfError;

/// A single address or a CIDR block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpRange {
    addr: IpAddr,
    prefix: u8,
}

impl IpRange {
    /// Create a range from a base address and prefix length
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self, ConfError> {
        let max = max_prefix(&addr);
        if prefix > max {
            return Err(ConfError::InvalidIpRange(format!("{}/{}", addr, prefix)));
        }

        Ok(Self { addr, prefix })
    }

    /// Base address
    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    /// Prefix length in bits
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Check whether `ip` falls inside this range
    ///
    /// IPv4-mapped IPv6 addresses are compared as IPv4.
    pub fn contains(&self, ip: IpAddr) -> bool {
        let ip = match ip {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
            v4 => v4,
        };

        match (self.addr, ip) {
            (IpAddr::V4(base), IpAddr::V4(ip)) => {
                let mask = mask_u32(self.prefix);
                (u32::from(base) & mask) == (u32::from(ip) & mask)
            }
            (IpAddr::V6(base), IpAddr::V6(ip)) => {
                let mask = mask_u128(self.prefix);
                (u128::from(base) & mask) == (u128::from(ip) & mask)
            }
            _ => false,
        }
    }
}

fn max_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn mask_u32(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

fn mask_u128(prefix: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix))
    }
}

impl FromStr for IpRange {
    type Err = ConfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfError::InvalidIpRange(s.to_string());

        match s.split_once('/') {
            Some((addr, prefix)) => {
                let addr: IpAddr = addr.trim().parse().map_err(|_| invalid())?;
                let prefix: u8 = prefix.trim().parse().map_err(|_| invalid())?;
                Self::new(addr, prefix).map_err(|_| invalid())
            }
            None => {
                let addr: IpAddr = s.trim().parse().map_err(|_| invalid())?;
                Ok(Self {
                    addr,
                    prefix: max_prefix(&addr),
                })
            }
        }
    }
}

impl TryFrom<String> for IpRange {
    type Error = ConfError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix == max_prefix(&self.addr) {
            write!(f, "{}", self.addr)
        } else {
            write!(f, "{}/{}", self.addr, self.prefix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_single_address() {
        let range: IpRange = "10.0.0.5".parse().unwrap();
        assert_eq!(range.prefix(), 32);
        assert!(range.contains(ip("10.0.0.5")));
        assert!(!range.contains(ip("10.0.0.6")));
    }

    #[test]
    fn test_cidr_v4() {
        let range: IpRange = "192.168.0.0/16".parse().unwrap();
        assert!(range.contains(ip("192.168.44.1")));
        assert!(!range.contains(ip("192.169.0.1")));
        assert!(range.contains(ip("::ffff:192.168.1.1")));
    }

    #[test]
    fn test_cidr_v6() {
        let range: IpRange = "fd00::/8".parse().unwrap();
        assert!(range.contains(ip("fd12::1")));
        assert!(!range.contains(ip("fe80::1")));
        assert!(!range.contains(ip("10.0.0.1")));
    }

    #[test]
    fn test_zero_prefix_matches_family() {
        let range: IpRange = "0.0.0.0/0".parse().unwrap();
        assert!(range.contains(ip("8.8.8.8")));
    }

    #[test]
    fn test_invalid_ranges() {
        assert!("10.0.0.0/33".parse::<IpRange>().is_err());
        assert!("not-an-ip".parse::<IpRange>().is_err());
        assert!("10.0.0.0/x".parse::<IpRange>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!("10.1.0.0/16".parse::<IpRange>().unwrap().to_string(), "10.1.0.0/16");
        assert_eq!("10.1.2.3".parse::<IpRange>().unwrap().to_string(), "10.1.2.3");
    }
}
