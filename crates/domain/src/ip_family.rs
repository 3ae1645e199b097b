use crate::DomainError;
use std::net::IpAddr;

/// Address family of a DNS question or answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    /// IPv4-mapped IPv6 addresses count as IPv4.
    pub fn of(ip: &IpAddr) -> Self {
        match ip.to_canonical() {
            IpAddr::V4(_) => IpFamily::V4,
            IpAddr::V6(_) => IpFamily::V6,
        }
    }

    pub fn matches(self, ip: &IpAddr) -> bool {
        Self::of(ip) == self
    }

    pub fn retain<I>(self, ips: I) -> Vec<IpAddr>
    where
        I: IntoIterator<Item = IpAddr>,
    {
        ips.into_iter()
            .filter(|ip| self.matches(ip))
            .map(|ip| ip.to_canonical())
            .collect()
    }
}

/// Parses textual addresses, failing on the first invalid entry.
pub fn parse_ips<S: AsRef<str>>(raw: &[S]) -> Result<Vec<IpAddr>, DomainError> {
    raw.iter()
        .map(|s| {
            let s = s.as_ref().trim();
            s.parse::<IpAddr>()
                .map(|ip| ip.to_canonical())
                .map_err(|_| DomainError::InvalidIpAddress(s.to_string()))
        })
        .collect()
}
