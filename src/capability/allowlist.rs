use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// An IP address or CIDR range permitted to connect to a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllowlistEntry {
    pub address: String,
    #[serde(default)]
    pub description: String,
}

impl AllowlistEntry {
    pub fn new(address: &str, description: &str) -> Self {
        Self {
            address: address.to_string(),
            description: description.to_string(),
        }
    }

    /// Problems with the entry, in the order they are checked.
    pub fn violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if !is_cidr(&self.address) {
            violations.push(format!(
                "allowlist address {} must be an IP address or CIDR range",
                self.address
            ));
        }
        let len = self.description.chars().count();
        if !(1..=32).contains(&len) {
            violations.push(format!(
                "allowlist description for {} must be between 1 and 32 characters",
                self.address
            ));
        }
        violations
    }
}

impl fmt::Display for AllowlistEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, self.description)
    }
}

/// A bare address, or an address followed by a prefix length valid for its family.
fn is_cidr(value: &str) -> bool {
    let (addr, prefix) = match value.split_once('/') {
        Some((addr, prefix)) => (addr, Some(prefix)),
        None => (value, None),
    };
    let Ok(ip) = addr.parse::<IpAddr>() else {
        return false;
    };
    let max = if ip.is_ipv4() { 32 } else { 128 };
    match prefix {
        None => true,
        Some(p) => p.parse::<u8>().is_ok_and(|bits| bits <= max),
    }
}
