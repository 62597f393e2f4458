//! Syntactic IP address classification.
//!
//! Looser than `std::net` parsing: IPv4 bytes may carry a
//! leading zero (`010.0.0.1`), which the log service accepts as an IP.

use regex::Regex;
use std::sync::LazyLock;

const IP_BYTE: &str = "(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|0?[0-9]?[0-9])";
const IPV6_GROUP: &str = "[0-9A-Fa-f]{1,4}";

static IPV4_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^(?:{IP_BYTE}\.){{3}}{IP_BYTE}$")).unwrap());

static IPV6_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        // leading "::" (including "::" alone) | trailing "::" | no "::"
        "^(?::(?::|(?::{g}){{1,7}})|{g}(?::{g}){{0,6}}::|{g}(?::{g}){{7}})$",
        g = IPV6_GROUP
    ))
    .unwrap()
});

static IPV6_INNER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{g}(?:::?{g}){{1,6}}$", g = IPV6_GROUP)).unwrap());

pub fn is_ipv4(address: &str) -> bool {
    IPV4_RE.is_match(address)
}

pub fn is_ipv6(address: &str) -> bool {
    if IPV6_RE.is_match(address) {
        return true;
    }
    // Compressed form: exactly one "::" somewhere in the middle.
    IPV6_INNER_RE.is_match(address) && address.matches("::").count() == 1
}

pub fn is_ip(address: &str) -> bool {
    is_ipv4(address) || is_ipv6(address)
}
