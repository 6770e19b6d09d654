//! Mask matching for ban lines.
//!
//! Three flavours are needed:
//! - **ident@host**: both halves glob-matched, ASCII case-insensitive.
//! - **IP / CIDR**: `addr/prefix` masks test network membership; anything
//!   else falls back to a glob so `192.168.*` style masks keep working.
//! - **nickname**: a single glob under RFC 1459 case mapping.
//!
//! Glob syntax is the usual IRC one: `*` matches any run of characters
//! (including none), `?` matches exactly one.

use crate::casemap::Casemapping;
use ipnet::IpNet;
use std::net::IpAddr;

/// An ident mask and a host mask, split from `ident@host`.
pub type IdentHostPair = (String, String);

/// Glob-match `text` against `pattern` after folding both with `casemap`.
pub fn wildcard_match_with(pattern: &str, text: &str, casemap: Casemapping) -> bool {
    let pattern: Vec<char> = pattern.chars().map(|c| casemap.fold(c)).collect();
    let text: Vec<char> = text.chars().map(|c| casemap.fold(c)).collect();

    glob(&pattern, &text)
}

/// Glob match for idents, hosts and IP strings.
#[inline]
pub fn host_match(pattern: &str, text: &str) -> bool {
    wildcard_match_with(pattern, text, Casemapping::Ascii)
}

/// Glob match for nicknames.
#[inline]
pub fn nick_match(pattern: &str, nick: &str) -> bool {
    wildcard_match_with(pattern, nick, Casemapping::Rfc1459)
}

/// Iterative matcher with single-star backtracking.
fn glob(pattern: &[char], text: &[char]) -> bool {
    let mut p = 0;
    let mut t = 0;
    let mut star_p = None;
    let mut star_t = 0;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star_p = Some(p);
            star_t = t;
            p += 1;
        } else if let Some(sp) = star_p {
            p = sp + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }

    p == pattern.len()
}

/// Split `ident@host` into its two halves.
///
/// Without an `@` the ident defaults to `*` and the whole string is the host.
/// With one, an empty half becomes `*`. The split happens at the first `@`.
pub fn ident_split(mask: &str) -> IdentHostPair {
    match mask.split_once('@') {
        Some((ident, host)) => (star_if_empty(ident), star_if_empty(host)),
        None => ("*".to_string(), mask.to_string()),
    }
}

fn star_if_empty(s: &str) -> String {
    if s.is_empty() {
        "*".to_string()
    } else {
        s.to_string()
    }
}

/// Match an address (or hostname) against a host mask that may be CIDR.
///
/// When `mask` parses as a network, an IP `address` matches if it lies
/// inside it and a network `address` matches if it is wholly contained.
/// Otherwise this is a plain [`host_match`].
pub fn match_cidr(address: &str, mask: &str) -> bool {
    if mask.contains('/')
        && let Ok(net) = mask.parse::<IpNet>()
    {
        if let Ok(ip) = address.parse::<IpAddr>() {
            return net.contains(&ip);
        }
        if let Ok(inner) = address.parse::<IpNet>() {
            return net.contains(&inner);
        }
    }

    host_match(mask, address)
}

/// Match `ident@host` text against an `ident@host` mask.
///
/// If both sides carry an ident the idents are globbed and the hosts go
/// through [`match_cidr`]. If either side lacks one, only the host parts
/// are compared. Both sides split at the first `@`, as [`ident_split`] does.
pub fn match_user_mask(text: &str, mask: &str) -> bool {
    match (text.split_once('@'), mask.split_once('@')) {
        (Some((ident, host)), Some((ident_mask, host_mask))) => {
            host_match(ident_mask, ident) && match_cidr(host, host_mask)
        }
        (text_split, mask_split) => {
            let host = text_split.map_or(text, |(_, h)| h);
            let host_mask = mask_split.map_or(mask, |(_, h)| h);
            match_cidr(host, host_mask)
        }
    }
}
