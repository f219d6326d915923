//! Address prefix parsing.
//!
//! Inbound lines may start with `@all:` (broadcast) or `@<id>:` (directed,
//! where `<id>` is usually a peer's `host:port`). Anything else is
//! unaddressed. Parsing is pure; resolving a directed token to a live
//! connection happens in the dispatcher against a registry snapshot.

use crate::constants::BROADCAST_TOKEN;

/// Delivery target parsed from a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every registered connection except the sender.
    All,
    /// A single connection, matched by address identifier or display name.
    One(String),
    /// No addressing prefix. The server delivers these like `All`.
    Unaddressed,
}

/// A parsed line: where it goes and what is left after the prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub target: Target,
    pub payload: &'a str,
}

pub fn resolve(raw: &str) -> Resolution<'_> {
    let unaddressed = Resolution {
        target: Target::Unaddressed,
        payload: raw,
    };

    let Some(rest) = raw.strip_prefix('@') else {
        return unaddressed;
    };

    if let Some(after) = rest.strip_prefix(BROADCAST_TOKEN) {
        if let Some(payload) = after.trim_start().strip_prefix(':') {
            return Resolution {
                target: Target::All,
                payload: strip_leading_space(payload),
            };
        }
    }

    match split_token(rest) {
        Some((token, payload)) => Resolution {
            target: Target::One(token.to_string()),
            payload: strip_leading_space(payload),
        },
        None => unaddressed,
    }
}

/// Splits `<token>:<payload>`. A token of the form `host:port` keeps its
/// port; bracketed IPv6 hosts run to the closing bracket.
fn split_token(rest: &str) -> Option<(&str, &str)> {
    let host_end = if rest.starts_with('[') {
        rest.find(']')? + 1
    } else {
        rest.find(':')?
    };
    let host = &rest[..host_end];
    let after_host = rest[host_end..].strip_prefix(':')?;

    let digits = after_host.bytes().take_while(|b| b.is_ascii_digit()).count();
    let (token_len, payload) = match after_host[digits..].strip_prefix(':') {
        Some(payload) if digits > 0 => (host_end + 1 + digits, payload),
        _ => (host_end, after_host),
    };

    let token = &rest[..token_len];
    if host.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some((token, payload))
}

fn strip_leading_space(payload: &str) -> &str {
    payload.strip_prefix(' ').unwrap_or(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(token: &str) -> Target {
        Target::One(token.to_string())
    }

    #[test]
    fn test_broadcast_prefix() {
        let r = resolve("@all: hi");
        assert_eq!(r.target, Target::All);
        assert_eq!(r.payload, "hi");
    }

    #[test]
    fn test_broadcast_prefix_whitespace_before_colon() {
        let r = resolve("@all  :hello there");
        assert_eq!(r.target, Target::All);
        assert_eq!(r.payload, "hello there");
    }

    #[test]
    fn test_broadcast_prefix_is_case_sensitive() {
        let r = resolve("@ALL: hi");
        assert_eq!(r.target, one("ALL"));
    }

    #[test]
    fn test_empty_broadcast_payload() {
        let r = resolve("@all:");
        assert_eq!(r.target, Target::All);
        assert_eq!(r.payload, "");
    }

    #[test]
    fn test_directed_host_port() {
        let r = resolve("@127.0.0.1:5051: Hello");
        assert_eq!(r.target, one("127.0.0.1:5051"));
        assert_eq!(r.payload, "Hello");
    }

    #[test]
    fn test_directed_ipv6() {
        let r = resolve("@[::1]:6000: yo");
        assert_eq!(r.target, one("[::1]:6000"));
        assert_eq!(r.payload, "yo");
    }

    #[test]
    fn test_directed_name() {
        let r = resolve("@alice: lunch?");
        assert_eq!(r.target, one("alice"));
        assert_eq!(r.payload, "lunch?");
    }

    #[test]
    fn test_name_followed_by_number_is_not_a_port() {
        let r = resolve("@bob:5 apples");
        assert_eq!(r.target, one("bob"));
        assert_eq!(r.payload, "5 apples");
    }

    #[test]
    fn test_name_starting_with_all() {
        let r = resolve("@allison: hey");
        assert_eq!(r.target, one("allison"));
        assert_eq!(r.payload, "hey");
    }

    #[test]
    fn test_unaddressed() {
        let r = resolve("just talking");
        assert_eq!(r.target, Target::Unaddressed);
        assert_eq!(r.payload, "just talking");
    }

    #[test]
    fn test_malformed_prefixes_are_unaddressed() {
        for raw in ["@no colon here", "@: empty", "@two words: x", "@[::1 broken", "@"] {
            let r = resolve(raw);
            assert_eq!(r.target, Target::Unaddressed, "{raw}");
            assert_eq!(r.payload, raw);
        }
    }

    #[test]
    fn test_payload_keeps_extra_spacing() {
        let r = resolve("@all:   indented");
        assert_eq!(r.payload, "  indented");
    }
}
