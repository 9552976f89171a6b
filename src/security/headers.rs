//! Local header heuristics for proxy and bot traffic.
//!
//! Pure and synchronous; runs before any network lookup. Checks, in order,
//! stopping at the first hit:
//! 1. proxy-indicating headers
//! 2. missing `user-agent`
//! 3. suspicious `user-agent` substrings
//! 4. missing `accept-language`

use std::borrow::Cow;

use axum::http::HeaderMap;

use crate::security::verdict::Verdict;

/// Headers inspected in step 1, in evaluation order.
pub const PROXY_HEADERS: [&str; 12] = [
    "x-forwarded-for",
    "x-real-ip",
    "x-proxy-id",
    "via",
    "x-forwarded-proto",
    "x-forwarded-host",
    "proxy-client-ip",
    "wl-proxy-client-ip",
    "http_x_forwarded_for",
    "http_client_ip",
    "http_forwarded_for",
    "http_via",
];

/// Case-insensitive user-agent substrings that mark automated or anonymizing clients.
pub const SUSPICIOUS_AGENTS: [&str; 13] = [
    "proxy", "vpn", "tor", "anonymizer", "hide", "mask", "tunnel", "phantom", "spider", "crawler",
    "bot", "curl", "wget",
];

/// More forwarded hops than this is treated as a relay chain.
const MAX_FORWARDED_HOPS: usize = 2;

/// Classify a request from its headers alone.
pub fn inspect_headers(headers: &HeaderMap) -> Verdict {
    for name in PROXY_HEADERS {
        let Some(value) = header_str(headers, name) else {
            continue;
        };

        if name == "x-forwarded-for" {
            if value.split(',').count() > MAX_FORWARDED_HOPS {
                return Verdict::flagged("multi-hop proxy chain detected");
            }
        } else if name == "via" {
            return Verdict::flagged("via header present");
        } else if name.contains("proxy") {
            return Verdict::flagged("proxy header present");
        }
    }

    let Some(user_agent) = header_str(headers, "user-agent") else {
        return Verdict::flagged("user-agent header missing");
    };

    let lower = user_agent.to_lowercase();
    if SUSPICIOUS_AGENTS.iter().any(|s| lower.contains(s)) {
        return Verdict::flagged("suspicious user-agent");
    }

    if header_str(headers, "accept-language").is_none() {
        return Verdict::flagged("accept-language header missing");
    }

    Verdict::clean()
}

/// Header value as text; absent and empty values count as missing.
///
/// Non-visible bytes are replaced rather than dropped so a present header is
/// still inspected.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<Cow<'a, str>> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()))
        .filter(|v| !v.is_empty())
}
