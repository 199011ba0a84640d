//! Identity extraction — recipient, sender, and tenant from raw headers.
//!
//! Works on the raw message text, not a full MIME parse: header values are
//! taken verbatim (after unwrapping `Name <addr>` forms) and are not
//! validated as addresses. Malformed headers never raise — every failure
//! degrades to the `unknown`/`default` sentinels.

use std::sync::LazyLock;

use regex::Regex;

/// Sentinel for a missing or unparseable address.
pub const UNKNOWN: &str = "unknown";

/// Sentinel tenant for recipients without a usable local part.
pub const DEFAULT_TENANT: &str = "default";

/// Recipient headers, in strict priority order.
static RECIPIENT_HEADERS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        header_regex("To"),
        header_regex("Delivered-To"),
        header_regex("X-Original-To"),
    ]
});

static FROM_HEADER: LazyLock<Regex> = LazyLock::new(|| header_regex("From"));

/// `Name <addr>` → the address inside the brackets.
static ANGLE_ADDR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^>]+)>").unwrap());

/// Local part of an address: non-empty run before the first `@`.
static LOCAL_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^@]+)@").unwrap());

fn header_regex(name: &str) -> Regex {
    Regex::new(&format!(r"(?mi)^{name}:[ \t]*([^\r\n]+)")).unwrap()
}

/// Identity derived from an inbound message's headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageIdentity {
    /// Recipient address, or `unknown`.
    pub recipient: String,
    /// Sender address, or `unknown`.
    pub sender: String,
    /// Tenant id: the recipient's local part, or `default`.
    pub tenant: String,
}

/// Extract `{recipient, sender, tenant}` from raw message text.
///
/// Recipient comes from the first of `To`, `Delivered-To`, `X-Original-To`
/// present (priority order, regardless of where they appear in the text);
/// sender from `From`.
pub fn extract_identity(raw: &str) -> MessageIdentity {
    let recipient = RECIPIENT_HEADERS
        .iter()
        .find_map(|re| header_value(re, raw))
        .unwrap_or_else(|| UNKNOWN.to_string());

    let sender = header_value(&FROM_HEADER, raw).unwrap_or_else(|| UNKNOWN.to_string());

    let tenant = LOCAL_PART
        .captures(&recipient)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_TENANT.to_string());

    MessageIdentity {
        recipient,
        sender,
        tenant,
    }
}

/// Pull a header value and unwrap an angle-bracketed address if present.
fn header_value(re: &Regex, raw: &str) -> Option<String> {
    let value = re.captures(raw)?.get(1)?.as_str().trim();
    let addr = ANGLE_ADDR
        .captures(value)
        .and_then(|c| c.get(1))
        .map_or(value, |m| m.as_str());
    Some(addr.to_string())
}
