//! Allowlist gate — accept or reject a message by sender.
//!
//! Rejection is a normal pipeline outcome (`sender_not_allowed`), not an
//! error: it halts processing of that one message and nothing else.

/// Check a sender against a tenant's allowlist.
///
/// - `*` anywhere in the list → accept unconditionally
/// - exact entry → exact string match
/// - `@domain` → sender ends with that suffix
/// - `*@domain` → sender ends with the suffix after the `*`
///
/// An empty list rejects every sender. Tenants without configuration never
/// reach this with an empty list — their default policy is `["*"]`.
pub fn sender_allowed(allowlist: &[String], sender: &str) -> bool {
    if allowlist.iter().any(|entry| entry == "*") {
        return true;
    }
    allowlist.iter().any(|entry| {
        if entry == sender {
            true
        } else if entry.starts_with('@') {
            sender.ends_with(entry.as_str())
        } else if let Some(suffix) = entry.strip_prefix('*') {
            // "*@domain" → "@domain" suffix match
            entry.starts_with("*@") && sender.ends_with(suffix)
        } else {
            false
        }
    })
}
