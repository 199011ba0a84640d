//! Body normalization — minimal quoted-printable reversal.
//!
//! Inbound bodies arrive as raw bytes with transport-encoding artifacts.
//! This is a best-effort decode, not a full quoted-printable implementation:
//! soft line breaks (`=` before a line terminator) are unwrapped and literal
//! `=3D` sequences become `=`. Everything else passes through untouched.

/// Decode raw bytes into normalized body text.
///
/// Never fails: invalid UTF-8 is replaced lossily, and unrecognized escape
/// sequences are left as-is.
pub fn normalize(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    decode_soft_breaks(&text).replace("=3D", "=")
}

/// Remove quoted-printable soft line breaks: `=\r\n` or `=\n`.
fn decode_soft_breaks(text: &str) -> String {
    text.replace("=\r\n", "").replace("=\n", "")
}
