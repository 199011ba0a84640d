//! Code extraction engine.
//!
//! Every inbound message flows through:
//! 1. `normalize` — transport-encoding cleanup of the raw body
//! 2. `identity` — recipient / sender / tenant from headers
//! 3. `allowlist` — tenant sender gate
//! 4. `cascade` — ordered pattern matching, first match wins
//!
//! All four stages are pure and infallible: malformed input degrades to
//! sentinels or a no-match, never a panic or an error.

pub mod allowlist;
pub mod cascade;
pub mod identity;
pub mod normalize;

pub use allowlist::sender_allowed;
pub use cascade::{PatternCascade, PatternSpec};
pub use identity::{MessageIdentity, extract_identity};
pub use normalize::normalize;
