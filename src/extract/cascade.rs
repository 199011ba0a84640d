//! Pattern cascade — ordered extraction rules, first match wins.
//!
//! Patterns are tried strictly in configured order; the first one that
//! matches anywhere in the body determines the code. There is no attempt to
//! find a "best" match across patterns. Extraction is a pure function over
//! normalized text: no I/O, and absence of a match is a normal outcome.

use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Case-insensitivity marker accepted at the front of a raw pattern string.
const CASE_INSENSITIVE_MARKER: &str = "(?i)";

// ── Pattern specs ───────────────────────────────────────────────────

/// A single extraction rule before compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSpec {
    /// Regex text, with any leading case marker already stripped.
    pub pattern: String,
    /// Compile with case-insensitive matching.
    pub case_insensitive: bool,
}

impl PatternSpec {
    /// Parse a raw configured pattern string, peeling a leading `(?i)`
    /// marker into the flag.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(CASE_INSENSITIVE_MARKER) {
            Some(rest) => Self {
                pattern: rest.to_string(),
                case_insensitive: true,
            },
            None => Self {
                pattern: raw.to_string(),
                case_insensitive: false,
            },
        }
    }
}

// ── Compiled cascade ────────────────────────────────────────────────

/// An ordered list of compiled extraction rules.
#[derive(Debug, Clone)]
pub struct PatternCascade {
    patterns: Vec<Regex>,
}

impl PatternCascade {
    /// Compile a cascade from pattern specs.
    ///
    /// Specs that fail to compile are skipped with a logged warning; a bad
    /// tenant pattern must never take down the rest of the cascade.
    pub fn compile(specs: &[PatternSpec]) -> Self {
        let patterns = specs
            .iter()
            .filter_map(|spec| {
                match RegexBuilder::new(&spec.pattern)
                    .case_insensitive(spec.case_insensitive)
                    .build()
                {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(pattern = %spec.pattern, error = %e, "Skipping uncompilable extraction pattern");
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    /// Compile a cascade from raw configured strings (tenant `regex_patterns`).
    pub fn from_raw(raw_patterns: &[String]) -> Self {
        let specs: Vec<PatternSpec> = raw_patterns.iter().map(|r| PatternSpec::parse(r)).collect();
        Self::compile(&specs)
    }

    /// The built-in default cascade, in order:
    /// 1. labeled cue (`verification code`/`code`/`OTP`/`2FA`/`token`/`pin`
    ///    followed by an optional separator and 4–8 digits)
    /// 2. trailing cue (4–8 digits followed by `is your ... code/OTP/token`)
    /// 3. any standalone 6-digit run
    pub fn default_cascade() -> Self {
        let specs = [
            PatternSpec {
                pattern: r"(?:verification code|code|otp|2fa|token|pin)\s*(?:is)?\s*:?\s*(\d{4,8})"
                    .to_string(),
                case_insensitive: true,
            },
            PatternSpec {
                pattern: r"(\d{4,8})\s+is your(?:\s+\S+){0,3}\s+(?:code|otp|token)".to_string(),
                case_insensitive: true,
            },
            PatternSpec {
                pattern: r"\b(\d{6})\b".to_string(),
                case_insensitive: false,
            },
        ];
        Self::compile(&specs)
    }

    /// Number of successfully compiled rules.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True when no rules compiled.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Run the cascade against a normalized body.
    ///
    /// Returns the first capture group of the first matching rule, or the
    /// whole matched span for rules without a capture group.
    pub fn extract(&self, body: &str) -> Option<String> {
        for re in &self.patterns {
            if let Some(caps) = re.captures(body) {
                let m = caps.get(1).or_else(|| caps.get(0))?;
                return Some(m.as_str().to_string());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strips_case_marker() {
        let spec = PatternSpec::parse(r"(?i)pin[:\s]+(\d{4})");
        assert!(spec.case_insensitive);
        assert_eq!(spec.pattern, r"pin[:\s]+(\d{4})");

        let spec = PatternSpec::parse(r"exact(\d{6})");
        assert!(!spec.case_insensitive);
    }

    #[test]
    fn default_cascade_labeled_cue() {
        let cascade = PatternCascade::default_cascade();
        assert_eq!(cascade.extract("Your verification code is: 482913").as_deref(), Some("482913"));
        assert_eq!(cascade.extract("OTP: 5521").as_deref(), Some("5521"));
        assert_eq!(cascade.extract("Your 2FA token 77881122 expires soon").as_deref(), Some("77881122"));
        assert_eq!(cascade.extract("PIN 9034").as_deref(), Some("9034"));
    }

    #[test]
    fn default_cascade_trailing_cue() {
        let cascade = PatternCascade::default_cascade();
        assert_eq!(cascade.extract("482913 is your login code").as_deref(), Some("482913"));
        assert_eq!(cascade.extract("7712 is your one time access token").as_deref(), Some("7712"));
    }

    #[test]
    fn default_cascade_six_digit_fallback() {
        let cascade = PatternCascade::default_cascade();
        assert_eq!(cascade.extract("please enter 123456 to continue").as_deref(), Some("123456"));
    }

    #[test]
    fn eight_digits_without_cue_do_not_match() {
        // The labeled cue needs a cue word and the fallback needs exactly
        // six standalone digits, so a bare 8-digit run extracts nothing.
        let cascade = PatternCascade::default_cascade();
        assert_eq!(cascade.extract("12345678"), None);
    }

    #[test]
    fn no_digits_no_match() {
        let cascade = PatternCascade::default_cascade();
        assert_eq!(cascade.extract("hello, nothing to see here"), None);
    }

    #[test]
    fn first_matching_pattern_wins() {
        // Both patterns match; the configured order decides.
        let cascade = PatternCascade::from_raw(&[
            r"first:(\d+)".to_string(),
            r"(\d{6})".to_string(),
        ]);
        assert_eq!(cascade.extract("999999 first:1234").as_deref(), Some("1234"));
    }

    #[test]
    fn pattern_without_capture_group_uses_whole_match() {
        let cascade = PatternCascade::from_raw(&[r"\d{4}-\d{4}".to_string()]);
        assert_eq!(cascade.extract("ref 1234-5678 ok").as_deref(), Some("1234-5678"));
    }

    #[test]
    fn uncompilable_pattern_is_skipped_not_fatal() {
        let cascade = PatternCascade::from_raw(&[
            r"[unclosed".to_string(),
            r"code (\d{6})".to_string(),
        ]);
        assert_eq!(cascade.len(), 1);
        assert_eq!(cascade.extract("code 112233").as_deref(), Some("112233"));
    }

    #[test]
    fn case_marker_respected_in_raw_patterns() {
        let cascade = PatternCascade::from_raw(&[r"(?i)access code (\d{6})".to_string()]);
        assert_eq!(cascade.extract("ACCESS CODE 445566").as_deref(), Some("445566"));

        let sensitive = PatternCascade::from_raw(&[r"access code (\d{6})".to_string()]);
        assert_eq!(sensitive.extract("ACCESS CODE 445566"), None);
    }

    #[test]
    fn binary_looking_body_does_not_panic() {
        let cascade = PatternCascade::default_cascade();
        let noise: String = (0u8..128).map(|b| b as char).collect();
        let _ = cascade.extract(&noise);
    }
}
