//! Header redaction policy.
//!
//! Two treatments, chosen per header name (case-insensitive):
//!
//! - Bearer-style credentials (`authorization`, `proxy-authorization`) are
//!   masked: short values become [`REDACTED`], longer ones keep a fixed
//!   prefix and suffix around `...`.
//! - Session and API-key headers are replaced by [`REDACTED`] outright.
//!
//! Names configured by the operator are always fully redacted, even if they
//! would otherwise be masked.

use std::borrow::Cow;
use std::collections::HashMap;

/// Placeholder for a value that must not appear in logs.
pub const REDACTED: &str = "REDACTED";

/// Shortest credential that is masked rather than fully redacted.
pub const MASK_MIN_LEN: usize = 15;
/// Characters kept from the start of a masked credential.
pub const MASK_PREFIX_LEN: usize = 10;
/// Characters kept from the end of a masked credential.
pub const MASK_SUFFIX_LEN: usize = 3;

const MASKED_HEADERS: &[&str] = &["authorization", "proxy-authorization"];

const REDACTED_HEADERS: &[&str] = &[
    "cookie",
    "set-cookie",
    "x-api-key",
    "api-key",
    "x-auth-token",
    "x-csrf-token",
    "x-xsrf-token",
    "x-amz-security-token",
    "x-goog-api-key",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Treatment {
    Mask,
    Redact,
}

/// Mask a credential, keeping just enough to check its scheme and shape.
///
/// `"Bearer abcdefghijklmno"` becomes `"Bearer abc...mno"`.
pub fn mask_credential(value: &str) -> Cow<'_, str> {
    if value.is_empty() {
        return Cow::Borrowed("");
    }

    let len = value.chars().count();
    if len < MASK_MIN_LEN {
        return Cow::Borrowed(REDACTED);
    }

    let prefix: String = value.chars().take(MASK_PREFIX_LEN).collect();
    let suffix: String = value.chars().skip(len - MASK_SUFFIX_LEN).collect();
    Cow::Owned(format!("{prefix}...{suffix}"))
}

/// Decides how each header value may appear in a flow record.
#[derive(Debug, Clone)]
pub struct RedactionPolicy {
    rules: HashMap<String, Treatment>,
}

impl RedactionPolicy {
    /// Build the policy from the built-in sets plus extra names to redact.
    pub fn new<S: AsRef<str>>(extra_sensitive: &[S]) -> Self {
        let mut rules = HashMap::new();
        for name in MASKED_HEADERS {
            rules.insert(name.to_string(), Treatment::Mask);
        }
        for name in REDACTED_HEADERS {
            rules.insert(name.to_string(), Treatment::Redact);
        }
        for name in extra_sensitive {
            rules.insert(name.as_ref().trim().to_ascii_lowercase(), Treatment::Redact);
        }
        Self { rules }
    }

    fn treatment(&self, name: &str) -> Option<Treatment> {
        if let Some(t) = self.rules.get(name) {
            return Some(*t);
        }
        self.rules.get(&name.to_ascii_lowercase()).copied()
    }

    /// The loggable form of `value` for header `name`.
    pub fn apply<'a>(&self, name: &str, value: &'a str) -> Cow<'a, str> {
        match self.treatment(name) {
            Some(Treatment::Mask) => mask_credential(value),
            Some(Treatment::Redact) => Cow::Borrowed(REDACTED),
            None => Cow::Borrowed(value),
        }
    }
}

impl Default for RedactionPolicy {
    fn default() -> Self {
        Self::new::<&str>(&[])
    }
}
