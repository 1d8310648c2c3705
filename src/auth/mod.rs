//! Authentication helpers
//!
//! Implements the shared-secret check the identity provider performs on every
//! hook invocation, plus the case-insensitive header map it reads from.

use axum::http::HeaderMap;
use std::collections::HashMap;

/// Header carrying the shared secret.
pub const AUTH_SECRET_HEADER: &str = "auth_secret";

/// Header map whose keys are compared without regard to ASCII case.
///
/// The identity provider does not guarantee header casing, so every lookup
/// against inbound headers goes through this type.
#[derive(Debug, Clone, Default)]
pub struct CaseInsensitiveHeaders {
    inner: HashMap<String, String>,
}

impl CaseInsensitiveHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header; a later insert with differently-cased key replaces it.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.inner.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Look up a header value as sent. Blank values are treated as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for CaseInsensitiveHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (k, v) in iter {
            headers.insert(k.as_ref(), v);
        }
        headers
    }
}

impl From<&HeaderMap> for CaseInsensitiveHeaders {
    fn from(map: &HeaderMap) -> Self {
        map.iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
            .collect()
    }
}

/// Timing-safe string equality.
pub fn timing_safe_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut out = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        out |= x ^ y;
    }
    out == 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    SecretMissingConfig,
    SecretMissing,
    SecretMismatch,
}

impl AuthFailure {
    /// Operator-facing detail; callers only ever see "Authentication failed".
    pub fn message(self) -> &'static str {
        match self {
            AuthFailure::SecretMissingConfig => "auth secret not configured (set AUTH_SECRET)",
            AuthFailure::SecretMissing => "auth_secret header missing",
            AuthFailure::SecretMismatch => "auth_secret header mismatch",
        }
    }
}

/// Validates the `auth_secret` header against the configured secret.
#[derive(Debug, Clone)]
pub struct RequestAuthenticator {
    secret: String,
}

impl RequestAuthenticator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn authenticate(&self, headers: &CaseInsensitiveHeaders) -> Result<(), AuthFailure> {
        if self.secret.is_empty() {
            return Err(AuthFailure::SecretMissingConfig);
        }
        let Some(provided) = headers.get(AUTH_SECRET_HEADER) else {
            return Err(AuthFailure::SecretMissing);
        };
        if timing_safe_eq(&self.secret, provided) {
            Ok(())
        } else {
            Err(AuthFailure::SecretMismatch)
        }
    }
}
