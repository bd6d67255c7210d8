//! Phone number normalization.
//!
//! Contact providers hand out numbers the way users typed them, e.g.
//! `(555) 123-4567`, while the call listener reports `5551234567`. Matching
//! happens on the normalized form, which only drops the separator characters
//! below. Everything else, including a leading `+`, is kept as-is.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters removed during normalization
pub const SEPARATORS: [char; 4] = ['-', ' ', '(', ')'];

/// A phone number with separators removed, used as the matching key
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedNumber(String);

impl NormalizedNumber {
    /// Normalize a raw number
    pub fn normalize(raw: &str) -> Self {
        Self(raw.chars().filter(|c| !SEPARATORS.contains(c)).collect())
    }

    /// Normalize a possibly absent number; absent input yields the empty number
    pub fn normalize_opt(raw: Option<&str>) -> Self {
        raw.map(Self::normalize).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Free-function form of [`NormalizedNumber::normalize`]
pub fn normalize(raw: &str) -> NormalizedNumber {
    NormalizedNumber::normalize(raw)
}

impl AsRef<str> for NormalizedNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for NormalizedNumber {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NormalizedNumber {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
