//! Opaque, totally-ordered unit identities.
//!
//! A [`UnitId`] names one independently-scheduled process instance
//! (e.g. `"app/3"`). The identity is never interpreted beyond its
//! lexicographic ordering, which is the sole mechanism for deriving a
//! deterministic grid position: two coordinators that observe the same
//! member set must seat every cell identically.

use serde::{Deserialize, Serialize};

/// Identity of one unit participating in the simulation.
///
/// Wraps an opaque string. Ordering is lexicographic on the raw bytes,
/// matching the sort applied to member lists everywhere in the protocol.
/// Serializes transparently as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(String);

impl UnitId {
    /// Create an identity from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identity and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for UnitId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UnitId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for UnitId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
