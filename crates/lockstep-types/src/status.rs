//! Handler status values.
//!
//! A status is the only signal a handler emits besides its bag writes:
//! there is no separate alerting channel. The message strings for the
//! coordinator's states are format-compatible with existing observers
//! and must be preserved bit-for-bit by their producers; this module
//! only carries them.

/// The outcome of one handler invocation, as reported to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// The handler completed and published its output.
    Active(String),

    /// The handler is waiting on peers or on data that is not yet
    /// visible; a later invocation will resolve it without intervention.
    Waiting(String),

    /// The handler cannot make progress until shared state or
    /// configuration is corrected externally.
    Blocked(String),
}

impl Status {
    /// The human-readable message carried by the status.
    pub fn message(&self) -> &str {
        match self {
            Self::Active(msg) | Self::Waiting(msg) | Self::Blocked(msg) => msg,
        }
    }

    /// Whether the handler completed its work.
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    /// Whether the handler is blocked pending external remediation.
    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let kind = match self {
            Self::Active(_) => "active",
            Self::Waiting(_) => "waiting",
            Self::Blocked(_) => "blocked",
        };
        let msg = self.message();
        if msg.is_empty() {
            write!(f, "{kind}")
        } else {
            write!(f, "{kind}: {msg}")
        }
    }
}
