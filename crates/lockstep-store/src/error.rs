//! Error types for the store layer.
//!
//! All errors are propagated via [`StoreError`], which wraps the
//! underlying [`fred`] errors with additional context about which
//! operation failed. The in-memory backend can only raise the
//! ownership/membership variants.

use lockstep_types::UnitId;

/// Errors that can occur in the store layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A Redis-compatible backend operation failed.
    #[error("store backend error: {0}")]
    Backend(#[from] fred::error::Error),

    /// A bag value failed to serialize or deserialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A write named a unit that was never registered.
    #[error("unknown unit: {0}")]
    UnknownUnit(UnitId),

    /// A configuration error (bad URL, unreachable backend).
    #[error("configuration error: {0}")]
    Config(String),
}
