//! Error taxonomy for the analysis engine.
//!
//! Global invariants enforced:
//! - Per-file errors (`IoError`, `ParseAnomaly`) are always absorbed before they
//!   reach a caller; they never surface as a `HotspotError` variant.
//! - `CheckViolation` has no variant here: a failed policy check is carried as
//!   `CheckResult.passed == false`, never returned as an `Err`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HotspotError {
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("git unavailable: {0}")]
    GitUnavailable(String),

    #[error("cache persistence error: {0}")]
    CachePersistenceError(String),

    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, HotspotError>;
