//! Error types for the SiteJail engine

use thiserror::Error;

use crate::host::HostError;
use sj_core::ParseError;

/// Errors that can occur in the engine.
///
/// Only identity setup is fatal: it aborts startup so interception is
/// never installed. Everything else degrades — a parse failure counts as
/// "not listed", a companion failure counts as "no assignment", and no
/// handler ever surfaces an error to the interception layer.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed URL — callers fail open and treat it as non-matching.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The companion extension could not be reached. Swallowed at the
    /// call site; never propagated out of a decision.
    #[error("companion unavailable: {0}")]
    Companion(String),

    /// The dedicated identity could not be resolved or created at
    /// startup. Fatal: the engine refuses to run without it.
    #[error("identity setup failed: {0}")]
    IdentitySetup(String),

    /// A host capability call failed.
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
