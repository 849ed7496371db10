//! SiteJail Core Library
//!
//! This crate provides the synchronous primitives for the SiteJail
//! containment engine: URL helpers, the jailed-domain matcher, and the
//! request/verdict types the interception layer exchanges with the engine.
//!
//! Everything here is pure and allocation-light. The asynchronous engine
//! (race dedup, tab reopening, cookie sweep, companion handshake) lives in
//! the `sj-engine` crate and builds on these types.
//!
//! # Modules
//!
//! - `url`: fast URL parsing and query-parameter stripping without a URL crate
//! - `domains`: the shipped domain list and the compiled suffix matcher
//! - `types`: shared type definitions (request events, verdicts, identifiers)

pub mod domains;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use domains::{DomainSet, JAILED_DOMAINS};
pub use types::{ContextId, RequestEvent, RequestKind, TabId, Verdict, NO_TAB};
pub use url::ParseError;
