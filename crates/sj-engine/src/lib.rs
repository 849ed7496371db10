//! SiteJail Engine
//!
//! The interception and containment decision engine. For every top-level
//! navigation and sub-resource fetch the engine decides whether to cancel
//! or redirect the request and which storage context a tab should be
//! reopened under, dedups the redirect races interception hooks produce,
//! sweeps stored cookies for the jailed domains at startup, and runs the
//! handshake with the companion container extension.
//!
//! The browser itself is reached only through the capability traits in
//! [`host`]; an in-memory implementation ([`host::memory::MemoryHost`])
//! backs the tests and the CLI dry-run.
//!
//! # Modules
//!
//! - `host`: capability traits for identities, cookies, tabs, storage, messaging
//! - `race`: redirect-race dedup with a bounded per-tab TTL
//! - `companion`: handshake with the companion container extension
//! - `decide`: the containment state machine for top-level navigations
//! - `subresource`: first-party isolation for sub-resource loads
//! - `sweep`: the startup cookie eviction pass
//! - `watch`: tabs still on a blank placeholder at startup
//! - `engine`: the engine context, startup sequence, and event handlers

pub mod companion;
pub mod config;
pub mod decide;
pub mod engine;
pub mod error;
pub mod host;
pub mod race;
pub mod subresource;
pub mod sweep;
pub mod watch;

pub use companion::{Companion, ExtensionEvent};
pub use config::EngineConfig;
pub use engine::{ContentMessage, Engine, TabChange};
pub use error::{EngineError, Result};
pub use host::{Host, HostError};
pub use race::{RaceGuard, RaceVerdict, CANCEL_TTL};
