//! Host capability traits — the engine's only window onto the browser
//!
//! Each trait is a thin contract over one browser surface. The engine
//! holds them as trait objects bundled in a [`Host`] handle, so a real
//! extension adapter and the in-memory test host are interchangeable.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use sj_core::{ContextId, TabId};

pub mod memory;

/// Errors returned by host capability calls.
#[derive(Debug, Clone, Error)]
pub enum HostError {
    /// The referenced entity does not exist (tab closed, extension absent).
    #[error("not found: {0}")]
    NotFound(String),

    /// The browser rejected or failed the call.
    #[error("host call failed: {0}")]
    Backend(String),

    /// A payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

// =============================================================================
// Identities
// =============================================================================

/// A contextual identity (an isolated cookie storage context).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub context_id: ContextId,
    pub name: String,
    pub color: String,
    pub icon: String,
}

/// Creation/update details for an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityDetails {
    pub name: String,
    pub color: String,
    pub icon: String,
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// List identities, optionally filtered by exact name.
    async fn list(&self, name: Option<&str>) -> Result<Vec<Identity>, HostError>;

    /// Create a new identity.
    async fn create(&self, details: &IdentityDetails) -> Result<Identity, HostError>;

    /// Update an existing identity's details.
    async fn update(&self, id: &ContextId, details: &IdentityDetails) -> Result<(), HostError>;
}

// =============================================================================
// Cookies
// =============================================================================

/// A stored cookie, reduced to what eviction needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub domain: String,
}

#[async_trait]
pub trait CookieStore: Send + Sync {
    /// Enumerate cookies scoped to `domain` in the given storage context.
    async fn list(&self, domain: &str, context: &ContextId) -> Result<Vec<Cookie>, HostError>;

    /// Remove one cookie by name, URL scope, and storage context.
    async fn remove(&self, name: &str, url: &str, context: &ContextId) -> Result<(), HostError>;

    /// Purge background-worker registrations for a domain. A stale worker
    /// can intercept future requests before the interception layer sees
    /// them, so eviction must clear these too.
    async fn purge_workers(&self, domain: &str) -> Result<(), HostError>;
}

// =============================================================================
// Tabs
// =============================================================================

/// Document load state of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabStatus {
    Loading,
    Complete,
}

/// A browser tab, reduced to what containment needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub id: TabId,
    pub url: String,
    pub status: TabStatus,
    pub context_id: ContextId,
    pub active: bool,
    pub index: u32,
    pub window_id: i32,
}

/// Placement and identity for a replacement tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTab {
    pub url: String,
    pub context_id: ContextId,
    pub active: bool,
    pub index: u32,
    pub window_id: i32,
}

#[async_trait]
pub trait TabStore: Send + Sync {
    /// List all open tabs.
    async fn list(&self) -> Result<Vec<Tab>, HostError>;

    /// Look up one tab by id.
    async fn get(&self, id: TabId) -> Result<Tab, HostError>;

    /// Open a new tab.
    async fn create(&self, tab: &CreateTab) -> Result<Tab, HostError>;

    /// Close a tab.
    async fn remove(&self, id: TabId) -> Result<(), HostError>;
}

// =============================================================================
// Key/Value Storage
// =============================================================================

/// The persisted engine record: the user-maintained domain list plus the
/// UI panel marker. A missing field deserializes to its default, so a
/// partial or absent record is repaired rather than treated as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredState {
    #[serde(default)]
    pub user_domains: Vec<String>,
    #[serde(default)]
    pub current_panel: Option<String>,
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Load the persisted record. `None` means no record exists yet
    /// (first run).
    async fn load(&self) -> Result<Option<StoredState>, HostError>;

    /// Persist the record.
    async fn store(&self, state: &StoredState) -> Result<(), HostError>;
}

// =============================================================================
// Messaging
// =============================================================================

/// Metadata of an installed extension, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionInfo {
    pub id: String,
    pub enabled: bool,
}

#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Read another extension's metadata. Fails if it is not installed.
    async fn probe_extension(&self, id: &str) -> Result<ExtensionInfo, HostError>;

    /// Send a message to another extension and await its reply.
    async fn send_to_extension(&self, id: &str, payload: Value) -> Result<Value, HostError>;

    /// Send a fire-and-forget message to a tab's content layer.
    async fn send_to_tab(&self, tab: TabId, payload: Value) -> Result<(), HostError>;
}

// =============================================================================
// Host Handle
// =============================================================================

/// Bundle of all capability handles the engine needs.
#[derive(Clone)]
pub struct Host {
    pub identities: Arc<dyn IdentityStore>,
    pub cookies: Arc<dyn CookieStore>,
    pub tabs: Arc<dyn TabStore>,
    pub storage: Arc<dyn KeyValueStore>,
    pub bus: Arc<dyn MessageBus>,
}
