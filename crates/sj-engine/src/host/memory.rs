//! In-memory host — every capability trait over mutex-guarded maps
//!
//! Backs the engine tests and the CLI dry-run. Seed it with tabs,
//! identities, cookies, and extensions, then inspect what the engine did:
//! created/removed tabs, evicted cookies, purged workers, sent messages.
//! Tab creations and removals are also appended to a flat operation log so
//! ordering (create before remove) can be asserted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use sj_core::{ContextId, TabId};

use super::{
    Cookie, CookieStore, CreateTab, ExtensionInfo, Host, HostError, Identity, IdentityDetails,
    IdentityStore, KeyValueStore, MessageBus, StoredState, Tab, TabStatus, TabStore,
};

#[derive(Default)]
struct State {
    identities: Vec<Identity>,
    next_context: u32,
    tabs: HashMap<TabId, Tab>,
    next_tab: TabId,
    op_log: Vec<String>,
    removed_tabs: Vec<TabId>,
    created_tabs: Vec<Tab>,
    cookies: HashMap<(String, ContextId), Vec<Cookie>>,
    purged_workers: Vec<String>,
    stored: Option<StoredState>,
    extensions: HashMap<String, bool>,
    assignments: HashMap<String, Value>,
    extension_sends: Vec<(String, Value)>,
    tab_messages: Vec<(TabId, Value)>,
    fail_extension_sends: bool,
    fail_identity_calls: bool,
}

/// In-process implementation of all host capabilities.
#[derive(Default)]
pub struct MemoryHost {
    state: Mutex<State>,
}

impl MemoryHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Bundle this host into the handle the engine consumes.
    pub fn host(self: &Arc<Self>) -> Host {
        Host {
            identities: self.clone(),
            cookies: self.clone(),
            tabs: self.clone(),
            storage: self.clone(),
            bus: self.clone(),
        }
    }

    // -- seeding ------------------------------------------------------------

    pub fn add_identity(&self, name: &str, color: &str, icon: &str) -> Identity {
        let mut state = self.state.lock().unwrap();
        state.next_context += 1;
        let identity = Identity {
            context_id: ContextId(format!("container-{}", state.next_context)),
            name: name.to_string(),
            color: color.to_string(),
            icon: icon.to_string(),
        };
        state.identities.push(identity.clone());
        identity
    }

    pub fn add_tab(&self, url: &str, context_id: ContextId, status: TabStatus) -> Tab {
        let mut state = self.state.lock().unwrap();
        state.next_tab += 1;
        let tab = Tab {
            id: state.next_tab,
            url: url.to_string(),
            status,
            context_id,
            active: true,
            index: state.tabs.len() as u32,
            window_id: 1,
        };
        state.tabs.insert(tab.id, tab.clone());
        tab
    }

    pub fn seed_cookie(&self, domain: &str, context: &ContextId, name: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .cookies
            .entry((domain.to_string(), context.clone()))
            .or_default()
            .push(Cookie {
                name: name.to_string(),
                domain: domain.to_string(),
            });
    }

    pub fn install_extension(&self, id: &str, enabled: bool) {
        self.state
            .lock()
            .unwrap()
            .extensions
            .insert(id.to_string(), enabled);
    }

    /// Script the companion's `getAssignment` reply for a URL.
    pub fn set_assignment(&self, url: &str, reply: Value) {
        self.state
            .lock()
            .unwrap()
            .assignments
            .insert(url.to_string(), reply);
    }

    pub fn set_stored(&self, state: StoredState) {
        self.state.lock().unwrap().stored = Some(state);
    }

    /// Make every extension send fail, simulating a crashed companion.
    pub fn fail_extension_sends(&self, fail: bool) {
        self.state.lock().unwrap().fail_extension_sends = fail;
    }

    /// Make every identity call fail, simulating a host without working
    /// contextual identities.
    pub fn fail_identity_calls(&self, fail: bool) {
        self.state.lock().unwrap().fail_identity_calls = fail;
    }

    // -- inspection ---------------------------------------------------------

    pub fn tabs(&self) -> Vec<Tab> {
        let state = self.state.lock().unwrap();
        let mut tabs: Vec<Tab> = state.tabs.values().cloned().collect();
        tabs.sort_by_key(|t| t.id);
        tabs
    }

    pub fn created_tabs(&self) -> Vec<Tab> {
        self.state.lock().unwrap().created_tabs.clone()
    }

    pub fn removed_tabs(&self) -> Vec<TabId> {
        self.state.lock().unwrap().removed_tabs.clone()
    }

    pub fn op_log(&self) -> Vec<String> {
        self.state.lock().unwrap().op_log.clone()
    }

    pub fn cookies_in(&self, domain: &str, context: &ContextId) -> Vec<Cookie> {
        self.state
            .lock()
            .unwrap()
            .cookies
            .get(&(domain.to_string(), context.clone()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn purged_workers(&self) -> Vec<String> {
        self.state.lock().unwrap().purged_workers.clone()
    }

    pub fn stored_state(&self) -> Option<StoredState> {
        self.state.lock().unwrap().stored.clone()
    }

    pub fn extension_sends(&self) -> Vec<(String, Value)> {
        self.state.lock().unwrap().extension_sends.clone()
    }

    pub fn tab_messages(&self) -> Vec<(TabId, Value)> {
        self.state.lock().unwrap().tab_messages.clone()
    }
}

#[async_trait]
impl IdentityStore for MemoryHost {
    async fn list(&self, name: Option<&str>) -> Result<Vec<Identity>, HostError> {
        let state = self.state.lock().unwrap();
        if state.fail_identity_calls {
            return Err(HostError::Backend("identities unavailable".to_string()));
        }
        Ok(state
            .identities
            .iter()
            .filter(|i| name.map_or(true, |n| i.name == n))
            .cloned()
            .collect())
    }

    async fn create(&self, details: &IdentityDetails) -> Result<Identity, HostError> {
        if self.state.lock().unwrap().fail_identity_calls {
            return Err(HostError::Backend("identities unavailable".to_string()));
        }
        Ok(self.add_identity(&details.name, &details.color, &details.icon))
    }

    async fn update(&self, id: &ContextId, details: &IdentityDetails) -> Result<(), HostError> {
        let mut state = self.state.lock().unwrap();
        let identity = state
            .identities
            .iter_mut()
            .find(|i| &i.context_id == id)
            .ok_or_else(|| HostError::NotFound(format!("identity {id}")))?;
        identity.color = details.color.clone();
        identity.icon = details.icon.clone();
        Ok(())
    }
}

#[async_trait]
impl CookieStore for MemoryHost {
    async fn list(&self, domain: &str, context: &ContextId) -> Result<Vec<Cookie>, HostError> {
        Ok(self.cookies_in(domain, context))
    }

    async fn remove(&self, name: &str, url: &str, context: &ContextId) -> Result<(), HostError> {
        let domain = sj_core::url::host(url)
            .map_err(|e| HostError::Backend(e.to_string()))?
            .to_string();
        let mut state = self.state.lock().unwrap();
        if let Some(cookies) = state.cookies.get_mut(&(domain, context.clone())) {
            cookies.retain(|c| c.name != name);
        }
        Ok(())
    }

    async fn purge_workers(&self, domain: &str) -> Result<(), HostError> {
        self.state
            .lock()
            .unwrap()
            .purged_workers
            .push(domain.to_string());
        Ok(())
    }
}

#[async_trait]
impl TabStore for MemoryHost {
    async fn list(&self) -> Result<Vec<Tab>, HostError> {
        Ok(self.tabs())
    }

    async fn get(&self, id: TabId) -> Result<Tab, HostError> {
        self.state
            .lock()
            .unwrap()
            .tabs
            .get(&id)
            .cloned()
            .ok_or_else(|| HostError::NotFound(format!("tab {id}")))
    }

    async fn create(&self, tab: &CreateTab) -> Result<Tab, HostError> {
        let mut state = self.state.lock().unwrap();
        state.next_tab += 1;
        let created = Tab {
            id: state.next_tab,
            url: tab.url.clone(),
            status: TabStatus::Loading,
            context_id: tab.context_id.clone(),
            active: tab.active,
            index: tab.index,
            window_id: tab.window_id,
        };
        state.tabs.insert(created.id, created.clone());
        state.created_tabs.push(created.clone());
        state
            .op_log
            .push(format!("create:{}@{}", created.url, created.context_id));
        Ok(created)
    }

    async fn remove(&self, id: TabId) -> Result<(), HostError> {
        let mut state = self.state.lock().unwrap();
        state
            .tabs
            .remove(&id)
            .ok_or_else(|| HostError::NotFound(format!("tab {id}")))?;
        state.removed_tabs.push(id);
        state.op_log.push(format!("remove:{id}"));
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryHost {
    async fn load(&self) -> Result<Option<StoredState>, HostError> {
        Ok(self.state.lock().unwrap().stored.clone())
    }

    async fn store(&self, stored: &StoredState) -> Result<(), HostError> {
        self.state.lock().unwrap().stored = Some(stored.clone());
        Ok(())
    }
}

#[async_trait]
impl MessageBus for MemoryHost {
    async fn probe_extension(&self, id: &str) -> Result<ExtensionInfo, HostError> {
        let state = self.state.lock().unwrap();
        state
            .extensions
            .get(id)
            .map(|&enabled| ExtensionInfo {
                id: id.to_string(),
                enabled,
            })
            .ok_or_else(|| HostError::NotFound(format!("extension {id}")))
    }

    async fn send_to_extension(&self, id: &str, payload: Value) -> Result<Value, HostError> {
        let mut state = self.state.lock().unwrap();
        state.extension_sends.push((id.to_string(), payload.clone()));
        if state.fail_extension_sends {
            return Err(HostError::Backend("extension unreachable".to_string()));
        }
        match payload.get("method").and_then(Value::as_str) {
            Some("getAssignment") => {
                let url = payload.get("url").and_then(Value::as_str).unwrap_or("");
                Ok(state
                    .assignments
                    .get(url)
                    .cloned()
                    .unwrap_or(Value::Bool(false)))
            }
            Some("jailedDomains") => Ok(Value::Bool(true)),
            _ => Ok(Value::Null),
        }
    }

    async fn send_to_tab(&self, tab: TabId, payload: Value) -> Result<(), HostError> {
        self.state.lock().unwrap().tab_messages.push((tab, payload));
        Ok(())
    }
}
