//! Companion extension handshake
//!
//! A cooperating container extension can claim domains for its own
//! isolation policy; its assignments take precedence over this engine's
//! containment decisions. The protocol is message-passing only: a liveness
//! probe at startup, lifecycle signals while running, a domain-list push
//! whenever the companion (re)announces itself, and per-URL assignment
//! queries. Companion absence is a normal state — every failure here
//! degrades to "no assignment" and is never propagated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::host::MessageBus;

/// Extension id the companion ships under.
pub const DEFAULT_COMPANION_ID: &str = "@testpilot-containers";

// =============================================================================
// Wire Messages
// =============================================================================

/// Outbound messages to the companion.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum CompanionRequest {
    /// Advertise the full jailed-domain list as normalized origin URLs.
    JailedDomains { urls: Vec<String> },
    /// Ask whether the companion claims this URL.
    GetAssignment { url: String },
}

/// Inbound messages from the companion.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "method")]
pub enum CompanionNotice {
    /// The companion is ready to receive the domain list.
    #[serde(rename = "MACListening")]
    Listening,
}

/// Host extension-lifecycle signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionEvent {
    Installed(String),
    Enabled(String),
    Disabled(String),
    Uninstalled(String),
}

// =============================================================================
// Companion
// =============================================================================

/// Liveness state and messaging for the companion extension.
pub struct Companion {
    id: String,
    active: AtomicBool,
    bus: Arc<dyn MessageBus>,
    domain_urls: Vec<String>,
}

impl Companion {
    /// `domains` is the static jailed list; each entry is advertised as
    /// `https://<domain>/`.
    pub fn new(bus: Arc<dyn MessageBus>, id: &str, domains: &[String]) -> Self {
        Self {
            id: id.to_string(),
            active: AtomicBool::new(false),
            bus,
            domain_urls: domains.iter().map(|d| format!("https://{d}/")).collect(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Startup liveness probe. Enabled companion ⇒ active, and the domain
    /// list is pushed immediately. Any failure ⇒ inactive.
    pub async fn probe(&self) -> bool {
        match self.bus.probe_extension(&self.id).await {
            Ok(info) if info.enabled => {
                self.active.store(true, Ordering::Relaxed);
                self.push_domains().await;
                true
            }
            _ => {
                self.active.store(false, Ordering::Relaxed);
                false
            }
        }
    }

    /// Push the jailed-domain list. Failures are swallowed.
    pub async fn push_domains(&self) {
        let request = CompanionRequest::JailedDomains {
            urls: self.domain_urls.clone(),
        };
        let payload = match serde_json::to_value(&request) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("could not encode domain list: {e}");
                return;
            }
        };
        if let Err(e) = self.bus.send_to_extension(&self.id, payload).await {
            log::debug!("domain-list push not delivered: {e}");
        }
    }

    /// Query the companion's assignment for a URL.
    ///
    /// Inactive companion ⇒ `None` without a call. Any send error or a
    /// falsy reply ⇒ `None`; containment never blocks on the companion.
    pub async fn assignment_for(&self, url: &str) -> Option<Value> {
        if !self.is_active() {
            return None;
        }
        let request = CompanionRequest::GetAssignment {
            url: url.to_string(),
        };
        let payload = serde_json::to_value(&request).ok()?;
        match self.bus.send_to_extension(&self.id, payload).await {
            Ok(reply) if truthy(&reply) => Some(reply),
            Ok(_) => None,
            Err(e) => {
                log::debug!("assignment query for {url} failed: {e}");
                None
            }
        }
    }

    /// Track install/enable/disable/uninstall signals; signals for other
    /// extensions are ignored.
    pub fn handle_lifecycle(&self, event: &ExtensionEvent) {
        match event {
            ExtensionEvent::Installed(id) | ExtensionEvent::Enabled(id) if *id == self.id => {
                self.active.store(true, Ordering::Relaxed);
            }
            ExtensionEvent::Disabled(id) | ExtensionEvent::Uninstalled(id) if *id == self.id => {
                self.active.store(false, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    /// Handle an inbound message claiming to come from the companion.
    pub async fn handle_message(&self, sender: &str, message: &Value) {
        if sender != self.id {
            return;
        }
        if let Ok(CompanionNotice::Listening) =
            serde_json::from_value::<CompanionNotice>(message.clone())
        {
            self.push_domains().await;
        }
    }
}

fn truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;
    use serde_json::json;

    fn companion(mem: &Arc<MemoryHost>) -> Companion {
        Companion::new(
            mem.clone(),
            DEFAULT_COMPANION_ID,
            &["alibaba.com".to_string(), "taobao.com".to_string()],
        )
    }

    #[test]
    fn test_wire_shapes() {
        let push = CompanionRequest::JailedDomains {
            urls: vec!["https://alibaba.com/".to_string()],
        };
        assert_eq!(
            serde_json::to_value(&push).unwrap(),
            json!({"method": "jailedDomains", "urls": ["https://alibaba.com/"]})
        );

        let query = CompanionRequest::GetAssignment {
            url: "https://alibaba.com/".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({"method": "getAssignment", "url": "https://alibaba.com/"})
        );

        let notice: CompanionNotice =
            serde_json::from_value(json!({"method": "MACListening"})).unwrap();
        assert_eq!(notice, CompanionNotice::Listening);
    }

    #[tokio::test]
    async fn test_probe_enabled_pushes_domains() {
        let mem = MemoryHost::new();
        mem.install_extension(DEFAULT_COMPANION_ID, true);
        let companion = companion(&mem);

        assert!(companion.probe().await);
        assert!(companion.is_active());

        let sends = mem.extension_sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].1["method"], "jailedDomains");
        assert_eq!(sends[0].1["urls"][0], "https://alibaba.com/");
    }

    #[tokio::test]
    async fn test_probe_absent_or_disabled() {
        let mem = MemoryHost::new();
        let companion = companion(&mem);
        assert!(!companion.probe().await);
        assert!(!companion.is_active());

        mem.install_extension(DEFAULT_COMPANION_ID, false);
        assert!(!companion.probe().await);
        assert!(mem.extension_sends().is_empty());
    }

    #[tokio::test]
    async fn test_assignment_inactive_makes_no_call() {
        let mem = MemoryHost::new();
        let companion = companion(&mem);
        assert_eq!(companion.assignment_for("https://alibaba.com/").await, None);
        assert!(mem.extension_sends().is_empty());
    }

    #[tokio::test]
    async fn test_assignment_truthy_falsy_and_error() {
        let mem = MemoryHost::new();
        mem.install_extension(DEFAULT_COMPANION_ID, true);
        let companion = companion(&mem);
        companion.probe().await;

        mem.set_assignment("https://alibaba.com/", json!({"userContextId": 7}));
        assert!(companion.assignment_for("https://alibaba.com/").await.is_some());
        // default scripted reply is `false`
        assert_eq!(companion.assignment_for("https://taobao.com/").await, None);

        // companion crashed mid-call: degrade to no assignment
        mem.fail_extension_sends(true);
        assert_eq!(companion.assignment_for("https://alibaba.com/").await, None);
    }

    #[tokio::test]
    async fn test_lifecycle_flag_transitions() {
        let mem = MemoryHost::new();
        let companion = companion(&mem);

        companion.handle_lifecycle(&ExtensionEvent::Enabled(DEFAULT_COMPANION_ID.to_string()));
        assert!(companion.is_active());

        companion.handle_lifecycle(&ExtensionEvent::Disabled("@someone-else".to_string()));
        assert!(companion.is_active());

        companion.handle_lifecycle(&ExtensionEvent::Uninstalled(
            DEFAULT_COMPANION_ID.to_string(),
        ));
        assert!(!companion.is_active());
    }

    #[tokio::test]
    async fn test_listening_notice_repushes() {
        let mem = MemoryHost::new();
        let companion = companion(&mem);

        companion
            .handle_message(DEFAULT_COMPANION_ID, &json!({"method": "MACListening"}))
            .await;
        assert_eq!(mem.extension_sends().len(), 1);

        // wrong sender is ignored
        companion
            .handle_message("@imposter", &json!({"method": "MACListening"}))
            .await;
        assert_eq!(mem.extension_sends().len(), 1);
    }
}
