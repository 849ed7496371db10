//! The engine context and its event handlers
//!
//! One `Engine` instance owns all mutable containment state: the compiled
//! matcher, the race guard, the load watch, the per-tab tracker flags, and
//! the companion liveness. The host adapter wires browser events into the
//! handler methods and applies the returned verdicts; the engine itself
//! never touches the browser except through the [`Host`] capabilities.
//!
//! Startup is fail-closed in one specific sense: if the dedicated identity
//! cannot be resolved, [`Engine::start`] returns an error and the adapter
//! must not install interception — no containment at all is better than
//! containment into a missing identity. Every runtime failure after that
//! degrades to "pass the request through".

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::json;

use sj_core::{url, ContextId, DomainSet, RequestEvent, TabId, Verdict, NO_TAB};

use crate::companion::{Companion, ExtensionEvent};
use crate::config::EngineConfig;
use crate::decide::containment_for;
use crate::error::{EngineError, Result};
use crate::host::{CreateTab, Host, StoredState, Tab, TabStatus};
use crate::race::{RaceGuard, RaceVerdict};
use crate::subresource;
use crate::sweep;
use crate::watch::LoadWatch;

/// Panel markers persisted for the settings UI.
pub const PANEL_ON_JAILED_SITE: &str = "on-jailed-site";
pub const PANEL_IN_JAIL: &str = "in-jail";
pub const PANEL_TRACKERS_DETECTED: &str = "trackers-detected";
pub const PANEL_NO_TRACKERS: &str = "no-trackers";

/// Messages from the settings/content surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentMessage {
    /// "what-sites-are-added" — list the user-maintained domains.
    ListUserDomains,
    /// Add the sending page's host to the user list.
    AddSenderSite,
    /// Remove a domain from the user list.
    RemoveDomain(String),
}

/// The slice of a tab-update event the engine cares about.
#[derive(Debug, Clone, Default)]
pub struct TabChange {
    /// Set when the tab's URL changed in this update.
    pub url: Option<String>,
}

pub struct Engine {
    host: Host,
    config: EngineConfig,
    jailed: DomainSet,
    jail_context: ContextId,
    companion: Companion,
    race: RaceGuard,
    watch: LoadWatch,
    trackers: Mutex<HashMap<TabId, bool>>,
}

impl Engine {
    /// Run the startup sequence: companion probe, identity setup (fatal on
    /// failure), first-run storage repair, and the cookie sweep. The
    /// adapter installs interception listeners only after this returns
    /// `Ok`, so the sweep never races a fresh navigation.
    pub async fn start(host: Host, config: EngineConfig) -> Result<Self> {
        let companion = Companion::new(host.bus.clone(), &config.companion_id, &config.domains);
        companion.probe().await;

        let jail_context = Self::setup_identity(&host, &config).await?;

        match host.storage.load().await {
            Ok(Some(_)) => {}
            Ok(None) => {
                if let Err(e) = host.storage.store(&StoredState::default()).await {
                    log::warn!("could not initialize stored state: {e}");
                }
            }
            Err(e) => log::warn!("could not read stored state: {e}"),
        }

        let engine = Self {
            jailed: DomainSet::compile(config.domains.iter()),
            jail_context,
            companion,
            race: RaceGuard::new(),
            watch: LoadWatch::new(),
            trackers: Mutex::new(HashMap::new()),
            host,
            config,
        };

        engine.sweep_cookies().await;
        Ok(engine)
    }

    /// Find or create the dedicated identity, reconciling color/icon with
    /// the configured details.
    async fn setup_identity(host: &Host, config: &EngineConfig) -> Result<ContextId> {
        let details = config.identity_details();
        let existing = host
            .identities
            .list(Some(&details.name))
            .await
            .map_err(|e| EngineError::IdentitySetup(e.to_string()))?;

        if let Some(identity) = existing.into_iter().next() {
            if identity.color != details.color || identity.icon != details.icon {
                host.identities
                    .update(&identity.context_id, &details)
                    .await
                    .map_err(|e| EngineError::IdentitySetup(e.to_string()))?;
            }
            Ok(identity.context_id)
        } else {
            let created = host
                .identities
                .create(&details)
                .await
                .map_err(|e| EngineError::IdentitySetup(e.to_string()))?;
            Ok(created.context_id)
        }
    }

    /// The dedicated identity's storage context.
    pub fn jail_context(&self) -> &ContextId {
        &self.jail_context
    }

    /// Whether the host adapter still needs to deliver tab updates for the
    /// startup load watch.
    pub fn needs_tab_updates(&self) -> bool {
        self.watch.is_active()
    }

    /// Whether trackers were blocked in this tab.
    pub fn trackers_detected(&self, tab: TabId) -> bool {
        self.trackers
            .lock()
            .unwrap()
            .get(&tab)
            .copied()
            .unwrap_or(false)
    }

    // =========================================================================
    // Interception handlers
    // =========================================================================

    /// Top-level navigation interception.
    pub async fn on_navigation_request(&self, request: &RequestEvent) -> Verdict {
        // The startup pass may still be waiting on this tab; a live
        // navigation supersedes it.
        self.watch.forget(request.tab_id);

        // Strip the tracking click identifier first — containment re-fires
        // on the redirected, cleaner URL.
        if let Some(stripped) = url::strip_query_param(&request.url, &self.config.tracking_param) {
            return Verdict::redirect(stripped);
        }

        if request.tab_id == NO_TAB {
            return Verdict::allow();
        }

        let tab = match self.host.tabs.get(request.tab_id).await {
            Ok(tab) => tab,
            Err(e) => {
                log::debug!("no tab for request {}: {e}", request.request_id);
                return Verdict::allow();
            }
        };

        self.refresh_panel(&tab).await;
        self.maybe_reopen_tab(&request.url, &tab, Some(request)).await
    }

    /// Sub-resource interception.
    pub async fn on_subresource_request(&self, request: &RequestEvent) -> Verdict {
        if request.kind.is_navigation() {
            return Verdict::allow();
        }
        let origin = match request.origin_url.as_deref() {
            Some(origin) => origin,
            None => return Verdict::allow(),
        };

        let user_domains = self.user_domains().await;
        let outcome = subresource::classify(&request.url, origin, &self.jailed, &user_domains);

        if let Some(notice) = outcome.notice() {
            self.notify_tab(request.tab_id, notice).await;
        }

        if outcome.is_blocked() {
            self.trackers.lock().unwrap().insert(request.tab_id, true);
            Verdict::cancel()
        } else {
            Verdict::allow()
        }
    }

    /// Completion or error signal for a tab's top-level request.
    pub fn on_request_settled(&self, tab: TabId) {
        self.race.settle(tab);
    }

    // =========================================================================
    // Tab and lifecycle handlers
    // =========================================================================

    /// Tab update: drives the startup load watch and the panel marker.
    pub async fn on_tab_updated(&self, change: &TabChange, tab: &Tab) {
        if change.url.is_some() && self.watch.forget(tab.id) {
            // The awaited tab finally has a real URL; evaluate it without
            // an interception request.
            let _ = self.maybe_reopen_tab(&tab.url, tab, None).await;
        }
        if tab.status == TabStatus::Complete {
            self.watch.forget(tab.id);
        }
        self.refresh_panel(tab).await;
    }

    pub fn on_tab_removed(&self, tab: TabId) {
        self.trackers.lock().unwrap().remove(&tab);
        self.watch.forget(tab);
    }

    /// Host extension-lifecycle signal.
    pub fn on_extension_event(&self, event: &ExtensionEvent) {
        self.companion.handle_lifecycle(event);
    }

    /// Inbound message from another extension.
    pub async fn on_companion_message(&self, sender: &str, message: &serde_json::Value) {
        self.companion.handle_message(sender, message).await;
    }

    /// Inbound message from the settings/content surface. Returns a reply
    /// for queries, `None` otherwise.
    pub async fn on_content_message(
        &self,
        message: ContentMessage,
        sender_url: &str,
    ) -> Option<Vec<String>> {
        match message {
            ContentMessage::ListUserDomains => Some(self.user_domains().await),
            ContentMessage::AddSenderSite => {
                if let Err(e) = self.add_user_domain(sender_url).await {
                    log::debug!("could not add {sender_url} to the user list: {e}");
                }
                None
            }
            ContentMessage::RemoveDomain(domain) => {
                if let Err(e) = self.remove_user_domain(&domain).await {
                    log::debug!("could not remove {domain} from the user list: {e}");
                }
                None
            }
        }
    }

    // =========================================================================
    // Startup pass over already-open tabs
    // =========================================================================

    /// Evaluate every already-open tab: blank placeholders still loading
    /// are parked in the load watch, everything else is checked for
    /// reopening immediately.
    pub async fn reopen_open_tabs(&self) {
        let tabs = match self.host.tabs.list().await {
            Ok(tabs) => tabs,
            Err(e) => {
                log::warn!("could not enumerate open tabs: {e}");
                return;
            }
        };

        for tab in tabs {
            if tab.url == "about:blank" {
                if tab.status == TabStatus::Loading {
                    self.watch.watch(tab.id);
                }
            } else {
                let _ = self.maybe_reopen_tab(&tab.url.clone(), &tab, None).await;
            }
        }
    }

    // =========================================================================
    // Containment core
    // =========================================================================

    /// Decide and, if needed, perform the reopen for a navigation.
    ///
    /// The companion's assignment takes precedence unconditionally. The
    /// race guard is consulted only when an interception request
    /// accompanies the decision; the replacement tab is created before the
    /// original is removed so a window never reaches zero tabs.
    async fn maybe_reopen_tab(
        &self,
        target_url: &str,
        tab: &Tab,
        request: Option<&RequestEvent>,
    ) -> Verdict {
        if self.companion.assignment_for(target_url).await.is_some() {
            return Verdict::allow();
        }

        let user_domains = self.user_domains().await;
        let target = match containment_for(
            target_url,
            &tab.context_id,
            &self.jail_context,
            &self.jailed,
            &user_domains,
        ) {
            Some(target) => target,
            None => return Verdict::allow(),
        };

        if let Some(request) = request {
            if self.race.note(tab.id, &request.request_id, target_url) == RaceVerdict::CancelEarly {
                return Verdict::cancel();
            }
        }

        let replacement = CreateTab {
            url: target_url.to_string(),
            context_id: target,
            active: tab.active,
            index: tab.index,
            window_id: tab.window_id,
        };
        if let Err(e) = self.host.tabs.create(&replacement).await {
            log::warn!("could not reopen {target_url}: {e}");
            return Verdict::allow();
        }
        if let Err(e) = self.host.tabs.remove(tab.id).await {
            log::debug!("could not close replaced tab {}: {e}", tab.id);
        }

        Verdict::cancel()
    }

    /// Sweep stored cookies for the combined static + user domain list.
    pub async fn sweep_cookies(&self) {
        let mut domains = self.config.domains.clone();
        for domain in self.user_domains().await {
            if !domains.contains(&domain) {
                domains.push(domain);
            }
        }
        sweep::clear_jailed_cookies(&self.host, &self.companion, &domains, &self.jail_context)
            .await;
    }

    // =========================================================================
    // User list and panel state
    // =========================================================================

    /// The user-maintained domain list, read through storage on each use
    /// so concurrent settings edits are always honored.
    pub async fn user_domains(&self) -> Vec<String> {
        match self.host.storage.load().await {
            Ok(state) => state.unwrap_or_default().user_domains,
            Err(e) => {
                log::warn!("could not read the user domain list: {e}");
                Vec::new()
            }
        }
    }

    /// Record the sending page's host in the user list.
    pub async fn add_user_domain(&self, page_url: &str) -> Result<()> {
        let host_name = url::host(page_url)?.to_string();
        let mut state = self.host.storage.load().await?.unwrap_or_default();
        if !state.user_domains.contains(&host_name) {
            state.user_domains.push(host_name);
        }
        self.host.storage.store(&state).await?;
        Ok(())
    }

    pub async fn remove_user_domain(&self, domain: &str) -> Result<()> {
        let mut state = self.host.storage.load().await?.unwrap_or_default();
        state.user_domains.retain(|d| d != domain);
        self.host.storage.store(&state).await?;
        Ok(())
    }

    /// Persist the panel marker for a tab's current document.
    async fn refresh_panel(&self, tab: &Tab) {
        let mut state = match self.host.storage.load().await {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                log::debug!("skipping panel refresh: {e}");
                return;
            }
        };

        let listed = self.jailed.contains_url(&tab.url).unwrap_or(false);
        let user_listed = url::host(&tab.url)
            .map(|h| state.user_domains.iter().any(|d| d == h))
            .unwrap_or(false);

        let panel = if listed {
            PANEL_ON_JAILED_SITE
        } else if user_listed {
            PANEL_IN_JAIL
        } else if self.trackers_detected(tab.id) {
            PANEL_TRACKERS_DETECTED
        } else {
            PANEL_NO_TRACKERS
        };

        state.current_panel = Some(panel.to_string());
        if let Err(e) = self.host.storage.store(&state).await {
            log::debug!("could not persist panel state: {e}");
        }
    }

    async fn notify_tab(&self, tab: TabId, notice: &str) {
        if let Err(e) = self.host.bus.send_to_tab(tab, json!({ "msg": notice })).await {
            log::debug!("content notice {notice} not delivered to tab {tab}: {e}");
        }
    }
}
