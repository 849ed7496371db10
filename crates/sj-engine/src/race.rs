//! Redirect-race dedup
//!
//! A single user navigation can fire several interception callbacks
//! (initial load, server redirect, retries) before the browser settles the
//! tab. Reopening on each of them would open duplicate tabs. The guard
//! records, per tab, the request ids and URLs a reopen decision has
//! already been made for; a repeat within the TTL window is dropped early.
//!
//! Completion and error signals clear an entry immediately, but they are
//! not fully reliable, so every entry also carries a 2000 ms deadline: a
//! spawned reaper removes it at the deadline, and `note` treats an expired
//! entry as absent even if the reaper has not run yet. No entry outlives
//! the TTL.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use sj_core::TabId;

/// How long a per-tab dedup entry survives without a settle signal.
///
/// Tuned against typical redirect-chain latency: shorter risks reopening a
/// slow redirect twice, longer risks swallowing a genuine re-navigation.
pub const CANCEL_TTL: Duration = Duration::from_millis(2000);

/// Outcome of a dedup check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceVerdict {
    /// First decision for this navigation — the reopen may go ahead.
    Proceed,
    /// A retry or redirect of an already-handled navigation — cancel the
    /// request without reopening.
    CancelEarly,
}

struct Entry {
    request_ids: HashSet<String>,
    urls: HashSet<String>,
    deadline: Instant,
    reaper: JoinHandle<()>,
}

/// Per-tab dedup state. Cheap to clone; clones share the same map.
#[derive(Clone, Default)]
pub struct RaceGuard {
    entries: Arc<Mutex<HashMap<TabId, Entry>>>,
}

impl RaceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reopen decision for `(tab, request_id, url)`.
    ///
    /// The check and the record happen under one lock with no await point,
    /// so two racing callbacks for the same navigation can never both get
    /// `Proceed`.
    pub fn note(&self, tab: TabId, request_id: &str, url: &str) -> RaceVerdict {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();

        // An expired entry counts as absent even if the reaper is late.
        if entries.get(&tab).is_some_and(|e| e.deadline <= now) {
            if let Some(stale) = entries.remove(&tab) {
                stale.reaper.abort();
            }
        }

        match entries.get_mut(&tab) {
            Some(entry) => {
                let repeat =
                    entry.request_ids.contains(request_id) || entry.urls.contains(url);
                entry.request_ids.insert(request_id.to_string());
                entry.urls.insert(url.to_string());
                if repeat {
                    log::debug!("dropping repeated request {request_id} for tab {tab}");
                    RaceVerdict::CancelEarly
                } else {
                    RaceVerdict::Proceed
                }
            }
            None => {
                let deadline = now + CANCEL_TTL;
                let mut entry = Entry {
                    request_ids: HashSet::new(),
                    urls: HashSet::new(),
                    deadline,
                    reaper: self.spawn_reaper(tab, deadline),
                };
                entry.request_ids.insert(request_id.to_string());
                entry.urls.insert(url.to_string());
                entries.insert(tab, entry);
                RaceVerdict::Proceed
            }
        }
    }

    /// Clear a tab's entry immediately. Invoked on completion or error
    /// signals for the tab's top-level request.
    pub fn settle(&self, tab: TabId) {
        if let Some(entry) = self.entries.lock().unwrap().remove(&tab) {
            entry.reaper.abort();
        }
    }

    /// Whether a live (unexpired) entry exists for the tab.
    pub fn has_entry(&self, tab: TabId) -> bool {
        self.entries
            .lock()
            .unwrap()
            .get(&tab)
            .is_some_and(|e| e.deadline > Instant::now())
    }

    fn spawn_reaper(&self, tab: TabId, deadline: Instant) -> JoinHandle<()> {
        let entries = Arc::clone(&self.entries);
        tokio::spawn(async move {
            sleep_until(deadline).await;
            let mut entries = entries.lock().unwrap();
            // A fresh entry may have replaced the one this reaper was
            // armed for; only remove if it is actually past its deadline.
            if entries.get(&tab).is_some_and(|e| e.deadline <= Instant::now()) {
                entries.remove(&tab);
            }
        })
    }
}
