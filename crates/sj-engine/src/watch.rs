//! Tabs awaiting their initial navigation
//!
//! At startup some open tabs are still a blank placeholder whose real URL
//! has not landed yet. Those tab ids are parked here; tab-update events
//! drain the set, and `is_active` tells the host adapter when its update
//! listener can be detached. The navigation handler also force-forgets a
//! tab on first interception so the startup pass cannot race a live
//! navigation into a double reopen.

use std::collections::HashSet;
use std::sync::Mutex;

use sj_core::TabId;

#[derive(Debug, Default)]
pub struct LoadWatch {
    waiting: Mutex<HashSet<TabId>>,
}

impl LoadWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a tab until its URL changes or it finishes loading.
    pub fn watch(&self, tab: TabId) {
        self.waiting.lock().unwrap().insert(tab);
    }

    /// Remove a tab from the set. Returns true if it was being watched.
    pub fn forget(&self, tab: TabId) -> bool {
        self.waiting.lock().unwrap().remove(&tab)
    }

    pub fn contains(&self, tab: TabId) -> bool {
        self.waiting.lock().unwrap().contains(&tab)
    }

    /// Whether any tab is still awaited — the host adapter keeps its
    /// tab-update listener attached exactly as long as this is true.
    pub fn is_active(&self) -> bool {
        !self.waiting.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_forget_cycle() {
        let watch = LoadWatch::new();
        assert!(!watch.is_active());

        watch.watch(3);
        watch.watch(7);
        assert!(watch.is_active());
        assert!(watch.contains(3));

        assert!(watch.forget(3));
        assert!(!watch.forget(3));
        assert!(watch.is_active());

        watch.forget(7);
        assert!(!watch.is_active());
    }
}
