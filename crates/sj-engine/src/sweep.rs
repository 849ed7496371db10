//! Startup cookie eviction
//!
//! Evicts every stored cookie for the jailed domains from every storage
//! context except the jail itself, skipping domains the companion has
//! claimed for its own policy. Worker registrations are purged alongside,
//! since a stale worker can intercept future requests before the
//! interception layer sees them.
//!
//! Domain and context work is independent; removals run unordered via
//! `join_all`. The goal is "eventually fully evicted", not atomicity, and
//! individual failures are logged and skipped.

use std::collections::HashSet;

use futures::future::join_all;

use crate::companion::Companion;
use crate::host::Host;
use sj_core::ContextId;

/// Run the eviction pass. `domains` is the combined static + user list.
pub async fn clear_jailed_cookies(
    host: &Host,
    companion: &Companion,
    domains: &[String],
    jail: &ContextId,
) {
    let mut contexts: Vec<ContextId> = match host.identities.list(None).await {
        Ok(identities) => identities.into_iter().map(|i| i.context_id).collect(),
        Err(e) => {
            log::warn!("could not enumerate identities for the sweep: {e}");
            Vec::new()
        }
    };
    contexts.push(ContextId::default_store());

    let claimed = claimed_domains(companion, domains).await;

    join_all(
        domains
            .iter()
            .filter(|domain| !claimed.contains(domain.as_str()))
            .map(|domain| {
                let contexts = &contexts;
                async move {
                    join_all(
                        contexts
                            .iter()
                            .filter(|context| *context != jail)
                            .map(|context| evict_domain(host, domain, context)),
                    )
                    .await;
                }
            }),
    )
    .await;
}

/// Per domain, whether the companion claims it — probing both the bare
/// domain and its `www.` form.
async fn claimed_domains(companion: &Companion, domains: &[String]) -> HashSet<String> {
    if !companion.is_active() {
        return HashSet::new();
    }
    join_all(domains.iter().map(|domain| async move {
        let bare = companion
            .assignment_for(&format!("https://{domain}/"))
            .await
            .is_some();
        let www = bare
            || companion
                .assignment_for(&format!("https://www.{domain}/"))
                .await
                .is_some();
        www.then(|| domain.clone())
    }))
    .await
    .into_iter()
    .flatten()
    .collect()
}

async fn evict_domain(host: &Host, domain: &str, context: &ContextId) {
    let cookie_url = format!("https://{domain}/");
    match host.cookies.list(domain, context).await {
        Ok(cookies) => {
            for cookie in cookies {
                if let Err(e) = host.cookies.remove(&cookie.name, &cookie_url, context).await {
                    log::warn!("could not remove cookie {} for {domain}: {e}", cookie.name);
                }
            }
        }
        Err(e) => log::warn!("could not enumerate cookies for {domain}: {e}"),
    }
    if let Err(e) = host.cookies.purge_workers(domain).await {
        log::debug!("worker purge for {domain} failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::companion::DEFAULT_COMPANION_ID;
    use crate::host::memory::MemoryHost;
    use serde_json::json;

    fn domains() -> Vec<String> {
        vec!["alibaba.com".to_string(), "taobao.com".to_string()]
    }

    #[tokio::test]
    async fn test_evicts_everywhere_except_jail() {
        let mem = MemoryHost::new();
        let jail = mem.add_identity("Alibaba", "orange", "cart").context_id;
        let default = ContextId::default_store();

        mem.seed_cookie("taobao.com", &default, "sid");
        mem.seed_cookie("taobao.com", &jail, "sid");
        mem.seed_cookie("alibaba.com", &default, "tracker");

        let companion = Companion::new(mem.clone(), DEFAULT_COMPANION_ID, &domains());
        clear_jailed_cookies(&mem.host(), &companion, &domains(), &jail).await;

        assert!(mem.cookies_in("taobao.com", &default).is_empty());
        assert!(mem.cookies_in("alibaba.com", &default).is_empty());
        // the jail's own storage is never touched
        assert_eq!(mem.cookies_in("taobao.com", &jail).len(), 1);

        let purged = mem.purged_workers();
        assert!(purged.contains(&"taobao.com".to_string()));
        assert!(purged.contains(&"alibaba.com".to_string()));
    }

    #[tokio::test]
    async fn test_companion_claimed_domain_is_skipped() {
        let mem = MemoryHost::new();
        let jail = mem.add_identity("Alibaba", "orange", "cart").context_id;
        let default = ContextId::default_store();

        mem.install_extension(DEFAULT_COMPANION_ID, true);
        mem.set_assignment("https://alibaba.com/", json!({"userContextId": 5}));
        mem.seed_cookie("alibaba.com", &default, "keep");
        mem.seed_cookie("taobao.com", &default, "evict");

        let companion = Companion::new(mem.clone(), DEFAULT_COMPANION_ID, &domains());
        companion.probe().await;
        clear_jailed_cookies(&mem.host(), &companion, &domains(), &jail).await;

        assert_eq!(mem.cookies_in("alibaba.com", &default).len(), 1);
        assert!(mem.cookies_in("taobao.com", &default).is_empty());
        assert!(!mem.purged_workers().contains(&"alibaba.com".to_string()));
    }

    #[tokio::test]
    async fn test_www_claim_also_skips() {
        let mem = MemoryHost::new();
        let jail = mem.add_identity("Alibaba", "orange", "cart").context_id;
        let default = ContextId::default_store();

        mem.install_extension(DEFAULT_COMPANION_ID, true);
        mem.set_assignment("https://www.taobao.com/", json!({"userContextId": 2}));
        mem.seed_cookie("taobao.com", &default, "keep");

        let companion = Companion::new(mem.clone(), DEFAULT_COMPANION_ID, &domains());
        companion.probe().await;
        clear_jailed_cookies(&mem.host(), &companion, &domains(), &jail).await;

        assert_eq!(mem.cookies_in("taobao.com", &default).len(), 1);
    }

    #[tokio::test]
    async fn test_inactive_companion_is_never_queried() {
        let mem = MemoryHost::new();
        let jail = mem.add_identity("Alibaba", "orange", "cart").context_id;
        let companion = Companion::new(mem.clone(), DEFAULT_COMPANION_ID, &domains());

        clear_jailed_cookies(&mem.host(), &companion, &domains(), &jail).await;
        assert!(mem.extension_sends().is_empty());
    }
}
