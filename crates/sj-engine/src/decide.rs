//! Containment decision for top-level navigations
//!
//! Pure state machine: given a URL, the tab's current storage context, and
//! the two domain lists, decide which context (if any) the tab must be
//! reopened under. Companion precedence is applied by the caller before
//! this runs; the race guard and the tab side effects live in the engine.

use sj_core::{url, ContextId, DomainSet};

/// Decide the reopen target for a navigation.
///
/// - non-http(s) URLs are never contained;
/// - a listed (or user-listed) URL outside the jail moves into it;
/// - an unlisted URL inside the jail moves back to the default context;
/// - anything else stays put.
///
/// Malformed URLs fail open: no containment rather than an error.
pub fn containment_for(
    target_url: &str,
    tab_context: &ContextId,
    jail_context: &ContextId,
    jailed: &DomainSet,
    user_domains: &[String],
) -> Option<ContextId> {
    url::scheme(target_url)?;

    let host = match url::host(target_url) {
        Ok(host) => host,
        Err(e) => {
            log::debug!("not containing unparseable url: {e}");
            return None;
        }
    };

    // The user list stores hosts exactly as observed; membership is an
    // exact-string check, not a suffix match.
    let listed = jailed.contains_host(host) || user_domains.iter().any(|d| d == host);

    if listed && tab_context != jail_context {
        Some(jail_context.clone())
    } else if !listed && tab_context == jail_context {
        Some(ContextId::default_store())
    } else {
        None
    }
}
