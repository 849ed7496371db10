//! First-party isolation for sub-resource loads
//!
//! Listed-domain resources may only load in a page whose own top-level
//! origin is listed or explicitly trusted by the user; otherwise they are
//! treated as cross-site trackers and dropped. Classification is pure; the
//! engine owns the block verdict, the content-layer notice, and the
//! per-tab tracker flag.

use sj_core::{url, DomainSet};

/// Outcome for one sub-resource request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubresourceOutcome {
    /// Target is not a jailed domain — nothing to do.
    Allow,
    /// Jailed resource on a jailed page: same-context traffic.
    AllowSameContext,
    /// Jailed resource on a page whose origin the user explicitly added.
    AllowTrusted,
    /// Jailed resource on an unrelated page: a cross-site tracker.
    Block,
}

impl SubresourceOutcome {
    /// Content-layer notice for this outcome, if one is sent.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            Self::Allow => None,
            Self::AllowSameContext => Some("jailed-domain"),
            Self::AllowTrusted => Some("allowed-jailed-subresources"),
            Self::Block => Some("blocked-jailed-subresources"),
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Block)
    }
}

/// Classify a sub-resource load. The caller has already established that
/// this is not a top-level navigation and that `origin_url` is known.
pub fn classify(
    target_url: &str,
    origin_url: &str,
    jailed: &DomainSet,
    user_domains: &[String],
) -> SubresourceOutcome {
    let target_jailed = jailed.contains_url(target_url).unwrap_or(false);
    if !target_jailed {
        return SubresourceOutcome::Allow;
    }

    let origin_jailed = jailed.contains_url(origin_url).unwrap_or(false);
    if origin_jailed {
        return SubresourceOutcome::AllowSameContext;
    }

    let origin_trusted = url::host(origin_url)
        .map(|host| user_domains.iter().any(|d| d == host))
        .unwrap_or(false);
    if origin_trusted {
        SubresourceOutcome::AllowTrusted
    } else {
        SubresourceOutcome::Block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jailed() -> DomainSet {
        DomainSet::compile(["alibaba.com", "alicdn.com"])
    }

    #[test]
    fn test_unlisted_target_allowed_silently() {
        let outcome = classify(
            "https://cdn.example/x.js",
            "https://shop.example/",
            &jailed(),
            &[],
        );
        assert_eq!(outcome, SubresourceOutcome::Allow);
        assert_eq!(outcome.notice(), None);
    }

    #[test]
    fn test_same_context_allowed_with_notice() {
        let outcome = classify(
            "https://cdn.alicdn.com/x.js",
            "https://www.alibaba.com/",
            &jailed(),
            &[],
        );
        assert_eq!(outcome, SubresourceOutcome::AllowSameContext);
        assert_eq!(outcome.notice(), Some("jailed-domain"));
    }

    #[test]
    fn test_cross_context_blocked() {
        let outcome = classify(
            "https://cdn.alibaba.com/x.js",
            "https://shop.example/",
            &jailed(),
            &[],
        );
        assert_eq!(outcome, SubresourceOutcome::Block);
        assert!(outcome.is_blocked());
        assert_eq!(outcome.notice(), Some("blocked-jailed-subresources"));
    }

    #[test]
    fn test_trusted_origin_allowed() {
        let user = vec!["shop.example".to_string()];
        let outcome = classify(
            "https://cdn.alibaba.com/x.js",
            "https://shop.example/",
            &jailed(),
            &user,
        );
        assert_eq!(outcome, SubresourceOutcome::AllowTrusted);
        assert_eq!(outcome.notice(), Some("allowed-jailed-subresources"));
    }

    #[test]
    fn test_unparseable_origin_blocks() {
        // a jailed target with an origin we cannot take a host from is
        // still cross-context traffic
        let outcome = classify("https://cdn.alibaba.com/x.js", "data:,", &jailed(), &[]);
        assert_eq!(outcome, SubresourceOutcome::Block);
    }
}
