//! Jailed-domain list and the compiled suffix matcher
//!
//! The static list ships with the engine and is compiled once at startup.
//! Matching is suffix-based on full labels: `sub.example.com` matches an
//! entry `example.com`, `notexample.com` does not. The user-maintained
//! dynamic list is deliberately NOT handled here — it is an exact-host
//! membership check owned by the engine's storage layer.

use std::collections::HashSet;

use crate::url::{self, ParseError};

/// Domains isolated into the dedicated container by default.
pub static JAILED_DOMAINS: &[&str] = &[
    "alibabacloud.com",
    "alibaba.com",
    "alibaba.us",
    "alibaba.uk",
    "aliapp.org",
    "alibabacorp.com",
    "alibabagroup.com",
    "alibaba-inc.com",
    "alihealth.cn",
    "tmall.hk",
    "1688.com",
    "tmall.com",
    "taobao.com",
    "freshhema.com",
    "sunretail.com",
    "intime.com.cn",
    "aliexpress.com",
    "aliexpress.us",
    "lazada.cn",
    "trendyol.com",
    "daraz.com",
    "ele.me",
    "amap.com",
    "fliggy.com",
    "youku.com",
    "alibabapictures.com",
    "lingxigames.com",
    "damai.cn",
    "myquark.cn",
    "uc.cn",
    "cainiao.com",
    "aliyun.com",
    "dingtalk.com",
    "alibabafoundation.com",
    "ent-fund.org",
    "ae-rus.net",
    "ae-rus.ru",
    "aliexpress.ru",
    "alibaba",
    "alibabaplanet.com",
    "alicdn.com",
];

/// Compiled domain matcher.
///
/// One lookup per label suffix of the probed host, so a match costs
/// O(labels) rather than O(list length).
#[derive(Debug, Clone, Default)]
pub struct DomainSet {
    entries: HashSet<String>,
}

impl DomainSet {
    /// Compile a domain list. Entries are bare hostnames (no scheme or
    /// path); they are lower-cased once here.
    pub fn compile<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries: HashSet<String> = domains
            .into_iter()
            .map(|d| d.as_ref().to_ascii_lowercase())
            .collect();
        log::debug!("compiled {} jailed domains", entries.len());
        Self { entries }
    }

    /// Compile the shipped list.
    pub fn jailed() -> Self {
        Self::compile(JAILED_DOMAINS.iter().copied())
    }

    /// True iff `host` equals, or is a subdomain of, any compiled entry.
    pub fn contains_host(&self, host: &str) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let host = host.to_ascii_lowercase();
        let matched = url::walk_suffixes(&host).any(|suffix| self.entries.contains(suffix));
        matched
    }

    /// Parse the URL's host and check it against the set.
    pub fn contains_url(&self, url: &str) -> Result<bool, ParseError> {
        Ok(self.contains_host(url::host(url)?))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> DomainSet {
        DomainSet::compile(["alibaba.com", "taobao.com", "ele.me"])
    }

    #[test]
    fn test_exact_match() {
        assert!(set().contains_host("alibaba.com"));
        assert!(set().contains_host("ele.me"));
    }

    #[test]
    fn test_subdomain_match() {
        assert!(set().contains_host("foo.alibaba.com"));
        assert!(set().contains_host("deep.sub.taobao.com"));
    }

    #[test]
    fn test_label_boundary() {
        // suffix matching stops at label boundaries
        assert!(!set().contains_host("notalibaba.com"));
        assert!(!set().contains_host("alibaba.com.evil.net"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(set().contains_host("WWW.Alibaba.COM"));
        let upper = DomainSet::compile(["Alibaba.COM"]);
        assert!(upper.contains_host("alibaba.com"));
    }

    #[test]
    fn test_contains_url() {
        assert_eq!(set().contains_url("https://cdn.alibaba.com/x.js"), Ok(true));
        assert_eq!(set().contains_url("https://shop.example/"), Ok(false));
        assert!(set().contains_url("about:blank").is_err());
    }

    #[test]
    fn test_shipped_list() {
        let jailed = DomainSet::jailed();
        assert_eq!(jailed.len(), JAILED_DOMAINS.len());
        assert!(jailed.contains_host("login.taobao.com"));
        assert!(jailed.contains_host("alicdn.com"));
        // bare single-label entry
        assert!(jailed.contains_host("alibaba"));
        assert!(!jailed.contains_host("example.com"));
    }
}
