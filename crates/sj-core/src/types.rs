//! Core type definitions for SiteJail
//!
//! These types describe the traffic the interception layer hands to the
//! engine and the verdicts the engine hands back.

// =============================================================================
// Identifiers
// =============================================================================

/// Browser tab identifier.
pub type TabId = i32;

/// Tab id used by the interception layer for requests that do not belong
/// to any tab (speculative loads, background fetches).
pub const NO_TAB: TabId = -1;

/// Opaque identifier of a cookie storage context (a contextual identity).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextId(pub String);

impl ContextId {
    /// The browser's default (non-isolated) storage context.
    pub const DEFAULT: &'static str = "firefox-default";

    /// Handle for the default storage context.
    pub fn default_store() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContextId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Request Kinds (bit mask over browser resource types)
// =============================================================================

bitflags::bitflags! {
    /// Resource kind bit mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RequestKind: u32 {
        const OTHER = 1 << 0;
        const SCRIPT = 1 << 1;
        const IMAGE = 1 << 2;
        const STYLESHEET = 1 << 3;
        const OBJECT = 1 << 4;
        const SUB_FRAME = 1 << 5;
        const MAIN_FRAME = 1 << 6;
        const XMLHTTPREQUEST = 1 << 7;
        const WEBSOCKET = 1 << 8;
        const FONT = 1 << 9;
        const MEDIA = 1 << 10;
        const PING = 1 << 11;
        const BEACON = 1 << 12;
        const FETCH = 1 << 13;

        /// Top-level document loads
        const DOCUMENT = Self::MAIN_FRAME.bits();
    }
}

impl RequestKind {
    /// Parse from a browser resource-type string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "main_frame" => Self::MAIN_FRAME,
            "sub_frame" => Self::SUB_FRAME,
            "stylesheet" => Self::STYLESHEET,
            "script" => Self::SCRIPT,
            "image" => Self::IMAGE,
            "font" => Self::FONT,
            "object" => Self::OBJECT,
            "xmlhttprequest" => Self::XMLHTTPREQUEST,
            "ping" => Self::PING,
            "beacon" => Self::BEACON,
            "media" => Self::MEDIA,
            "websocket" => Self::WEBSOCKET,
            "fetch" => Self::FETCH,
            _ => Self::OTHER,
        }
    }

    /// Is this a top-level navigation?
    pub fn is_navigation(&self) -> bool {
        self.intersects(Self::MAIN_FRAME)
    }
}

// =============================================================================
// Request Event
// =============================================================================

/// A request delivered by the interception layer.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    /// Tab the request belongs to, or [`NO_TAB`].
    pub tab_id: TabId,
    /// Interception-layer request identifier. The same logical navigation
    /// can fire several events (redirects, retries) with differing ids.
    pub request_id: String,
    /// Full request URL.
    pub url: String,
    /// URL of the document that initiated the request, when known.
    pub origin_url: Option<String>,
    /// Resource kind of the request.
    pub kind: RequestKind,
}

impl RequestEvent {
    /// Convenience constructor for a top-level navigation event.
    pub fn navigation(tab_id: TabId, request_id: &str, url: &str) -> Self {
        Self {
            tab_id,
            request_id: request_id.to_string(),
            url: url.to_string(),
            origin_url: None,
            kind: RequestKind::MAIN_FRAME,
        }
    }
}

// =============================================================================
// Verdict
// =============================================================================

/// Instruction returned to the interception layer for a request.
///
/// Maps onto the layer's wire contract: `{}` to let the request through,
/// `{cancel: true}` to drop it, `{redirectUrl}` to re-point it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub cancel: bool,
    pub redirect_url: Option<String>,
}

impl Verdict {
    /// Let the request through unmodified.
    pub fn allow() -> Self {
        Self {
            cancel: false,
            redirect_url: None,
        }
    }

    /// Drop the in-flight request.
    pub fn cancel() -> Self {
        Self {
            cancel: true,
            redirect_url: None,
        }
    }

    /// Re-point the request at another URL in the same tab.
    pub fn redirect(url: String) -> Self {
        Self {
            cancel: false,
            redirect_url: Some(url),
        }
    }

    /// True when the verdict neither cancels nor redirects.
    pub fn is_allow(&self) -> bool {
        !self.cancel && self.redirect_url.is_none()
    }
}

impl Default for Verdict {
    fn default() -> Self {
        Self::allow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_kind_from_str() {
        assert_eq!(RequestKind::from_str("main_frame"), RequestKind::MAIN_FRAME);
        assert_eq!(RequestKind::from_str("sub_frame"), RequestKind::SUB_FRAME);
        assert_eq!(RequestKind::from_str("script"), RequestKind::SCRIPT);
        assert_eq!(RequestKind::from_str("imaginary"), RequestKind::OTHER);
    }

    #[test]
    fn test_navigation_kind() {
        assert!(RequestKind::MAIN_FRAME.is_navigation());
        assert!(!RequestKind::SCRIPT.is_navigation());
        assert!(!RequestKind::SUB_FRAME.is_navigation());
    }

    #[test]
    fn test_verdict_shapes() {
        assert!(Verdict::allow().is_allow());
        assert!(Verdict::cancel().cancel);
        let v = Verdict::redirect("https://example.com/".to_string());
        assert!(!v.cancel);
        assert_eq!(v.redirect_url.as_deref(), Some("https://example.com/"));
    }
}
