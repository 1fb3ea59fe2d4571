use std::sync::Arc;

use webguard_core::error::Result;
use webguard_core::origin;

use crate::config::GuardConfig;
use crate::intercept::Realm;
use crate::obs::GuardMetrics;
use crate::storage::{DurableStore, VolatileStore};

/// Where a frame sits relative to the top-level browsing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// The outermost frame.
    Top,
    /// Embedded frame on the same hostname as the top frame.
    SameOrigin,
    /// Embedded frame whose top is on another hostname or not readable at all.
    Foreign,
}

/// Navigation facts for a frame, as the host reports them.
#[derive(Debug, Clone)]
pub struct FrameInfo {
    pub url: String,
    /// Top frame URL; `None` when the top is cross-origin and unreadable.
    pub top_url: Option<String>,
    pub is_top: bool,
}

impl FrameInfo {
    pub fn top(url: &str) -> Self {
        Self {
            url: url.to_string(),
            top_url: Some(url.to_string()),
            is_top: true,
        }
    }

    pub fn embedded(url: &str, top_url: Option<&str>) -> Self {
        Self {
            url: url.to_string(),
            top_url: top_url.map(str::to_string),
            is_top: false,
        }
    }

    /// Frame kind plus the top origin the frame works under. Foreign frames
    /// report their own hostname since the real top is not known to them.
    pub fn classify(&self) -> Result<(FrameKind, String)> {
        let own = origin::hostname(&self.url)?;
        if self.is_top {
            return Ok((FrameKind::Top, own));
        }
        match self.top_url.as_deref().map(origin::hostname_opt) {
            Some(Some(top)) if top == own => Ok((FrameKind::SameOrigin, top)),
            _ => Ok((FrameKind::Foreign, own)),
        }
    }
}

/// Everything one frame's bootstrapper needs.
#[derive(Clone)]
pub struct FrameContext {
    pub frame: FrameInfo,
    pub realm: Arc<Realm>,
    pub durable: Arc<dyn DurableStore>,
    pub volatile: Arc<dyn VolatileStore>,
    pub metrics: Arc<GuardMetrics>,
    pub cfg: GuardConfig,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn top_frame_uses_own_hostname() {
        let (kind, top) = FrameInfo::top("https://a.com/index.html").classify().unwrap();
        assert_eq!(kind, FrameKind::Top);
        assert_eq!(top, "a.com");
    }

    #[test]
    fn same_origin_child_inherits_top() {
        let info = FrameInfo::embedded("https://a.com/widget", Some("https://a.com/"));
        assert_eq!(info.classify().unwrap(), (FrameKind::SameOrigin, "a.com".to_string()));
    }

    #[test]
    fn unreadable_or_other_top_is_foreign() {
        let info = FrameInfo::embedded("https://ads.x.net/frame", None);
        assert_eq!(info.classify().unwrap(), (FrameKind::Foreign, "ads.x.net".to_string()));
        let info = FrameInfo::embedded("https://ads.x.net/frame", Some("https://a.com/"));
        assert_eq!(info.classify().unwrap().0, FrameKind::Foreign);
    }

    #[test]
    fn unparseable_frame_url_is_error() {
        let err = FrameInfo::top("about:blank").classify().unwrap_err();
        assert_eq!(err.kind().as_str(), "PARSE_FAILURE");
    }
}
