//! Code-origin attribution from the call stack.
//!
//! The stack text is scanned for `http(s)://host` tokens and the *last* one
//! wins, i.e. the frame nearest the bottom of the stack. A script from one
//! origin calling into a library from another is therefore attributed to the
//! caller, which can misattribute deeply nested dynamic script chains.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use regex::Regex;

use webguard_core::error::{GuardError, Result};
use webguard_core::origin;

use crate::intercept::StackSource;
use crate::session::SessionOriginCache;

fn url_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^:/\s)]+").ok()).as_ref()
}

/// Hostname of the last URL in `trace`.
pub fn origin_from_stack(trace: &str) -> Result<String> {
    let re = url_regex().ok_or_else(|| GuardError::Internal("url pattern failed to compile".into()))?;
    let last = re.find_iter(trace).last().ok_or(GuardError::Attribution)?;
    origin::hostname(last.as_str())
}

/// Attributes intercepted calls and records every attributed origin.
pub struct Attributor {
    stack: Arc<dyn StackSource>,
    cache: Arc<SessionOriginCache>,
    attempts: AtomicU64,
}

impl Attributor {
    pub fn new(stack: Arc<dyn StackSource>, cache: Arc<SessionOriginCache>) -> Self {
        Self {
            stack,
            cache,
            attempts: AtomicU64::new(0),
        }
    }

    /// Origin of the script behind the current call.
    ///
    /// A successful attribution is recorded in the session cache even if the
    /// call ends up allowed; a failed cache write is logged and ignored.
    pub fn attribute(&self) -> Result<String> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        let origin = origin_from_stack(&self.stack.capture())?;
        if let Err(e) = self.cache.record(&origin) {
            tracing::warn!(%origin, error = %e, "session origin cache write failed");
        }
        Ok(origin)
    }

    /// Number of stack walks performed so far.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn cache(&self) -> &Arc<SessionOriginCache> {
        &self.cache
    }
}
