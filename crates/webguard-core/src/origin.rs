//! Hostname extraction and same-origin comparison.
//!
//! Origins are compared by hostname only: scheme and port are ignored, so
//! `http://a.com` and `https://a.com:8443` are the same origin here.

use url::Url;

use crate::error::{GuardError, Result};

/// Hostname of an absolute URL.
pub fn hostname(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| GuardError::Parse(format!("invalid url {url:?}: {e}")))?;
    parsed
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| GuardError::Parse(format!("url has no host: {url}")))
}

/// Hostname of an absolute URL, `None` when it cannot be parsed.
pub fn hostname_opt(url: &str) -> Option<String> {
    hostname(url).ok()
}

/// Whether `url` points somewhere other than `top_origin`.
///
/// URLs without a hostname (relative paths, `data:`, garbage) never equal the
/// top origin and therefore count as cross-origin.
pub fn is_url_cross_origin(top_origin: &str, url: &str) -> bool {
    match hostname_opt(url) {
        Some(host) => host != top_origin,
        None => true,
    }
}
