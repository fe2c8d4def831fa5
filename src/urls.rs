use tracing::warn;
use url::Url;

/// Resolve `path` against `base` and return the absolute URL.
///
/// Relative paths resolve the same way a browser resolves them, absolute
/// URLs come back unchanged. Returns `None` (and logs) when the base is not
/// a valid URL, the path is blank, or the join fails.
pub fn create_url(path: &str, base: &str) -> Option<String> {
    if path.trim().is_empty() {
        warn!("Invalid path or base URL: empty path against '{}'", base);
        return None;
    }

    match Url::parse(base).and_then(|base| base.join(path)) {
        Ok(url) => Some(url.into()),
        Err(e) => {
            warn!("Invalid path or base URL: '{}' against '{}': {}", path, base, e);
            None
        }
    }
}
