//! Pure URL helpers for stream targets
//!
//! No state, no I/O. Everything here is tolerant: an unparsable URL yields
//! `None` (or the input unchanged for rewrites) rather than an error, since
//! callers treat these as best-effort heuristics.

use url::Url;

/// Extract `scheme://host[:port]` from a URL
pub fn origin(raw: &str) -> Option<String> {
    let u = Url::parse(raw).ok()?;
    let host = u.host_str()?;
    let mut origin = format!("{}://{}", u.scheme(), host);
    if let Some(port) = u.port() {
        origin.push_str(&format!(":{}", port));
    }
    Some(origin)
}

/// Extract the mount (path) from a URL, `None` for the root path
pub fn mount(raw: &str) -> Option<String> {
    let u = Url::parse(raw).ok()?;
    let path = u.path();
    if path.is_empty() || path == "/" {
        None
    } else {
        Some(path.to_string())
    }
}

/// Rewrite `https://` to `http://`, leaving anything else untouched.
///
/// Some Icecast hosts only expose the ICY side-channel on plain HTTP; the
/// caller opts into this downgrade explicitly.
pub fn force_http(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut u) if u.scheme() == "https" => {
            if u.set_scheme("http").is_ok() {
                u.to_string()
            } else {
                raw.to_string()
            }
        }
        _ => raw.to_string(),
    }
}

/// For an AAC-family stream path, build the `.mp3` sibling URL.
///
/// Returns `None` when the path does not end in `.aac`/`.aacp`
/// (case-insensitive). Query string and fragment are preserved. Used only as
/// a last-resort retry, never as a primary path.
pub fn mp3_variant(raw: &str) -> Option<String> {
    let mut u = Url::parse(raw).ok()?;
    let path = u.path().to_string();
    let lower = path.to_ascii_lowercase();
    let stem = if let Some(s) = lower.strip_suffix(".aacp") {
        &path[..s.len()]
    } else if let Some(s) = lower.strip_suffix(".aac") {
        &path[..s.len()]
    } else {
        return None;
    };
    let new_path = format!("{}.mp3", stem);
    u.set_path(&new_path);
    Some(u.to_string())
}

/// Whether a URL's path ends in an AAC-family extension
pub fn is_aac_path(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| {
            let p = u.path().to_ascii_lowercase();
            p.ends_with(".aac") || p.ends_with(".aacp")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_with_and_without_port() {
        assert_eq!(
            origin("http://radio.example/fip-midfi.mp3").as_deref(),
            Some("http://radio.example")
        );
        assert_eq!(
            origin("https://radio.example:8443/live").as_deref(),
            Some("https://radio.example:8443")
        );
        assert_eq!(origin("not a url"), None);
    }

    #[test]
    fn mount_is_none_for_root() {
        assert_eq!(
            mount("http://radio.example/live.mp3").as_deref(),
            Some("/live.mp3")
        );
        assert_eq!(mount("http://radio.example/"), None);
        assert_eq!(mount("http://radio.example"), None);
    }

    #[test]
    fn force_http_rewrites_scheme() {
        assert_eq!(
            force_http("https://host.example/path?x=1"),
            "http://host.example/path?x=1"
        );
        // Already http: unchanged
        assert_eq!(
            force_http("http://host.example/path"),
            "http://host.example/path"
        );
        // Garbage passes through
        assert_eq!(force_http("::::"), "::::");
    }

    #[test]
    fn mp3_variant_swaps_aac_extensions() {
        assert_eq!(
            mp3_variant("https://host.example/fip-hifi.aac?id=rf").as_deref(),
            Some("https://host.example/fip-hifi.mp3?id=rf")
        );
        assert_eq!(
            mp3_variant("http://host.example/stream.AACP").as_deref(),
            Some("http://host.example/stream.mp3")
        );
        assert_eq!(mp3_variant("http://host.example/stream.mp3"), None);
        assert_eq!(mp3_variant("http://host.example/stream"), None);
    }

    #[test]
    fn aac_detection() {
        assert!(is_aac_path("http://h.example/a.aac"));
        assert!(is_aac_path("http://h.example/a.AacP?q=1"));
        assert!(!is_aac_path("http://h.example/a.mp3"));
    }
}
