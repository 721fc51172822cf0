//! "Now playing" JSON conventions: AzuraCast, Radiojar, Shoutcast v2, and
//! the bare `/nowplaying` path some other servers expose.
//!
//! These endpoints are only worth querying when the hostname looks like the
//! platform in question, so each fetcher comes with a `is_likely_*` gate the
//! orchestrator consults first. The generic `/nowplaying` catch-all has no
//! gate and runs last.

use crate::{fetch_json, first_text, ProviderHit};
use npcore::Result;
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Title from the AzuraCast/Radiojar now-playing shape.
///
/// `now_playing.song.text` is the canonical field; `now_playing.song.title`,
/// a top-level `song`, and a top-level `title` cover older versions and
/// lookalike servers.
pub fn extract_nowplaying_title(doc: &Value) -> Option<String> {
    let song = doc.get("now_playing").and_then(|np| np.get("song"));
    first_text([
        song.and_then(|s| s.get("text")),
        song.and_then(|s| s.get("title")),
        doc.get("song"),
        doc.get("title"),
    ])
}

/// Title from the Shoutcast v2 `/stats?json=1` shape
pub fn extract_shoutcast_title(doc: &Value) -> Option<String> {
    first_text([
        doc.get("songtitle"),
        doc.get("current_song"),
        doc.get("song"),
        doc.get("title"),
    ])
}

fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut host = parsed.host_str()?.to_ascii_lowercase();
    if let Some(port) = parsed.port() {
        host = format!("{}:{}", host, port);
    }
    Some(host)
}

/// Whether the hostname looks like an AzuraCast deployment
pub fn is_likely_azuracast(url: &str) -> bool {
    host_of(url).is_some_and(|h| h.contains("azura"))
}

/// Whether the hostname looks like Radiojar or its Revma infrastructure
pub fn is_likely_radiojar(url: &str) -> bool {
    host_of(url).is_some_and(|h| h.contains("revma") || h.contains("radiojar"))
}

/// Whether the hostname looks like a Shoutcast server
pub fn is_likely_shoutcast(url: &str) -> bool {
    host_of(url).is_some_and(|h| {
        h.contains("shout") || h.starts_with("sc.") || h.starts_with("streaming.")
    })
}

/// AzuraCast: `/api/nowplaying`, falling back to `/nowplaying`
pub async fn fetch_azuracast(client: &reqwest::Client, origin: &str) -> Result<Option<ProviderHit>> {
    for path in ["/api/nowplaying", "/nowplaying"] {
        match fetch_json(client, &format!("{}{}", origin, path)).await {
            Ok(doc) => {
                if let Some(title) = extract_nowplaying_title(&doc) {
                    return Ok(Some(ProviderHit::new(title)));
                }
            }
            Err(e) => debug!(origin, path, error = %e, "azuracast endpoint failed"),
        }
    }
    Ok(None)
}

/// Radiojar/Revma: `/nowplaying`
pub async fn fetch_radiojar(client: &reqwest::Client, origin: &str) -> Result<Option<ProviderHit>> {
    let doc = fetch_json(client, &format!("{}/nowplaying", origin)).await?;
    Ok(extract_nowplaying_title(&doc).map(ProviderHit::new))
}

/// Shoutcast v2: `/stats?json=1`
pub async fn fetch_shoutcast(client: &reqwest::Client, origin: &str) -> Result<Option<ProviderHit>> {
    let doc = fetch_json(client, &format!("{}/stats?json=1", origin)).await?;
    Ok(extract_shoutcast_title(&doc).map(ProviderHit::new))
}

/// Last-resort `/nowplaying` probe, tried against any origin
pub async fn fetch_generic_nowplaying(
    client: &reqwest::Client,
    origin: &str,
) -> Result<Option<ProviderHit>> {
    let doc = fetch_json(client, &format!("{}/nowplaying", origin)).await?;
    Ok(extract_nowplaying_title(&doc).map(ProviderHit::new))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nowplaying_shape_priority() {
        let doc = json!({
            "now_playing": { "song": { "text": "Artist - Song", "title": "Song" } },
            "title": "Station",
        });
        assert_eq!(
            extract_nowplaying_title(&doc),
            Some("Artist - Song".to_string())
        );

        let doc = json!({ "now_playing": { "song": { "title": "Song Only" } } });
        assert_eq!(extract_nowplaying_title(&doc), Some("Song Only".to_string()));

        let doc = json!({ "song": "Flat Song" });
        assert_eq!(extract_nowplaying_title(&doc), Some("Flat Song".to_string()));

        assert_eq!(extract_nowplaying_title(&json!({})), None);
    }

    #[test]
    fn shoutcast_shape_priority() {
        let doc = json!({ "songtitle": "Live Track", "title": "Station" });
        assert_eq!(
            extract_shoutcast_title(&doc),
            Some("Live Track".to_string())
        );

        let doc = json!({ "current_song": "Current" });
        assert_eq!(extract_shoutcast_title(&doc), Some("Current".to_string()));

        assert_eq!(extract_shoutcast_title(&json!({"listeners": 12})), None);
    }

    #[test]
    fn host_gates() {
        assert!(is_likely_azuracast("http://azuracast.radio.example/listen"));
        assert!(!is_likely_azuracast("http://icecast.radio.example/live"));

        assert!(is_likely_radiojar("https://stream.revma.ihrhls.com/zc1234"));
        assert!(is_likely_radiojar("http://stream.radiojar.com/abc"));

        assert!(is_likely_shoutcast("http://sc.example.com:8000/;"));
        assert!(is_likely_shoutcast("http://streaming.example.net/live"));
        assert!(is_likely_shoutcast("http://myshoutcast.example/x"));
        assert!(!is_likely_shoutcast("http://radio.example/live.mp3"));

        // Unparsable URLs never match a gate
        assert!(!is_likely_azuracast("not a url"));
    }

    #[tokio::test]
    async fn azuracast_falls_back_to_second_path() {
        use axum::{routing::get, Router};

        // /api/nowplaying missing, /nowplaying carries the goods
        let app = Router::new().route(
            "/nowplaying",
            get(|| async {
                axum::Json(json!({ "now_playing": { "song": { "text": "Hit" } } }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let origin = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let client = reqwest::Client::new();
        let hit = fetch_azuracast(&client, &origin).await.unwrap().unwrap();
        assert_eq!(hit.title, "Hit");
    }
}
