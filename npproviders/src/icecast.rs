//! Icecast `/status-json.xsl` status document

use crate::{fetch_json, first_text, text_of, ProviderHit};
use npcore::Result;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

/// Query an Icecast origin for the title of the given mount.
///
/// The status document lists every source the server carries; `mount`
/// (the stream's path, e.g. `/radio.mp3`) picks the right one. Without a
/// mount, or when no source matches it, the first source wins.
pub async fn fetch_icecast_status(
    client: &reqwest::Client,
    origin: &str,
    mount: Option<&str>,
) -> Result<Option<ProviderHit>> {
    let mut endpoint = Url::parse(&format!("{}/status-json.xsl", origin))?;
    if let Some(m) = mount {
        endpoint.query_pairs_mut().append_pair("mount", m);
    }

    let doc = fetch_json(client, endpoint.as_str()).await?;
    let hit = extract_icecast_title(&doc, mount);
    debug!(origin, ?mount, found = hit.is_some(), "icecast status");
    Ok(hit)
}

/// Pick a title out of a status document, preferring the requested mount.
///
/// `icestats.source` is an object when the server carries one source and an
/// array when it carries several; both shapes are accepted. A source matches
/// the mount when its `listenurl` contains the mount path, or its
/// `server_name` contains it case-insensitively.
pub fn extract_icecast_title(doc: &Value, mount: Option<&str>) -> Option<ProviderHit> {
    let source = doc.get("icestats")?.get("source")?;
    let sources: Vec<&Value> = match source {
        Value::Array(items) => items.iter().filter(|v| v.is_object()).collect(),
        v if v.is_object() => vec![v],
        _ => return None,
    };
    let first = *sources.first()?;

    let picked = match mount {
        Some(m) => {
            let needle = m.to_ascii_lowercase();
            sources
                .iter()
                .copied()
                .find(|s| {
                    let listenurl = s.get("listenurl").and_then(Value::as_str).unwrap_or("");
                    let server_name = s.get("server_name").and_then(Value::as_str).unwrap_or("");
                    listenurl.contains(m) || server_name.to_ascii_lowercase().contains(&needle)
                })
                .unwrap_or(first)
        }
        None => first,
    };

    let artist = first_text([picked.get("artist"), picked.get("song_artist")]);
    let song = first_text([
        picked.get("song"),
        picked.get("song_title"),
        picked.get("title"),
    ]);

    let title = match (artist, song) {
        (Some(a), Some(s)) => Some(format!("{} - {}", a, s)),
        (_, song) => first_text([
            picked.get("title"),
            picked.get("server_name"),
            picked.get("stream_title"),
        ])
        .or(song),
    }?;

    let details = json!({
        "mount": mount,
        "listenurl": picked.get("listenurl").and_then(|v| text_of(v)),
    });
    Some(ProviderHit::new(title).with_details(details))
}
