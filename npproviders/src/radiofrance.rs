//! Radio France livemeta pull API.
//!
//! Radio France stations do not put titles in the stream; the `livemeta/pull`
//! endpoint serves the current program grid instead, keyed by a numeric feed
//! id per station. The id is guessed from the stream URL against a fixed
//! table of channel slugs, and the response is parsed tolerantly because the
//! document shape has changed several times over the years.

use crate::{fetch_json, first_text, text_of, ProviderHit};
use chrono::Utc;
use npcore::Result;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

/// Known channel slugs and their livemeta feed ids
pub const PULL_IDS: &[(&str, u32)] = &[
    // Main stations
    ("franceinter", 1),
    ("franceinfo", 2),
    ("franceculture", 3),
    ("francemusique", 4),
    ("mouv", 6),
    ("fip", 7),
    // FIP webradios
    ("fiprock", 64),
    ("fipjazz", 65),
    ("fipgroove", 66),
    ("fipmonde", 69),
    ("fipnouveau", 70),
    ("fipreggae", 71),
    ("fipelectro", 74),
    ("fipmetal", 77),
    // Mouv'
    ("mouvxtra", 75),
    // France Musique webradios
    ("fmclassiqueeasy", 401),
    ("fmclassiqueplus", 402),
    ("fmconcertsradiofrance", 403),
    ("fmocoramonde", 404),
    ("fmlajazz", 405),
    ("fmlacontemporaine", 406),
    ("fmevenementielle", 407),
];

/// API bases, tried in order until one answers with valid JSON
pub const LIVEMETA_BASES: &[&str] = &["https://api.radiofrance.fr", "https://www.francemusique.fr"];

fn id_of(slug: &str) -> Option<u32> {
    PULL_IDS.iter().find(|(k, _)| *k == slug).map(|&(_, id)| id)
}

/// Guess the livemeta feed id for a stream URL.
///
/// `None` short-circuits the whole fetcher: the URL does not look like a
/// Radio France stream.
pub fn pull_id_for(stream_url: &str) -> Option<u32> {
    let parsed = Url::parse(stream_url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let path = parsed.path().to_ascii_lowercase();

    if path.starts_with("/fip") || host.contains("fipradio.fr") {
        // Webradio slugs first; the bare "fip" slug is a prefix of all of
        // them, so checking it early would shadow every webradio.
        for (slug, id) in PULL_IDS {
            if slug.len() > 3
                && slug.starts_with("fip")
                && (path.contains(slug) || host.contains(slug))
            {
                return Some(*id);
            }
        }
        return id_of("fip");
    }
    if path.starts_with("/franceinter") || host.contains("franceinter.fr") {
        return id_of("franceinter");
    }
    if path.starts_with("/franceinfo") || host.contains("franceinfo.fr") {
        return id_of("franceinfo");
    }
    if path.starts_with("/franceculture") || host.contains("franceculture.fr") {
        return id_of("franceculture");
    }

    if path.contains("/francemusique") || host.contains("francemusique.fr") {
        const WEBRADIOS: &[(&str, &str)] = &[
            ("classiqueeasy", "fmclassiqueeasy"),
            ("classiqueplus", "fmclassiqueplus"),
            ("concertsradiofrance", "fmconcertsradiofrance"),
            ("ocora", "fmocoramonde"),
            ("lajazz", "fmlajazz"),
            ("lacontemporaine", "fmlacontemporaine"),
            ("evenementielle", "fmevenementielle"),
        ];
        for (fragment, slug) in WEBRADIOS {
            if path.contains(fragment) {
                return id_of(slug);
            }
        }
        return id_of("francemusique");
    }
    if host.contains("mouv.fr") || path.starts_with("/mouv") {
        return if path.contains("xtra") {
            id_of("mouvxtra")
        } else {
            id_of("mouv")
        };
    }

    if host.contains("radiofrance.fr") {
        // First path segment up to a non-letter, e.g. "/franceculture-midfi.mp3"
        let segment: String = path
            .strip_prefix('/')
            .unwrap_or(&path)
            .chars()
            .take_while(|c| c.is_ascii_lowercase())
            .collect();
        if let Some(id) = id_of(&segment) {
            return Some(id);
        }
        if path.starts_with("/fip-") || path.starts_with("/fip_") {
            return id_of("fip");
        }
    }
    None
}

/// Query the livemeta API for the stream's current title.
pub async fn fetch_livemeta(
    client: &reqwest::Client,
    stream_url: &str,
) -> Result<Option<ProviderHit>> {
    fetch_livemeta_from(client, LIVEMETA_BASES, stream_url).await
}

/// Same as [`fetch_livemeta`], with the API bases injectable for tests
pub async fn fetch_livemeta_from(
    client: &reqwest::Client,
    bases: &[&str],
    stream_url: &str,
) -> Result<Option<ProviderHit>> {
    let Some(pull_id) = pull_id_for(stream_url) else {
        return Ok(None);
    };
    let now = Utc::now().timestamp();

    for base in bases {
        let endpoint = format!("{}/livemeta/pull/{}", base, pull_id);
        let doc = match fetch_json(client, &endpoint).await {
            Ok(doc) => doc,
            Err(e) => {
                debug!(endpoint, error = %e, "livemeta base failed");
                continue;
            }
        };
        if let Some(title) = title_from_document(&doc, now) {
            return Ok(Some(
                ProviderHit::new(title).with_details(json!({ "pullId": pull_id })),
            ));
        }
    }
    Ok(None)
}

/// Extract a title from a livemeta document, trying each known shape.
///
/// `now` is the current unix timestamp, passed in so the schedule-window
/// logic can be tested against fixed documents.
pub fn title_from_document(doc: &Value, now: i64) -> Option<String> {
    title_from_steps(doc, now)
        .or_else(|| title_from_now_object(doc))
        .or_else(|| deep_scan(doc, 0))
}

fn epoch(v: Option<&Value>) -> Option<i64> {
    v.and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
}

/// Look a step up by item key; `steps` has been seen both as an object keyed
/// by step id and as a plain array.
fn step_for<'a>(steps: Option<&'a Value>, key: &Value) -> Option<&'a Value> {
    let steps = steps?;
    match key {
        Value::String(id) => steps.get(id.as_str()),
        Value::Number(n) => {
            let idx = n.as_u64()?;
            match steps {
                Value::Array(items) => items.get(idx as usize),
                Value::Object(_) => steps.get(idx.to_string()),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Schema A: a `steps` map plus `levels`, where the last level holds the
/// item list and a position pointer.
///
/// The position pointer lags or leads around program boundaries, so when the
/// pointed-to step's `[start, end)` window misses `now`, the index shifts by
/// one in the needed direction before giving up on the window.
fn title_from_steps(doc: &Value, now: i64) -> Option<String> {
    let levels = doc.get("levels")?.as_array()?;
    let level = levels.last()?;
    let items = level.get("items")?.as_array()?;
    if items.is_empty() {
        return None;
    }

    let mut idx = level
        .get("position")
        .and_then(Value::as_i64)
        .map(|p| p.clamp(0, items.len() as i64 - 1) as usize)
        .unwrap_or(items.len() - 1);

    let steps = doc.get("steps");
    let mut step = step_for(steps, &items[idx]);
    if let Some(s) = step {
        if epoch(s.get("start")).is_some_and(|start| now < start) && idx > 0 {
            idx -= 1;
            step = step_for(steps, &items[idx]);
        }
    }
    if let Some(s) = step {
        if epoch(s.get("end")).is_some_and(|end| now >= end) && idx < items.len() - 1 {
            idx += 1;
            step = step_for(steps, &items[idx]);
        }
    }
    let step = step?;

    let authors = first_text([step.get("authors")]);
    let title = first_text([step.get("title")]);
    let composed = match (&authors, &title) {
        (Some(a), Some(t)) => Some(format!("{} - {}", a, t)),
        _ => None,
    };
    step.get("song")
        .and_then(|s| s.get("text"))
        .and_then(text_of)
        .or(composed)
        .or(title)
        .or_else(|| first_text([step.get("expressionDescription"), step.get("titleConcept")]))
}

/// Schema B: a flat `now`/`current`/`now_playing` object
fn title_from_now_object(doc: &Value) -> Option<String> {
    let now = doc
        .get("now")
        .or_else(|| doc.get("current"))
        .or_else(|| doc.get("now_playing"))?;

    let artist = first_text([now.get("artist"), now.get("authors"), now.get("interpretes")]);
    let title = first_text([now.get("title"), now.get("titre"), now.get("subtitle")]);
    let composed = match (&artist, &title) {
        (Some(a), Some(t)) => Some(format!("{} - {}", a, t)),
        _ => None,
    };
    first_text([now.get("text")]).or(composed).or(title).or(artist)
}

/// Schema C, last resort: recursive scan over the whole document for the
/// known artist/title/text field variants. Depth-capped so a deeply nested
/// document costs bounded work; JSON has no cycles, so no visited set is
/// needed.
pub fn deep_scan(node: &Value, depth: u8) -> Option<String> {
    if depth > 5 {
        return None;
    }
    if let Value::Array(items) = node {
        return items.iter().find_map(|it| deep_scan(it, depth + 1));
    }
    if !node.is_object() {
        return None;
    }

    let artist = first_text([
        node.get("artist"),
        node.get("authors"),
        node.get("auteurs"),
        node.get("interpretes"),
        node.get("author"),
        node.get("performer"),
    ]);
    let title = first_text([
        node.get("title"),
        node.get("titre"),
        node.get("subtitle"),
        node.get("name"),
        node.get("label"),
    ]);
    let text = first_text([
        node.get("text"),
        node.get("texte"),
        node.get("song").and_then(|s| s.get("text")),
        node.get("now").and_then(|s| s.get("text")),
        node.get("current").and_then(|s| s.get("text")),
    ]);

    if let Some(text) = text {
        return Some(text);
    }
    if let (Some(a), Some(t)) = (&artist, &title) {
        return Some(format!("{} - {}", a, t));
    }
    if let Some(t) = title {
        return Some(t);
    }

    let song = node.get("song");
    let track = node.get("track");
    let np_song = node.get("now_playing").and_then(|np| np.get("song"));
    let common = first_text([
        song.and_then(|s| s.get("title")),
        song.and_then(|s| s.get("name")),
        track.and_then(|t| t.get("title")),
        track.and_then(|t| t.get("name")),
        np_song.and_then(|s| s.get("text")),
        np_song.and_then(|s| s.get("title")),
    ]);
    if let Some(common) = common {
        return Some(common);
    }

    node.as_object()
        .into_iter()
        .flat_map(|map| map.values())
        .filter(|v| v.is_object() || v.is_array())
        .find_map(|v| deep_scan(v, depth + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn webradio_slugs_beat_the_bare_fip_id() {
        assert_eq!(
            pull_id_for("http://icecast.radiofrance.fr/fiprock-midfi.mp3"),
            Some(64)
        );
        assert_eq!(
            pull_id_for("http://icecast.radiofrance.fr/fipjazz-hifi.aac"),
            Some(65)
        );
        assert_eq!(
            pull_id_for("http://icecast.radiofrance.fr/fip-midfi.mp3"),
            Some(7)
        );
        assert_eq!(pull_id_for("http://stream.fipradio.fr/live"), Some(7));
    }

    #[test]
    fn main_station_paths() {
        assert_eq!(
            pull_id_for("http://icecast.radiofrance.fr/franceinter-midfi.mp3"),
            Some(1)
        );
        assert_eq!(
            pull_id_for("http://icecast.radiofrance.fr/franceinfo-midfi.mp3"),
            Some(2)
        );
        assert_eq!(
            pull_id_for("http://icecast.radiofrance.fr/franceculture-midfi.mp3"),
            Some(3)
        );
        assert_eq!(
            pull_id_for("http://direct.franceinter.fr/live/franceinter-midfi.mp3"),
            Some(1)
        );
    }

    #[test]
    fn francemusique_webradios() {
        assert_eq!(
            pull_id_for("http://stream.francemusique.fr/francemusiqueclassiqueeasy-hifi.aac"),
            Some(401)
        );
        assert_eq!(
            pull_id_for("http://stream.francemusique.fr/francemusiqueocoramonde-hifi.aac"),
            Some(404)
        );
        assert_eq!(
            pull_id_for("http://stream.francemusique.fr/live.mp3"),
            Some(4)
        );
    }

    #[test]
    fn mouv_and_xtra() {
        assert_eq!(pull_id_for("http://icecast.radiofrance.fr/mouv-midfi.mp3"), Some(6));
        assert_eq!(
            pull_id_for("http://icecast.radiofrance.fr/mouvxtra-midfi.mp3"),
            Some(75)
        );
    }

    #[test]
    fn unrelated_hosts_yield_no_id() {
        assert_eq!(pull_id_for("http://radio.example/stream.mp3"), None);
        assert_eq!(pull_id_for("not a url"), None);
    }

    fn steps_doc(position: i64) -> Value {
        json!({
            "steps": {
                "a": { "start": 100, "end": 200, "title": "Morning Show" },
                "b": { "start": 200, "end": 300, "authors": "Artist", "title": "Song" },
                "c": { "start": 300, "end": 400, "song": { "text": "Next - Up" } },
            },
            "levels": [
                { "items": ["a", "b", "c"], "position": position }
            ],
        })
    }

    #[test]
    fn step_within_window() {
        // Position points at "b" and now falls inside it
        assert_eq!(
            title_from_document(&steps_doc(1), 250),
            Some("Artist - Song".to_string())
        );
    }

    #[test]
    fn pointer_leads_shift_back() {
        // Pointer says "b" but its window has not started yet
        assert_eq!(
            title_from_document(&steps_doc(1), 150),
            Some("Morning Show".to_string())
        );
    }

    #[test]
    fn pointer_lags_shift_forward() {
        // Pointer says "b" but its window is already over
        assert_eq!(
            title_from_document(&steps_doc(1), 350),
            Some("Next - Up".to_string())
        );
    }

    #[test]
    fn position_is_clamped() {
        assert_eq!(
            title_from_document(&steps_doc(99), 350),
            Some("Next - Up".to_string())
        );
    }

    #[test]
    fn steps_as_array_with_numeric_items() {
        let doc = json!({
            "steps": [ { "start": 0, "end": 9_999_999_999i64, "title": "Only Step" } ],
            "levels": [ { "items": [0], "position": 0 } ],
        });
        assert_eq!(title_from_document(&doc, 500), Some("Only Step".to_string()));
    }

    #[test]
    fn now_object_schema() {
        let doc = json!({ "now": { "artist": "A", "title": "T" } });
        assert_eq!(title_from_document(&doc, 0), Some("A - T".to_string()));

        let doc = json!({ "current": { "text": "Free Text" } });
        assert_eq!(title_from_document(&doc, 0), Some("Free Text".to_string()));

        let doc = json!({ "now_playing": { "titre": "Titre Seul" } });
        assert_eq!(title_from_document(&doc, 0), Some("Titre Seul".to_string()));
    }

    #[test]
    fn deep_scan_finds_nested_fields() {
        let doc = json!({
            "data": { "items": [ { "meta": { "artist": "X", "title": "Y" } } ] }
        });
        assert_eq!(deep_scan(&doc, 0), Some("X - Y".to_string()));
    }

    #[test]
    fn deep_scan_prefers_text_over_composition() {
        let doc = json!({ "text": "Verbatim", "artist": "A", "title": "T" });
        assert_eq!(deep_scan(&doc, 0), Some("Verbatim".to_string()));
    }

    #[test]
    fn deep_scan_respects_depth_cap() {
        fn nest(levels: usize) -> Value {
            let mut v = json!({ "title": "Buried" });
            for _ in 0..levels {
                v = json!({ "wrap": v });
            }
            v
        }
        // Five wrappers keeps the title within reach; six puts it past the cap
        assert_eq!(deep_scan(&nest(5), 0), Some("Buried".to_string()));
        assert_eq!(deep_scan(&nest(6), 0), None);
    }

    #[tokio::test]
    async fn fetches_across_bases() {
        use axum::{routing::get, Router};

        let app = Router::new().route(
            "/livemeta/pull/7",
            get(|| async {
                axum::Json(json!({
                    "steps": { "s": { "start": 0, "end": 9_999_999_999i64,
                                       "song": { "text": "FIP - Live" } } },
                    "levels": [ { "items": ["s"], "position": 0 } ],
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let good = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        // First base is unreachable; the fetcher moves on to the next
        let bases = ["http://127.0.0.1:1", good.as_str()];
        let client = reqwest::Client::new();
        let hit = fetch_livemeta_from(&client, &bases, "http://icecast.radiofrance.fr/fip-midfi.mp3")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.title, "FIP - Live");
        assert_eq!(hit.details, Some(json!({ "pullId": 7 })));
    }

    #[tokio::test]
    async fn non_rf_url_short_circuits() {
        // No network is touched when the id mapping fails
        let client = reqwest::Client::new();
        let bases = ["http://127.0.0.1:1"];
        let hit = fetch_livemeta_from(&client, &bases, "http://radio.example/live.mp3")
            .await
            .unwrap();
        assert!(hit.is_none());
    }
}
