//! Stream catalog persistence.
//!
//! A flat JSON file of saved streams, replaced wholesale by `PUT
//! /api/streams`. Writes go through a sibling temp file and a rename so a
//! crash mid-write never leaves a truncated catalog.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One saved stream.
///
/// Only `name` and `url` are meaningful to the server; whatever else the
/// client stores (categories, favorites, UI state) rides along in `extra`
/// and round-trips untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEntry {
    pub name: String,
    pub url: String,
    #[serde(
        rename = "forceHttp",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub force_http: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Read the catalog; a missing file is an empty catalog
pub async fn read_streams(path: &Path) -> anyhow::Result<Vec<StreamEntry>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(serde_json::from_str(&text)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Replace the catalog atomically
pub async fn write_streams(path: &Path, streams: &[StreamEntry]) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(streams)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &text).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
