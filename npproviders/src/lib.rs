//! Provider-specific now-playing fetchers.
//!
//! Each fetcher knows one hosting platform's convention for exposing what is
//! currently on air: the Icecast status document, the AzuraCast/Radiojar
//! now-playing JSON shapes, the Shoutcast v2 stats endpoint, and the Radio
//! France livemeta pull API. They all share the same contract: take an
//! origin (plus mount where relevant), return `Ok(Some(ProviderHit))` on a
//! usable title, `Ok(None)` when the provider answered but had nothing
//! title-shaped, and `Err` on transport or parse failures. The orchestrator
//! treats `Ok(None)` and `Err` the same way (move on to the next stage), so
//! fetchers never need to mask their own errors.
//!
//! Title extraction is split out as pure functions over `serde_json::Value`
//! so each platform's field conventions can be tested without a server.

pub mod icecast;
pub mod nowplaying;
pub mod radiofrance;

use npcore::{Error, Result};
use serde_json::Value;
use std::time::Duration;

pub use icecast::fetch_icecast_status;
pub use nowplaying::{
    fetch_azuracast, fetch_generic_nowplaying, fetch_radiojar, fetch_shoutcast, is_likely_azuracast,
    is_likely_radiojar, is_likely_shoutcast,
};
pub use radiofrance::{fetch_livemeta, pull_id_for};

/// Per-request timeout for provider API calls.
///
/// Providers are fallbacks; a slow one must not eat the whole resolution
/// budget.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(8);

/// A title recovered from a provider, with optional diagnostic fields
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderHit {
    pub title: String,
    pub details: Option<Value>,
}

impl ProviderHit {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Fetch a JSON document from a provider endpoint under [`PROVIDER_TIMEOUT`]
pub(crate) async fn fetch_json(client: &reqwest::Client, url: &str) -> Result<Value> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .timeout(PROVIDER_TIMEOUT)
        .send()
        .await
        .map_err(|e| Error::Connect(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::ProviderHttp(status.as_u16()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| Error::Connect(e.to_string()))?;
    parse_json_body(&body)
}

/// Parse a provider body, rejecting anything that is not a JSON document.
///
/// Some providers answer captive-portal HTML or XML with a 200 status; the
/// leading-character check throws those out before the parser sees them.
pub(crate) fn parse_json_body(body: &str) -> Result<Value> {
    let trimmed = body.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return Err(Error::ProviderParse("body is not a JSON document".into()));
    }
    serde_json::from_str(trimmed).map_err(|e| Error::ProviderParse(e.to_string()))
}

/// A trimmed, non-empty string rendering of a scalar JSON value.
///
/// Numbers are accepted because some status documents put track numbers or
/// years where a string belongs; objects and arrays never count as text.
pub(crate) fn text_of(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First candidate that renders as non-empty text
pub(crate) fn first_text<'a, I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a Value>>,
{
    candidates.into_iter().flatten().find_map(text_of)
}
