//! Fallback orchestration: one pass over the resolution chain.
//!
//! The order is fixed and terminal on first success:
//! ICY probe → Radio France livemeta → Icecast status → host-gated platform
//! fetchers (AzuraCast, Radiojar, Shoutcast) → MP3-variant ICY retry →
//! generic `/nowplaying`. Every stage after the probe targets the
//! redirect-resolved URL when the probe managed to connect, so fallbacks hit
//! the host that actually serves the bytes.

use npcore::{urlutil, FailReason, MetadataResult, Source, StreamTarget};
use npicy::{probe_once, IcyClient};
use npproviders::{
    fetch_azuracast, fetch_generic_nowplaying, fetch_icecast_status, fetch_radiojar,
    fetch_shoutcast, is_likely_azuracast, is_likely_radiojar, is_likely_shoutcast,
    radiofrance, ProviderHit,
};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// Slice of the budget given to the initial ICY probe
const ICY_SLICE: Duration = Duration::from_secs(15);

/// Slice of the budget given to the MP3-variant retry
const MP3_RETRY_SLICE: Duration = Duration::from_secs(12);

/// Shared resolution engine: one HTTP client pool for the providers, one
/// ICY client for the streams.
#[derive(Debug, Clone)]
pub struct Resolver {
    http: reqwest::Client,
    icy: IcyClient,
    livemeta_bases: Vec<String>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent(npicy::USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .expect("default reqwest client");
        Self::with_http(http)
    }

    /// Build around an existing HTTP client (shared pools)
    pub fn with_http(http: reqwest::Client) -> Self {
        Self {
            icy: IcyClient::with_client(http.clone()),
            http,
            livemeta_bases: radiofrance::LIVEMETA_BASES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Point the livemeta stage at different API bases (tests)
    pub fn with_livemeta_bases(mut self, bases: Vec<String>) -> Self {
        self.livemeta_bases = bases;
        self
    }

    /// The ICY client, for live sessions driving the stream directly
    pub fn icy(&self) -> &IcyClient {
        &self.icy
    }

    /// Resolve a target to a normalized result. Never errors: every failure
    /// mode collapses into an `ok: false` result with a structured reason.
    pub async fn resolve(&self, target: &StreamTarget) -> MetadataResult {
        let icy_budget = ICY_SLICE.min(target.budget);
        let failure = match probe_once(&self.icy, &target.url, icy_budget).await {
            Ok(probe) => {
                info!(url = %target.url, title = %probe.title, "resolved via icy");
                let mut result = MetadataResult::hit(Source::Icy, probe.title)
                    .with_details(json!(probe.fields));
                if probe.final_url != target.url {
                    result = result.with_redirect(probe.final_url);
                }
                return result;
            }
            Err(failure) => failure,
        };
        debug!(url = %target.url, error = %failure.error, "icy probe failed, walking fallbacks");

        let current = failure.final_url.as_deref().unwrap_or(&target.url);
        let redirected = failure
            .final_url
            .clone()
            .filter(|f| f != &target.url);

        let result = match self.fallbacks(current, target.budget, true).await {
            Some(result) => result,
            None => MetadataResult::miss(Source::None, FailReason::NoTitleFromFallbacks)
                .with_fallback("none"),
        };
        match redirected {
            Some(url) if result.redirected_to.is_none() => result.with_redirect(url),
            _ => result,
        }
    }

    /// Walk the fallback chain against `current_url`. `allow_mp3` is false
    /// when this walk was itself reached through the MP3-variant retry.
    async fn fallbacks(
        &self,
        current_url: &str,
        budget: Duration,
        allow_mp3: bool,
    ) -> Option<MetadataResult> {
        let bases: Vec<&str> = self.livemeta_bases.iter().map(String::as_str).collect();
        if let Some(hit) =
            ok_hit(radiofrance::fetch_livemeta_from(&self.http, &bases, current_url).await)
        {
            return Some(finish(Source::RadioFrance, "rf-livemeta", hit));
        }

        let origin = urlutil::origin(current_url)?;
        let mount = urlutil::mount(current_url);

        if let Some(hit) =
            ok_hit(fetch_icecast_status(&self.http, &origin, mount.as_deref()).await)
        {
            return Some(finish(Source::Icecast, "icecast-status", hit));
        }

        if is_likely_azuracast(current_url) {
            if let Some(hit) = ok_hit(fetch_azuracast(&self.http, &origin).await) {
                return Some(finish(Source::Azuracast, "azuracast", hit));
            }
        }
        if is_likely_radiojar(current_url) {
            if let Some(hit) = ok_hit(fetch_radiojar(&self.http, &origin).await) {
                return Some(finish(Source::Radiojar, "radiojar", hit));
            }
        }
        if is_likely_shoutcast(current_url) {
            if let Some(hit) = ok_hit(fetch_shoutcast(&self.http, &origin).await) {
                return Some(finish(Source::Shoutcast, "shoutcast", hit));
            }
        }

        if allow_mp3 {
            if let Some(mp3_url) = urlutil::mp3_variant(current_url) {
                let slice = MP3_RETRY_SLICE.min(budget);
                if let Ok(probe) = probe_once(&self.icy, &mp3_url, slice).await {
                    info!(url = %mp3_url, "resolved via mp3-variant retry");
                    return Some(
                        MetadataResult::hit(Source::Icy, probe.title)
                            .with_details(json!(probe.fields))
                            .with_fallback("try-mp3")
                            .with_note("mp3-variant"),
                    );
                }
            }
        }

        if let Some(hit) = ok_hit(fetch_generic_nowplaying(&self.http, &origin).await) {
            return Some(finish(Source::GenericNowPlaying, "nowplaying", hit));
        }
        None
    }
}

/// Collapse a fetcher outcome: transport/parse errors count as "no title"
fn ok_hit(outcome: npcore::Result<Option<ProviderHit>>) -> Option<ProviderHit> {
    match outcome {
        Ok(hit) => hit,
        Err(e) => {
            debug!(error = %e, "fallback fetcher failed");
            None
        }
    }
}

fn finish(source: Source, fallback: &str, hit: ProviderHit) -> MetadataResult {
    let mut result = MetadataResult::hit(source, hit.title).with_fallback(fallback);
    if let Some(details) = hit.details {
        result = result.with_details(details);
    }
    result
}
