//! Data model for metadata resolution requests and results
//!
//! The shapes here mirror the HTTP wire contract: `MetadataResult`
//! serializes directly as the one-shot endpoint's response body, with the
//! resolved label carried in a `StreamTitle` field as ICY convention has it.

use crate::urlutil;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lower bound for a resolution time budget (milliseconds)
pub const MIN_BUDGET_MS: u64 = 5_000;

/// Upper bound for a resolution time budget (milliseconds)
pub const MAX_BUDGET_MS: u64 = 300_000;

/// Budget used when the caller does not supply one (milliseconds)
pub const DEFAULT_BUDGET_MS: u64 = 90_000;

/// Clamp a caller-supplied budget into `[MIN_BUDGET_MS, MAX_BUDGET_MS]`
pub fn clamp_budget_ms(ms: u64) -> u64 {
    ms.clamp(MIN_BUDGET_MS, MAX_BUDGET_MS)
}

/// A single resolution request: one stream URL plus its options.
///
/// Immutable once constructed. The protocol downgrade and the budget clamp
/// are applied here, before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    /// Stream URL, already downgraded to `http://` when requested
    pub url: String,
    /// Whether the caller asked for the https→http downgrade
    pub force_http: bool,
    /// Total time budget for the resolution, clamped
    pub budget: Duration,
}

impl StreamTarget {
    /// Build a target from raw request parameters.
    ///
    /// `budget_ms` of `None` means [`DEFAULT_BUDGET_MS`]; any supplied value
    /// is clamped.
    pub fn new(url: impl Into<String>, force_http: bool, budget_ms: Option<u64>) -> Self {
        let url = url.into();
        let url = if force_http {
            urlutil::force_http(&url)
        } else {
            url
        };
        let ms = clamp_budget_ms(budget_ms.unwrap_or(DEFAULT_BUDGET_MS));
        Self {
            url,
            force_http,
            budget: Duration::from_millis(ms),
        }
    }
}

/// Which stage of the fallback chain produced (or failed to produce) a title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    /// Direct in-stream ICY metadata frame
    #[serde(rename = "icy")]
    Icy,
    /// Radio France livemeta pull API
    #[serde(rename = "rf-livemeta")]
    RadioFrance,
    /// Icecast `/status-json.xsl` status document
    #[serde(rename = "icecast")]
    Icecast,
    /// AzuraCast now-playing API
    #[serde(rename = "azuracast")]
    Azuracast,
    /// Radiojar/Revma now-playing endpoint
    #[serde(rename = "radiojar")]
    Radiojar,
    /// Shoutcast v2 stats endpoint
    #[serde(rename = "shoutcast")]
    Shoutcast,
    /// Conventional `/nowplaying` path, tried last regardless of host
    #[serde(rename = "generic-nowplaying")]
    GenericNowPlaying,
    /// No stage produced a title
    #[serde(rename = "none")]
    None,
}

/// Why a resolution (or a single stage) failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailReason {
    /// Transport/TLS failure reaching the stream or a provider
    ConnectError,
    /// The stream does not declare an ICY metadata interval
    NoIcyMeta,
    /// Budget exhausted waiting for a frame or response
    Timeout,
    /// A provider answered with a non-success HTTP status
    ProviderHttpError,
    /// A provider body was not the expected shape
    ProviderParseError,
    /// Parsed successfully but nothing title-shaped was found
    NoUsableFields,
    /// Every fallback stage was exhausted
    NoTitleFromFallbacks,
}

/// Normalized outcome of a resolution run.
///
/// `reason` is only set when `ok` is false. Optional fields are omitted from
/// the serialized form entirely rather than sent as `null`, matching what
/// the HTTP clients expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataResult {
    pub ok: bool,
    pub source: Source,
    #[serde(rename = "StreamTitle", skip_serializing_if = "Option::is_none")]
    pub stream_title: Option<String>,
    #[serde(rename = "fallbackUsed", skip_serializing_if = "Option::is_none")]
    pub fallback_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailReason>,
    #[serde(rename = "redirectedTo", skip_serializing_if = "Option::is_none")]
    pub redirected_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl MetadataResult {
    /// A successful resolution from the given stage
    pub fn hit(source: Source, title: impl Into<String>) -> Self {
        Self {
            ok: true,
            source,
            stream_title: Some(title.into()),
            fallback_used: None,
            details: None,
            reason: None,
            redirected_to: None,
            note: None,
        }
    }

    /// A failed resolution with its structured reason
    pub fn miss(source: Source, reason: FailReason) -> Self {
        Self {
            ok: false,
            source,
            stream_title: None,
            fallback_used: None,
            details: None,
            reason: Some(reason),
            redirected_to: None,
            note: None,
        }
    }

    /// Record which fallback stage produced this result
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback_used = Some(fallback.into());
        self
    }

    /// Attach raw diagnostic details (provider fields, frame contents)
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Record the redirect-resolved URL the stages actually targeted
    pub fn with_redirect(mut self, url: impl Into<String>) -> Self {
        self.redirected_to = Some(url.into());
        self
    }

    /// Attach a free-form note (e.g. the mp3-variant marker)
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
