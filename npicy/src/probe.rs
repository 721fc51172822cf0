//! One-shot metadata probe
//!
//! Opens the stream, waits for the first usable title under a budget, and
//! tears the connection down whatever the outcome. Live consumers keep the
//! [`crate::IcyConnection`] instead and call `next_frame` in a loop.

use npcore::Error;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::client::{IcyClient, IcyConnection};

/// Successful probe outcome
#[derive(Debug, Clone)]
pub struct IcyProbe {
    /// Non-empty title from the first frame that carried one
    pub title: String,
    /// All fields of that frame, for diagnostics
    pub fields: BTreeMap<String, String>,
    /// Redirect-resolved URL of the stream
    pub final_url: String,
}

/// Failed probe outcome.
///
/// Carries the redirect-resolved URL whenever the connection itself
/// succeeded, so fallback fetchers can still target the real host.
#[derive(Debug)]
pub struct ProbeFailure {
    pub final_url: Option<String>,
    pub error: Error,
}

/// Probe a stream for its first in-stream title.
///
/// Fails fast with [`Error::NoIcyMeta`] when the server declares no
/// metadata interval (cheap, not a timeout), and with [`Error::Timeout`]
/// when no usable frame arrives within `budget`. The connection is dropped
/// before returning in every case.
pub async fn probe_once(
    client: &IcyClient,
    url: &str,
    budget: Duration,
) -> Result<IcyProbe, ProbeFailure> {
    // The budget covers the whole probe, connect phase included: a host
    // that accepts the socket but never sends response headers must not
    // stall past it.
    let started = std::time::Instant::now();
    let conn = match timeout(budget, client.connect(url)).await {
        Ok(Ok(c)) => c,
        Ok(Err(error)) => {
            return Err(ProbeFailure {
                final_url: None,
                error,
            })
        }
        Err(_) => {
            return Err(ProbeFailure {
                final_url: None,
                error: Error::Timeout,
            })
        }
    };
    let final_url = conn.final_url.clone();

    if !conn.has_metadata() {
        debug!(url = %final_url, "no icy-metaint header, probe over");
        return Err(ProbeFailure {
            final_url: Some(final_url),
            error: Error::NoIcyMeta,
        });
    }

    let remaining = budget.saturating_sub(started.elapsed());
    match timeout(remaining, first_title(conn)).await {
        Ok(Ok((title, fields))) => Ok(IcyProbe {
            title,
            fields,
            final_url,
        }),
        Ok(Err(error)) => Err(ProbeFailure {
            final_url: Some(final_url),
            error,
        }),
        Err(_) => Err(ProbeFailure {
            final_url: Some(final_url),
            error: Error::Timeout,
        }),
    }
}

/// Drain frames until one carries a non-empty title
async fn first_title(
    mut conn: IcyConnection,
) -> npcore::Result<(String, BTreeMap<String, String>)> {
    loop {
        match conn.next_frame().await? {
            Some(frame) => {
                if let Some(title) = frame.title() {
                    return Ok((title.to_string(), frame.fields));
                }
                // Frame without a title (e.g. StreamUrl only): keep waiting
            }
            None => return Err(Error::Stream("stream ended before metadata".into())),
        }
    }
}
