//! HTTP side of the ICY client: connecting, redirects, header parsing

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use npcore::{Error, Result};
use std::time::Duration;
use tracing::debug;

use crate::wire::{parse_icy_frame, IcyFrame, MetaExtractor};

/// User agent presented to stream hosts.
///
/// Some Icecast/Shoutcast configurations only enable the metadata side
/// channel for clients they recognize as players.
pub const USER_AGENT: &str = "VLC/3.0 libVLC";

/// Connect timeout for reaching a stream host
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// ICY-relevant response headers
#[derive(Debug, Clone)]
pub struct IcyHeaders {
    /// Audio bytes between metadata frames; `None` means no side channel
    pub metaint: Option<usize>,
    pub station_name: Option<String>,
    pub content_type: Option<String>,
    pub bitrate: Option<u32>,
}

/// Client for opening audio streams with the metadata side channel enabled
#[derive(Debug, Clone)]
pub struct IcyClient {
    client: reqwest::Client,
}

impl Default for IcyClient {
    fn default() -> Self {
        Self::new()
    }
}

impl IcyClient {
    /// Build a client with the stock player-like settings
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .expect("default reqwest client");
        Self { client }
    }

    /// Reuse an existing `reqwest::Client` (shared connection pools).
    ///
    /// The caller's client must follow redirects and must not set a global
    /// request timeout, since live connections stay open indefinitely.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Open the stream and evaluate its response headers.
    ///
    /// Redirects are followed before the headers are read; the connection's
    /// [`IcyConnection::final_url`] is the post-redirect URL, which callers
    /// thread into fallback fetchers so they target the real host.
    pub async fn connect(&self, url: &str) -> Result<IcyConnection> {
        let response = self
            .client
            .get(url)
            .header("Icy-MetaData", "1")
            .header("Accept", "*/*")
            .send()
            .await
            .map_err(|e| Error::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Connect(format!("HTTP {}", status)));
        }

        let final_url = response.url().to_string();
        let headers = parse_headers(&response);
        debug!(
            url = %final_url,
            metaint = ?headers.metaint,
            station = ?headers.station_name,
            "stream connected"
        );

        let extractor = headers.metaint.map(MetaExtractor::new);
        let stream = response
            .bytes_stream()
            .map(|r| r.map(|b| b.to_vec()))
            .boxed();

        Ok(IcyConnection {
            final_url,
            headers,
            stream,
            extractor,
            pending: Vec::new(),
        })
    }
}

/// An open stream connection with its metadata side channel.
///
/// Dropping the connection closes the underlying socket; there is no
/// lingering state to clean up.
pub struct IcyConnection {
    /// Redirect-resolved URL actually serving the bytes
    pub final_url: String,
    pub headers: IcyHeaders,
    stream: BoxStream<'static, std::result::Result<Vec<u8>, reqwest::Error>>,
    extractor: Option<MetaExtractor>,
    pending: Vec<IcyFrame>,
}

impl IcyConnection {
    /// Whether the server declared the metadata side channel
    pub fn has_metadata(&self) -> bool {
        self.headers.metaint.is_some()
    }

    /// Read until the next metadata frame.
    ///
    /// `Ok(None)` means the remote closed the stream cleanly. Fails with
    /// [`Error::NoIcyMeta`] immediately when the server never declared an
    /// interval, and [`Error::Stream`] on a transport error mid-read.
    pub async fn next_frame(&mut self) -> Result<Option<IcyFrame>> {
        if self.extractor.is_none() {
            return Err(Error::NoIcyMeta);
        }

        loop {
            if !self.pending.is_empty() {
                return Ok(Some(self.pending.remove(0)));
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => {
                    let extractor = self.extractor.as_mut().expect("checked above");
                    for block in extractor.push(&chunk) {
                        self.pending.push(IcyFrame {
                            fields: parse_icy_frame(&block),
                        });
                    }
                }
                Some(Err(e)) => return Err(Error::Stream(e.to_string())),
                None => return Ok(None),
            }
        }
    }
}

fn parse_headers(response: &reqwest::Response) -> IcyHeaders {
    let headers = response.headers();
    let get_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };

    IcyHeaders {
        metaint: headers
            .get("icy-metaint")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0),
        station_name: get_str("icy-name"),
        content_type: get_str("content-type"),
        bitrate: headers
            .get("icy-br")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok()),
    }
}
