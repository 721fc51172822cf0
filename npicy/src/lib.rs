//! ICY in-stream metadata client
//!
//! Icecast/Shoutcast servers interleave small metadata frames into the audio
//! byte stream when the client sends `Icy-MetaData: 1`: every `icy-metaint`
//! audio bytes, one length byte (×16) followed by `key='value';` pairs
//! padded with NULs, with the current track label under `StreamTitle`.
//!
//! This crate reads that side channel without ever decoding audio:
//!
//! - [`IcyClient::connect`] opens the stream, follows redirects, and reports
//!   the final resolved URL so fallback fetchers can target the real host.
//! - [`probe_once`] waits for the first usable title under a budget and
//!   drops the connection (one-shot use).
//! - [`IcyConnection::next_frame`] keeps reading frames for as long as the
//!   remote keeps sending them (live use).
//!
//! # Example
//!
//! ```no_run
//! use npicy::IcyClient;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let client = IcyClient::new();
//! match npicy::probe_once(&client, "http://radio.example/live.mp3", Duration::from_secs(15)).await {
//!     Ok(probe) => println!("now playing: {}", probe.title),
//!     Err(failure) => println!("no in-stream metadata: {}", failure.error),
//! }
//! # }
//! ```

pub mod client;
pub mod probe;
pub mod wire;

// Re-exports
pub use client::{IcyClient, IcyConnection, IcyHeaders, USER_AGENT};
pub use probe::{probe_once, IcyProbe, ProbeFailure};
pub use wire::{parse_icy_frame, stream_title, IcyFrame, MetaExtractor};
