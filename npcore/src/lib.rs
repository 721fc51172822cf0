//! Core types for the NowPlayd metadata resolver
//!
//! This crate holds everything the resolver crates share: the request/result
//! data model, the time-budget clamp, pure URL utilities, and the error
//! taxonomy. It performs no I/O.
//!
//! # Example
//!
//! ```
//! use npcore::{StreamTarget, urlutil};
//!
//! let target = StreamTarget::new("https://example.com/radio.aac", true, Some(1));
//! assert_eq!(target.url, "http://example.com/radio.aac");
//! assert_eq!(target.budget.as_millis(), 5_000);
//!
//! assert_eq!(
//!     urlutil::mp3_variant(&target.url).as_deref(),
//!     Some("http://example.com/radio.mp3")
//! );
//! ```

pub mod error;
pub mod model;
pub mod urlutil;

// Re-exports
pub use error::{Error, Result};
pub use model::{
    clamp_budget_ms, FailReason, MetadataResult, Source, StreamTarget, DEFAULT_BUDGET_MS,
    MAX_BUDGET_MS, MIN_BUDGET_MS,
};
