//! NowPlayd HTTP server: resolves "what is playing right now" for internet
//! audio streams, over a one-shot JSON endpoint, an SSE live channel, and a
//! small saved-stream catalog.
//!
//! # Client reconnection contract
//!
//! Consumers of `GET /api/metadata/live` must treat an `error` or `end`
//! event, or any transport failure of the SSE connection, as the channel
//! being gone for good: degrade to polling `GET /api/metadata` on a slow
//! cadence (30 s is plenty) until a new target is selected. The server never
//! restarts a live session on the client's behalf.

pub mod catalog;
pub mod config;
pub mod routes;
pub mod state;

pub use config::Config;
pub use routes::router;
pub use state::AppState;
