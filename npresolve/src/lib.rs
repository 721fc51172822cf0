//! Resolution engine: fallback orchestration, live sessions, and the
//! resolve-once primitive the HTTP layer races its timers against.
//!
//! The [`Resolver`] is the single entry point: [`Resolver::resolve`] for
//! one-shot lookups, [`run_live`] for push sessions. Both walk the same
//! fallback chain when the stream's own metadata side channel lets them
//! down.

pub mod live;
pub mod orchestrator;
pub mod settle;

pub use live::{run_live, LiveEvent};
pub use orchestrator::Resolver;
pub use settle::{channel as settle_channel, Settle};
