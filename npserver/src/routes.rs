//! HTTP routes.
//!
//! - `GET /api/metadata` — one-shot resolution, JSON response.
//! - `GET /api/metadata/live` — SSE session pushing `status` / `metadata` /
//!   `error` / `end` events.
//! - `GET|PUT /api/streams` — the saved stream catalog.
//!
//! The one-shot endpoint always answers 200 with a normalized result body;
//! 400 is reserved for a structurally unusable request (missing `url`).

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use npcore::{FailReason, MetadataResult, Source, StreamTarget};
use npresolve::{run_live, settle_channel, LiveEvent};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::catalog::{self, StreamEntry};
use crate::state::AppState;

/// Extra slack past the budget before the settle timer gives up on the
/// resolution task
const SETTLE_GRACE: Duration = Duration::from_secs(2);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/metadata", get(metadata))
        .route("/api/metadata/live", get(metadata_live))
        .route("/api/streams", get(get_streams).put(put_streams))
        .with_state(state)
}

/// Raw query parameters, parsed leniently: a malformed `waitMs` falls back
/// to the default budget instead of failing the request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataQuery {
    url: Option<String>,
    force_http: Option<String>,
    wait_ms: Option<String>,
}

impl MetadataQuery {
    fn target(&self) -> Option<StreamTarget> {
        let url = self.url.as_deref()?.trim();
        if url.is_empty() {
            return None;
        }
        let force_http = self
            .force_http
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        let budget_ms = self.wait_ms.as_deref().and_then(|v| v.parse().ok());
        Some(StreamTarget::new(url, force_http, budget_ms))
    }
}

fn missing_url() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "ok": false, "error": "missing url parameter" })),
    )
        .into_response()
}

async fn metadata(State(state): State<AppState>, Query(query): Query<MetadataQuery>) -> Response {
    let Some(target) = query.target() else {
        return missing_url();
    };
    info!(url = %target.url, budget = ?target.budget, "one-shot resolution");

    let resolver = state.resolver.clone();
    let run_target = target.clone();
    let deadline = target.budget + SETTLE_GRACE;
    let result = race_deadline(deadline, async move { resolver.resolve(&run_target).await }).await;
    Json(result).into_response()
}

/// Race a resolution against its deadline; exactly one side answers.
///
/// The deadline timer is aborted as soon as the winner is known, so nothing
/// outlives the request.
async fn race_deadline<F>(deadline: Duration, resolve: F) -> MetadataResult
where
    F: std::future::Future<Output = MetadataResult> + Send + 'static,
{
    let (settle, rx) = settle_channel::<MetadataResult>();
    let settle = Arc::new(settle);

    let win = Arc::clone(&settle);
    tokio::spawn(async move {
        win.settle(resolve.await);
    });

    let timer = tokio::spawn(async move {
        tokio::time::sleep(deadline).await;
        if settle.settle(MetadataResult::miss(Source::None, FailReason::Timeout)) {
            warn!("resolution overran its budget, answered with timeout");
        }
    });

    // Closed-without-settling cannot happen while the tasks hold the gate;
    // answer with a timeout miss all the same.
    let result = rx
        .await
        .unwrap_or_else(|_| MetadataResult::miss(Source::None, FailReason::Timeout));
    timer.abort();
    result
}

async fn metadata_live(
    State(state): State<AppState>,
    Query(query): Query<MetadataQuery>,
) -> Response {
    let Some(target) = query.target() else {
        return missing_url();
    };
    info!(url = %target.url, "live session opened");

    let (tx, mut rx) = mpsc::channel::<LiveEvent>(32);
    tokio::spawn(run_live(state.resolver.clone(), target, tx));

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            match Event::default().event(event.name()).json_data(event.payload()) {
                Ok(sse_event) => yield Ok::<_, Infallible>(sse_event),
                Err(e) => warn!(error = %e, "unserializable live event dropped"),
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

async fn get_streams(State(state): State<AppState>) -> Response {
    match catalog::read_streams(&state.config.streams_file).await {
        Ok(streams) => Json(streams).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "ok": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct StreamsPayload {
    #[serde(default)]
    streams: Vec<StreamEntry>,
}

async fn put_streams(
    State(state): State<AppState>,
    Json(payload): Json<StreamsPayload>,
) -> Response {
    match catalog::write_streams(&state.config.streams_file, &payload.streams).await {
        Ok(()) => Json(json!({ "ok": true })).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "ok": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}
