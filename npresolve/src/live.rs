//! Live metadata sessions.
//!
//! A live session holds the stream connection open and pushes every metadata
//! frame to the subscriber as it arrives. Event protocol, in order:
//!
//! - `status` — connection facts (`connected`, `icyMeta`, `redirectedTo`,
//!   plus a `reason` when something degraded) and, after a fallback run, the
//!   full normalized result.
//! - `metadata` — the parsed frame fields, or `{"StreamTitle": ...}` when a
//!   fallback produced the title.
//! - `error` — terminal transport failure; always followed by `end`.
//! - `end` — the session is over, nothing follows.
//!
//! When the stream has no metadata side channel, the session pushes one
//! fallback resolution and then stays parked until the subscriber leaves.
//! The channel deliberately stays open: the subscriber's reconnect policy
//! treats a closed channel as a failure and would start polling.

use npcore::StreamTarget;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::orchestrator::Resolver;

/// One event on the push channel
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    Status(Value),
    Metadata(Value),
    Error { message: String },
    End,
}

impl LiveEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            LiveEvent::Status(_) => "status",
            LiveEvent::Metadata(_) => "metadata",
            LiveEvent::Error { .. } => "error",
            LiveEvent::End => "end",
        }
    }

    /// JSON payload of the event
    pub fn payload(&self) -> Value {
        match self {
            LiveEvent::Status(v) | LiveEvent::Metadata(v) => v.clone(),
            LiveEvent::Error { message } => json!({ "message": message }),
            LiveEvent::End => json!({ "bye": true }),
        }
    }
}

/// Run one fallback resolution in the background and push its outcome as a
/// `status` (plus `metadata` when a title came back).
///
/// The session loop keeps forwarding frames and watching for disconnects
/// while this runs. Gives up without sending when the subscriber leaves
/// mid-resolution.
fn spawn_fallback(resolver: Resolver, target: StreamTarget, tx: mpsc::Sender<LiveEvent>) {
    tokio::spawn(async move {
        let result = tokio::select! {
            result = resolver.resolve(&target) => result,
            _ = tx.closed() => return,
        };
        let title = result.stream_title.clone();
        let sent = tx
            .send(LiveEvent::Status(
                serde_json::to_value(&result).unwrap_or_else(|_| json!({})),
            ))
            .await
            .is_ok();
        if !sent {
            return;
        }
        if let Some(title) = title {
            let _ = tx
                .send(LiveEvent::Metadata(json!({ "StreamTitle": title })))
                .await;
        }
    });
}

/// Drive a live session, emitting events on `tx` until the stream ends or
/// the subscriber goes away.
///
/// Returns when the session is over; dropping the sender is how the
/// transport learns nothing more is coming.
pub async fn run_live(resolver: Resolver, target: StreamTarget, tx: mpsc::Sender<LiveEvent>) {
    let mut conn = match resolver.icy().connect(&target.url).await {
        Ok(conn) => conn,
        Err(e) => {
            let _ = tx.send(LiveEvent::Error {
                message: e.to_string(),
            })
            .await;
            let _ = tx.send(LiveEvent::End).await;
            return;
        }
    };
    let final_url = conn.final_url.clone();

    if !conn.has_metadata() {
        debug!(url = %final_url, "no side channel on live session, single fallback push");
        let sent = tx
            .send(LiveEvent::Status(json!({
                "connected": true,
                "icyMeta": false,
                "redirectedTo": final_url,
                "reason": "no-icy-meta",
            })))
            .await
            .is_ok();
        drop(conn);
        if !sent {
            return;
        }

        spawn_fallback(resolver, target, tx.clone());

        // Parked: once the fallback lands no further updates are possible,
        // but the channel stays open until the subscriber disconnects.
        tx.closed().await;
        return;
    }

    if tx
        .send(LiveEvent::Status(json!({
            "connected": true,
            "icyMeta": true,
            "redirectedTo": final_url,
        })))
        .await
        .is_err()
    {
        return;
    }
    info!(url = %final_url, "live session streaming frames");

    let first_frame_deadline = tokio::time::sleep(target.budget);
    tokio::pin!(first_frame_deadline);
    let mut frame_seen = false;
    let mut timer_fired = false;

    loop {
        tokio::select! {
            _ = tx.closed() => return,

            _ = &mut first_frame_deadline, if !frame_seen && !timer_fired => {
                timer_fired = true;
                let sent = tx.send(LiveEvent::Status(json!({
                    "connected": true,
                    "icyMeta": true,
                    "timedOut": true,
                    "redirectedTo": final_url,
                    "reason": "timeout-first-metadata",
                }))).await.is_ok();
                if !sent {
                    return;
                }
                // Push one fallback answer without blocking the loop: the
                // stream stays connected and can still deliver late frames.
                spawn_fallback(resolver.clone(), target.clone(), tx.clone());
            }

            frame = conn.next_frame() => match frame {
                Ok(Some(frame)) => {
                    frame_seen = true;
                    if tx.send(LiveEvent::Metadata(json!(frame.fields))).await.is_err() {
                        return;
                    }
                }
                Ok(None) => {
                    debug!(url = %final_url, "remote closed the live stream");
                    let _ = tx.send(LiveEvent::End).await;
                    return;
                }
                Err(e) => {
                    let _ = tx.send(LiveEvent::Error { message: e.to_string() }).await;
                    let _ = tx.send(LiveEvent::End).await;
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    async fn serve_axum(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let origin = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        origin
    }

    /// Raw ICY host sending one titled frame, then holding the socket open
    async fn serve_icy(title: &str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let meta = format!("StreamTitle='{}';", title);
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let head = "HTTP/1.1 200 OK\r\ncontent-type: audio/mpeg\r\nicy-metaint: 32\r\nconnection: close\r\n\r\n";
            sock.write_all(head.as_bytes()).await.unwrap();

            let blocks = meta.len().div_ceil(16);
            let mut body = vec![0u8; 32];
            body.push(blocks as u8);
            body.extend_from_slice(meta.as_bytes());
            body.resize(32 + 1 + blocks * 16, 0);
            body.extend_from_slice(&[0u8; 16]);
            sock.write_all(&body).await.unwrap();
            sock.flush().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        format!("http://{}/stream.mp3", addr)
    }

    /// Streaming host whose first frame only arrives after `delay`. Every
    /// other path on the port answers 404 so fallback stages fail fast.
    async fn serve_icy_late(delay: Duration, title: &str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let meta = format!("StreamTitle='{}';", title);
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    break;
                };
                let meta = meta.clone();
                tokio::spawn(async move {
                    use tokio::io::AsyncReadExt;
                    let mut buf = [0u8; 512];
                    let n = sock.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).to_string();
                    if !request.starts_with("GET /late.mp3") {
                        let _ = sock
                            .write_all(
                                b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                            )
                            .await;
                        return;
                    }
                    let head = "HTTP/1.1 200 OK\r\ncontent-type: audio/mpeg\r\nicy-metaint: 16\r\nconnection: close\r\n\r\n";
                    let _ = sock.write_all(head.as_bytes()).await;
                    let _ = sock.write_all(&[0u8; 4]).await;
                    let _ = sock.flush().await;
                    tokio::time::sleep(delay).await;

                    let blocks = meta.len().div_ceil(16);
                    let mut rest = vec![0u8; 12];
                    rest.push(blocks as u8);
                    rest.extend_from_slice(meta.as_bytes());
                    rest.resize(12 + 1 + blocks * 16, 0);
                    rest.extend_from_slice(&[0u8; 16]);
                    let _ = sock.write_all(&rest).await;
                    let _ = sock.flush().await;
                    tokio::time::sleep(Duration::from_secs(2)).await;
                });
            }
        });
        format!("http://{}/late.mp3", addr)
    }

    #[tokio::test]
    async fn connect_error_is_error_then_end() {
        let (tx, mut rx) = mpsc::channel(16);
        let target = StreamTarget::new("http://127.0.0.1:1/x", false, Some(5_000));
        run_live(Resolver::new(), target, tx).await;

        assert!(matches!(rx.recv().await, Some(LiveEvent::Error { .. })));
        assert!(matches!(rx.recv().await, Some(LiveEvent::End)));
        // Sender dropped: nothing follows
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn frames_flow_after_status() {
        let url = serve_icy("Live One").await;
        let (tx, mut rx) = mpsc::channel(16);
        let target = StreamTarget::new(url, false, Some(5_000));
        let session = tokio::spawn(run_live(Resolver::new(), target, tx));

        match rx.recv().await {
            Some(LiveEvent::Status(v)) => {
                assert_eq!(v["connected"], true);
                assert_eq!(v["icyMeta"], true);
            }
            other => panic!("expected status, got {:?}", other),
        }
        match rx.recv().await {
            Some(LiveEvent::Metadata(v)) => {
                assert_eq!(v["StreamTitle"], "Live One");
            }
            other => panic!("expected metadata, got {:?}", other),
        }

        drop(rx);
        tokio::time::timeout(Duration::from_secs(2), session)
            .await
            .expect("session exits when subscriber leaves")
            .unwrap();
    }

    #[tokio::test]
    async fn timeout_pushes_fallback_and_late_frames_still_flow() {
        let url = serve_icy_late(Duration::from_millis(1_500), "Late Frame").await;
        let (tx, mut rx) = mpsc::channel(16);
        // Sub-clamp budget straight through the struct, to keep the test fast
        let target = StreamTarget {
            url,
            force_http: false,
            budget: Duration::from_millis(300),
        };
        let session = tokio::spawn(run_live(Resolver::new(), target, tx));

        match rx.recv().await {
            Some(LiveEvent::Status(v)) => {
                assert_eq!(v["connected"], true);
                assert_eq!(v["icyMeta"], true);
            }
            other => panic!("expected connected status, got {:?}", other),
        }
        match rx.recv().await {
            Some(LiveEvent::Status(v)) => {
                assert_eq!(v["timedOut"], true);
                assert_eq!(v["reason"], "timeout-first-metadata");
            }
            other => panic!("expected timeout status, got {:?}", other),
        }
        // Fallback ran in the background; every stage 404s here
        match rx.recv().await {
            Some(LiveEvent::Status(v)) => {
                assert_eq!(v["ok"], false);
                assert_eq!(v["source"], "none");
            }
            other => panic!("expected fallback status, got {:?}", other),
        }
        // The stream stayed connected: its late frame still comes through
        match rx.recv().await {
            Some(LiveEvent::Metadata(v)) => assert_eq!(v["StreamTitle"], "Late Frame"),
            other => panic!("expected late metadata, got {:?}", other),
        }

        drop(rx);
        tokio::time::timeout(Duration::from_secs(2), session)
            .await
            .expect("session exits when subscriber leaves")
            .unwrap();
    }

    #[tokio::test]
    async fn no_side_channel_pushes_one_fallback_and_stays_open() {
        let app = Router::new()
            .route("/live.mp3", get(|| async { "no side channel here" }))
            .route(
                "/status-json.xsl",
                get(|| async {
                    axum::Json(serde_json::json!({
                        "icestats": { "source": { "artist": "A", "song": "B" } }
                    }))
                }),
            );
        let origin = serve_axum(app).await;

        let (tx, mut rx) = mpsc::channel(16);
        let target = StreamTarget::new(format!("{}/live.mp3", origin), false, Some(5_000));
        let session = tokio::spawn(run_live(Resolver::new(), target, tx));

        match rx.recv().await {
            Some(LiveEvent::Status(v)) => {
                assert_eq!(v["icyMeta"], false);
                assert_eq!(v["reason"], "no-icy-meta");
            }
            other => panic!("expected degraded status, got {:?}", other),
        }
        match rx.recv().await {
            Some(LiveEvent::Status(v)) => {
                assert_eq!(v["ok"], true);
                assert_eq!(v["source"], "icecast");
            }
            other => panic!("expected fallback status, got {:?}", other),
        }
        match rx.recv().await {
            Some(LiveEvent::Metadata(v)) => assert_eq!(v["StreamTitle"], "A - B"),
            other => panic!("expected fallback metadata, got {:?}", other),
        }

        // Channel stays open with no further events
        let quiet =
            tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
        assert!(quiet.is_err(), "channel should stay open and silent");

        drop(rx);
        tokio::time::timeout(Duration::from_secs(2), session)
            .await
            .expect("session exits when subscriber leaves")
            .unwrap();
    }
}
