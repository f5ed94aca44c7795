//! Push channel over the realtime websocket.
//!
//! Phoenix-style frames (`topic`, `event`, `payload`, `ref`). A subscription
//! joins `realtime:<channel>` asking for every change on the task table,
//! heartbeats on the `phoenix` topic, and leaves when the stream is closed.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use todo_core::BackendError;
use todo_sync::{ChangeEvent, ChangeFeed, ChangeKind, ChangeStream};
use tracing::{debug, info, instrument, warn};

use super::RestBackend;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

const PHOENIX_TOPIC: &str = "phoenix";

/// One protocol frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Channel topic (`realtime:<channel>` or `phoenix`).
    pub topic: String,
    /// Event name (`phx_join`, `phx_reply`, `postgres_changes`, ...).
    pub event: String,
    /// Event payload.
    #[serde(default)]
    pub payload: Value,
    /// Message reference; replies echo it.
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    /// Reference of the join this frame belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

impl Frame {
    /// Join `topic` for all change events on `table`.
    pub fn join(topic: &str, table: &str, access_token: &str, reference: &str) -> Self {
        Self {
            topic: topic.to_string(),
            event: "phx_join".to_string(),
            payload: json!({
                "config": {
                    "broadcast": { "ack": false, "self": false },
                    "presence": { "key": "" },
                    "postgres_changes": [
                        { "event": "*", "schema": "public", "table": table }
                    ]
                },
                "access_token": access_token
            }),
            reference: Some(reference.to_string()),
            join_ref: Some(reference.to_string()),
        }
    }

    /// Connection keep-alive.
    pub fn heartbeat(reference: &str) -> Self {
        Self {
            topic: PHOENIX_TOPIC.to_string(),
            event: "heartbeat".to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
            join_ref: None,
        }
    }

    /// Leave `topic`.
    pub fn leave(topic: &str, reference: &str) -> Self {
        Self {
            topic: topic.to_string(),
            event: "phx_leave".to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
            join_ref: None,
        }
    }

    /// The table change this frame announces, if any.
    pub fn change_event(&self) -> Option<ChangeEvent> {
        if self.event != "postgres_changes" {
            return None;
        }
        let data = self.payload.get("data")?;
        let kind: ChangeKind = serde_json::from_value(data.get("type")?.clone()).ok()?;
        let table = data.get("table").and_then(Value::as_str).unwrap_or_default();
        Some(ChangeEvent::new(kind, table))
    }

    /// `status` of a `phx_reply`.
    pub fn reply_status(&self) -> Option<&str> {
        if self.event != "phx_reply" {
            return None;
        }
        self.payload.get("status").and_then(Value::as_str)
    }

    fn reply_reason(&self) -> String {
        let response = self.payload.get("response");
        response
            .and_then(|r| r.get("reason").or_else(|| r.get("message")))
            .and_then(Value::as_str)
            .unwrap_or("channel join rejected")
            .to_string()
    }
}

/// Build the websocket URL from the project URL.
fn websocket_url(base: &str, anon_key: &str) -> Result<String, BackendError> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| BackendError::new(format!("invalid backend url {base}: {e}")))?;
    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => other,
    }
    .to_string();
    url.set_scheme(&scheme)
        .map_err(|()| BackendError::new(format!("unsupported backend url scheme {scheme}")))?;
    url.set_path("/realtime/v1/websocket");
    let _ = url
        .query_pairs_mut()
        .clear()
        .append_pair("apikey", anon_key)
        .append_pair("vsn", "1.0.0");
    Ok(url.to_string())
}

#[derive(Default)]
struct RefCounter(u64);

impl RefCounter {
    fn next(&mut self) -> String {
        self.0 += 1;
        self.0.to_string()
    }
}

async fn send_frame(sink: &mut WsSink, frame: &Frame) -> Result<(), BackendError> {
    let text = serde_json::to_string(frame)
        .map_err(|e| BackendError::new(format!("failed to encode frame: {e}")))?;
    sink.send(Message::Text(text.into()))
        .await
        .map_err(|e| BackendError::new(format!("websocket send failed: {e}")))
}

fn parse_frame(message: &Message) -> Option<Frame> {
    let Message::Text(text) = message else {
        return None;
    };
    serde_json::from_str(text).ok()
}

/// Wait for the reply to the join with `join_ref`.
async fn await_join(source: &mut WsSource, topic: &str, join_ref: &str) -> Result<(), BackendError> {
    while let Some(message) = source.next().await {
        let message = message.map_err(|e| BackendError::new(format!("websocket error: {e}")))?;
        let Some(frame) = parse_frame(&message) else {
            continue;
        };
        if frame.topic != topic || frame.reference.as_deref() != Some(join_ref) {
            continue;
        }
        match frame.reply_status() {
            Some("ok") => return Ok(()),
            Some(_) => return Err(BackendError::new(frame.reply_reason())),
            None => {}
        }
    }
    Err(BackendError::new("channel closed before join completed"))
}

#[async_trait]
impl ChangeFeed for RestBackend {
    #[instrument(skip(self))]
    async fn subscribe(&self, channel: &str) -> Result<ChangeStream, BackendError> {
        let config = &self.inner.config;
        let url = websocket_url(&config.url, &config.anon_key)?;
        let (ws, _) = connect_async(url.as_str())
            .await
            .map_err(|e| BackendError::new(format!("websocket connect failed: {e}")))?;
        let (mut sink, mut source) = ws.split();

        let topic = format!("realtime:{channel}");
        let mut refs = RefCounter::default();
        let join_ref = refs.next();
        send_frame(
            &mut sink,
            &Frame::join(&topic, &config.table, &self.bearer(), &join_ref),
        )
        .await?;
        tokio::time::timeout(config.request_timeout, await_join(&mut source, &topic, &join_ref))
            .await
            .map_err(|_| BackendError::new(format!("timed out joining {topic}")))??;
        info!(topic, "channel joined");

        let (tx, rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        let _ = tokio::spawn(run_channel(
            ChannelIo { sink, source, refs },
            topic,
            config.heartbeat_interval,
            tx,
            cancel.clone(),
        ));
        Ok(ChangeStream::new(rx, cancel))
    }
}

struct ChannelIo {
    sink: WsSink,
    source: WsSource,
    refs: RefCounter,
}

/// Relay change frames, heartbeat, and leave on cancellation.
async fn run_channel(
    mut io: ChannelIo,
    topic: String,
    heartbeat_every: Duration,
    tx: mpsc::Sender<ChangeEvent>,
    cancel: CancellationToken,
) {
    let start = tokio::time::Instant::now() + heartbeat_every;
    let mut heartbeat = tokio::time::interval_at(start, heartbeat_every);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let leave = Frame::leave(&topic, &io.refs.next());
                let _ = send_frame(&mut io.sink, &leave).await;
                let _ = io.sink.close().await;
                debug!(topic, "channel left");
                break;
            }
            _ = heartbeat.tick() => {
                let frame = Frame::heartbeat(&io.refs.next());
                if let Err(e) = send_frame(&mut io.sink, &frame).await {
                    warn!(error = %e, "heartbeat failed, closing channel");
                    break;
                }
            }
            message = io.source.next() => {
                let message = match message {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket error, closing channel");
                        break;
                    }
                    None => break,
                };
                if matches!(message, Message::Close(_)) {
                    debug!(topic, "server closed websocket");
                    break;
                }
                let Some(frame) = parse_frame(&message) else { continue };
                if frame.topic != topic {
                    continue;
                }
                if let Some(event) = frame.change_event() {
                    debug!(kind = ?event.kind, "table change");
                    if tx.send(event).await.is_err() {
                        break;
                    }
                } else if frame.event == "phx_error" || frame.event == "phx_close" {
                    warn!(topic, event = %frame.event, "channel closed by server");
                    break;
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
