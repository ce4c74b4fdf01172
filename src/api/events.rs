//! 实时事件推送（SSE）
//!
//! 入站 webhook 通过 `broadcast` 通道转发给所有已连接的监听者；
//! 监听者数量即接收端数量，落后的接收端跳过错过的事件。

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::app_state::AppState;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveEvent {
    pub kind: String,
    pub received_at: DateTime<Utc>,
    pub payload: Value,
}

impl LiveEvent {
    pub fn webhook(payload: Value) -> Self {
        Self {
            kind: "webhook".into(),
            received_at: Utc::now(),
            payload,
        }
    }

    fn to_sse(&self) -> Event {
        let json = serde_json::to_string(self).unwrap_or_default();
        Event::default().event(self.kind.as_str()).data(json)
    }
}

/// 进程内事件中心
#[derive(Clone)]
pub struct EventHub {
    sender: broadcast::Sender<LiveEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(CHANNEL_CAPACITY)
    }
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// 广播事件，返回收到事件的监听者数量
    pub fn publish(&self, event: LiveEvent) -> usize {
        // 没有监听者时 send 返回错误，不算失败
        self.sender.send(event).unwrap_or(0)
    }
}

/// GET /api/events
pub async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    tracing::info!(listeners = state.events.listener_count(), "SSE listener connected");

    let connected = Event::default()
        .event("connected")
        .data(serde_json::json!({ "connectedAt": Utc::now() }).to_string());

    let updates = stream::unfold(rx, |mut rx| async move {
        match rx.recv().await {
            Ok(event) => Some((Ok(event.to_sse()), rx)),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "SSE listener lagged behind");
                Some((Ok(Event::default().comment("lagged")), rx))
            }
            Err(RecvError::Closed) => None,
        }
    });

    let stream = stream::once(async move { Ok(connected) }).chain(updates);

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
