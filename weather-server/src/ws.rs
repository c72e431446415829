//! Real-time notification channel.
//!
//! Every created record is fanned out to connected websocket subscribers
//! through a broadcast channel.

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;
use weather_core::NotificationSink;

use crate::http::AppState;

/// Fan-out hub for created records.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<String>,
}

impl Broadcaster {
    /// `capacity` bounds how far a slow subscriber may fall behind before it
    /// starts skipping messages.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl NotificationSink for Broadcaster {
    fn publish(&self, payload: &str) {
        match self.tx.send(payload.to_string()) {
            Ok(receivers) => tracing::debug!(receivers, "Broadcast weather record"),
            Err(_) => tracing::debug!("No subscribers, broadcast dropped"),
        }
    }
}

/// GET /ws/{id} - Upgrade to the notification channel
pub async fn subscribe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            tracing::warn!(user = %id, "Rejected websocket request: {rejection}");
            return (StatusCode::UPGRADE_REQUIRED, "Upgrade Required").into_response();
        }
    };

    let rx = state.hub.subscribe();
    upgrade.on_upgrade(move |socket| serve_subscriber(socket, id, rx))
}

async fn serve_subscriber(socket: WebSocket, id: String, mut rx: broadcast::Receiver<String>) {
    let connection = Uuid::new_v4();
    tracing::info!(user = %id, %connection, "Subscriber connected");

    let (mut sender, mut receiver) = socket.split();

    let greeting = format!("Hello user: {id} with UUID: {connection}");
    if sender.send(Message::Text(greeting.into())).await.is_err() {
        return;
    }

    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(payload) => {
                    if sender.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Subscriber lagging, messages dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::info!(user = %id, %connection, "Subscriber disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let hub = Broadcaster::new(8);
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        hub.publish(r#"{"date":"2024-06-01"}"#);

        assert_eq!(a.recv().await.unwrap(), r#"{"date":"2024-06-01"}"#);
        assert_eq!(b.recv().await.unwrap(), r#"{"date":"2024-06-01"}"#);
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let hub = Broadcaster::new(8);
        hub.publish("nobody listening");
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_ahead() {
        let hub = Broadcaster::new(2);
        let mut rx = hub.subscribe();
        for n in 0..4 {
            hub.publish(&n.to_string());
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(2))));
        assert_eq!(rx.recv().await.unwrap(), "2");
    }
}
