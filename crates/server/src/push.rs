use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use hookrelay_core::notify::Frame;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::service::SharedService;

/// `GET /ws`: customer messages and AI suggestions.
pub async fn events(ws: WebSocketUpgrade, State(service): State<SharedService>) -> Response {
    let receiver = service.notifier.subscribe();
    ws.on_upgrade(move |socket| forward(socket, receiver, "events"))
}

/// `GET /ws/diagnostics`: authentication outcomes for every webhook.
pub async fn diagnostics(ws: WebSocketUpgrade, State(service): State<SharedService>) -> Response {
    let receiver = service.notifier.subscribe_diagnostics();
    ws.on_upgrade(move |socket| forward(socket, receiver, "diagnostics"))
}

async fn forward<E>(mut socket: WebSocket, mut receiver: broadcast::Receiver<E>, feed: &'static str)
where
    E: Frame + Clone + Send + 'static,
{
    info!(event_name = "push.subscriber.connected", feed, "push subscriber connected");

    loop {
        tokio::select! {
            received = receiver.recv() => match received {
                Ok(event) => {
                    if socket.send(Message::Text(event.to_frame().into())).await.is_err() {
                        debug!(event_name = "push.subscriber.send_failed", feed, "dropping subscriber");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        event_name = "push.subscriber.lagged",
                        feed,
                        skipped,
                        "subscriber fell behind; frames skipped"
                    );
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    info!(event_name = "push.subscriber.disconnected", feed, "push subscriber disconnected");
}
