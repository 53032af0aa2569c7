use std::{sync::Arc, time::Duration};

use axum::extract::ws::{close_code, CloseFrame, Message as WsMessage};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use super::{ConnectionId, HubEvent, HubRegistry, RoomHub};

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("transport error: {0}")]
    Transport(#[from] axum::Error),
    #[error("undecodable frame: {0}")]
    Decode(#[from] serde_json::Error),
}

/// What a client sends. The author always comes from the session, so any
/// other field is ignored.
#[derive(Debug, Deserialize)]
struct IncomingMessage {
    text: String,
}

/// How long a dropped connection gets to flush its queue and send a close
/// frame before the socket is cut.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Joins `room_id` as `user` and pumps the socket until either direction
/// stops or the hub drops this member.
///
/// The writer runs as its own task fed by the member queue; the reader runs
/// here. Whichever finishes first ends the other, and the member leaves the
/// hub exactly once on the way out.
pub async fn serve<S>(socket: S, user: String, room_id: String, registry: Arc<HubRegistry>)
where
    S: Stream<Item = Result<WsMessage, axum::Error>> + Sink<WsMessage, Error = axum::Error> + Send + 'static,
{
    let (hub, member) = registry.join(&room_id, &user);
    let id = member.id();
    tracing::info!(room_id = %room_id, user = %user, connection_id = %id, "connection open");

    let (rx, mut dropped) = member.into_parts();
    let (sink, stream) = socket.split();
    let mut writer = tokio::spawn(write_loop(sink, rx));

    let result = tokio::select! {
        biased;
        _ = &mut dropped => {
            tracing::debug!(connection_id = %id, "dropped by the hub, closing");
            match tokio::time::timeout(CLOSE_GRACE, &mut writer).await {
                Ok(Ok(res)) => res,
                Ok(Err(err)) => {
                    tracing::error!(connection_id = %id, error = %err, "writer task failed");
                    Ok(())
                }
                Err(_) => {
                    writer.abort();
                    Ok(())
                }
            }
        }
        res = &mut writer => match res {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(connection_id = %id, error = %err, "writer task failed");
                Ok(())
            }
        },
        res = read_loop(stream, &hub, id, &user) => {
            writer.abort();
            res
        }
    };

    registry.leave(&hub, id);

    match result {
        Ok(()) => tracing::info!(room_id = %room_id, user = %user, connection_id = %id, "connection closed"),
        Err(err) => tracing::warn!(
            room_id = %room_id,
            user = %user,
            connection_id = %id,
            error = %err,
            "connection dropped"
        ),
    }
}

async fn read_loop<S>(mut stream: S, hub: &RoomHub, id: ConnectionId, user: &str) -> Result<(), ConnectionError>
where
    S: Stream<Item = Result<WsMessage, axum::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        let IncomingMessage { text } = match frame? {
            WsMessage::Text(text) => serde_json::from_str(text.as_str())?,
            WsMessage::Binary(bytes) => serde_json::from_slice(&bytes)?,
            WsMessage::Close(frame) => {
                tracing::debug!(connection_id = %id, reason = ?frame, "client initiated close");
                return Ok(());
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
        };

        // frames already buffered must not outlive the membership
        if !hub.contains(id) {
            return Ok(());
        }

        if text.trim().is_empty() {
            hub.notify(id, HubEvent::Error { message: "message text is empty".to_owned() });
            continue;
        }

        if let Err(err) = hub.publish(user, &text).await {
            hub.notify(id, HubEvent::Error { message: err.to_string() });
        }
    }

    Ok(())
}

async fn write_loop<S>(mut sink: S, mut rx: mpsc::Receiver<HubEvent>) -> Result<(), ConnectionError>
where
    S: Sink<WsMessage, Error = axum::Error> + Unpin,
{
    while let Some(event) = rx.recv().await {
        let payload = serde_json::to_string(&event)?;
        sink.send(WsMessage::Text(payload.into())).await?;
    }

    // the hub let go of this member, which only happens when it fell behind
    let _ = sink
        .send(WsMessage::Close(Some(CloseFrame {
            code: close_code::AGAIN,
            reason: "outbound queue overflow".into(),
        })))
        .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        pin::Pin,
        task::{Context, Poll},
    };

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::{hub::HubConfig, store::MemoryStore};

    /// A peer that sends whatever the test feeds it and never reads, so
    /// every write to it stays pending.
    struct StuckPeer {
        incoming: mpsc::UnboundedReceiver<WsMessage>,
    }

    impl Stream for StuckPeer {
        type Item = Result<WsMessage, axum::Error>;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            self.incoming.poll_recv(cx).map(|frame| frame.map(Ok))
        }
    }

    impl Sink<WsMessage> for StuckPeer {
        type Error = axum::Error;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }

        fn start_send(self: Pin<&mut Self>, _item: WsMessage) -> Result<(), Self::Error> {
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }
    }

    fn text_frame(text: &str) -> WsMessage {
        WsMessage::Text(json!({ "text": text }).to_string().into())
    }

    #[test_log::test(tokio::test)]
    async fn overflowing_connection_is_torn_down_and_stops_publishing() {
        let registry = Arc::new(HubRegistry::new(
            Arc::new(MemoryStore::new()),
            HubConfig {
                outbound_capacity: 1,
                ..HubConfig::default()
            },
        ));
        let (frames, incoming) = mpsc::unbounded_channel();
        let slow = tokio::spawn(serve(
            StuckPeer { incoming },
            "slow".to_owned(),
            "poetry".to_owned(),
            registry.clone(),
        ));

        let hub = loop {
            if let Some(hub) = registry.get("poetry").filter(|hub| hub.member_count() == 1) {
                break hub;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        let (_, mut fast) = registry.join("poetry", "fast");

        for i in 0..5 {
            hub.publish("fast", &format!("msg {i}")).await.unwrap();
            assert!(matches!(fast.recv().await, Some(HubEvent::Message(_))));
        }
        assert_eq!(hub.member_count(), 1);

        // the peer keeps talking after it was dropped
        let _ = frames.send(text_frame("zombie"));

        tokio::time::timeout(Duration::from_secs(5), slow)
            .await
            .expect("dropped connection was never torn down")
            .unwrap();

        assert_eq!(hub.member_count(), 1);
        assert!(hub.contains(fast.id()));
        while let Ok(event) = fast.try_recv() {
            if let HubEvent::Message(message) = event {
                assert_eq!(message.author, "fast");
            }
        }

        registry.leave(&hub, fast.id());
        assert!(registry.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn blank_text_is_reported_without_publishing() {
        let registry = Arc::new(HubRegistry::new(Arc::new(MemoryStore::new()), HubConfig::default()));
        let (hub, mut sender) = registry.join("poetry", "ana");
        let (_, mut other) = registry.join("poetry", "bo");

        let (frames, incoming) = mpsc::unbounded_channel();
        frames.send(text_frame("  ")).unwrap();
        frames.send(text_frame("hi")).unwrap();
        drop(frames);

        read_loop(StuckPeer { incoming }, &hub, sender.id(), "ana").await.unwrap();

        assert!(matches!(sender.try_recv().unwrap(), HubEvent::Error { .. }));
        assert!(matches!(sender.try_recv().unwrap(), HubEvent::Message(m) if m.text == "hi"));
        assert!(matches!(other.try_recv().unwrap(), HubEvent::Message(m) if m.text == "hi"));
        assert!(other.try_recv().is_err());
    }

}
