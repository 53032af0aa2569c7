//! Live fan-out of chat messages.
//!
//! A [`HubRegistry`] owns one [`RoomHub`] per active room. Each WebSocket is
//! driven by [`serve`], which joins the hub for its room, forwards
//! everything it reads to [`RoomHub::publish`] and writes out whatever the
//! hub queues for it.

mod connection;
mod registry;
mod room;

use std::{fmt, sync::Arc};

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::db::Message;

pub use connection::{serve, ConnectionError};
pub use registry::{HubConfig, HubRegistry};
pub use room::{PublishError, RoomHub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// What a hub pushes onto a member's outbound queue. Serialized as one JSON
/// text frame per event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubEvent {
    Message(Arc<Message>),
    Error { message: String },
}

/// A registration in a [`RoomHub`]: the member's id plus the receiving end
/// of its bounded outbound queue. The queue closes once the hub forgets the
/// member, and `dropped` resolves at the same moment even while events are
/// still buffered.
#[derive(Debug)]
pub struct Member {
    id: ConnectionId,
    rx: mpsc::Receiver<HubEvent>,
    dropped: oneshot::Receiver<()>,
}

impl Member {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<HubEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<HubEvent, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }

    /// Whether the hub has let go of this member, by `leave` or because
    /// its queue overflowed.
    pub fn is_dropped(&mut self) -> bool {
        matches!(self.dropped.try_recv(), Err(oneshot::error::TryRecvError::Closed))
    }

    pub fn into_parts(self) -> (mpsc::Receiver<HubEvent>, oneshot::Receiver<()>) {
        (self.rx, self.dropped)
    }
}
