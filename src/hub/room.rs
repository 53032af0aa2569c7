use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};

use crate::{
    db::Message,
    store::{MessageStore, StoreError},
};

use super::{ConnectionId, HubEvent, Member};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Delivered to the room, but the store failed to record it.
    #[error("message delivered but not saved: {source}")]
    NotPersisted {
        message: Arc<Message>,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug)]
struct Registration {
    user: String,
    tx: mpsc::Sender<HubEvent>,
    // fires on drop, so the connection notices it was let go
    _dropped: oneshot::Sender<()>,
}

/// Fan-out authority for one room.
///
/// Membership sits behind a plain mutex that is only ever held for
/// in-memory work: queue pushes use `try_send`, so a slow member can never
/// stall the room. A member whose queue is full is dropped on the spot,
/// which closes its queue and tears its connection down.
pub struct RoomHub {
    room_id: String,
    store: Arc<dyn MessageStore>,
    capacity: usize,
    members: Mutex<HashMap<ConnectionId, Registration>>,
}

impl RoomHub {
    pub fn new(room_id: impl Into<String>, store: Arc<dyn MessageStore>, capacity: usize) -> Self {
        Self {
            room_id: room_id.into(),
            store,
            capacity: capacity.max(1),
            members: Mutex::new(HashMap::new()),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn member_count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Registration>> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn join(&self, user: &str) -> Member {
        let (tx, rx) = mpsc::channel(self.capacity);
        let (dropped_tx, dropped) = oneshot::channel();
        let id = ConnectionId::new();

        let members = {
            let mut members = self.lock();
            members.insert(
                id,
                Registration {
                    user: user.to_owned(),
                    tx,
                    _dropped: dropped_tx,
                },
            );
            members.len()
        };

        tracing::debug!(room_id = %self.room_id, connection_id = %id, user, members, "joined");
        Member { id, rx, dropped }
    }

    /// Forgets a member. Unknown or already removed ids are a no-op.
    /// Once this returns, the member's queue is closed and nothing more is
    /// delivered to it.
    pub fn leave(&self, id: ConnectionId) -> bool {
        let (removed, members) = {
            let mut members = self.lock();
            let removed = members.remove(&id);
            (removed, members.len())
        };

        match removed {
            Some(Registration { user, .. }) => {
                tracing::debug!(room_id = %self.room_id, connection_id = %id, user = %user, members, "left");
                true
            }
            None => false,
        }
    }

    /// Stores the message, then delivers it to every member, the author
    /// included.
    ///
    /// A store failure, validation included, does not stop delivery: the
    /// message still goes out and the failure comes back as
    /// [`PublishError::NotPersisted`].
    pub async fn publish(&self, author: &str, text: &str) -> Result<Arc<Message>, PublishError> {
        let message = Message::new(self.room_id.as_str(), author, text);
        let persisted = self.store.append(&message).await;

        let message = Arc::new(message);
        let delivered = self.broadcast(HubEvent::Message(message.clone()));
        tracing::trace!(room_id = %self.room_id, message_id = %message.id, delivered, "published");

        match persisted {
            Ok(()) => Ok(message),
            Err(source) => {
                tracing::warn!(
                    room_id = %self.room_id,
                    message_id = %message.id,
                    error = %source,
                    "failed to persist message"
                );
                Err(PublishError::NotPersisted { message, source })
            }
        }
    }

    /// Queues an event for a single member.
    pub fn notify(&self, id: ConnectionId, event: HubEvent) -> bool {
        let mut members = self.lock();
        let Some(registration) = members.get(&id) else {
            return false;
        };

        match registration.tx.try_send(event) {
            Ok(()) => true,
            Err(err) => {
                self.evict(&mut members, id, &err);
                false
            }
        }
    }

    /// Pushes `event` onto every member's queue, dropping members that
    /// cannot take it. Returns the number of members it reached.
    fn broadcast(&self, event: HubEvent) -> usize {
        let mut members = self.lock();
        let mut failed = Vec::new();

        for (id, registration) in members.iter() {
            if let Err(err) = registration.tx.try_send(event.clone()) {
                failed.push((*id, err));
            }
        }

        for (id, err) in &failed {
            self.evict(&mut members, *id, err);
        }

        members.len()
    }

    fn evict(
        &self,
        members: &mut HashMap<ConnectionId, Registration>,
        id: ConnectionId,
        err: &TrySendError<HubEvent>,
    ) {
        let Some(Registration { user, .. }) = members.remove(&id) else {
            return;
        };

        match err {
            TrySendError::Full(_) => tracing::warn!(
                room_id = %self.room_id,
                connection_id = %id,
                user = %user,
                "outbound queue full, dropping connection"
            ),
            TrySendError::Closed(_) => tracing::debug!(
                room_id = %self.room_id,
                connection_id = %id,
                user = %user,
                "outbound queue closed, dropping connection"
            ),
        }
    }
}

impl std::fmt::Debug for RoomHub {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("RoomHub")
            .field("room_id", &self.room_id)
            .field("capacity", &self.capacity)
            .field("members", &self.member_count())
            .finish()
    }
}
