use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::{Message, Room};

use super::{validate_message, validate_room_name, MessageQuery, MessageStore, RoomStore, StoreError};

/// In-process store. Keeps everything in insertion order, which doubles as
/// the tie-breaker for messages sharing a timestamp.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    rooms: Vec<Room>,
    messages: Vec<Message>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append(&self, message: &Message) -> Result<(), StoreError> {
        validate_message(message)?;
        self.lock().messages.push(message.clone());
        Ok(())
    }

    async fn query(&self, query: &MessageQuery) -> Result<Vec<Message>, StoreError> {
        let inner = self.lock();
        let title_rooms: Option<Vec<&str>> = query.title.as_deref().map(|title| {
            inner
                .rooms
                .iter()
                .filter(|room| room.name == title)
                .map(|room| room.id.as_str())
                .collect()
        });

        let mut matches: Vec<(usize, &Message)> = inner
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| query.room_id.as_deref().is_none_or(|id| m.room_id == id))
            .filter(|(_, m)| query.author.as_deref().is_none_or(|a| m.author == a))
            .filter(|(_, m)| {
                title_rooms
                    .as_ref()
                    .is_none_or(|ids| ids.contains(&m.room_id.as_str()))
            })
            .collect();
        matches.sort_by_key(|(seq, m)| (m.created_at, *seq));

        let skip = matches.len().saturating_sub(query.limit() as usize);
        Ok(matches.into_iter().skip(skip).map(|(_, m)| m.clone()).collect())
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn create_room(&self, name: &str) -> Result<Room, StoreError> {
        let name = validate_room_name(name)?;
        let room = Room::new(Uuid::now_v7().to_string(), name);
        self.lock().rooms.push(room.clone());
        Ok(room)
    }

    async fn ensure_room(&self, id: &str) -> Result<Room, StoreError> {
        validate_room_name(id)?;
        let mut inner = self.lock();
        if let Some(room) = inner.rooms.iter().find(|room| room.id == id) {
            return Ok(room.clone());
        }
        let room = Room::new(id, id);
        inner.rooms.push(room.clone());
        Ok(room)
    }

    async fn get_room(&self, id: &str) -> Result<Option<Room>, StoreError> {
        Ok(self.lock().rooms.iter().find(|room| room.id == id).cloned())
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        Ok(self.lock().rooms.clone())
    }
}
