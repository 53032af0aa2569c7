//! Durable storage boundary for rooms and their message history.
//!
//! The hub only ever appends through [`MessageStore`]; reading history and
//! managing rooms happens from the HTTP layer.

mod memory;
mod sqlite;

use async_trait::async_trait;
use serde::Deserialize;

use crate::db::{Message, Room};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Default number of messages returned by a history query.
pub const DEFAULT_LIMIT: u32 = 100;
/// Hard cap on a single history query.
pub const MAX_LIMIT: u32 = 500;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Filters for reading message history. Every field is optional; `title`
/// matches the display name of the room the message belongs to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageQuery {
    pub room_id: Option<String>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub limit: Option<u32>,
}

impl MessageQuery {
    pub fn room(room_id: impl Into<String>) -> Self {
        Self {
            room_id: Some(room_id.into()),
            ..Default::default()
        }
    }

    /// Effective limit, clamped to `1..=MAX_LIMIT`.
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Durably records one message. Rejects messages that fail
    /// [`validate_message`].
    async fn append(&self, message: &Message) -> Result<(), StoreError>;

    /// Returns the most recent `query.limit()` matches, oldest first.
    async fn query(&self, query: &MessageQuery) -> Result<Vec<Message>, StoreError>;
}

#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn create_room(&self, name: &str) -> Result<Room, StoreError>;

    /// Returns the room with this id, creating it (named after its id) when
    /// it does not exist yet.
    async fn ensure_room(&self, id: &str) -> Result<Room, StoreError>;

    async fn get_room(&self, id: &str) -> Result<Option<Room>, StoreError>;

    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError>;
}

/// Everything the HTTP layer needs from storage.
pub trait ChatStore: MessageStore + RoomStore {}

impl<T: MessageStore + RoomStore> ChatStore for T {}

pub fn validate_message(message: &Message) -> Result<(), StoreError> {
    if message.text.trim().is_empty() {
        return Err(StoreError::Validation("message text is empty".to_owned()));
    }
    if message.author.trim().is_empty() {
        return Err(StoreError::Validation("message author is empty".to_owned()));
    }
    Ok(())
}

pub(crate) fn validate_room_name(name: &str) -> Result<&str, StoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::Validation("room name is empty".to_owned()));
    }
    if name.len() > 128 {
        return Err(StoreError::Validation("room name is too long".to_owned()));
    }
    Ok(name)
}
