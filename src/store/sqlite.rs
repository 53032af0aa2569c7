use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, QueryBuilder, Sqlite, SqlitePool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{Message, Room};

use super::{validate_message, validate_room_name, MessageQuery, MessageStore, RoomStore, StoreError};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS rooms (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY NOT NULL,
        room_id TEXT NOT NULL,
        author TEXT NOT NULL,
        text TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS messages_room_created ON messages (room_id, created_at)",
    "CREATE INDEX IF NOT EXISTS messages_author ON messages (author)",
];

type MessageRow = (String, String, String, String, i64);
type RoomRow = (String, String, i64);

/// Message and room storage on SQLite. Timestamps are stored as unix
/// nanoseconds; `rowid` breaks ties between equal timestamps.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let db_pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        let store = Self::from_pool(db_pool).await?;
        tracing::info!(url, max_connections, "message store ready");
        Ok(store)
    }

    /// Wraps an existing pool, creating the schema if needed.
    pub async fn from_pool(db_pool: SqlitePool) -> Result<Self, StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&db_pool).await?;
        }
        Ok(Self { db_pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db_pool
    }
}

fn to_nanos(at: OffsetDateTime) -> i64 {
    at.unix_timestamp_nanos() as i64
}

fn from_nanos(nanos: i64) -> Result<OffsetDateTime, StoreError> {
    OffsetDateTime::from_unix_timestamp_nanos(nanos.into())
        .map_err(|err| StoreError::Corrupt(err.to_string()))
}

fn message_from_row((id, room_id, author, text, created_at): MessageRow) -> Result<Message, StoreError> {
    Ok(Message {
        id: Uuid::parse_str(&id).map_err(|err| StoreError::Corrupt(format!("message id {id}: {err}")))?,
        room_id,
        author,
        text,
        created_at: from_nanos(created_at)?,
    })
}

fn room_from_row((id, name, created_at): RoomRow) -> Result<Room, StoreError> {
    Ok(Room {
        id,
        name,
        created_at: from_nanos(created_at)?,
    })
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn append(&self, message: &Message) -> Result<(), StoreError> {
        validate_message(message)?;

        sqlx::query("INSERT INTO messages (id,room_id,author,text,created_at) values (?,?,?,?,?)")
            .bind(message.id.to_string())
            .bind(&message.room_id)
            .bind(&message.author)
            .bind(&message.text)
            .bind(to_nanos(message.created_at))
            .execute(&self.db_pool)
            .await?;

        Ok(())
    }

    async fn query(&self, query: &MessageQuery) -> Result<Vec<Message>, StoreError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT m.id,m.room_id,m.author,m.text,m.created_at FROM messages m \
             LEFT JOIN rooms r ON r.id = m.room_id WHERE 1=1",
        );
        if let Some(room_id) = &query.room_id {
            builder.push(" AND m.room_id = ").push_bind(room_id.clone());
        }
        if let Some(author) = &query.author {
            builder.push(" AND m.author = ").push_bind(author.clone());
        }
        if let Some(title) = &query.title {
            builder.push(" AND r.name = ").push_bind(title.clone());
        }
        builder
            .push(" ORDER BY m.created_at DESC, m.rowid DESC LIMIT ")
            .push_bind(i64::from(query.limit()));

        let rows: Vec<MessageRow> = builder.build_query_as::<MessageRow>().fetch_all(&self.db_pool).await?;

        let mut messages = rows
            .into_iter()
            .map(message_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }
}

#[async_trait]
impl RoomStore for SqliteStore {
    async fn create_room(&self, name: &str) -> Result<Room, StoreError> {
        let room = Room::new(Uuid::now_v7().to_string(), validate_room_name(name)?);
        sqlx::query("INSERT INTO rooms (id,name,created_at) values (?,?,?)")
            .bind(&room.id)
            .bind(&room.name)
            .bind(to_nanos(room.created_at))
            .execute(&self.db_pool)
            .await?;

        Ok(room)
    }

    async fn ensure_room(&self, id: &str) -> Result<Room, StoreError> {
        validate_room_name(id)?;
        let room = Room::new(id, id);
        sqlx::query("INSERT INTO rooms (id,name,created_at) values (?,?,?) ON CONFLICT(id) DO NOTHING")
            .bind(&room.id)
            .bind(&room.name)
            .bind(to_nanos(room.created_at))
            .execute(&self.db_pool)
            .await?;

        self.get_room(id)
            .await?
            .ok_or_else(|| StoreError::Unavailable(format!("room {id} vanished after insert")))
    }

    async fn get_room(&self, id: &str) -> Result<Option<Room>, StoreError> {
        let row: Option<RoomRow> = sqlx::query_as("SELECT id,name,created_at FROM rooms WHERE id=?")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;

        row.map(room_from_row).transpose()
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let rows: Vec<RoomRow> = sqlx::query_as("SELECT id,name,created_at FROM rooms ORDER BY created_at, rowid")
            .fetch_all(&self.db_pool)
            .await?;

        rows.into_iter().map(room_from_row).collect()
    }
}
