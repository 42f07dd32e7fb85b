use sqlx::SqlitePool;

use crate::rooms::history::HistoryBuffer;
use crate::rooms::id::RoomId;
use crate::AppResult;

pub async fn init(db_pool: &SqlitePool) -> AppResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS room_history (
            room_id TEXT PRIMARY KEY,
            messages TEXT NOT NULL
        )",
    )
    .execute(db_pool)
    .await?;
    Ok(())
}

/// Durable per-room slot for the rolling message buffer.
///
/// One row per room, the whole buffer serialized as JSON. Updates are
/// read-modify-write inside a single transaction; the room actor is the only
/// writer for its key, so per-room writes never race.
#[derive(Clone)]
pub struct HistoryStore {
    db_pool: SqlitePool,
}

impl HistoryStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    pub async fn get(&self, room_id: &RoomId) -> AppResult<Option<HistoryBuffer>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT messages FROM room_history WHERE room_id=?")
                .bind(room_id.as_str())
                .fetch_optional(&self.db_pool)
                .await?;

        match row {
            Some((raw,)) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Apply `apply` to the stored buffer (empty if absent) and commit the
    /// result, all inside one transaction. Returns the committed buffer.
    pub async fn transactional_update<F>(&self, room_id: &RoomId, apply: F) -> AppResult<HistoryBuffer>
    where
        F: FnOnce(HistoryBuffer) -> HistoryBuffer,
    {
        let mut tx = self.db_pool.begin().await?;

        let row: Option<(String,)> =
            sqlx::query_as("SELECT messages FROM room_history WHERE room_id=?")
                .bind(room_id.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        let buffer = match row {
            Some((raw,)) => serde_json::from_str(&raw)?,
            None => HistoryBuffer::default(),
        };

        let updated = apply(buffer);

        sqlx::query(
            "INSERT INTO room_history (room_id,messages) VALUES (?,?)
             ON CONFLICT(room_id) DO UPDATE SET messages=excluded.messages",
        )
        .bind(room_id.as_str())
        .bind(serde_json::to_string(&updated)?)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }
}
