use std::collections::HashMap;

use sqlx::sqlite::{SqliteConnection, SqlitePool};
use sqlx::{Row, Sqlite, Transaction};

use songbattle_core::affinity::AffinityRecord;
use songbattle_core::recency::Pair;
use songbattle_core::store::{GlobalRating, OutcomeTx, PersonalRating, RatingStore};
use songbattle_core::{BattleError, DEFAULT_RATING, Result, SongId};

/// Create all tables if they don't exist.
pub async fn init_db(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY,
            rating INTEGER NOT NULL DEFAULT 1500,
            previous_rating INTEGER NOT NULL DEFAULT 1500,
            comparisons INTEGER NOT NULL DEFAULT 0,
            wins INTEGER NOT NULL DEFAULT 0
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS personal_ratings (
            session TEXT NOT NULL,
            song_id INTEGER NOT NULL,
            rating INTEGER NOT NULL,
            comparisons INTEGER NOT NULL DEFAULT 0,
            wins INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (session, song_id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS recent_pairs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session TEXT NOT NULL,
            winner_id INTEGER NOT NULL,
            loser_id INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS recent_pairs_session ON recent_pairs (session, id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS genre_affinity (
            session TEXT NOT NULL,
            genre TEXT NOT NULL,
            wins INTEGER NOT NULL DEFAULT 0,
            comparisons INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (session, genre)
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert a default rating row for each song that has none.
pub async fn register_songs(pool: &SqlitePool, ids: &[SongId]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for &id in ids {
        sqlx::query("INSERT OR IGNORE INTO songs (id, rating, previous_rating) VALUES (?1, ?2, ?2)")
            .bind(id)
            .bind(DEFAULT_RATING)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

async fn get_global_rating(conn: &mut SqliteConnection, id: SongId) -> Result<i32, sqlx::Error> {
    let row = sqlx::query("SELECT rating FROM songs WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row
        .map(|r| r.get::<i32, _>("rating"))
        .unwrap_or(DEFAULT_RATING))
}

/// All global rating records.
pub async fn get_global_ratings(
    pool: &SqlitePool,
) -> Result<HashMap<SongId, GlobalRating>, sqlx::Error> {
    let rows = sqlx::query("SELECT id, rating, previous_rating, comparisons, wins FROM songs")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|r| {
            (
                r.get::<i64, _>("id"),
                GlobalRating {
                    rating: r.get("rating"),
                    previous_rating: r.get("previous_rating"),
                    comparisons: r.get::<i32, _>("comparisons") as u32,
                    wins: r.get::<i32, _>("wins") as u32,
                },
            )
        })
        .collect())
}

/// Set a new global rating, keeping the old one as previous_rating.
async fn update_global_rating(
    conn: &mut SqliteConnection,
    id: SongId,
    new_rating: i32,
    won: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO songs (id, rating, previous_rating, comparisons, wins)
         VALUES (?1, ?2, ?3, 1, ?4)
         ON CONFLICT(id) DO UPDATE SET
            previous_rating = rating,
            rating = excluded.rating,
            comparisons = comparisons + 1,
            wins = wins + excluded.wins",
    )
    .bind(id)
    .bind(new_rating)
    .bind(DEFAULT_RATING)
    .bind(i64::from(won))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Personal records of one session.
pub async fn get_personal_ratings(
    pool: &SqlitePool,
    session: &str,
) -> Result<HashMap<SongId, PersonalRating>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT song_id, rating, comparisons, wins FROM personal_ratings WHERE session = ?1",
    )
    .bind(session)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| {
            (
                r.get::<i64, _>("song_id"),
                PersonalRating {
                    rating: r.get("rating"),
                    comparisons: r.get::<i32, _>("comparisons") as u32,
                    wins: r.get::<i32, _>("wins") as u32,
                },
            )
        })
        .collect())
}

async fn get_or_init_personal_rating(
    conn: &mut SqliteConnection,
    session: &str,
    id: SongId,
) -> Result<i32, sqlx::Error> {
    let row = sqlx::query("SELECT rating FROM personal_ratings WHERE session = ?1 AND song_id = ?2")
        .bind(session)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(row) = row {
        return Ok(row.get("rating"));
    }

    let seeded = get_global_rating(conn, id).await?;
    sqlx::query("INSERT INTO personal_ratings (session, song_id, rating) VALUES (?1, ?2, ?3)")
        .bind(session)
        .bind(id)
        .bind(seeded)
        .execute(&mut *conn)
        .await?;

    Ok(seeded)
}

async fn update_personal_rating(
    conn: &mut SqliteConnection,
    session: &str,
    id: SongId,
    new_rating: i32,
    won: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO personal_ratings (session, song_id, rating, comparisons, wins)
         VALUES (?1, ?2, ?3, 1, ?4)
         ON CONFLICT(session, song_id) DO UPDATE SET
            rating = excluded.rating,
            comparisons = comparisons + 1,
            wins = wins + excluded.wins",
    )
    .bind(session)
    .bind(id)
    .bind(new_rating)
    .bind(i64::from(won))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn bump_affinity(
    conn: &mut SqliteConnection,
    session: &str,
    genre: &str,
    won: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO genre_affinity (session, genre, wins, comparisons)
         VALUES (?1, ?2, ?3, 1)
         ON CONFLICT(session, genre) DO UPDATE SET
            wins = wins + excluded.wins,
            comparisons = comparisons + 1",
    )
    .bind(session)
    .bind(genre)
    .bind(i64::from(won))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Genre tallies of one session.
pub async fn get_affinity(
    pool: &SqlitePool,
    session: &str,
) -> Result<Vec<(String, AffinityRecord)>, sqlx::Error> {
    let rows = sqlx::query("SELECT genre, wins, comparisons FROM genre_affinity WHERE session = ?1")
        .bind(session)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|r| {
            (
                r.get::<String, _>("genre"),
                AffinityRecord {
                    wins: r.get::<i32, _>("wins") as u32,
                    comparisons: r.get::<i32, _>("comparisons") as u32,
                },
            )
        })
        .collect())
}

/// Append a pair and drop everything older than the newest `cap` for that session.
async fn push_recent_pair(
    conn: &mut SqliteConnection,
    session: &str,
    (winner_id, loser_id): Pair,
    cap: usize,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO recent_pairs (session, winner_id, loser_id) VALUES (?1, ?2, ?3)")
        .bind(session)
        .bind(winner_id)
        .bind(loser_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        "DELETE FROM recent_pairs
         WHERE session = ?1 AND id NOT IN (
            SELECT id FROM recent_pairs WHERE session = ?1 ORDER BY id DESC LIMIT ?2
         )",
    )
    .bind(session)
    .bind(cap as i64)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Recent pairs of one session, oldest first.
pub async fn get_recent_pairs(pool: &SqlitePool, session: &str) -> Result<Vec<Pair>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT winner_id, loser_id FROM recent_pairs WHERE session = ?1 ORDER BY id ASC",
    )
    .bind(session)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| (r.get::<i64, _>("winner_id"), r.get::<i64, _>("loser_id")))
        .collect())
}

/// Rating store backed by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// A SQLite transaction that holds the database write lock from the start.
pub struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
}

impl RatingStore for SqliteStore {
    type Tx = SqliteTx;

    async fn register_songs(&self, ids: &[SongId]) -> Result<()> {
        register_songs(&self.pool, ids)
            .await
            .map_err(BattleError::storage)
    }

    async fn global_ratings(&self) -> Result<HashMap<SongId, GlobalRating>> {
        get_global_ratings(&self.pool)
            .await
            .map_err(BattleError::storage)
    }

    async fn personal_ratings(&self, session: &str) -> Result<HashMap<SongId, PersonalRating>> {
        get_personal_ratings(&self.pool, session)
            .await
            .map_err(BattleError::storage)
    }

    async fn recent_pairs(&self, session: &str) -> Result<Vec<Pair>> {
        get_recent_pairs(&self.pool, session)
            .await
            .map_err(BattleError::storage)
    }

    async fn affinity(&self, session: &str) -> Result<Vec<(String, AffinityRecord)>> {
        get_affinity(&self.pool, session)
            .await
            .map_err(BattleError::storage)
    }

    async fn begin(&self) -> Result<SqliteTx> {
        let mut tx = self.pool.begin().await.map_err(BattleError::storage)?;
        // Take the write lock before any rating is read, so a concurrent outcome
        // on the same songs waits instead of reading a stale rating.
        sqlx::query("UPDATE songs SET rating = rating WHERE id = -1")
            .execute(&mut *tx)
            .await
            .map_err(BattleError::storage)?;
        Ok(SqliteTx { tx })
    }
}

impl OutcomeTx for SqliteTx {
    async fn global_rating(&mut self, id: SongId) -> Result<i32> {
        get_global_rating(&mut self.tx, id)
            .await
            .map_err(BattleError::storage)
    }

    async fn apply_global_update(&mut self, id: SongId, new_rating: i32, won: bool) -> Result<()> {
        update_global_rating(&mut self.tx, id, new_rating, won)
            .await
            .map_err(BattleError::storage)
    }

    async fn personal_rating_or_init(&mut self, session: &str, id: SongId) -> Result<i32> {
        get_or_init_personal_rating(&mut self.tx, session, id)
            .await
            .map_err(BattleError::storage)
    }

    async fn apply_personal_update(
        &mut self,
        session: &str,
        id: SongId,
        new_rating: i32,
        won: bool,
    ) -> Result<()> {
        update_personal_rating(&mut self.tx, session, id, new_rating, won)
            .await
            .map_err(BattleError::storage)
    }

    async fn record_affinity(&mut self, session: &str, genre: &str, won: bool) -> Result<()> {
        bump_affinity(&mut self.tx, session, genre, won)
            .await
            .map_err(BattleError::storage)
    }

    async fn push_recent(&mut self, session: &str, pair: Pair, cap: usize) -> Result<()> {
        push_recent_pair(&mut self.tx, session, pair, cap)
            .await
            .map_err(BattleError::storage)
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(BattleError::storage)
    }
}
