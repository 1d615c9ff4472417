use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use songbattle_core::affinity::AffinityRecord;
use songbattle_core::recency::{Pair, RecentPairs};
use songbattle_core::store::{GlobalRating, OutcomeTx, PersonalRating, RatingStore};
use songbattle_core::{DEFAULT_RATING, Result, SongId};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    songs: HashMap<SongId, GlobalRating>,
    personal: HashMap<(String, SongId), PersonalRating>,
    recent: HashMap<String, RecentPairs>,
    affinity: HashMap<(String, String), AffinityRecord>,
}

impl MemoryState {
    fn global_rating(&self, id: SongId) -> i32 {
        self.songs
            .get(&id)
            .map(|r| r.rating)
            .unwrap_or(DEFAULT_RATING)
    }
}

/// Rating store kept in process memory. State is lost on restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Holds the store lock for its whole life and writes into a scratch copy,
/// which replaces the live state on commit.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl RatingStore for MemoryStore {
    type Tx = MemoryTx;

    async fn register_songs(&self, ids: &[SongId]) -> Result<()> {
        let mut state = self.state.lock().await;
        for &id in ids {
            state.songs.entry(id).or_default();
        }
        Ok(())
    }

    async fn global_ratings(&self) -> Result<HashMap<SongId, GlobalRating>> {
        Ok(self.state.lock().await.songs.clone())
    }

    async fn personal_ratings(&self, session: &str) -> Result<HashMap<SongId, PersonalRating>> {
        let state = self.state.lock().await;
        Ok(state
            .personal
            .iter()
            .filter(|((s, _), _)| s == session)
            .map(|((_, id), record)| (*id, *record))
            .collect())
    }

    async fn recent_pairs(&self, session: &str) -> Result<Vec<Pair>> {
        let state = self.state.lock().await;
        Ok(state
            .recent
            .get(session)
            .map(RecentPairs::to_vec)
            .unwrap_or_default())
    }

    async fn affinity(&self, session: &str) -> Result<Vec<(String, AffinityRecord)>> {
        let state = self.state.lock().await;
        Ok(state
            .affinity
            .iter()
            .filter(|((s, _), _)| s == session)
            .map(|((_, genre), record)| (genre.clone(), *record))
            .collect())
    }

    async fn begin(&self) -> Result<MemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx { guard, working })
    }
}

impl OutcomeTx for MemoryTx {
    async fn global_rating(&mut self, id: SongId) -> Result<i32> {
        Ok(self.working.global_rating(id))
    }

    async fn apply_global_update(&mut self, id: SongId, new_rating: i32, won: bool) -> Result<()> {
        self.working
            .songs
            .entry(id)
            .or_default()
            .apply(new_rating, won);
        Ok(())
    }

    async fn personal_rating_or_init(&mut self, session: &str, id: SongId) -> Result<i32> {
        let seeded = self.working.global_rating(id);
        let record = self
            .working
            .personal
            .entry((session.to_string(), id))
            .or_insert_with(|| PersonalRating::seeded(seeded));
        Ok(record.rating)
    }

    async fn apply_personal_update(
        &mut self,
        session: &str,
        id: SongId,
        new_rating: i32,
        won: bool,
    ) -> Result<()> {
        let seeded = self.working.global_rating(id);
        self.working
            .personal
            .entry((session.to_string(), id))
            .or_insert_with(|| PersonalRating::seeded(seeded))
            .apply(new_rating, won);
        Ok(())
    }

    async fn record_affinity(&mut self, session: &str, genre: &str, won: bool) -> Result<()> {
        self.working
            .affinity
            .entry((session.to_string(), genre.to_string()))
            .or_default()
            .tally(won);
        Ok(())
    }

    async fn push_recent(&mut self, session: &str, pair: Pair, cap: usize) -> Result<()> {
        let recent = self
            .working
            .recent
            .entry(session.to_string())
            .or_insert_with(|| RecentPairs::new(cap));
        if recent.capacity() != cap {
            *recent = RecentPairs::from_pairs(cap, recent.to_vec());
        }
        recent.push(pair);
        Ok(())
    }

    async fn commit(mut self) -> Result<()> {
        *self.guard = self.working;
        Ok(())
    }
}
