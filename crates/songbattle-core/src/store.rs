//! Storage seam for rating state.
//!
//! Reads used by matchmaking go straight to the store. Everything an outcome writes
//! goes through an [`OutcomeTx`], which either commits as a whole or, when dropped
//! uncommitted, leaves the store untouched.

use std::collections::HashMap;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::affinity::AffinityRecord;
use crate::catalog::SongId;
use crate::elo::DEFAULT_RATING;
use crate::error::Result;
use crate::recency::Pair;

/// Global rating record of a song, shared by every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalRating {
    pub rating: i32,
    /// Rating before the most recent update.
    pub previous_rating: i32,
    pub comparisons: u32,
    pub wins: u32,
}

impl Default for GlobalRating {
    fn default() -> Self {
        Self {
            rating: DEFAULT_RATING,
            previous_rating: DEFAULT_RATING,
            comparisons: 0,
            wins: 0,
        }
    }
}

impl GlobalRating {
    pub fn apply(&mut self, new_rating: i32, won: bool) {
        self.previous_rating = self.rating;
        self.rating = new_rating;
        self.comparisons += 1;
        if won {
            self.wins += 1;
        }
    }
}

/// A session's own rating of a song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalRating {
    pub rating: i32,
    pub comparisons: u32,
    pub wins: u32,
}

impl PersonalRating {
    /// Fresh record seeded from the song's current global rating.
    pub fn seeded(global_rating: i32) -> Self {
        Self {
            rating: global_rating,
            comparisons: 0,
            wins: 0,
        }
    }

    pub fn apply(&mut self, new_rating: i32, won: bool) {
        self.rating = new_rating;
        self.comparisons += 1;
        if won {
            self.wins += 1;
        }
    }
}

/// Durable record store behind matchmaking and outcome processing.
pub trait RatingStore: Send + Sync {
    type Tx: OutcomeTx;

    /// Make sure every id has a global record, creating missing ones at the default rating.
    fn register_songs(&self, ids: &[SongId]) -> impl Future<Output = Result<()>> + Send;

    fn global_ratings(&self) -> impl Future<Output = Result<HashMap<SongId, GlobalRating>>> + Send;

    /// Personal records a session already has. Never creates any.
    fn personal_ratings(
        &self,
        session: &str,
    ) -> impl Future<Output = Result<HashMap<SongId, PersonalRating>>> + Send;

    /// Pairs the session voted on most recently, oldest first.
    fn recent_pairs(&self, session: &str) -> impl Future<Output = Result<Vec<Pair>>> + Send;

    /// Genre tallies for a session, in no particular order.
    fn affinity(
        &self,
        session: &str,
    ) -> impl Future<Output = Result<Vec<(String, AffinityRecord)>>> + Send;

    /// Open a transaction for applying an outcome.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx>> + Send;

    /// Get-or-create: returns the session's rating of a song, first writing one
    /// seeded from the current global rating if the session has none.
    fn personal_rating_or_init(
        &self,
        session: &str,
        id: SongId,
    ) -> impl Future<Output = Result<i32>> + Send {
        async move {
            let mut tx = self.begin().await?;
            let rating = tx.personal_rating_or_init(session, id).await?;
            tx.commit().await?;
            Ok(rating)
        }
    }
}

/// Writes for a single outcome. Nothing is visible to other readers until `commit`.
pub trait OutcomeTx: Send + Sized {
    fn global_rating(&mut self, id: SongId) -> impl Future<Output = Result<i32>> + Send;

    /// Store a new global rating, remembering the old one as the previous rating and
    /// bumping the comparison (and, for the winner, win) counters.
    fn apply_global_update(
        &mut self,
        id: SongId,
        new_rating: i32,
        won: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    fn personal_rating_or_init(
        &mut self,
        session: &str,
        id: SongId,
    ) -> impl Future<Output = Result<i32>> + Send;

    fn apply_personal_update(
        &mut self,
        session: &str,
        id: SongId,
        new_rating: i32,
        won: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    fn record_affinity(
        &mut self,
        session: &str,
        genre: &str,
        won: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Append a pair to the session's recent pairs, keeping only the newest `cap`.
    fn push_recent(
        &mut self,
        session: &str,
        pair: Pair,
        cap: usize,
    ) -> impl Future<Output = Result<()>> + Send;

    fn commit(self) -> impl Future<Output = Result<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_apply_tracks_previous_rating() {
        let mut record = GlobalRating::default();
        record.apply(1516, true);
        assert_eq!(record.previous_rating, 1500);
        assert_eq!(record.rating, 1516);
        record.apply(1500, false);
        assert_eq!(record.previous_rating, 1516);
        assert_eq!(record.comparisons, 2);
        assert_eq!(record.wins, 1);
    }

    #[test]
    fn personal_record_starts_from_global() {
        let mut record = PersonalRating::seeded(1622);
        assert_eq!(record.rating, 1622);
        assert_eq!(record.comparisons, 0);
        record.apply(1610, false);
        assert_eq!(record, PersonalRating { rating: 1610, comparisons: 1, wins: 0 });
    }
}
