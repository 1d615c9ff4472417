use std::collections::HashMap;

use rand::RngExt;
use tracing::debug;

use crate::catalog::{Catalog, Song, SongId};
use crate::config::MatchConfig;
use crate::elo::DEFAULT_RATING;
use crate::error::{BattleError, Result};
use crate::protocol::{BattleResponse, SongCard};
use crate::recency::{Pair, contested_ids};
use crate::store::{GlobalRating, PersonalRating, RatingStore};

/// Ratings as one session sees them: its personal rating where it has one, else the global one.
#[derive(Debug, Clone, Copy)]
pub struct RatingView<'a> {
    global: &'a HashMap<SongId, GlobalRating>,
    personal: &'a HashMap<SongId, PersonalRating>,
}

impl<'a> RatingView<'a> {
    pub fn new(
        global: &'a HashMap<SongId, GlobalRating>,
        personal: &'a HashMap<SongId, PersonalRating>,
    ) -> Self {
        Self { global, personal }
    }

    pub fn effective(&self, id: SongId) -> i32 {
        self.personal
            .get(&id)
            .map(|p| p.rating)
            .or_else(|| self.global.get(&id).map(|g| g.rating))
            .unwrap_or(DEFAULT_RATING)
    }

    pub fn card(&self, song: &Song) -> SongCard {
        let global = self.global.get(&song.id).copied().unwrap_or_default();
        SongCard::new(song, global, self.personal.get(&song.id).copied())
    }
}

fn rating_gap(a: i32, b: i32) -> i64 {
    (i64::from(a) - i64::from(b)).abs()
}

/// Choose two distinct songs for the next battle.
///
/// A wildcard draw pairs any two songs. Otherwise a random seed song is taken from
/// the songs the session has not seen recently, and its opponent from the first
/// rating window that has anyone in it, falling back to any remaining song.
/// The returned order is the display order and is itself random.
pub fn select_pair<'c, R>(
    songs: &'c [Song],
    view: &RatingView<'_>,
    recent: &[Pair],
    config: &MatchConfig,
    rng: &mut R,
) -> Result<(&'c Song, &'c Song)>
where
    R: RngExt + ?Sized,
{
    if songs.len() < 2 {
        return Err(BattleError::InsufficientCatalog(songs.len()));
    }

    if rng.random_bool(config.wildcard_chance()) {
        let first = rng.random_range(0..songs.len());
        let mut second = rng.random_range(0..songs.len() - 1);
        if second >= first {
            second += 1;
        }
        debug!(left = songs[first].id, right = songs[second].id, "wildcard battle");
        return Ok((&songs[first], &songs[second]));
    }

    let seen = contested_ids(recent, config.recency_cap);
    let mut available: Vec<&Song> = songs.iter().filter(|s| !seen.contains(&s.id)).collect();
    if available.len() < 2 {
        available = songs.iter().collect();
    }

    let seed = available[rng.random_range(0..available.len())];
    let seed_rating = view.effective(seed.id);
    let others: Vec<&Song> = available
        .iter()
        .copied()
        .filter(|s| s.id != seed.id)
        .collect();

    let mut candidates = Vec::new();
    for &window in &config.rating_windows {
        candidates = others
            .iter()
            .copied()
            .filter(|s| rating_gap(view.effective(s.id), seed_rating) <= i64::from(window))
            .collect();
        if !candidates.is_empty() {
            debug!(seed = seed.id, window, candidates = candidates.len(), "windowed battle");
            break;
        }
    }
    if candidates.is_empty() {
        debug!(seed = seed.id, "no opponent in any window, pairing with anyone");
        candidates = others;
    }

    let opponent = candidates[rng.random_range(0..candidates.len())];
    if rng.random_bool(0.5) {
        Ok((seed, opponent))
    } else {
        Ok((opponent, seed))
    }
}

/// Load a session's view from the store and pick its next battle.
pub async fn next_battle<S: RatingStore>(
    store: &S,
    catalog: &Catalog,
    config: &MatchConfig,
    session: &str,
) -> Result<BattleResponse> {
    if catalog.len() < 2 {
        return Err(BattleError::InsufficientCatalog(catalog.len()));
    }

    let global = store.global_ratings().await?;
    let personal = store.personal_ratings(session).await?;
    let recent = store.recent_pairs(session).await?;

    let view = RatingView::new(&global, &personal);
    let (left, right) = select_pair(catalog.songs(), &view, &recent, config, &mut rand::rng())?;

    Ok(BattleResponse {
        left: view.card(left),
        right: view.card(right),
    })
}
