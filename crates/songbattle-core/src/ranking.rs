use std::collections::HashMap;

use crate::affinity::{AffinityRecord, sort_by_preference};
use crate::catalog::{Catalog, SongId};
use crate::protocol::{AffinityEntry, LeaderboardEntry};
use crate::store::{GlobalRating, PersonalRating};

fn ranked(mut rows: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    rows.sort_by(|a, b| {
        b.rating
            .cmp(&a.rating)
            .then(b.comparisons.cmp(&a.comparisons))
            .then(a.song.id.cmp(&b.song.id))
    });
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = (i + 1) as u32;
    }
    rows
}

/// Every catalog song ranked by global rating.
pub fn global_leaderboard(
    catalog: &Catalog,
    ratings: &HashMap<SongId, GlobalRating>,
) -> Vec<LeaderboardEntry> {
    let rows = catalog
        .songs()
        .iter()
        .map(|song| {
            let record = ratings.get(&song.id).copied().unwrap_or_default();
            LeaderboardEntry {
                rank: 0,
                song: song.clone(),
                rating: record.rating,
                comparisons: record.comparisons,
                wins: record.wins,
            }
        })
        .collect();
    ranked(rows)
}

/// The catalog songs a session has voted on, ranked by its personal ratings.
pub fn personal_leaderboard(
    catalog: &Catalog,
    ratings: &HashMap<SongId, PersonalRating>,
) -> Vec<LeaderboardEntry> {
    let rows = catalog
        .songs()
        .iter()
        .filter_map(|song| {
            ratings.get(&song.id).map(|record| LeaderboardEntry {
                rank: 0,
                song: song.clone(),
                rating: record.rating,
                comparisons: record.comparisons,
                wins: record.wins,
            })
        })
        .collect();
    ranked(rows)
}

pub fn affinity_report(mut records: Vec<(String, AffinityRecord)>) -> Vec<AffinityEntry> {
    sort_by_preference(&mut records);
    records
        .into_iter()
        .map(|(genre, record)| AffinityEntry {
            genre,
            wins: record.wins,
            comparisons: record.comparisons,
            win_rate: record.win_rate(),
        })
        .collect()
}
