use serde::{Deserialize, Serialize};

use crate::catalog::{Song, SongId};
use crate::store::{GlobalRating, PersonalRating};

/// A song as shown on one side of a battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongCard {
    #[serde(flatten)]
    pub song: Song,
    pub rating: i32,
    pub comparisons: u32,
    pub wins: u32,
    /// Present once the session has voted on this song.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_rating: Option<i32>,
}

impl SongCard {
    pub fn new(song: &Song, global: GlobalRating, personal: Option<PersonalRating>) -> Self {
        Self {
            song: song.clone(),
            rating: global.rating,
            comparisons: global.comparisons,
            wins: global.wins,
            personal_rating: personal.map(|p| p.rating),
        }
    }
}

/// Query string of `GET /battle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleQuery {
    #[serde(default)]
    pub session: String,
}

/// Response of `GET /battle`. Sides carry no meaning beyond display position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleResponse {
    pub left: SongCard,
    pub right: SongCard,
}

/// Body of `POST /outcome`. Ids are optional so a missing one is reported as an invalid outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRequest {
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub winner_id: Option<SongId>,
    #[serde(default)]
    pub loser_id: Option<SongId>,
}

/// Winner's global rating after a recorded outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeResponse {
    pub new_rating: i32,
    pub rating_delta: i32,
}

/// Ranking row returned by `/leaderboard` and `/rankings/{session}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    #[serde(flatten)]
    pub song: Song,
    pub rating: i32,
    pub comparisons: u32,
    pub wins: u32,
}

/// Genre tally returned by `/affinity/{session}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffinityEntry {
    pub genre: String,
    pub wins: u32,
    pub comparisons: u32,
    pub win_rate: f64,
}

/// Error body for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
