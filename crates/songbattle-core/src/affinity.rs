use serde::{Deserialize, Serialize};

/// Per-session win/loss tally for one genre.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinityRecord {
    pub wins: u32,
    pub comparisons: u32,
}

impl AffinityRecord {
    /// Count one comparison, and a win if the genre's song was preferred.
    pub fn tally(&mut self, won: bool) {
        self.comparisons += 1;
        if won {
            self.wins += 1;
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.comparisons == 0 {
            0.0
        } else {
            self.wins as f64 / self.comparisons as f64
        }
    }
}

/// Order genre tallies for reporting: win rate descending, then genre name.
pub fn sort_by_preference(records: &mut [(String, AffinityRecord)]) {
    records.sort_by(|(a_genre, a), (b_genre, b)| {
        b.win_rate()
            .total_cmp(&a.win_rate())
            .then_with(|| a_genre.cmp(b_genre))
    });
}
