/// Rating every song starts from, and the fallback for anything without a record.
pub const DEFAULT_RATING: i32 = 1500;

/// Default K-factor for rating updates
pub const DEFAULT_K: i32 = 32;

/// Probability that a player rated `rating` is preferred over one rated `opponent_rating`.
pub fn expected_score(rating: i32, opponent_rating: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent_rating as f64 - rating as f64) / 400.0))
}

/// Calculate new ratings for a decided comparison.
/// Returns `(new_winner, new_loser)`.
///
/// Each side is rounded on its own, so the two deltas are not always exact opposites.
pub fn update_ratings(winner_rating: i32, loser_rating: i32, k: i32) -> (i32, i32) {
    let expected_win = expected_score(winner_rating, loser_rating);
    let expected_lose = 1.0 - expected_win;
    let k = k as f64;
    let new_winner = winner_rating as f64 + k * (1.0 - expected_win);
    let new_loser = loser_rating as f64 + k * (0.0 - expected_lose);
    (new_winner.round() as i32, new_loser.round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_ratings() {
        assert_eq!(update_ratings(1500, 1500, DEFAULT_K), (1516, 1484));
    }

    #[test]
    fn favorite_wins() {
        assert_eq!(update_ratings(1600, 1400, DEFAULT_K), (1608, 1392));
    }

    #[test]
    fn underdog_wins() {
        let (winner, loser) = update_ratings(1400, 1600, DEFAULT_K);
        // Underdog gains more than half of K
        assert_eq!(winner, 1424);
        assert_eq!(loser, 1576);
    }

    #[test]
    fn deltas_are_rounded_independently() {
        // Both sides land on .5: 1501.5 rounds up, 1498.5 also rounds up
        let (winner, loser) = update_ratings(1500, 1500, 3);
        assert_eq!((winner, loser), (1502, 1499));
        assert_ne!(winner - 1500, 1500 - loser);
    }

    #[test]
    fn higher_k_moves_further() {
        let (slow, _) = update_ratings(1500, 1500, 16);
        let (fast, _) = update_ratings(1500, 1500, 64);
        assert_eq!(slow, 1508);
        assert_eq!(fast, 1532);
    }

    #[test]
    fn extreme_ratings_do_not_overflow() {
        assert_eq!(update_ratings(i32::MAX, i32::MIN, DEFAULT_K), (i32::MAX, i32::MIN));
        assert_eq!(
            update_ratings(i32::MIN, i32::MAX, DEFAULT_K),
            (i32::MIN + 32, i32::MAX - 32)
        );
        assert_eq!(expected_score(i32::MIN, i32::MAX), 0.0);
    }

    #[test]
    fn expected_scores_sum_to_one() {
        let a = expected_score(1620, 1480);
        let b = expected_score(1480, 1620);
        assert!((a + b - 1.0).abs() < 1e-12);
        assert!(a > 0.5);
    }
}
