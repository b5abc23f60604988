//! Elo rating transfer applied when a battle completes.

/// Probability that `rating` beats `opponent`.
pub fn expected_score(rating: i32, opponent: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(opponent - rating) / 400.0))
}

/// Points moved from loser to winner.
pub fn rating_delta(winner: i32, loser: i32, k_factor: f64) -> i32 {
    (k_factor * (1.0 - expected_score(winner, loser))).round() as i32
}

/// New `(winner, loser)` ratings; the loser never drops below zero.
pub fn apply_transfer(winner: i32, loser: i32, delta: i32) -> (i32, i32) {
    (winner + delta, (loser - delta).max(0))
}
