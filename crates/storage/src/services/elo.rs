//! Pairwise ELO update.
//!
//! Expected score: `E_a = 1 / (1 + 10^((R_b - R_a) / 400))`, and the winner
//! scores 1, the loser 0: `R' = R + K · (S - E)`. Stored ratings keep two
//! decimals.

use crate::models::Winner;

/// Probability that a player rated `rating` beats one rated `opponent`.
pub fn expected_score(rating: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - rating) / 400.0))
}

/// New ratings of both competitors after one comparison.
pub fn compute_update(rating_a: f64, rating_b: f64, winner: Winner, k_factor: u32) -> (f64, f64) {
    let k = f64::from(k_factor);

    let expected_a = expected_score(rating_a, rating_b);
    let expected_b = expected_score(rating_b, rating_a);

    let (actual_a, actual_b) = match winner {
        Winner::First => (1.0, 0.0),
        Winner::Second => (0.0, 1.0),
    };

    (
        round_rating(rating_a + k * (actual_a - expected_a)),
        round_rating(rating_b + k * (actual_b - expected_b)),
    )
}

pub fn round_rating(rating: f64) -> f64 {
    (rating * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATINGS: [f64; 7] = [0.0, 612.5, 984.0, 1000.0, 1016.0, 1400.25, 2200.0];

    #[test]
    fn test_expected_scores_sum_to_one() {
        for a in RATINGS {
            for b in RATINGS {
                let sum = expected_score(a, b) + expected_score(b, a);
                assert!((sum - 1.0).abs() < 1e-12, "a={a} b={b} sum={sum}");
            }
        }
    }

    #[test]
    fn test_equal_ratings_expect_half() {
        assert_eq!(expected_score(1000.0, 1000.0), 0.5);
    }

    #[test]
    fn test_update_is_zero_sum() {
        for a in RATINGS {
            for b in RATINGS {
                for winner in [Winner::First, Winner::Second] {
                    let (new_a, new_b) = compute_update(a, b, winner, 32);
                    let drift = (new_a - a) + (new_b - b);
                    assert!(drift.abs() <= 0.01 + 1e-9, "a={a} b={b} drift={drift}");
                }
            }
        }
    }

    #[test]
    fn test_winner_gains_and_loser_drops() {
        for a in [800.0, 1000.0, 1150.5] {
            for b in [800.0, 1000.0, 1150.5] {
                let (new_a, new_b) = compute_update(a, b, Winner::First, 32);
                assert!(new_a > a);
                assert!(new_b < b);

                let (new_a, new_b) = compute_update(a, b, Winner::Second, 32);
                assert!(new_a < a);
                assert!(new_b > b);
            }
        }
    }

    #[test]
    fn test_overwhelming_favourite_never_loses_points_by_winning() {
        let (new_a, new_b) = compute_update(3000.0, 0.0, Winner::First, 32);
        assert!(new_a >= 3000.0);
        assert!(new_b <= 0.0);
    }

    #[test]
    fn test_first_vote_between_newcomers() {
        assert_eq!(
            compute_update(1000.0, 1000.0, Winner::First, 32),
            (1016.0, 984.0)
        );
        assert_eq!(
            compute_update(1000.0, 1000.0, Winner::Second, 16),
            (992.0, 1008.0)
        );
    }

    #[test]
    fn test_upset_moves_more_than_expected_win() {
        let (underdog, _) = compute_update(1000.0, 1016.0, Winner::First, 32);
        let (favourite, _) = compute_update(1016.0, 1000.0, Winner::First, 32);
        assert!(underdog - 1000.0 > favourite - 1016.0);
        assert_eq!(underdog, 1016.74);
    }

    #[test]
    fn test_rounding_to_two_decimals() {
        assert_eq!(round_rating(1016.7361), 1016.74);
        assert_eq!(round_rating(983.2639), 983.26);
    }
}
