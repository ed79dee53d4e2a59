//! Payout calculation for a closed round.
//!
//! Pure integer arithmetic, truncating division in a fixed order:
//! `average = pool / n`, `target = 2 * average / 3`,
//! `fee = pool * numerator / denominator`, `reward = pool - fee`.

use crate::{GameError, Result};
use guess23_core::{FeePolicy, Wei};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// Position of the winning entry, equal to its join sequence.
    pub winner_index: usize,
    pub average: Wei,
    pub target: Wei,
    pub fee: Wei,
    pub reward: Wei,
}

/// Computes the outcome for `stakes` in join order.
///
/// # Panics
///
/// Panics if `stakes` is empty. The engine only settles full rounds, and
/// `max_players >= 1`.
pub fn calculate(stakes: &[Wei], total_pool: Wei, fee_policy: &FeePolicy) -> Result<Payout> {
    assert!(!stakes.is_empty(), "payout requested for a round with no entries");

    let average = Wei::from_wei(total_pool.to_wei() / stakes.len() as u128);
    let target = target_for(average)?;
    let winner_index = determine_winner(stakes, target);

    let fee = fee_policy
        .fee_for(total_pool)
        .ok_or_else(|| GameError::overflow(format!("fee on pool {}", total_pool)))?;
    let reward = total_pool
        .checked_sub(fee)
        .ok_or_else(|| GameError::overflow(format!("fee {} exceeds pool {}", fee, total_pool)))?;

    tracing::debug!(
        "Payout: pool={} average={} target={} winner_index={} fee={} reward={}",
        total_pool,
        average,
        target,
        winner_index,
        fee,
        reward
    );

    Ok(Payout {
        winner_index,
        average,
        target,
        fee,
        reward,
    })
}

/// `floor(2 * average / 3)`, multiplying first.
pub fn target_for(average: Wei) -> Result<Wei> {
    average
        .checked_mul(2)
        .and_then(|doubled| doubled.checked_div(3))
        .ok_or_else(|| GameError::overflow(format!("target for average {}", average)))
}

/// Index of the stake closest to `target`. Equal distances go to the
/// earliest index.
pub fn determine_winner(stakes: &[Wei], target: Wei) -> usize {
    let mut best = 0;
    let mut best_distance = stakes[0].abs_diff(target);

    for (index, stake) in stakes.iter().enumerate().skip(1) {
        let distance = stake.abs_diff(target);
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wei(values: &[u128]) -> Vec<Wei> {
        values.iter().copied().map(Wei::from_wei).collect()
    }

    fn pool(stakes: &[Wei]) -> Wei {
        Wei::checked_sum(stakes.iter().copied()).unwrap()
    }

    #[test]
    fn test_first_entrant_closest() {
        let stakes = wei(&[100, 200, 300]);
        let payout = calculate(&stakes, pool(&stakes), &FeePolicy::default()).unwrap();

        assert_eq!(payout.average, Wei::from_wei(200));
        assert_eq!(payout.target, Wei::from_wei(133));
        assert_eq!(payout.winner_index, 0);
        assert_eq!(payout.fee, Wei::from_wei(6));
        assert_eq!(payout.reward, Wei::from_wei(594));
    }

    #[test]
    fn test_tie_goes_to_earliest() {
        let stakes = wei(&[150, 150, 151]);
        let payout = calculate(&stakes, pool(&stakes), &FeePolicy::default()).unwrap();

        assert_eq!(payout.average, Wei::from_wei(150));
        assert_eq!(payout.target, Wei::from_wei(100));
        assert_eq!(payout.winner_index, 0);
    }

    #[test]
    fn test_tie_on_both_sides_of_target() {
        // target = floor(2 * floor(300 / 3) / 3) = 66; 56 and 76 are both 10 away
        let stakes = wei(&[76, 56, 168]);
        let payout = calculate(&stakes, pool(&stakes), &FeePolicy::default()).unwrap();

        assert_eq!(payout.target, Wei::from_wei(66));
        assert_eq!(payout.winner_index, 0);
    }

    #[test]
    fn test_later_entry_wins_when_strictly_closer() {
        let stakes = wei(&[1000, 10, 20]);
        let payout = calculate(&stakes, pool(&stakes), &FeePolicy::default()).unwrap();
        assert_eq!(payout.average, Wei::from_wei(343));
        assert_eq!(payout.target, Wei::from_wei(228));
        assert_eq!(payout.winner_index, 2);
    }

    #[test]
    fn test_single_entrant_wins() {
        let stakes = wei(&[1]);
        let payout = calculate(&stakes, pool(&stakes), &FeePolicy::default()).unwrap();

        assert_eq!(payout.winner_index, 0);
        assert_eq!(payout.target, Wei::ZERO);
        assert_eq!(payout.fee, Wei::ZERO);
        assert_eq!(payout.reward, Wei::from_wei(1));
    }

    #[test]
    fn test_reward_plus_fee_conserves_pool() {
        for total in [1u128, 99, 100, 101, 12_345, 1_000_000_000_000_000_007] {
            let stakes = vec![Wei::from_wei(total)];
            let payout = calculate(&stakes, Wei::from_wei(total), &FeePolicy::default()).unwrap();

            assert_eq!(payout.fee, Wei::from_wei(total / 100));
            assert_eq!(
                payout.fee.checked_add(payout.reward),
                Some(Wei::from_wei(total))
            );
        }
    }

    #[test]
    fn test_custom_fee_fraction() {
        let stakes = wei(&[500, 500]);
        let policy = FeePolicy::new(3, 40);
        let payout = calculate(&stakes, pool(&stakes), &policy).unwrap();

        // floor(1000 * 3 / 40) = 75
        assert_eq!(payout.fee, Wei::from_wei(75));
        assert_eq!(payout.reward, Wei::from_wei(925));
    }

    #[test]
    fn test_fee_overflow_is_reported() {
        let half = Wei::from_wei(u128::MAX / 2);
        let err = calculate(&[half], half, &FeePolicy::new(3, 100)).unwrap_err();
        assert!(matches!(err, GameError::Overflow(_)));
    }

    #[test]
    fn test_target_overflow_is_reported() {
        assert!(target_for(Wei::from_wei(u128::MAX / 2)).is_ok());
        assert!(matches!(
            target_for(Wei::from_wei(u128::MAX)),
            Err(GameError::Overflow(_))
        ));
    }

    #[test]
    #[should_panic(expected = "no entries")]
    fn test_empty_round_is_a_contract_violation() {
        let _ = calculate(&[], Wei::ZERO, &FeePolicy::default());
    }
}
