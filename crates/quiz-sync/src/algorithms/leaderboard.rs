//! Leaderboard ranking and winner derivation from state reads.

use crate::domain::{Account, LeaderboardEntry, Wei, Winner};
use primitive_types::U256;

/// Rank scores descending. `sort_by` is stable, so ties keep read order.
pub fn rank(entries: &[(Account, U256)]) -> Vec<LeaderboardEntry> {
    let mut sorted: Vec<&(Account, U256)> = entries.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, (account, score))| LeaderboardEntry {
            rank: i + 1,
            account: *account,
            score: *score,
        })
        .collect()
}

/// Participants whose reward is above zero, in read order.
pub fn winners_from_rewards(rewards: &[(Account, U256)]) -> Vec<Winner> {
    rewards
        .iter()
        .filter(|(_, reward)| !reward.is_zero())
        .map(|(account, reward)| Winner {
            account: *account,
            reward: Wei(*reward),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn account(byte: u8) -> Account {
        Account::new([byte; 20])
    }

    #[test]
    fn test_rank_ties_keep_read_order() {
        let ranked = rank(&[
            (account(0xA), U256::from(10)),
            (account(0xB), U256::from(25)),
            (account(0xC), U256::from(10)),
        ]);
        let order: Vec<(Account, u64)> = ranked
            .iter()
            .map(|e| (e.account, e.score.as_u64()))
            .collect();
        assert_eq!(
            order,
            vec![(account(0xB), 25), (account(0xA), 10), (account(0xC), 10)]
        );
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank(&[]).is_empty());
    }

    #[test]
    fn test_winners_from_rewards() {
        let winners = winners_from_rewards(&[
            (account(1), U256::from(7)),
            (account(2), U256::zero()),
            (account(3), U256::from(7)),
        ]);
        assert_eq!(winners.len(), 2);
        assert_eq!(winners[1].account, account(3));
    }

    proptest! {
        #[test]
        fn prop_rank_sorted_and_stable(scores in proptest::collection::vec(0u64..5, 0..12)) {
            let entries: Vec<(Account, U256)> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| (account(i as u8), U256::from(*s)))
                .collect();
            let ranked = rank(&entries);
            prop_assert_eq!(ranked.len(), entries.len());
            for pair in ranked.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
                if pair[0].score == pair[1].score {
                    // account bytes encode the read index
                    prop_assert!(pair[0].account < pair[1].account);
                }
            }
        }
    }
}
