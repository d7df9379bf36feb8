//! Property-based tests for the action voting state machine.

use chrono::Utc;
use proptest::prelude::*;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::voting::state::ActionState;
use crate::voting::types::ActionStatus;
use potluck_shared::types::{ActionId, UserId};

fn member_ids(n: usize) -> Vec<UserId> {
    (1..=n)
        .map(|i| UserId::from_uuid(Uuid::from_u128(i as u128)))
        .collect()
}

/// Group size plus one approve/reject choice per member other than the initiator.
fn arb_group_votes() -> impl Strategy<Value = (usize, Vec<bool>)> {
    (1usize..=9).prop_flat_map(|n| (Just(n), prop::collection::vec(any::<bool>(), n - 1)))
}

/// Applies every vote, ignoring rejections once the action has resolved.
fn run(n: usize, votes: &[(usize, bool)]) -> ActionState {
    let ids = member_ids(n);
    let mut state = ActionState::open(ActionId::from_uuid(Uuid::nil()), &ids, ids[0], Utc::now())
        .unwrap();
    for &(index, approve) in votes {
        let _ = state.cast_vote(ids[index], approve, &ids, Utc::now());
    }
    state
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Once every ballot is cast the outcome is the same for any arrival order.
    #[test]
    fn prop_outcome_independent_of_order(
        (n, choices) in arb_group_votes(),
        seed in any::<u64>(),
    ) {
        let votes: Vec<(usize, bool)> = choices.iter().enumerate().map(|(i, &a)| (i + 1, a)).collect();

        let mut shuffled = votes.clone();
        // Deterministic Fisher-Yates driven by the seed.
        let mut state = seed;
        for i in (1..shuffled.len()).rev() {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let j = usize::try_from(state >> 33).unwrap() % (i + 1);
            shuffled.swap(i, j);
        }

        let forward = run(n, &votes);
        let permuted = run(n, &shuffled);
        prop_assert_eq!(forward.status, permuted.status);
        prop_assert!(forward.status.is_terminal());

        let approvals = 1 + choices.iter().filter(|&&a| a).count();
        let expected = if approvals >= n / 2 + 1 {
            ActionStatus::Confirmed
        } else {
            ActionStatus::Rejected
        };
        prop_assert_eq!(forward.status, expected);
    }

    /// A terminal status never changes, whatever arrives afterwards.
    #[test]
    fn prop_terminal_status_is_sticky((n, choices) in arb_group_votes()) {
        let ids = member_ids(n);
        let mut state = ActionState::open(ActionId::new(), &ids, ids[0], Utc::now()).unwrap();
        let mut resolved: Option<ActionStatus> = state.status.is_terminal().then_some(state.status);

        for (i, approve) in choices.into_iter().enumerate() {
            let result = state.cast_vote(ids[i + 1], approve, &ids, Utc::now());
            match resolved {
                Some(status) => {
                    prop_assert!(matches!(result, Err(LedgerError::ActionClosed(_))));
                    prop_assert_eq!(state.status, status);
                }
                None => {
                    let status = result.unwrap();
                    if status.is_terminal() {
                        resolved = Some(status);
                    }
                }
            }
        }
    }

    /// Repeating a vote is rejected and never moves the counts.
    #[test]
    fn prop_duplicate_vote_rejected(n in 3usize..=9, first in any::<bool>(), second in any::<bool>()) {
        let ids = member_ids(n);
        let mut state = ActionState::open(ActionId::new(), &ids, ids[0], Utc::now()).unwrap();
        let _ = state.cast_vote(ids[1], first, &ids, Utc::now());
        let before = state.tally();

        let result = state.cast_vote(ids[1], second, &ids, Utc::now());
        let is_duplicate = matches!(result, Err(LedgerError::DuplicateVote { .. }));
        prop_assert!(is_duplicate);
        prop_assert_eq!(state.tally(), before);
    }
}

#[test]
fn test_three_of_five_confirms_on_third_approval() {
    let ids = member_ids(5);
    let mut state = ActionState::open(ActionId::new(), &ids, ids[0], Utc::now()).unwrap();
    assert_eq!(state.required_votes, 3);

    assert_eq!(
        state.cast_vote(ids[1], false, &ids, Utc::now()).unwrap(),
        ActionStatus::Pending
    );
    assert_eq!(
        state.cast_vote(ids[2], true, &ids, Utc::now()).unwrap(),
        ActionStatus::Pending
    );
    assert_eq!(
        state.cast_vote(ids[3], true, &ids, Utc::now()).unwrap(),
        ActionStatus::Confirmed
    );

    // The last ballot stays uncast and cannot reopen the action.
    assert!(matches!(
        state.cast_vote(ids[4], false, &ids, Utc::now()),
        Err(LedgerError::ActionClosed(_))
    ));
    assert_eq!(state.status, ActionStatus::Confirmed);
    assert_eq!(state.tally().outstanding(), 1);
}
