//! Quorum arithmetic.
//!
//! The outcome of an action depends only on how many approvals and
//! rejections its ballots hold, never on the order they arrived in.

use serde::{Deserialize, Serialize};

use crate::voting::types::ActionStatus;

/// Simple majority of `eligible` voters.
#[must_use]
pub fn required_votes(eligible: u32) -> u32 {
    eligible / 2 + 1
}

/// Vote counts for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    /// Approvals cast.
    pub votes_for: u32,
    /// Rejections cast.
    pub votes_against: u32,
    /// Ballots issued when the action was proposed.
    pub eligible: u32,
    /// Approvals needed to confirm.
    pub required: u32,
    /// Uncast ballots whose holders have left the group.
    #[serde(default)]
    pub forfeited: u32,
}

impl Tally {
    /// Counts the cast votes in `votes`; `None` entries are uncast ballots.
    #[must_use]
    pub fn count<I>(votes: I, required: u32) -> Self
    where
        I: IntoIterator<Item = Option<bool>>,
    {
        let mut tally = Self {
            votes_for: 0,
            votes_against: 0,
            eligible: 0,
            required,
            forfeited: 0,
        };
        for vote in votes {
            tally.eligible += 1;
            match vote {
                Some(true) => tally.votes_for += 1,
                Some(false) => tally.votes_against += 1,
                None => {}
            }
        }
        tally
    }

    /// Marks `forfeited` of the outstanding ballots as no longer castable.
    #[must_use]
    pub fn with_forfeited(mut self, forfeited: u32) -> Self {
        self.forfeited = forfeited.min(self.outstanding());
        self
    }

    /// Ballots not yet cast.
    #[must_use]
    pub fn outstanding(&self) -> u32 {
        self.eligible
            .saturating_sub(self.votes_for)
            .saturating_sub(self.votes_against)
    }

    /// Most approvals the action can still collect.
    #[must_use]
    pub fn reachable(&self) -> u32 {
        self.votes_for + self.outstanding().saturating_sub(self.forfeited)
    }

    /// Status implied by the counts.
    ///
    /// Confirmed once approvals reach the threshold; rejected as soon as
    /// rejections and forfeited ballots leave too few to ever reach it.
    #[must_use]
    pub fn outcome(&self) -> ActionStatus {
        if self.votes_for >= self.required {
            ActionStatus::Confirmed
        } else if self.reachable() < self.required {
            ActionStatus::Rejected
        } else {
            ActionStatus::Pending
        }
    }
}
