//! Vote-driven state machine for a single pending action.

use chrono::{DateTime, Utc};
use potluck_shared::types::{ActionId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::voting::tally::{Tally, required_votes};
use crate::voting::types::ActionStatus;

/// One member's ballot on an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    /// Member holding the ballot.
    pub voter: UserId,
    /// `Some(true)` approve, `Some(false)` reject, `None` not yet cast.
    pub vote: Option<bool>,
    /// When the vote was cast.
    pub cast_at: Option<DateTime<Utc>>,
}

impl Ballot {
    /// An uncast ballot.
    #[must_use]
    pub const fn open(voter: UserId) -> Self {
        Self {
            voter,
            vote: None,
            cast_at: None,
        }
    }

    /// Returns true once a vote has been recorded.
    #[must_use]
    pub const fn is_cast(&self) -> bool {
        self.vote.is_some()
    }
}

/// Voting state of a pending action.
///
/// Ballots are issued once, to the members present at proposal time, and the
/// threshold is fixed then. Every vote recomputes the tally and the status
/// follows from it; a terminal status is never left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionState {
    /// Action identifier.
    pub id: ActionId,
    /// Current status.
    pub status: ActionStatus,
    /// Approvals needed to confirm.
    pub required_votes: u32,
    /// Ballots in member order.
    pub ballots: Vec<Ballot>,
}

impl ActionState {
    /// Opens voting among `members`, with the initiator's approval already cast.
    ///
    /// A single-member group is therefore confirmed on the spot.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Forbidden` if the initiator is not a member.
    pub fn open(
        id: ActionId,
        members: &[UserId],
        initiator: UserId,
        now: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        let mut voters = members.to_vec();
        voters.sort_unstable();
        voters.dedup();

        if !voters.contains(&initiator) {
            return Err(LedgerError::Forbidden(format!(
                "user {initiator} is not a member of this group"
            )));
        }

        let eligible = u32::try_from(voters.len())
            .map_err(|_| LedgerError::Validation("group is too large to vote".to_string()))?;

        let ballots = voters
            .into_iter()
            .map(|voter| {
                if voter == initiator {
                    Ballot {
                        voter,
                        vote: Some(true),
                        cast_at: Some(now),
                    }
                } else {
                    Ballot::open(voter)
                }
            })
            .collect();

        let mut state = Self {
            id,
            status: ActionStatus::Pending,
            required_votes: required_votes(eligible),
            ballots,
        };
        state.status = state.tally().outcome();
        Ok(state)
    }

    /// Current vote counts.
    #[must_use]
    pub fn tally(&self) -> Tally {
        Tally::count(self.ballots.iter().map(|b| b.vote), self.required_votes)
    }

    /// Vote counts given the group's current `members`.
    ///
    /// Uncast ballots of holders who have left can never be cast and are
    /// counted as forfeited.
    #[must_use]
    pub fn tally_among(&self, members: &[UserId]) -> Tally {
        let forfeited = self
            .ballots
            .iter()
            .filter(|b| !b.is_cast() && !members.contains(&b.voter))
            .count();
        self.tally()
            .with_forfeited(u32::try_from(forfeited).unwrap_or(u32::MAX))
    }

    /// Re-derives a pending status after the membership changed.
    ///
    /// Only rejection can follow: leaving never adds approvals.
    pub fn reassess(&mut self, members: &[UserId]) -> ActionStatus {
        if !self.status.is_terminal() {
            self.status = self.tally_among(members).outcome();
        }
        self.status
    }

    /// Returns true if `voter` holds a ballot they have not cast yet.
    #[must_use]
    pub fn awaits_vote_from(&self, voter: UserId) -> bool {
        !self.status.is_terminal()
            && self
                .ballots
                .iter()
                .any(|b| b.voter == voter && !b.is_cast())
    }

    /// Records a vote and returns the resulting status.
    ///
    /// `members` is the group's membership at cast time; a ballot alone is
    /// not enough once the voter has left the group. Votes cast earlier by
    /// members who have since left stay counted.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the voter holds no ballot or is no longer a member
    /// - `DuplicateVote` if the voter already voted
    /// - `ActionClosed` if the action is already resolved
    pub fn cast_vote(
        &mut self,
        voter: UserId,
        approve: bool,
        members: &[UserId],
        now: DateTime<Utc>,
    ) -> LedgerResult<ActionStatus> {
        let status = self.status;
        let action = self.id.into_inner();

        let ballot = self
            .ballots
            .iter_mut()
            .find(|b| b.voter == voter)
            .ok_or_else(|| {
                LedgerError::Forbidden(format!("user {voter} is not eligible to vote on this action"))
            })?;

        if ballot.is_cast() {
            return Err(LedgerError::DuplicateVote {
                action,
                voter: voter.into_inner(),
            });
        }
        if status.is_terminal() {
            return Err(LedgerError::ActionClosed(action));
        }
        if !members.contains(&voter) {
            return Err(LedgerError::Forbidden(format!(
                "user {voter} is no longer a member of this group"
            )));
        }

        ballot.vote = Some(approve);
        ballot.cast_at = Some(now);

        self.status = self.tally_among(members).outcome();
        Ok(self.status)
    }
}
