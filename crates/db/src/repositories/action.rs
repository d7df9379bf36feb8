//! Pending action repository: proposals, ballots and resolution.
//!
//! Every change to a group's ledger starts as a pending action. Members vote
//! on it, and the vote that decides it also applies it, inside the same
//! database transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use potluck_core::notify::ActionEvent;
use potluck_core::voting::{
    ActionDetails, ActionState, ActionStatus as CoreActionStatus, ActionType as CoreActionType,
    Ballot, ExpensePayer, Tally,
};
use potluck_core::split::SplitCalculator;
use potluck_core::wallet::WalletService;
use potluck_core::{LedgerError, LedgerResult};
use potluck_shared::types::{ActionId, GroupId, UserId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::materialize::{check_member_add, check_member_remove, materialize};
use super::{db_err, find_user, is_member, member_ids, require_member, wallet_balances};
use crate::entities::sea_orm_active_enums::ActionStatus;
use crate::entities::{action_votes, groups, pending_actions, users};
use crate::locks::{LockGuard, LockKey, LockRegistry};

/// One member's ballot, with the member.
#[derive(Debug, Clone, Serialize)]
pub struct BallotView {
    /// Ballot holder.
    pub voter: users::Model,
    /// `Some(true)` approve, `Some(false)` reject, `None` not cast.
    pub vote: Option<bool>,
    /// When the vote was cast.
    pub cast_at: Option<DateTime<Utc>>,
}

/// A pending action with its payload, proposer and ballots.
#[derive(Debug, Clone, Serialize)]
pub struct ActionView {
    /// Stored row.
    pub action: pending_actions::Model,
    /// Decoded payload.
    pub details: ActionDetails,
    /// Proposer.
    pub initiator: users::Model,
    /// Ballots in member order.
    pub ballots: Vec<BallotView>,
    /// Current counts.
    pub tally: Tally,
}

impl ActionView {
    /// Current status.
    #[must_use]
    pub fn status(&self) -> CoreActionStatus {
        self.action.status.into()
    }

    /// Notification for this action.
    ///
    /// While pending it goes to the members who still have to vote; once
    /// resolved, to every ballot holder.
    #[must_use]
    pub fn event(&self) -> ActionEvent {
        let status = self.status();
        let recipients = self
            .ballots
            .iter()
            .filter(|b| status.is_terminal() || b.vote.is_none())
            .map(|b| UserId::from_uuid(b.voter.id))
            .collect();
        ActionEvent {
            action_id: ActionId::from_uuid(self.action.id),
            group_id: GroupId::from_uuid(self.action.group_id),
            action_type: self.action.action_type.into(),
            status,
            initiator: UserId::from_uuid(self.action.initiator_id),
            description: self.action.description.clone(),
            recipients,
        }
    }
}

/// Pending action repository.
#[derive(Debug, Clone)]
pub struct ActionRepository {
    db: DatabaseConnection,
    locks: LockRegistry,
}

impl ActionRepository {
    /// Creates a new action repository sharing `locks` with the wallet repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, locks: LockRegistry) -> Self {
        Self { db, locks }
    }

    /// Proposes an action in a group.
    ///
    /// Ballots go to every current member and the initiator's approval is
    /// recorded right away, so in a one-member group the action is applied
    /// before this returns.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown group, `Forbidden` for a non-member initiator
    /// - `Validation` for a malformed payload or non-member participants
    /// - `InsufficientFunds` for a wallet-paid expense the wallet cannot cover
    /// - `Conflict` / `Forbidden` from the membership guards
    pub async fn propose(
        &self,
        group_id: GroupId,
        initiator: UserId,
        details: ActionDetails,
    ) -> LedgerResult<ActionView> {
        details.validate()?;

        let action_id = ActionId::new();
        let guard = self
            .lock_for(action_id, group_id, details.action_type())
            .await?;

        let txn = self.db.begin().await.map_err(db_err)?;

        let group = require_member(&txn, group_id, initiator).await?;
        let proposer = find_user(&txn, initiator).await?;
        if proposer.is_banned || !proposer.is_active {
            return Err(LedgerError::Forbidden(format!(
                "user {initiator} cannot propose actions"
            )));
        }
        check_proposal(&txn, &group, &details).await?;

        let members = member_ids(&txn, group_id).await?;
        let now = Utc::now();
        let state = ActionState::open(action_id, &members, initiator, now)?;

        let details_json = serde_json::to_value(&details)
            .map_err(|e| LedgerError::Validation(format!("unserializable action payload: {e}")))?;
        let required_votes = i32::try_from(state.required_votes)
            .map_err(|_| LedgerError::Validation("group is too large to vote".to_string()))?;

        let action = pending_actions::ActiveModel {
            id: Set(action_id.into_inner()),
            group_id: Set(group_id.into_inner()),
            action_type: Set(details.action_type().into()),
            status: Set(state.status.into()),
            details: Set(details_json),
            description: Set(details.summary()),
            initiator_id: Set(initiator.into_inner()),
            required_votes: Set(required_votes),
            resolution_note: Set(None),
            created_at: Set(now),
            resolved_at: Set(state.status.is_terminal().then_some(now)),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        let ballots = state
            .ballots
            .iter()
            .enumerate()
            .map(|(position, ballot)| {
                Ok(action_votes::ActiveModel {
                    action_id: Set(action.id),
                    voter_id: Set(ballot.voter.into_inner()),
                    position: Set(i32::try_from(position).map_err(|_| {
                        LedgerError::Validation("group is too large to vote".to_string())
                    })?),
                    vote: Set(ballot.vote),
                    cast_at: Set(ballot.cast_at),
                })
            })
            .collect::<LedgerResult<Vec<_>>>()?;
        if !ballots.is_empty() {
            action_votes::Entity::insert_many(ballots)
                .exec_without_returning(&txn)
                .await
                .map_err(db_err)?;
        }

        if state.status == CoreActionStatus::Confirmed {
            resolve(&txn, action.clone(), &details, state.status, now).await?;
        }

        txn.commit().await.map_err(db_err)?;
        drop(guard);

        info!(
            action_id = %action_id,
            group_id = %group_id,
            action_type = %details.action_type(),
            initiator = %initiator,
            "Action proposed"
        );
        self.find(action_id).await
    }

    /// Casts `voter`'s vote on an action.
    ///
    /// The vote that decides the action applies it in the same transaction.
    /// If applying a confirmed action fails on a ledger rule (a participant
    /// left, the wallet no longer covers it), the action is rejected instead
    /// and the reason kept as its resolution note.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown action
    /// - `Forbidden` if the voter holds no ballot or has left the group
    /// - `DuplicateVote` if the voter already voted
    /// - `ActionClosed` if the action is already resolved
    pub async fn vote(
        &self,
        action_id: ActionId,
        voter: UserId,
        approve: bool,
    ) -> LedgerResult<ActionView> {
        let head = self.find_row(&self.db, action_id).await?;
        let group_id = GroupId::from_uuid(head.group_id);
        let guard = self
            .lock_for(action_id, group_id, head.action_type.into())
            .await?;

        let txn = self.db.begin().await.map_err(db_err)?;
        let action = self.find_for_update(&txn, action_id).await?;
        let (mut state, rows) = load_state(&txn, &action).await?;

        let members = member_ids(&txn, group_id).await?;
        let now = Utc::now();
        let status = state.cast_vote(voter, approve, &members, now)?;

        if let Some(row) = rows.into_iter().find(|r| r.voter_id == voter.into_inner()) {
            let mut ballot: action_votes::ActiveModel = row.into();
            ballot.vote = Set(Some(approve));
            ballot.cast_at = Set(Some(now));
            ballot.update(&txn).await.map_err(db_err)?;
        }

        debug!(action_id = %action_id, voter = %voter, approve, status = %status, "Vote cast");

        if status.is_terminal() {
            let details = decode_details(&action)?;
            resolve(&txn, action, &details, status, now).await?;
        }

        txn.commit().await.map_err(db_err)?;
        drop(guard);

        self.find(action_id).await
    }

    /// Locks an action, every other open action of the group when the action
    /// may remove a member, then the group wallet when the action touches it.
    async fn lock_for(
        &self,
        action_id: ActionId,
        group_id: GroupId,
        action_type: CoreActionType,
    ) -> LedgerResult<LockGuard> {
        let mut keys = vec![LockKey::Action(action_id)];
        if action_type == CoreActionType::MemberRemove {
            let open = pending_action_ids(&self.db, &[group_id]).await?;
            keys.extend(open.into_iter().map(LockKey::Action));
        }
        if action_type.touches_wallet() {
            keys.push(LockKey::GroupWallet(group_id));
        }
        Ok(self.locks.lock_all(keys).await)
    }

    /// Loads an action with its ballots.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown action.
    pub async fn find(&self, action_id: ActionId) -> LedgerResult<ActionView> {
        let action = self.find_row(&self.db, action_id).await?;
        self.view(action).await
    }

    /// Loads an action after checking that `user` belongs to its group.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown action, `Forbidden` for a non-member.
    pub async fn find_for_member(
        &self,
        action_id: ActionId,
        user: UserId,
    ) -> LedgerResult<ActionView> {
        let action = self.find_row(&self.db, action_id).await?;
        require_member(&self.db, GroupId::from_uuid(action.group_id), user).await?;
        self.view(action).await
    }

    /// Actions in the given groups, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        group_ids: &[GroupId],
        status: Option<CoreActionStatus>,
    ) -> LedgerResult<Vec<ActionView>> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query = pending_actions::Entity::find().filter(
            pending_actions::Column::GroupId.is_in(group_ids.iter().map(|g| g.into_inner())),
        );
        if let Some(status) = status {
            query = query.filter(pending_actions::Column::Status.eq(ActionStatus::from(status)));
        }
        let actions = query
            .order_by_desc(pending_actions::Column::CreatedAt)
            .order_by_desc(pending_actions::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        self.views(actions).await
    }

    /// Pending actions on which `user` still has to vote, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn awaiting_vote(&self, user: UserId) -> LedgerResult<Vec<ActionView>> {
        let open: Vec<uuid::Uuid> = action_votes::Entity::find()
            .filter(action_votes::Column::VoterId.eq(user.into_inner()))
            .filter(action_votes::Column::Vote.is_null())
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|b| b.action_id)
            .collect();
        if open.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = pending_actions::Entity::find()
            .filter(pending_actions::Column::Id.is_in(open))
            .filter(pending_actions::Column::Status.eq(ActionStatus::Pending))
            .order_by_asc(pending_actions::Column::CreatedAt)
            .order_by_asc(pending_actions::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut actions = Vec::with_capacity(candidates.len());
        for action in candidates {
            if is_member(&self.db, GroupId::from_uuid(action.group_id), user).await? {
                actions.push(action);
            }
        }
        self.views(actions).await
    }

    async fn find_row<C: ConnectionTrait>(
        &self,
        conn: &C,
        action_id: ActionId,
    ) -> LedgerResult<pending_actions::Model> {
        pending_actions::Entity::find_by_id(action_id.into_inner())
            .one(conn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| LedgerError::not_found("action", action_id))
    }

    /// Re-reads the action inside the transaction, row-locked where the backend supports it.
    async fn find_for_update(
        &self,
        txn: &DatabaseTransaction,
        action_id: ActionId,
    ) -> LedgerResult<pending_actions::Model> {
        let mut query = pending_actions::Entity::find_by_id(action_id.into_inner());
        if txn.get_database_backend() == DbBackend::Postgres {
            query = query.lock_exclusive();
        }
        query
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| LedgerError::not_found("action", action_id))
    }

    async fn views(&self, actions: Vec<pending_actions::Model>) -> LedgerResult<Vec<ActionView>> {
        let mut views = Vec::with_capacity(actions.len());
        for action in actions {
            views.push(self.view(action).await?);
        }
        Ok(views)
    }

    async fn view(&self, action: pending_actions::Model) -> LedgerResult<ActionView> {
        let details = decode_details(&action)?;

        let votes = action_votes::Entity::find()
            .filter(action_votes::Column::ActionId.eq(action.id))
            .order_by_asc(action_votes::Column::Position)
            .find_also_related(users::Entity)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut voters: HashMap<uuid::Uuid, users::Model> = HashMap::with_capacity(votes.len());
        let mut ballots = Vec::with_capacity(votes.len());
        for (ballot, voter) in votes {
            let voter = voter.ok_or_else(|| LedgerError::not_found("user", ballot.voter_id))?;
            voters.insert(voter.id, voter.clone());
            ballots.push(BallotView {
                voter,
                vote: ballot.vote,
                cast_at: ballot.cast_at,
            });
        }

        let initiator = match voters.remove(&action.initiator_id) {
            Some(user) => user,
            None => find_user(&self.db, UserId::from_uuid(action.initiator_id)).await?,
        };
        let required = u32::try_from(action.required_votes).unwrap_or_default();
        let tally = Tally::count(ballots.iter().map(|b| b.vote), required);

        Ok(ActionView {
            action,
            details,
            initiator,
            ballots,
            tally,
        })
    }
}

/// Rebuilds the voting state of a stored action, with its ballot rows.
async fn load_state<C: ConnectionTrait>(
    conn: &C,
    action: &pending_actions::Model,
) -> LedgerResult<(ActionState, Vec<action_votes::Model>)> {
    let action_id = ActionId::from_uuid(action.id);
    let rows = action_votes::Entity::find()
        .filter(action_votes::Column::ActionId.eq(action.id))
        .order_by_asc(action_votes::Column::Position)
        .all(conn)
        .await
        .map_err(db_err)?;

    let state = ActionState {
        id: action_id,
        status: action.status.into(),
        required_votes: u32::try_from(action.required_votes).map_err(|_| {
            LedgerError::Database(format!("action {action_id} has a negative threshold"))
        })?,
        ballots: rows
            .iter()
            .map(|row| Ballot {
                voter: UserId::from_uuid(row.voter_id),
                vote: row.vote,
                cast_at: row.cast_at,
            })
            .collect(),
    };
    Ok((state, rows))
}

/// Ids of the still pending actions in `group_ids`.
pub(crate) async fn pending_action_ids<C: ConnectionTrait>(
    conn: &C,
    group_ids: &[GroupId],
) -> LedgerResult<Vec<ActionId>> {
    if group_ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids = pending_actions::Entity::find()
        .filter(pending_actions::Column::GroupId.is_in(group_ids.iter().map(|g| g.into_inner())))
        .filter(pending_actions::Column::Status.eq(ActionStatus::Pending))
        .all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(|a| ActionId::from_uuid(a.id))
        .collect();
    Ok(ids)
}

/// Rejects the group's pending actions that members who left can no longer
/// carry to approval.
///
/// Runs inside the transaction that changed the membership; callers hold the
/// locks of the group's open actions.
pub(crate) async fn reject_unreachable<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
    now: DateTime<Utc>,
) -> LedgerResult<Vec<ActionId>> {
    let mut query = pending_actions::Entity::find()
        .filter(pending_actions::Column::GroupId.eq(group_id.into_inner()))
        .filter(pending_actions::Column::Status.eq(ActionStatus::Pending));
    if conn.get_database_backend() == DbBackend::Postgres {
        query = query.lock_exclusive();
    }
    let open = query.all(conn).await.map_err(db_err)?;
    if open.is_empty() {
        return Ok(Vec::new());
    }

    let members = member_ids(conn, group_id).await?;
    let mut rejected = Vec::new();
    for action in open {
        let (mut state, _) = load_state(conn, &action).await?;
        if state.reassess(&members) != CoreActionStatus::Rejected {
            continue;
        }
        let action_id = state.id;
        store_resolution(
            conn,
            action,
            CoreActionStatus::Rejected,
            Some("approval is no longer reachable after members left".to_string()),
            now,
        )
        .await?;
        rejected.push(action_id);
    }
    Ok(rejected)
}

fn decode_details(action: &pending_actions::Model) -> LedgerResult<ActionDetails> {
    serde_json::from_value(action.details.clone()).map_err(|e| {
        LedgerError::Database(format!("action {} has an unreadable payload: {e}", action.id))
    })
}

/// Proposal-time checks that depend on stored state.
async fn check_proposal<C: ConnectionTrait>(
    conn: &C,
    group: &groups::Model,
    details: &ActionDetails,
) -> LedgerResult<()> {
    let group_id = GroupId::from_uuid(group.id);
    match details {
        ActionDetails::Expense(expense) => {
            for participant in &expense.participant_ids {
                if !is_member(conn, group_id, *participant).await? {
                    return Err(LedgerError::Validation(format!(
                        "participant {participant} is not a member of the group"
                    )));
                }
            }
            match expense.payer {
                ExpensePayer::Member { user_id } => {
                    if !is_member(conn, group_id, user_id).await? {
                        return Err(LedgerError::Validation(format!(
                            "payer {user_id} is not a member of the group"
                        )));
                    }
                }
                ExpensePayer::Wallet => {
                    let shares = SplitCalculator::split_equally(
                        expense.total_amount,
                        &expense.participant_ids,
                    )?;
                    let balances = wallet_balances(conn, group_id).await?;
                    WalletService::check_wallet_expense(&balances, &shares)?;
                }
            }
            Ok(())
        }
        ActionDetails::WalletDeposit(deposit) => {
            if is_member(conn, group_id, deposit.user_id).await? {
                Ok(())
            } else {
                Err(LedgerError::Validation(format!(
                    "user {} is not a member of the group",
                    deposit.user_id
                )))
            }
        }
        ActionDetails::MemberAdd { user_id } => check_member_add(conn, group_id, *user_id).await,
        ActionDetails::MemberRemove { user_id } => {
            check_member_remove(conn, group, *user_id).await
        }
    }
}

/// Stores a terminal status, applying the action first when it was confirmed.
async fn resolve<C: ConnectionTrait>(
    conn: &C,
    action: pending_actions::Model,
    details: &ActionDetails,
    status: CoreActionStatus,
    now: DateTime<Utc>,
) -> LedgerResult<()> {
    let (status, note) = if status == CoreActionStatus::Confirmed {
        match materialize(conn, &action, details, now).await {
            Ok(()) => (status, None),
            Err(err @ LedgerError::Database(_)) => return Err(err),
            Err(err) => {
                warn!(action_id = %action.id, error = %err, "Confirmed action could not be applied");
                (CoreActionStatus::Rejected, Some(err.to_string()))
            }
        }
    } else {
        (status, None)
    };

    let group_id = GroupId::from_uuid(action.group_id);
    store_resolution(conn, action, status, note, now).await?;

    let removed_member = matches!(details, ActionDetails::MemberRemove { .. });
    if status == CoreActionStatus::Confirmed && removed_member {
        let rejected = reject_unreachable(conn, group_id, now).await?;
        if !rejected.is_empty() {
            info!(
                group_id = %group_id,
                count = rejected.len(),
                "Open actions rejected after member left"
            );
        }
    }
    Ok(())
}

async fn store_resolution<C: ConnectionTrait>(
    conn: &C,
    action: pending_actions::Model,
    status: CoreActionStatus,
    note: Option<String>,
    now: DateTime<Utc>,
) -> LedgerResult<()> {
    let action_id = action.id;
    let mut active: pending_actions::ActiveModel = action.into();
    active.status = Set(status.into());
    active.resolved_at = Set(Some(now));
    active.resolution_note = Set(note);
    active.update(conn).await.map_err(db_err)?;

    info!(action_id = %action_id, status = %status, "Action resolved");
    Ok(())
}
