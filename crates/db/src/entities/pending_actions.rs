//! `SeaORM` Entity for pending_actions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{ActionStatus, ActionType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_actions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub group_id: Uuid,
    pub action_type: ActionType,
    pub status: ActionStatus,
    /// Serialized `ActionDetails`.
    pub details: Json,
    pub description: String,
    pub initiator_id: Uuid,
    pub required_votes: i32,
    pub resolution_note: Option<String>,
    pub created_at: DateTimeUtc,
    pub resolved_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id"
    )]
    Groups,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::InitiatorId",
        to = "super::users::Column::Id"
    )]
    Initiator,
    #[sea_orm(has_many = "super::action_votes::Entity")]
    ActionVotes,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl Related<super::action_votes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ActionVotes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
