use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "apartment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// `agent.prefix` followed by the agent-scoped sequence number, e.g. `AC101`.
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub address: String,
    pub apartment_type: String,
    pub agent_id: Uuid,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::agent::Entity",
        from = "Column::AgentId",
        to = "super::agent::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Agent,
    #[sea_orm(has_many = "super::apartment_owner::Entity")]
    ApartmentOwner,
    #[sea_orm(has_many = "super::apartment_resident::Entity")]
    ApartmentResident,
}

impl Related<super::agent::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Agent.def()
    }
}

impl Related<super::apartment_owner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApartmentOwner.def()
    }
}

impl Related<super::apartment_resident::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApartmentResident.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
