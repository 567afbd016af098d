use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[sea_orm(string_value = "agent")]
    Agent,
    #[sea_orm(string_value = "property_owner")]
    PropertyOwner,
    #[sea_orm(string_value = "supervisor")]
    Supervisor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Agent => "agent",
            Role::PropertyOwner => "property_owner",
            Role::Supervisor => "supervisor",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "INACTIVE")]
    Inactive,
}

/// A login identity: agent, supervisor, or property owner.
///
/// Never carries a plaintext password; provisioned owners receive theirs
/// once, through `provisioning::IssuedCredential`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "app_user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub status: Status,
    /// The apartment this identity is linked to as owner or resident.
    pub apartment_id: Option<Uuid>,
    pub last_login_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::agent::Entity")]
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
