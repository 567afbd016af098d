//! Apartment and owner provisioning.
//!
//! An agent creates an apartment together with its owners in one
//! transaction: the apartment gets the next code in the agent's sequence
//! ([`code`]) and every owner gets a derived login ([`credentials`]). The
//! same service carries the ownership-checked apartment mutations and the
//! read paths used by the REST API.

pub mod code;
pub mod credentials;
mod error;
mod mutations;
mod orchestrator;
mod queries;

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::entity::{
    agent, apartment, apartment_owner, apartment_resident,
    app_user::{self, Role},
};

pub use credentials::{CredentialMinter, IssuedCredential};
pub use error::ProvisionError;
pub use queries::{AgentOverview, ApartmentDetail};

/// An authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

/// Descriptive attributes of a new apartment.
#[derive(Debug, Clone)]
pub struct ApartmentDescriptor {
    pub name: String,
    pub address: String,
    pub apartment_type: String,
}

#[derive(Debug, Clone)]
pub struct OwnerName {
    pub first_name: String,
    pub last_name: String,
}

/// An apartment with its owner and resident id sets.
#[derive(Debug, Clone)]
pub struct ApartmentRecord {
    pub apartment: apartment::Model,
    pub owner_ids: Vec<Uuid>,
    pub resident_ids: Vec<Uuid>,
}

/// Result of a successful provisioning call. The only value in the system
/// that holds owner plaintext passwords.
#[derive(Debug)]
pub struct ProvisionedApartment {
    pub apartment: ApartmentRecord,
    pub owners: Vec<IssuedCredential>,
}

#[derive(Clone)]
pub struct ApartmentService {
    db: DatabaseConnection,
    minter: CredentialMinter,
}

impl ApartmentService {
    pub fn new(db: DatabaseConnection, minter: CredentialMinter) -> Self {
        Self { db, minter }
    }
}

/// Commit on success, roll back on failure. The original error wins over a
/// failed rollback.
async fn finish<T>(
    txn: DatabaseTransaction,
    result: Result<T, ProvisionError>,
) -> Result<T, ProvisionError> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rb) = txn.rollback().await {
                tracing::error!(error = %rb, cause = %e, "rollback failed");
            }
            Err(e)
        }
    }
}

async fn resolve_agent<C: ConnectionTrait>(
    conn: &C,
    principal: &Principal,
) -> Result<agent::Model, ProvisionError> {
    agent::Entity::find()
        .filter(agent::Column::UserId.eq(principal.user_id))
        .one(conn)
        .await?
        .ok_or(ProvisionError::NotFound { entity: "agent" })
}

/// Load an apartment and check that `agent` owns it.
async fn owned_apartment<C: ConnectionTrait>(
    conn: &C,
    agent: &agent::Model,
    apartment_id: Uuid,
) -> Result<apartment::Model, ProvisionError> {
    let apartment = apartment::Entity::find_by_id(apartment_id)
        .one(conn)
        .await?
        .ok_or(ProvisionError::NotFound {
            entity: "apartment",
        })?;

    if apartment.agent_id != agent.id {
        return Err(ProvisionError::Forbidden);
    }
    Ok(apartment)
}

async fn find_user<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<app_user::Model, ProvisionError> {
    app_user::Entity::find_by_id(user_id)
        .one(conn)
        .await?
        .ok_or(ProvisionError::NotFound { entity: "user" })
}

async fn load_record<C: ConnectionTrait>(
    conn: &C,
    apartment: apartment::Model,
) -> Result<ApartmentRecord, ProvisionError> {
    let owner_ids: Vec<Uuid> = apartment_owner::Entity::find()
        .select_only()
        .column(apartment_owner::Column::UserId)
        .filter(apartment_owner::Column::ApartmentId.eq(apartment.id))
        .order_by_asc(apartment_owner::Column::CreatedAt)
        .order_by_asc(apartment_owner::Column::Id)
        .into_tuple()
        .all(conn)
        .await?;

    let resident_ids: Vec<Uuid> = apartment_resident::Entity::find()
        .select_only()
        .column(apartment_resident::Column::UserId)
        .filter(apartment_resident::Column::ApartmentId.eq(apartment.id))
        .order_by_asc(apartment_resident::Column::CreatedAt)
        .order_by_asc(apartment_resident::Column::Id)
        .into_tuple()
        .all(conn)
        .await?;

    Ok(ApartmentRecord {
        apartment,
        owner_ids,
        resident_ids,
    })
}
