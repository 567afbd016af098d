use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use super::{
    ApartmentDescriptor, ApartmentRecord, ApartmentService, OwnerName, Principal,
    ProvisionError, ProvisionedApartment,
    code::{allocate, highest_code},
    credentials::{CredentialMinter, MintedCredential},
    error::is_unique_violation,
    finish, resolve_agent,
};
use crate::entity::{
    agent, apartment, apartment_owner,
    app_user::{self, Role, Status},
};

impl ApartmentService {
    /// Create an apartment and one login per owner as a single unit of work.
    ///
    /// Not idempotent: every call issues a fresh code. A code collision is
    /// retried once; every other failure is returned as-is with nothing
    /// persisted.
    pub async fn provision_apartment(
        &self,
        principal: &Principal,
        descriptor: ApartmentDescriptor,
        owners: Vec<OwnerName>,
    ) -> Result<ProvisionedApartment, ProvisionError> {
        let (descriptor, owners) = validate(descriptor, owners)?;

        match self.provision_once(principal, &descriptor, &owners, None).await {
            Err(ProvisionError::CodeConflict { code }) => {
                tracing::warn!(code = %code, "apartment code already taken, retrying once");
                self.provision_once(principal, &descriptor, &owners, Some(&code))
                    .await
            }
            result => result,
        }
    }

    /// `taken` is a code known to be in use; allocation starts after it.
    async fn provision_once(
        &self,
        principal: &Principal,
        descriptor: &ApartmentDescriptor,
        owners: &[OwnerName],
        taken: Option<&str>,
    ) -> Result<ProvisionedApartment, ProvisionError> {
        let txn = self.db.begin().await?;
        let result = provision_in(&txn, &self.minter, principal, descriptor, owners, taken).await;
        let provisioned = finish(txn, result).await?;

        tracing::info!(
            code = %provisioned.apartment.apartment.code,
            apartment_id = %provisioned.apartment.apartment.id,
            owners = provisioned.owners.len(),
            "apartment provisioned"
        );
        Ok(provisioned)
    }
}

fn validate(
    descriptor: ApartmentDescriptor,
    owners: Vec<OwnerName>,
) -> Result<(ApartmentDescriptor, Vec<OwnerName>), ProvisionError> {
    let name = descriptor.name.trim();
    if name.is_empty() {
        return Err(ProvisionError::validation("name", "must not be empty"));
    }

    let mut trimmed = Vec::with_capacity(owners.len());
    for (i, owner) in owners.iter().enumerate() {
        let first_name = owner.first_name.trim();
        let last_name = owner.last_name.trim();
        if first_name.is_empty() {
            return Err(ProvisionError::validation(
                format!("owners[{i}].firstName"),
                "must not be empty",
            ));
        }
        if last_name.is_empty() {
            return Err(ProvisionError::validation(
                format!("owners[{i}].lastName"),
                "must not be empty",
            ));
        }
        trimmed.push(OwnerName {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        });
    }

    let descriptor = ApartmentDescriptor {
        name: name.to_string(),
        address: descriptor.address.trim().to_string(),
        apartment_type: descriptor.apartment_type.trim().to_string(),
    };
    Ok((descriptor, trimmed))
}

async fn provision_in(
    txn: &DatabaseTransaction,
    minter: &CredentialMinter,
    principal: &Principal,
    descriptor: &ApartmentDescriptor,
    owners: &[OwnerName],
    taken: Option<&str>,
) -> Result<ProvisionedApartment, ProvisionError> {
    let now = Utc::now().naive_utc();

    // The agent row's write lock is the first statement of the transaction:
    // concurrent provisioning for the same agent queues here until this
    // transaction ends, before it has read anything.
    agent::Entity::update_many()
        .col_expr(agent::Column::UpdatedAt, Expr::value(now))
        .filter(agent::Column::UserId.eq(principal.user_id))
        .exec(txn)
        .await?;
    let agent = resolve_agent(txn, principal).await?;

    let existing: Vec<String> = apartment::Entity::find()
        .select_only()
        .column(apartment::Column::Code)
        .filter(apartment::Column::AgentId.eq(agent.id))
        .into_tuple()
        .all(txn)
        .await?;
    let last = highest_code(
        &agent.prefix,
        agent
            .last_issued_code
            .as_deref()
            .into_iter()
            .chain(taken)
            .chain(existing.iter().map(String::as_str)),
    )?;
    let code = allocate(&agent.prefix, last)?;

    let apartment = apartment::ActiveModel {
        id: Set(Uuid::now_v7()),
        code: Set(code.clone()),
        name: Set(descriptor.name.clone()),
        address: Set(descriptor.address.clone()),
        apartment_type: Set(descriptor.apartment_type.clone()),
        agent_id: Set(agent.id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(txn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ProvisionError::CodeConflict { code: code.clone() }
        } else {
            e.into()
        }
    })?;

    let mut owner_ids = Vec::with_capacity(owners.len());
    let mut issued = Vec::with_capacity(owners.len());
    for (ordinal, owner) in owners.iter().enumerate() {
        let minted = mint_blocking(minter, owner, &apartment, ordinal).await?;
        ensure_unique(txn, ordinal, &minted).await?;

        let user = app_user::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(minted.name.clone()),
            username: Set(minted.username.clone()),
            email: Set(Some(minted.email.clone())),
            password_hash: Set(minted.password_hash.clone()),
            role: Set(Role::PropertyOwner),
            status: Set(Status::Active),
            apartment_id: Set(Some(apartment.id)),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ProvisionError::OwnerConflict {
                    ordinal,
                    name: minted.name.clone(),
                    field: "username or email",
                }
            } else {
                e.into()
            }
        })?;

        owner_ids.push(user.id);
        issued.push(minted.into_issued());
    }

    for user_id in &owner_ids {
        apartment_owner::ActiveModel {
            id: Set(Uuid::now_v7()),
            apartment_id: Set(apartment.id),
            user_id: Set(*user_id),
            created_at: Set(now),
        }
        .insert(txn)
        .await?;
    }

    let mut active: agent::ActiveModel = agent.into();
    active.last_issued_code = Set(Some(code));
    active.updated_at = Set(now);
    active.update(txn).await?;

    Ok(ProvisionedApartment {
        apartment: ApartmentRecord {
            apartment,
            owner_ids,
            resident_ids: Vec::new(),
        },
        owners: issued,
    })
}

/// Mint on the blocking pool.
async fn mint_blocking(
    minter: &CredentialMinter,
    owner: &OwnerName,
    apartment: &apartment::Model,
    ordinal: usize,
) -> Result<MintedCredential, ProvisionError> {
    let minter = minter.clone();
    let first = owner.first_name.clone();
    let last = owner.last_name.clone();
    let code = apartment.code.clone();
    let apartment_id = apartment.id;

    tokio::task::spawn_blocking(move || minter.mint(&first, &last, &code, apartment_id, ordinal))
        .await
        .map_err(|e| ProvisionError::Hash(e.to_string()))?
}

async fn ensure_unique(
    txn: &DatabaseTransaction,
    ordinal: usize,
    minted: &MintedCredential,
) -> Result<(), ProvisionError> {
    let clash = app_user::Entity::find()
        .filter(
            Condition::any()
                .add(app_user::Column::Username.eq(minted.username.as_str()))
                .add(app_user::Column::Email.eq(minted.email.as_str())),
        )
        .one(txn)
        .await?;

    match clash {
        Some(user) => Err(ProvisionError::OwnerConflict {
            ordinal,
            name: minted.name.clone(),
            field: if user.username == minted.username {
                "username"
            } else {
                "email"
            },
        }),
        None => Ok(()),
    }
}
