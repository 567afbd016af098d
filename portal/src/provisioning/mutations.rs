use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use super::{
    ApartmentRecord, ApartmentService, Principal, ProvisionError, finish, find_user,
    load_record, owned_apartment, resolve_agent,
};
use crate::entity::{
    apartment, apartment_owner, apartment_resident,
    app_user::{self, Status},
};

impl ApartmentService {
    /// Grant `user_id` residency. Adding an existing resident is a no-op.
    pub async fn add_resident(
        &self,
        principal: &Principal,
        apartment_id: Uuid,
        user_id: Uuid,
    ) -> Result<ApartmentRecord, ProvisionError> {
        let txn = self.db.begin().await?;
        let result = add_resident_in(&txn, principal, apartment_id, user_id).await;
        finish(txn, result).await
    }

    /// Revoke residency and clear the identity's apartment link.
    pub async fn remove_resident(
        &self,
        principal: &Principal,
        apartment_id: Uuid,
        user_id: Uuid,
    ) -> Result<ApartmentRecord, ProvisionError> {
        let txn = self.db.begin().await?;
        let result = remove_resident_in(&txn, principal, apartment_id, user_id).await;
        finish(txn, result).await
    }

    /// Rename an apartment. Code, owners and residents are untouched.
    pub async fn edit_apartment(
        &self,
        principal: &Principal,
        apartment_id: Uuid,
        name: &str,
    ) -> Result<ApartmentRecord, ProvisionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProvisionError::validation("name", "must not be empty"));
        }

        let txn = self.db.begin().await?;
        let result = edit_apartment_in(&txn, principal, apartment_id, name).await;
        finish(txn, result).await
    }

    /// Drop `user_id` from the owner set and deactivate its login, which was
    /// derived from this apartment.
    pub async fn remove_owner(
        &self,
        principal: &Principal,
        apartment_id: Uuid,
        user_id: Uuid,
    ) -> Result<ApartmentRecord, ProvisionError> {
        let txn = self.db.begin().await?;
        let result = remove_owner_in(&txn, principal, apartment_id, user_id).await;
        finish(txn, result).await
    }

    /// Delete an apartment, deactivating its owners and unlinking everyone
    /// who pointed at it. The agent's counter keeps the code retired.
    pub async fn delete_apartment(
        &self,
        principal: &Principal,
        apartment_id: Uuid,
    ) -> Result<(), ProvisionError> {
        let txn = self.db.begin().await?;
        let result = delete_apartment_in(&txn, principal, apartment_id).await;
        finish(txn, result).await
    }
}

async fn add_resident_in(
    txn: &DatabaseTransaction,
    principal: &Principal,
    apartment_id: Uuid,
    user_id: Uuid,
) -> Result<ApartmentRecord, ProvisionError> {
    let agent = resolve_agent(txn, principal).await?;
    let apartment = owned_apartment(txn, &agent, apartment_id).await?;
    let user = find_user(txn, user_id).await?;
    let now = Utc::now().naive_utc();

    let already = apartment_resident::Entity::find()
        .filter(apartment_resident::Column::ApartmentId.eq(apartment.id))
        .filter(apartment_resident::Column::UserId.eq(user.id))
        .one(txn)
        .await?
        .is_some();
    if !already {
        apartment_resident::ActiveModel {
            id: Set(Uuid::now_v7()),
            apartment_id: Set(apartment.id),
            user_id: Set(user.id),
            created_at: Set(now),
        }
        .insert(txn)
        .await?;
    }

    if user.apartment_id != Some(apartment.id) {
        let mut active: app_user::ActiveModel = user.into();
        active.apartment_id = Set(Some(apartment.id));
        active.updated_at = Set(now);
        active.update(txn).await?;
    }

    tracing::info!(apartment = %apartment.code, user_id = %user_id, added = !already, "resident added");
    load_record(txn, apartment).await
}

async fn remove_resident_in(
    txn: &DatabaseTransaction,
    principal: &Principal,
    apartment_id: Uuid,
    user_id: Uuid,
) -> Result<ApartmentRecord, ProvisionError> {
    let agent = resolve_agent(txn, principal).await?;
    let apartment = owned_apartment(txn, &agent, apartment_id).await?;
    let user = find_user(txn, user_id).await?;

    let removed = apartment_resident::Entity::delete_many()
        .filter(apartment_resident::Column::ApartmentId.eq(apartment.id))
        .filter(apartment_resident::Column::UserId.eq(user.id))
        .exec(txn)
        .await?;
    if removed.rows_affected == 0 {
        return Err(ProvisionError::NotFound { entity: "resident" });
    }

    // An identity holds a single apartment link, so clearing it here also
    // drops the link of an owner of some other apartment.
    let owns_elsewhere = apartment_owner::Entity::find()
        .filter(apartment_owner::Column::UserId.eq(user.id))
        .filter(apartment_owner::Column::ApartmentId.ne(apartment.id))
        .count(txn)
        .await?
        > 0;
    if owns_elsewhere {
        tracing::warn!(
            user_id = %user.id,
            apartment = %apartment.code,
            "clearing apartment link of an identity that still owns another apartment"
        );
    }

    if user.apartment_id.is_some() {
        let mut active: app_user::ActiveModel = user.into();
        active.apartment_id = Set(None);
        active.updated_at = Set(Utc::now().naive_utc());
        active.update(txn).await?;
    }

    tracing::info!(apartment = %apartment.code, user_id = %user_id, "resident removed");
    load_record(txn, apartment).await
}

async fn edit_apartment_in(
    txn: &DatabaseTransaction,
    principal: &Principal,
    apartment_id: Uuid,
    name: &str,
) -> Result<ApartmentRecord, ProvisionError> {
    let agent = resolve_agent(txn, principal).await?;
    let apartment = owned_apartment(txn, &agent, apartment_id).await?;

    let mut active: apartment::ActiveModel = apartment.into();
    active.name = Set(name.to_string());
    active.updated_at = Set(Utc::now().naive_utc());
    let apartment = active.update(txn).await?;

    load_record(txn, apartment).await
}

async fn remove_owner_in(
    txn: &DatabaseTransaction,
    principal: &Principal,
    apartment_id: Uuid,
    user_id: Uuid,
) -> Result<ApartmentRecord, ProvisionError> {
    let agent = resolve_agent(txn, principal).await?;
    let apartment = owned_apartment(txn, &agent, apartment_id).await?;

    let removed = apartment_owner::Entity::delete_many()
        .filter(apartment_owner::Column::ApartmentId.eq(apartment.id))
        .filter(apartment_owner::Column::UserId.eq(user_id))
        .exec(txn)
        .await?;
    if removed.rows_affected == 0 {
        return Err(ProvisionError::NotFound { entity: "owner" });
    }

    let user = find_user(txn, user_id).await?;
    let mut active: app_user::ActiveModel = user.clone().into();
    if user.apartment_id == Some(apartment.id) {
        active.apartment_id = Set(None);
    }
    active.status = Set(Status::Inactive);
    active.updated_at = Set(Utc::now().naive_utc());
    active.update(txn).await?;

    tracing::info!(apartment = %apartment.code, user_id = %user_id, "owner removed");
    load_record(txn, apartment).await
}

async fn delete_apartment_in(
    txn: &DatabaseTransaction,
    principal: &Principal,
    apartment_id: Uuid,
) -> Result<(), ProvisionError> {
    let agent = resolve_agent(txn, principal).await?;
    let apartment = owned_apartment(txn, &agent, apartment_id).await?;
    let now = Utc::now().naive_utc();

    let owner_ids: Vec<Uuid> = apartment_owner::Entity::find()
        .select_only()
        .column(apartment_owner::Column::UserId)
        .filter(apartment_owner::Column::ApartmentId.eq(apartment.id))
        .into_tuple()
        .all(txn)
        .await?;

    if !owner_ids.is_empty() {
        app_user::Entity::update_many()
            .col_expr(app_user::Column::Status, Expr::value(Status::Inactive))
            .col_expr(app_user::Column::UpdatedAt, Expr::value(now))
            .filter(app_user::Column::Id.is_in(owner_ids.clone()))
            .exec(txn)
            .await?;
    }

    app_user::Entity::update_many()
        .col_expr(app_user::Column::ApartmentId, Expr::value(Option::<Uuid>::None))
        .col_expr(app_user::Column::UpdatedAt, Expr::value(now))
        .filter(app_user::Column::ApartmentId.eq(apartment.id))
        .exec(txn)
        .await?;

    apartment_owner::Entity::delete_many()
        .filter(apartment_owner::Column::ApartmentId.eq(apartment.id))
        .exec(txn)
        .await?;
    apartment_resident::Entity::delete_many()
        .filter(apartment_resident::Column::ApartmentId.eq(apartment.id))
        .exec(txn)
        .await?;
    apartment::Entity::delete_by_id(apartment.id)
        .exec(txn)
        .await?;

    tracing::info!(
        apartment = %apartment.code,
        owners_deactivated = owner_ids.len(),
        "apartment deleted"
    );
    Ok(())
}
