use argon2::{PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use password_hash::SaltString;
use rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};
use uuid::Uuid;

use crate::config::HashCost;
use crate::entity::{
    agent,
    app_user::{self, Role, Status},
};
use crate::provisioning::code::derive_prefix;

/// Error type for login and account creation.
#[derive(Debug)]
pub enum AuthApiError {
    NotFound,
    InvalidPassword,
    Inactive,
    /// Agent accounts need an email to derive their prefix from.
    MissingEmail,
    Db(sea_orm::DbErr),
    Hash(String),
}

impl std::fmt::Display for AuthApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthApiError::NotFound => write!(f, "User not found"),
            AuthApiError::InvalidPassword => write!(f, "Invalid password"),
            AuthApiError::Inactive => write!(f, "User is inactive"),
            AuthApiError::MissingEmail => write!(f, "Agents require an email address"),
            AuthApiError::Db(e) => write!(f, "Database error: {e}"),
            AuthApiError::Hash(e) => write!(f, "Hash error: {e}"),
        }
    }
}

impl std::error::Error for AuthApiError {}

/// Account details for [`Auth::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: Option<String>,
    pub role: Role,
}

/// Hash a plaintext password with Argon2id at `cost` and a random salt.
pub fn hash_password(password: &str, cost: HashCost) -> Result<String, AuthApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hasher = cost
        .hasher()
        .map_err(|e| AuthApiError::Hash(e.to_string()))?;
    let hash = hasher
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthApiError::Hash(e.to_string()))?
        .to_string();
    Ok(hash)
}

/// Check `password` against a stored PHC string. The work factors are read
/// from the hash itself, so older hashes keep verifying after a cost change.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthApiError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthApiError::Hash(e.to_string()))?;
    match argon2::Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthApiError::Hash(e.to_string())),
    }
}

pub struct Auth {
    db: DatabaseConnection,
    hash_cost: HashCost,
}

impl Auth {
    pub fn new(db: DatabaseConnection, hash_cost: HashCost) -> Self {
        Self { db, hash_cost }
    }

    /// Expose the underlying DB connection for direct SeaORM queries.
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Verify username/password and stamp `last_login_at`.
    pub async fn authenticate_for_api(
        &self,
        username: &str,
        password: &str,
    ) -> Result<app_user::Model, AuthApiError> {
        let user = app_user::Entity::find()
            .filter(app_user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(AuthApiError::Db)?
            .ok_or(AuthApiError::NotFound)?;

        if user.status != Status::Active {
            return Err(AuthApiError::Inactive);
        }

        let hash = user.password_hash.clone();
        let candidate = password.to_owned();
        let matches = tokio::task::spawn_blocking(move || verify_password(&candidate, &hash))
            .await
            .map_err(|e| AuthApiError::Hash(e.to_string()))??;
        if !matches {
            return Err(AuthApiError::InvalidPassword);
        }

        let mut active: app_user::ActiveModel = user.into();
        active.last_login_at = Set(Some(Utc::now().naive_utc()));
        let user = active.update(&self.db).await.map_err(AuthApiError::Db)?;

        Ok(user)
    }

    /// Create an agent or supervisor account. Agents also get their `agent`
    /// row, with the prefix derived from their email, in the same transaction.
    pub async fn create_user(&self, new: NewUser) -> Result<app_user::Model, AuthApiError> {
        let email = new
            .email
            .map(|e| e.trim().to_ascii_lowercase())
            .filter(|e| !e.is_empty());
        if new.role == Role::Agent && email.is_none() {
            return Err(AuthApiError::MissingEmail);
        }

        let password_hash = hash_password(&new.password, self.hash_cost)?;
        let now = Utc::now().naive_utc();

        let txn = self.db.begin().await.map_err(AuthApiError::Db)?;

        let user = app_user::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(new.name.trim().to_owned()),
            username: Set(new.username),
            email: Set(email.clone()),
            password_hash: Set(password_hash),
            role: Set(new.role),
            status: Set(Status::Active),
            apartment_id: Set(None),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(AuthApiError::Db)?;

        if let (Role::Agent, Some(email)) = (new.role, email) {
            agent::ActiveModel {
                id: Set(Uuid::now_v7()),
                user_id: Set(user.id),
                prefix: Set(derive_prefix(&email)),
                email: Set(email),
                last_issued_code: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(AuthApiError::Db)?;
        }

        txn.commit().await.map_err(AuthApiError::Db)?;
        Ok(user)
    }

    /// Return the total number of users in the store.
    pub async fn count_users(&self) -> Result<u64, AuthApiError> {
        app_user::Entity::find()
            .count(&self.db)
            .await
            .map_err(AuthApiError::Db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup() -> Auth {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        Auth::new(db, HashCost::default())
    }

    fn new_user(username: &str, password: &str, role: Role, email: Option<&str>) -> NewUser {
        NewUser {
            username: username.to_string(),
            password: password.to_string(),
            name: format!("{username} test"),
            email: email.map(str::to_string),
            role,
        }
    }

    // --- hash_password ---

    #[test]
    fn test_hash_produces_argon2id_format() {
        let hash = hash_password("hunter2", HashCost::default()).unwrap();
        assert!(hash.starts_with("$argon2id$"), "Expected Argon2id PHC string, got: {}", hash);
    }

    #[test]
    fn test_hash_unique_per_call() {
        let h1 = hash_password("same", HashCost::default()).unwrap();
        let h2 = hash_password("same", HashCost::default()).unwrap();
        assert_ne!(h1, h2, "Same password hashed twice should produce different hashes");
    }

    #[test]
    fn test_hash_records_configured_cost() {
        let cost = HashCost::new(HashCost::MIN_MEMORY_KIB, 3).unwrap();
        let hash = hash_password("pw", cost).unwrap();
        assert!(hash.contains("t=3"), "cost not encoded in {hash}");
        assert!(verify_password("pw", &hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_wrong_password() {
        let hash = hash_password("correct horse battery staple", HashCost::default()).unwrap();
        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_verify_malformed_hash_errors() {
        assert!(verify_password("pw", "not-a-hash").is_err());
    }

    // --- create_user ---

    #[tokio::test]
    async fn test_empty_store_count_is_zero() {
        let auth = setup().await;
        assert_eq!(auth.count_users().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_agent_creates_agent_row_with_prefix() {
        let auth = setup().await;
        let user = auth
            .create_user(new_user("acme", "pw", Role::Agent, Some("Acme@Estates.test")))
            .await
            .unwrap();

        let row = agent::Entity::find()
            .filter(agent::Column::UserId.eq(user.id))
            .one(auth.db())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(row.prefix, "AC");
        assert_eq!(row.email, "acme@estates.test");
        assert!(row.last_issued_code.is_none());
        assert_eq!(user.role, Role::Agent);
        assert_ne!(user.password_hash, "pw", "Plaintext must never be stored");
    }

    #[tokio::test]
    async fn test_create_agent_without_email_fails() {
        let auth = setup().await;
        let err = auth
            .create_user(new_user("acme", "pw", Role::Agent, None))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthApiError::MissingEmail));
        assert_eq!(auth.count_users().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_supervisor_has_no_agent_row() {
        let auth = setup().await;
        auth.create_user(new_user("boss", "pw", Role::Supervisor, None))
            .await
            .unwrap();
        assert_eq!(auth.count_users().await.unwrap(), 1);
        assert_eq!(agent::Entity::find().count(auth.db()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_prefix_rolls_back_user() {
        let auth = setup().await;
        auth.create_user(new_user("acme", "pw", Role::Agent, Some("acme@a.test")))
            .await
            .unwrap();
        let result = auth
            .create_user(new_user("acorn", "pw", Role::Agent, Some("acorn@b.test")))
            .await;

        assert!(result.is_err(), "Second agent with prefix AC must fail");
        assert_eq!(auth.count_users().await.unwrap(), 1, "User row must be rolled back");
    }

    #[tokio::test]
    async fn test_create_user_duplicate_username_errors() {
        let auth = setup().await;
        auth.create_user(new_user("alice", "pw", Role::Supervisor, None))
            .await
            .unwrap();
        let result = auth
            .create_user(new_user("alice", "other", Role::Supervisor, None))
            .await;
        assert!(result.is_err(), "Duplicate username must fail");
    }

    // --- authenticate_for_api ---

    #[tokio::test]
    async fn test_authenticate_success_updates_last_login_at() {
        let auth = setup().await;
        auth.create_user(new_user("alice", "correct", Role::Supervisor, None))
            .await
            .unwrap();

        let user = auth.authenticate_for_api("alice", "correct").await.unwrap();
        assert_eq!(user.username, "alice");
        assert!(user.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password_rejected() {
        let auth = setup().await;
        auth.create_user(new_user("alice", "correct", Role::Supervisor, None))
            .await
            .unwrap();

        let err = auth.authenticate_for_api("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthApiError::InvalidPassword), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_authenticate_unknown_user_rejected() {
        let auth = setup().await;
        let err = auth.authenticate_for_api("nobody", "pw").await.unwrap_err();
        assert!(matches!(err, AuthApiError::NotFound));
    }

    #[tokio::test]
    async fn test_authenticate_inactive_user_rejected() {
        let auth = setup().await;
        let user = auth
            .create_user(new_user("alice", "pw", Role::Supervisor, None))
            .await
            .unwrap();

        let mut active: app_user::ActiveModel = user.into();
        active.status = Set(Status::Inactive);
        active.update(auth.db()).await.unwrap();

        let err = auth.authenticate_for_api("alice", "pw").await.unwrap_err();
        assert!(matches!(err, AuthApiError::Inactive));
    }
}
