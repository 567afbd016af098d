//! Runtime configuration, read from `PORTAL_*` environment variables.
//!
//! `main` loads `.env` first (via `dotenvy`), so every value below can also
//! live in a dotenv file during development.

use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://portal.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_OWNER_EMAIL_DOMAIN: &str = "owners.residence.local";
pub const DEFAULT_SUPERVISOR_USER: &str = "supervisor";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Argon2id work factors used for every stored password.
///
/// The floor is the argon2 crate default (19 MiB, 2 passes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    memory_kib: u32,
    iterations: u32,
}

impl HashCost {
    pub const MIN_MEMORY_KIB: u32 = Params::DEFAULT_M_COST;
    pub const MIN_ITERATIONS: u32 = Params::DEFAULT_T_COST;

    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, ConfigError> {
        if memory_kib < Self::MIN_MEMORY_KIB {
            return Err(ConfigError::Invalid {
                var: "PORTAL_HASH_MEMORY_KIB",
                reason: format!("must be at least {}", Self::MIN_MEMORY_KIB),
            });
        }
        if iterations < Self::MIN_ITERATIONS {
            return Err(ConfigError::Invalid {
                var: "PORTAL_HASH_ITERATIONS",
                reason: format!("must be at least {}", Self::MIN_ITERATIONS),
            });
        }
        Ok(Self {
            memory_kib,
            iterations,
        })
    }

    pub fn memory_kib(&self) -> u32 {
        self.memory_kib
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Build an Argon2id hasher with these work factors.
    pub fn hasher(&self) -> Result<Argon2<'static>, argon2::Error> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            Params::DEFAULT_P_COST,
            None,
        )?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Self::MIN_MEMORY_KIB,
            iterations: Self::MIN_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub database_url: String,
    pub bind_addr: String,
    /// `None` means a random secret is generated at startup.
    pub jwt_secret: Option<String>,
    pub jwt_expiry_hours: u64,
    /// Domain of the synthetic addresses minted for provisioned owners.
    pub owner_email_domain: String,
    pub hash_cost: HashCost,
    pub cors_allowed_origins: Vec<String>,
    pub supervisor_user: String,
    pub supervisor_password: Option<String>,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_expiry_hours = parse_or(&get, "PORTAL_JWT_EXPIRY_HOURS", 24u64)?;
        let hash_cost = HashCost::new(
            parse_or(&get, "PORTAL_HASH_MEMORY_KIB", HashCost::MIN_MEMORY_KIB)?,
            parse_or(&get, "PORTAL_HASH_ITERATIONS", HashCost::MIN_ITERATIONS)?,
        )?;

        let owner_email_domain = get("PORTAL_OWNER_EMAIL_DOMAIN")
            .map(|d| d.trim().to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_OWNER_EMAIL_DOMAIN.to_string());
        if owner_email_domain.contains('@') || owner_email_domain.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid {
                var: "PORTAL_OWNER_EMAIL_DOMAIN",
                reason: "must be a bare domain name".to_string(),
            });
        }

        let cors_allowed_origins = get("PORTAL_CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            database_url: get("PORTAL_DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr: get("PORTAL_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            jwt_secret: get("PORTAL_JWT_SECRET"),
            jwt_expiry_hours,
            owner_email_domain,
            hash_cost,
            cors_allowed_origins,
            supervisor_user: get("PORTAL_SUPERVISOR_USER")
                .unwrap_or_else(|| DEFAULT_SUPERVISOR_USER.to_string()),
            supervisor_password: get("PORTAL_SUPERVISOR_PASSWORD"),
        })
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
